//! Browser host over `web-sys`.
//!
//! DESIGN
//! ======
//! `WebElement` is a thin wrapper; wrapping the same node twice yields two
//! handles that compare equal through [`Element::same_node`]. Event
//! listener closures live in a table shared by every wrapper created from one
//! [`WebDocument`], so a wrapper can be dropped while its listeners stay
//! installed and any wrapper of the node can remove them later.
//!
//! DOM calls that can throw are logged at debug level and otherwise ignored.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CustomEvent, CustomEventInit, EventTarget, HtmlElement, HtmlInputElement, HtmlTextAreaElement, Window};

use super::{ClockTime, Document, DomEvent, Element, ElementRef, EventHandler, ListenerId, Scheduler, Storage, Task, TaskId};
use crate::error::StorageError;

fn report<T>(operation: &'static str, result: Result<T, JsValue>) {
    if let Err(err) = result {
        tracing::debug!(operation, error = ?err, "DOM call failed");
    }
}

fn attempt<T>(operation: &'static str, result: Result<T, JsValue>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(operation, error = ?err, "DOM call failed");
            None
        }
    }
}

fn json_to_js(value: &serde_json::Value) -> Option<JsValue> {
    attempt("JSON.parse", js_sys::JSON::parse(&value.to_string()))
}

fn js_to_json(value: &JsValue) -> Option<serde_json::Value> {
    let text = String::from(attempt("JSON.stringify", js_sys::JSON::stringify(value))?);
    match serde_json::from_str(&text) {
        Ok(json) => Some(json),
        Err(err) => {
            tracing::debug!(error = %err, "event detail is not JSON");
            None
        }
    }
}

/// Host-neutral copy of a browser event.
fn dom_event(event: &web_sys::Event) -> DomEvent {
    let mut converted = match event.dyn_ref::<web_sys::KeyboardEvent>() {
        Some(keyboard) => DomEvent::key(event.type_(), keyboard.key()).with_shift(keyboard.shift_key()),
        None => DomEvent::new(event.type_()),
    };
    let target = event.target();
    if let Some(input) = target.as_ref().and_then(|t| t.dyn_ref::<HtmlInputElement>()) {
        if matches!(input.type_().as_str(), "checkbox" | "radio") {
            converted = converted.with_checked(input.checked());
        }
    }
    if let Some(custom) = event.dyn_ref::<CustomEvent>() {
        let detail = custom.detail();
        if !detail.is_undefined() && !detail.is_null() {
            if let Some(json) = js_to_json(&detail) {
                converted = converted.with_detail(json);
            }
        }
    }
    converted
}

// =============================================================================
// LISTENERS
// =============================================================================

struct Listener {
    target: EventTarget,
    event: String,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

#[derive(Default)]
struct ListenerTable {
    next_id: Cell<u64>,
    entries: RefCell<HashMap<ListenerId, Listener>>,
}

impl ListenerTable {
    fn add(&self, target: &EventTarget, event: &str, handler: EventHandler) -> ListenerId {
        let callback = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let converted = dom_event(&event);
            handler(&converted);
            if converted.default_prevented() {
                event.prevent_default();
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        report(
            "addEventListener",
            target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref()),
        );

        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries
            .borrow_mut()
            .insert(id, Listener { target: target.clone(), event: event.to_owned(), callback });
        id
    }

    fn remove(&self, id: ListenerId) {
        let removed = self.entries.borrow_mut().remove(&id);
        if let Some(listener) = removed {
            report(
                "removeEventListener",
                listener
                    .target
                    .remove_event_listener_with_callback(&listener.event, listener.callback.as_ref().unchecked_ref()),
            );
        }
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

pub struct WebElement {
    element: web_sys::Element,
    listeners: Rc<ListenerTable>,
}

impl WebElement {
    fn wrap(&self, element: web_sys::Element) -> ElementRef {
        Rc::new(Self { element, listeners: Rc::clone(&self.listeners) })
    }

    fn html(&self) -> Option<&HtmlElement> {
        self.element.dyn_ref::<HtmlElement>()
    }

    fn input(&self) -> Option<&HtmlInputElement> {
        self.element.dyn_ref::<HtmlInputElement>()
    }
}

impl Element for WebElement {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_node(&self, other: &dyn Element) -> bool {
        other.as_any().downcast_ref::<WebElement>().is_some_and(|other| {
            let node: &web_sys::Node = &other.element;
            self.element.is_same_node(Some(node))
        })
    }

    fn tag_name(&self) -> String {
        self.element.tag_name().to_ascii_lowercase()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.element.get_attribute(name)
    }

    fn set_attribute(&self, name: &str, value: &str) {
        report("setAttribute", self.element.set_attribute(name, value));
    }

    fn remove_attribute(&self, name: &str) {
        report("removeAttribute", self.element.remove_attribute(name));
    }

    fn attributes(&self) -> Vec<(String, String)> {
        self.element
            .get_attribute_names()
            .iter()
            .filter_map(|name| name.as_string())
            .filter_map(|name| self.element.get_attribute(&name).map(|value| (name, value)))
            .collect()
    }

    fn has_class(&self, class: &str) -> bool {
        self.element.class_list().contains(class)
    }

    fn add_class(&self, class: &str) {
        report("classList.add", self.element.class_list().add_1(class));
    }

    fn remove_class(&self, class: &str) {
        report("classList.remove", self.element.class_list().remove_1(class));
    }

    fn style(&self, property: &str) -> Option<String> {
        self.html()
            .and_then(|el| attempt("getPropertyValue", el.style().get_property_value(property)))
            .filter(|value| !value.is_empty())
    }

    fn set_style(&self, property: &str, value: &str) {
        if let Some(el) = self.html() {
            report("setProperty", el.style().set_property(property, value));
        }
    }

    fn checked(&self) -> bool {
        self.input().is_some_and(HtmlInputElement::checked)
    }

    fn set_checked(&self, checked: bool) {
        if let Some(input) = self.input() {
            input.set_checked(checked);
        }
    }

    fn value(&self) -> String {
        if let Some(input) = self.input() {
            return input.value();
        }
        self.element
            .dyn_ref::<HtmlTextAreaElement>()
            .map(HtmlTextAreaElement::value)
            .unwrap_or_default()
    }

    fn set_value(&self, value: &str) {
        if let Some(input) = self.input() {
            input.set_value(value);
        } else if let Some(area) = self.element.dyn_ref::<HtmlTextAreaElement>() {
            area.set_value(value);
        }
    }

    fn focus(&self) {
        if let Some(el) = self.html() {
            report("focus", el.focus());
        }
    }

    fn scroll_height(&self) -> i32 {
        self.element.scroll_height()
    }

    fn scroll_to_bottom(&self) {
        self.element.set_scroll_top(self.element.scroll_height());
    }

    fn append_html(&self, html: &str) {
        report("insertAdjacentHTML", self.element.insert_adjacent_html("beforeend", html));
    }

    fn append_child(&self, child: &dyn Element) {
        let Some(child) = child.as_any().downcast_ref::<WebElement>() else {
            tracing::debug!("append_child with a foreign element ignored");
            return;
        };
        report("appendChild", self.element.append_child(&child.element));
    }

    fn remove(&self) {
        self.element.remove();
    }

    fn descendants(&self) -> Vec<ElementRef> {
        let all = self.element.get_elements_by_tag_name("*");
        (0..all.length())
            .filter_map(|index| all.item(index))
            .map(|element| self.wrap(element))
            .collect()
    }

    fn listen(&self, event: &str, handler: EventHandler) -> ListenerId {
        self.listeners.add(&self.element, event, handler)
    }

    fn unlisten(&self, id: ListenerId) {
        self.listeners.remove(id);
    }

    fn emit(&self, name: &str, detail: &serde_json::Value) {
        let init = CustomEventInit::new();
        init.set_bubbles(true);
        if let Some(detail) = json_to_js(detail) {
            init.set_detail(&detail);
        }
        if let Some(event) = attempt("new CustomEvent", CustomEvent::new_with_event_init_dict(name, &init)) {
            report("dispatchEvent", self.element.dispatch_event(&event));
        }
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

pub struct WebDocument {
    window: Window,
    document: web_sys::Document,
    listeners: Rc<ListenerTable>,
}

impl WebDocument {
    /// `None` when the window has no document.
    #[must_use]
    pub fn new(window: Window) -> Option<Self> {
        let document = window.document()?;
        Some(Self { window, document, listeners: Rc::new(ListenerTable::default()) })
    }

    fn wrap(&self, element: web_sys::Element) -> ElementRef {
        Rc::new(WebElement { element, listeners: Rc::clone(&self.listeners) })
    }
}

impl Document for WebDocument {
    fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        if id.is_empty() {
            return None;
        }
        self.document.get_element_by_id(id).map(|el| self.wrap(el))
    }

    fn root(&self) -> Option<ElementRef> {
        self.document.document_element().map(|el| self.wrap(el))
    }

    fn elements_with_class(&self, class: &str) -> Vec<ElementRef> {
        let found = self.document.get_elements_by_class_name(class);
        (0..found.length())
            .filter_map(|index| found.item(index))
            .map(|el| self.wrap(el))
            .collect()
    }

    fn prefers_dark(&self) -> bool {
        matches!(self.window.match_media("(prefers-color-scheme: dark)"), Ok(Some(query)) if query.matches())
    }

    fn listen(&self, event: &str, handler: EventHandler) -> ListenerId {
        self.listeners.add(&self.document, event, handler)
    }

    fn unlisten(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// `window.localStorage`. Private browsing modes may refuse access, which
/// surfaces as [`StorageError::Unavailable`].
pub struct LocalStorage {
    window: Window,
}

impl LocalStorage {
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    fn storage(&self) -> Result<web_sys::Storage, StorageError> {
        match self.window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            _ => Err(StorageError::Unavailable),
        }
    }
}

impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|err| StorageError::Read { key: key.to_owned(), reason: format!("{err:?}") })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|err| StorageError::Write { key: key.to_owned(), reason: format!("{err:?}") })
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

type FrameTable = Rc<RefCell<HashMap<TaskId, (i32, Closure<dyn FnMut(f64)>)>>>;
type TimeoutTable = Rc<RefCell<HashMap<TaskId, Timeout>>>;

/// Animation frames and `setTimeout` over the window.
pub struct BrowserScheduler {
    window: Window,
    next_id: Cell<u64>,
    frames: FrameTable,
    timeouts: TimeoutTable,
}

impl BrowserScheduler {
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self {
            window,
            next_id: Cell::new(0),
            frames: Rc::new(RefCell::new(HashMap::new())),
            timeouts: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    fn allocate(&self) -> TaskId {
        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        id
    }
}

impl Scheduler for BrowserScheduler {
    fn now(&self) -> f64 {
        self.window.performance().map_or_else(js_sys::Date::now, |performance| performance.now())
    }

    fn local_time(&self) -> ClockTime {
        let date = js_sys::Date::new_0();
        ClockTime { hour: date.get_hours(), minute: date.get_minutes() }
    }

    fn request_frame(&self, task: Task) -> TaskId {
        let id = self.allocate();
        let frames = Rc::clone(&self.frames);
        let mut task = Some(task);
        let callback = Closure::wrap(Box::new(move |_timestamp: f64| {
            let finished = frames.borrow_mut().remove(&id);
            if let Some(task) = task.take() {
                task();
            }
            drop(finished);
        }) as Box<dyn FnMut(f64)>);

        if let Some(handle) = attempt(
            "requestAnimationFrame",
            self.window.request_animation_frame(callback.as_ref().unchecked_ref()),
        ) {
            self.frames.borrow_mut().insert(id, (handle, callback));
        }
        id
    }

    fn set_timeout(&self, delay_ms: u32, task: Task) -> TaskId {
        let id = self.allocate();
        let timeouts = Rc::clone(&self.timeouts);
        let timeout = Timeout::new(delay_ms, move || {
            let finished = timeouts.borrow_mut().remove(&id);
            task();
            drop(finished);
        });
        self.timeouts.borrow_mut().insert(id, timeout);
        id
    }

    fn cancel(&self, id: TaskId) {
        let frame = self.frames.borrow_mut().remove(&id);
        if let Some((handle, _callback)) = frame {
            report("cancelAnimationFrame", self.window.cancel_animation_frame(handle));
        }
        let timeout = self.timeouts.borrow_mut().remove(&id);
        drop(timeout);
    }
}

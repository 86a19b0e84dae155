//! In-memory host: element tree, document, storage and a manual scheduler.
//!
//! DESIGN
//! ======
//! Mirrors just enough DOM behavior for the behavior units to run natively.
//! Elements keep attributes, classes, inline styles and form state in plain
//! fields; events are dispatched synchronously by the test (or SSR caller).
//! `ManualScheduler` owns a virtual clock that only moves on `advance`, so
//! timing properties can be asserted to the millisecond.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use super::{
    ClockTime, Document, DomEvent, Element, ElementRef, EventHandler, ListenerId, Scheduler, Storage, Task, TaskId,
};
use crate::error::StorageError;

/// Default animation frame spacing (60 Hz).
pub const FRAME_INTERVAL_MS: f64 = 16.0;

// =============================================================================
// LISTENERS
// =============================================================================

#[derive(Default)]
struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, String, EventHandler)>>,
}

impl Listeners {
    fn add(&self, event: &str, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, event.to_owned(), handler));
        id
    }

    fn remove(&self, id: ListenerId) {
        self.entries.borrow_mut().retain(|(existing, _, _)| *existing != id);
    }

    fn count(&self) -> usize {
        self.entries.borrow().len()
    }

    fn dispatch(&self, event: &DomEvent) {
        // Snapshot first: handlers may add or remove listeners.
        let handlers = self
            .entries
            .borrow()
            .iter()
            .filter(|(_, kind, _)| *kind == event.kind)
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect::<Vec<_>>();
        for handler in handlers {
            handler(event);
        }
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

#[derive(Default)]
struct ElementData {
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    styles: BTreeMap<String, String>,
    checked: bool,
    value: String,
    focused: bool,
    html: String,
    scroll_height: i32,
    scroll_top: i32,
    removed: bool,
    emitted: Vec<(String, serde_json::Value)>,
}

/// An element node held entirely in memory.
pub struct MemoryElement {
    this: Weak<MemoryElement>,
    tag: String,
    data: RefCell<ElementData>,
    parent: RefCell<Weak<MemoryElement>>,
    children: RefCell<Vec<Rc<MemoryElement>>>,
    listeners: Listeners,
}

impl MemoryElement {
    #[must_use]
    pub fn new(tag: &str) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            tag: tag.to_ascii_lowercase(),
            data: RefCell::new(ElementData::default()),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            listeners: Listeners::default(),
        })
    }

    // --- Builders ---

    #[must_use]
    pub fn with_attr(self: &Rc<Self>, name: &str, value: &str) -> Rc<Self> {
        self.set_attribute(name, value);
        Rc::clone(self)
    }

    #[must_use]
    pub fn with_id(self: &Rc<Self>, id: &str) -> Rc<Self> {
        self.with_attr("id", id)
    }

    #[must_use]
    pub fn with_class(self: &Rc<Self>, classes: &str) -> Rc<Self> {
        super::add_classes(&**self, classes);
        Rc::clone(self)
    }

    #[must_use]
    pub fn with_child(self: &Rc<Self>, child: &Rc<MemoryElement>) -> Rc<Self> {
        self.append(child);
        Rc::clone(self)
    }

    /// Append `child`, detaching it from any previous parent.
    pub fn append(&self, child: &Rc<MemoryElement>) {
        child.detach_from_parent();
        *child.parent.borrow_mut() = self.this.clone();
        child.data.borrow_mut().removed = false;
        self.children.borrow_mut().push(Rc::clone(child));
    }

    fn detach_from_parent(&self) {
        let parent = self.parent.replace(Weak::new());
        if let Some(parent) = parent.upgrade() {
            parent
                .children
                .borrow_mut()
                .retain(|c| !std::ptr::eq(Rc::as_ptr(c), std::ptr::from_ref(self)));
        }
    }

    // --- Inspection ---

    #[must_use]
    pub fn handle(self: &Rc<Self>) -> ElementRef {
        Rc::clone(self) as ElementRef
    }

    #[must_use]
    pub fn children(&self) -> Vec<Rc<MemoryElement>> {
        self.children.borrow().clone()
    }

    #[must_use]
    pub fn parent(&self) -> Option<Rc<MemoryElement>> {
        self.parent.borrow().upgrade()
    }

    #[must_use]
    pub fn classes(&self) -> Vec<String> {
        self.data.borrow().classes.clone()
    }

    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.data.borrow().focused
    }

    pub fn blur(&self) {
        self.data.borrow_mut().focused = false;
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.data.borrow().removed
    }

    /// HTML appended through [`Element::append_html`], concatenated.
    #[must_use]
    pub fn inner_html(&self) -> String {
        self.data.borrow().html.clone()
    }

    #[must_use]
    pub fn scroll_top(&self) -> i32 {
        self.data.borrow().scroll_top
    }

    pub fn set_scroll_height(&self, height: i32) {
        self.data.borrow_mut().scroll_height = height;
    }

    /// Custom events emitted on this node, oldest first.
    #[must_use]
    pub fn emitted(&self) -> Vec<(String, serde_json::Value)> {
        self.data.borrow().emitted.clone()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.count()
    }

    /// Deliver `event` to this node's listeners. Does not bubble.
    pub fn dispatch(&self, event: &DomEvent) {
        self.listeners.dispatch(event);
    }

    fn collect_descendants(&self, out: &mut Vec<ElementRef>) {
        for child in self.children.borrow().iter() {
            out.push(Rc::clone(child) as ElementRef);
            child.collect_descendants(out);
        }
    }

    fn find(&self, matches: &dyn Fn(&MemoryElement) -> bool, out: &mut Vec<Rc<MemoryElement>>) {
        for child in self.children.borrow().iter() {
            if matches(child) {
                out.push(Rc::clone(child));
            }
            child.find(matches, out);
        }
    }
}

impl Element for MemoryElement {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_node(&self, other: &dyn Element) -> bool {
        other
            .as_any()
            .downcast_ref::<MemoryElement>()
            .is_some_and(|other| std::ptr::eq(self, other))
    }

    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        let data = self.data.borrow();
        if name == "class" {
            return (!data.classes.is_empty()).then(|| data.classes.join(" "));
        }
        data.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn set_attribute(&self, name: &str, value: &str) {
        let mut data = self.data.borrow_mut();
        if name == "class" {
            data.classes = value.split_whitespace().map(str::to_owned).collect();
            return;
        }
        if let Some(slot) = data.attributes.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value.to_owned();
        } else {
            data.attributes.push((name.to_owned(), value.to_owned()));
        }
    }

    fn remove_attribute(&self, name: &str) {
        let mut data = self.data.borrow_mut();
        if name == "class" {
            data.classes.clear();
            return;
        }
        data.attributes.retain(|(key, _)| key != name);
    }

    fn attributes(&self) -> Vec<(String, String)> {
        let data = self.data.borrow();
        let mut out = data.attributes.clone();
        if !data.classes.is_empty() {
            out.push(("class".to_owned(), data.classes.join(" ")));
        }
        out
    }

    fn has_class(&self, class: &str) -> bool {
        self.data.borrow().classes.iter().any(|c| c == class)
    }

    fn add_class(&self, class: &str) {
        let mut data = self.data.borrow_mut();
        if !data.classes.iter().any(|c| c == class) {
            data.classes.push(class.to_owned());
        }
    }

    fn remove_class(&self, class: &str) {
        self.data.borrow_mut().classes.retain(|c| c != class);
    }

    fn style(&self, property: &str) -> Option<String> {
        self.data.borrow().styles.get(property).cloned()
    }

    fn set_style(&self, property: &str, value: &str) {
        let mut data = self.data.borrow_mut();
        if value.is_empty() {
            data.styles.remove(property);
        } else {
            data.styles.insert(property.to_owned(), value.to_owned());
        }
    }

    fn checked(&self) -> bool {
        self.data.borrow().checked
    }

    fn set_checked(&self, checked: bool) {
        self.data.borrow_mut().checked = checked;
    }

    fn value(&self) -> String {
        self.data.borrow().value.clone()
    }

    fn set_value(&self, value: &str) {
        value.clone_into(&mut self.data.borrow_mut().value);
    }

    fn focus(&self) {
        self.data.borrow_mut().focused = true;
    }

    fn scroll_height(&self) -> i32 {
        self.data.borrow().scroll_height
    }

    fn scroll_to_bottom(&self) {
        let mut data = self.data.borrow_mut();
        data.scroll_top = data.scroll_height;
    }

    fn append_html(&self, html: &str) {
        self.data.borrow_mut().html.push_str(html);
    }

    fn append_child(&self, child: &dyn Element) {
        let Some(child) = child.as_any().downcast_ref::<MemoryElement>() else {
            tracing::debug!("append_child: foreign element ignored");
            return;
        };
        if let Some(child) = child.this.upgrade() {
            self.append(&child);
        }
    }

    fn remove(&self) {
        self.detach_from_parent();
        self.data.borrow_mut().removed = true;
    }

    fn descendants(&self) -> Vec<ElementRef> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn listen(&self, event: &str, handler: EventHandler) -> ListenerId {
        self.listeners.add(event, handler)
    }

    fn unlisten(&self, id: ListenerId) {
        self.listeners.remove(id);
    }

    fn emit(&self, name: &str, detail: &serde_json::Value) {
        self.data.borrow_mut().emitted.push((name.to_owned(), detail.clone()));
        let event = DomEvent::new(name).with_detail(detail.clone());
        self.listeners.dispatch(&event);
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            node.listeners.dispatch(&event);
            cursor = node.parent();
        }
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// Document with an `<html>` root and a `<body>` child.
pub struct MemoryDocument {
    root: Rc<MemoryElement>,
    body: Rc<MemoryElement>,
    prefers_dark: Cell<bool>,
    listeners: Listeners,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    #[must_use]
    pub fn new() -> Self {
        let root = MemoryElement::new("html");
        let body = MemoryElement::new("body");
        root.append(&body);
        Self { root, body, prefers_dark: Cell::new(false), listeners: Listeners::default() }
    }

    #[must_use]
    pub fn html(&self) -> Rc<MemoryElement> {
        Rc::clone(&self.root)
    }

    #[must_use]
    pub fn body(&self) -> Rc<MemoryElement> {
        Rc::clone(&self.body)
    }

    pub fn set_prefers_dark(&self, prefers_dark: bool) {
        self.prefers_dark.set(prefers_dark);
    }

    /// Deliver `event` to document-level listeners.
    pub fn dispatch(&self, event: &DomEvent) {
        self.listeners.dispatch(event);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.count()
    }
}

impl Document for MemoryDocument {
    fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        if id.is_empty() {
            return None;
        }
        let mut found = Vec::new();
        self.root.find(&|el: &MemoryElement| el.attribute("id").as_deref() == Some(id), &mut found);
        found.into_iter().next().map(|el| el as ElementRef)
    }

    fn root(&self) -> Option<ElementRef> {
        Some(Rc::clone(&self.root) as ElementRef)
    }

    fn elements_with_class(&self, class: &str) -> Vec<ElementRef> {
        let mut found = Vec::new();
        self.root.find(&|el: &MemoryElement| el.has_class(class), &mut found);
        found.into_iter().map(|el| el as ElementRef).collect()
    }

    fn prefers_dark(&self) -> bool {
        self.prefers_dark.get()
    }

    fn listen(&self, event: &str, handler: EventHandler) -> ListenerId {
        self.listeners.add(event, handler)
    }

    fn unlisten(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// Key-value store that can be switched off to simulate a blocked
/// `localStorage`.
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
    available: Cell<bool>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: RefCell::new(HashMap::new()), available: Cell::new(true) }
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Raw read that ignores availability.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Raw write that ignores availability.
    pub fn insert(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_owned(), value.to_owned());
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if !self.available.get() {
            return Err(StorageError::Unavailable);
        }
        Ok(self.entry(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.available.get() {
            return Err(StorageError::Unavailable);
        }
        self.insert(key, value);
        Ok(())
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

struct Pending {
    id: TaskId,
    due: f64,
    task: Task,
}

/// Scheduler with a virtual clock that only moves on [`advance`].
///
/// Frames fire every `frame_interval` milliseconds after they are requested;
/// raising the interval simulates a throttled background tab.
///
/// [`advance`]: ManualScheduler::advance
pub struct ManualScheduler {
    now: Cell<f64>,
    frame_interval: Cell<f64>,
    next_id: Cell<u64>,
    pending: RefCell<Vec<Pending>>,
    clock: Cell<ClockTime>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Cell::new(0.0),
            frame_interval: Cell::new(FRAME_INTERVAL_MS),
            next_id: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            clock: Cell::new(ClockTime { hour: 9, minute: 30 }),
        }
    }

    pub fn set_frame_interval(&self, interval_ms: f64) {
        self.frame_interval.set(interval_ms.max(1.0));
    }

    pub fn set_local_time(&self, hour: u32, minute: u32) {
        self.clock.set(ClockTime { hour, minute });
    }

    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Move the clock forward by `ms`, running every task that falls due in
    /// order of due time. Tasks scheduled while advancing run too if they
    /// fall inside the window.
    pub fn advance(&self, ms: f64) {
        self.advance_to(self.now.get() + ms);
    }

    /// Move the clock to absolute time `target` (never backwards).
    pub fn advance_to(&self, target: f64) {
        while let Some(next) = self.take_due(target) {
            if next.due > self.now.get() {
                self.now.set(next.due);
            }
            (next.task)();
        }
        if target > self.now.get() {
            self.now.set(target);
        }
    }

    fn take_due(&self, target: f64) -> Option<Pending> {
        let mut pending = self.pending.borrow_mut();
        let index = pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= target)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
            .map(|(index, _)| index)?;
        Some(pending.remove(index))
    }

    fn schedule(&self, due: f64, task: Task) -> TaskId {
        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.pending.borrow_mut().push(Pending { id, due, task });
        id
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn local_time(&self) -> ClockTime {
        self.clock.get()
    }

    fn request_frame(&self, task: Task) -> TaskId {
        self.schedule(self.now.get() + self.frame_interval.get(), task)
    }

    fn set_timeout(&self, delay_ms: u32, task: Task) -> TaskId {
        self.schedule(self.now.get() + f64::from(delay_ms), task)
    }

    fn cancel(&self, id: TaskId) {
        self.pending.borrow_mut().retain(|p| p.id != id);
    }
}

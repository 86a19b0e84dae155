//! Markup binding: attaches behavior units to elements that declare them.
//!
//! SYSTEM CONTEXT
//! ==============
//! Markup declares everything with data attributes:
//!
//! ```text
//! data-controller="drawer quick-replies"     controllers on this element
//! data-drawer-target="toggle"                named target inside the scope
//! data-drawer-persist-value="true"           typed configuration value
//! data-action="change->drawer#handleChange"  DOM event -> controller method
//! data-drawer-id-param="nav"                 per-action parameter
//! ```
//!
//! [`Application::start`] scans the document once, instantiates a controller
//! per declaration through its registered factory, then wires every action
//! to the nearest enclosing controller of the named identifier. Actions
//! whose controller is not an ancestor fall back to the first controller of
//! that identifier on the page, so a toggle button may sit outside its
//! drawer.
//!
//! TRADE-OFFS
//! ==========
//! Binding is a one-shot scan; markup inserted later is not observed.
//! Call [`Application::connect`] on a new subtree to bind it. Action
//! listeners hold their source element, so they form a cycle with it until
//! [`Application::stop`] removes them. A controller that reports itself
//! finished (a removed toast) is dropped with its action listeners by
//! [`Application::prune`], which every `connect` runs first.

#[cfg(test)]
#[path = "binding_test.rs"]
mod binding_test;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use crate::config::{
    DrawerConfig, PanelSwitcherConfig, Parsed, PlaygroundConfig, QuickRepliesConfig, ToastConfig, Values,
};
use crate::drawer::Drawer;
use crate::error::BindingError;
use crate::events::{DrawerCommand, UiEvent};
use crate::host::{DomEvent, Element, ElementRef, EventHandler, ListenerId};
use crate::panel_switcher::PanelSwitcher;
use crate::playground::{Playground, PlaygroundTargets};
use crate::quick_replies::{QuickReplies, QuickRepliesTargets};
use crate::registry::Registry;
use crate::theme::ThemeSwitcher;
use crate::toast::ToastController;

// =============================================================================
// CONTROLLER CONTRACT
// =============================================================================

/// Arguments of a routed action.
pub struct ActionCall<'a> {
    pub event: &'a DomEvent,
    /// Element carrying the `data-action` declaration.
    pub source: &'a ElementRef,
    /// `data-<controller>-<name>-param` values of `source`.
    pub params: &'a Values,
}

/// A behavior unit the binding layer can route actions to.
pub trait Controller {
    /// Run `method`. Returns `false` when there is no such method.
    fn invoke(&self, method: &str, call: &ActionCall<'_>) -> bool;

    /// Cancel every outstanding task and listener.
    fn detach(&self);

    /// Whether the controller is done and its binding may be dropped.
    fn is_finished(&self) -> bool {
        false
    }
}

// =============================================================================
// ACTION DESCRIPTORS
// =============================================================================

/// One `event->controller#method` token of a `data-action` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    /// Explicit DOM event; `None` means the element's default event.
    pub event: Option<String>,
    pub controller: String,
    pub method: String,
}

impl ActionDescriptor {
    /// Parse a whole `data-action` attribute, one result per token.
    pub fn parse_list(attr: &str) -> Vec<Result<Self, BindingError>> {
        attr.split_whitespace().map(str::parse).collect()
    }

    /// Event to listen for on `element`.
    #[must_use]
    pub fn event_for(&self, element: &dyn Element) -> String {
        self.event.clone().unwrap_or_else(|| default_event(element).to_owned())
    }
}

impl FromStr for ActionDescriptor {
    type Err = BindingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let malformed = || BindingError::MalformedAction(token.to_owned());
        let (event, target) = match token.split_once("->") {
            Some((event, target)) => (Some(event), target),
            None => (None, token),
        };
        let (controller, method) = target.split_once('#').ok_or_else(malformed)?;
        let valid = |part: &str| !part.is_empty() && !part.contains(['#', '>']);
        if !valid(controller) || !valid(method) || event.is_some_and(|event| !valid(event)) {
            return Err(malformed());
        }
        Ok(Self { event: event.map(str::to_owned), controller: controller.to_owned(), method: method.to_owned() })
    }
}

impl fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(event) = &self.event {
            write!(f, "{event}->")?;
        }
        write!(f, "{}#{}", self.controller, self.method)
    }
}

/// Event an action listens for when its descriptor names none.
#[must_use]
pub fn default_event(element: &dyn Element) -> &'static str {
    match element.tag_name().as_str() {
        "form" => "submit",
        "select" => "change",
        "textarea" => "input",
        "details" => "toggle",
        "input" => match element.attribute("type").unwrap_or_default().to_ascii_lowercase().as_str() {
            "checkbox" | "radio" => "change",
            "submit" | "button" | "reset" | "image" => "click",
            _ => "input",
        },
        _ => "click",
    }
}

// =============================================================================
// TARGETS / CONTEXT
// =============================================================================

/// Named targets inside a controller's scope, in document order.
#[derive(Default, Clone)]
pub struct Targets {
    entries: Vec<(String, ElementRef)>,
}

impl Targets {
    /// Collect `data-<identifier>-target` declarations on `scope` and its
    /// descendants.
    #[must_use]
    pub fn collect(identifier: &str, scope: &ElementRef) -> Self {
        let attr = format!("data-{identifier}-target");
        let mut entries = Vec::new();
        for element in std::iter::once(Rc::clone(scope)).chain(scope.descendants()) {
            let Some(names) = element.attribute(&attr) else {
                continue;
            };
            for name in names.split_whitespace() {
                entries.push((name.to_owned(), Rc::clone(&element)));
            }
        }
        Self { entries }
    }

    #[must_use]
    pub fn first(&self, name: &str) -> Option<ElementRef> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, el)| Rc::clone(el))
    }

    #[must_use]
    pub fn all(&self, name: &str) -> Vec<ElementRef> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, el)| Rc::clone(el))
            .collect()
    }
}

/// Everything a factory needs to build a controller.
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub identifier: &'a str,
    pub element: ElementRef,
    pub targets: Targets,
    pub values: Values,
}

impl Context<'_> {
    /// Take a parsed config, logging each key that fell back to its default.
    pub fn accept_config<T>(&self, parsed: Parsed<T>) -> T {
        for err in &parsed.errors {
            tracing::warn!(controller = self.identifier, error = %err, "invalid configuration value, using its default");
        }
        parsed.config
    }
}

type Factory = Box<dyn Fn(&Context<'_>) -> Rc<dyn Controller>>;

// =============================================================================
// APPLICATION
// =============================================================================

struct Binding {
    identifier: String,
    element: ElementRef,
    controller: Rc<dyn Controller>,
}

impl Binding {
    fn scope_contains(&self, element: &dyn Element) -> bool {
        self.element.same_node(element) || self.element.descendants().iter().any(|el| el.same_node(element))
    }
}

struct ActionListener {
    element: ElementRef,
    id: ListenerId,
    controller: Weak<dyn Controller>,
}

impl ActionListener {
    fn is_stale(&self) -> bool {
        self.controller.upgrade().is_none_or(|controller| controller.is_finished())
    }
}

pub struct Application {
    registry: Registry,
    factories: Vec<(String, Factory)>,
    bindings: RefCell<Vec<Binding>>,
    listeners: RefCell<Vec<ActionListener>>,
    document_listeners: RefCell<Vec<ListenerId>>,
}

impl Application {
    /// Application with no registered controllers.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            factories: Vec::new(),
            bindings: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            document_listeners: RefCell::new(Vec::new()),
        }
    }

    /// Application with every built-in controller registered.
    #[must_use]
    pub fn with_defaults(registry: Registry) -> Self {
        let mut app = Self::new(registry);
        app.register("theme", |ctx| ThemeSwitcher::attach(ctx.registry, ctx.targets.first("checkbox")));
        app.register("panel-switcher", |ctx| {
            let config = ctx.accept_config(PanelSwitcherConfig::from_values(&ctx.values));
            PanelSwitcher::attach(
                ctx.registry,
                Rc::clone(&ctx.element),
                ctx.targets.all("tab"),
                ctx.targets.all("panel"),
                config,
            )
        });
        app.register("playground", |ctx| {
            let config = ctx.accept_config(PlaygroundConfig::from_values(&ctx.values));
            let targets = PlaygroundTargets {
                messages: ctx.targets.first("messages"),
                input: ctx.targets.first("input"),
                typing_indicator: ctx.targets.first("typingIndicator"),
                send_button: ctx.targets.first("sendButton"),
            };
            Playground::attach(ctx.registry, targets, config)
        });
        app.register("toast", |ctx| {
            let config = ctx.accept_config(ToastConfig::from_values(&ctx.values));
            ToastController::attach(ctx.registry, Rc::clone(&ctx.element), ctx.targets.first("progress"), &config)
        });
        app.register("drawer", |ctx| {
            let config = DrawerConfig::from_values(&ctx.values);
            Drawer::attach(ctx.registry, Rc::clone(&ctx.element), ctx.targets.first("toggle"), config)
        });
        app.register("quick-replies", |ctx| {
            let targets = QuickRepliesTargets {
                container: ctx.targets.first("container"),
                extras: ctx.targets.all("extra"),
                icon: ctx.targets.first("icon"),
                toggle_button: ctx.targets.first("toggleBtn"),
            };
            QuickReplies::attach(ctx.registry, targets, QuickRepliesConfig::from_values(&ctx.values))
        });
        app
    }

    /// Register (or replace) the factory for `identifier`.
    pub fn register<C, F>(&mut self, identifier: &str, factory: F)
    where
        C: Controller + 'static,
        F: Fn(&Context<'_>) -> Rc<C> + 'static,
    {
        let factory: Factory = Box::new(move |ctx: &Context<'_>| factory(ctx) as Rc<dyn Controller>);
        self.factories.retain(|(id, _)| id != identifier);
        self.factories.push((identifier.to_owned(), factory));
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Bind the whole document and start translating document-level
    /// `drawer:*` events into bus commands. Returns the number of
    /// controllers connected.
    pub fn start(&self) -> usize {
        self.listen_for_drawer_commands();
        let Some(root) = self.registry.document.root() else {
            tracing::warn!("document has no root element");
            return 0;
        };
        let connected = self.connect(&root);
        tracing::info!(controllers = connected, "application started");
        connected
    }

    /// Bind `root` and its descendants. Returns the number of controllers
    /// connected.
    pub fn connect(&self, root: &ElementRef) -> usize {
        self.prune();
        let scope = std::iter::once(Rc::clone(root)).chain(root.descendants()).collect::<Vec<_>>();
        let mut connected = 0;
        for element in &scope {
            let Some(declared) = element.attribute("data-controller") else {
                continue;
            };
            for identifier in declared.split_whitespace() {
                match self.instantiate(identifier, element) {
                    Ok(controller) => {
                        self.bindings.borrow_mut().push(Binding {
                            identifier: identifier.to_owned(),
                            element: Rc::clone(element),
                            controller,
                        });
                        connected += 1;
                    }
                    Err(err) => tracing::warn!(error = %err, "controller skipped"),
                }
            }
        }
        for element in &scope {
            self.bind_actions(element);
        }
        connected
    }

    /// Identifiers of connected controllers, in connection order.
    #[must_use]
    pub fn bound_identifiers(&self) -> Vec<String> {
        self.bindings.borrow().iter().map(|b| b.identifier.clone()).collect()
    }

    /// Drop finished controllers and the action listeners routed to them.
    /// Returns the number of controllers dropped.
    pub fn prune(&self) -> usize {
        let finished = {
            let mut bindings = self.bindings.borrow_mut();
            let (finished, live): (Vec<_>, Vec<_>) =
                bindings.drain(..).partition(|binding| binding.controller.is_finished());
            *bindings = live;
            finished
        };
        for binding in &finished {
            binding.controller.detach();
            tracing::debug!(controller = %binding.identifier, "finished controller dropped");
        }
        let dropped = finished.len();
        drop(finished);

        self.listeners.borrow_mut().retain(|listener| {
            if listener.is_stale() {
                listener.element.unlisten(listener.id);
                return false;
            }
            true
        });
        dropped
    }

    /// Detach every controller and remove every listener this application
    /// installed.
    pub fn stop(&self) {
        for listener in self.listeners.take() {
            listener.element.unlisten(listener.id);
        }
        for id in self.document_listeners.take() {
            self.registry.document.unlisten(id);
        }
        let bindings = self.bindings.take();
        for binding in &bindings {
            binding.controller.detach();
        }
        tracing::debug!(controllers = bindings.len(), "application stopped");
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn instantiate(&self, identifier: &str, element: &ElementRef) -> Result<Rc<dyn Controller>, BindingError> {
        let (_, factory) = self
            .factories
            .iter()
            .find(|(id, _)| id == identifier)
            .ok_or_else(|| BindingError::UnknownController(identifier.to_owned()))?;
        let context = Context {
            registry: &self.registry,
            identifier,
            element: Rc::clone(element),
            targets: Targets::collect(identifier, element),
            values: Values::from_attributes(identifier, &element.attributes()),
        };
        let controller = factory(&context);
        tracing::debug!(controller = identifier, "controller connected");
        Ok(controller)
    }

    fn bind_actions(&self, element: &ElementRef) {
        let Some(declared) = element.attribute("data-action") else {
            return;
        };
        for parsed in ActionDescriptor::parse_list(&declared) {
            let descriptor = match parsed {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    tracing::warn!(error = %err, "action skipped");
                    continue;
                }
            };
            let Some(controller) = self.resolve_controller(&descriptor.controller, &**element) else {
                let err = BindingError::UnknownController(descriptor.controller.clone());
                tracing::warn!(action = %descriptor, error = %err, "action skipped");
                continue;
            };
            let event = descriptor.event_for(&**element);
            let weak = Rc::downgrade(&controller);
            let id = element.listen(&event, action_handler(&weak, descriptor, Rc::clone(element)));
            self.listeners.borrow_mut().push(ActionListener { element: Rc::clone(element), id, controller: weak });
        }
    }

    /// Innermost enclosing controller named `identifier`, else the first one
    /// on the page.
    fn resolve_controller(&self, identifier: &str, element: &dyn Element) -> Option<Rc<dyn Controller>> {
        let bindings = self.bindings.borrow();
        let mut named = bindings.iter().filter(|b| b.identifier == identifier).peekable();
        let first = named.peek().map(|b| Rc::clone(&b.controller));
        named
            .filter(|b| b.scope_contains(element))
            .last()
            .map(|b| Rc::clone(&b.controller))
            .or(first)
    }

    fn listen_for_drawer_commands(&self) {
        for name in ["drawer:open", "drawer:close", "drawer:toggle"] {
            let bus = self.registry.bus.clone();
            let id = self.registry.document.listen(
                name,
                Rc::new(move |event: &DomEvent| {
                    let Some(command) = DrawerCommand::from_event_name(&event.kind) else {
                        return;
                    };
                    let target = event
                        .detail
                        .as_ref()
                        .and_then(|detail| detail.get("id"))
                        .and_then(serde_json::Value::as_str);
                    match target {
                        Some(id) => bus.publish(&UiEvent::DrawerCommand { id: id.to_owned(), command }),
                        None => tracing::debug!(event = %event.kind, "drawer command without id ignored"),
                    }
                }),
            );
            self.document_listeners.borrow_mut().push(id);
        }
    }
}

fn action_handler(controller: &Weak<dyn Controller>, descriptor: ActionDescriptor, source: ElementRef) -> EventHandler {
    let controller = Weak::clone(controller);
    Rc::new(move |event: &DomEvent| {
        let Some(controller) = controller.upgrade() else {
            return;
        };
        let params = Values::from_params(&descriptor.controller, &source.attributes());
        let call = ActionCall { event, source: &source, params: &params };
        if !controller.invoke(&descriptor.method, &call) {
            tracing::warn!(action = %descriptor, "controller has no such method");
        }
    })
}

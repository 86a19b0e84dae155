//! Typed publish/subscribe channel between behavior units.
//!
//! DESIGN
//! ======
//! Every notification a behavior unit emits or consumes is a [`UiEvent`]
//! variant, so subscribers match on types instead of event-name strings.
//! Each event also has a DOM name and JSON detail, used when the same
//! notification is re-dispatched as a bubbling custom event for listeners
//! outside this crate.
//!
//! Subscriptions are RAII guards: dropping one unsubscribes.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::toast::ToastId;

/// Commands a drawer accepts from anywhere on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawerCommand {
    Open,
    Close,
    Toggle,
}

impl DrawerCommand {
    /// Parse the suffix of a `drawer:<command>` event name.
    #[must_use]
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name.strip_prefix("drawer:")? {
            "open" => Some(Self::Open),
            "close" => Some(Self::Close),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A toast began its exit.
    ToastDismissed { toast: ToastId },
    /// A tab group showed a different panel.
    PanelChanged { group: String, panel_id: String },
    /// A drawer opened or closed.
    DrawerStateChanged { id: String, is_open: bool },
    /// A request for the drawer `id` to open, close or toggle.
    DrawerCommand { id: String, command: DrawerCommand },
    /// The page theme changed.
    ThemeChanged { theme: String },
}

impl UiEvent {
    /// Name used for the equivalent DOM custom event.
    #[must_use]
    pub fn dom_name(&self) -> &'static str {
        match self {
            Self::ToastDismissed { .. } => "toast:dismissed",
            Self::PanelChanged { .. } => "panel-switcher:changed",
            Self::DrawerStateChanged { .. } => "drawer:stateChange",
            Self::DrawerCommand { command: DrawerCommand::Open, .. } => "drawer:open",
            Self::DrawerCommand { command: DrawerCommand::Close, .. } => "drawer:close",
            Self::DrawerCommand { command: DrawerCommand::Toggle, .. } => "drawer:toggle",
            Self::ThemeChanged { .. } => "theme:changed",
        }
    }

    /// JSON payload for the DOM custom event's `detail`.
    #[must_use]
    pub fn detail(&self) -> serde_json::Value {
        match self {
            Self::ToastDismissed { toast } => json!({ "id": toast.to_string() }),
            Self::PanelChanged { panel_id, .. } => json!({ "panelId": panel_id }),
            Self::DrawerStateChanged { id, is_open } => json!({ "id": id, "isOpen": is_open }),
            Self::DrawerCommand { id, .. } => json!({ "id": id }),
            Self::ThemeChanged { theme } => json!({ "theme": theme }),
        }
    }
}

// =============================================================================
// BUS
// =============================================================================

type Handler = Rc<dyn Fn(&UiEvent)>;

#[derive(Default)]
struct BusInner {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(u64, Handler)>>,
}

/// Cheaply cloneable handle to a shared event bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every published event until the returned
    /// guard is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, handler: impl Fn(&UiEvent) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.handlers.borrow_mut().push((id, Rc::new(handler)));
        Subscription { bus: Rc::downgrade(&self.inner), id }
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    ///
    /// Handlers may publish or (un)subscribe re-entrantly; they see the
    /// subscriber list as it was when this call started.
    pub fn publish(&self, event: &UiEvent) {
        let handlers = self
            .inner
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect::<Vec<_>>();
        tracing::trace!(event = event.dom_name(), subscribers = handlers.len(), "publish");
        for handler in handlers {
            handler(event);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }
}

/// Guard returned by [`EventBus::subscribe`].
pub struct Subscription {
    bus: Weak<BusInner>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.handlers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

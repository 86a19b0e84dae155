//! Drawer open/closed state synced through a checkbox toggle.
//!
//! The drawer's visible state is the `checked` flag of its toggle input, as
//! in a CSS-only drawer. This unit writes that flag, optionally mirrors it to
//! storage, and tells the rest of the page about every change.
//!
//! TRADE-OFFS
//! ==========
//! Persistence is best-effort. Storage failures and corrupted stored values
//! are logged at `debug` and otherwise ignored; the drawer keeps working
//! with in-memory state only.

#[cfg(test)]
#[path = "drawer_test.rs"]
mod drawer_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::binding::{ActionCall, Controller};
use crate::config::DrawerConfig;
use crate::events::{DrawerCommand, Subscription, UiEvent};
use crate::host::ElementRef;
use crate::registry::Registry;

/// Storage key prefix; the full key is `drawer:<persistKey|id|toggle id>`.
pub const STORAGE_PREFIX: &str = "drawer:";

pub struct Drawer {
    registry: Registry,
    element: ElementRef,
    toggle: Option<ElementRef>,
    config: DrawerConfig,
    commands: RefCell<Option<Subscription>>,
}

impl Drawer {
    /// Restore persisted state (when enabled) and start listening for
    /// `DrawerCommand`s addressed to this drawer.
    #[must_use]
    pub fn attach(registry: &Registry, element: ElementRef, toggle: Option<ElementRef>, config: DrawerConfig) -> Rc<Self> {
        let drawer = Rc::new_cyclic(|this: &Weak<Self>| {
            let this = this.clone();
            let commands = registry.bus.subscribe(move |event| {
                if let (UiEvent::DrawerCommand { id, command }, Some(drawer)) = (event, this.upgrade()) {
                    drawer.handle_command(id, *command);
                }
            });
            Self { registry: registry.clone(), element, toggle, config, commands: RefCell::new(Some(commands)) }
        });
        if drawer.config.persist && drawer.toggle.is_some() {
            drawer.restore_state();
        }
        tracing::debug!(drawer_id = ?drawer.drawer_id(), persist = drawer.config.persist, "drawer attached");
        drawer
    }

    /// Identity on the bus: the configured id, else the toggle's element id.
    #[must_use]
    pub fn drawer_id(&self) -> Option<String> {
        self.config.id.clone().or_else(|| {
            self.toggle
                .as_ref()
                .map(|toggle| toggle.id())
                .filter(|id| !id.is_empty())
        })
    }

    #[must_use]
    pub fn storage_key(&self) -> Option<String> {
        self.config
            .persist_key
            .clone()
            .or_else(|| self.config.id.clone())
            .or_else(|| self.toggle.as_ref().map(|toggle| toggle.id()).filter(|id| !id.is_empty()))
            .map(|suffix| format!("{STORAGE_PREFIX}{suffix}"))
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.resolve_toggle(None).is_some_and(|toggle| toggle.checked())
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Open the drawer. `explicit_id` names a toggle elsewhere in the
    /// document and takes precedence over this drawer's own toggle.
    pub fn open(&self, explicit_id: Option<&str>) {
        self.set_open(explicit_id, |_| true);
    }

    pub fn close(&self, explicit_id: Option<&str>) {
        self.set_open(explicit_id, |_| false);
    }

    pub fn toggle(&self, explicit_id: Option<&str>) {
        self.set_open(explicit_id, |open| !open);
    }

    /// The toggle input changed directly.
    pub fn handle_change(&self, checked: bool) {
        self.save_state(checked);
        self.notify(checked);
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn set_open(&self, explicit_id: Option<&str>, next: impl FnOnce(bool) -> bool) {
        let Some(toggle) = self.resolve_toggle(explicit_id) else {
            tracing::debug!(drawer_id = ?self.drawer_id(), explicit_id = ?explicit_id, "drawer has no toggle");
            return;
        };
        let is_open = next(toggle.checked());
        toggle.set_checked(is_open);
        self.save_state(is_open);
        self.notify(is_open);
    }

    fn resolve_toggle(&self, explicit_id: Option<&str>) -> Option<ElementRef> {
        if let Some(id) = explicit_id.filter(|id| !id.is_empty()) {
            return self.registry.document.element_by_id(id);
        }
        if let Some(toggle) = &self.toggle {
            return Some(Rc::clone(toggle));
        }
        self.config.id.as_deref().and_then(|id| self.registry.document.element_by_id(id))
    }

    fn handle_command(&self, id: &str, command: DrawerCommand) {
        if self.drawer_id().as_deref() != Some(id) {
            return;
        }
        match command {
            DrawerCommand::Open => self.open(None),
            DrawerCommand::Close => self.close(None),
            DrawerCommand::Toggle => self.toggle(None),
        }
    }

    fn notify(&self, is_open: bool) {
        let event = UiEvent::DrawerStateChanged { id: self.drawer_id().unwrap_or_default(), is_open };
        self.registry.notify(&*self.element, &event);
    }

    fn save_state(&self, is_open: bool) {
        if !self.config.persist {
            return;
        }
        let Some(key) = self.storage_key() else {
            return;
        };
        if let Err(err) = self.registry.storage.set(&key, if is_open { "true" } else { "false" }) {
            tracing::debug!(key = %key, error = %err, "drawer state not saved");
        }
    }

    fn restore_state(&self) {
        let (Some(key), Some(toggle)) = (self.storage_key(), &self.toggle) else {
            return;
        };
        let stored = match self.registry.storage.get(&key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return,
            Err(err) => {
                tracing::debug!(key = %key, error = %err, "drawer state not restored");
                return;
            }
        };
        match serde_json::from_str::<bool>(&stored) {
            Ok(is_open) => toggle.set_checked(is_open),
            Err(err) => tracing::debug!(key = %key, stored = %stored, error = %err, "corrupted drawer state ignored"),
        }
    }
}

impl Controller for Drawer {
    fn invoke(&self, method: &str, call: &ActionCall<'_>) -> bool {
        let explicit_id = call.params.non_empty("id");
        match method {
            "open" => self.open(explicit_id),
            "close" => self.close(explicit_id),
            "toggle" => self.toggle(explicit_id),
            "handleChange" => self.handle_change(call.event.checked.unwrap_or_else(|| call.source.checked())),
            _ => return false,
        }
        true
    }

    fn detach(&self) {
        drop(self.commands.take());
    }
}

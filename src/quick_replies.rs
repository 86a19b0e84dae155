//! Expand/collapse for the overflow items of a quick-replies list.
//!
//! Collapsing animates `max-height` first and hides the extra items only
//! after the transition. That deferred hide is a cancellable task; expanding
//! again before it fires cancels it, so a quick collapse-expand never ends
//! with the extras hidden inside an open container.

#[cfg(test)]
#[path = "quick_replies_test.rs"]
mod quick_replies_test;

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::binding::{ActionCall, Controller};
use crate::config::{DEFAULT_HIDDEN_CLASS, QuickRepliesConfig};
use crate::host::{ElementRef, TaskId};
use crate::registry::Registry;

/// Delay before collapsed extras are hidden; matches the CSS transition.
pub const HIDE_DELAY_MS: u32 = 300;

const ICON_EXPANDED_CLASS: &str = "rotate-180";

#[derive(Default, Clone)]
pub struct QuickRepliesTargets {
    pub container: Option<ElementRef>,
    pub extras: Vec<ElementRef>,
    pub icon: Option<ElementRef>,
    pub toggle_button: Option<ElementRef>,
}

pub struct QuickReplies {
    this: Weak<QuickReplies>,
    registry: Registry,
    targets: QuickRepliesTargets,
    config: QuickRepliesConfig,
    expanded: Cell<bool>,
    pending_hide: Cell<Option<TaskId>>,
}

impl QuickReplies {
    /// Attach in the collapsed state. Markup is left as rendered.
    #[must_use]
    pub fn attach(registry: &Registry, targets: QuickRepliesTargets, config: QuickRepliesConfig) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            registry: registry.clone(),
            targets,
            config,
            expanded: Cell::new(false),
            pending_hide: Cell::new(None),
        })
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded.get()
    }

    pub fn toggle(&self) {
        if self.expanded.get() {
            self.collapse();
        } else {
            self.expand();
        }
    }

    pub fn expand(&self) {
        self.expanded.set(true);
        self.cancel_pending_hide();
        for extra in &self.targets.extras {
            extra.remove_class(DEFAULT_HIDDEN_CLASS);
        }
        if let Some(container) = &self.targets.container {
            container.set_style("max-height", &format!("{}px", container.scroll_height()));
        }
        if let Some(icon) = &self.targets.icon {
            icon.add_class(ICON_EXPANDED_CLASS);
        }
        if let Some(button) = &self.targets.toggle_button {
            button.set_attribute("title", &self.config.collapse_label);
        }
    }

    pub fn collapse(&self) {
        self.expanded.set(false);
        if let Some(container) = &self.targets.container {
            container.set_style("max-height", &self.config.collapsed_height);
        }

        self.cancel_pending_hide();
        let this = self.this.clone();
        let task = self.registry.scheduler.set_timeout(
            HIDE_DELAY_MS,
            Box::new(move || {
                if let Some(this) = this.upgrade() {
                    this.pending_hide.set(None);
                    for extra in &this.targets.extras {
                        extra.add_class(DEFAULT_HIDDEN_CLASS);
                    }
                }
            }),
        );
        self.pending_hide.set(Some(task));

        if let Some(icon) = &self.targets.icon {
            icon.remove_class(ICON_EXPANDED_CLASS);
        }
        if let Some(button) = &self.targets.toggle_button {
            button.set_attribute("title", &self.config.expand_label);
        }
    }

    fn cancel_pending_hide(&self) {
        if let Some(task) = self.pending_hide.take() {
            self.registry.scheduler.cancel(task);
        }
    }
}

impl Controller for QuickReplies {
    fn invoke(&self, method: &str, _call: &ActionCall<'_>) -> bool {
        match method {
            "toggle" => self.toggle(),
            "expand" => self.expand(),
            "collapse" => self.collapse(),
            _ => return false,
        }
        true
    }

    fn detach(&self) {
        self.cancel_pending_hide();
    }
}

//! Tab group with exactly one visible panel.
//!
//! DESIGN
//! ======
//! Tabs and panels are matched by a panel id read from markup
//! (`data-panel-switcher-id-param` or `data-panel-switcher-id` on tabs,
//! `data-panel-switcher-id` on panels) and may live anywhere under the root.
//! The active id is held here, not inferred from classes, so it always names
//! a known panel.
//!
//! Initial selection precedence: a tab already carrying the active classes
//! (server-rendered state), then the configured default, then the first
//! tab. The initial application is silent; only explicit `show` calls
//! notify.
//!
//! Keyboard navigation follows the WAI-ARIA tabs pattern with a roving
//! `tabindex`: arrows move with wraparound, Home/End jump to the ends.

#[cfg(test)]
#[path = "panel_switcher_test.rs"]
mod panel_switcher_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::binding::{ActionCall, Controller};
use crate::config::PanelSwitcherConfig;
use crate::events::UiEvent;
use crate::host::{DomEvent, Element, ElementRef, ListenerId, add_classes, has_classes, remove_classes};
use crate::registry::Registry;

const TAB_PARAM_ATTR: &str = "data-panel-switcher-id-param";
const PANEL_ID_ATTR: &str = "data-panel-switcher-id";

/// Panel id a tab points at, if it declares one.
#[must_use]
pub fn tab_panel_id(tab: &dyn Element) -> Option<String> {
    [TAB_PARAM_ATTR, PANEL_ID_ATTR]
        .into_iter()
        .filter_map(|attr| tab.attribute(attr))
        .map(|id| id.trim().to_owned())
        .find(|id| !id.is_empty())
}

fn panel_id(panel: &dyn Element) -> Option<String> {
    panel.attribute(PANEL_ID_ATTR).map(|id| id.trim().to_owned()).filter(|id| !id.is_empty())
}

/// How a caller identifies the tab to switch to.
#[derive(Clone, Copy)]
pub enum TabRef<'a> {
    PanelId(&'a str),
    Element(&'a dyn Element),
}

struct Entry {
    panel_id: String,
    element: ElementRef,
}

/// Where keyboard navigation moves focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Previous,
    Next,
    First,
    Last,
}

impl Step {
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "ArrowUp" => Some(Self::Previous),
            "ArrowRight" | "ArrowDown" => Some(Self::Next),
            "Home" => Some(Self::First),
            "End" => Some(Self::Last),
            _ => None,
        }
    }

    /// Target index among `len` tabs, wrapping at both ends.
    #[must_use]
    pub fn apply(self, current: usize, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let current = current.min(len - 1);
        Some(match self {
            Self::Previous => (current + len - 1) % len,
            Self::Next => (current + 1) % len,
            Self::First => 0,
            Self::Last => len - 1,
        })
    }
}

pub struct PanelSwitcher {
    this: Weak<PanelSwitcher>,
    registry: Registry,
    root: ElementRef,
    group: String,
    config: PanelSwitcherConfig,
    tabs: Vec<Entry>,
    panels: Vec<Entry>,
    active: RefCell<Option<String>>,
    listeners: RefCell<Vec<(ElementRef, ListenerId)>>,
}

impl PanelSwitcher {
    /// Wire `tabs` and `panels` under `root` and resolve the initial panel.
    ///
    /// Tabs and panels without a panel id are ignored.
    #[must_use]
    pub fn attach(
        registry: &Registry,
        root: ElementRef,
        tabs: Vec<ElementRef>,
        panels: Vec<ElementRef>,
        config: PanelSwitcherConfig,
    ) -> Rc<Self> {
        let tabs = tabs
            .into_iter()
            .filter_map(|element| tab_panel_id(&*element).map(|panel_id| Entry { panel_id, element }))
            .collect::<Vec<_>>();
        let panels = panels
            .into_iter()
            .filter_map(|element| panel_id(&*element).map(|panel_id| Entry { panel_id, element }))
            .collect::<Vec<_>>();
        let group = match root.id() {
            id if id.is_empty() => registry.next_id("panel-switcher"),
            id => id,
        };

        let switcher = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            registry: registry.clone(),
            root,
            group,
            config,
            tabs,
            panels,
            active: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        });
        switcher.wire_accessibility();
        switcher.install_keyboard();
        switcher.initialize();
        tracing::debug!(
            group = %switcher.group,
            tabs = switcher.tabs.len(),
            panels = switcher.panels.len(),
            active = ?switcher.active_panel_id(),
            "panel switcher attached"
        );
        switcher
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn active_panel_id(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    /// Panel ids in tab order.
    #[must_use]
    pub fn tab_panel_ids(&self) -> Vec<String> {
        self.tabs.iter().map(|tab| tab.panel_id.clone()).collect()
    }

    /// Activate `panel_id` and notify. Unknown ids are ignored.
    pub fn show(&self, panel_id: &str) {
        if !self.has_panel(panel_id) {
            tracing::debug!(group = %self.group, panel_id, "unknown panel ignored");
            return;
        }
        self.apply(panel_id);
        let event = UiEvent::PanelChanged { group: self.group.clone(), panel_id: panel_id.to_owned() };
        self.registry.notify(&*self.root, &event);
    }

    /// Resolve `tab` to a panel id and [`show`](Self::show) it.
    pub fn switch_from_tab(&self, tab: TabRef<'_>) {
        let panel_id = match tab {
            TabRef::PanelId(id) => Some(id.trim().to_owned()).filter(|id| !id.is_empty()),
            TabRef::Element(element) => self
                .tabs
                .iter()
                .find(|entry| entry.element.same_node(element))
                .map(|entry| entry.panel_id.clone())
                .or_else(|| tab_panel_id(element)),
        };
        match panel_id {
            Some(id) => self.show(&id),
            None => tracing::debug!(group = %self.group, "tab without panel id ignored"),
        }
    }

    /// Move focus and selection from the tab at `from` by `step`.
    pub fn navigate(&self, from: usize, step: Step) {
        let Some(index) = step.apply(from, self.tabs.len()) else {
            return;
        };
        let Some(entry) = self.tabs.get(index) else {
            return;
        };
        entry.element.focus();
        let panel_id = entry.panel_id.clone();
        self.show(&panel_id);
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn has_panel(&self, panel_id: &str) -> bool {
        self.panels.iter().any(|panel| panel.panel_id == panel_id)
    }

    fn initialize(&self) {
        let preselected = self
            .tabs
            .iter()
            .find(|tab| has_classes(&*tab.element, &self.config.active_class))
            .map(|tab| tab.panel_id.as_str())
            .filter(|id| self.has_panel(id));
        let configured = self.config.default_panel.as_deref().filter(|id| self.has_panel(id));
        let first = self.tabs.iter().map(|tab| tab.panel_id.as_str()).find(|id| self.has_panel(id));

        if let Some(panel_id) = preselected.or(configured).or(first) {
            let panel_id = panel_id.to_owned();
            self.apply(&panel_id);
        }
    }

    fn apply(&self, panel_id: &str) {
        *self.active.borrow_mut() = Some(panel_id.to_owned());
        for tab in &self.tabs {
            let active = tab.panel_id == panel_id;
            if active {
                add_classes(&*tab.element, &self.config.active_class);
            } else {
                remove_classes(&*tab.element, &self.config.active_class);
            }
            tab.element.set_attribute("aria-selected", bool_attr(active));
            tab.element.set_attribute("tabindex", if active { "0" } else { "-1" });
        }
        for panel in &self.panels {
            let visible = panel.panel_id == panel_id;
            if visible {
                remove_classes(&*panel.element, &self.config.hidden_class);
            } else {
                add_classes(&*panel.element, &self.config.hidden_class);
            }
            panel.element.set_attribute("aria-hidden", bool_attr(!visible));
        }
    }

    fn wire_accessibility(&self) {
        if !self.tabs.is_empty() {
            self.root.set_attribute("role", "tablist");
        }
        for tab in &self.tabs {
            tab.element.set_attribute("role", "tab");
            ensure_id(&self.registry, &*tab.element, "panel-switcher-tab");
        }
        for panel in &self.panels {
            panel.element.set_attribute("role", "tabpanel");
            ensure_id(&self.registry, &*panel.element, "panel-switcher-panel");
            if let Some(tab) = self.tabs.iter().find(|tab| tab.panel_id == panel.panel_id) {
                panel.element.set_attribute("aria-labelledby", &tab.element.id());
            }
        }
        for tab in &self.tabs {
            if let Some(panel) = self.panels.iter().find(|panel| panel.panel_id == tab.panel_id) {
                tab.element.set_attribute("aria-controls", &panel.element.id());
            }
        }
    }

    fn install_keyboard(&self) {
        let mut listeners = self.listeners.borrow_mut();
        for (index, tab) in self.tabs.iter().enumerate() {
            let this = self.this.clone();
            let id = tab.element.listen(
                "keydown",
                Rc::new(move |event: &DomEvent| {
                    let Some(step) = event.key.as_deref().and_then(Step::from_key) else {
                        return;
                    };
                    event.prevent_default();
                    if let Some(this) = this.upgrade() {
                        this.navigate(index, step);
                    }
                }),
            );
            listeners.push((Rc::clone(&tab.element), id));
        }
    }
}

impl Controller for PanelSwitcher {
    fn invoke(&self, method: &str, call: &ActionCall<'_>) -> bool {
        match method {
            "switch" => match call.params.non_empty("id") {
                Some(id) => self.switch_from_tab(TabRef::PanelId(id)),
                None => self.switch_from_tab(TabRef::Element(&**call.source)),
            },
            "show" => match call.params.non_empty("id") {
                Some(id) => self.show(id),
                None => tracing::debug!(group = %self.group, "show without id param ignored"),
            },
            _ => return false,
        }
        true
    }

    fn detach(&self) {
        let listeners = self.listeners.take();
        for (element, id) in listeners {
            element.unlisten(id);
        }
    }
}

fn bool_attr(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn ensure_id(registry: &Registry, element: &dyn Element, prefix: &str) {
    if element.id().is_empty() {
        element.set_id(&registry.next_id(prefix));
    }
}

//! Light/dark theme switching.
//!
//! Reads the stored preference and applies a `data-theme` attribute to the
//! `<html>` element. Toggling writes the preference back and keeps every
//! other `.theme-controller` checkbox on the page in sync.
//!
//! TRADE-OFFS
//! ==========
//! Preference persistence is best-effort. Without a stored value (or with
//! storage blocked) the system `prefers-color-scheme` decides.

#[cfg(test)]
#[path = "theme_test.rs"]
mod theme_test;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::binding::{ActionCall, Controller};
use crate::events::UiEvent;
use crate::host::ElementRef;
use crate::registry::Registry;

pub const STORAGE_KEY: &str = "theme";

/// Class shared by every theme checkbox on the page.
pub const CHECKBOX_CLASS: &str = "theme-controller";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Night,
    Dawn,
}

impl Theme {
    #[must_use]
    pub fn from_dark(is_dark: bool) -> Self {
        if is_dark { Self::Night } else { Self::Dawn }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "celestia-night" => Some(Self::Night),
            "celestia-dawn" => Some(Self::Dawn),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Night => "celestia-night",
            Self::Dawn => "celestia-dawn",
        }
    }

    #[must_use]
    pub fn is_dark(self) -> bool {
        self == Self::Night
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct ThemeSwitcher {
    registry: Registry,
    checkbox: Option<ElementRef>,
    current: Cell<Theme>,
}

impl ThemeSwitcher {
    /// Apply the stored (or system) theme and sync `checkbox` to it.
    #[must_use]
    pub fn attach(registry: &Registry, checkbox: Option<ElementRef>) -> Rc<Self> {
        let theme = read_preference(registry);
        let switcher = Rc::new(Self { registry: registry.clone(), checkbox, current: Cell::new(theme) });
        switcher.apply(theme);
        if let Some(checkbox) = &switcher.checkbox {
            checkbox.set_checked(theme.is_dark());
        }
        tracing::debug!(theme = %theme, "theme applied");
        switcher
    }

    #[must_use]
    pub fn current(&self) -> Theme {
        self.current.get()
    }

    /// Switch to dark (`true`) or light, persist, and sync other checkboxes.
    pub fn toggle(&self, is_dark: bool) {
        let theme = Theme::from_dark(is_dark);
        self.current.set(theme);
        self.apply(theme);
        if let Err(err) = self.registry.storage.set(STORAGE_KEY, theme.name()) {
            tracing::debug!(error = %err, "theme preference not saved");
        }
        self.sync_checkboxes(is_dark);

        let event = UiEvent::ThemeChanged { theme: theme.name().to_owned() };
        match self.registry.document.root() {
            Some(root) => self.registry.notify(&*root, &event),
            None => self.registry.bus.publish(&event),
        }
    }

    fn apply(&self, theme: Theme) {
        if let Some(root) = self.registry.document.root() {
            root.set_attribute("data-theme", theme.name());
        }
    }

    fn sync_checkboxes(&self, is_dark: bool) {
        for checkbox in self.registry.document.elements_with_class(CHECKBOX_CLASS) {
            let own = self.checkbox.as_ref().is_some_and(|own| own.same_node(&*checkbox));
            if !own {
                checkbox.set_checked(is_dark);
            }
        }
    }
}

/// Stored theme, else the system preference.
#[must_use]
pub fn read_preference(registry: &Registry) -> Theme {
    match registry.storage.get(STORAGE_KEY) {
        Ok(Some(stored)) => {
            if let Some(theme) = Theme::from_name(&stored) {
                return theme;
            }
            tracing::debug!(stored = %stored, "unknown stored theme ignored");
        }
        Ok(None) => {}
        Err(err) => tracing::debug!(error = %err, "theme preference unavailable"),
    }
    Theme::from_dark(registry.document.prefers_dark())
}

impl Controller for ThemeSwitcher {
    fn invoke(&self, method: &str, call: &ActionCall<'_>) -> bool {
        match method {
            "toggle" => self.toggle(call.event.checked.unwrap_or_else(|| call.source.checked())),
            _ => return false,
        }
        true
    }

    fn detach(&self) {}
}

use std::cell::RefCell;

use super::*;
use crate::config::Values;
use crate::host::memory::MemoryElement;
use crate::host::{DomEvent, Element};

fn checkbox() -> Rc<MemoryElement> {
    MemoryElement::new("input").with_attr("type", "checkbox").with_class(CHECKBOX_CLASS)
}

#[test]
fn names_round_trip() {
    assert_eq!(Theme::from_name("celestia-night"), Some(Theme::Night));
    assert_eq!(Theme::from_name("celestia-dawn"), Some(Theme::Dawn));
    assert_eq!(Theme::from_name("dark"), None);
    assert_eq!(Theme::Night.to_string(), "celestia-night");
    assert!(Theme::from_dark(true).is_dark());
}

// =============================================================
// Attach
// =============================================================

#[test]
fn stored_theme_wins_over_system() {
    let (registry, host) = Registry::in_memory();
    host.storage.insert(STORAGE_KEY, "celestia-dawn");
    host.document.set_prefers_dark(true);
    let own = checkbox();
    own.set_checked(true);

    let switcher = ThemeSwitcher::attach(&registry, Some(own.handle()));
    assert_eq!(switcher.current(), Theme::Dawn);
    assert_eq!(host.document.html().attribute("data-theme").as_deref(), Some("celestia-dawn"));
    assert!(!own.checked());
}

#[test]
fn system_preference_is_the_fallback() {
    let (registry, host) = Registry::in_memory();
    host.document.set_prefers_dark(true);
    let switcher = ThemeSwitcher::attach(&registry, None);
    assert_eq!(switcher.current(), Theme::Night);
    assert_eq!(host.document.html().attribute("data-theme").as_deref(), Some("celestia-night"));
}

#[test]
fn unknown_or_unavailable_storage_falls_back() {
    let (registry, host) = Registry::in_memory();
    host.storage.insert(STORAGE_KEY, "solarized");
    assert_eq!(read_preference(&registry), Theme::Dawn);

    host.storage.insert(STORAGE_KEY, "celestia-night");
    host.storage.set_available(false);
    host.document.set_prefers_dark(false);
    assert_eq!(read_preference(&registry), Theme::Dawn);
}

// =============================================================
// Toggle
// =============================================================

#[test]
fn toggle_applies_persists_and_syncs_others() {
    let (registry, host) = Registry::in_memory();
    let own = checkbox();
    let other = checkbox();
    let unrelated = MemoryElement::new("input").with_attr("type", "checkbox");
    let body = host.document.body();
    body.append(&own);
    body.append(&other);
    body.append(&unrelated);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _sub = registry.bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    let switcher = ThemeSwitcher::attach(&registry, Some(own.handle()));
    switcher.toggle(true);

    assert_eq!(switcher.current(), Theme::Night);
    assert_eq!(host.document.html().attribute("data-theme").as_deref(), Some("celestia-night"));
    assert_eq!(host.storage.entry(STORAGE_KEY).as_deref(), Some("celestia-night"));
    assert!(other.checked());
    assert!(!own.checked());
    assert!(!unrelated.checked());
    assert_eq!(*seen.borrow(), vec![UiEvent::ThemeChanged { theme: "celestia-night".into() }]);
    assert_eq!(
        host.document.html().emitted(),
        vec![("theme:changed".to_owned(), serde_json::json!({ "theme": "celestia-night" }))]
    );
}

#[test]
fn toggle_action_reads_checkbox_state() {
    let (registry, host) = Registry::in_memory();
    let own = checkbox();
    host.document.body().append(&own);
    let switcher = ThemeSwitcher::attach(&registry, Some(own.handle()));

    own.set_checked(true);
    let event = DomEvent::new("change");
    let source = own.handle();
    let params = Values::new();
    assert!(switcher.invoke("toggle", &ActionCall { event: &event, source: &source, params: &params }));
    assert_eq!(switcher.current(), Theme::Night);

    let event = DomEvent::new("change").with_checked(false);
    assert!(switcher.invoke("toggle", &ActionCall { event: &event, source: &source, params: &params }));
    assert_eq!(switcher.current(), Theme::Dawn);
    assert!(!switcher.invoke("flip", &ActionCall { event: &event, source: &source, params: &params }));
}

#[test]
fn toggle_survives_blocked_storage() {
    let (registry, host) = Registry::in_memory();
    host.storage.set_available(false);
    let switcher = ThemeSwitcher::attach(&registry, None);
    switcher.toggle(true);
    assert_eq!(host.document.html().attribute("data-theme").as_deref(), Some("celestia-night"));
}

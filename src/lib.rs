//! Behavior units for server-rendered pages.
//!
//! Each unit attaches to markup that declares it with `data-controller` and
//! owns one piece of client-side behavior: a self-dismissing toast, an
//! accessible tab group, a drawer with remembered state, the light/dark
//! theme, a chat-style message panel and an expandable quick-replies list.
//! Units talk to the page only through the [`host`] traits, so every one of
//! them runs natively against the in-memory host in tests.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`binding`] | Markup scanning, controller factories and action routing |
//! | [`registry`] | Per-page services: host handles, event bus, id generator |
//! | [`events`] | Typed UI events and the in-process bus |
//! | [`config`] | Typed per-controller configuration with defaults |
//! | [`host`] | Element/document/storage/scheduler traits and hosts |
//! | [`toast`] | Toast lifecycle state machine and its DOM controller |
//! | [`panel_switcher`] | Tabs and panels with keyboard navigation |
//! | [`drawer`] | Checkbox-driven drawer with optional persistence |
//! | [`theme`] | Night/dawn theme preference |
//! | [`playground`] | Chat panel with a locked input while a reply is pending |
//! | [`quick_replies`] | Expand/collapse of overflow quick replies |
//! | [`error`] | Error types |

pub mod binding;
pub mod config;
pub mod drawer;
pub mod error;
pub mod events;
pub mod host;
pub mod panel_switcher;
pub mod playground;
pub mod quick_replies;
pub mod registry;
pub mod theme;
pub mod toast;

#[cfg(feature = "hydrate")]
mod start {
    use std::cell::RefCell;

    use wasm_bindgen::prelude::wasm_bindgen;

    use crate::binding::Application;
    use crate::registry::Registry;

    thread_local! {
        static APP: RefCell<Option<Application>> = const { RefCell::new(None) };
    }

    /// Browser entry point: bind every declared controller on the page.
    #[wasm_bindgen(start)]
    pub fn hydrate() {
        console_error_panic_hook::set_once();
        if let Err(err) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("logger already initialized: {err}").into());
        }

        let Some(registry) = Registry::browser() else {
            tracing::warn!("no browser window; behavior units not started");
            return;
        };
        let app = Application::with_defaults(registry);
        app.start();
        APP.with(|slot| *slot.borrow_mut() = Some(app));
    }
}

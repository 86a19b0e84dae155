//! Instance-scoped services handed to every behavior unit.
//!
//! DESIGN
//! ======
//! There are no module-level singletons. Generated ids, the event bus and
//! host handles all live in a [`Registry`] created once per page (or once per
//! test) and cloned into each controller at construction.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::cell::Cell;
use std::rc::Rc;

use crate::events::{EventBus, UiEvent};
use crate::host::memory::{ManualScheduler, MemoryDocument, MemoryStorage};
use crate::host::{Document, Element, Scheduler, Storage};

/// Monotonic counter for generated element ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: Cell<u64>,
}

impl IdGenerator {
    /// Next id of the form `<prefix>-<n>`.
    pub fn next(&self, prefix: &str) -> String {
        let n = self.next.get() + 1;
        self.next.set(n);
        format!("{prefix}-{n}")
    }
}

#[derive(Clone)]
pub struct Registry {
    pub document: Rc<dyn Document>,
    pub storage: Rc<dyn Storage>,
    pub scheduler: Rc<dyn Scheduler>,
    pub bus: EventBus,
    ids: Rc<IdGenerator>,
}

impl Registry {
    #[must_use]
    pub fn new(document: Rc<dyn Document>, storage: Rc<dyn Storage>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self { document, storage, scheduler, bus: EventBus::new(), ids: Rc::new(IdGenerator::default()) }
    }

    /// Registry over a fresh in-memory document, storage and manual
    /// scheduler, with concrete handles returned for driving them.
    #[must_use]
    pub fn in_memory() -> (Self, MemoryHost) {
        let host = MemoryHost {
            document: Rc::new(MemoryDocument::new()),
            storage: Rc::new(MemoryStorage::new()),
            scheduler: Rc::new(ManualScheduler::new()),
        };
        let registry = Self::new(
            Rc::clone(&host.document) as Rc<dyn Document>,
            Rc::clone(&host.storage) as Rc<dyn Storage>,
            Rc::clone(&host.scheduler) as Rc<dyn Scheduler>,
        );
        (registry, host)
    }

    /// Registry over the browser window's document, `localStorage` and
    /// animation frames. `None` outside a window context.
    #[cfg(feature = "hydrate")]
    #[must_use]
    pub fn browser() -> Option<Self> {
        let window = web_sys::window()?;
        let document = crate::host::web::WebDocument::new(window.clone())?;
        Some(Self::new(
            Rc::new(document),
            Rc::new(crate::host::web::LocalStorage::new(window.clone())),
            Rc::new(crate::host::web::BrowserScheduler::new(window)),
        ))
    }

    pub fn next_id(&self, prefix: &str) -> String {
        self.ids.next(prefix)
    }

    /// Publish `event` on the bus and re-dispatch it from `element` as a
    /// bubbling DOM custom event.
    pub fn notify(&self, element: &dyn Element, event: &UiEvent) {
        element.emit(event.dom_name(), &event.detail());
        self.bus.publish(event);
    }
}

/// Concrete in-memory host handles paired with [`Registry::in_memory`].
pub struct MemoryHost {
    pub document: Rc<MemoryDocument>,
    pub storage: Rc<MemoryStorage>,
    pub scheduler: Rc<ManualScheduler>,
}

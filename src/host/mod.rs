//! Host environment abstraction.
//!
//! SYSTEM CONTEXT
//! ==============
//! Behavior units never touch `web-sys` directly. They see the page through
//! four small traits: [`Element`] for a node they may mutate, [`Document`] for
//! lookups and document-wide listeners, [`Storage`] for the key-value store,
//! and [`Scheduler`] for time, animation frames and timeouts.
//!
//! [`memory`] implements all four in plain Rust for tests and server-side
//! use. `web` (hydrate only) implements them over the browser DOM.
//!
//! TRADE-OFFS
//! ==========
//! Element handles are `Rc<dyn Element>`, so identity is a host question
//! ([`Element::same_node`]) rather than pointer equality. Two handles may
//! wrap the same DOM node.

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;

pub mod memory;
#[cfg(feature = "hydrate")]
pub mod web;

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::StorageError;

/// Shared handle to a host element.
pub type ElementRef = Rc<dyn Element>;

/// Callback invoked for a DOM event.
pub type EventHandler = Rc<dyn Fn(&DomEvent)>;

/// Deferred unit of work owned by a [`Scheduler`].
pub type Task = Box<dyn FnOnce()>;

/// Handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Handle to a scheduled frame or timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

// =============================================================================
// EVENTS
// =============================================================================

/// Host-neutral view of a DOM event.
///
/// Clones share the `default_prevented` flag, so a handler calling
/// [`DomEvent::prevent_default`] on a clone is visible to the dispatcher.
#[derive(Clone, Default)]
pub struct DomEvent {
    pub kind: String,
    pub key: Option<String>,
    pub shift_key: bool,
    pub checked: Option<bool>,
    pub detail: Option<serde_json::Value>,
    default_prevented: Rc<Cell<bool>>,
}

impl DomEvent {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), ..Self::default() }
    }

    /// Keyboard event with the browser key name (`"ArrowRight"`, `"Enter"`).
    #[must_use]
    pub fn key(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self { key: Some(key.into()), ..Self::new(kind) }
    }

    #[must_use]
    pub fn with_shift(mut self, shift_key: bool) -> Self {
        self.shift_key = shift_key;
        self
    }

    #[must_use]
    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

impl fmt::Debug for DomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomEvent")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("shift_key", &self.shift_key)
            .field("checked", &self.checked)
            .field("detail", &self.detail)
            .field("default_prevented", &self.default_prevented.get())
            .finish()
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// A DOM node a behavior unit may read and mutate.
///
/// Mutations are infallible from the caller's point of view. Hosts swallow
/// and log whatever the underlying platform rejects.
pub trait Element {
    fn as_any(&self) -> &dyn Any;

    /// Whether `other` wraps the same underlying node.
    fn same_node(&self, other: &dyn Element) -> bool;

    /// Lowercase tag name (`"button"`, `"div"`).
    fn tag_name(&self) -> String;

    /// The `id` attribute, empty when absent.
    fn id(&self) -> String {
        self.attribute("id").unwrap_or_default()
    }

    fn set_id(&self, id: &str) {
        self.set_attribute("id", id);
    }

    fn attribute(&self, name: &str) -> Option<String>;
    fn set_attribute(&self, name: &str, value: &str);
    fn remove_attribute(&self, name: &str);

    /// All attributes in document order.
    fn attributes(&self) -> Vec<(String, String)>;

    fn has_class(&self, class: &str) -> bool;
    fn add_class(&self, class: &str);
    fn remove_class(&self, class: &str);

    fn style(&self, property: &str) -> Option<String>;
    fn set_style(&self, property: &str, value: &str);

    /// Checked state of a checkbox-like input; `false` for other nodes.
    fn checked(&self) -> bool;
    fn set_checked(&self, checked: bool);

    /// Current value of a text-like input; empty for other nodes.
    fn value(&self) -> String;
    fn set_value(&self, value: &str);

    fn set_disabled(&self, disabled: bool) {
        if disabled {
            self.set_attribute("disabled", "");
        } else {
            self.remove_attribute("disabled");
        }
    }

    fn is_disabled(&self) -> bool {
        self.attribute("disabled").is_some()
    }

    fn focus(&self);

    fn scroll_height(&self) -> i32;
    fn scroll_to_bottom(&self);

    /// Parse `html` and append it as the last children.
    fn append_html(&self, html: &str);

    /// Move `child` to the end of this node's children.
    fn append_child(&self, child: &dyn Element);

    /// Detach this node from its parent.
    fn remove(&self);

    /// All descendant elements in document order, excluding `self`.
    fn descendants(&self) -> Vec<ElementRef>;

    fn listen(&self, event: &str, handler: EventHandler) -> ListenerId;
    fn unlisten(&self, id: ListenerId);

    /// Dispatch a bubbling custom event carrying `detail`.
    fn emit(&self, name: &str, detail: &serde_json::Value);
}

/// Add every whitespace-separated token of `classes`.
pub fn add_classes(element: &dyn Element, classes: &str) {
    for class in classes.split_whitespace() {
        element.add_class(class);
    }
}

/// Remove every whitespace-separated token of `classes`.
pub fn remove_classes(element: &dyn Element, classes: &str) {
    for class in classes.split_whitespace() {
        element.remove_class(class);
    }
}

/// Whether the element carries every token of `classes`.
///
/// An empty class list never matches.
pub fn has_classes(element: &dyn Element, classes: &str) -> bool {
    let mut tokens = classes.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|class| element.has_class(class))
}

// =============================================================================
// DOCUMENT
// =============================================================================

pub trait Document {
    fn element_by_id(&self, id: &str) -> Option<ElementRef>;

    /// The `<html>` element.
    fn root(&self) -> Option<ElementRef>;

    fn elements_with_class(&self, class: &str) -> Vec<ElementRef>;

    /// Whether the user agent reports `prefers-color-scheme: dark`.
    fn prefers_dark(&self) -> bool;

    fn listen(&self, event: &str, handler: EventHandler) -> ListenerId;
    fn unlisten(&self, id: ListenerId);
}

// =============================================================================
// STORAGE
// =============================================================================

/// String key-value store (`localStorage` in the browser).
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

// =============================================================================
// SCHEDULER
// =============================================================================

/// Wall-clock hour and minute, used for message timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Monotonic clock plus cancellable deferred work.
///
/// Tasks never run synchronously inside `request_frame` or `set_timeout`,
/// so callers may hold their own borrows while scheduling.
pub trait Scheduler {
    /// Monotonic milliseconds.
    fn now(&self) -> f64;

    fn local_time(&self) -> ClockTime;

    /// Run `task` before the next repaint.
    fn request_frame(&self, task: Task) -> TaskId;

    /// Run `task` once after `delay_ms`.
    fn set_timeout(&self, delay_ms: u32, task: Task) -> TaskId;

    /// Cancel a pending task. Unknown or already-run ids are ignored.
    fn cancel(&self, id: TaskId);
}

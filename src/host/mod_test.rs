use std::cell::RefCell;
use std::rc::Rc;

use super::memory::{ManualScheduler, MemoryDocument, MemoryElement, MemoryStorage};
use super::*;

// =============================================================
// Class helpers
// =============================================================

#[test]
fn add_and_remove_classes_handle_token_lists() {
    let el = MemoryElement::new("div");
    add_classes(&*el, "tab-active  is-current");
    assert!(has_classes(&*el, "tab-active is-current"));

    remove_classes(&*el, "is-current");
    assert!(el.has_class("tab-active"));
    assert!(!el.has_class("is-current"));
}

#[test]
fn empty_class_list_never_matches() {
    let el = MemoryElement::new("div").with_class("hidden");
    assert!(!has_classes(&*el, "   "));
}

// =============================================================
// DomEvent
// =============================================================

#[test]
fn prevent_default_is_shared_between_clones() {
    let event = DomEvent::key("keydown", "Enter");
    let clone = event.clone();
    clone.prevent_default();
    assert!(event.default_prevented());
}

// =============================================================
// MemoryElement
// =============================================================

#[test]
fn class_attribute_mirrors_class_list() {
    let el = MemoryElement::new("div").with_class("a b");
    assert_eq!(el.attribute("class").as_deref(), Some("a b"));

    el.set_attribute("class", "c");
    assert_eq!(el.classes(), vec!["c".to_owned()]);
}

#[test]
fn descendants_are_in_document_order() {
    let inner = MemoryElement::new("span").with_id("inner");
    let first = MemoryElement::new("div").with_id("first").with_child(&inner);
    let second = MemoryElement::new("div").with_id("second");
    let root = MemoryElement::new("section").with_child(&first).with_child(&second);

    let ids = root.descendants().iter().map(|el| el.id()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["first", "inner", "second"]);
}

#[test]
fn append_child_moves_existing_node() {
    let indicator = MemoryElement::new("div");
    let a = MemoryElement::new("div").with_child(&indicator);
    let b = MemoryElement::new("div");

    b.append_child(&*indicator);
    assert!(a.children().is_empty());
    assert_eq!(b.children().len(), 1);
}

#[test]
fn remove_detaches_from_parent() {
    let child = MemoryElement::new("div");
    let parent = MemoryElement::new("div").with_child(&child);
    child.remove();
    assert!(child.is_removed());
    assert!(parent.children().is_empty());
}

#[test]
fn unlisten_stops_delivery() {
    let el = MemoryElement::new("button");
    let hits = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&hits);
    let id = el.listen("click", Rc::new(move |_| *counter.borrow_mut() += 1));

    el.dispatch(&DomEvent::new("click"));
    el.dispatch(&DomEvent::new("mouseenter"));
    el.unlisten(id);
    el.dispatch(&DomEvent::new("click"));

    assert_eq!(*hits.borrow(), 1);
    assert_eq!(el.listener_count(), 0);
}

#[test]
fn emit_records_and_bubbles() {
    let child = MemoryElement::new("div");
    let parent = MemoryElement::new("div").with_child(&child);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    parent.listen(
        "panel-switcher:changed",
        Rc::new(move |ev| sink.borrow_mut().push(ev.detail.clone())),
    );

    child.emit("panel-switcher:changed", &serde_json::json!({ "panelId": "b" }));

    assert_eq!(child.emitted().len(), 1);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn same_node_compares_identity() {
    let a = MemoryElement::new("div");
    let b = MemoryElement::new("div");
    let a_again: ElementRef = a.handle();
    assert!(a.same_node(&*a_again));
    assert!(!a.same_node(&*b));
}

// =============================================================
// MemoryDocument
// =============================================================

#[test]
fn document_finds_by_id_and_class() {
    let doc = MemoryDocument::new();
    let toggle = MemoryElement::new("input").with_id("nav").with_class("theme-controller");
    doc.body().append(&toggle);

    assert!(doc.element_by_id("nav").is_some());
    assert!(doc.element_by_id("missing").is_none());
    assert!(doc.element_by_id("").is_none());
    assert_eq!(doc.elements_with_class("theme-controller").len(), 1);
}

// =============================================================
// MemoryStorage
// =============================================================

#[test]
fn unavailable_storage_errors() {
    let storage = MemoryStorage::new();
    storage.set("k", "v").unwrap();
    assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));

    storage.set_available(false);
    assert_eq!(storage.get("k"), Err(crate::error::StorageError::Unavailable));
    assert!(storage.set("k", "w").is_err());
    assert_eq!(storage.entry("k").as_deref(), Some("v"));
}

// =============================================================
// ManualScheduler
// =============================================================

#[test]
fn tasks_run_in_due_order() {
    let scheduler = ManualScheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let l = Rc::clone(&log);
    scheduler.set_timeout(50, Box::new(move || l.borrow_mut().push("timeout")));
    let l = Rc::clone(&log);
    scheduler.request_frame(Box::new(move || l.borrow_mut().push("frame")));

    scheduler.advance(100.0);
    assert_eq!(*log.borrow(), vec!["frame", "timeout"]);
    assert!((scheduler.now() - 100.0).abs() < f64::EPSILON);
}

#[test]
fn cancelled_task_never_runs() {
    let scheduler = ManualScheduler::new();
    let ran = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&ran);
    let id = scheduler.set_timeout(10, Box::new(move || *flag.borrow_mut() = true));
    scheduler.cancel(id);
    scheduler.advance(20.0);
    assert!(!*ran.borrow());
    assert_eq!(scheduler.pending_tasks(), 0);
}

#[test]
fn clock_is_set_to_task_due_time_while_running() {
    let scheduler = Rc::new(ManualScheduler::new());
    let seen = Rc::new(RefCell::new(0.0));
    let s = Rc::clone(&scheduler);
    let out = Rc::clone(&seen);
    scheduler.set_timeout(30, Box::new(move || *out.borrow_mut() = s.now()));
    scheduler.advance(100.0);
    assert!((*seen.borrow() - 30.0).abs() < f64::EPSILON);
}

#[test]
fn clock_time_formats_as_hh_mm() {
    assert_eq!(ClockTime { hour: 7, minute: 5 }.to_string(), "07:05");
}

use std::cell::Cell;

use super::*;
use crate::host::memory::MemoryElement;
use crate::registry::MemoryHost;

/// Records every routed call as `element:method:event:item-param`.
struct Recorder {
    name: String,
    log: Rc<RefCell<Vec<String>>>,
    detached: Rc<Cell<usize>>,
}

impl Controller for Recorder {
    fn invoke(&self, method: &str, call: &ActionCall<'_>) -> bool {
        if method == "missing" {
            return false;
        }
        let item = call.params.string("item").unwrap_or("-");
        self.log
            .borrow_mut()
            .push(format!("{}:{method}:{}:{item}", self.name, call.event.kind));
        true
    }

    fn detach(&self) {
        self.detached.set(self.detached.get() + 1);
    }
}

/// Finishes when its `finish` action fires.
struct Oneshot {
    done: Rc<Cell<bool>>,
    detached: Rc<Cell<usize>>,
}

impl Controller for Oneshot {
    fn invoke(&self, method: &str, _call: &ActionCall<'_>) -> bool {
        if method != "finish" {
            return false;
        }
        self.done.set(true);
        true
    }

    fn detach(&self) {
        self.detached.set(self.detached.get() + 1);
    }

    fn is_finished(&self) -> bool {
        self.done.get()
    }
}

struct Fixture {
    host: MemoryHost,
    app: Application,
    log: Rc<RefCell<Vec<String>>>,
    detached: Rc<Cell<usize>>,
}

impl Fixture {
    fn new() -> Self {
        let (registry, host) = Registry::in_memory();
        let log = Rc::new(RefCell::new(Vec::new()));
        let detached = Rc::new(Cell::new(0));
        let mut app = Application::new(registry);
        let (factory_log, factory_detached) = (Rc::clone(&log), Rc::clone(&detached));
        app.register("recorder", move |ctx| {
            Rc::new(Recorder {
                name: ctx.element.id(),
                log: Rc::clone(&factory_log),
                detached: Rc::clone(&factory_detached),
            })
        });
        Self { host, app, log, detached }
    }

    fn mount(&self, element: &Rc<MemoryElement>) {
        self.host.document.body().append(element);
    }

    fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

fn recorder(id: &str) -> Rc<MemoryElement> {
    MemoryElement::new("div").with_id(id).with_attr("data-controller", "recorder")
}

fn action_button(action: &str) -> Rc<MemoryElement> {
    MemoryElement::new("button").with_attr("data-action", action)
}

// =============================================================
// Descriptors
// =============================================================

#[test]
fn descriptor_with_explicit_event() {
    let parsed = "mouseenter->toast#pause".parse::<ActionDescriptor>();
    assert_eq!(
        parsed,
        Ok(ActionDescriptor { event: Some("mouseenter".into()), controller: "toast".into(), method: "pause".into() })
    );
}

#[test]
fn descriptor_without_event() {
    let parsed = "drawer#open".parse::<ActionDescriptor>();
    assert_eq!(parsed, Ok(ActionDescriptor { event: None, controller: "drawer".into(), method: "open".into() }));
}

#[test]
fn descriptor_display_matches_source() {
    for token in ["click->panel-switcher#switch", "theme#toggle"] {
        let parsed = token.parse::<ActionDescriptor>().map(|d| d.to_string());
        assert_eq!(parsed.as_deref(), Ok(token));
    }
}

#[test]
fn malformed_descriptors_are_rejected() {
    for token in ["drawer", "->drawer#open", "click->#open", "click->drawer#", "a#b#c", "click->x->y#z"] {
        assert_eq!(
            token.parse::<ActionDescriptor>(),
            Err(BindingError::MalformedAction(token.to_owned())),
            "{token}"
        );
    }
}

#[test]
fn parse_list_keeps_valid_tokens_alongside_errors() {
    let parsed = ActionDescriptor::parse_list("  click->toast#dismiss   broken  keydown->playground#handleKeydown ");
    assert_eq!(parsed.len(), 3);
    assert!(parsed[0].is_ok());
    assert!(parsed[1].is_err());
    assert!(parsed[2].is_ok());
}

#[test]
fn default_event_follows_element_kind() {
    let cases = [
        (MemoryElement::new("button"), "click"),
        (MemoryElement::new("a"), "click"),
        (MemoryElement::new("div"), "click"),
        (MemoryElement::new("form"), "submit"),
        (MemoryElement::new("select"), "change"),
        (MemoryElement::new("textarea"), "input"),
        (MemoryElement::new("details"), "toggle"),
        (MemoryElement::new("input"), "input"),
        (MemoryElement::new("input").with_attr("type", "checkbox"), "change"),
        (MemoryElement::new("input").with_attr("type", "RADIO"), "change"),
        (MemoryElement::new("input").with_attr("type", "submit"), "click"),
        (MemoryElement::new("input").with_attr("type", "email"), "input"),
    ];
    for (element, expected) in cases {
        assert_eq!(default_event(&*element), expected, "{}", element.tag_name());
    }
}

// =============================================================
// Targets
// =============================================================

#[test]
fn targets_collect_scope_and_descendants_in_order() {
    let first = MemoryElement::new("button").with_attr("data-tabs-target", "tab");
    let both = MemoryElement::new("div").with_attr("data-tabs-target", "panel  tab");
    let foreign = MemoryElement::new("div").with_attr("data-drawer-target", "tab");
    let scope = MemoryElement::new("section")
        .with_attr("data-tabs-target", "root")
        .with_child(&first)
        .with_child(&both)
        .with_child(&foreign);

    let targets = Targets::collect("tabs", &scope.handle());

    let tabs = targets.all("tab");
    assert_eq!(tabs.len(), 2);
    assert!(tabs[0].same_node(&*first));
    assert!(tabs[1].same_node(&*both));
    assert!(targets.first("panel").is_some_and(|el| el.same_node(&*both)));
    assert!(targets.first("root").is_some_and(|el| el.same_node(&*scope)));
    assert!(targets.first("missing").is_none());
}

// =============================================================
// Connecting
// =============================================================

#[test]
fn start_connects_declared_controllers() {
    let fx = Fixture::new();
    fx.mount(&recorder("a"));
    fx.mount(&MemoryElement::new("div").with_id("b").with_attr("data-controller", "unknown recorder"));

    assert_eq!(fx.app.start(), 2);
    assert_eq!(fx.app.bound_identifiers(), vec!["recorder", "recorder"]);
}

#[test]
fn registering_twice_replaces_factory() {
    let (registry, host) = Registry::in_memory();
    let hits = Rc::new(Cell::new(0));
    let mut app = Application::new(registry);
    let detached = Rc::new(Cell::new(0));
    let log = Rc::new(RefCell::new(Vec::new()));
    let (first_log, first_detached) = (Rc::clone(&log), Rc::clone(&detached));
    app.register("recorder", move |_| {
        Rc::new(Recorder { name: "first".into(), log: Rc::clone(&first_log), detached: Rc::clone(&first_detached) })
    });
    let (second_hits, second_log, second_detached) = (Rc::clone(&hits), Rc::clone(&log), Rc::clone(&detached));
    app.register("recorder", move |_| {
        second_hits.set(second_hits.get() + 1);
        Rc::new(Recorder { name: "second".into(), log: Rc::clone(&second_log), detached: Rc::clone(&second_detached) })
    });
    host.document.body().append(&recorder("x"));

    assert_eq!(app.start(), 1);
    assert_eq!(hits.get(), 1);
}

#[test]
fn factory_reads_values_from_element() {
    let (registry, host) = Registry::in_memory();
    let seen = Rc::new(RefCell::new(None));
    let mut app = Application::new(registry);
    let captured = Rc::clone(&seen);
    app.register("recorder", move |ctx| {
        *captured.borrow_mut() = ctx.values.string("greeting").map(str::to_owned);
        Rc::new(Recorder { name: ctx.identifier.to_owned(), log: Rc::default(), detached: Rc::default() })
    });
    host.document.body().append(&recorder("x").with_attr("data-recorder-greeting-value", "hello"));

    app.start();
    assert_eq!(seen.borrow().as_deref(), Some("hello"));
}

#[test]
fn connect_binds_late_subtree() {
    let fx = Fixture::new();
    assert_eq!(fx.app.start(), 0);

    let button = action_button("recorder#ping");
    let late = recorder("late").with_child(&button);
    fx.mount(&late);
    assert_eq!(fx.app.connect(&late.handle()), 1);

    button.dispatch(&DomEvent::new("click"));
    assert_eq!(fx.calls(), vec!["late:ping:click:-"]);
}

// =============================================================
// Routing
// =============================================================

#[test]
fn action_routes_to_innermost_controller() {
    let fx = Fixture::new();
    let button = action_button("recorder#ping");
    let inner = recorder("inner").with_child(&button);
    fx.mount(&recorder("outer").with_child(&inner));
    fx.app.start();

    button.dispatch(&DomEvent::new("click"));
    assert_eq!(fx.calls(), vec!["inner:ping:click:-"]);
}

#[test]
fn action_outside_scope_uses_first_controller() {
    let fx = Fixture::new();
    fx.mount(&recorder("first"));
    fx.mount(&recorder("second"));
    let stray = action_button("recorder#ping");
    fx.mount(&stray);
    fx.app.start();

    stray.dispatch(&DomEvent::new("click"));
    assert_eq!(fx.calls(), vec!["first:ping:click:-"]);
}

#[test]
fn action_listens_on_declared_or_default_event() {
    let fx = Fixture::new();
    let input = MemoryElement::new("input")
        .with_attr("type", "checkbox")
        .with_attr("data-action", "recorder#changed mouseenter->recorder#hovered");
    fx.mount(&recorder("r").with_child(&input));
    fx.app.start();

    input.dispatch(&DomEvent::new("click"));
    assert!(fx.calls().is_empty());
    input.dispatch(&DomEvent::new("change"));
    input.dispatch(&DomEvent::new("mouseenter"));
    assert_eq!(fx.calls(), vec!["r:changed:change:-", "r:hovered:mouseenter:-"]);
}

#[test]
fn params_are_read_when_the_action_fires() {
    let fx = Fixture::new();
    let button = action_button("recorder#pick").with_attr("data-recorder-item-param", "one");
    fx.mount(&recorder("r").with_child(&button));
    fx.app.start();

    button.dispatch(&DomEvent::new("click"));
    button.set_attribute("data-recorder-item-param", "two");
    button.dispatch(&DomEvent::new("click"));
    assert_eq!(fx.calls(), vec!["r:pick:click:one", "r:pick:click:two"]);
}

#[test]
fn unknown_method_is_ignored() {
    let fx = Fixture::new();
    let button = action_button("recorder#missing");
    fx.mount(&recorder("r").with_child(&button));
    fx.app.start();

    button.dispatch(&DomEvent::new("click"));
    assert!(fx.calls().is_empty());
}

#[test]
fn actions_for_unbound_or_malformed_targets_install_nothing() {
    let fx = Fixture::new();
    let button = action_button("ghost#boo broken recorder#");
    fx.mount(&recorder("r"));
    fx.mount(&button);
    fx.app.start();

    assert_eq!(button.listener_count(), 0);
}

// =============================================================
// Document commands / teardown
// =============================================================

#[test]
fn document_drawer_events_become_bus_commands() {
    let fx = Fixture::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _sub = fx.app.registry().bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    fx.app.start();

    fx.host.document.dispatch(&DomEvent::new("drawer:open").with_detail(serde_json::json!({ "id": "nav" })));
    fx.host.document.dispatch(&DomEvent::new("drawer:toggle").with_detail(serde_json::json!({})));
    fx.host.document.dispatch(&DomEvent::new("drawer:close"));

    assert_eq!(*seen.borrow(), vec![UiEvent::DrawerCommand { id: "nav".into(), command: DrawerCommand::Open }]);
}

#[test]
fn stop_detaches_controllers_and_listeners() {
    let fx = Fixture::new();
    let button = action_button("recorder#ping");
    fx.mount(&recorder("a").with_child(&button));
    fx.mount(&recorder("b"));
    fx.app.start();
    assert_eq!(fx.host.document.listener_count(), 3);

    fx.app.stop();
    assert_eq!(fx.detached.get(), 2);
    assert_eq!(button.listener_count(), 0);
    assert_eq!(fx.host.document.listener_count(), 0);
    assert!(fx.app.bound_identifiers().is_empty());

    button.dispatch(&DomEvent::new("click"));
    assert!(fx.calls().is_empty());
}

// =============================================================
// Pruning
// =============================================================

fn with_oneshot(fx: &mut Fixture) -> Rc<Cell<bool>> {
    let done = Rc::new(Cell::new(false));
    let (flag, detached) = (Rc::clone(&done), Rc::clone(&fx.detached));
    fx.app.register("oneshot", move |_| Rc::new(Oneshot { done: Rc::clone(&flag), detached: Rc::clone(&detached) }));
    done
}

fn oneshot(child: &Rc<MemoryElement>) -> Rc<MemoryElement> {
    MemoryElement::new("div").with_attr("data-controller", "oneshot").with_child(child)
}

#[test]
fn prune_drops_finished_controllers_and_their_listeners() {
    let mut fx = Fixture::new();
    let done = with_oneshot(&mut fx);
    let finish = action_button("oneshot#finish");
    let ping = action_button("recorder#ping");
    fx.mount(&oneshot(&finish));
    fx.mount(&recorder("r").with_child(&ping));
    fx.app.start();
    assert_eq!(fx.app.prune(), 0);

    finish.dispatch(&DomEvent::new("click"));
    assert!(done.get());
    assert_eq!(fx.app.prune(), 1);
    assert_eq!(fx.detached.get(), 1);
    assert_eq!(fx.app.bound_identifiers(), vec!["recorder"]);
    assert_eq!(finish.listener_count(), 0);
    assert_eq!(ping.listener_count(), 1);

    ping.dispatch(&DomEvent::new("click"));
    assert_eq!(fx.calls(), vec!["r:ping:click:-"]);
}

#[test]
fn connect_prunes_before_binding() {
    let mut fx = Fixture::new();
    with_oneshot(&mut fx);
    let finish = action_button("oneshot#finish");
    fx.mount(&oneshot(&finish));
    fx.app.start();
    finish.dispatch(&DomEvent::new("click"));

    let late = recorder("late");
    fx.mount(&late);
    assert_eq!(fx.app.connect(&late.handle()), 1);
    assert_eq!(fx.app.bound_identifiers(), vec!["recorder"]);
    assert_eq!(finish.listener_count(), 0);
}

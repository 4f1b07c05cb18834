#![forbid(unsafe_code)]

//! End-to-end pipeline behavior: raw events in, committed focus, app state,
//! history and telemetry out.

use keyzone_core::{
    Context, Expr, InputEvent, ItemId, KeyCode, KeyEvent, Modifiers, PointerEvent, PointerKind,
    Rect, ZoneId,
};
use keyzone_runtime::builtin::ids;
use keyzone_runtime::{
    CommandDef, CommandError, Dispatch, Engine, Host, ItemSpec, KeymapConfig, Source, TabBehavior,
    ZoneConfig, ZoneSpec,
};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Default)]
struct Todos {
    items: Vec<String>,
    draft: String,
}

fn add() -> CommandDef<Todos> {
    CommandDef::pure("todo.add", |s: &Todos, p: &Value, _| {
        let mut next = s.clone();
        next.items
            .push(p["text"].as_str().unwrap_or("untitled").to_string());
        next
    })
}

fn type_char() -> CommandDef<Todos> {
    CommandDef::pure("draft.type", |s: &Todos, p: &Value, _| {
        let mut next = s.clone();
        next.draft.push_str(p["ch"].as_str().unwrap_or_default());
        next
    })
}

fn zid(s: &str) -> ZoneId {
    ZoneId::new(s)
}

fn list_engine(config: ZoneConfig) -> Engine<Todos> {
    let mut engine = Engine::new(Todos::default());
    engine.register_command(add()).unwrap();
    engine.register_command(type_char()).unwrap();
    let reg = engine.registry_mut();
    reg.register(ZoneSpec::new("root")).unwrap();
    reg.register(ZoneSpec::new("list").parent("root").config(config))
        .unwrap();
    reg.set_items(
        &zid("list"),
        vec![ItemSpec::new("a"), ItemSpec::new("b"), ItemSpec::new("c")],
    )
    .unwrap();
    reg.set_active_zone(Some(zid("list"))).unwrap();
    engine
}

fn focus(engine: &mut Engine<Todos>, id: &str) {
    let result = engine.dispatch(Dispatch::new(ids::FOCUS).payload(json!({ "id": id })));
    assert!(result.success);
}

fn focused(engine: &Engine<Todos>, zone: &str) -> Option<ItemId> {
    engine.registry().state(&zid(zone)).and_then(|s| s.focused.clone())
}

fn press(engine: &mut Engine<Todos>, code: KeyCode) -> bool {
    engine.handle(InputEvent::Key(KeyEvent::new(code))).handled
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn refocusing_focused_item_is_a_noop() {
    let mut engine = list_engine(ZoneConfig::list());
    focus(&mut engine, "b");
    let before = engine.snapshot();
    let version = engine.registry().store(&zid("list")).map(|s| s.version());
    let projections = engine.host().projections();

    let result = engine.dispatch(Dispatch::new(ids::FOCUS).payload(json!({ "id": "b" })));

    assert!(result.success);
    assert!(!result.changed);
    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.registry().store(&zid("list")).map(|s| s.version()), version);
    assert_eq!(engine.host().projections(), projections);
    assert_eq!(engine.history().undo_depth(), 0);
}

#[test]
fn refocusing_keeps_spatial_sticky_coordinate() {
    let mut engine = list_engine(ZoneConfig::spatial());
    let host = engine.host_mut();
    host.place("a", Rect::new(0, 0, 10, 10));
    host.place("b", Rect::new(0, 20, 10, 10));
    host.place("c", Rect::new(40, 0, 10, 10));
    focus(&mut engine, "a");
    assert!(press(&mut engine, KeyCode::Down));
    assert_eq!(focused(&engine, "list"), Some(ItemId::new("b")));
    let sticky_x = engine.registry().state(&zid("list")).and_then(|s| s.sticky_x);
    assert!(sticky_x.is_some());

    let before = engine.snapshot();
    let version = engine.registry().store(&zid("list")).map(|s| s.version());
    let result = engine.dispatch(Dispatch::new(ids::FOCUS).payload(json!({ "id": "b" })));

    assert!(result.success);
    assert!(!result.changed);
    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.registry().store(&zid("list")).map(|s| s.version()), version);
    assert_eq!(engine.registry().state(&zid("list")).and_then(|s| s.sticky_x), sticky_x);

    let click = engine.handle(InputEvent::Pointer(PointerEvent::click("b").with_kind(PointerKind::Down)));
    assert!(!click.handled);
    assert_eq!(engine.registry().store(&zid("list")).map(|s| s.version()), version);
}

// ---------------------------------------------------------------------------
// Undo round-trip
// ---------------------------------------------------------------------------

#[test]
fn undo_restores_state_before_command() {
    let mut engine = list_engine(ZoneConfig::list());
    focus(&mut engine, "a");
    let before = engine.snapshot();

    engine.dispatch(Dispatch::new("todo.add").payload(json!({ "text": "milk" })));
    assert_ne!(engine.snapshot(), before);

    assert!(engine.undo());
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn undo_restores_focus_moved_after_command() {
    let mut engine = list_engine(ZoneConfig::list());
    focus(&mut engine, "a");
    engine.dispatch(Dispatch::new("todo.add"));
    focus(&mut engine, "c");

    assert!(engine.undo());
    assert_eq!(engine.state(), &Todos::default());
    assert_eq!(focused(&engine, "list"), Some(ItemId::new("a")));
    assert_eq!(engine.host().active_element(), Some(ItemId::new("a")));
}

#[test]
fn undo_key_walks_history() {
    let mut engine = list_engine(ZoneConfig::list());
    engine.dispatch(Dispatch::new("todo.add"));
    engine.dispatch(Dispatch::new("todo.add"));

    let undo = KeyEvent::new(KeyCode::Char('z')).with_modifiers(Modifiers::primary());
    assert!(engine.handle(InputEvent::Key(undo.clone())).handled);
    assert_eq!(engine.state().items.len(), 1);
    assert!(engine.handle(InputEvent::Key(undo.clone())).handled);
    assert!(engine.state().items.is_empty());
    assert!(!engine.handle(InputEvent::Key(undo)).handled);

    let redo = KeyEvent::new(KeyCode::Char('y')).with_modifiers(Modifiers::primary());
    assert!(engine.handle(InputEvent::Key(redo)).handled);
    assert_eq!(engine.state().items.len(), 1);
}

#[test]
fn non_loggable_command_leaves_no_history() {
    let mut engine = list_engine(ZoneConfig::list());
    engine
        .register_command(
            CommandDef::pure("draft.clear", |s: &Todos, _, _| Todos {
                draft: String::new(),
                ..s.clone()
            })
            .log(false),
        )
        .unwrap();
    engine.dispatch(Dispatch::new("draft.type").payload(json!({ "ch": "x" })));
    engine.dispatch(Dispatch::new("draft.clear"));
    assert_eq!(engine.history().undo_depth(), 1);
}

// ---------------------------------------------------------------------------
// Focus invariant
// ---------------------------------------------------------------------------

#[test]
fn navigation_in_empty_zone_keeps_focus_empty() {
    let mut engine = list_engine(ZoneConfig::list());
    engine.registry_mut().set_items(&zid("list"), Vec::new()).unwrap();
    assert!(!press(&mut engine, KeyCode::Down));
    assert_eq!(focused(&engine, "list"), None);
}

#[test]
fn removing_focused_item_recovers_to_neighbor() {
    let mut engine = list_engine(ZoneConfig::list());
    focus(&mut engine, "b");
    engine.registry_mut().remove_item(&ItemId::new("b")).unwrap();
    let now = focused(&engine, "list");
    assert!(now.is_some());
    assert!(engine.registry().items(&zid("list")).iter().any(|i| Some(&i.id) == now.as_ref()));
}

// ---------------------------------------------------------------------------
// Linear boundary
// ---------------------------------------------------------------------------

#[test]
fn linear_boundary_without_loop_stays() {
    let mut engine = list_engine(ZoneConfig::list());
    focus(&mut engine, "a");
    assert!(!press(&mut engine, KeyCode::Up));
    assert_eq!(focused(&engine, "list"), Some(ItemId::new("a")));
}

#[test]
fn linear_boundary_with_loop_wraps() {
    let mut engine = list_engine(ZoneConfig::list().looping(true));
    focus(&mut engine, "a");
    assert!(press(&mut engine, KeyCode::Up));
    assert_eq!(focused(&engine, "list"), Some(ItemId::new("c")));
}

// ---------------------------------------------------------------------------
// Tab trap
// ---------------------------------------------------------------------------

#[test]
fn tab_trap_wraps_within_zone() {
    let mut engine = list_engine(ZoneConfig::list().tab(TabBehavior::Trap));
    engine
        .registry_mut()
        .register(ZoneSpec::new("other").parent("root"))
        .unwrap();
    engine
        .registry_mut()
        .set_items(&zid("other"), vec![ItemSpec::new("x")])
        .unwrap();
    focus(&mut engine, "c");

    assert!(press(&mut engine, KeyCode::Tab));
    assert_eq!(engine.registry().active_zone(), Some(&zid("list")));
    assert_eq!(focused(&engine, "list"), Some(ItemId::new("a")));

    assert!(press(&mut engine, KeyCode::BackTab));
    assert_eq!(focused(&engine, "list"), Some(ItemId::new("c")));
}

// ---------------------------------------------------------------------------
// Scoped binding isolation
// ---------------------------------------------------------------------------

#[test]
fn zone_scoped_binding_only_fires_in_its_zone() {
    let mut engine = list_engine(ZoneConfig::list());
    engine
        .registry_mut()
        .register(ZoneSpec::new("other").parent("root"))
        .unwrap();
    let keymap = KeymapConfig::from_json_str(
        r#"{ "zones": { "list": [ { "key": "N", "command": "todo.add" } ] } }"#,
    )
    .unwrap();
    engine.load_keymap(&keymap).unwrap();

    engine.registry_mut().set_active_zone(Some(zid("other"))).unwrap();
    assert!(!press(&mut engine, KeyCode::Char('n')));
    assert!(engine.state().items.is_empty());

    engine.registry_mut().set_active_zone(Some(zid("list"))).unwrap();
    assert!(press(&mut engine, KeyCode::Char('n')));
    assert_eq!(engine.state().items.len(), 1);
}

#[test]
fn inner_zone_binding_shadows_global() {
    let mut engine = list_engine(ZoneConfig::list());
    engine
        .register_command(CommandDef::pure("todo.clear", |_: &Todos, _, _| Todos::default()))
        .unwrap();
    engine.dispatch(Dispatch::new("todo.add"));
    let keymap = KeymapConfig::from_json_str(
        r#"{
            "global": [ { "key": "K", "command": "todo.add" } ],
            "zones": { "list": [ { "key": "K", "command": "todo.clear" } ] }
        }"#,
    )
    .unwrap();
    engine.load_keymap(&keymap).unwrap();

    let out = engine.handle(InputEvent::Key(KeyEvent::new(KeyCode::Char('k'))));
    assert_eq!(out.command.as_deref(), Some("todo.clear"));
    assert!(engine.state().items.is_empty());
}

// ---------------------------------------------------------------------------
// Input gate
// ---------------------------------------------------------------------------

#[test]
fn bindings_do_not_fire_in_editable_fields_unless_allowed() {
    let mut engine = list_engine(ZoneConfig::list());
    let keymap = KeymapConfig::from_json_str(
        r#"{ "global": [
            { "key": "N", "command": "todo.add" },
            { "key": "Mod+S", "command": "draft.type", "args": { "ch": "!" }, "allowInInput": true }
        ] }"#,
    )
    .unwrap();
    engine.load_keymap(&keymap).unwrap();

    let typed = KeyEvent::new(KeyCode::Char('n')).in_input();
    assert!(!engine.handle(InputEvent::Key(typed)).handled);
    assert!(engine.state().items.is_empty());

    let arrow = KeyEvent::new(KeyCode::Down).in_input();
    assert!(!engine.handle(InputEvent::Key(arrow)).handled);
    assert_eq!(focused(&engine, "list"), None);

    let save = KeyEvent::new(KeyCode::Char('s'))
        .with_modifiers(Modifiers::primary())
        .in_input();
    assert!(engine.handle(InputEvent::Key(save)).handled);
    assert_eq!(engine.state().draft, "!");
}

#[test]
fn is_input_is_visible_to_conditions() {
    let mut engine = list_engine(ZoneConfig::list());
    let keymap = KeymapConfig::from_json_str(
        r#"{ "global": [
            { "key": "Escape", "command": "draft.type", "args": { "ch": "esc" }, "when": "isInput", "allowInInput": true }
        ] }"#,
    )
    .unwrap();
    engine.load_keymap(&keymap).unwrap();

    assert!(!press(&mut engine, KeyCode::Escape));
    let esc = KeyEvent::new(KeyCode::Escape).in_input();
    assert!(engine.handle(InputEvent::Key(esc)).handled);
    assert_eq!(engine.state().draft, "esc");
}

// ---------------------------------------------------------------------------
// History grouping
// ---------------------------------------------------------------------------

#[test]
fn grouped_dispatches_undo_together() {
    let mut engine = list_engine(ZoneConfig::list());
    engine.dispatch(Dispatch::new("todo.add").payload(json!({ "text": "c1" })));
    let after_c1 = engine.state().clone();
    engine.dispatch(
        Dispatch::new("draft.type")
            .payload(json!({ "ch": "h" }))
            .group("typing"),
    );
    engine.dispatch(
        Dispatch::new("draft.type")
            .payload(json!({ "ch": "i" }))
            .group("typing"),
    );
    assert_eq!(engine.state().draft, "hi");

    assert!(engine.undo());
    assert_eq!(engine.state(), &after_c1);
    assert!(engine.undo());
    assert_eq!(engine.state(), &Todos::default());
}

// ---------------------------------------------------------------------------
// Expression evaluation
// ---------------------------------------------------------------------------

#[test]
fn expression_truth_table() {
    let expr = Expr::parse("hasTodos && !isEditing");
    let idle = Context::new().with("hasTodos", true).with("isEditing", false);
    let editing = Context::new().with("hasTodos", true).with("isEditing", true);
    assert!(expr.eval(&idle));
    assert!(!expr.eval(&editing));
}

#[test]
fn command_when_gates_its_bindings() {
    let mut engine = list_engine(ZoneConfig::list());
    engine
        .register_command(
            CommandDef::pure("todo.clear", |_: &Todos, _, _| Todos::default())
                .when("hasTodos && !isEditing")
                .keybinding("Mod+K"),
        )
        .unwrap();
    engine.dispatch(Dispatch::new("todo.add"));
    let clear = || {
        InputEvent::Key(KeyEvent::new(KeyCode::Char('k')).with_modifiers(Modifiers::primary()))
    };

    engine.set_context(Context::new().with("hasTodos", true).with("isEditing", true));
    assert!(!engine.handle(clear()).handled);
    assert_eq!(engine.state().items.len(), 1);

    engine.set_context(Context::new().with("hasTodos", true).with("isEditing", false));
    assert!(engine.handle(clear()).handled);
    assert!(engine.state().items.is_empty());
}

// ---------------------------------------------------------------------------
// Failures and telemetry
// ---------------------------------------------------------------------------

#[test]
fn failing_reducer_skips_commit_but_logs() {
    let mut engine = list_engine(ZoneConfig::list());
    engine
        .register_command(CommandDef::new("todo.fail", |_: &Todos, _, _| {
            Err(CommandError::failed("disk full"))
        }))
        .unwrap();
    let result = engine.dispatch(Dispatch::new("todo.fail"));
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("disk full"));
    assert_eq!(engine.state(), &Todos::default());
    assert_eq!(engine.history().undo_depth(), 0);

    let record = engine.telemetry().last().unwrap();
    assert_eq!(record.command_id, "todo.fail");
    assert!(!record.success);
    assert_eq!(record.source, Source::App);
}

#[test]
fn telemetry_tags_engine_commands() {
    let mut engine = list_engine(ZoneConfig::list());
    press(&mut engine, KeyCode::Down);
    let record = engine.telemetry().last().unwrap();
    assert_eq!(record.command_id, ids::NAVIGATE);
    assert_eq!(record.source, Source::Engine);
    assert_eq!(record.payload, json!({ "direction": "down" }));
}

#[test]
fn app_command_overrides_builtin_with_same_id() {
    let mut engine = list_engine(ZoneConfig::list());
    engine
        .register_command(CommandDef::pure(ids::DISMISS, |s: &Todos, _, _| Todos {
            draft: "dismissed".into(),
            ..s.clone()
        }))
        .unwrap();
    assert!(press(&mut engine, KeyCode::Escape));
    assert_eq!(engine.state().draft, "dismissed");
    assert_eq!(engine.telemetry().last().map(|r| r.source), Some(Source::App));
}

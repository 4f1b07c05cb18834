#![forbid(unsafe_code)]
#![no_main]

use arbitrary::Arbitrary;
use keyzone_core::{
    InputEvent, ItemId, KeyCode, KeyEvent, Modifiers, PointerEvent, PointerKind, ZoneId,
};
use keyzone_runtime::{Engine, ItemSpec, SelectionMode, ZoneConfig, ZoneSpec};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Key { code: u8, shift: bool, primary: bool },
    Click { item: u8, kind: u8, shift: bool },
    Insert(u8),
    Remove(u8),
    Undo,
    Redo,
}

fn key(code: u8) -> KeyCode {
    match code % 12 {
        0 => KeyCode::Up,
        1 => KeyCode::Down,
        2 => KeyCode::Left,
        3 => KeyCode::Right,
        4 => KeyCode::Home,
        5 => KeyCode::End,
        6 => KeyCode::Tab,
        7 => KeyCode::Enter,
        8 => KeyCode::Escape,
        9 => KeyCode::Char(' '),
        10 => KeyCode::Char('a'),
        _ => KeyCode::Char('z'),
    }
}

fn zid(s: &str) -> ZoneId {
    ZoneId::new(s)
}

fuzz_target!(|ops: Vec<Op>| {
    if ops.len() > 256 {
        return;
    }

    let mut engine = Engine::new(());
    {
        let reg = engine.registry_mut();
        let ok = reg.register(ZoneSpec::new("root")).is_ok()
            && reg
                .register(
                    ZoneSpec::new("list")
                        .parent("root")
                        .config(ZoneConfig::list().select(SelectionMode::Multiple)),
                )
                .is_ok()
            && reg.register(ZoneSpec::new("side").parent("root")).is_ok()
            && reg
                .set_items(&zid("list"), (0..4).map(|i| ItemSpec::new(format!("i{i}"))).collect())
                .is_ok()
            && reg
                .set_items(&zid("side"), vec![ItemSpec::new("s0"), ItemSpec::new("s1")])
                .is_ok()
            && reg.set_active_zone(Some(zid("list"))).is_ok();
        if !ok {
            return;
        }
    }

    for op in ops {
        match op {
            Op::Key { code, shift, primary } => {
                let mut mods = Modifiers::NONE;
                if shift {
                    mods |= Modifiers::SHIFT;
                }
                if primary {
                    mods |= Modifiers::primary();
                }
                engine.handle(InputEvent::Key(KeyEvent::new(key(code)).with_modifiers(mods)));
            }
            Op::Click { item, kind, shift } => {
                let kind = match kind % 3 {
                    0 => PointerKind::Down,
                    1 => PointerKind::Click,
                    _ => PointerKind::DoubleClick,
                };
                let mods = if shift { Modifiers::SHIFT } else { Modifiers::NONE };
                let event = PointerEvent::click(format!("i{}", item % 8))
                    .with_kind(kind)
                    .with_modifiers(mods);
                engine.handle(InputEvent::Pointer(event));
            }
            Op::Insert(n) => {
                let id = ItemId::new(format!("i{}", n % 8));
                if engine.registry().zone_of(&id).is_none() {
                    let _ = engine
                        .registry_mut()
                        .insert_item(&zid("list"), ItemSpec::new(id), Some(usize::from(n)));
                }
            }
            Op::Remove(n) => {
                let _ = engine.registry_mut().remove_item(&ItemId::new(format!("i{}", n % 8)));
            }
            Op::Undo => {
                engine.undo();
            }
            Op::Redo => {
                engine.redo();
            }
        }

        for zone in ["list", "side"] {
            let items = engine.registry().items(&zid(zone));
            let Some(state) = engine.registry().state(&zid(zone)) else {
                continue;
            };
            if let Some(focused) = &state.focused {
                assert!(items.iter().any(|i| &i.id == focused), "{zone}: stale focus {focused:?}");
            }
            for selected in &state.selection {
                assert!(items.iter().any(|i| &i.id == selected), "{zone}: stale selection");
            }
        }
    }
});

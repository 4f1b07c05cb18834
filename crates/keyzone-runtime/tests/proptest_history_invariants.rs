#![forbid(unsafe_code)]

//! Property tests for undo/redo history.
//!
//! Validates:
//! - Random dispatch/undo/redo sequences match a reference stack model.
//! - Depth bounds are never exceeded.
//! - Undo after a dispatch always restores the exact prior snapshot.

use proptest::prelude::*;

use keyzone_runtime::{CommandDef, Dispatch, Engine, EngineConfig, History};

// ============================================================================
// Strategy helpers
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Push(i64),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<i64>().prop_map(Op::Push),
        2 => Just(Op::Undo),
        2 => Just(Op::Redo),
    ]
}

fn counter(depth: usize) -> Engine<i64> {
    let mut engine = Engine::with_config(0_i64, EngineConfig::default().history_depth(depth));
    engine
        .register_command(CommandDef::pure("set", |_: &i64, p: &serde_json::Value, _| {
            p.as_i64().unwrap_or_default()
        }))
        .unwrap();
    engine
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn engine_history_matches_stack_model(
        ops in prop::collection::vec(op_strategy(), 1..60),
        depth in 1_usize..8,
    ) {
        let mut engine = counter(depth);
        let mut current = 0_i64;
        let mut past: Vec<i64> = Vec::new();
        let mut future: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    engine.dispatch(Dispatch::new("set").payload(serde_json::json!(v)));
                    if v != current {
                        past.push(current);
                        if past.len() > depth {
                            past.remove(0);
                        }
                        future.clear();
                        current = v;
                    }
                }
                Op::Undo => {
                    let stepped = engine.undo();
                    prop_assert_eq!(stepped, !past.is_empty());
                    if let Some(prev) = past.pop() {
                        future.push(current);
                        current = prev;
                    }
                }
                Op::Redo => {
                    let stepped = engine.redo();
                    prop_assert_eq!(stepped, !future.is_empty());
                    if let Some(next) = future.pop() {
                        past.push(current);
                        current = next;
                    }
                }
            }
            prop_assert_eq!(*engine.state(), current);
            prop_assert!(engine.history().undo_depth() <= depth);
            prop_assert!(engine.history().redo_depth() <= depth);
            prop_assert_eq!(engine.history().undo_depth(), past.len());
        }
    }

    #[test]
    fn undo_inverts_any_changing_dispatch(start in any::<i64>(), next in any::<i64>()) {
        prop_assume!(start != next);
        let mut engine = counter(10);
        engine.dispatch(Dispatch::new("set").payload(serde_json::json!(start)));
        let before = engine.snapshot();
        engine.dispatch(Dispatch::new("set").payload(serde_json::json!(next)));
        prop_assert!(engine.undo());
        prop_assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn grouped_run_is_one_entry(values in prop::collection::vec(1_i64..1000, 1..20)) {
        let mut h = History::new(50);
        h.push("first", 0_i64, None);
        for (i, v) in values.iter().enumerate() {
            let pushed = h.push("typed", *v, Some("g".to_string()));
            prop_assert_eq!(pushed, i == 0);
        }
        prop_assert_eq!(h.undo_depth(), 2);
        let restored = h.undo(-1).unwrap();
        prop_assert_eq!(*restored, values[0]);
    }
}

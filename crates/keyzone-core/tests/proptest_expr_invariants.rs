#![forbid(unsafe_code)]

//! Property tests for the `when`-clause language.
//!
//! Validates:
//! - The string parser and the builder produce the same AST.
//! - Evaluation matches the boolean semantics of the AST shape.
//! - Compiling through the cache never changes the result.
//! - Key chord parsing is stable under its own `Display` output.

use proptest::prelude::*;

use keyzone_core::{Context, Expr, ExprCache, KeyChord};

// ============================================================================
// Strategy helpers
// ============================================================================

const KEYS: &[&str] = &["a", "b", "c", "hasTodos", "isEditing"];

fn key_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(KEYS)
}

/// A term: optionally negated truthy lookup.
fn term_strategy() -> impl Strategy<Value = (bool, &'static str)> {
    (any::<bool>(), key_strategy())
}

/// Disjunctive normal form: `Vec` of conjunctions of terms.
fn dnf_strategy() -> impl Strategy<Value = Vec<Vec<(bool, &'static str)>>> {
    prop::collection::vec(prop::collection::vec(term_strategy(), 1..4), 1..4)
}

fn context_strategy() -> impl Strategy<Value = Context> {
    prop::collection::vec(any::<bool>(), KEYS.len()).prop_map(|flags| {
        KEYS.iter()
            .zip(flags)
            .map(|(k, v)| (*k, v))
            .collect::<Context>()
    })
}

fn render(dnf: &[Vec<(bool, &str)>]) -> String {
    dnf.iter()
        .map(|conj| {
            conj.iter()
                .map(|(neg, k)| if *neg { format!("!{k}") } else { (*k).to_string() })
                .collect::<Vec<_>>()
                .join(" && ")
        })
        .collect::<Vec<_>>()
        .join(" || ")
}

fn reference_eval(dnf: &[Vec<(bool, &str)>], ctx: &Context) -> bool {
    dnf.iter()
        .any(|conj| conj.iter().all(|(neg, k)| ctx.is_truthy(k) != *neg))
}

// ============================================================================
// Parsing and evaluation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn parsed_dnf_evaluates_like_reference(dnf in dnf_strategy(), ctx in context_strategy()) {
        let expr = Expr::parse(&render(&dnf));
        prop_assert_eq!(expr.eval(&ctx), reference_eval(&dnf, &ctx));
    }

    #[test]
    fn cache_preserves_results(dnf in dnf_strategy(), ctx in context_strategy()) {
        let src = render(&dnf);
        let mut cache = ExprCache::new();
        let first = cache.compile(&src);
        let second = cache.compile(&src);
        prop_assert_eq!(first.eval(&ctx), Expr::parse(&src).eval(&ctx));
        prop_assert_eq!(first.eval(&ctx), second.eval(&ctx));
        prop_assert_eq!(cache.len(), 1);
    }

    #[test]
    fn negation_inverts(key in key_strategy(), ctx in context_strategy()) {
        let plain = Expr::parse(key);
        let negated = Expr::parse(&format!("!{key}"));
        prop_assert_ne!(plain.eval(&ctx), negated.eval(&ctx));
    }

    #[test]
    fn single_conjunction_matches_builder(conj in prop::collection::vec(term_strategy(), 2..5)) {
        let src = render(std::slice::from_ref(&conj));
        let built = conj
            .iter()
            .map(|(neg, k)| if *neg { Expr::key(*k).not() } else { Expr::key(*k) })
            .fold(Expr::Always, Expr::and);
        prop_assert_eq!(Expr::parse(&src), built);
    }
}

// ============================================================================
// Key chords
// ============================================================================

fn chord_strategy() -> impl Strategy<Value = String> {
    let mods = prop::sample::subsequence(vec!["Ctrl", "Alt", "Shift", "Meta"], 0..=4);
    let key = prop::sample::select(vec![
        "A", "z", "5", "Enter", "Escape", "Tab", "Space", "ArrowUp", "ArrowLeft", "Home",
        "End", "Delete", "Backspace", "F5", "PageDown",
    ]);
    (mods, key).prop_map(|(mods, key)| {
        let mut parts: Vec<&str> = mods;
        parts.push(key);
        parts.join("+")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn chord_display_reparses_to_same_chord(src in chord_strategy()) {
        let chord: KeyChord = src.parse().unwrap();
        let again: KeyChord = chord.to_string().parse().unwrap();
        prop_assert_eq!(chord, again);
    }
}

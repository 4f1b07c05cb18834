#![forbid(unsafe_code)]
#![no_main]

use keyzone_core::{Context, Expr};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 4096 {
        return;
    }

    // Parsing is total: any input yields an expression.
    let expr = Expr::parse(text);

    let ctx = Context::new()
        .with("editing", true)
        .with("count", 3_i64)
        .with("mode", "insert");
    let first = expr.eval(&ctx);
    assert_eq!(first, expr.eval(&ctx), "evaluation must be pure");
    let _ = expr.eval(&Context::new());

    // Rendering and reparsing must not panic.
    let rendered = expr.to_string();
    let _ = Expr::parse(&rendered).eval(&ctx);
});

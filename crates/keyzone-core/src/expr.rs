#![forbid(unsafe_code)]

//! The `when`-clause language.
//!
//! Commands and keybindings carry small boolean conditions over a
//! [`Context`]. The canonical representation is the [`Expr`] AST; strings are
//! a front-end lowered to the same AST and cached by source text in an
//! [`ExprCache`].
//!
//! # Grammar
//!
//! Parsing splits the source outermost-to-innermost, with no parentheses:
//!
//! 1. `a || b || c`: lowest precedence, N-ary, short-circuit any.
//! 2. `a && b && c`: N-ary, short-circuit all.
//! 3. `!a`: negation of the rest of the term.
//! 4. `key == literal` / `key != literal`.
//! 5. `key`: truthy lookup.
//!
//! Literals are `true`, `false`, `null`, finite numbers and quoted strings
//! (`'x'` or `"x"`). Anything else is compared as a raw string; a misspelled
//! boolean such as `ture` therefore compares as the string `"ture"`.
//!
//! An empty condition is [`Expr::Always`] and evaluates to `true`.
//!
//! ```
//! use keyzone_core::{Context, Expr};
//!
//! let expr = Expr::parse("hasTodos && !isEditing");
//! let idle = Context::new().with("hasTodos", true).with("isEditing", false);
//! let editing = Context::new().with("hasTodos", true).with("isEditing", true);
//! assert!(expr.eval(&idle));
//! assert!(!expr.eval(&editing));
//! ```

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::context::{Context, Value};
use crate::logging::trace;

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`. Also equal to a missing key.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// A finite number.
    Number(f64),
    /// A quoted string, or the raw text of an unrecognized literal.
    Str(String),
}

impl Literal {
    /// Parse literal text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        match s {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            "null" => return Self::Null,
            _ => {}
        }
        if let Ok(n) = s.parse::<f64>()
            && n.is_finite()
        {
            return Self::Number(n);
        }
        if s.len() >= 2 {
            let bytes = s.as_bytes();
            let (first, last) = (bytes[0], bytes[s.len() - 1]);
            if (first == b'\'' || first == b'"') && first == last {
                return Self::Str(s[1..s.len() - 1].to_string());
            }
        }
        trace!(literal = s, "unrecognized literal compared as raw string");
        Self::Str(s.to_string())
    }

    /// Compare against a context value. A missing key equals `null`.
    #[must_use]
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Self::Null, None | Some(Value::Null)) => true,
            (Self::Bool(a), Some(Value::Bool(b))) => a == b,
            (Self::Number(a), Some(Value::Number(b))) => a == b,
            (Self::Str(a), Some(Value::Str(b))) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// A compiled condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Expr {
    /// No condition; always true.
    #[default]
    Always,
    /// Truthy lookup of a context key.
    Key(String),
    /// `key == literal`.
    Eq(String, Literal),
    /// `key != literal`.
    Ne(String, Literal),
    /// Negation.
    Not(Box<Expr>),
    /// All must hold.
    And(Vec<Expr>),
    /// Any must hold.
    Or(Vec<Expr>),
}

impl Expr {
    /// Parse a condition string. Parsing never fails; see the module docs for
    /// the fallback rules.
    #[must_use]
    pub fn parse(src: &str) -> Self {
        let s = src.trim();
        if s.is_empty() {
            return Self::Always;
        }

        if s.contains("||") {
            return Self::Or(s.split("||").map(Self::parse).collect());
        }
        if s.contains("&&") {
            return Self::And(s.split("&&").map(Self::parse).collect());
        }
        if let Some(rest) = s.strip_prefix('!')
            && !rest.starts_with('=')
        {
            return Self::Not(Box::new(Self::parse(rest)));
        }
        if let Some((key, lit)) = s.split_once("==") {
            return Self::Eq(key.trim().to_string(), Literal::parse(lit));
        }
        if let Some((key, lit)) = s.split_once("!=") {
            return Self::Ne(key.trim().to_string(), Literal::parse(lit));
        }
        Self::Key(s.to_string())
    }

    /// Evaluate against a context.
    #[must_use]
    pub fn eval(&self, ctx: &Context) -> bool {
        match self {
            Self::Always => true,
            Self::Key(k) => ctx.is_truthy(k),
            Self::Eq(k, lit) => lit.matches(ctx.get(k)),
            Self::Ne(k, lit) => !lit.matches(ctx.get(k)),
            Self::Not(inner) => !inner.eval(ctx),
            Self::And(terms) => terms.iter().all(|t| t.eval(ctx)),
            Self::Or(terms) => terms.iter().any(|t| t.eval(ctx)),
        }
    }

    /// True for [`Expr::Always`].
    #[must_use]
    pub const fn is_always(&self) -> bool {
        matches!(self, Self::Always)
    }

    // --- Builder ---------------------------------------------------------

    /// Truthy lookup.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// `key == literal`.
    #[must_use]
    pub fn equals(key: impl Into<String>, lit: impl Into<Literal>) -> Self {
        Self::Eq(key.into(), lit.into())
    }

    /// `key != literal`.
    #[must_use]
    pub fn not_equals(key: impl Into<String>, lit: impl Into<Literal>) -> Self {
        Self::Ne(key.into(), lit.into())
    }

    /// Conjunction, flattening nested `And`s and dropping `Always`.
    #[must_use]
    pub fn and(self, other: Expr) -> Self {
        match (self, other) {
            (Self::Always, e) | (e, Self::Always) => e,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), e) => {
                a.push(e);
                Self::And(a)
            }
            (e, Self::And(mut b)) => {
                b.insert(0, e);
                Self::And(b)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Disjunction, flattening nested `Or`s. `Always` absorbs.
    #[must_use]
    pub fn or(self, other: Expr) -> Self {
        match (self, other) {
            (Self::Always, _) | (_, Self::Always) => Self::Always,
            (Self::Or(mut a), Self::Or(b)) => {
                a.extend(b);
                Self::Or(a)
            }
            (Self::Or(mut a), e) => {
                a.push(e);
                Self::Or(a)
            }
            (e, Self::Or(mut b)) => {
                b.insert(0, e);
                Self::Or(b)
            }
            (a, b) => Self::Or(vec![a, b]),
        }
    }

    /// Negation.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            e => Self::Not(Box::new(e)),
        }
    }
}

/// Diagnostic rendering. Nested groups are parenthesized for readability;
/// the string grammar itself has no parentheses.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, terms: &[Expr], sep: &str) -> fmt::Result {
            for (i, t) in terms.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                match t {
                    Expr::And(_) | Expr::Or(_) => write!(f, "({t})")?,
                    _ => write!(f, "{t}")?,
                }
            }
            Ok(())
        }
        match self {
            Self::Always => f.write_str("true"),
            Self::Key(k) => f.write_str(k),
            Self::Eq(k, lit) => write!(f, "{k} == {lit}"),
            Self::Ne(k, lit) => write!(f, "{k} != {lit}"),
            Self::Not(inner) => match inner.as_ref() {
                Self::And(_) | Self::Or(_) => write!(f, "!({inner})"),
                _ => write!(f, "!{inner}"),
            },
            Self::And(terms) => join(f, terms, " && "),
            Self::Or(terms) => join(f, terms, " || "),
        }
    }
}

/// Compile cache keyed by source text.
#[derive(Debug, Default)]
pub struct ExprCache {
    compiled: AHashMap<String, Arc<Expr>>,
    hits: u64,
    misses: u64,
}

impl ExprCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `src`, reusing an earlier compilation of the same text.
    pub fn compile(&mut self, src: &str) -> Arc<Expr> {
        if let Some(expr) = self.compiled.get(src) {
            self.hits += 1;
            return Arc::clone(expr);
        }
        self.misses += 1;
        let expr = Arc::new(Expr::parse(src));
        self.compiled.insert(src.to_string(), Arc::clone(&expr));
        expr
    }

    /// Compile `src` into a predicate over a context.
    pub fn compile_fn(&mut self, src: &str) -> impl Fn(&Context) -> bool + use<> {
        let expr = self.compile(src);
        move |ctx: &Context| expr.eval(ctx)
    }

    /// Number of distinct sources compiled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// True if nothing has been compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// `(hits, misses)` since creation or the last [`clear`](Self::clear).
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Drop every compiled entry and reset statistics.
    pub fn clear(&mut self) {
        self.compiled.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

//! Expression and predicate evaluation against a scope.
//!
//! Expressions evaluate to a JSON value or fail with a precise error code.
//! Predicates evaluate to a tri-valued [`Truth`]; `Undefined` means the
//! predicate does not apply to the value's shape and must not be collapsed
//! into `false`.

use crate::schema::{BinaryOp, CompareOp, Expr, Literal, PathExpr, PathRoot, UnaryOp};
use crate::scope::Scope;
use crate::validator::ErrorCode;
use crate::value;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Three-valued predicate result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Undefined,
}

impl Truth {
    pub fn from_bool(b: bool) -> Truth {
        if b {
            Truth::True
        } else {
            Truth::False
        }
    }

    pub fn negate(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Undefined => Truth::Undefined,
        }
    }

    /// Conjunction. `Undefined` on either side propagates.
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::Undefined, _) | (_, Truth::Undefined) => Truth::Undefined,
            (l, r) => Truth::from_bool(l == Truth::True && r == Truth::True),
        }
    }

    /// Disjunction. `Undefined` on either side propagates.
    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::Undefined, _) | (_, Truth::Undefined) => Truth::Undefined,
            (l, r) => Truth::from_bool(l == Truth::True || r == Truth::True),
        }
    }
}

/// A failed evaluation, carrying the error code a caller should surface.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalFailure {
    pub code: ErrorCode,
    pub message: String,
}

impl EvalFailure {
    fn expression<M: Into<String>>(message: M) -> EvalFailure {
        EvalFailure {
            code: ErrorCode::InvalidExpression,
            message: message.into(),
        }
    }

    fn arithmetic<M: Into<String>>(message: M) -> EvalFailure {
        EvalFailure {
            code: ErrorCode::InvalidArithmetic,
            message: message.into(),
        }
    }

    fn parent() -> EvalFailure {
        EvalFailure {
            code: ErrorCode::ParentUndefined,
            message: "parent scope is undefined".to_owned(),
        }
    }
}

pub type EvalResult = Result<Value, EvalFailure>;

/// Evaluate an expression to a value.
pub fn eval(expr: &Expr, scope: &Scope) -> EvalResult {
    match expr {
        Expr::Literal(literal) => Ok(literal_value(literal)),
        Expr::EmptyArray => Ok(Value::Array(Vec::new())),
        Expr::Path(path) => resolve_path(path, scope),
        Expr::Unary { op, operand } => {
            let operand = eval(operand, scope)?;
            unary_arith(*op, &operand)
        }
        Expr::Binary { op, left, right } => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            binary_arith(*op, &left, &right)
        }
        Expr::Call { name, args } => call_function(name, args),
        Expr::Compare { .. }
        | Expr::Not(_)
        | Expr::And(_, _)
        | Expr::Or(_, _)
        | Expr::Matches { .. } => match predicate(expr, scope) {
            Truth::True => Ok(Value::Bool(true)),
            Truth::False => Ok(Value::Bool(false)),
            Truth::Undefined => Err(EvalFailure::expression(
                "predicate did not resolve to a boolean",
            )),
        },
    }
}

/// Evaluate a predicate to a tri-valued result.
///
/// Both sides of `And`/`Or` are always evaluated so that `Undefined`
/// propagates from either operand.
pub fn predicate(expr: &Expr, scope: &Scope) -> Truth {
    match expr {
        Expr::Not(inner) => predicate(inner, scope).negate(),
        Expr::And(left, right) => {
            let left = predicate(left, scope);
            let right = predicate(right, scope);
            left.and(right)
        }
        Expr::Or(left, right) => {
            let left = predicate(left, scope);
            let right = predicate(right, scope);
            left.or(right)
        }
        Expr::Compare { op, left, right } => {
            let left = match eval(left, scope) {
                Ok(value) => value,
                Err(_) => return Truth::Undefined,
            };
            let right = match eval(right, scope) {
                Ok(value) => value,
                Err(_) => return Truth::Undefined,
            };
            compare(*op, &left, &right)
        }
        Expr::Matches { expr, pattern } => {
            let value = match eval(expr, scope) {
                Ok(value) => value,
                Err(_) => return Truth::Undefined,
            };
            let text = match value.as_str() {
                Some(text) => text,
                None => return Truth::Undefined,
            };
            match Regex::new(pattern) {
                Ok(regex) => Truth::from_bool(regex.is_match(text)),
                Err(_) => Truth::Undefined,
            }
        }
        other => match eval(other, scope) {
            Ok(value) => Truth::from_bool(value::truthy(&value)),
            Err(_) => Truth::Undefined,
        },
    }
}

/// Substitute scope variables into a regex pattern. Every variable `name` is
/// matched as `$name` (a leading `$` in the stored name is kept as-is) and
/// replaced with the value's plain-text form. Longer names substitute first
/// so that `$id` never clobbers part of `$identifier`.
pub fn inject_variables(pattern: &str, scope: &Scope) -> String {
    let mut substitutions: Vec<(String, String)> = scope
        .variables()
        .map(|(name, value)| {
            let token = if name.starts_with('$') {
                name.to_owned()
            } else {
                format!("${}", name)
            };
            (token, value::text(value))
        })
        .collect();
    substitutions.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    substitutions.dedup_by(|a, b| a.0 == b.0);

    let mut injected = pattern.to_owned();
    for (token, replacement) in &substitutions {
        injected = injected.replace(token.as_str(), replacement);
    }
    injected
}

pub(crate) fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::from(*i),
        Literal::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Literal::Str(s) => Value::String(s.clone()),
        Literal::Duration(ms) => Value::from(*ms),
    }
}

fn resolve_path(path: &PathExpr, scope: &Scope) -> EvalResult {
    let root_name = path.name.as_deref();
    let base: &Value = match path.root {
        PathRoot::This => scope.current(),
        PathRoot::Parent => match scope.parent() {
            Some(parent) => parent,
            None => return Err(EvalFailure::parent()),
        },
        PathRoot::Root => scope.root(),
        PathRoot::Identifier => {
            let name = root_name.unwrap_or("");
            match value::field(scope.current(), name) {
                Some(value) => value,
                None => {
                    return Err(EvalFailure::expression(format!(
                        "unresolved identifier \"{}\"",
                        name
                    )));
                }
            }
        }
        PathRoot::Variable => {
            let name = root_name.unwrap_or("");
            match scope
                .variable(name)
                .or_else(|| scope.variable(name.trim_start_matches('$')))
            {
                Some(value) => value,
                None => {
                    return Err(EvalFailure::expression(format!(
                        "unknown variable \"{}\"",
                        name
                    )));
                }
            }
        }
    };

    // Absent fields along the segment walk read as null, not as an error.
    let mut node = base;
    for segment in &path.segments {
        match value::field(node, segment) {
            Some(next) => node = next,
            None => return Ok(Value::Null),
        }
    }
    Ok(node.clone())
}

fn call_function(name: &str, args: &[Expr]) -> EvalResult {
    match name {
        "now" | "midnight" | "pi" if !args.is_empty() => Err(EvalFailure::expression(format!(
            "function \"{}\" takes no arguments",
            name
        ))),
        "now" => Ok(Value::String(
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        )),
        "midnight" => {
            let midnight = Local::now()
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| EvalFailure::expression("cannot construct midnight"))?;
            Ok(Value::String(
                midnight.format("%Y-%m-%d %H:%M:%S").to_string(),
            ))
        }
        "pi" => number_value(std::f64::consts::PI),
        _ => Err(EvalFailure::expression(format!(
            "unknown function \"{}\"",
            name
        ))),
    }
}

// ─── arithmetic ──────────────────────────────────────────────────────────────

fn unary_arith(op: UnaryOp, value: &Value) -> EvalResult {
    let negate = op == UnaryOp::Minus;
    if let Some(i) = value.as_i64() {
        return if negate {
            i.checked_neg()
                .map(Value::from)
                .ok_or_else(|| EvalFailure::arithmetic("integer negation overflow"))
        } else {
            Ok(Value::from(i))
        };
    }
    if let Some(f) = value.as_f64() {
        return number_value(if negate { -f } else { f });
    }
    if let Some(ms) = duration_ms(value) {
        return if negate {
            ms.checked_neg()
                .map(Value::from)
                .ok_or_else(|| EvalFailure::arithmetic("duration negation overflow"))
        } else {
            Ok(Value::from(ms))
        };
    }
    Err(EvalFailure::arithmetic(
        "unary arithmetic requires a number or duration",
    ))
}

fn binary_arith(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Add | BinaryOp::Sub => add_sub(op == BinaryOp::Sub, left, right),
        BinaryOp::Mul => mul(left, right),
        BinaryOp::Div => div(left, right),
    }
}

// Temporal rules come first: temporal ± duration shifts, temporal − temporal
// yields milliseconds, duration strings combine to milliseconds. Two plain
// numbers always use numeric arithmetic.
fn add_sub(sub: bool, left: &Value, right: &Value) -> EvalResult {
    if let Some(temporal) = temporal_value(left) {
        if sub {
            if let Some(other) = temporal_value(right) {
                if temporal.kind == other.kind {
                    let difference = temporal.ts.signed_duration_since(other.ts);
                    return Ok(Value::from(difference.num_milliseconds()));
                }
                return Err(EvalFailure::arithmetic(
                    "cannot subtract temporal values of different kinds",
                ));
            }
        }
        if let Some(ms) = duration_ms(right) {
            return temporal.shifted(if sub { -ms } else { ms });
        }
        return Err(EvalFailure::arithmetic(
            "temporal arithmetic requires a duration operand",
        ));
    }

    if left.is_number() && right.is_number() {
        if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
            let combined = if sub { l.checked_sub(r) } else { l.checked_add(r) };
            if let Some(result) = combined {
                return Ok(Value::from(result));
            }
        }
        return match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => number_value(if sub { l - r } else { l + r }),
            _ => Err(EvalFailure::arithmetic("non-numeric operand")),
        };
    }

    if let (Some(l), Some(r)) = (duration_ms(left), duration_ms(right)) {
        let combined = if sub { l.checked_sub(r) } else { l.checked_add(r) };
        return combined
            .map(Value::from)
            .ok_or_else(|| EvalFailure::arithmetic("duration arithmetic overflow"));
    }

    Err(EvalFailure::arithmetic(
        "operands do not support addition or subtraction",
    ))
}

fn mul(left: &Value, right: &Value) -> EvalResult {
    if left.is_number() && right.is_number() {
        if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
            if let Some(result) = l.checked_mul(r) {
                return Ok(Value::from(result));
            }
        }
        return match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => number_value(l * r),
            _ => Err(EvalFailure::arithmetic("non-numeric operand")),
        };
    }
    if let (Some(ms), Some(factor)) = (duration_ms(left), right.as_f64()) {
        return duration_value(ms as f64 * factor);
    }
    if let (Some(factor), Some(ms)) = (left.as_f64(), duration_ms(right)) {
        return duration_value(factor * ms as f64);
    }
    Err(EvalFailure::arithmetic(
        "operands do not support multiplication",
    ))
}

fn div(left: &Value, right: &Value) -> EvalResult {
    if left.is_number() && right.is_number() {
        return match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => {
                if r == 0.0 {
                    return Err(EvalFailure::arithmetic("division by zero"));
                }
                if let (Some(li), Some(ri)) = (left.as_i64(), right.as_i64()) {
                    if ri != 0 && li % ri == 0 {
                        return Ok(Value::from(li / ri));
                    }
                }
                number_value(l / r)
            }
            _ => Err(EvalFailure::arithmetic("non-numeric operand")),
        };
    }
    if let Some(ms) = duration_ms(left) {
        if let Some(divisor) = right.as_f64() {
            if divisor == 0.0 {
                return Err(EvalFailure::arithmetic("division by zero"));
            }
            return duration_value(ms as f64 / divisor);
        }
    }
    Err(EvalFailure::arithmetic("operands do not support division"))
}

fn number_value(f: f64) -> EvalResult {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| EvalFailure::arithmetic("non-finite arithmetic result"))
}

// Durations scaled by a factor round to the nearest millisecond.
fn duration_value(ms: f64) -> EvalResult {
    if !ms.is_finite() {
        return Err(EvalFailure::arithmetic("non-finite duration"));
    }
    Ok(Value::from(ms.round() as i64))
}

// ─── comparison ──────────────────────────────────────────────────────────────

fn compare(op: CompareOp, left: &Value, right: &Value) -> Truth {
    match op {
        CompareOp::Eq => return Truth::from_bool(left == right),
        CompareOp::Ne => return Truth::from_bool(left != right),
        _ => {}
    }

    let ordering = if left.is_number() && right.is_number() {
        match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => match l.partial_cmp(&r) {
                Some(ordering) => ordering,
                None => return Truth::Undefined,
            },
            _ => return Truth::Undefined,
        }
    } else if let (Value::String(l), Value::String(r)) = (left, right) {
        // Strings that both read as date/times compare temporally, else
        // lexically.
        match (parse_temporal(l), parse_temporal(r)) {
            (Some(lt), Some(rt)) => lt.ts.cmp(&rt.ts),
            _ => l.cmp(r),
        }
    } else {
        return Truth::Undefined;
    };

    Truth::from_bool(ordering_passes(op, ordering))
}

fn ordering_passes(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

// ─── temporal & duration coercion ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TemporalKind {
    Date,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Temporal {
    pub(crate) kind: TemporalKind,
    pub(crate) ts: NaiveDateTime,
}

impl Temporal {
    fn shifted(&self, ms: i64) -> EvalResult {
        let shifted = self
            .ts
            .checked_add_signed(Duration::milliseconds(ms))
            .ok_or_else(|| EvalFailure::arithmetic("temporal shift out of range"))?;
        let formatted = match self.kind {
            TemporalKind::Date => shifted.format("%Y-%m-%d").to_string(),
            TemporalKind::DateTime => shifted.format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        Ok(Value::String(formatted))
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a string as a calendar date (`YYYY-MM-DD`) or, failing that, as a
/// permissively-formatted date-time.
pub(crate) fn parse_temporal(text: &str) -> Option<Temporal> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ts| Temporal {
            kind: TemporalKind::Date,
            ts,
        });
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Temporal {
                kind: TemporalKind::DateTime,
                ts,
            });
        }
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(Temporal {
            kind: TemporalKind::DateTime,
            ts: ts.naive_utc(),
        });
    }
    None
}

fn temporal_value(value: &Value) -> Option<Temporal> {
    value.as_str().and_then(parse_temporal)
}

/// Coerce a value to integer milliseconds: integers pass through, whole
/// floats truncate, and strings such as `"30d"` or `"250 ms"` scale by unit.
pub(crate) fn duration_ms(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    if let Some(f) = value.as_f64() {
        return if f.fract() == 0.0 {
            Some(f.trunc() as i64)
        } else {
            None
        };
    }
    let text = value.as_str()?;
    let captures = duration_pattern().captures(text.trim())?;
    let count: i64 = captures.get(1)?.as_str().parse().ok()?;
    let scale = duration_unit_ms(captures.get(2)?.as_str())?;
    count.checked_mul(scale)
}

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(-?\d+)\s*(ms|s|m|h|d|w|milliseconds?|seconds?|minutes?|hours?|days?|weeks?)$")
            .expect("duration pattern is valid")
    })
}

fn duration_unit_ms(unit: &str) -> Option<i64> {
    match unit.to_ascii_lowercase().as_str() {
        "ms" | "millisecond" | "milliseconds" => Some(1),
        "s" | "second" | "seconds" => Some(1_000),
        "m" | "minute" | "minutes" => Some(60_000),
        "h" | "hour" | "hours" => Some(3_600_000),
        "d" | "day" | "days" => Some(86_400_000),
        "w" | "week" | "weeks" => Some(604_800_000),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Expr;
    use serde_json::json;

    fn lit(value: serde_json::Value) -> Expr {
        match value {
            Value::Null => Expr::Literal(Literal::Null),
            Value::Bool(b) => Expr::Literal(Literal::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Expr::Literal(Literal::Int(i))
                } else {
                    Expr::Literal(Literal::Float(n.as_f64().unwrap()))
                }
            }
            Value::String(s) => Expr::Literal(Literal::Str(s)),
            other => panic!("unsupported literal {}", other),
        }
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn eval_str(expr: &Expr) -> Value {
        let root = json!(null);
        eval(expr, &Scope::new(&root)).expect("evaluation failed")
    }

    #[test]
    fn numeric_arithmetic() {
        assert_eq!(eval_str(&binary(BinaryOp::Add, lit(json!(2)), lit(json!(3)))), json!(5));
        assert_eq!(eval_str(&binary(BinaryOp::Sub, lit(json!(2)), lit(json!(5)))), json!(-3));
        assert_eq!(eval_str(&binary(BinaryOp::Mul, lit(json!(4)), lit(json!(2.5)))), json!(10.0));
        assert_eq!(eval_str(&binary(BinaryOp::Div, lit(json!(6)), lit(json!(3)))), json!(2));
        assert_eq!(eval_str(&binary(BinaryOp::Div, lit(json!(7)), lit(json!(2)))), json!(3.5));
    }

    #[test]
    fn division_by_zero_is_arithmetic_failure() {
        let root = json!(null);
        let scope = Scope::new(&root);
        let failure = eval(&binary(BinaryOp::Div, lit(json!(1)), lit(json!(0))), &scope)
            .expect_err("expected failure");
        assert_eq!(failure.code, ErrorCode::InvalidArithmetic);
    }

    #[test]
    fn duration_strings_combine_to_milliseconds() {
        let sum = eval_str(&binary(BinaryOp::Add, lit(json!("1h")), lit(json!("30m"))));
        assert_eq!(sum, json!(5_400_000));
        let scaled = eval_str(&binary(BinaryOp::Mul, lit(json!("1h")), lit(json!(2))));
        assert_eq!(scaled, json!(7_200_000));
    }

    #[test]
    fn temporal_shift_keeps_kind() {
        let date = eval_str(&binary(BinaryOp::Add, lit(json!("2026-01-01")), lit(json!("2d"))));
        assert_eq!(date, json!("2026-01-03"));

        let datetime = eval_str(&binary(
            BinaryOp::Add,
            lit(json!("2026-01-01 10:00:00")),
            lit(json!("1h")),
        ));
        assert_eq!(datetime, json!("2026-01-01 11:00:00"));
    }

    #[test]
    fn temporal_difference_in_milliseconds() {
        let difference = eval_str(&binary(
            BinaryOp::Sub,
            lit(json!("2026-01-02")),
            lit(json!("2026-01-01")),
        ));
        assert_eq!(difference, json!(86_400_000));
    }

    #[test]
    fn mismatched_temporal_kinds_do_not_subtract() {
        let root = json!(null);
        let scope = Scope::new(&root);
        let failure = eval(
            &binary(
                BinaryOp::Sub,
                lit(json!("2026-01-02")),
                lit(json!("2026-01-01 00:00:00")),
            ),
            &scope,
        )
        .expect_err("expected failure");
        assert_eq!(failure.code, ErrorCode::InvalidArithmetic);
    }

    #[test]
    fn duration_coercion() {
        assert_eq!(duration_ms(&json!(1500)), Some(1500));
        assert_eq!(duration_ms(&json!(2.0)), Some(2));
        assert_eq!(duration_ms(&json!(2.5)), None);
        assert_eq!(duration_ms(&json!("250 ms")), Some(250));
        assert_eq!(duration_ms(&json!("3 Weeks")), Some(1_814_400_000));
        assert_eq!(duration_ms(&json!("-2h")), Some(-7_200_000));
        assert_eq!(duration_ms(&json!("2 lightyears")), None);
    }

    #[test]
    fn path_roots() {
        let root = json!({"outer": {"inner": 7}});
        let inner = json!({"inner": 7});
        let scope = Scope::new(&root).child(&inner);

        let this = Expr::Path(PathExpr {
            root: PathRoot::This,
            name: None,
            segments: vec!["inner".to_owned()],
        });
        assert_eq!(eval(&this, &scope).unwrap(), json!(7));

        let parent = Expr::Path(PathExpr {
            root: PathRoot::Parent,
            name: None,
            segments: vec!["outer".to_owned(), "inner".to_owned()],
        });
        assert_eq!(eval(&parent, &scope).unwrap(), json!(7));

        let ident = Expr::Path(PathExpr {
            root: PathRoot::Identifier,
            name: Some("inner".to_owned()),
            segments: vec![],
        });
        assert_eq!(eval(&ident, &scope).unwrap(), json!(7));

        let missing_segment = Expr::Path(PathExpr {
            root: PathRoot::This,
            name: None,
            segments: vec!["inner".to_owned(), "deeper".to_owned()],
        });
        assert_eq!(eval(&missing_segment, &scope).unwrap(), json!(null));
    }

    #[test]
    fn parent_of_root_scope_is_an_error() {
        let root = json!({});
        let scope = Scope::new(&root);
        let parent = Expr::Path(PathExpr {
            root: PathRoot::Parent,
            name: None,
            segments: vec![],
        });
        let failure = eval(&parent, &scope).expect_err("expected failure");
        assert_eq!(failure.code, ErrorCode::ParentUndefined);
    }

    #[test]
    fn variables_resolve_with_and_without_sigil() {
        let root = json!(null);
        let scope = Scope::new(&root).with_variables(vec![("limit".to_owned(), json!(5))]);
        let sigil = Expr::Path(PathExpr {
            root: PathRoot::Variable,
            name: Some("$limit".to_owned()),
            segments: vec![],
        });
        assert_eq!(eval(&sigil, &scope).unwrap(), json!(5));

        let unknown = Expr::Path(PathExpr {
            root: PathRoot::Variable,
            name: Some("$missing".to_owned()),
            segments: vec![],
        });
        assert_eq!(
            eval(&unknown, &scope).unwrap_err().code,
            ErrorCode::InvalidExpression
        );
    }

    #[test]
    fn tri_valued_logic_propagates_undefined() {
        let root = json!({"n": 3});
        let scope = Scope::new(&root);
        let defined = Expr::Compare {
            op: CompareOp::Gt,
            left: Box::new(Expr::Path(PathExpr {
                root: PathRoot::Identifier,
                name: Some("n".to_owned()),
                segments: vec![],
            })),
            right: Box::new(lit(json!(1))),
        };
        // Mixed-type ordered comparison is undefined.
        let undefined = Expr::Compare {
            op: CompareOp::Lt,
            left: Box::new(lit(json!("x"))),
            right: Box::new(lit(json!(1))),
        };

        assert_eq!(predicate(&defined, &scope), Truth::True);
        assert_eq!(predicate(&undefined, &scope), Truth::Undefined);
        assert_eq!(
            predicate(
                &Expr::And(Box::new(defined.clone()), Box::new(undefined.clone())),
                &scope
            ),
            Truth::Undefined
        );
        assert_eq!(
            predicate(&Expr::Or(Box::new(defined), Box::new(undefined)), &scope),
            Truth::Undefined
        );
    }

    #[test]
    fn string_comparison_prefers_temporal_order() {
        // Lexically "2026-01-02 00:00:00" sorts before "2026-01-10" only by
        // accident of the space; both sides parse, so the timestamps decide.
        let temporal = compare(
            CompareOp::Lt,
            &json!("2026-01-02 00:00:00"),
            &json!("2026-01-10"),
        );
        assert_eq!(temporal, Truth::True);

        let lexical = compare(CompareOp::Lt, &json!("abc"), &json!("abd"));
        assert_eq!(lexical, Truth::True);
    }

    #[test]
    fn matches_is_undefined_for_non_strings() {
        let root = json!({"n": 3});
        let scope = Scope::new(&root);
        let matches = Expr::Matches {
            expr: Box::new(Expr::Path(PathExpr {
                root: PathRoot::Identifier,
                name: Some("n".to_owned()),
                segments: vec![],
            })),
            pattern: "^a".to_owned(),
        };
        assert_eq!(predicate(&matches, &scope), Truth::Undefined);

        let bad_pattern = Expr::Matches {
            expr: Box::new(lit(json!("abc"))),
            pattern: "(".to_owned(),
        };
        assert_eq!(predicate(&bad_pattern, &scope), Truth::Undefined);
    }

    #[test]
    fn truthiness_coercion_of_plain_expressions() {
        let root = json!(null);
        let scope = Scope::new(&root);
        assert_eq!(predicate(&lit(json!("")), &scope), Truth::False);
        assert_eq!(predicate(&lit(json!("x")), &scope), Truth::True);
        assert_eq!(predicate(&lit(json!(0)), &scope), Truth::False);
        assert_eq!(predicate(&Expr::EmptyArray, &scope), Truth::False);
    }

    #[test]
    fn nullary_functions() {
        let root = json!(null);
        let scope = Scope::new(&root);
        let now = eval(
            &Expr::Call {
                name: "now".to_owned(),
                args: vec![],
            },
            &scope,
        )
        .unwrap();
        let shape = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap();
        assert!(shape.is_match(now.as_str().unwrap()));

        let pi = eval(
            &Expr::Call {
                name: "pi".to_owned(),
                args: vec![],
            },
            &scope,
        )
        .unwrap();
        assert_eq!(pi.as_f64(), Some(std::f64::consts::PI));

        let unknown = eval(
            &Expr::Call {
                name: "tau".to_owned(),
                args: vec![],
            },
            &scope,
        );
        assert_eq!(unknown.unwrap_err().code, ErrorCode::InvalidExpression);
    }

    #[test]
    fn variable_injection_into_patterns() {
        let root = json!(null);
        let scope = Scope::new(&root).with_variables(vec![
            ("prefix".to_owned(), json!("ord")),
            ("$prefix".to_owned(), json!("ord")),
            ("prefixLong".to_owned(), json!("order")),
        ]);
        assert_eq!(inject_variables("^$prefix-\\d+$", &scope), "^ord-\\d+$");
        assert_eq!(inject_variables("^$prefixLong$", &scope), "^order$");
    }
}

//! The built-in types and constraints every repository starts from.
//!
//! Built-ins are opaque to the engine: a type is a shape check, a validator
//! is a predicate over `(value, argument)`. Returning `None` from a
//! validator means the check does not apply to the value's shape, which the
//! engine reports as "not supported for current value".

use crate::expr::{self, Temporal, TemporalKind};
use crate::repository::{BuiltinType, BuiltinValidator, Repository};
use regex::Regex;
use serde_json::Value;

pub(crate) fn install(repository: &mut Repository) {
    repository.insert_builtin_type(BuiltinType::new("Any", |_| true));
    repository.insert_builtin_type(BuiltinType::new("Null", Value::is_null));
    repository.insert_builtin_type(BuiltinType::new("Bool", Value::is_boolean));
    repository.insert_builtin_type(BuiltinType::new("Int", is_whole_number));
    repository.insert_builtin_type(BuiltinType::new("Float", Value::is_number));
    repository.insert_builtin_type(BuiltinType::new("Number", Value::is_number));
    repository.insert_builtin_type(BuiltinType::new("String", Value::is_string));
    repository.insert_builtin_type(BuiltinType::new("Date", |value: &Value| {
        matches!(
            value.as_str().and_then(expr::parse_temporal),
            Some(Temporal {
                kind: TemporalKind::Date,
                ..
            })
        )
    }));
    repository.insert_builtin_type(BuiltinType::new("DateTime", |value: &Value| {
        value.as_str().and_then(expr::parse_temporal).is_some()
    }));
    repository.insert_builtin_type(BuiltinType::new("Array", Value::is_array));
    repository.insert_builtin_type(BuiltinType::new("Object", Value::is_object));

    for target in ["Int", "Float", "Number"] {
        repository.insert_builtin_validator(target, numeric_bound("min", |value, bound| value >= bound));
        repository.insert_builtin_validator(target, numeric_bound("max", |value, bound| value <= bound));
    }

    repository.insert_builtin_validator("String", length_bound("min", |len, bound| len >= bound));
    repository.insert_builtin_validator("String", length_bound("max", |len, bound| len <= bound));
    repository.insert_builtin_validator(
        "String",
        BuiltinValidator::new("regex", true, |value, argument| {
            let text = value.as_str()?;
            let pattern = argument?.as_str()?;
            match Regex::new(pattern) {
                Ok(regex) => Some(regex.is_match(text)),
                Err(_) => None,
            }
        }),
    );

    repository.insert_builtin_validator("Array", item_count_bound("min", |len, bound| len >= bound));
    repository.insert_builtin_validator("Array", item_count_bound("max", |len, bound| len <= bound));
    repository.insert_builtin_validator(
        "Array",
        BuiltinValidator::new("unique", false, |value, _argument| {
            let items = value.as_array()?;
            let distinct = items
                .iter()
                .enumerate()
                .all(|(i, item)| items[..i].iter().all(|earlier| earlier != item));
            Some(distinct)
        }),
    );

    for target in ["Date", "DateTime"] {
        repository.insert_builtin_validator(target, temporal_bound("min", |value, bound| value >= bound));
        repository.insert_builtin_validator(target, temporal_bound("max", |value, bound| value <= bound));
    }
}

// Whole floats count as integers, so `7.0` satisfies `Int`.
fn is_whole_number(value: &Value) -> bool {
    if value.as_i64().is_some() || value.as_u64().is_some() {
        return true;
    }
    value.as_f64().map_or(false, |f| f.fract() == 0.0)
}

fn numeric_bound(name: &str, passes: fn(f64, f64) -> bool) -> BuiltinValidator {
    BuiltinValidator::new(name, true, move |value, argument| {
        let value = value.as_f64()?;
        let bound = argument?.as_f64()?;
        Some(passes(value, bound))
    })
}

fn length_bound(name: &str, passes: fn(f64, f64) -> bool) -> BuiltinValidator {
    BuiltinValidator::new(name, true, move |value, argument| {
        let text = value.as_str()?;
        let bound = argument?.as_f64()?;
        Some(passes(text.chars().count() as f64, bound))
    })
}

fn item_count_bound(name: &str, passes: fn(f64, f64) -> bool) -> BuiltinValidator {
    BuiltinValidator::new(name, true, move |value, argument| {
        let items = value.as_array()?;
        let bound = argument?.as_f64()?;
        Some(passes(items.len() as f64, bound))
    })
}

fn temporal_bound(
    name: &str,
    passes: fn(chrono::NaiveDateTime, chrono::NaiveDateTime) -> bool,
) -> BuiltinValidator {
    BuiltinValidator::new(name, true, move |value, argument| {
        let value = expr::parse_temporal(value.as_str()?)?;
        let bound = expr::parse_temporal(argument?.as_str()?)?;
        Some(passes(value.ts, bound.ts))
    })
}

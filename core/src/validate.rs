//! Value coercion and constraint checking.
//!
//! Values arrive as [`serde_json::Value`]s, either from the command line
//! (already typed by the parser according to the declared type) or from a
//! direct call. [`validate_value`] walks a [`TypeHint`] and runs each scalar
//! through the matching `vld` schema. By default coercion is lax: numeric
//! and boolean strings are read as JSON first. Strict mode only accepts
//! values that already have the right JSON type.
//!
//! Failures are collected rather than short-circuited, so one
//! [`ValidationError`] reports every bad field at once.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Number, Value};
use vld::prelude::*;

use crate::field::Constraints;
use crate::types::TypeHint;

/// One step in the path to a failing value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocItem {
    /// Field or union member name.
    Key(String),
    /// Position in a list.
    Index(usize),
}

impl fmt::Display for LocItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// Category of a field failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required field not supplied.
    Missing,
    /// Non-null expected.
    NoneRequired,
    /// Wrong JSON type for a boolean.
    BoolType,
    /// String not recognised as a boolean.
    BoolParsing,
    /// Wrong JSON type for an integer.
    IntType,
    /// String not parseable as an integer.
    IntParsing,
    /// Float with a fractional part where an integer was expected.
    IntFromFloat,
    /// Wrong JSON type for a float.
    FloatType,
    /// String not parseable as a float.
    FloatParsing,
    /// Wrong JSON type for a string.
    StringType,
    /// Input for a JSON field was not a string.
    JsonType,
    /// String was not valid JSON.
    JsonInvalid,
    /// Not a list.
    ListType,
    /// Not a set.
    SetType,
    /// Not one of the allowed choices.
    LiteralError,
    /// Not a valid date.
    DateParsing,
    /// Not a valid date-time.
    DatetimeParsing,
    /// Violates `gt`.
    GreaterThan,
    /// Violates `ge`.
    GreaterThanEqual,
    /// Violates `lt`.
    LessThan,
    /// Violates `le`.
    LessThanEqual,
    /// Violates `multiple_of`.
    MultipleOf,
    /// Violates `min_length`.
    TooShort,
    /// Violates `max_length`.
    TooLong,
    /// Violates `pattern`.
    StringPatternMismatch,
    /// Rejected by a validator callback.
    ValueError,
}

/// A single failed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Path from the model root to the value.
    pub loc: Vec<LocItem>,
    /// Failure category.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Human-readable reason.
    #[serde(rename = "msg")]
    pub message: String,
    /// The rejected input.
    pub input: Value,
}

impl FieldError {
    /// Creates an error at the root location.
    pub fn new(kind: ErrorKind, message: impl Into<String>, input: Value) -> Self {
        Self {
            loc: Vec::new(),
            kind,
            message: message.into(),
            input,
        }
    }

    /// Prefixes the location with `item`.
    pub fn within(mut self, item: LocItem) -> Self {
        self.loc.insert(0, item);
        self
    }

    /// Dotted location, e.g. `numbers.1`.
    pub fn loc_string(&self) -> String {
        self.loc
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Input failed validation against a schema.
///
/// # Examples
///
/// ```
/// use command_model_core::{ErrorKind, FieldError, LocItem, ValidationError};
/// use serde_json::json;
///
/// let err = ValidationError::new(
///     "CountModel",
///     vec![FieldError::new(ErrorKind::GreaterThanEqual, "Input should be greater than or equal to 0", json!(-1))
///         .within(LocItem::Key("count".into()))],
/// );
/// assert!(err.to_string().starts_with("1 validation error for CountModel"));
/// assert_eq!(err.errors()[0].loc_string(), "count");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    model: String,
    errors: Vec<FieldError>,
}

impl ValidationError {
    /// Creates an error for `model` from per-field diagnostics.
    pub fn new(model: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            model: model.into(),
            errors,
        }
    }

    /// Name of the schema that rejected the input.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Per-field diagnostics.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Number of diagnostics.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Serializes the diagnostics as a JSON array.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.errors).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        let noun = if count == 1 { "error" } else { "errors" };
        write!(f, "{count} validation {noun} for {}", self.model)?;
        for err in &self.errors {
            let loc = err.loc_string();
            if !loc.is_empty() {
                write!(f, "\n{loc}")?;
            }
            write!(
                f,
                "\n  {} [type={}, input_value={}]",
                err.message,
                kind_code(err.kind),
                err.input
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn kind_code(kind: ErrorKind) -> String {
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}

/// Coercion mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Read numbers and booleans out of strings (`"3"`, `"true"`).
    Lax,
    /// Only accept values of the exact JSON type.
    Strict,
}

/// Coerces `value` to `hint`.
///
/// Scalar checks and numeric bounds are delegated to `vld` schemas; this
/// function maps the type structure (lists, sets, unions, constraints) onto
/// them and collects the failures with their locations.
///
/// # Errors
///
/// Returns every failure found, with locations relative to `value`.
///
/// # Examples
///
/// ```
/// use command_model_core::{Mode, TypeHint, validate_value};
/// use serde_json::json;
///
/// let hint = TypeHint::set(TypeHint::positive_int());
/// assert_eq!(validate_value(&hint, json!(["2", 2, 3]), Mode::Lax).unwrap(), json!([2, 3]));
/// assert!(validate_value(&hint, json!([1, -1]), Mode::Lax).is_err());
/// ```
pub fn validate_value(hint: &TypeHint, value: Value, mode: Mode) -> Result<Value, Vec<FieldError>> {
    match hint {
        TypeHint::Any => Ok(value),
        TypeHint::None => match value {
            Value::Null => Ok(Value::Null),
            other => Err(single(ErrorKind::NoneRequired, "Input should be None", other)),
        },
        TypeHint::Bool => {
            let value = loosen(value, mode);
            if accepts(vld::boolean(), &value) {
                return Ok(value);
            }
            Err(scalar_error(value, mode, ErrorKind::BoolParsing, ErrorKind::BoolType))
        }
        TypeHint::Int => {
            let value = loosen(value, mode);
            if accepts(vld::number().int(), &value) {
                if let Some(n) = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64)) {
                    return Ok(Value::from(n));
                }
            }
            let fractional = matches!(&value, Value::Number(n) if !n.is_i64() && !n.is_u64());
            if fractional && mode == Mode::Lax {
                return Err(single(ErrorKind::IntFromFloat, coercion_message(ErrorKind::IntFromFloat), value));
            }
            Err(scalar_error(value, mode, ErrorKind::IntParsing, ErrorKind::IntType))
        }
        TypeHint::Float => {
            let value = loosen(value, mode);
            if accepts(vld::number(), &value) {
                if let Some(n) = value.as_f64().and_then(Number::from_f64) {
                    return Ok(Value::Number(n));
                }
            }
            Err(scalar_error(value, mode, ErrorKind::FloatParsing, ErrorKind::FloatType))
        }
        TypeHint::Str => {
            if accepts(vld::string(), &value) {
                return Ok(value);
            }
            Err(single(ErrorKind::StringType, "Input should be a valid string", value))
        }
        TypeHint::Json => match value {
            Value::String(raw) => serde_json::from_str(&raw).map_err(|err| {
                single(ErrorKind::JsonInvalid, format!("Invalid JSON: {err}"), Value::String(raw))
            }),
            other => Err(single(
                ErrorKind::JsonType,
                "JSON input should be string, bytes or bytearray",
                other,
            )),
        },
        TypeHint::Date => coerce_date(value).map_err(|e| vec![e]),
        TypeHint::DateTime => coerce_datetime(value).map_err(|e| vec![e]),
        TypeHint::Choice(choices) => {
            let known = value.as_str().is_some_and(|s| choices.iter().any(|c| c == s));
            if known && accepts(vld::string(), &value) {
                return Ok(value);
            }
            let quoted: Vec<String> = choices.iter().map(|c| format!("'{c}'")).collect();
            let expected = match quoted.split_last() {
                Some((last, [])) => last.clone(),
                Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
                None => "nothing".to_string(),
            };
            Err(single(ErrorKind::LiteralError, format!("Input should be {expected}"), value))
        }
        TypeHint::List(item) => match value {
            Value::Array(items) => validate_items(item, items, mode).map(Value::Array),
            other => Err(single(ErrorKind::ListType, "Input should be a valid list", other)),
        },
        TypeHint::Set(item) => match value {
            Value::Array(items) => {
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for v in validate_items(item, items, mode)? {
                    if !unique.contains(&v) {
                        unique.push(v);
                    }
                }
                Ok(Value::Array(unique))
            }
            other => Err(single(ErrorKind::SetType, "Input should be a valid set", other)),
        },
        TypeHint::Union(members) => validate_union(members, value, mode),
        TypeHint::Constrained(inner, constraints) => {
            let mode = if constraints.strict { Mode::Strict } else { mode };
            let value = validate_value(inner, value, mode)?;
            check_constraints(constraints, &value).map_err(|e| vec![e])?;
            Ok(value)
        }
        TypeHint::Annotated(inner, _) => validate_value(inner, value, mode),
    }
}

/// Checks `value` against `constraints`.
///
/// Constraints that do not apply to the value's JSON type are skipped.
///
/// # Errors
///
/// Returns the first violated constraint.
///
/// # Examples
///
/// ```
/// use command_model_core::{Constraints, ErrorKind, check_constraints};
/// use serde_json::json;
///
/// let tenths = Constraints::default().multiple_of(0.1);
/// assert!(check_constraints(&tenths, &json!(0.3)).is_ok());
/// assert_eq!(check_constraints(&tenths, &json!(0.35)).unwrap_err().kind, ErrorKind::MultipleOf);
/// ```
pub fn check_constraints(constraints: &Constraints, value: &Value) -> Result<(), FieldError> {
    if let Some(n) = value.as_f64() {
        let bounds = [
            (constraints.gt, ErrorKind::GreaterThan, "greater than"),
            (constraints.ge, ErrorKind::GreaterThanEqual, "greater than or equal to"),
            (constraints.lt, ErrorKind::LessThan, "less than"),
            (constraints.le, ErrorKind::LessThanEqual, "less than or equal to"),
        ];
        for (bound, kind, phrase) in bounds {
            let Some(bound) = bound else { continue };
            let schema = match kind {
                ErrorKind::GreaterThan => vld::number().gt(bound),
                ErrorKind::GreaterThanEqual => vld::number().min(bound),
                ErrorKind::LessThan => vld::number().lt(bound),
                _ => vld::number().max(bound),
            };
            if !accepts(schema, value) {
                return Err(FieldError::new(
                    kind,
                    format!("Input should be {phrase} {bound}"),
                    value.clone(),
                ));
            }
        }
        if let Some(step) = constraints.multiple_of {
            if !is_multiple(n, step) {
                return Err(FieldError::new(
                    ErrorKind::MultipleOf,
                    format!("Input should be a multiple of {step}"),
                    value.clone(),
                ));
            }
        }
    }

    let (fits_min, fits_max, len_unit, subject) = match value {
        Value::String(_) => (
            constraints.min_length.is_none_or(|min| accepts(vld::string().min(min), value)),
            constraints.max_length.is_none_or(|max| accepts(vld::string().max(max), value)),
            "character",
            "String",
        ),
        Value::Array(items) => (
            constraints.min_length.is_none_or(|min| items.len() >= min),
            constraints.max_length.is_none_or(|max| items.len() <= max),
            "item",
            "Value",
        ),
        _ => return Ok(()),
    };
    if let (false, Some(min)) = (fits_min, constraints.min_length) {
        return Err(FieldError::new(
            ErrorKind::TooShort,
            format!("{subject} should have at least {min} {}", plural(len_unit, min)),
            value.clone(),
        ));
    }
    if let (false, Some(max)) = (fits_max, constraints.max_length) {
        return Err(FieldError::new(
            ErrorKind::TooLong,
            format!("{subject} should have at most {max} {}", plural(len_unit, max)),
            value.clone(),
        ));
    }
    if let (Some(pattern), Value::String(s)) = (&constraints.pattern, value) {
        if !pattern.is_match(s) {
            return Err(FieldError::new(
                ErrorKind::StringPatternMismatch,
                format!("String should match pattern '{}'", pattern.as_str()),
                value.clone(),
            ));
        }
    }
    Ok(())
}

fn accepts<S: VldSchema>(schema: S, value: &Value) -> bool {
    schema.parse_value(value).is_ok()
}

/// In lax mode a string holding a JSON number or boolean stands for it.
fn loosen(value: Value, mode: Mode) -> Value {
    let Value::String(raw) = &value else {
        return value;
    };
    if mode == Mode::Strict {
        return value;
    }
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(parsed @ (Value::Number(_) | Value::Bool(_))) => parsed,
        _ => value,
    }
}

/// Remainder within a billionth of the value counts as a multiple.
fn is_multiple(n: f64, step: f64) -> bool {
    if step == 0.0 {
        return true;
    }
    let rem = n % step;
    let tolerance = n.abs() / 1e9;
    rem.abs() <= tolerance || (rem.abs() - step.abs()).abs() <= tolerance
}

/// Unparseable strings in lax mode, wrong JSON type otherwise.
fn scalar_error(value: Value, mode: Mode, parsing: ErrorKind, wrong_type: ErrorKind) -> Vec<FieldError> {
    let kind = if value.is_string() && mode == Mode::Lax { parsing } else { wrong_type };
    single(kind, coercion_message(kind), value)
}

fn plural(unit: &str, n: usize) -> String {
    if n == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}

fn single(kind: ErrorKind, message: impl Into<String>, input: Value) -> Vec<FieldError> {
    vec![FieldError::new(kind, message, input)]
}

fn validate_items(item: &TypeHint, items: Vec<Value>, mode: Mode) -> Result<Vec<Value>, Vec<FieldError>> {
    let mut out = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (idx, v) in items.into_iter().enumerate() {
        match validate_value(item, v, mode) {
            Ok(v) => out.push(v),
            Err(errs) => errors.extend(errs.into_iter().map(|e| e.within(LocItem::Index(idx)))),
        }
    }
    if errors.is_empty() { Ok(out) } else { Err(errors) }
}

// Exact matches win over coercions: every member is tried strictly before
// any member is tried in the caller's mode.
fn validate_union(members: &[TypeHint], value: Value, mode: Mode) -> Result<Value, Vec<FieldError>> {
    if let Some(v) = members
        .iter()
        .find_map(|member| validate_value(member, value.clone(), Mode::Strict).ok())
    {
        return Ok(v);
    }
    let mut errors = Vec::new();
    for member in members {
        match validate_value(member, value.clone(), mode) {
            Ok(v) => return Ok(v),
            Err(errs) => {
                let key = LocItem::Key(member.to_string());
                errors.extend(errs.into_iter().map(|e| e.within(key.clone())));
            }
        }
    }
    Err(errors)
}

fn coercion_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::BoolType => "Input should be a valid boolean",
        ErrorKind::BoolParsing => "Input should be a valid boolean, unable to interpret input",
        ErrorKind::IntType => "Input should be a valid integer",
        ErrorKind::IntParsing => {
            "Input should be a valid integer, unable to parse string as an integer"
        }
        ErrorKind::IntFromFloat => {
            "Input should be a valid integer, got a number with a fractional part"
        }
        ErrorKind::FloatType => "Input should be a valid number",
        ErrorKind::FloatParsing => {
            "Input should be a valid number, unable to parse string as a number"
        }
        _ => "Invalid input",
    }
}

fn coerce_date(value: Value) -> Result<Value, FieldError> {
    let Value::String(s) = &value else {
        return Err(FieldError::new(ErrorKind::DateParsing, "Input should be a valid date", value));
    };
    match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
        Ok(date) => Ok(Value::String(date.format("%Y-%m-%d").to_string())),
        Err(err) => Err(FieldError::new(
            ErrorKind::DateParsing,
            format!("Input should be a valid date in the format YYYY-MM-DD, {err}"),
            value,
        )),
    }
}

fn coerce_datetime(value: Value) -> Result<Value, FieldError> {
    let Value::String(s) = &value else {
        return Err(FieldError::new(
            ErrorKind::DatetimeParsing,
            "Input should be a valid datetime",
            value,
        ));
    };
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Value::String(dt.to_rfc3339()));
    }
    match NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        Ok(dt) => Ok(Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())),
        Err(err) => Err(FieldError::new(
            ErrorKind::DatetimeParsing,
            format!("Input should be a valid datetime, {err}"),
            value,
        )),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn lax(hint: &TypeHint, value: Value) -> Result<Value, Vec<FieldError>> {
        validate_value(hint, value, Mode::Lax)
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(lax(&TypeHint::Int, json!("42")).unwrap(), json!(42));
        assert_eq!(lax(&TypeHint::Int, json!(" 7 ")).unwrap(), json!(7));
        assert_eq!(lax(&TypeHint::Int, json!("x")).unwrap_err()[0].kind, ErrorKind::IntParsing);
        assert_eq!(lax(&TypeHint::Int, json!(1.5)).unwrap_err()[0].kind, ErrorKind::IntFromFloat);
        assert_eq!(
            validate_value(&TypeHint::Int, json!("42"), Mode::Strict).unwrap_err()[0].kind,
            ErrorKind::IntType
        );
    }

    #[test]
    fn test_bool_and_float_coercion() {
        assert_eq!(lax(&TypeHint::Bool, json!("true")).unwrap(), json!(true));
        assert_eq!(lax(&TypeHint::Bool, json!("maybe")).unwrap_err()[0].kind, ErrorKind::BoolParsing);
        assert_eq!(lax(&TypeHint::Bool, json!(0)).unwrap_err()[0].kind, ErrorKind::BoolType);
        assert_eq!(lax(&TypeHint::Float, json!("2.5")).unwrap(), json!(2.5));
        assert_eq!(lax(&TypeHint::Float, json!("inf")).unwrap_err()[0].kind, ErrorKind::FloatParsing);
        assert_eq!(
            validate_value(&TypeHint::Float, json!("2.5"), Mode::Strict).unwrap_err()[0].kind,
            ErrorKind::FloatType
        );
    }

    #[test]
    fn test_str_is_not_coerced_from_numbers() {
        assert_eq!(lax(&TypeHint::Str, json!(1)).unwrap_err()[0].kind, ErrorKind::StringType);
    }

    #[test]
    fn test_json_list() {
        let hint = TypeHint::list(TypeHint::Json);
        let out = lax(&hint, json!(["{\"a\": 1}", "[1,2]"])).unwrap();
        assert_eq!(out, json!([{"a": 1}, [1, 2]]));

        let errs = lax(&hint, json!(["{", "1"])).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].loc, vec![LocItem::Index(0)]);
        assert_eq!(errs[0].kind, ErrorKind::JsonInvalid);
    }

    #[test]
    fn test_optional_union_prefers_exact_match() {
        let hint = TypeHint::optional(TypeHint::set(TypeHint::positive_int()));
        assert_eq!(lax(&hint, Value::Null).unwrap(), Value::Null);
        assert_eq!(lax(&hint, json!([2, 2, 1])).unwrap(), json!([2, 1]));

        let errs = lax(&hint, json!([2, -1])).unwrap_err();
        assert!(errs.iter().any(|e| e.kind == ErrorKind::GreaterThan));
        assert!(errs.iter().any(|e| e.kind == ErrorKind::NoneRequired));
    }

    #[test]
    fn test_union_of_scalars() {
        let hint = TypeHint::Union(vec![TypeHint::Int, TypeHint::Str]);
        assert_eq!(lax(&hint, json!("5")).unwrap(), json!("5"));
        assert_eq!(lax(&hint, json!(5)).unwrap(), json!(5));
    }

    #[test]
    fn test_choice() {
        let hint = TypeHint::choice(["json", "yaml", "toml"]);
        assert_eq!(lax(&hint, json!("yaml")).unwrap(), json!("yaml"));
        let err = &lax(&hint, json!("xml")).unwrap_err()[0];
        assert_eq!(err.message, "Input should be 'json', 'yaml' or 'toml'");
    }

    #[test]
    fn test_dates() {
        assert_eq!(lax(&TypeHint::Date, json!("2024-02-29")).unwrap(), json!("2024-02-29"));
        assert!(lax(&TypeHint::Date, json!("2023-02-29")).is_err());
        assert_eq!(
            lax(&TypeHint::DateTime, json!("2024-01-15T10:30:00")).unwrap(),
            json!("2024-01-15T10:30:00")
        );
        assert!(lax(&TypeHint::DateTime, json!("yesterday")).is_err());
    }

    #[test]
    fn test_length_and_pattern_constraints() {
        let c = Constraints::default()
            .min_length(2)
            .max_length(4)
            .pattern(crate::Pattern::new("^[a-z]+$").unwrap());
        assert!(check_constraints(&c, &json!("abc")).is_ok());
        assert_eq!(check_constraints(&c, &json!("a")).unwrap_err().kind, ErrorKind::TooShort);
        assert_eq!(check_constraints(&c, &json!("abcde")).unwrap_err().kind, ErrorKind::TooLong);
        assert_eq!(
            check_constraints(&c, &json!("ab1")).unwrap_err().kind,
            ErrorKind::StringPatternMismatch
        );
        assert_eq!(check_constraints(&c, &json!([1])).unwrap_err().kind, ErrorKind::TooShort);
    }

    #[test]
    fn test_numeric_constraints() {
        let c = Constraints::default().ge(0.0).lt(10.0).multiple_of(2.0);
        assert!(check_constraints(&c, &json!(4)).is_ok());
        let err = check_constraints(&c, &json!(-1)).unwrap_err();
        assert_eq!(err.message, "Input should be greater than or equal to 0");
        assert_eq!(check_constraints(&c, &json!(10)).unwrap_err().kind, ErrorKind::LessThan);
        assert_eq!(check_constraints(&c, &json!(3)).unwrap_err().kind, ErrorKind::MultipleOf);
    }

    #[test]
    fn test_float_multiple_of_tolerates_rounding() {
        let hint = TypeHint::Float.constrained(Constraints::default().multiple_of(0.1));
        for ok in [0.3, 0.7, -1.1, 0.0, 12.5] {
            assert!(lax(&hint, json!(ok)).is_ok(), "{ok}");
        }
        let errs = lax(&hint, json!(0.25)).unwrap_err();
        assert_eq!(errs[0].kind, ErrorKind::MultipleOf);
        assert_eq!(errs[0].message, "Input should be a multiple of 0.1");
    }

    #[test]
    fn test_validation_error_display_and_json() {
        let err = ValidationError::new(
            "CommandModel",
            vec![
                FieldError::new(ErrorKind::Missing, "Field required", Value::Null)
                    .within(LocItem::Key("x".into())),
                FieldError::new(ErrorKind::IntParsing, "Input should be a valid integer", json!("a"))
                    .within(LocItem::Index(1))
                    .within(LocItem::Key("ys".into())),
            ],
        );
        let text = err.to_string();
        assert!(text.starts_with("2 validation errors for CommandModel\nx\n  Field required [type=missing"));
        assert!(text.contains("\nys.1\n"));

        let json = err.to_json();
        assert_eq!(json[1]["loc"], json!(["ys", 1]));
        assert_eq!(json[1]["type"], json!("int_parsing"));
    }
}

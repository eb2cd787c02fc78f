//! Schema synthesis from signatures.
//!
//! [`ModelSchema::from_signature`] turns every annotated parameter of a
//! [`Signature`] into a [`FieldDef`]; [`ModelSchema::validate`] then coerces
//! and checks a keyword map against those fields.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::field::FieldSpec;
use crate::params::FieldValidator;
use crate::signature::{ParameterDefault, Signature};
use crate::types::{TypeHint, resolve_override};
use crate::validate::{ErrorKind, FieldError, LocItem, Mode, ValidationError, check_constraints, validate_value};

/// When a command-level validator runs relative to field validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorMode {
    /// On the raw matched values, before field coercion.
    Before,
    /// On the coerced values, after every field passed.
    After,
}

type ModelFn = dyn Fn(Map<String, Value>) -> Result<Map<String, Value>, String> + Send + Sync;

/// Command-level validator over the whole keyword map.
///
/// Both modes receive the in-flight map and return the map to continue with.
/// Returning `Err(message)` rejects the input.
#[derive(Clone)]
pub struct ModelValidator {
    mode: ValidatorMode,
    func: Arc<ModelFn>,
}

impl ModelValidator {
    /// Wraps `f` to run in `mode`.
    pub fn new<F>(mode: ValidatorMode, f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Result<Map<String, Value>, String> + Send + Sync + 'static,
    {
        Self {
            mode,
            func: Arc::new(f),
        }
    }

    /// When the validator runs.
    pub fn mode(&self) -> ValidatorMode {
        self.mode
    }

    /// Runs the validator.
    pub fn call(&self, values: Map<String, Value>) -> Result<Map<String, Value>, String> {
        (self.func)(values)
    }
}

impl fmt::Debug for ModelValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelValidator").field("mode", &self.mode).finish_non_exhaustive()
    }
}

/// One field of a [`ModelSchema`].
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name, equal to the parameter name.
    pub name: String,
    /// Type used for validation, after parse overrides are resolved.
    pub ty: TypeHint,
    /// Constraints and metadata.
    pub spec: FieldSpec,
    /// Value used when the input omits the field.
    pub default: Option<Value>,
    /// Per-field validator.
    pub validator: Option<FieldValidator>,
}

/// Validation model synthesized from a signature.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: String,
    fields: Vec<FieldDef>,
    validator: Option<ModelValidator>,
}

impl ModelSchema {
    /// Builds the schema for `sig`.
    ///
    /// Only annotated parameters become fields. Field types go through
    /// [`resolve_override`], so `Annotated[int, Parse(PositiveInt)]` validates
    /// as `PositiveInt`.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_model_core::{ModelSchema, Parameter, Signature, TypeHint};
    ///
    /// let sig = Signature::new("add_user")
    ///     .arg("name", TypeHint::Str)
    ///     .push(Parameter::new("raw"));
    /// let schema = ModelSchema::from_signature(&sig, None);
    ///
    /// assert_eq!(schema.name(), "AddUserModel");
    /// assert_eq!(schema.field_names().collect::<Vec<_>>(), ["name"]);
    /// ```
    pub fn from_signature(sig: &Signature, validator: Option<ModelValidator>) -> Self {
        let fields: Vec<FieldDef> = sig
            .params()
            .iter()
            .filter_map(|param| {
                let annotation = param.annotation.as_ref()?;
                let (spec, default, field_validator) = match &param.default {
                    ParameterDefault::Param(info) => (
                        info.field_kwargs().clone(),
                        info.default().produce(),
                        info.field_validator().cloned(),
                    ),
                    ParameterDefault::Value(v) => (FieldSpec::default(), Some(v.clone()), None),
                    ParameterDefault::Empty => (FieldSpec::default(), None, None),
                };
                Some(FieldDef {
                    name: param.name.clone(),
                    ty: resolve_override(annotation),
                    spec,
                    default,
                    validator: field_validator,
                })
            })
            .collect();

        let name = format!("{}Model", pascal_case(sig.name()));
        debug!(model = %name, fields = fields.len(), "synthesized schema");
        Self {
            name,
            fields,
            validator,
        }
    }

    /// Model name, `<PascalCase(fn)>Model`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns `true` if `name` is a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Command-level validator.
    pub fn validator(&self) -> Option<&ModelValidator> {
        self.validator.as_ref()
    }

    /// Validates `input`, returning the coerced field values.
    ///
    /// A `Before` validator runs first on the raw map. Each field is then
    /// coerced to its type, checked against its constraints and passed to its
    /// validator. Missing fields take their default as is, or are reported as
    /// missing. Every field error is collected before failing. An `After`
    /// validator runs last on the coerced map.
    ///
    /// Keys that are not fields are dropped from the result, including keys
    /// an `After` validator adds.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming this model if any field fails or a
    /// command-level validator rejects the input.
    pub fn validate(&self, input: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        let mut input = match &self.validator {
            Some(v) if v.mode() == ValidatorMode::Before => v.call(input).map_err(|msg| self.model_error(msg))?,
            _ => input,
        };

        let mut output = Map::new();
        let mut errors = Vec::new();
        for field in &self.fields {
            let key = LocItem::Key(field.name.clone());
            let Some(raw) = input.remove(&field.name) else {
                match &field.default {
                    Some(default) => {
                        output.insert(field.name.clone(), default.clone());
                    }
                    None => errors.push(
                        FieldError::new(ErrorKind::Missing, "Field required", Value::Object(Map::new()))
                            .within(key),
                    ),
                }
                continue;
            };
            match self.validate_field(field, raw) {
                Ok(value) => {
                    output.insert(field.name.clone(), value);
                }
                Err(errs) => errors.extend(errs.into_iter().map(|e| e.within(key.clone()))),
            }
        }

        if !errors.is_empty() {
            debug!(model = %self.name, errors = errors.len(), "validation failed");
            return Err(ValidationError::new(&self.name, errors));
        }

        match &self.validator {
            Some(v) if v.mode() == ValidatorMode::After => {
                let mut output = v.call(output).map_err(|msg| self.model_error(msg))?;
                output.retain(|key, _| self.has_field(key));
                Ok(output)
            }
            _ => Ok(output),
        }
    }

    fn validate_field(&self, field: &FieldDef, raw: Value) -> Result<Value, Vec<FieldError>> {
        let constraints = &field.spec.constraints;
        let mode = if constraints.strict { Mode::Strict } else { Mode::Lax };
        let value = validate_value(&field.ty, raw, mode)?;
        check_constraints(constraints, &value).map_err(|e| vec![e])?;
        match &field.validator {
            Some(validator) => validator
                .call(value.clone())
                .map_err(|msg| vec![FieldError::new(ErrorKind::ValueError, format!("Value error, {msg}"), value)]),
            None => Ok(value),
        }
    }

    fn model_error(&self, msg: String) -> ValidationError {
        let error = FieldError::new(ErrorKind::ValueError, format!("Value error, {msg}"), Value::Null);
        ValidationError::new(&self.name, vec![error])
    }
}

/// `snake_case` or `kebab-case` to `PascalCase`.
fn pascal_case(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::params::ParamInfo;
    use crate::signature::Parameter;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("simple_command"), "SimpleCommand");
        assert_eq!(pascal_case("run"), "Run");
        assert_eq!(pascal_case("_private__name"), "PrivateName");
    }

    #[test]
    fn test_unannotated_parameters_excluded() {
        let sig = Signature::new("f")
            .arg("typed", TypeHint::Int)
            .push(Parameter::new("loose").default_value(json!(1)));
        let schema = ModelSchema::from_signature(&sig, None);
        assert!(schema.has_field("typed"));
        assert!(!schema.has_field("loose"));
    }

    #[test]
    fn test_parse_override_used_for_validation() {
        let sig = Signature::new("f").arg(
            "count",
            TypeHint::optional(TypeHint::Int.parse_as(TypeHint::positive_int())),
        );
        let schema = ModelSchema::from_signature(&sig, None);

        assert!(schema.validate(obj(json!({"count": 0}))).is_err());
        assert_eq!(
            schema.validate(obj(json!({"count": 3}))).unwrap(),
            obj(json!({"count": 3}))
        );
        assert_eq!(
            schema.validate(obj(json!({"count": null}))).unwrap(),
            obj(json!({"count": null}))
        );
    }

    #[test]
    fn test_missing_field_uses_default_or_fails() {
        let sig = Signature::new("f")
            .arg("needed", TypeHint::Int)
            .arg_with_default("extra", TypeHint::Int, json!(5));
        let schema = ModelSchema::from_signature(&sig, None);

        let err = schema.validate(Map::new()).unwrap_err();
        assert_eq!(err.error_count(), 1);
        assert_eq!(err.errors()[0].kind, ErrorKind::Missing);
        assert_eq!(err.errors()[0].loc_string(), "needed");

        let ok = schema.validate(obj(json!({"needed": "2"}))).unwrap();
        assert_eq!(ok, obj(json!({"needed": 2, "extra": 5})));
    }

    #[test]
    fn test_field_constraints_from_descriptor() {
        let info = ParamInfo::argument(json!(null))
            .annotation(TypeHint::Int)
            .kwarg("ge", json!(0))
            .unwrap();
        let sig = Signature::new("count").with_param("count", info);
        let schema = ModelSchema::from_signature(&sig, None);

        let err = schema.validate(obj(json!({"count": -1}))).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::GreaterThanEqual);
        assert_eq!(
            err.to_string(),
            "1 validation error for CountModel\ncount\n  Input should be greater than or equal to 0 [type=greater_than_equal, input_value=-1]"
        );
    }

    #[test]
    fn test_errors_are_collected_across_fields() {
        let sig = Signature::new("f").arg("a", TypeHint::Int).arg("b", TypeHint::Bool);
        let schema = ModelSchema::from_signature(&sig, None);
        let err = schema.validate(obj(json!({"a": "x", "b": "maybe"}))).unwrap_err();
        assert_eq!(err.error_count(), 2);
    }

    #[test]
    fn test_field_validator_runs_after_coercion() {
        let info = ParamInfo::argument(json!(0))
            .annotation(TypeHint::Int)
            .with_validator(|v| match v.as_i64() {
                Some(n) if n % 2 == 0 => Ok(json!(n * 2)),
                _ => Err("must be even".to_string()),
            });
        let sig = Signature::new("f").with_param("n", info);
        let schema = ModelSchema::from_signature(&sig, None);

        assert_eq!(schema.validate(obj(json!({"n": "2"}))).unwrap(), obj(json!({"n": 4})));
        let err = schema.validate(obj(json!({"n": 3}))).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::ValueError);
        assert_eq!(err.errors()[0].message, "Value error, must be even");
    }

    #[test]
    fn test_after_validator_cannot_add_fields() {
        let sig = Signature::new("f").arg_with_default("x", TypeHint::Int, json!(1));
        let after = ModelValidator::new(ValidatorMode::After, |mut m| {
            m.insert("injected".into(), json!(true));
            Ok(m)
        });
        let schema = ModelSchema::from_signature(&sig, Some(after));
        assert_eq!(schema.validate(obj(json!({"x": 3, "extra": 0}))).unwrap(), obj(json!({"x": 3})));
    }

    #[test]
    fn test_model_validators_before_and_after() {
        let sig = Signature::new("f")
            .arg_with_default("x", TypeHint::Int, json!(1))
            .arg_with_default("y", TypeHint::Int, json!(2));

        let after = ModelValidator::new(ValidatorMode::After, |mut m| {
            let x = m.get("x").and_then(Value::as_i64).unwrap_or_default();
            let y = m.get("y").and_then(Value::as_i64).unwrap_or_default();
            m.insert("x".into(), json!(x * y));
            Ok(m)
        });
        let schema = ModelSchema::from_signature(&sig, Some(after));
        assert_eq!(schema.validate(Map::new()).unwrap(), obj(json!({"x": 2, "y": 2})));

        let before = ModelValidator::new(ValidatorMode::Before, |mut m| {
            m.insert("x".into(), json!("7"));
            Ok(m)
        });
        let schema = ModelSchema::from_signature(&sig, Some(before));
        assert_eq!(schema.validate(Map::new()).unwrap(), obj(json!({"x": 7, "y": 2})));

        let reject = ModelValidator::new(ValidatorMode::Before, |_| Err("nope".to_string()));
        let schema = ModelSchema::from_signature(&sig, Some(reject));
        let err = schema.validate(Map::new()).unwrap_err();
        assert_eq!(err.errors()[0].message, "Value error, nope");
    }
}

//! Parameter descriptors: declarative `Argument` and `Option` specifications.
//!
//! A [`ParamInfo`] is used as a parameter's default in a
//! [`Signature`](crate::Signature). It carries what the command-line parser
//! needs (names, help, metavar, ...) and what the validation schema needs
//! (constraints in [`FieldSpec`], a per-parameter [`FieldValidator`]), plus an
//! optional declared type exposed through [`ParamInfo::ann`].
//!
//! # Examples
//!
//! ```
//! use command_model_core::{ParamDefault, ParamInfo, TypeHint};
//! use serde_json::json;
//!
//! let count = ParamInfo::argument(ParamDefault::Required)
//!     .annotation(TypeHint::Int)
//!     .kwargs([("help", json!("How many times")), ("ge", json!(0))])
//!     .unwrap();
//! assert_eq!(count.field_kwargs().constraints.ge, Some(0.0));
//! // `help` doubles as the schema description.
//! assert_eq!(count.field_kwargs().description.as_deref(), Some("How many times"));
//!
//! let names = ParamInfo::option(json!(null), ["--name", "-n"])
//!     .annotation(TypeHint::optional(TypeHint::list(TypeHint::Str)));
//! assert_eq!(names.decls(), ["--name", "-n"]);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::field::{FIELD_KEYS, FieldSpec};
use crate::types::TypeHint;
use crate::{BindingError, ConfigurationError};

/// Keys handled by the command-line parser rather than the schema.
pub const PARSE_KEYS: &[&str] = &[
    "help",
    "metavar",
    "hidden",
    "envvar",
    "show_default",
    "help_heading",
    "ignore_case",
];

/// Positional argument or named option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Positional.
    Argument,
    /// Named, `--flag value`.
    Option,
}

impl ParamKind {
    /// Constructor name used in diagnostics.
    pub fn constructor(self) -> &'static str {
        match self {
            Self::Argument => "Argument",
            Self::Option => "Option",
        }
    }
}

/// Produces a fresh default value on every use.
#[derive(Clone)]
pub struct DefaultFactory(Arc<dyn Fn() -> Value + Send + Sync>);

impl DefaultFactory {
    /// Wraps `f`.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Produces a value.
    pub fn produce(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultFactory(..)")
    }
}

/// Default of a parameter descriptor.
#[derive(Debug, Clone)]
pub enum ParamDefault {
    /// No default; the value must be supplied.
    Required,
    /// A fixed value.
    Value(Value),
    /// A value produced on demand.
    Factory(DefaultFactory),
}

impl ParamDefault {
    /// Returns `true` for [`ParamDefault::Required`].
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }

    /// Materialises the default, if there is one.
    pub fn produce(&self) -> Option<Value> {
        match self {
            Self::Required => None,
            Self::Value(v) => Some(v.clone()),
            Self::Factory(f) => Some(f.produce()),
        }
    }
}

impl From<Value> for ParamDefault {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Per-parameter validator, run after coercion and constraints.
///
/// Returning `Err(message)` rejects the value.
#[derive(Clone)]
pub struct FieldValidator(Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>);

impl FieldValidator {
    /// Wraps `f`.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the validator.
    pub fn call(&self, value: Value) -> Result<Value, String> {
        (self.0)(value)
    }

    /// Returns `true` if both handles wrap the same callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldValidator(..)")
    }
}

/// Declarative parameter specification.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    kind: ParamKind,
    default: ParamDefault,
    decls: Vec<String>,
    annotation: Option<TypeHint>,
    help: Option<String>,
    metavar: Option<String>,
    hidden: bool,
    envvar: Option<String>,
    show_default: bool,
    help_heading: Option<String>,
    ignore_case: bool,
    field_kwargs: FieldSpec,
    validator: Option<FieldValidator>,
}

impl ParamInfo {
    fn new(kind: ParamKind, default: ParamDefault, decls: Vec<String>) -> Self {
        Self {
            kind,
            default,
            decls,
            annotation: None,
            help: None,
            metavar: None,
            hidden: false,
            envvar: None,
            show_default: true,
            help_heading: None,
            ignore_case: false,
            field_kwargs: FieldSpec::default(),
            validator: None,
        }
    }

    /// Declares a positional argument.
    pub fn argument(default: impl Into<ParamDefault>) -> Self {
        Self::new(ParamKind::Argument, default.into(), Vec::new())
    }

    /// Declares a named option with optional explicit names such as
    /// `"--name"` or `"-n"`.
    pub fn option<I, S>(default: impl Into<ParamDefault>, decls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            ParamKind::Option,
            default.into(),
            decls.into_iter().map(Into::into).collect(),
        )
    }

    /// Sets the declared type.
    pub fn annotation(mut self, ty: TypeHint) -> Self {
        self.annotation = Some(ty);
        self
    }

    /// Sets the help text.
    ///
    /// The schema description is filled from it unless one was given.
    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self.fill_description();
        self
    }

    /// Sets the value name shown in usage.
    pub fn metavar(mut self, metavar: &str) -> Self {
        self.metavar = Some(metavar.to_string());
        self
    }

    /// Hides the parameter from help output.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Reads the value from an environment variable when not given.
    pub fn envvar(mut self, var: &str) -> Self {
        self.envvar = Some(var.to_string());
        self
    }

    /// Shows or hides the default in help output.
    pub fn show_default(mut self, show: bool) -> Self {
        self.show_default = show;
        self
    }

    /// Groups the parameter under a help heading.
    pub fn help_heading(mut self, heading: &str) -> Self {
        self.help_heading = Some(heading.to_string());
        self
    }

    /// Matches choice values case-insensitively on the command line.
    pub fn ignore_case(mut self, ignore: bool) -> Self {
        self.ignore_case = ignore;
        self
    }

    /// Replaces the default with a factory.
    pub fn default_factory<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = ParamDefault::Factory(DefaultFactory::new(f));
        self
    }

    /// Overlays `spec` onto the field keywords.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.field_kwargs.merge(&spec);
        self.fill_description();
        self
    }

    /// Attaches a validator, builder style.
    pub fn with_validator<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.validator = Some(FieldValidator::new(f));
        self
    }

    /// Applies one keyword pair, routed to the parser or to the schema.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnexpectedKeyword`] if `key` is neither a
    /// parser key ([`PARSE_KEYS`]) nor a field key ([`FIELD_KEYS`]), and
    /// [`ConfigurationError::InvalidKeyword`] if the value has the wrong
    /// shape.
    pub fn kwarg(self, key: &str, value: Value) -> Result<Self, ConfigurationError> {
        self.kwargs([(key, value)])
    }

    /// Applies keyword pairs, routed to the parser or to the schema.
    ///
    /// All keys are checked before anything is applied.
    ///
    /// # Errors
    ///
    /// See [`ParamInfo::kwarg`].
    pub fn kwargs<I, K>(mut self, kwargs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let kwargs: Vec<(K, Value)> = kwargs.into_iter().collect();
        let constructor = self.kind.constructor();
        if let Some((key, _)) = kwargs.iter().find(|(key, _)| {
            let key = key.as_ref();
            !PARSE_KEYS.contains(&key) && !FIELD_KEYS.contains(&key)
        }) {
            return Err(ConfigurationError::UnexpectedKeyword {
                constructor,
                key: key.as_ref().to_string(),
            });
        }

        let mut field = FieldSpec::default();
        for (key, value) in &kwargs {
            let key = key.as_ref();
            if FieldSpec::is_field_key(key) {
                field.apply(key, value)?;
            } else {
                self.apply_parse_key(key, value)?;
            }
        }
        self.field_kwargs.merge(&field);
        self.fill_description();
        Ok(self)
    }

    fn apply_parse_key(&mut self, key: &str, value: &Value) -> Result<(), ConfigurationError> {
        let as_string = || {
            value
                .as_str()
                .map(String::from)
                .ok_or_else(|| ConfigurationError::InvalidKeyword {
                    key: key.to_string(),
                    reason: "expected a string".to_string(),
                })
        };
        let as_bool = || {
            value.as_bool().ok_or_else(|| ConfigurationError::InvalidKeyword {
                key: key.to_string(),
                reason: "expected a boolean".to_string(),
            })
        };
        match key {
            "help" => self.help = Some(as_string()?),
            "metavar" => self.metavar = Some(as_string()?),
            "hidden" => self.hidden = as_bool()?,
            "envvar" => self.envvar = Some(as_string()?),
            "show_default" => self.show_default = as_bool()?,
            "help_heading" => self.help_heading = Some(as_string()?),
            "ignore_case" => self.ignore_case = as_bool()?,
            _ => {
                return Err(ConfigurationError::UnexpectedKeyword {
                    constructor: self.kind.constructor(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    fn fill_description(&mut self) {
        if self.field_kwargs.description.is_none() {
            self.field_kwargs.description.clone_from(&self.help);
        }
    }

    /// Re-invokes the descriptor's constructor, keeping every attribute the
    /// call does not override.
    ///
    /// `args` bind positionally to the constructor: the first value becomes
    /// the default, further values (options only) become option names.
    /// `kwargs` are routed exactly like [`ParamInfo::kwargs`].
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError::Binding`] if an argument receives more
    /// than one positional value, or with the errors of
    /// [`ParamInfo::kwargs`].
    ///
    /// # Examples
    ///
    /// ```
    /// use command_model_core::{ParamInfo, TypeHint};
    /// use serde_json::json;
    ///
    /// let original = ParamInfo::argument(json!(1)).annotation(TypeHint::Int);
    /// let clone = original
    ///     .call(&[json!("x1")], std::iter::empty::<(&str, _)>())
    ///     .unwrap()
    ///     .annotation(TypeHint::Str);
    ///
    /// assert_ne!(clone.ann(), original.ann());
    /// assert_eq!(clone.default().produce(), Some(json!("x1")));
    /// ```
    pub fn call<I, K>(&self, args: &[Value], kwargs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.call_as(self.kind, args, kwargs)
    }

    /// Like [`ParamInfo::call`], but requests a specific variant.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError::IncompatibleVariant`] if `kind`
    /// differs from this descriptor's kind.
    pub fn call_as<I, K>(&self, kind: ParamKind, args: &[Value], kwargs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        if kind != self.kind {
            return Err(ConfigurationError::IncompatibleVariant {
                target: kind.constructor(),
                from: self.kind.constructor(),
            });
        }

        let mut next = self.clone();
        let mut positional = args.iter();
        if let Some(default) = positional.next() {
            next.default = ParamDefault::Value(default.clone());
        }
        let rest: Vec<&Value> = positional.collect();
        match kind {
            ParamKind::Argument if !rest.is_empty() => {
                return Err(BindingError::TooManyPositional {
                    expected: 1,
                    given: args.len(),
                }
                .into());
            }
            ParamKind::Option if !rest.is_empty() => {
                next.decls = rest
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => Ok(s.clone()),
                        other => Err(ConfigurationError::InvalidKeyword {
                            key: "param_decls".to_string(),
                            reason: format!("expected a string, got {other}"),
                        }),
                    })
                    .collect::<Result<_, _>>()?;
            }
            _ => {}
        }
        next.kwargs(kwargs)
    }

    /// Attaches a per-parameter validator after construction.
    ///
    /// Returns the validator handle so the same callback can be reused.
    pub fn validator<F>(&mut self, f: F) -> FieldValidator
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let validator = FieldValidator::new(f);
        self.validator = Some(validator.clone());
        validator
    }

    /// Positional or named.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// The declared type, for use as the parameter's annotation.
    pub fn ann(&self) -> Option<&TypeHint> {
        self.annotation.as_ref()
    }

    /// The default.
    pub fn default(&self) -> &ParamDefault {
        &self.default
    }

    /// Explicit option names.
    pub fn decls(&self) -> &[String] {
        &self.decls
    }

    /// Help text.
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Value name shown in usage.
    pub fn metavar_name(&self) -> Option<&str> {
        self.metavar.as_deref()
    }

    /// Hidden from help output.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Environment variable fallback.
    pub fn env_var(&self) -> Option<&str> {
        self.envvar.as_deref()
    }

    /// Whether help output shows the default.
    pub fn shows_default(&self) -> bool {
        self.show_default
    }

    /// Help heading.
    pub fn heading(&self) -> Option<&str> {
        self.help_heading.as_deref()
    }

    /// Case-insensitive choice matching.
    pub fn is_case_insensitive(&self) -> bool {
        self.ignore_case
    }

    /// Schema-level keywords.
    pub fn field_kwargs(&self) -> &FieldSpec {
        &self.field_kwargs
    }

    /// Attached validator.
    pub fn field_validator(&self) -> Option<&FieldValidator> {
        self.validator.as_ref()
    }
}

/// Shorthand for [`ParamInfo::argument`].
pub fn argument(default: impl Into<ParamDefault>) -> ParamInfo {
    ParamInfo::argument(default)
}

/// Shorthand for [`ParamInfo::option`].
pub fn option<I, S>(default: impl Into<ParamDefault>, decls: I) -> ParamInfo
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ParamInfo::option(default, decls)
}

/// Converts a keyword map into pairs accepted by [`ParamInfo::kwargs`].
pub fn kwargs_from_map(map: &Map<String, Value>) -> Vec<(String, Value)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn no_kwargs() -> std::iter::Empty<(&'static str, Value)> {
        std::iter::empty()
    }

    #[test]
    fn test_kwargs_split_between_parser_and_schema() {
        let info = ParamInfo::option(json!(3), ["--count"])
            .kwargs([
                ("metavar", json!("N")),
                ("hidden", json!(true)),
                ("le", json!(10)),
                ("min_length", json!(1)),
            ])
            .unwrap();
        assert_eq!(info.metavar_name(), Some("N"));
        assert!(info.is_hidden());
        assert_eq!(info.field_kwargs().constraints.le, Some(10.0));
        assert_eq!(info.field_kwargs().constraints.min_length, Some(1));
    }

    #[test]
    fn test_unknown_kwarg_names_key() {
        let err = ParamInfo::argument(ParamDefault::Required)
            .kwarg("colour", json!("red"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Argument() got an unexpected keyword argument 'colour'");
    }

    #[test]
    fn test_explicit_description_is_not_overwritten_by_help() {
        let info = ParamInfo::argument(json!(1))
            .kwargs([("description", json!("schema text")), ("help", json!("cli text"))])
            .unwrap();
        assert_eq!(info.help_text(), Some("cli text"));
        assert_eq!(info.field_kwargs().description.as_deref(), Some("schema text"));

        let later = info.help("newer cli text");
        assert_eq!(later.field_kwargs().description.as_deref(), Some("schema text"));
    }

    #[test]
    fn test_call_carries_field_kwargs_and_validator() {
        let mut original = ParamInfo::argument(json!(2))
            .annotation(TypeHint::Int)
            .kwarg("ge", json!(0))
            .unwrap();
        let doubled = original.validator(|v| Ok(json!(v.as_i64().unwrap_or_default() * 2)));

        let clone = original.call(&[], [("le", json!(9))]).unwrap();
        assert_eq!(clone.ann(), Some(&TypeHint::Int));
        assert_eq!(clone.field_kwargs().constraints.ge, Some(0.0));
        assert_eq!(clone.field_kwargs().constraints.le, Some(9.0));
        assert!(clone.field_validator().unwrap().ptr_eq(&doubled));
        assert_eq!(clone.default().produce(), Some(json!(2)));
    }

    #[test]
    fn test_call_replaces_validator_only_on_clone() {
        let mut first = ParamInfo::argument(json!(2)).annotation(TypeHint::Int);
        let doubled = first.validator(|v| Ok(v));
        let mut second = first.call(&[], no_kwargs()).unwrap();
        let tripled = second.validator(|v| Ok(v));

        assert!(first.field_validator().unwrap().ptr_eq(&doubled));
        assert!(second.field_validator().unwrap().ptr_eq(&tripled));
    }

    #[test]
    fn test_call_option_rebinds_decls() {
        let info = ParamInfo::option(json!(null), ["--name"]);
        let clone = info.call(&[json!("x"), json!("--who"), json!("-w")], no_kwargs()).unwrap();
        assert_eq!(clone.decls(), ["--who", "-w"]);
        assert_eq!(clone.default().produce(), Some(json!("x")));
    }

    #[test]
    fn test_call_argument_rejects_extra_positionals() {
        let info = ParamInfo::argument(json!(1));
        let err = info.call(&[json!(1), json!(2)], no_kwargs()).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::Binding(BindingError::TooManyPositional { expected: 1, given: 2 })
        );
    }

    #[test]
    fn test_call_as_incompatible_variant() {
        let info = ParamInfo::option(json!(1), ["--x"]);
        let err = info.call_as(ParamKind::Argument, &[], no_kwargs()).unwrap_err();
        assert_eq!(err.to_string(), "cannot create 'Argument' from 'Option' instance");
    }

    #[test]
    fn test_default_factory_produces_fresh_values() {
        let info = ParamInfo::option(ParamDefault::Required, ["--name"]).default_factory(|| json!([]));
        assert_eq!(info.default().produce(), Some(json!([])));
        assert!(!info.default().is_required());
    }
}

//! Field specifications: constraints and metadata attached to schema fields.
//!
//! A [`FieldSpec`] is what a parameter descriptor contributes to the
//! synthesized schema beyond the field's type. It can be built with typed
//! builder methods or from loosely typed keyword pairs via
//! [`FieldSpec::apply`], which is how descriptor constructors route their
//! schema-level keywords.

use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::ConfigurationError;

/// Keys understood by [`FieldSpec::apply`].
pub const FIELD_KEYS: &[&str] = &[
    "description",
    "title",
    "examples",
    "gt",
    "ge",
    "lt",
    "le",
    "multiple_of",
    "min_length",
    "max_length",
    "pattern",
    "strict",
];

/// A compiled regular expression compared by its source text.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compiles `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidKeyword`] if the expression does
    /// not compile.
    pub fn new(source: &str) -> Result<Self, ConfigurationError> {
        Regex::new(source)
            .map(Self)
            .map_err(|err| ConfigurationError::InvalidKeyword {
                key: "pattern".to_string(),
                reason: err.to_string(),
            })
    }

    /// Source text of the expression.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns `true` if the expression matches somewhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

/// Value constraints checked after type coercion.
///
/// Numeric bounds apply to numbers, length bounds to strings (in characters)
/// and to lists, and `pattern` to strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Exclusive lower bound.
    pub gt: Option<f64>,
    /// Inclusive lower bound.
    pub ge: Option<f64>,
    /// Exclusive upper bound.
    pub lt: Option<f64>,
    /// Inclusive upper bound.
    pub le: Option<f64>,
    /// Value must be a multiple of this.
    pub multiple_of: Option<f64>,
    /// Minimum length.
    pub min_length: Option<usize>,
    /// Maximum length.
    pub max_length: Option<usize>,
    /// Regular expression strings must match.
    pub pattern: Option<Pattern>,
    /// Disable lax coercion (e.g. `"3"` is no longer an integer).
    pub strict: bool,
}

impl Constraints {
    /// Returns `true` if no constraint is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Sets the exclusive lower bound.
    pub fn gt(mut self, bound: f64) -> Self {
        self.gt = Some(bound);
        self
    }

    /// Sets the inclusive lower bound.
    pub fn ge(mut self, bound: f64) -> Self {
        self.ge = Some(bound);
        self
    }

    /// Sets the exclusive upper bound.
    pub fn lt(mut self, bound: f64) -> Self {
        self.lt = Some(bound);
        self
    }

    /// Sets the inclusive upper bound.
    pub fn le(mut self, bound: f64) -> Self {
        self.le = Some(bound);
        self
    }

    /// Requires a multiple of `step`.
    pub fn multiple_of(mut self, step: f64) -> Self {
        self.multiple_of = Some(step);
        self
    }

    /// Sets the minimum length.
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    /// Sets the maximum length.
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Requires strings to match `pattern`.
    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Enables strict coercion.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// Schema-side specification of one field.
///
/// # Examples
///
/// ```
/// use command_model_core::FieldSpec;
/// use serde_json::json;
///
/// let mut spec = FieldSpec::default();
/// spec.apply("ge", &json!(0)).unwrap();
/// spec.apply("description", &json!("How many times")).unwrap();
/// assert_eq!(spec.constraints.ge, Some(0.0));
/// assert_eq!(spec.description.as_deref(), Some("How many times"));
///
/// assert!(spec.apply("ge", &json!("zero")).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSpec {
    /// Human-readable description.
    pub description: Option<String>,
    /// Short title.
    pub title: Option<String>,
    /// Example values.
    pub examples: Vec<Value>,
    /// Constraints checked after coercion.
    pub constraints: Constraints,
}

impl FieldSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Replaces the constraints.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Returns `true` if `key` is a field keyword.
    pub fn is_field_key(key: &str) -> bool {
        FIELD_KEYS.contains(&key)
    }

    /// Applies one keyword pair.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnexpectedKeyword`] for keys outside
    /// [`FIELD_KEYS`] and [`ConfigurationError::InvalidKeyword`] when the
    /// value has the wrong shape.
    pub fn apply(&mut self, key: &str, value: &Value) -> Result<(), ConfigurationError> {
        let c = &mut self.constraints;
        match key {
            "description" => self.description = Some(expect_str(key, value)?),
            "title" => self.title = Some(expect_str(key, value)?),
            "examples" => {
                self.examples = value
                    .as_array()
                    .cloned()
                    .ok_or_else(|| invalid(key, "expected an array"))?;
            }
            "gt" => c.gt = Some(expect_f64(key, value)?),
            "ge" => c.ge = Some(expect_f64(key, value)?),
            "lt" => c.lt = Some(expect_f64(key, value)?),
            "le" => c.le = Some(expect_f64(key, value)?),
            "multiple_of" => c.multiple_of = Some(expect_f64(key, value)?),
            "min_length" => c.min_length = Some(expect_usize(key, value)?),
            "max_length" => c.max_length = Some(expect_usize(key, value)?),
            "pattern" => c.pattern = Some(Pattern::new(&expect_str(key, value)?)?),
            "strict" => {
                c.strict = value
                    .as_bool()
                    .ok_or_else(|| invalid(key, "expected a boolean"))?;
            }
            _ => {
                return Err(ConfigurationError::UnexpectedKeyword {
                    constructor: "Field",
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Overlays every set attribute of `other` onto `self`.
    pub fn merge(&mut self, other: &FieldSpec) {
        if other.description.is_some() {
            self.description.clone_from(&other.description);
        }
        if other.title.is_some() {
            self.title.clone_from(&other.title);
        }
        if !other.examples.is_empty() {
            self.examples.clone_from(&other.examples);
        }
        let (c, o) = (&mut self.constraints, &other.constraints);
        c.gt = o.gt.or(c.gt);
        c.ge = o.ge.or(c.ge);
        c.lt = o.lt.or(c.lt);
        c.le = o.le.or(c.le);
        c.multiple_of = o.multiple_of.or(c.multiple_of);
        c.min_length = o.min_length.or(c.min_length);
        c.max_length = o.max_length.or(c.max_length);
        if o.pattern.is_some() {
            c.pattern.clone_from(&o.pattern);
        }
        c.strict |= o.strict;
    }
}

fn invalid(key: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidKeyword {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn expect_str(key: &str, value: &Value) -> Result<String, ConfigurationError> {
    value
        .as_str()
        .map(String::from)
        .ok_or_else(|| invalid(key, "expected a string"))
}

fn expect_f64(key: &str, value: &Value) -> Result<f64, ConfigurationError> {
    value
        .as_f64()
        .ok_or_else(|| invalid(key, "expected a number"))
}

fn expect_usize(key: &str, value: &Value) -> Result<usize, ConfigurationError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(key, "expected a non-negative integer"))
}

//! Callable signatures and call-site binding.
//!
//! A [`Signature`] is the ordered parameter list of a command function. It is
//! the input to schema synthesis and to command-line construction, and
//! [`match_signature`] binds an invocation's positional and keyword values to
//! its parameter names.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::params::ParamInfo;
use crate::types::{TypeHint, is_compatible};
use crate::{BindingError, ConfigurationError};

/// Default of a signature parameter.
#[derive(Debug, Clone)]
pub enum ParameterDefault {
    /// No default.
    Empty,
    /// A plain value.
    Value(Value),
    /// A parameter descriptor.
    Param(ParamInfo),
}

/// One parameter of a [`Signature`].
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Declared type, if any.
    pub annotation: Option<TypeHint>,
    /// Default.
    pub default: ParameterDefault,
}

impl Parameter {
    /// Creates a parameter with no annotation and no default.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            annotation: None,
            default: ParameterDefault::Empty,
        }
    }

    /// Sets the declared type.
    pub fn annotated(mut self, ty: TypeHint) -> Self {
        self.annotation = Some(ty);
        self
    }

    /// Sets a plain default.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = ParameterDefault::Value(value);
        self
    }

    /// Uses a descriptor as the default.
    pub fn param(mut self, info: ParamInfo) -> Self {
        self.default = ParameterDefault::Param(info);
        self
    }

    /// The descriptor default, if any.
    pub fn info(&self) -> Option<&ParamInfo> {
        match &self.default {
            ParameterDefault::Param(info) => Some(info),
            _ => None,
        }
    }

    /// Declared type: the annotation if present, else the descriptor's.
    pub fn declared_type(&self) -> Option<&TypeHint> {
        self.annotation.as_ref().or_else(|| self.info().and_then(ParamInfo::ann))
    }

    /// Value used when the caller supplies nothing, if there is one.
    pub fn default_produce(&self) -> Option<Value> {
        match &self.default {
            ParameterDefault::Empty => None,
            ParameterDefault::Value(v) => Some(v.clone()),
            ParameterDefault::Param(info) => info.default().produce(),
        }
    }
}

/// Ordered parameter list of a named function.
///
/// # Examples
///
/// ```
/// use command_model_core::{ParamInfo, Signature, TypeHint};
/// use serde_json::json;
///
/// let sig = Signature::new("add_user")
///     .arg("name", TypeHint::Str)
///     .with_param("count", ParamInfo::option(json!(1), ["--count"]).annotation(TypeHint::Int));
///
/// assert_eq!(sig.len(), 2);
/// assert_eq!(sig.get("count").unwrap().declared_type(), Some(&TypeHint::Int));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Signature {
    name: String,
    params: Vec<Parameter>,
}

impl Signature {
    /// Creates an empty signature for the function `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter.
    pub fn push(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Appends an annotated parameter with no default.
    pub fn arg(self, name: &str, ty: TypeHint) -> Self {
        self.push(Parameter::new(name).annotated(ty))
    }

    /// Appends an annotated parameter with a plain default.
    pub fn arg_with_default(self, name: &str, ty: TypeHint, default: Value) -> Self {
        self.push(Parameter::new(name).annotated(ty).default_value(default))
    }

    /// Appends a parameter whose default is `info`, annotated with the
    /// descriptor's declared type.
    pub fn with_param(self, name: &str, info: ParamInfo) -> Self {
        let mut param = Parameter::new(name);
        param.annotation = info.ann().cloned();
        self.push(param.param(info))
    }

    /// Function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Checks the signature is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateParameter`] if two parameters
    /// share a name, and [`ConfigurationError::AnnotationMismatch`] if a
    /// parameter's annotation disagrees with the type its descriptor declares.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(ConfigurationError::DuplicateParameter(param.name.clone()));
            }
            let resolved = param.info().and_then(ParamInfo::ann);
            if let (Some(declared), Some(resolved)) = (&param.annotation, resolved) {
                if !is_compatible(declared, resolved) {
                    return Err(ConfigurationError::AnnotationMismatch {
                        param: param.name.clone(),
                        declared: declared.to_string(),
                        resolved: resolved.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Positional and keyword values of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    /// Positional values.
    pub args: Vec<Value>,
    /// Keyword values.
    pub kwargs: Map<String, Value>,
}

impl CallArgs {
    /// Creates an empty call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional value.
    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    /// Sets a keyword value.
    pub fn kwarg(mut self, name: &str, value: Value) -> Self {
        self.kwargs.insert(name.to_string(), value);
        self
    }
}

impl From<Map<String, Value>> for CallArgs {
    fn from(kwargs: Map<String, Value>) -> Self {
        Self {
            args: Vec::new(),
            kwargs,
        }
    }
}

/// Binds `args` and `kwargs` to the parameter names of `sig`.
///
/// Positional values bind to parameters in order. Keywords naming a
/// parameter override positional values; keywords naming nothing in the
/// signature are dropped. Parameters left unbound are absent from the
/// result, so schema validation reports them as missing.
///
/// # Errors
///
/// Returns [`BindingError::TooManyPositional`] if there are more positional
/// values than parameters.
///
/// # Examples
///
/// ```
/// use command_model_core::{Signature, TypeHint, match_signature};
/// use serde_json::{Map, json};
///
/// let sig = Signature::new("f").arg("a", TypeHint::Int).arg("b", TypeHint::Int);
/// let mut kwargs = Map::new();
/// kwargs.insert("b".into(), json!(2));
/// kwargs.insert("unknown".into(), json!(0));
///
/// let bound = match_signature(&sig, &[json!(1)], &kwargs).unwrap();
/// assert_eq!(serde_json::Value::Object(bound), json!({"a": 1, "b": 2}));
/// ```
pub fn match_signature(
    sig: &Signature,
    args: &[Value],
    kwargs: &Map<String, Value>,
) -> Result<Map<String, Value>, BindingError> {
    if args.len() > sig.len() {
        return Err(BindingError::TooManyPositional {
            expected: sig.len(),
            given: args.len(),
        });
    }

    let mut bound = Map::new();
    for (param, value) in sig.params().iter().zip(args) {
        bound.insert(param.name.clone(), value.clone());
    }
    for param in sig.params() {
        if let Some(value) = kwargs.get(&param.name) {
            bound.insert(param.name.clone(), value.clone());
        }
    }
    Ok(bound)
}

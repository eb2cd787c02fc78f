//! Declarations, signature binding and validation for typed commands.
//!
//! This crate is engine agnostic. It knows nothing about command-line
//! parsing; it models what a command accepts and checks values against it:
//!
//! - [`TypeHint`]: the declared type of a parameter, with parse overrides
//!   expressed as [`Marker::Parse`] and resolved by [`resolve_override`].
//! - [`ParamInfo`]: a positional `Argument` or named `Option` descriptor,
//!   used as a parameter default. Its keywords are split between parser
//!   attributes and schema-level [`FieldSpec`] constraints.
//! - [`Signature`]: the ordered parameter list of a command function, and
//!   [`match_signature`] to bind call-site values to it.
//! - [`ModelSchema`]: the validation model synthesized from a signature.
//! - [`ValidationError`]: per-field diagnostics when input is rejected.
//!
//! Declaration mistakes surface as [`ConfigurationError`] at construction or
//! registration time.
//!
//! # Example
//!
//! ```
//! use command_model_core::*;
//! use serde_json::{Map, json};
//!
//! let count = ParamInfo::argument(ParamDefault::Required)
//!     .annotation(TypeHint::Int)
//!     .kwarg("ge", json!(0))
//!     .unwrap();
//! let sig = Signature::new("repeat").with_param("count", count);
//! let schema = ModelSchema::from_signature(&sig, None);
//!
//! let bound = match_signature(&sig, &[json!("3")], &Map::new()).unwrap();
//! assert_eq!(schema.validate(bound).unwrap()["count"], json!(3));
//!
//! let bound = match_signature(&sig, &[json!(-1)], &Map::new()).unwrap();
//! assert!(schema.validate(bound).is_err());
//! ```

mod error;
mod field;
mod params;
mod schema;
mod signature;
mod types;
mod validate;

pub use error::{BindingError, ConfigurationError};
pub use field::{Constraints, FIELD_KEYS, FieldSpec, Pattern};
pub use params::{
    DefaultFactory, FieldValidator, PARSE_KEYS, ParamDefault, ParamInfo, ParamKind, argument, kwargs_from_map,
    option,
};
pub use schema::{FieldDef, ModelSchema, ModelValidator, ValidatorMode};
pub use signature::{CallArgs, Parameter, ParameterDefault, Signature, match_signature};
pub use types::{Marker, TypeHint, is_compatible, parse, resolve_override};
pub use validate::{ErrorKind, FieldError, LocItem, Mode, ValidationError, check_constraints, validate_value};

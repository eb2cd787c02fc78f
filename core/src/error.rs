//! Error types raised while declaring parameters and commands.
//!
//! These are developer-facing: they surface at construction or registration
//! time, never as a consequence of end-user input. Input failures are
//! reported through [`ValidationError`](crate::ValidationError).

use thiserror::Error;

/// Misuse of the declaration API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A constructor received a keyword it does not understand.
    #[error("{constructor}() got an unexpected keyword argument '{key}'")]
    UnexpectedKeyword {
        /// Constructor name (`Argument` or `Option`).
        constructor: &'static str,
        /// The offending key.
        key: String,
    },

    /// A recognised keyword carried a value of the wrong shape.
    #[error("invalid value for keyword argument '{key}': {reason}")]
    InvalidKeyword {
        /// The offending key.
        key: String,
        /// What was expected.
        reason: String,
    },

    /// A command validator was attached to a command without a schema.
    #[error("cannot set validator on command '{0}' with 'validate=false'")]
    ValidatorOnUnvalidated(String),

    /// A descriptor was re-created as the other parameter variant.
    #[error("cannot create '{target}' from '{from}' instance")]
    IncompatibleVariant {
        /// Requested variant.
        target: &'static str,
        /// Variant of the existing descriptor.
        from: &'static str,
    },

    /// A parameter's annotation disagrees with its descriptor default.
    #[error("parameter '{param}' is annotated as {declared} but its default declares {resolved}")]
    AnnotationMismatch {
        /// Parameter name.
        param: String,
        /// Annotation on the parameter.
        declared: String,
        /// Annotation carried by the descriptor default.
        resolved: String,
    },

    /// Two parameters in one signature share a name.
    #[error("duplicate parameter '{0}' in signature")]
    DuplicateParameter(String),

    /// Two commands were registered under the same name.
    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),

    /// A parameter's command-line name is already taken, by another parameter
    /// or by a flag the application defines itself.
    #[error("parameter '{param}' cannot use '{option}': the name is already in use")]
    OptionConflict {
        /// Parameter name.
        param: String,
        /// The clashing name, e.g. `-h` or `--pdb`.
        option: String,
    },

    /// A class method command was used before being attached to an owner.
    #[error("class method command '{0}' has not been attached to an owner")]
    UnattachedClassMethod(String),

    /// A command was attached to a second owner.
    #[error("command '{command}' is already attached to '{owner}'")]
    AlreadyAttached {
        /// Command function name.
        command: String,
        /// Owner it is attached to.
        owner: String,
    },

    /// Positional values could not be bound to a constructor signature.
    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Failure to bind call-site values to a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// More positional values than the signature has parameters.
    #[error("too many positional arguments: expected at most {expected}, got {given}")]
    TooManyPositional {
        /// Number of parameters in the signature.
        expected: usize,
        /// Number of positional values supplied.
        given: usize,
    },
}

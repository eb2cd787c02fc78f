//! Per-invocation context and keyword arguments handed to command bodies.

use std::fmt;
use std::io::Write;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{CommandError, Result};

/// Key in [`Context::obj`] that enables post-mortem reporting.
pub const DEBUG_KEY: &str = "pdb";

/// State of one invocation: the shared `obj` namespace and output streams.
pub struct Context {
    obj: Map<String, Value>,
    command: Option<String>,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl Context {
    /// Creates a context writing to `out` and `err`.
    pub fn new(obj: Map<String, Value>, out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            obj,
            command: None,
            out,
            err,
        }
    }

    /// A context on the process's stdout and stderr.
    pub fn stdio(obj: Map<String, Value>) -> Self {
        Self::new(obj, Box::new(std::io::stdout()), Box::new(std::io::stderr()))
    }

    /// Namespace shared by the root callback and the command.
    pub fn obj(&self) -> &Map<String, Value> {
        &self.obj
    }

    /// Mutable access to the shared namespace.
    pub fn obj_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.obj
    }

    /// Returns `true` if failing commands should be reported post-mortem.
    pub fn debug_enabled(&self) -> bool {
        self.obj.get(DEBUG_KEY).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Turns post-mortem reporting on for this invocation.
    pub fn enable_debug(&mut self) {
        self.obj.insert(DEBUG_KEY.to_string(), Value::Bool(true));
    }

    /// Name of the command being run, once dispatch has chosen one.
    pub fn command_name(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub(crate) fn set_command(&mut self, name: &str) {
        self.command = Some(name.to_string());
    }

    /// Standard output.
    pub fn out(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    /// Standard error.
    pub fn err(&mut self) -> &mut dyn Write {
        &mut self.err
    }

    /// Writes `line` and a newline to standard output.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Io`] if the write fails.
    pub fn echo(&mut self, line: impl fmt::Display) -> Result<()> {
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("obj", &self.obj)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// Keyword arguments passed to a command body.
///
/// # Examples
///
/// ```
/// use command_model::Kwargs;
/// use serde_json::json;
///
/// let kwargs = Kwargs::from_value(json!({"count": 2, "names": ["x", "y"], "tag": null}));
/// let count: i64 = kwargs.get("count").unwrap();
/// let names: Vec<String> = kwargs.get("names").unwrap();
/// assert_eq!((count, names.len()), (2, 2));
/// assert_eq!(kwargs.get_opt::<String>("tag").unwrap(), None);
/// assert!(kwargs.get::<i64>("missing").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs(Map<String, Value>);

impl Kwargs {
    /// Wraps a keyword map.
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wraps a JSON object; any other value gives empty kwargs.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Reads `name` as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingArgument`] if `name` is absent and
    /// [`CommandError::Argument`] if the value does not deserialize as `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| CommandError::MissingArgument(name.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|source| CommandError::Argument {
            name: name.to_string(),
            source,
        })
    }

    /// Reads `name` as `T`, treating absent and `null` as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Argument`] if the value does not deserialize
    /// as `T`.
    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name).map(Some),
        }
    }

    /// Raw value of `name`.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the kwargs, returning the map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Kwargs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

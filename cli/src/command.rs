//! Command descriptors: one per registered command body.
//!
//! A [`CommandDescriptor`] owns a command's callable and signature, and
//! decides how each call is wrapped (validation, post-mortem reporting). Plain
//! functions register with the facade as soon as they are declared. Class
//! methods need an [`Owner`] first, and register when [`CommandDescriptor::attach`]
//! supplies it.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use command_model_core::{
    CallArgs, ConfigurationError, ModelSchema, ModelValidator, Signature, ValidatorMode, match_signature,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::{Context, Kwargs};
use crate::decorators::{Callable, LogPostMortem, PostMortem, debuggable, validated_with};
use crate::error::Result;

/// Body of a plain function, static method or bound instance method.
pub type Handler = Arc<dyn Fn(&mut Context, Kwargs) -> Result<()> + Send + Sync>;

/// Body of a class method; receives the owner it was resolved through.
pub type ClassHandler = Arc<dyn Fn(&Owner, &mut Context, Kwargs) -> Result<()> + Send + Sync>;

/// Callback a descriptor uses to register its bound command.
pub type Registrar = Arc<dyn Fn(BoundCommand) -> std::result::Result<(), ConfigurationError> + Send + Sync>;

/// The callable behind a command.
#[derive(Clone)]
pub enum CommandFn {
    /// Needs no owner.
    Function(Handler),
    /// Needs an owner before it can run.
    ClassMethod(ClassHandler),
}

impl CommandFn {
    /// Wraps a function body.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&mut Context, Kwargs) -> Result<()> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    /// Wraps a class method body.
    pub fn class_method<F>(f: F) -> Self
    where
        F: Fn(&Owner, &mut Context, Kwargs) -> Result<()> + Send + Sync + 'static,
    {
        Self::ClassMethod(Arc::new(f))
    }

    /// Returns `true` for class methods.
    pub fn is_class_method(&self) -> bool {
        matches!(self, Self::ClassMethod(_))
    }
}

impl fmt::Debug for CommandFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function(..)"),
            Self::ClassMethod(_) => f.write_str("ClassMethod(..)"),
        }
    }
}

/// The type a class method command is resolved through, and the attribute
/// holding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Owner {
    type_name: String,
    attr: String,
}

impl Owner {
    /// Creates an owner from explicit names.
    pub fn new(type_name: &str, attr: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            attr: attr.to_string(),
        }
    }

    /// Creates an owner named after `T`.
    ///
    /// ```
    /// use command_model::Owner;
    ///
    /// struct Derived;
    /// assert_eq!(Owner::of::<Derived>("command").to_string(), "Derived.command");
    /// ```
    pub fn of<T: ?Sized>(attr: &str) -> Self {
        let full = type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        Self::new(short, attr)
    }

    /// Owner type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Attribute name.
    pub fn attr(&self) -> &str {
        &self.attr
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.attr)
    }
}

/// Per-command switches.
#[derive(Clone)]
pub struct CommandSettings {
    /// Validate arguments against the synthesized schema.
    pub validate: bool,
    /// Report failures post-mortem when the invocation enables debugging.
    pub allow_pdb: bool,
    /// Hook run by post-mortem reporting.
    pub post_mortem: Arc<dyn PostMortem>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            validate: true,
            allow_pdb: true,
            post_mortem: Arc::new(LogPostMortem),
        }
    }
}

impl fmt::Debug for CommandSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSettings")
            .field("validate", &self.validate)
            .field("allow_pdb", &self.allow_pdb)
            .finish_non_exhaustive()
    }
}

/// A declared command.
pub struct CommandDescriptor {
    func: CommandFn,
    signature: Arc<Signature>,
    registrar: Option<Registrar>,
    settings: CommandSettings,
    validator: Mutex<Option<ModelValidator>>,
    schema: Mutex<Option<Arc<ModelSchema>>>,
    owner: OnceLock<Owner>,
}

impl CommandDescriptor {
    /// Declares a command.
    ///
    /// Function commands are registered through `registrar` immediately;
    /// class methods wait for [`CommandDescriptor::attach`].
    ///
    /// # Errors
    ///
    /// Fails if the signature is malformed or the registrar rejects the
    /// command.
    pub fn new(
        func: CommandFn,
        signature: Signature,
        settings: CommandSettings,
        registrar: Option<Registrar>,
    ) -> std::result::Result<Arc<Self>, ConfigurationError> {
        signature.validate()?;
        let descriptor = Arc::new(Self {
            func,
            signature: Arc::new(signature),
            registrar,
            settings,
            validator: Mutex::new(None),
            schema: Mutex::new(None),
            owner: OnceLock::new(),
        });
        if !descriptor.func.is_class_method() {
            descriptor.register(None)?;
        }
        Ok(descriptor)
    }

    fn register(self: &Arc<Self>, owner: Option<Owner>) -> std::result::Result<(), ConfigurationError> {
        let Some(registrar) = &self.registrar else {
            return Ok(());
        };
        debug!(command = self.name(), owner = ?owner, "registering command");
        registrar(BoundCommand {
            descriptor: Arc::clone(self),
            owner,
        })
    }

    /// Function name from the signature.
    pub fn name(&self) -> &str {
        self.signature.name()
    }

    /// The command's signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether arguments are validated.
    pub fn validates(&self) -> bool {
        self.settings.validate
    }

    /// Whether post-mortem reporting is allowed.
    pub fn allows_pdb(&self) -> bool {
        self.settings.allow_pdb
    }

    /// Owner recorded by [`CommandDescriptor::attach`].
    pub fn owner(&self) -> Option<&Owner> {
        self.owner.get()
    }

    /// Records the owner. Class methods are registered at this point.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::AlreadyAttached`] if an owner was already
    /// recorded, or the registrar's error.
    pub fn attach(self: &Arc<Self>, owner: Owner) -> std::result::Result<(), ConfigurationError> {
        if let Err(owner) = self.owner.set(owner) {
            let existing = self.owner.get().unwrap_or(&owner);
            return Err(ConfigurationError::AlreadyAttached {
                command: self.name().to_string(),
                owner: existing.to_string(),
            });
        }
        if self.func.is_class_method() {
            self.register(self.owner.get().cloned())?;
        }
        Ok(())
    }

    /// Resolves the command for calling, through `owner` if given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnattachedClassMethod`] for a class method
    /// with neither `owner` nor an attached owner.
    pub fn get(self: &Arc<Self>, owner: Option<&Owner>) -> std::result::Result<BoundCommand, ConfigurationError> {
        let owner = owner.or_else(|| self.owner.get()).cloned();
        if self.func.is_class_method() && owner.is_none() {
            return Err(ConfigurationError::UnattachedClassMethod(self.name().to_string()));
        }
        Ok(BoundCommand {
            descriptor: Arc::clone(self),
            owner,
        })
    }

    /// Attaches the command-level validator, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ValidatorOnUnvalidated`] if the command
    /// does not validate its arguments.
    pub fn validator<F>(&self, mode: ValidatorMode, f: F) -> std::result::Result<(), ConfigurationError>
    where
        F: Fn(Map<String, Value>) -> std::result::Result<Map<String, Value>, String> + Send + Sync + 'static,
    {
        if !self.settings.validate {
            return Err(ConfigurationError::ValidatorOnUnvalidated(self.name().to_string()));
        }
        *lock(&self.validator) = Some(ModelValidator::new(mode, f));
        *lock(&self.schema) = None;
        Ok(())
    }

    /// The validation schema, built on first use.
    pub fn schema(&self) -> Arc<ModelSchema> {
        let mut cached = lock(&self.schema);
        let schema = cached.get_or_insert_with(|| {
            let validator = lock(&self.validator).clone();
            Arc::new(ModelSchema::from_signature(&self.signature, validator))
        });
        Arc::clone(schema)
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name())
            .field("func", &self.func)
            .field("settings", &self.settings)
            .field("owner", &self.owner.get())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A command resolved for calling.
#[derive(Clone)]
pub struct BoundCommand {
    descriptor: Arc<CommandDescriptor>,
    owner: Option<Owner>,
}

impl BoundCommand {
    /// Function name.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// The descriptor this was resolved from.
    pub fn descriptor(&self) -> &Arc<CommandDescriptor> {
        &self.descriptor
    }

    /// Owner the command is bound to, if any.
    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    /// Runs the command with the descriptor's wrappers applied.
    ///
    /// # Errors
    ///
    /// Returns validation, binding and body failures unchanged.
    pub fn call(&self, ctx: &mut Context, call: CallArgs) -> Result<()> {
        let callable = self.wrapped()?;
        callable(ctx, call)
    }

    fn wrapped(&self) -> std::result::Result<Callable, ConfigurationError> {
        let desc = &self.descriptor;
        let sig = Arc::clone(&desc.signature);
        let mut callable: Callable = match (&desc.func, &self.owner) {
            (CommandFn::Function(handler), _) => {
                let handler = Arc::clone(handler);
                Arc::new(move |ctx: &mut Context, call: CallArgs| -> Result<()> {
                    let bound = match_signature(&sig, &call.args, &call.kwargs)?;
                    handler(ctx, Kwargs::new(bound))
                })
            }
            (CommandFn::ClassMethod(handler), Some(owner)) => {
                let handler = Arc::clone(handler);
                let owner = owner.clone();
                Arc::new(move |ctx: &mut Context, call: CallArgs| -> Result<()> {
                    let bound = match_signature(&sig, &call.args, &call.kwargs)?;
                    handler(&owner, ctx, Kwargs::new(bound))
                })
            }
            (CommandFn::ClassMethod(_), None) => {
                return Err(ConfigurationError::UnattachedClassMethod(desc.name().to_string()));
            }
        };
        if desc.settings.validate {
            callable = validated_with(desc.schema(), Arc::clone(&desc.signature), callable);
        }
        if desc.settings.allow_pdb {
            callable = debuggable(callable, Arc::clone(&desc.settings.post_mortem));
        }
        Ok(callable)
    }
}

impl fmt::Debug for BoundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCommand")
            .field("name", &self.name())
            .field("owner", &self.owner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use command_model_core::{ParamInfo, TypeHint};
    use serde_json::json;

    use super::*;
    use crate::error::CommandError;
    use crate::testing::SharedBuffer;

    fn context(out: &SharedBuffer) -> Context {
        Context::new(Map::new(), Box::new(out.clone()), Box::new(std::io::sink()))
    }

    fn recorder() -> (Registrar, Arc<Mutex<Vec<String>>>) {
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);
        let registrar: Registrar = Arc::new(move |cmd: BoundCommand| -> std::result::Result<(), ConfigurationError> {
            let label = match cmd.owner() {
                Some(owner) => format!("{}@{owner}", cmd.name()),
                None => cmd.name().to_string(),
            };
            sink.lock().unwrap().push(label);
            Ok(())
        });
        (registrar, names)
    }

    fn xy_signature(name: &str) -> Signature {
        Signature::new(name)
            .with_param("x", ParamInfo::argument(json!(1)).annotation(TypeHint::Int))
            .with_param("y", ParamInfo::argument(json!(2)).annotation(TypeHint::Int))
    }

    fn print_xy() -> CommandFn {
        CommandFn::function(|ctx: &mut Context, kw: Kwargs| -> Result<()> {
            let x: i64 = kw.get("x")?;
            let y: i64 = kw.get("y")?;
            ctx.echo(format!("{x} {y}"))
        })
    }

    #[test]
    fn test_function_registers_on_declaration() {
        let (registrar, names) = recorder();
        CommandDescriptor::new(print_xy(), xy_signature("command"), CommandSettings::default(), Some(registrar))
            .unwrap();
        assert_eq!(*names.lock().unwrap(), ["command"]);
    }

    #[test]
    fn test_class_method_registers_on_attach() {
        let (registrar, names) = recorder();
        let method = CommandFn::class_method(|owner: &Owner, ctx: &mut Context, _: Kwargs| -> Result<()> {
            ctx.echo(owner.type_name())
        });
        let desc =
            CommandDescriptor::new(method, Signature::new("command"), CommandSettings::default(), Some(registrar))
                .unwrap();
        assert!(names.lock().unwrap().is_empty());
        assert!(matches!(
            desc.get(None),
            Err(ConfigurationError::UnattachedClassMethod(_))
        ));

        desc.attach(Owner::new("ClassMethod", "command")).unwrap();
        assert_eq!(*names.lock().unwrap(), ["command@ClassMethod.command"]);

        let err = desc.attach(Owner::new("Other", "command")).unwrap_err();
        assert!(matches!(err, ConfigurationError::AlreadyAttached { ref owner, .. } if owner == "ClassMethod.command"));
    }

    #[test]
    fn test_get_with_explicit_owner_overrides_attached() {
        let method = CommandFn::class_method(|owner: &Owner, ctx: &mut Context, _: Kwargs| -> Result<()> {
            ctx.echo(owner.type_name())
        });
        let desc = CommandDescriptor::new(method, Signature::new("command"), CommandSettings::default(), None).unwrap();
        desc.attach(Owner::new("Base", "command")).unwrap();

        let out = SharedBuffer::default();
        let mut ctx = context(&out);
        desc.get(None).unwrap().call(&mut ctx, CallArgs::new()).unwrap();
        desc.get(Some(&Owner::new("Derived", "command")))
            .unwrap()
            .call(&mut ctx, CallArgs::new())
            .unwrap();
        assert_eq!(out.contents(), "Base\nDerived\n");
    }

    #[test]
    fn test_schema_built_once_and_invalidated_by_validator() {
        let desc = CommandDescriptor::new(print_xy(), xy_signature("command"), CommandSettings::default(), None).unwrap();
        let first = desc.schema();
        assert!(Arc::ptr_eq(&first, &desc.schema()));
        assert_eq!(first.name(), "CommandModel");

        desc.validator(ValidatorMode::After, |m| Ok(m)).unwrap();
        let rebuilt = desc.schema();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert!(rebuilt.validator().is_some());
    }

    #[test]
    fn test_after_validator_applies_per_call() {
        let desc = CommandDescriptor::new(print_xy(), xy_signature("command"), CommandSettings::default(), None).unwrap();
        desc.validator(ValidatorMode::After, |mut m| {
            let x = m.get("x").and_then(Value::as_i64).unwrap_or_default();
            let y = m.get("y").and_then(Value::as_i64).unwrap_or_default();
            m.insert("x".to_string(), json!(x * y));
            Ok(m)
        })
        .unwrap();

        let out = SharedBuffer::default();
        let mut ctx = context(&out);
        let bound = desc.get(None).unwrap();
        let call = CallArgs::new().kwarg("x", json!(1)).kwarg("y", json!(2));
        bound.call(&mut ctx, call.clone()).unwrap();
        bound.call(&mut ctx, call).unwrap();
        assert_eq!(out.contents(), "2 2\n2 2\n");
    }

    #[test]
    fn test_validator_rejected_without_validation() {
        let settings = CommandSettings {
            validate: false,
            ..CommandSettings::default()
        };
        let desc = CommandDescriptor::new(print_xy(), xy_signature("command"), settings, None).unwrap();
        let err = desc.validator(ValidatorMode::Before, |m| Ok(m)).unwrap_err();
        assert_eq!(err, ConfigurationError::ValidatorOnUnvalidated("command".to_string()));
    }

    #[test]
    fn test_unvalidated_command_passes_raw_values() {
        let settings = CommandSettings {
            validate: false,
            ..CommandSettings::default()
        };
        let desc = CommandDescriptor::new(print_xy(), xy_signature("command"), settings, None).unwrap();
        let out = SharedBuffer::default();
        let mut ctx = context(&out);
        let err = desc
            .get(None)
            .unwrap()
            .call(&mut ctx, CallArgs::new().arg(json!("1")).arg(json!(2)))
            .unwrap_err();
        assert!(matches!(err, CommandError::Argument { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_duplicate_parameter_rejected_at_declaration() {
        let sig = xy_signature("command").arg("x", TypeHint::Int);
        let err = CommandDescriptor::new(print_xy(), sig, CommandSettings::default(), None).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateParameter("x".to_string()));
    }
}

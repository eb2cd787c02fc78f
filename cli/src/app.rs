//! The command-line facade: command registry, root callback and dispatch.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use clap::{Arg, ArgAction, ArgMatches, Command};
use command_model_core::{CallArgs, ConfigurationError, Signature};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::command::{BoundCommand, CommandDescriptor, CommandFn, CommandSettings, Owner, Registrar};
use crate::config::CliConfig;
use crate::context::{Context, Kwargs};
use crate::decorators::{LogPostMortem, PostMortem};
use crate::dispatch;
use crate::error::{CommandError, Result};

/// Argument id of the global debugging flag.
pub const DEBUG_FLAG: &str = "pdb";

const HELP_FLAG: &str = "help";
const VERSION_FLAG: &str = "version";

/// Root callback, run before any command.
pub type Callback = Arc<dyn Fn(&mut Context) -> Result<()> + Send + Sync>;

type Registry = Arc<Mutex<Vec<RegisteredCommand>>>;

/// A command as the facade exposes it.
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    name: String,
    help: Option<String>,
    hidden: bool,
    aliases: Vec<String>,
    command: BoundCommand,
}

impl RegisteredCommand {
    /// Name on the command line.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Hidden from help output.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Alternative names.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The callable command.
    pub fn command(&self) -> &BoundCommand {
        &self.command
    }

    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// Outcome of [`Cli::invoke`].
#[derive(Debug)]
pub struct Invocation {
    /// Process exit status.
    pub exit_code: i32,
    /// The failure, if the invocation failed.
    pub error: Option<CommandError>,
}

/// A command-line application assembled from validated commands.
///
/// # Examples
///
/// ```
/// use command_model::{Cli, Context, Kwargs, Result};
/// use command_model_core::{ParamDefault, ParamInfo, Signature, TypeHint};
/// use serde_json::json;
///
/// let cli = Cli::new("greeter");
/// let count = ParamInfo::argument(ParamDefault::Required)
///     .annotation(TypeHint::Int)
///     .kwarg("ge", json!(1))
///     .unwrap();
/// cli.command(None)
///     .function(
///         Signature::new("greet").arg("name", TypeHint::Str).with_param("count", count),
///         |ctx: &mut Context, kw: Kwargs| -> Result<()> {
///             let name: String = kw.get("name")?;
///             for _ in 0..kw.get::<i64>("count")? {
///                 ctx.echo(format!("Hello {name}"))?;
///             }
///             Ok(())
///         },
///     )
///     .unwrap();
///
/// let ok = cli.invoke(["ann", "2"], Box::new(std::io::sink()), Box::new(std::io::sink()));
/// assert_eq!(ok.exit_code, 0);
/// let rejected = cli.invoke(["ann", "0"], Box::new(std::io::sink()), Box::new(std::io::sink()));
/// assert_eq!(rejected.exit_code, 1);
/// ```
pub struct Cli {
    name: String,
    about: Option<String>,
    version: Option<String>,
    validate: bool,
    allow_pdb: bool,
    debug_flag: bool,
    obj: Map<String, Value>,
    callback: Option<Callback>,
    post_mortem: Arc<dyn PostMortem>,
    registry: Registry,
}

impl Cli {
    /// Creates an application with validation and post-mortem reporting on.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            about: None,
            version: None,
            validate: true,
            allow_pdb: true,
            debug_flag: false,
            obj: Map::new(),
            callback: None,
            post_mortem: Arc::new(LogPostMortem),
            registry: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates an application from a loaded configuration.
    pub fn from_config(config: CliConfig) -> Self {
        let mut cli = Self::new(&config.name)
            .validate(config.validate)
            .allow_pdb(config.allow_pdb)
            .debug_flag(config.debug_flag);
        cli.about = config.about;
        cli.version = config.version;
        cli.obj = config.obj;
        cli
    }

    /// Sets the description shown in help output.
    pub fn about(mut self, about: &str) -> Self {
        self.about = Some(about.to_string());
        self
    }

    /// Enables `--version`.
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Default for commands that do not set `validate`.
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Default for commands that do not set `allow_pdb`.
    pub fn allow_pdb(mut self, allow: bool) -> Self {
        self.allow_pdb = allow;
        self
    }

    /// Installs the global `--pdb` flag.
    pub fn debug_flag(mut self, enabled: bool) -> Self {
        self.debug_flag = enabled;
        self
    }

    /// Seeds the context namespace of every invocation.
    pub fn obj(mut self, key: &str, value: Value) -> Self {
        self.obj.insert(key.to_string(), value);
        self
    }

    /// Sets the root callback.
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    /// Replaces the post-mortem hook for commands declared afterwards.
    pub fn post_mortem(mut self, hook: impl PostMortem + 'static) -> Self {
        self.post_mortem = Arc::new(hook);
        self
    }

    /// Application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts declaring a command called `name`, or after its function when
    /// `None`.
    pub fn command(&self, name: Option<&str>) -> CommandBuilder<'_> {
        CommandBuilder {
            cli: self,
            name: name.map(String::from),
            validate: None,
            allow_pdb: None,
            help: None,
            hidden: false,
            aliases: Vec::new(),
        }
    }

    /// Commands in registration order.
    pub fn registered_commands(&self) -> Vec<RegisteredCommand> {
        lock(&self.registry).clone()
    }

    fn single(&self, commands: &[RegisteredCommand]) -> Option<RegisteredCommand> {
        match commands {
            [only] if self.callback.is_none() => Some(only.clone()),
            _ => None,
        }
    }

    /// Builds the clap command tree.
    ///
    /// A lone command without a root callback is mounted on the root itself.
    /// `--help` and `--version` have no short form, so commands may use `-h`
    /// and `-V` for their own options.
    pub fn build_command(&self) -> Command {
        let commands = self.registered_commands();
        let mut root = long_help(Command::new(self.name.clone()));
        if let Some(about) = &self.about {
            root = root.about(about.clone());
        }
        if let Some(version) = &self.version {
            root = root.version(version.clone()).disable_version_flag(true).arg(
                Arg::new(VERSION_FLAG)
                    .long("version")
                    .action(ArgAction::Version)
                    .help("Print version"),
            );
        }
        if self.debug_flag {
            root = root.arg(
                Arg::new(DEBUG_FLAG)
                    .long("pdb")
                    .action(ArgAction::SetTrue)
                    .global(true)
                    .help("Report command failures post-mortem"),
            );
        }

        if let Some(only) = self.single(&commands) {
            return dispatch::mount(root, only.command().descriptor().signature());
        }
        if !commands.is_empty() {
            root = root.subcommand_required(true);
        }
        for entry in commands {
            let mut sub = long_help(Command::new(entry.name.clone()))
                .hide(entry.hidden)
                .visible_aliases(entry.aliases.clone());
            if let Some(help) = &entry.help {
                sub = sub.about(help.clone());
            }
            root = root.subcommand(dispatch::mount(sub, entry.command.descriptor().signature()));
        }
        root
    }

    /// Parses `args` (without the program name) and runs the selected
    /// command, writing to `out` and `err`.
    ///
    /// Usage errors exit with clap's status (2), help and version with 0,
    /// and validation or command failures with 1 unless the command returned
    /// [`CommandError::Exit`].
    pub fn invoke<I, T>(&self, args: I, mut out: Box<dyn Write + Send>, mut err: Box<dyn Write + Send>) -> Invocation
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv = std::iter::once(OsString::from(&self.name)).chain(args.into_iter().map(Into::into));
        let matches = match self.build_command().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(clap_err) => {
                let stream = if clap_err.use_stderr() { &mut err } else { &mut out };
                if let Err(io_err) = write!(stream, "{}", clap_err.render()) {
                    warn!(error = %io_err, "failed to write usage message");
                }
                if let Err(io_err) = stream.flush() {
                    warn!(error = %io_err, "failed to flush usage message");
                }
                let exit_code = clap_err.exit_code();
                let error = (exit_code != 0).then(|| CommandError::Usage(clap_err));
                return Invocation { exit_code, error };
            }
        };

        let mut ctx = Context::new(self.obj.clone(), out, err);
        let result = self.dispatch(&mut ctx, &matches);
        let mut invocation = match result {
            Ok(()) => Invocation {
                exit_code: 0,
                error: None,
            },
            Err(error) => {
                if !matches!(error, CommandError::Exit(_)) {
                    if let Err(io_err) = writeln!(ctx.err(), "Error: {error}") {
                        warn!(error = %io_err, "failed to write error message");
                    }
                }
                Invocation {
                    exit_code: error.exit_code(),
                    error: Some(error),
                }
            }
        };
        if let Err(io_err) = ctx.flush() {
            warn!(error = %io_err, "failed to flush command output");
            if invocation.error.is_none() {
                invocation = Invocation {
                    exit_code: 1,
                    error: Some(CommandError::Io(io_err)),
                };
            }
        }
        invocation
    }

    /// Long names the application defines on every command.
    fn reserved_names(&self) -> Vec<&'static str> {
        let mut names = vec![HELP_FLAG];
        if self.debug_flag {
            names.push(DEBUG_FLAG);
        }
        if self.version.is_some() {
            names.push(VERSION_FLAG);
        }
        names
    }

    fn dispatch(&self, ctx: &mut Context, matches: &ArgMatches) -> Result<()> {
        let commands = self.registered_commands();
        let single = self.single(&commands);
        let selected = match &single {
            Some(only) => Some((only, matches)),
            None => match matches.subcommand() {
                Some((name, sub)) => {
                    let entry = commands
                        .iter()
                        .find(|c| c.answers_to(name))
                        .ok_or_else(|| CommandError::msg(format!("unknown command '{name}'")))?;
                    Some((entry, sub))
                }
                None => None,
            },
        };

        if self.debug_flag {
            let requested = matches.get_flag(DEBUG_FLAG) || selected.is_some_and(|(_, sub)| sub.get_flag(DEBUG_FLAG));
            if requested {
                ctx.enable_debug();
            }
        }
        if let Some(callback) = &self.callback {
            callback(ctx)?;
        }
        let Some((entry, sub)) = selected else {
            return Ok(());
        };

        ctx.set_command(&entry.name);
        let kwargs = dispatch::collect_kwargs(entry.command.descriptor().signature(), sub);
        debug!(command = %entry.name, args = kwargs.len(), "dispatching");
        entry.command.call(ctx, CallArgs::from(kwargs))
    }

    /// Runs against the process arguments and stdio, returning the exit
    /// status.
    pub fn run(&self) -> i32 {
        let args: Vec<OsString> = std::env::args_os().skip(1).collect();
        self.invoke(args, Box::new(io::stdout()), Box::new(io::stderr())).exit_code
    }

    /// Runs against the process arguments and exits.
    pub fn main(&self) -> ! {
        std::process::exit(self.run())
    }
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("name", &self.name)
            .field("validate", &self.validate)
            .field("allow_pdb", &self.allow_pdb)
            .field("debug_flag", &self.debug_flag)
            .field("commands", &lock(&self.registry).len())
            .finish_non_exhaustive()
    }
}

/// Declares one command on a [`Cli`].
#[must_use]
pub struct CommandBuilder<'a> {
    cli: &'a Cli,
    name: Option<String>,
    validate: Option<bool>,
    allow_pdb: Option<bool>,
    help: Option<String>,
    hidden: bool,
    aliases: Vec<String>,
}

impl CommandBuilder<'_> {
    /// Overrides the application's `validate` default.
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Overrides the application's `allow_pdb` default.
    pub fn allow_pdb(mut self, allow: bool) -> Self {
        self.allow_pdb = Some(allow);
        self
    }

    /// Sets the help text.
    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Hides the command from help output.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Adds an alternative name.
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Declares a function or static method command.
    ///
    /// # Errors
    ///
    /// Fails if the signature is malformed, a parameter's command-line name
    /// clashes, or the command name is taken.
    pub fn function<F>(self, sig: Signature, f: F) -> std::result::Result<Arc<CommandDescriptor>, ConfigurationError>
    where
        F: Fn(&mut Context, Kwargs) -> Result<()> + Send + Sync + 'static,
    {
        self.declare(CommandFn::function(f), sig)
    }

    /// Declares a class method command. It registers once attached.
    ///
    /// # Errors
    ///
    /// Fails if the signature is malformed.
    pub fn class_method<F>(self, sig: Signature, f: F) -> std::result::Result<Arc<CommandDescriptor>, ConfigurationError>
    where
        F: Fn(&Owner, &mut Context, Kwargs) -> Result<()> + Send + Sync + 'static,
    {
        self.declare(CommandFn::class_method(f), sig)
    }

    /// Declares a method bound to `instance`.
    ///
    /// # Errors
    ///
    /// Fails if the signature is malformed or the name is taken.
    pub fn bound<T, F>(
        self,
        sig: Signature,
        instance: Arc<T>,
        f: F,
    ) -> std::result::Result<Arc<CommandDescriptor>, ConfigurationError>
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &mut Context, Kwargs) -> Result<()> + Send + Sync + 'static,
    {
        self.declare(CommandFn::function(move |ctx, kwargs| f(&*instance, ctx, kwargs)), sig)
    }

    fn declare(self, func: CommandFn, sig: Signature) -> std::result::Result<Arc<CommandDescriptor>, ConfigurationError> {
        dispatch::check_spellings(&sig, &self.cli.reserved_names())?;
        let settings = CommandSettings {
            validate: self.validate.unwrap_or(self.cli.validate),
            allow_pdb: self.allow_pdb.unwrap_or(self.cli.allow_pdb),
            post_mortem: Arc::clone(&self.cli.post_mortem),
        };
        let registrar = registrar(Arc::downgrade(&self.cli.registry), self.name, self.help, self.hidden, self.aliases);
        CommandDescriptor::new(func, sig, settings, Some(registrar))
    }
}

/// Replaces clap's `-h, --help` with a long-only `--help`.
fn long_help(cmd: Command) -> Command {
    cmd.disable_help_flag(true)
        .arg(Arg::new(HELP_FLAG).long("help").action(ArgAction::Help).help("Print help"))
}

fn registrar(
    registry: Weak<Mutex<Vec<RegisteredCommand>>>,
    name: Option<String>,
    help: Option<String>,
    hidden: bool,
    aliases: Vec<String>,
) -> Registrar {
    Arc::new(move |command: BoundCommand| -> std::result::Result<(), ConfigurationError> {
        let name = name.clone().unwrap_or_else(|| command.name().replace('_', "-"));
        let Some(registry) = registry.upgrade() else {
            warn!(command = %name, "application dropped before registration");
            return Ok(());
        };
        let mut commands = lock(&registry);
        if let Some(taken) = std::iter::once(&name)
            .chain(&aliases)
            .find(|n| commands.iter().any(|c| c.answers_to(n)))
        {
            return Err(ConfigurationError::DuplicateCommand(taken.clone()));
        }
        info!(command = %name, owner = ?command.owner().map(ToString::to_string), "registered command");
        commands.push(RegisteredCommand {
            name,
            help: help.clone(),
            hidden,
            aliases: aliases.clone(),
            command,
        });
        Ok(())
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use command_model_core::{ParamInfo, TypeHint};
    use serde_json::json;

    use super::*;

    fn noop() -> impl Fn(&mut Context, Kwargs) -> Result<()> + Send + Sync + 'static {
        |_: &mut Context, _: Kwargs| -> Result<()> { Ok(()) }
    }

    #[test]
    fn test_default_name_uses_dashes() {
        let cli = Cli::new("app");
        cli.command(None).function(Signature::new("add_user"), noop()).unwrap();
        let names: Vec<String> = cli.registered_commands().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["add-user"]);
    }

    #[test]
    fn test_duplicate_command_rejected() {
        let cli = Cli::new("app");
        cli.command(Some("run")).function(Signature::new("a"), noop()).unwrap();
        let err = cli.command(Some("run")).function(Signature::new("b"), noop()).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateCommand("run".to_string()));

        let err = cli
            .command(Some("go"))
            .alias("run")
            .function(Signature::new("c"), noop())
            .unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateCommand("run".to_string()));
    }

    #[test]
    fn test_per_command_overrides_app_defaults() {
        let cli = Cli::new("app").validate(false);
        let plain = cli.command(Some("plain")).function(Signature::new("a"), noop()).unwrap();
        let checked = cli
            .command(Some("checked"))
            .validate(true)
            .allow_pdb(false)
            .function(Signature::new("b"), noop())
            .unwrap();
        assert!(!plain.validates());
        assert!(checked.validates());
        assert!(!checked.allows_pdb());
    }

    #[test]
    fn test_single_command_mounted_on_root() {
        let cli = Cli::new("app");
        let sig = Signature::new("only").arg("name", TypeHint::Str);
        cli.command(None).function(sig, noop()).unwrap();
        let root = cli.build_command();
        assert!(root.get_subcommands().next().is_none());
        assert!(root.get_arguments().any(|a| a.get_id().as_str() == "name"));
    }

    #[test]
    fn test_callback_forces_subcommands() {
        let cli = Cli::new("app").callback(|_: &mut Context| -> Result<()> { Ok(()) });
        cli.command(None).function(Signature::new("only"), noop()).unwrap();
        let root = cli.build_command();
        assert_eq!(root.get_subcommands().map(|c| c.get_name().to_string()).collect::<Vec<_>>(), ["only"]);
    }

    #[test]
    fn test_hidden_and_help_recorded() {
        let cli = Cli::new("app");
        let info = ParamInfo::option(json!(1), ["--n"]).annotation(TypeHint::Int);
        cli.command(Some("secret"))
            .help("Does things")
            .hidden(true)
            .function(Signature::new("s").with_param("n", info), noop())
            .unwrap();
        let entry = &cli.registered_commands()[0];
        assert_eq!(entry.help(), Some("Does things"));
        assert!(entry.is_hidden());
    }

    struct UnflushableSink;

    impl io::Write for UnflushableSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_flush_failure_fails_invocation() {
        let cli = Cli::new("app");
        cli.command(None)
            .function(Signature::new("hello"), |ctx: &mut Context, _: Kwargs| -> Result<()> {
                ctx.echo("hello")
            })
            .unwrap();
        let result = cli.invoke(Vec::<String>::new(), Box::new(UnflushableSink), Box::new(io::sink()));
        assert_eq!(result.exit_code, 1);
        assert!(matches!(result.error, Some(CommandError::Io(_))));
    }

    #[test]
    fn test_reserved_names_follow_settings() {
        let opt = |decl: &str| ParamInfo::option(json!(false), [decl.to_string()]).annotation(TypeHint::Bool);

        let plain = Cli::new("app");
        assert!(plain.command(None).function(Signature::new("a").with_param("p", opt("--pdb")), noop()).is_ok());
        assert!(plain.command(None).function(Signature::new("b").with_param("v", opt("--version")), noop()).is_ok());

        let full = Cli::new("app").debug_flag(true).version("1.0");
        for decl in ["--pdb", "--version", "--help"] {
            let err = full
                .command(None)
                .function(Signature::new("c").with_param("flag", opt(decl)), noop())
                .unwrap_err();
            assert_eq!(
                err,
                ConfigurationError::OptionConflict {
                    param: "flag".to_string(),
                    option: decl.to_string(),
                }
            );
        }
        assert!(full.registered_commands().is_empty());
    }

    #[test]
    fn test_from_config_seeds_obj() {
        let mut config = CliConfig::default();
        config.obj.insert("pdb".to_string(), json!(true));
        config.debug_flag = true;
        let cli = Cli::from_config(config);
        assert_eq!(cli.obj.get("pdb"), Some(&json!(true)));
        assert!(cli.debug_flag);
    }
}

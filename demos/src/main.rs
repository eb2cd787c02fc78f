//! Demo application showing each way of declaring a validated command.
//!
//! ```text
//! command-model-demo repeat --name ann -n bob 2
//! command-model-demo scale 3 4
//! command-model-demo --pdb divide 1 0
//! ```
//!
//! Set `COMMAND_MODEL_DEMO_CONFIG` to a YAML file to override the
//! application settings, and `RUST_LOG` to see the library's logging.

use std::env;
use std::process;
use std::sync::Arc;

use command_model::{Cli, CliConfig, CommandError, Context, Kwargs, Owner, Result};
use command_model_core::{CallArgs, ParamDefault, ParamInfo, Signature, TypeHint, ValidatorMode};
use serde_json::{Map, Value, json};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_VAR: &str = "COMMAND_MODEL_DEMO_CONFIG";

fn init_tracing() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()?;
    Ok(())
}

fn load_config() -> std::result::Result<CliConfig, command_model::ConfigError> {
    match env::var_os(CONFIG_VAR) {
        Some(path) => CliConfig::load(path),
        None => Ok(CliConfig {
            name: "command-model-demo".to_string(),
            about: Some("Validated commands, one of each kind".to_string()),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            debug_flag: true,
            ..CliConfig::default()
        }),
    }
}

fn names_option() -> ParamInfo {
    ParamInfo::option(ParamDefault::Required, ["--name", "-n"])
        .annotation(TypeHint::list(TypeHint::Str))
        .default_factory(|| json!([]))
        .help("Name to repeat; may be given more than once")
}

fn count_argument() -> ParamInfo {
    ParamInfo::argument(ParamDefault::Required)
        .annotation(TypeHint::non_negative_int())
        .help("How many times to repeat the names")
}

fn repeat_signature(name: &str) -> Signature {
    Signature::new(name)
        .with_param("count", count_argument())
        .with_param("names", names_option())
}

fn repeat(ctx: &mut Context, kw: &Kwargs) -> Result<()> {
    let count: usize = kw.get("count")?;
    let names: Vec<String> = kw.get("names")?;
    let line: Vec<&str> = (0..count).flat_map(|_| names.iter().map(String::as_str)).collect();
    ctx.echo(line.join(" "))
}

/// Owner of the `tally` class method.
struct Tally;

/// Owner of `tally-derived`, which extends `tally`.
struct DerivedTally;

/// Instance whose method is registered as `whoami`.
struct Account {
    user: String,
}

impl Account {
    fn whoami(&self, ctx: &mut Context, kw: Kwargs) -> Result<()> {
        let prefix = kw.get_opt::<String>("prefix")?.unwrap_or_default();
        ctx.echo(format!("{prefix}{}", self.user))
    }
}

fn multiply(mut values: Map<String, Value>) -> std::result::Result<Map<String, Value>, String> {
    let x = values.get("x").and_then(Value::as_i64).ok_or("x must be an integer")?;
    let y = values.get("y").and_then(Value::as_i64).ok_or("y must be an integer")?;
    values.insert("x".to_string(), json!(x * y));
    Ok(values)
}

fn build(cli: &Cli) -> std::result::Result<(), command_model_core::ConfigurationError> {
    cli.command(None)
        .help("Repeat the given names COUNT times")
        .function(repeat_signature("repeat"), |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            repeat(ctx, &kw)
        })?;

    cli.command(Some("repeat-raw"))
        .help("Like repeat, without validation")
        .validate(false)
        .function(repeat_signature("repeat_raw"), |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            let count: i64 = kw.get("count")?;
            let names: Vec<String> = kw.get("names")?;
            ctx.echo(format!("{count} x {}", names.join(",")))
        })?;

    let times = ParamInfo::option(json!(1), ["--times", "-t"])
        .annotation(TypeHint::Int.parse_as(TypeHint::positive_int()))
        .help("Number of greetings");
    cli.command(None).help("Greet someone").function(
        Signature::new("greet").arg("name", TypeHint::Str).with_param("times", times),
        |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            let name: String = kw.get("name")?;
            for _ in 0..kw.get::<usize>("times")? {
                ctx.echo(format!("Hello {name}"))?;
            }
            Ok(())
        },
    )?;

    let scale = cli.command(None).help("Multiply X by Y before printing both").function(
        Signature::new("scale")
            .with_param("x", ParamInfo::argument(json!(1)).annotation(TypeHint::Int))
            .with_param("y", ParamInfo::argument(json!(2)).annotation(TypeHint::Int)),
        |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            let x: i64 = kw.get("x")?;
            let y: i64 = kw.get("y")?;
            ctx.echo(format!("{x} {y}"))
        },
    )?;
    scale.validator(ValidatorMode::After, multiply)?;

    let tally = cli.command(None).help("Count the names, through a class method").class_method(
        repeat_signature("tally"),
        |owner: &Owner, ctx: &mut Context, kw: Kwargs| -> Result<()> {
            let names: Vec<String> = kw.get("names")?;
            let count: usize = kw.get("count")?;
            ctx.echo(format!("{}: {}", owner.type_name(), names.len() * count))
        },
    )?;
    tally.attach(Owner::of::<Tally>("command"))?;

    let base = Arc::clone(&tally);
    let derived = cli
        .command(Some("tally-derived"))
        .help("Tally, then announce the subclass")
        .class_method(
            repeat_signature("tally"),
            move |owner: &Owner, ctx: &mut Context, kw: Kwargs| -> Result<()> {
                base.get(Some(owner))?.call(ctx, CallArgs::from(kw.into_map()))?;
                ctx.echo("I am a subclass!")
            },
        )?;
    derived.attach(Owner::of::<DerivedTally>("command"))?;

    let numbers = ParamInfo::option(Value::Null, ["--number", "-n"])
        .annotation(TypeHint::optional(
            TypeHint::list(TypeHint::Int).parse_as(TypeHint::set(TypeHint::positive_int())),
        ))
        .help("Positive number; duplicates are dropped");
    let data = ParamInfo::argument(ParamDefault::Required)
        .annotation(TypeHint::list(TypeHint::Str).parse_as(TypeHint::list(TypeHint::Json)))
        .metavar("JSON");
    cli.command(None).help("Decode JSON arguments").function(
        Signature::new("data").with_param("data", data).with_param("numbers", numbers),
        |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            ctx.echo(kw.value("data").cloned().unwrap_or(Value::Null))?;
            ctx.echo(kw.value("numbers").cloned().unwrap_or(Value::Null))
        },
    )?;

    cli.command(None).help("Divide A by B").function(
        Signature::new("divide").arg("a", TypeHint::Float).arg("b", TypeHint::Float),
        |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            let a: f64 = kw.get("a")?;
            let b: f64 = kw.get("b")?;
            if b == 0.0 {
                return Err(CommandError::msg("division by zero"));
            }
            ctx.echo(a / b)
        },
    )?;

    let prefix = ParamInfo::option(Value::Null, ["--prefix"]).annotation(TypeHint::optional(TypeHint::Str));
    let user = env::var("USER").unwrap_or_else(|_| "nobody".to_string());
    cli.command(None).help("Print the current account").bound(
        Signature::new("whoami").with_param("prefix", prefix),
        Arc::new(Account { user }),
        Account::whoami,
    )?;

    Ok(())
}

fn main() {
    if let Err(err) = init_tracing() {
        eprintln!("failed to initialise logging: {err}");
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            eprintln!("Error: {err}");
            process::exit(2);
        }
    };

    let cli = Cli::from_config(config).callback(|ctx: &mut Context| -> Result<()> {
        debug!(pdb = ctx.debug_enabled(), "starting");
        Ok(())
    });
    if let Err(err) = build(&cli) {
        error!(error = %err, "invalid command declaration");
        eprintln!("Error: {err}");
        process::exit(1);
    }
    cli.main()
}

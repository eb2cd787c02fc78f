//! Command-level and parameter-level validators.

use std::sync::Arc;

use command_model::testing::CliRunner;
use command_model::{Cli, CommandDescriptor, CommandError, Context, Kwargs, Owner, Result};
use command_model_core::{CallArgs, ConfigurationError, ParamInfo, Signature, TypeHint, ValidatorMode};
use serde_json::{Map, Value, json};

type Values = Map<String, Value>;

fn xy_signature(name: &str) -> Signature {
    Signature::new(name)
        .with_param("x", ParamInfo::argument(json!(1)).annotation(TypeHint::Int))
        .with_param("y", ParamInfo::argument(json!(2)).annotation(TypeHint::Int))
}

fn print_xy(ctx: &mut Context, kw: &Kwargs) -> Result<()> {
    let x: i64 = kw.get("x")?;
    let y: i64 = kw.get("y")?;
    ctx.echo(format!("{x} {y}"))
}

fn multiply(mut values: Values) -> std::result::Result<Values, String> {
    let x = values.get("x").and_then(Value::as_i64).ok_or("x is not an integer")?;
    let y = values.get("y").and_then(Value::as_i64).ok_or("y is not an integer")?;
    values.insert("x".to_string(), json!(x * y));
    Ok(values)
}

struct ClassMethod;
struct ClassMethodDerived;

fn validated_app() -> Cli {
    let cli = Cli::new("app").callback(|_: &mut Context| -> Result<()> { Ok(()) });

    let function = cli
        .command(Some("function"))
        .function(xy_signature("function"), |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            print_xy(ctx, &kw)
        })
        .unwrap();
    function.validator(ValidatorMode::After, multiply).unwrap();

    let static_method = cli
        .command(Some("staticmethod"))
        .function(xy_signature("command"), |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            print_xy(ctx, &kw)
        })
        .unwrap();
    static_method.validator(ValidatorMode::After, multiply).unwrap();

    let class_method: Arc<CommandDescriptor> = cli
        .command(Some("classmethod"))
        .class_method(xy_signature("command"), |_: &Owner, ctx: &mut Context, kw: Kwargs| -> Result<()> {
            print_xy(ctx, &kw)
        })
        .unwrap();
    class_method.validator(ValidatorMode::Before, multiply).unwrap();
    class_method.attach(Owner::of::<ClassMethod>("command")).unwrap();

    let base = Arc::clone(&class_method);
    let derived = cli
        .command(Some("classmethod_derived"))
        .class_method(
            xy_signature("command"),
            move |owner: &Owner, ctx: &mut Context, kw: Kwargs| -> Result<()> {
                let call = CallArgs::new()
                    .arg(kw.value("x").cloned().unwrap_or(Value::Null))
                    .arg(kw.value("y").cloned().unwrap_or(Value::Null));
                base.get(Some(owner))?.call(ctx, call)
            },
        )
        .unwrap();
    derived.attach(Owner::of::<ClassMethodDerived>("command")).unwrap();

    cli
}

#[test]
fn test_command_validators_apply_on_every_call() {
    let cli = validated_app();
    let runner = CliRunner::new();
    for command in ["function", "staticmethod", "classmethod", "classmethod_derived"] {
        for _ in 0..2 {
            let result = runner.invoke(&cli, [command]);
            assert_eq!(result.exit_code, 0, "{command}: {}", result.stderr);
            assert_eq!(result.output(), "2 2", "{command}");
        }
    }
}

#[test]
fn test_command_validator_sees_supplied_values() {
    let cli = validated_app();
    let result = CliRunner::new().invoke(&cli, ["function", "3", "4"]);
    assert_eq!(result.output(), "12 4");
}

#[test]
fn test_command_validator_failure_is_validation_error() {
    let cli = Cli::new("app");
    let desc = cli
        .command(Some("strict"))
        .function(xy_signature("strict"), |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            print_xy(ctx, &kw)
        })
        .unwrap();
    desc.validator(ValidatorMode::After, |values: Values| -> std::result::Result<Values, String> {
        match values.get("x").and_then(Value::as_i64) {
            Some(x) if x > 10 => Err("x must not exceed 10".to_string()),
            _ => Ok(values),
        }
    })
    .unwrap();

    let result = CliRunner::new().invoke(&cli, ["11"]);
    assert_eq!(result.exit_code, 1);
    let Some(CommandError::Validation(err)) = result.error else {
        panic!("expected a validation error, got {:?}", result.error);
    };
    assert!(err.to_string().contains("x must not exceed 10"), "{err}");
}

#[test]
fn test_validator_on_unvalidated_command_is_rejected() {
    let cli = Cli::new("app");
    let desc = cli
        .command(Some("loose"))
        .validate(false)
        .function(xy_signature("loose"), |ctx: &mut Context, kw: Kwargs| -> Result<()> {
            print_xy(ctx, &kw)
        })
        .unwrap();
    let err = desc.validator(ValidatorMode::After, multiply).unwrap_err();
    assert_eq!(err, ConfigurationError::ValidatorOnUnvalidated("loose".to_string()));
}

fn scale(factor: i64) -> impl Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static {
    move |value: Value| match value.as_i64() {
        Some(n) => Ok(json!(n * factor)),
        None => Err(format!("expected an integer, got {value}")),
    }
}

#[test]
fn test_param_validators_follow_copies() {
    let mut arg1 = ParamInfo::argument(json!(2)).annotation(TypeHint::Int);
    arg1.validator(scale(2));
    let mut arg2 = arg1.call(&[], std::iter::empty::<(&str, Value)>()).unwrap();
    arg2.validator(scale(3));

    let cli = Cli::new("app");
    cli.command(Some("command"))
        .function(
            Signature::new("command").with_param("x1", arg1).with_param("x2", arg2),
            |ctx: &mut Context, kw: Kwargs| -> Result<()> {
                let x1: i64 = kw.get("x1")?;
                let x2: i64 = kw.get("x2")?;
                ctx.echo(format!("{x1} {x2}"))
            },
        )
        .unwrap();

    let runner = CliRunner::new();
    assert_eq!(runner.invoke(&cli, Vec::<String>::new()).output(), "4 6");
    assert_eq!(runner.invoke(&cli, ["1", "1"]).output(), "2 3");
}

fn show(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[test]
fn test_params_called_for_new_defaults() {
    let arg1 = ParamInfo::argument(json!(1)).annotation(TypeHint::Int);
    let arg2 = arg1
        .call(&[json!("x1")], std::iter::empty::<(&str, Value)>())
        .unwrap()
        .annotation(TypeHint::Str);
    let opt1 = ParamInfo::option(json!(1), Vec::<String>::new()).annotation(TypeHint::Int);
    let opt2 = ParamInfo::option(json!("x1"), Vec::<String>::new()).annotation(TypeHint::Str);
    assert_ne!(arg2.ann(), arg1.ann());

    let cli = Cli::new("app").callback(|_: &mut Context| -> Result<()> { Ok(()) });
    for (name, info) in [
        ("arg-command1", arg1),
        ("arg-command2", arg2),
        ("opt-command1", opt1),
        ("opt-command2", opt2),
    ] {
        cli.command(Some(name))
            .function(
                Signature::new("command").with_param("x", info),
                |ctx: &mut Context, kw: Kwargs| -> Result<()> { ctx.echo(show(kw.value("x"))) },
            )
            .unwrap();
    }

    let runner = CliRunner::new();
    for (command, expected) in [
        ("arg-command1", "1"),
        ("arg-command2", "x1"),
        ("opt-command1", "1"),
        ("opt-command2", "x1"),
    ] {
        let result = runner.invoke(&cli, [command]);
        assert_eq!(result.exit_code, 0, "{command}: {}", result.stderr);
        assert_eq!(result.output(), expected, "{command}");
    }
    assert_eq!(runner.invoke(&cli, ["opt-command1", "--x", "5"]).output(), "5");
}

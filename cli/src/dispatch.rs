//! clap glue: signature parameters to `Arg`s, parsed matches back to kwargs.

use clap::builder::{PossibleValuesParser, ValueParser};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use command_model_core::{ConfigurationError, ParamInfo, ParamKind, Parameter, ParameterDefault, Signature, TypeHint};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Bool,
    Int,
    Float,
    Str,
}

/// How one parameter travels through clap.
#[derive(Debug, Clone)]
struct Shape {
    kind: ParamKind,
    scalar: Scalar,
    choices: Option<Vec<String>>,
    multiple: bool,
    flag: bool,
}

impl Shape {
    fn of(param: &Parameter) -> Self {
        let kind = param_kind(param);
        let declared = param.declared_type().map(TypeHint::base);
        let (item, multiple) = match declared {
            Some(ty) if ty.is_sequence() => (ty.item().map(TypeHint::base), true),
            other => (other, false),
        };
        let (scalar, choices) = match item {
            Some(TypeHint::Bool) => (Scalar::Bool, None),
            Some(TypeHint::Int) => (Scalar::Int, None),
            Some(TypeHint::Float) => (Scalar::Float, None),
            Some(TypeHint::Choice(values)) => (Scalar::Str, Some(values.clone())),
            _ => (Scalar::Str, None),
        };
        let flag = kind == ParamKind::Option && scalar == Scalar::Bool && !multiple;
        Self {
            kind,
            scalar,
            choices,
            multiple,
            flag,
        }
    }

    /// The declared spelling of a choice matched case-insensitively.
    fn canonical(&self, raw: &str) -> String {
        self.choices
            .iter()
            .flatten()
            .find(|choice| choice.eq_ignore_ascii_case(raw))
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }

    fn parser(&self) -> ValueParser {
        if let Some(choices) = &self.choices {
            return PossibleValuesParser::new(choices.iter().cloned()).into();
        }
        match self.scalar {
            Scalar::Bool => ValueParser::bool(),
            Scalar::Int => value_parser!(i64).into(),
            Scalar::Float => value_parser!(f64).into(),
            Scalar::Str => ValueParser::string(),
        }
    }
}

/// Positional or named, following the descriptor if there is one.
///
/// Plain parameters are positional when they have no default.
fn param_kind(param: &Parameter) -> ParamKind {
    match &param.default {
        ParameterDefault::Param(info) => info.kind(),
        ParameterDefault::Empty => ParamKind::Argument,
        ParameterDefault::Value(_) => ParamKind::Option,
    }
}

fn has_default(param: &Parameter) -> bool {
    match &param.default {
        ParameterDefault::Empty => false,
        ParameterDefault::Value(_) => true,
        ParameterDefault::Param(info) => !info.default().is_required(),
    }
}

/// `[default: ...]` suffix for help output.
fn default_hint(param: &Parameter) -> Option<String> {
    let value = match &param.default {
        ParameterDefault::Value(v) => v,
        ParameterDefault::Param(info) if info.shows_default() => match info.default() {
            command_model_core::ParamDefault::Value(v) => v,
            _ => return None,
        },
        _ => return None,
    };
    match value {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::String(s) => Some(format!("[default: {s}]")),
        other => Some(format!("[default: {other}]")),
    }
}

/// Long names and short flags an option answers to.
#[derive(Debug, Default)]
struct Spellings {
    longs: Vec<String>,
    shorts: Vec<char>,
}

impl Spellings {
    fn of(param: &Parameter) -> Self {
        if param_kind(param) != ParamKind::Option {
            return Self::default();
        }
        let decls = param.info().map(ParamInfo::decls).unwrap_or_default();
        if decls.is_empty() {
            return Self {
                longs: vec![param.name.replace('_', "-")],
                shorts: Vec::new(),
            };
        }
        let mut spellings = Self::default();
        for decl in decls {
            if let Some(long) = decl.strip_prefix("--") {
                spellings.longs.push(long.to_string());
                continue;
            }
            let mut short = decl.strip_prefix('-').unwrap_or_default().chars();
            match (short.next(), short.next()) {
                (Some(c), None) => spellings.shorts.push(c),
                _ => warn!(param = %param.name, decl = %decl, "ignoring malformed option declaration"),
            }
        }
        spellings
    }

    fn flags(&self) -> impl Iterator<Item = String> + '_ {
        let longs = self.longs.iter().map(|long| format!("--{long}"));
        longs.chain(self.shorts.iter().map(|short| format!("-{short}")))
    }

    fn apply(&self, mut arg: Arg) -> Arg {
        if let Some((long, aliases)) = self.longs.split_first() {
            arg = arg.long(long.clone()).visible_aliases(aliases.to_vec());
        }
        for short in &self.shorts {
            arg = arg.short(*short);
        }
        arg
    }
}

/// Rejects parameters that would clash on the command line, with each
/// other or with the application's own long-only flags in `reserved`.
pub(crate) fn check_spellings(sig: &Signature, reserved: &[&str]) -> Result<(), ConfigurationError> {
    let mut taken: Vec<String> = reserved.iter().map(|name| format!("--{name}")).collect();
    for param in sig.params() {
        if reserved.contains(&param.name.as_str()) {
            return Err(ConfigurationError::OptionConflict {
                param: param.name.clone(),
                option: param.name.clone(),
            });
        }
        for flag in Spellings::of(param).flags() {
            if taken.contains(&flag) {
                return Err(ConfigurationError::OptionConflict {
                    param: param.name.clone(),
                    option: flag,
                });
            }
            taken.push(flag);
        }
    }
    Ok(())
}

/// Builds the clap argument for `param`.
pub(crate) fn param_arg(param: &Parameter) -> Arg {
    let shape = Shape::of(param);
    let info = param.info();
    let mut arg = Arg::new(param.name.clone());

    if shape.kind == ParamKind::Option {
        arg = Spellings::of(param).apply(arg);
    }
    arg = arg.required(!has_default(param) && !shape.flag);

    arg = match (shape.flag, shape.multiple, shape.kind) {
        (true, _, _) => arg.action(ArgAction::SetTrue),
        (false, true, ParamKind::Argument) => arg.action(ArgAction::Append).num_args(1..),
        (false, true, ParamKind::Option) => arg.action(ArgAction::Append),
        (false, false, _) => arg.action(ArgAction::Set),
    };
    if !shape.flag {
        arg = arg.value_parser(shape.parser()).allow_negative_numbers(true);
    }

    let mut help = info.and_then(ParamInfo::help_text).map(String::from);
    if let Some(hint) = default_hint(param) {
        help = Some(match help {
            Some(text) => format!("{text} {hint}"),
            None => hint,
        });
    }
    if let Some(help) = help {
        arg = arg.help(help);
    }

    if let Some(info) = info {
        if let Some(metavar) = info.metavar_name() {
            arg = arg.value_name(metavar.to_string());
        }
        if let Some(var) = info.env_var() {
            arg = arg.env(var.to_string());
        }
        if let Some(heading) = info.heading() {
            arg = arg.help_heading(heading.to_string());
        }
        arg = arg.hide(info.is_hidden()).ignore_case(info.is_case_insensitive());
    }
    arg
}

/// Adds an argument for every parameter of `sig` to `cmd`.
pub(crate) fn mount(cmd: Command, sig: &Signature) -> Command {
    sig.params().iter().fold(cmd, |cmd, param| cmd.arg(param_arg(param)))
}

fn supplied(matches: &ArgMatches, id: &str, shape: &Shape) -> Option<Value> {
    if shape.flag {
        return match matches.value_source(id) {
            None | Some(ValueSource::DefaultValue) => None,
            Some(_) => Some(Value::Bool(matches.get_flag(id))),
        };
    }
    let values: Vec<Value> = match shape.scalar {
        _ if shape.choices.is_some() => matches
            .get_many::<String>(id)?
            .map(|raw| Value::String(shape.canonical(raw)))
            .collect(),
        Scalar::Bool => matches.get_many::<bool>(id)?.copied().map(Value::Bool).collect(),
        Scalar::Int => matches.get_many::<i64>(id)?.copied().map(Value::from).collect(),
        Scalar::Float => matches.get_many::<f64>(id)?.copied().map(Value::from).collect(),
        Scalar::Str => matches.get_many::<String>(id)?.cloned().map(Value::String).collect(),
    };
    if shape.multiple {
        Some(Value::Array(values))
    } else {
        values.into_iter().next()
    }
}

/// Reads every parameter of `sig` out of `matches`.
///
/// Parameters the command line left out take their default. Flags without a
/// default are `false`, and multi-value parameters without a default or with
/// a `null` one are empty. Anything else without a default is left out.
pub(crate) fn collect_kwargs(sig: &Signature, matches: &ArgMatches) -> Map<String, Value> {
    let mut kwargs = Map::new();
    for param in sig.params() {
        let shape = Shape::of(param);
        let value = match supplied(matches, &param.name, &shape).or_else(|| param.default_produce()) {
            None | Some(Value::Null) if shape.multiple => Some(Value::Array(Vec::new())),
            None if shape.flag => Some(Value::Bool(false)),
            other => other,
        };
        if let Some(value) = value {
            kwargs.insert(param.name.clone(), value);
        }
    }
    kwargs
}

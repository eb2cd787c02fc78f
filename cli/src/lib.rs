//! Validated commands on top of clap.
//!
//! Commands are declared with a [`Signature`](command_model_core::Signature)
//! and a body. At call time the command line is parsed by clap, the values
//! are bound to the signature, validated against a schema synthesized from
//! it, and only then handed to the body as [`Kwargs`].
//!
//! - [`Cli`]: the application, with its registry, root callback and dispatch.
//! - [`CommandDescriptor`]: one declared command; plain functions register
//!   immediately, class methods once [`attach`](CommandDescriptor::attach)ed.
//! - [`decorators`]: the validation and post-mortem wrappers.
//! - [`Context`]: per-invocation state shared by the callback and command.
//! - [`CliConfig`]: YAML application settings.
//! - [`testing::CliRunner`]: in-process invocation with captured output.
//!
//! # Example
//!
//! ```
//! use command_model::testing::CliRunner;
//! use command_model::{Cli, Context, Kwargs, Result};
//! use command_model_core::{Signature, TypeHint};
//!
//! let cli = Cli::new("calc");
//! cli.command(None)
//!     .function(
//!         Signature::new("double").arg("n", TypeHint::positive_int()),
//!         |ctx: &mut Context, kw: Kwargs| -> Result<()> { ctx.echo(kw.get::<i64>("n")? * 2) },
//!     )
//!     .unwrap();
//!
//! let runner = CliRunner::new();
//! assert_eq!(runner.invoke(&cli, ["21"]).output(), "42");
//! assert_eq!(runner.invoke(&cli, ["--", "-1"]).exit_code, 1);
//! ```

mod app;
mod command;
mod config;
mod context;
pub mod decorators;
mod dispatch;
mod error;
pub mod testing;

pub use app::{Callback, Cli, CommandBuilder, DEBUG_FLAG, Invocation, RegisteredCommand};
pub use command::{
    BoundCommand, ClassHandler, CommandDescriptor, CommandFn, CommandSettings, Handler, Owner, Registrar,
};
pub use config::CliConfig;
pub use context::{Context, DEBUG_KEY, Kwargs};
pub use decorators::{LogPostMortem, PostMortem};
pub use error::{CommandError, ConfigError, Result};

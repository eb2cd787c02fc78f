//! Wrappers layered around a command body at call time.
//!
//! [`validated_with`] runs the command's schema over its arguments before the
//! body sees them. [`debuggable`] reports failures post-mortem when the
//! invocation asked for it. A command descriptor applies them in that order,
//! so validation failures are reported too.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use command_model_core::{CallArgs, ModelSchema, Signature, match_signature};
use serde_json::Map;
use tracing::{error, warn};

use crate::context::Context;
use crate::error::{CommandError, Result};

/// A command body, or a wrapped one.
pub type Callable = Arc<dyn Fn(&mut Context, CallArgs) -> Result<()> + Send + Sync>;

/// Hook run when a command fails with debugging enabled.
///
/// Hooks observe the failure; the error is returned to the caller afterwards
/// whatever the hook does.
pub trait PostMortem: Send + Sync {
    /// Inspects the failure of the current command.
    fn post_mortem(&self, ctx: &mut Context, error: &CommandError);
}

impl<F> PostMortem for F
where
    F: Fn(&mut Context, &CommandError) + Send + Sync,
{
    fn post_mortem(&self, ctx: &mut Context, error: &CommandError) {
        self(ctx, error);
    }
}

/// Default hook: logs the failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPostMortem;

impl PostMortem for LogPostMortem {
    fn post_mortem(&self, ctx: &mut Context, err: &CommandError) {
        error!(
            command = ctx.command_name().unwrap_or("<root>"),
            error = %err,
            "command failed"
        );
    }
}

/// Validates arguments against `schema` before calling `func`.
///
/// The call's values are bound to `sig`, the subset naming schema fields is
/// validated, and the coerced values replace the raw ones. `func` is then
/// called with keyword arguments only.
pub fn validated_with(schema: Arc<ModelSchema>, sig: Arc<Signature>, func: Callable) -> Callable {
    Arc::new(move |ctx: &mut Context, call: CallArgs| -> Result<()> {
        let mut all = match_signature(&sig, &call.args, &call.kwargs)?;
        let subset: Map<_, _> = all
            .iter()
            .filter(|(name, _)| schema.has_field(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let validated = schema.validate(subset)?;
        all.extend(validated);
        func(ctx, CallArgs::from(all))
    })
}

/// Reports failures of `func` when the context has debugging enabled.
///
/// The report (the error, its source chain and a backtrace) goes to the
/// context's error stream, then `hook` runs. The error is always returned.
pub fn debuggable(func: Callable, hook: Arc<dyn PostMortem>) -> Callable {
    Arc::new(move |ctx: &mut Context, call: CallArgs| -> Result<()> {
        let result = func(ctx, call);
        if let Err(err) = &result {
            if ctx.debug_enabled() {
                if let Err(io_err) = write_report(ctx.err(), err) {
                    warn!(error = %io_err, "failed to write post-mortem report");
                }
                hook.post_mortem(ctx, err);
            }
        }
        result
    })
}

fn write_report(out: &mut dyn Write, err: &CommandError) -> io::Result<()> {
    writeln!(out, "Error: {err}")?;
    let mut source = err.source();
    while let Some(cause) = source {
        writeln!(out, "Caused by: {cause}")?;
        source = cause.source();
    }
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        writeln!(out, "Backtrace:\n{backtrace}")?;
    }
    out.flush()
}

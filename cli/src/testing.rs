//! In-process test runner that captures a [`Cli`]'s output.

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::app::Cli;
use crate::error::CommandError;

/// A cloneable in-memory writer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Captured result of one invocation.
#[derive(Debug)]
pub struct RunResult {
    /// Process exit status.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// The failure, if the invocation failed.
    pub error: Option<CommandError>,
}

impl RunResult {
    /// Standard output with surrounding whitespace removed.
    pub fn output(&self) -> &str {
        self.stdout.trim()
    }
}

/// Invokes a [`Cli`] with captured output.
///
/// # Examples
///
/// ```
/// use command_model::testing::CliRunner;
/// use command_model::{Cli, Context, Kwargs, Result};
/// use command_model_core::{Signature, TypeHint};
///
/// let cli = Cli::new("echo");
/// cli.command(None)
///     .function(
///         Signature::new("say").arg("word", TypeHint::Str),
///         |ctx: &mut Context, kw: Kwargs| -> Result<()> { ctx.echo(kw.get::<String>("word")?) },
///     )
///     .unwrap();
///
/// let result = CliRunner::new().invoke(&cli, ["hi"]);
/// assert_eq!(result.exit_code, 0);
/// assert_eq!(result.output(), "hi");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CliRunner;

impl CliRunner {
    /// Creates a runner.
    pub fn new() -> Self {
        Self
    }

    /// Invokes `cli` with `args` (without the program name).
    pub fn invoke<I, T>(&self, cli: &Cli, args: I) -> RunResult
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let invocation = cli.invoke(args, Box::new(out.clone()), Box::new(err.clone()));
        RunResult {
            exit_code: invocation.exit_code,
            stdout: out.contents(),
            stderr: err.contents(),
            error: invocation.error,
        }
    }

    /// Invokes `cli` with a whitespace-separated command line.
    pub fn invoke_line(&self, cli: &Cli, line: &str) -> RunResult {
        self.invoke(cli, line.split_whitespace())
    }
}

//! External command invocation

use std::fmt;
use std::process::Command;
use stepbind_core::{Result, StepError};
use tracing::{debug, instrument, warn};

/// A program and its arguments, never passed through a shell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a template with shell quoting rules, then substitute `{name}`
    /// placeholders token by token. Only identifier-like names count as
    /// placeholders, so `{.items[0].status.phase}` passes through untouched,
    /// and substituted values are never scanned again.
    pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<Self> {
        let tokens = shlex::split(template).ok_or_else(|| StepError::Configuration {
            reason: format!("unbalanced quotes in command template {template:?}"),
        })?;

        let mut rendered = tokens
            .iter()
            .map(|token| substitute(token, vars).map_err(|name| StepError::Configuration {
                reason: format!("unresolved placeholder {{{name}}} in {token:?} of {template:?}"),
            }));

        let program = rendered.next().transpose()?.ok_or_else(|| StepError::Configuration {
            reason: "command template is empty".to_string(),
        })?;
        let args = rendered.collect::<Result<Vec<_>>>()?;
        Ok(Self { program, args })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Replace each `{name}` in one template token; `Err` names the first
/// placeholder with no value
fn substitute<'a>(token: &'a str, vars: &[(&str, &str)]) -> std::result::Result<String, &'a str> {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let name = after
            .find('}')
            .map(|close| &after[..close])
            .filter(|name| is_placeholder_name(name));

        match name {
            Some(name) => {
                let value = vars
                    .iter()
                    .find_map(|(var, value)| (*var == name).then_some(*value))
                    .ok_or(name)?;
                out.push_str(value);
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Runs external commands on behalf of collaborators
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput>;

    /// Run and treat a non-zero exit as a collaborator failure
    fn run_checked(&self, command: &CommandLine) -> Result<CommandOutput> {
        let output = self.run(command)?;
        if output.success() {
            return Ok(output);
        }
        let status = output
            .status
            .map_or_else(|| "signal".to_string(), |code| code.to_string());
        warn!(command = %command, status = %status, "command failed");
        Err(StepError::collaborator(
            command.program.clone(),
            format!(
                "`{command}` exited with status {status}: {}",
                output.combined().trim()
            ),
        ))
    }
}

/// Spawns real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    #[instrument(skip(self), fields(command = %command))]
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .output()
            .map_err(|err| {
                StepError::collaborator(
                    command.program.clone(),
                    format!("failed to run `{command}`: {err}"),
                )
            })?;

        debug!(status = ?output.status.code(), "command finished");
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

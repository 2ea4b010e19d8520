//! External command execution
//!
//! Providers and guards run commands through [`CommandRunner`] so tests can
//! substitute a recording fake for the real system.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

/// Result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Error describing a failed command, with its captured output
    pub fn failure(&self, command: &str) -> anyhow::Error {
        let code = self
            .code
            .map_or_else(|| "a signal".to_string(), |c| c.to_string());
        anyhow::anyhow!(
            "Expected process to exit with [0], but received {code}\n\
             ---- Begin output of {command} ----\n\
             STDOUT: {}\n\
             STDERR: {}\n\
             ---- End output of {command} ----",
            self.stdout.trim(),
            self.stderr.trim()
        )
    }
}

/// One command invocation
#[derive(Debug, Clone, Default)]
pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: Vec<&'a str>,
    pub cwd: Option<&'a Path>,
    pub env: Vec<(&'a str, &'a str)>,
}

impl<'a> Invocation<'a> {
    pub fn new(program: &'a str, args: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            program,
            args: args.into_iter().collect(),
            ..Default::default()
        }
    }

    /// `sh -c <script>`
    pub fn shell(script: &'a str) -> Self {
        Self::new("sh", ["-c", script])
    }

    pub fn cwd(mut self, cwd: &'a Path) -> Self {
        self.cwd = Some(cwd);
        self
    }

    pub fn env(mut self, key: &'a str, value: &'a str) -> Self {
        self.env.push((key, value));
        self
    }
}

impl fmt::Display for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs commands. Implement this to intercept process execution.
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Run to completion, capturing output.
    ///
    /// Errors only when the process could not be started; a non-zero exit
    /// is reported through [`CommandOutput::code`].
    fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput>;

    /// Run and require a zero exit status
    fn run_checked(&self, invocation: &Invocation<'_>) -> Result<CommandOutput> {
        let output = self.run(invocation)?;
        if output.success() {
            Ok(output)
        } else {
            Err(output.failure(&invocation.to_string()))
        }
    }

    /// Trimmed stdout of a successful run, `None` otherwise
    fn query(&self, invocation: &Invocation<'_>) -> Option<String> {
        self.run(invocation)
            .ok()
            .filter(CommandOutput::success)
            .map(|output| output.stdout.trim().to_string())
    }
}

/// Runs real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput> {
        let mut command = Command::new(invocation.program);
        command
            .args(&invocation.args)
            .envs(invocation.env.iter().copied())
            .stdin(Stdio::null());
        if let Some(cwd) = invocation.cwd {
            command.current_dir(cwd);
        }

        log::debug!("Running: {invocation}");
        let output = command
            .output()
            .with_context(|| format!("Failed to execute: {invocation}"))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub mod fake {
    //! Recording runner for provider tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outputs and records every command line
    #[derive(Debug, Default)]
    pub struct FakeRunner {
        responses: Mutex<VecDeque<CommandOutput>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        /// Queue a response; unqueued calls succeed with empty output
        pub fn respond(self, code: i32, stdout: &str) -> Self {
            if let Ok(mut responses) = self.responses.lock() {
                responses.push_back(CommandOutput {
                    code: Some(code),
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                });
            }
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(invocation.to_string());
            }
            let response = self
                .responses
                .lock()
                .ok()
                .and_then(|mut r| r.pop_front())
                .unwrap_or(CommandOutput {
                    code: Some(0),
                    ..Default::default()
                });
            Ok(response)
        }
    }
}

//! Shell-command guards for recipe declarations
//!
//! A guard command is a read-only probe: exit status zero means the
//! condition holds. A string runs through `sh -c`; a list runs the program
//! directly with the remaining items as arguments.

use anyhow::bail;
use converge::{Guard, GuardKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::runner::{CommandRunner, Invocation};

/// A guard command as written in a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuardCommand {
    Shell(String),
    Argv(Vec<String>),
}

impl fmt::Display for GuardCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(script) => f.write_str(script),
            Self::Argv(argv) => f.write_str(&argv.join(" ")),
        }
    }
}

/// One `[[resource.guard]]` entry, keyed by its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardEntry {
    OnlyIf(GuardCommand),
    NotIf(GuardCommand),
}

impl GuardEntry {
    pub fn kind(&self) -> GuardKind {
        match self {
            Self::OnlyIf(_) => GuardKind::OnlyIf,
            Self::NotIf(_) => GuardKind::NotIf,
        }
    }

    pub fn command(&self) -> &GuardCommand {
        match self {
            Self::OnlyIf(command) | Self::NotIf(command) => command,
        }
    }
}

/// Build an engine guard that runs `command` through `runner`
pub fn command_guard(
    kind: GuardKind,
    command: GuardCommand,
    runner: Arc<dyn CommandRunner>,
) -> Guard {
    let description = command.to_string();
    Guard::new(kind, description, move || {
        let invocation = match &command {
            GuardCommand::Shell(script) => Invocation::shell(script),
            GuardCommand::Argv(argv) => match argv.split_first() {
                Some((program, args)) => {
                    Invocation::new(program, args.iter().map(String::as_str))
                }
                None => bail!("empty guard command"),
            },
        };
        let output = runner.run(&invocation)?;
        Ok(output.success())
    })
}

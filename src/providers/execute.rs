//! Execute provider - run a shell command

use anyhow::{Result, bail};
use converge::{Action, Mutation, PropertyValues, Provider};
use std::path::Path;
use std::sync::Arc;

use crate::runner::{CommandRunner, Invocation};

#[derive(Debug)]
pub struct ExecuteProvider {
    runner: Arc<dyn CommandRunner>,
}

impl ExecuteProvider {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Provider for ExecuteProvider {
    fn id(&self) -> &str {
        "execute/shell"
    }

    fn perform(&self, action: &Action, properties: &PropertyValues) -> Result<Mutation> {
        if action.as_str() != "run" {
            bail!("execute does not implement action {action}");
        }

        if let Some(creates) = properties.str("creates")
            && Path::new(creates).exists()
        {
            log::info!("{creates} already exists, not running");
            return Ok(Mutation::NoChange);
        }

        let command = properties.require_str("command")?;
        let mut invocation = Invocation::shell(command);
        if let Some(cwd) = properties.str("cwd") {
            invocation = invocation.cwd(Path::new(cwd));
        }
        if let Some(environment) = properties.map("environment") {
            for (key, value) in environment {
                let Some(value) = value.as_str() else {
                    bail!("environment variable {key} must be a string, got {value}");
                };
                invocation = invocation.env(key, value);
            }
        }

        self.runner.run_checked(&invocation)?;
        Ok(Mutation::Modified)
    }
}

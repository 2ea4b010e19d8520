//! Recipe files
//!
//! A recipe is a TOML list of resource declarations:
//!
//! ```toml
//! [[resource]]
//! type = "package"
//! name = "curl"
//! action = "install"
//! not_if = "command -v curl"
//!
//! [resource.properties]
//! version = "8.5.0"
//!
//! [[resource]]
//! type = "execute"
//! name = "systemctl reload nginx"
//!
//! [[resource.guard]]
//! only_if = "test -f /etc/nginx/nginx.conf"
//!
//! [[resource.guard]]
//! not_if = ["pgrep", "-x", "certbot"]
//! ```
//!
//! Guards attach in order: the `only_if` and `not_if` shorthands first,
//! then each `[[resource.guard]]` entry as written.

use anyhow::{Context, Result, bail};
use converge::{Action, GuardKind, PlatformFacts, Registry, ResourceInstance, Value};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::guards::{GuardCommand, GuardEntry, command_guard};
use crate::runner::CommandRunner;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    #[serde(default, rename = "resource")]
    pub resources: Vec<Declaration>,
}

/// One `[[resource]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub only_if: Option<GuardCommand>,
    #[serde(default)]
    pub not_if: Option<GuardCommand>,
    #[serde(default, rename = "guard")]
    pub guards: Vec<GuardEntry>,
    #[serde(default)]
    pub properties: toml::Table,
}

impl Recipe {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read recipe {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid recipe {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Declare and resolve every resource, in parallel.
    ///
    /// Any declaration error fails the whole recipe before anything
    /// executes. Instances come back in declaration order.
    pub fn declare(
        &self,
        registry: &Registry,
        facts: &PlatformFacts,
        runner: &Arc<dyn CommandRunner>,
    ) -> Result<Vec<ResourceInstance>> {
        self.resources
            .par_iter()
            .enumerate()
            .map(|(index, declaration)| {
                declaration.declare(registry, facts, runner).with_context(|| {
                    format!(
                        "resource #{} {}[{}]",
                        index + 1,
                        declaration.type_name,
                        declaration.name
                    )
                })
            })
            .collect()
    }
}

impl Declaration {
    pub fn declare(
        &self,
        registry: &Registry,
        facts: &PlatformFacts,
        runner: &Arc<dyn CommandRunner>,
    ) -> Result<ResourceInstance> {
        let setters = self
            .properties
            .iter()
            .map(|(name, value)| Ok((name.as_str(), to_value(name, value)?)))
            .collect::<Result<Vec<_>>>()?;

        let guards = self
            .guard_commands()
            .map(|(kind, command)| command_guard(kind, command.clone(), Arc::clone(runner)))
            .collect();

        let instance = registry.declare_resource(
            &self.type_name,
            &self.name,
            setters,
            self.action.as_deref().map(Action::from),
            guards,
            facts,
        )?;
        Ok(instance)
    }

    /// Every guard command in attachment order
    fn guard_commands(&self) -> impl Iterator<Item = (GuardKind, &GuardCommand)> {
        let only_if = self.only_if.iter().map(|command| (GuardKind::OnlyIf, command));
        let not_if = self.not_if.iter().map(|command| (GuardKind::NotIf, command));
        let listed = self.guards.iter().map(|entry| (entry.kind(), entry.command()));
        only_if.chain(not_if).chain(listed)
    }
}

/// Convert a TOML value into an engine value
fn to_value(property: &str, value: &toml::Value) -> Result<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Integer(*i),
        toml::Value::Boolean(b) => Value::Boolean(*b),
        toml::Value::Array(items) => Value::List(
            items
                .iter()
                .map(|item| to_value(property, item))
                .collect::<Result<_>>()?,
        ),
        toml::Value::Table(table) => Value::Map(
            table
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_value(property, v)?)))
                .collect::<Result<_>>()?,
        ),
        toml::Value::Float(_) | toml::Value::Datetime(_) => {
            bail!("property `{property}`: floats and datetimes are not supported")
        }
    })
}

//! Action executor
//!
//! Drives one resource instance through
//! `Pending -> {Skipped, Converging -> {Converged, Failed}}`. The executor
//! never retries and never swallows a failure; what a failure means for the
//! rest of the run is the caller's decision.

use crate::error::Error;
use crate::events::{ExecutionEvents, NoEvents};
use crate::guard::{self, GuardDecision};
use crate::instance::ResourceInstance;
use crate::redact::redact;
use crate::types::{Action, ExecuteOptions, Mutation};
use std::fmt;

/// Where an instance is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Pending,
    Skipped,
    Converging,
    Converged,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Skipped | Self::Converged | Self::Failed)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Converging => "converging",
            Self::Converged => "converged",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Terminal result of executing one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Guards rejected the action (or dry run)
    Skipped { reason: String },
    /// The provider completed
    Converged { mutation: Mutation },
    /// Resolution, guard or provider failure
    Failed { error: Error },
}

impl Outcome {
    pub fn state(&self) -> ExecutionState {
        match self {
            Self::Skipped { .. } => ExecutionState::Skipped,
            Self::Converged { .. } => ExecutionState::Converged,
            Self::Failed { .. } => ExecutionState::Failed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// What happened to one instance
#[derive(Debug, Clone)]
pub struct Report {
    pub type_name: String,
    pub name: String,
    pub action: Action,
    pub identity_key: String,
    pub outcome: Outcome,
    /// Every state visited, starting at `Pending`
    pub transitions: Vec<ExecutionState>,
}

impl Report {
    /// `type[name]`
    pub fn label(&self) -> String {
        format!("{}[{}]", self.type_name, self.name)
    }
}

/// Executes resource instances
pub struct Executor<'e> {
    options: ExecuteOptions,
    events: &'e mut dyn ExecutionEvents,
}

impl<'e> Executor<'e> {
    pub fn new(options: ExecuteOptions, events: &'e mut dyn ExecutionEvents) -> Self {
        Self { options, events }
    }

    /// Run one instance to a terminal state, consuming it.
    ///
    /// Every label, log line and report field derived from the instance is
    /// passed through [`surface`] first, so a secret in the declared name
    /// never leaves the executor.
    pub fn execute(&mut self, instance: ResourceInstance) -> Report {
        let name = surface(&instance, instance.name());
        let label = format!("{}[{name}]", instance.type_name());
        let action = instance.action().clone();
        let mut transitions = vec![ExecutionState::Pending];

        self.events.on_resource_start(&label, &action);

        let outcome = self.run(&instance, &label, &action, &mut transitions);
        let from = transitions.last().copied().unwrap_or(ExecutionState::Pending);
        transitions.push(outcome.state());
        log::info!("{label}: {from} -> {}", outcome.state());

        match &outcome {
            Outcome::Skipped { reason } => self.events.on_skipped(&label, reason),
            Outcome::Converged { mutation } if mutation.is_change() => {
                self.events.on_updated(&label, mutation);
            }
            Outcome::Converged { .. } => self.events.on_up_to_date(&label),
            Outcome::Failed { error } => {
                log::error!("{error}");
                self.events.on_failed(&label, error);
            }
        }

        let identity_key = instance
            .identity_key()
            .map_or_else(|_| label.clone(), |key| surface(&instance, &key));
        Report {
            type_name: instance.type_name().to_string(),
            name,
            identity_key,
            action,
            outcome,
            transitions,
        }
    }

    fn run(
        &self,
        instance: &ResourceInstance,
        label: &str,
        action: &Action,
        transitions: &mut Vec<ExecutionState>,
    ) -> Outcome {
        let Some(binding) = instance.provider() else {
            return Outcome::Failed {
                error: Error::Unresolved(label.to_string()),
            };
        };

        match guard::evaluate(label, action, instance.guards()) {
            Ok(GuardDecision::Run) => {}
            Ok(GuardDecision::Skip { reason }) => {
                log::debug!("{label}: skipped due to {reason}");
                return Outcome::Skipped { reason };
            }
            Err(error) => return Outcome::Failed { error },
        }

        if self.options.dry_run {
            log::info!("{label}: would run action {action} via {}", binding.provider_id());
            return Outcome::Skipped {
                reason: "dry run".to_string(),
            };
        }

        let properties = match instance.property_values() {
            Ok(properties) => properties,
            Err(error) => return Outcome::Failed { error },
        };

        transitions.push(ExecutionState::Converging);
        log::info!("{label}: {} -> {}", ExecutionState::Pending, ExecutionState::Converging);

        match binding.provider().perform(action, &properties) {
            Ok(mutation) => Outcome::Converged { mutation },
            Err(e) => Outcome::Failed {
                error: Error::ProviderRuntime {
                    type_name: instance.type_name().to_string(),
                    name: surface(instance, instance.name()),
                    action: action.to_string(),
                    message: surface(instance, &format!("{e:#}")),
                },
            },
        }
    }
}

/// Redact sensitive property values, then apply the type's transform
fn surface(instance: &ResourceInstance, text: &str) -> String {
    let redacted = redact(text, &instance.sensitive_values());
    match instance.spec().message_transform() {
        Some(transform) => transform(instance, &redacted),
        None => redacted,
    }
}

/// Execute one instance with default options and no event sink
pub fn execute(instance: ResourceInstance) -> Report {
    Executor::new(ExecuteOptions::default(), &mut NoEvents).execute(instance)
}

//! Guard evaluation
//!
//! Guards gate whether an action runs. The built-in `nothing` guard is
//! checked first and unconditionally; user guards follow in attachment
//! order and all must hold. Guard checks observe the system and must never
//! change it.

use crate::error::{Error, Result};
use crate::types::Action;
use std::fmt;
use std::sync::Arc;

/// A read-only check of current system state
pub type Check = Arc<dyn Fn() -> anyhow::Result<bool> + Send + Sync>;

/// Whether a guard requires its check to hold or to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Run only if the check holds
    OnlyIf,
    /// Skip if the check holds
    NotIf,
}

impl fmt::Display for GuardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnlyIf => f.write_str("only_if"),
            Self::NotIf => f.write_str("not_if"),
        }
    }
}

/// A predicate attached to a resource declaration
#[derive(Clone)]
pub struct Guard {
    kind: GuardKind,
    description: String,
    check: Check,
}

impl Guard {
    pub fn new<F>(kind: GuardKind, description: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self {
            kind,
            description: description.into(),
            check: Arc::new(check),
        }
    }

    pub fn only_if<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self::new(GuardKind::OnlyIf, description, check)
    }

    pub fn not_if<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self::new(GuardKind::NotIf, description, check)
    }

    pub fn kind(&self) -> GuardKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run the check and report whether the guard permits the action
    pub fn is_satisfied(&self) -> anyhow::Result<bool> {
        let holds = (self.check)()?;
        Ok(match self.kind {
            GuardKind::OnlyIf => holds,
            GuardKind::NotIf => !holds,
        })
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.description)
    }
}

/// Outcome of guard evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Run,
    Skip { reason: String },
}

/// Decide whether an action should run.
///
/// `resource` labels errors. Evaluation stops at the first guard that
/// rejects; later guards are never consulted.
pub fn evaluate(resource: &str, action: &Action, guards: &[Guard]) -> Result<GuardDecision> {
    if action.is_nothing() {
        return Ok(GuardDecision::Skip {
            reason: "action nothing".to_string(),
        });
    }

    for guard in guards {
        let satisfied = guard
            .is_satisfied()
            .map_err(|e| Error::GuardEvaluation {
                resource: resource.to_string(),
                guard: guard.to_string(),
                message: format!("{e:#}"),
            })?;

        log::debug!("{resource}: {guard} -> {}", if satisfied { "run" } else { "skip" });

        if !satisfied {
            return Ok(GuardDecision::Skip {
                reason: guard.to_string(),
            });
        }
    }

    Ok(GuardDecision::Run)
}

/// Boolean form of [`evaluate`]
pub fn should_run(resource: &str, action: &Action, guards: &[Guard]) -> Result<bool> {
    Ok(evaluate(resource, action, guards)? == GuardDecision::Run)
}

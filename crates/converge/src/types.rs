//! Core types shared by the registry, providers and executor

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A named operation a resource supports (`install`, `remove`, `run`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    /// The universal do-nothing action every type allows
    pub const NOTHING: &'static str = "nothing";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn nothing() -> Self {
        Self::new(Self::NOTHING)
    }

    pub fn is_nothing(&self) -> bool {
        self.0 == Self::NOTHING
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for Action {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What a provider did while performing an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Already in the desired state
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
}

impl Mutation {
    /// Whether the system was actually changed
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoChange => "up to date",
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        };
        f.write_str(label)
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Evaluate guards but never invoke providers
    pub dry_run: bool,
}

/// Summary of execution outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub updated: usize,
    pub up_to_date: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.updated + self.up_to_date + self.skipped + self.failed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Count one outcome
    pub fn add(&mut self, outcome: &crate::executor::Outcome) {
        use crate::executor::Outcome;

        match outcome {
            Outcome::Converged { mutation } if mutation.is_change() => self.updated += 1,
            Outcome::Converged { .. } => self.up_to_date += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }
}

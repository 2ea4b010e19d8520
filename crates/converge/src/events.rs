//! Execution progress callbacks

use crate::error::Error;
use crate::types::{Action, Mutation};

/// Implement this trait to receive progress updates during execution.
///
/// `resource` is the `type[name]` label of the instance.
pub trait ExecutionEvents {
    /// Called before guards are evaluated
    fn on_resource_start(&mut self, _resource: &str, _action: &Action) {}

    /// Guards rejected the action, or the run is a dry run
    fn on_skipped(&mut self, _resource: &str, _reason: &str) {}

    /// The provider changed the system
    fn on_updated(&mut self, _resource: &str, _mutation: &Mutation) {}

    /// The provider found nothing to change
    fn on_up_to_date(&mut self, _resource: &str) {}

    fn on_failed(&mut self, _resource: &str, _error: &Error) {}
}

/// No-op events (for tests or quiet runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl ExecutionEvents for NoEvents {}

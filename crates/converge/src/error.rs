//! Error types for resolution and execution.
//!
//! Every failure the engine can surface to a declarer or orchestrator is a
//! variant here. Nothing is retried or swallowed inside the engine; callers
//! decide what a failure means for the wider run.

use thiserror::Error;

/// Errors surfaced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A property value did not satisfy its constraint
    #[error("{resource}: property `{property}` rejected {value}: {reason}")]
    ConstraintViolation {
        /// Resource the value was assigned to (`type[name]`)
        resource: String,
        /// Property name
        property: String,
        /// Rendered offending value
        value: String,
        /// Why the constraint rejected it
        reason: String,
    },

    /// Property name is not declared on the resource type
    #[error("{resource}: no property named `{property}`")]
    UnknownProperty {
        /// Resource the lookup was made on
        resource: String,
        /// Property name
        property: String,
    },

    /// A required property was read without being set
    #[error("{resource}: property `{property}` is required")]
    RequiredProperty {
        /// Resource the read was made on
        resource: String,
        /// Property name
        property: String,
    },

    /// A deferred default read its own property while being computed
    #[error("{resource}: default for `{property}` depends on itself")]
    DeferredDefaultCycle {
        /// Resource the read was made on
        resource: String,
        /// Property whose default re-entered
        property: String,
    },

    /// No resource type registered under this name or synonym
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    /// The resource type does not allow this action
    #[error("{type_name} does not support action `{action}` (allowed: {allowed})")]
    UnknownAction {
        /// Resource type name
        type_name: String,
        /// Requested action
        action: String,
        /// Comma separated allowed actions
        allowed: String,
    },

    /// No provider binding applies to the platform
    #[error("no provider found for {type_name} on {facts}")]
    NoProviderFound {
        /// Resource type name
        type_name: String,
        /// Rendered platform facts
        facts: String,
    },

    /// Execution was requested for an instance that was never bound
    #[error("{0} has no resolved provider")]
    Unresolved(String),

    /// A guard's read-only check could not be evaluated
    #[error("{resource}: guard `{guard}` failed to evaluate: {message}")]
    GuardEvaluation {
        /// Resource the guard belongs to
        resource: String,
        /// Guard description
        guard: String,
        /// Underlying failure
        message: String,
    },

    /// The provider failed while performing an action
    #[error("{type_name}[{name}] action {action} failed: {message}")]
    ProviderRuntime {
        /// Resource type name
        type_name: String,
        /// Declared resource name
        name: String,
        /// Action being performed
        action: String,
        /// Underlying message, after redaction
        message: String,
    },

    /// A platform version requirement string could not be parsed
    #[error("invalid version requirement: {0}")]
    InvalidVersionRequirement(String),

    /// A synonym is already claimed by another type
    #[error("`{synonym}` already names {existing}")]
    DuplicateSynonym {
        /// The synonym being registered
        synonym: String,
        /// Canonical type that already owns it
        existing: String,
    },
}

impl Error {
    /// Whether the error arose before any action ran.
    ///
    /// Declaration and resolution errors must be surfaced before the run
    /// starts mutating the system.
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Self::ConstraintViolation { .. }
                | Self::UnknownProperty { .. }
                | Self::RequiredProperty { .. }
                | Self::DeferredDefaultCycle { .. }
                | Self::UnknownResourceType(_)
                | Self::UnknownAction { .. }
                | Self::NoProviderFound { .. }
                | Self::InvalidVersionRequirement(_)
                | Self::DuplicateSynonym { .. }
        )
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

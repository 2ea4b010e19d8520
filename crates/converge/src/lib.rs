//! Resource resolution and dispatch engine
//!
//! This crate provides the core of a convergent configuration tool:
//! - Typed property descriptors with validation, coercion and defaults
//! - A registry of resource types and their ordered provider bindings
//! - First-match provider resolution against platform facts
//! - Guard evaluation (`only_if`/`not_if`) and the action state machine
//!
//! How a provider changes the system, and how a run orders many resources,
//! is left to the caller.
//!
//! # Example
//!
//! ```ignore
//! use converge::{Applicability, PlatformFacts, PropertyDescriptor, Registry, ResourceTypeSpec};
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     ResourceTypeSpec::builder("pkg")
//!         .property(PropertyDescriptor::new("name").name_property().identity())
//!         .action("install")
//!         .provider(Arc::new(MyProvider), Applicability::any().os("linux"))
//!         .build(),
//! )?;
//!
//! let facts = PlatformFacts::from_pairs([("os", "linux")]);
//! let instance = registry.declare_resource("pkg", "curl", NO_SETTERS, None, vec![], &facts)?;
//! let report = converge::execute(instance);
//! ```

pub mod applicability;
pub mod error;
pub mod events;
pub mod executor;
pub mod facts;
pub mod guard;
pub mod instance;
pub mod property;
pub mod provider;
pub mod redact;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod value;

pub use applicability::{Applicability, FactMatcher, VersionRequirement};
pub use error::{Error, Result};
pub use events::{ExecutionEvents, NoEvents};
pub use executor::{ExecutionState, Executor, Outcome, Report, execute};
pub use facts::PlatformFacts;
pub use guard::{Guard, GuardDecision, GuardKind};
pub use instance::{PropertyValues, ResourceInstance};
pub use property::{Constraint, PropertyDefault, PropertyDescriptor};
pub use provider::{Provider, ProviderBinding};
pub use redact::{MessageTransform, SUPPRESSED, redact};
pub use registry::{Provides, Registry, ResourceTypeBuilder, ResourceTypeSpec};
pub use resolver::{Resolution, Resolver};
pub use types::{Action, ExecuteOptions, Mutation, RunSummary};
pub use value::{Value, ValueKind};

/// An empty property setter list for [`Registry::declare_resource`]
pub const NO_SETTERS: [(&str, Value); 0] = [];

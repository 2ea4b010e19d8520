//! Provider contract and bindings
//!
//! A provider is the platform-specific implementation behind a resource
//! type's actions. How it talks to the OS is its own business; the engine
//! only picks one and calls it.

use crate::applicability::Applicability;
use crate::instance::PropertyValues;
use crate::types::{Action, Mutation};
use anyhow::Result;
use std::fmt;
use std::sync::Arc;

/// Core trait for action implementations
///
/// # Example
///
/// ```ignore
/// use converge::{Action, Mutation, PropertyValues, Provider};
///
/// #[derive(Debug)]
/// struct Echo;
///
/// impl Provider for Echo {
///     fn id(&self) -> &str {
///         "echo"
///     }
///
///     fn perform(
///         &self,
///         action: &Action,
///         properties: &PropertyValues,
///     ) -> anyhow::Result<Mutation> {
///         println!("{action}: {:?}", properties.str("message"));
///         Ok(Mutation::NoChange)
///     }
/// }
/// ```
pub trait Provider: Send + Sync + fmt::Debug {
    /// Stable identifier, e.g. "package/apt"
    fn id(&self) -> &str;

    /// Perform `action` with the instance's resolved property values.
    ///
    /// Called only after guards allowed the action. Must report
    /// [`Mutation::NoChange`] when the system was already compliant.
    fn perform(&self, action: &Action, properties: &PropertyValues) -> Result<Mutation>;
}

/// A provider together with the platforms it applies to
#[derive(Clone)]
pub struct ProviderBinding {
    provider: Arc<dyn Provider>,
    applicability: Applicability,
}

impl ProviderBinding {
    pub fn new(provider: Arc<dyn Provider>, applicability: Applicability) -> Self {
        Self {
            provider,
            applicability,
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    pub fn applicability(&self) -> &Applicability {
        &self.applicability
    }
}

impl fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBinding")
            .field("provider", &self.provider.id())
            .field("applicability", &self.applicability)
            .finish()
    }
}

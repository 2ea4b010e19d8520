//! Resource instances
//!
//! An instance is one concrete declaration: a type, a declared name, the
//! explicitly assigned property values, the active action, guards and the
//! resolved provider. It is built up before execution and consumed by the
//! executor exactly once.

use crate::error::{Error, Result};
use crate::facts::PlatformFacts;
use crate::guard::Guard;
use crate::property::{PropertyDefault, PropertyDescriptor};
use crate::provider::ProviderBinding;
use crate::redact::SUPPRESSED;
use crate::registry::{Registry, ResourceTypeSpec};
use crate::types::Action;
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::ptr;
use std::sync::{Arc, OnceLock};

/// A property-bound resource declaration
pub struct ResourceInstance {
    spec: Arc<ResourceTypeSpec>,
    name: String,
    values: IndexMap<String, Value>,
    /// Per-instance cache for name fallbacks and deferred defaults
    lazy: IndexMap<String, OnceLock<Value>>,
    action: Action,
    guards: Vec<Guard>,
    provider: Option<ProviderBinding>,
}

impl ResourceInstance {
    pub fn new(spec: Arc<ResourceTypeSpec>, declared_name: impl Into<String>) -> Self {
        let lazy = spec
            .properties()
            .filter(|p| {
                p.is_name_property() || matches!(p.default(), PropertyDefault::Deferred(_))
            })
            .map(|p| (p.name().to_string(), OnceLock::new()))
            .collect();

        Self {
            action: spec.default_action(),
            spec,
            name: declared_name.into(),
            values: IndexMap::new(),
            lazy,
            guards: Vec::new(),
            provider: None,
        }
    }

    pub fn type_name(&self) -> &str {
        self.spec.name()
    }

    /// The declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &Arc<ResourceTypeSpec> {
        &self.spec
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn set_action(&mut self, action: impl Into<Action>) -> Result<()> {
        let action = action.into();
        if !self.spec.allows(&action) {
            let allowed: Vec<String> = self
                .spec
                .allowed_actions()
                .iter()
                .map(ToString::to_string)
                .collect();
            return Err(Error::UnknownAction {
                type_name: self.type_name().to_string(),
                action: action.to_string(),
                allowed: allowed.join(", "),
            });
        }
        self.action = action;
        Ok(())
    }

    /// Validate and store a property value
    pub fn set(&mut self, name: &str, raw: Value) -> Result<()> {
        let value = self.descriptor(name)?.validate(&self.to_string(), raw)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Current value of a property.
    ///
    /// Resolution order: explicit value, declared name (name properties),
    /// deferred default (computed once, then cached), literal default.
    /// A deferred default that reads its own property gets
    /// [`Error::DeferredDefaultCycle`] from that inner read.
    /// `Ok(None)` means unset; required properties error instead.
    pub fn get(&self, name: &str) -> Result<Option<&Value>> {
        let descriptor = self.descriptor(name)?;

        if let Some(value) = self.values.get(name) {
            return Ok(Some(value));
        }

        if descriptor.is_name_property()
            && let Some(cell) = self.lazy.get(name)
        {
            if let Some(value) = cell.get() {
                return Ok(Some(value));
            }
            let value = descriptor.validate(&self.to_string(), Value::from(self.name.as_str()))?;
            // A concurrent reader may have won; both computed the same value
            let _ = cell.set(value);
            return Ok(cell.get());
        }

        match descriptor.default() {
            PropertyDefault::Deferred(compute) => {
                if let Some(cell) = self.lazy.get(name) {
                    if let Some(value) = cell.get() {
                        return Ok(Some(value));
                    }
                    let value = {
                        let _active = Computing::enter(self, name)?;
                        compute(self)
                    };
                    // First computation wins; later ones are dropped
                    let _ = cell.set(value);
                    return Ok(cell.get());
                }
            }
            PropertyDefault::Literal(value) => return Ok(Some(value)),
            PropertyDefault::None => {}
        }

        if descriptor.is_required() {
            return Err(Error::RequiredProperty {
                resource: self.to_string(),
                property: name.to_string(),
            });
        }
        Ok(None)
    }

    /// Resolve name fallbacks and check required properties.
    ///
    /// Run once declaration is complete, so constraint and required errors
    /// surface before any guard or action runs.
    pub fn check_declared(&self) -> Result<()> {
        for descriptor in self.spec.properties() {
            if descriptor.is_name_property() || descriptor.is_required() {
                self.get(descriptor.name())?;
            }
        }
        Ok(())
    }

    /// Whether the property was explicitly assigned
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Forget an explicit value and any cached default
    pub fn reset(&mut self, name: &str) -> Result<()> {
        self.descriptor(name)?;
        self.values.shift_remove(name);
        if let Some(cell) = self.lazy.get_mut(name) {
            *cell = OnceLock::new();
        }
        Ok(())
    }

    /// Declaration-surface accessor: `None` reads, `Some` assigns.
    ///
    /// Returns the property's value after the call either way.
    pub fn property(&mut self, name: &str, value: Option<Value>) -> Result<Option<Value>> {
        if let Some(value) = value {
            self.set(name, value)?;
        }
        Ok(self.get(name)?.cloned())
    }

    pub fn add_guard(&mut self, guard: Guard) {
        self.guards.push(guard);
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    /// Resolve and remember the provider for the given platform
    pub fn bind(&mut self, registry: &Registry, facts: &PlatformFacts) -> Result<()> {
        let binding = registry.resolver().resolve(self.type_name(), facts)?;
        log::debug!("{} resource bound to {}", self.type_name(), binding.provider_id());
        self.provider = Some(binding.clone());
        Ok(())
    }

    pub fn provider(&self) -> Option<&ProviderBinding> {
        self.provider.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.provider.is_some()
    }

    /// Identity property values, in declaration order.
    ///
    /// Types with no identity properties are identified by declared name.
    pub fn identity(&self) -> Result<Vec<(String, Value)>> {
        let mut identity = Vec::new();
        for descriptor in self.spec.identity_properties() {
            if let Some(value) = self.get(descriptor.name())? {
                identity.push((descriptor.name().to_string(), value.clone()));
            }
        }
        if identity.is_empty() {
            identity.push(("name".to_string(), Value::from(self.name.as_str())));
        }
        Ok(identity)
    }

    /// Stable key naming the real-world entity, usable as a lock key.
    ///
    /// `type[value]` for a single identity value, `type[k=v,...]` otherwise.
    pub fn identity_key(&self) -> Result<String> {
        let identity = self.identity()?;
        let inner = match identity.as_slice() {
            [(_, value)] => plain(value),
            many => many
                .iter()
                .map(|(k, v)| format!("{k}={}", plain(v)))
                .collect::<Vec<_>>()
                .join(","),
        };
        Ok(format!("{}[{inner}]", self.type_name()))
    }

    /// Every readable property value, as handed to providers
    pub fn property_values(&self) -> Result<PropertyValues> {
        let mut values = IndexMap::new();
        for descriptor in self.spec.properties() {
            if let Some(value) = self.get(descriptor.name())? {
                values.insert(descriptor.name().to_string(), value.clone());
            }
        }
        Ok(PropertyValues(values))
    }

    /// Explicitly set desired-state properties, sensitive ones suppressed
    pub fn reportable_state(&self) -> IndexMap<String, Value> {
        self.spec
            .properties()
            .filter(|p| p.affects_desired_state())
            .filter_map(|p| {
                let value = self.values.get(p.name())?;
                let value = if p.is_sensitive() {
                    Value::from(SUPPRESSED)
                } else {
                    value.clone()
                };
                Some((p.name().to_string(), value))
            })
            .collect()
    }

    /// Rendered values of sensitive properties, for redaction
    pub fn sensitive_values(&self) -> Vec<String> {
        self.spec
            .properties()
            .filter(|p| p.is_sensitive())
            .filter_map(|p| self.get(p.name()).ok().flatten())
            .map(plain)
            .collect()
    }

    fn descriptor(&self, name: &str) -> Result<&PropertyDescriptor> {
        self.spec.property(name).ok_or_else(|| Error::UnknownProperty {
            resource: self.to_string(),
            property: name.to_string(),
        })
    }
}

thread_local! {
    /// Deferred defaults being computed on this thread, by instance address
    static COMPUTING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a deferred default as in progress until dropped
struct Computing((usize, String));

impl Computing {
    fn enter(instance: &ResourceInstance, property: &str) -> Result<Self> {
        let key = (ptr::from_ref(instance).addr(), property.to_string());
        COMPUTING.with_borrow_mut(|active| {
            if active.contains(&key) {
                return Err(Error::DeferredDefaultCycle {
                    resource: instance.to_string(),
                    property: property.to_string(),
                });
            }
            active.push(key.clone());
            Ok(Self(key))
        })
    }
}

impl Drop for Computing {
    fn drop(&mut self) {
        COMPUTING.with_borrow_mut(|active| active.retain(|key| key != &self.0));
    }
}

/// Strings unquoted, everything else as displayed
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.type_name(), self.name)
    }
}

impl fmt::Debug for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceInstance")
            .field("type", &self.type_name())
            .field("name", &self.name)
            .field("values", &self.values)
            .field("action", &self.action)
            .field("guards", &self.guards)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Resolved property values passed to a provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyValues(IndexMap<String, Value>);

impl PropertyValues {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_integer)
    }

    pub fn list(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_list)
    }

    pub fn map(&self, name: &str) -> Option<&IndexMap<String, Value>> {
        self.get(name).and_then(Value::as_map)
    }

    /// A string property the provider cannot work without
    pub fn require_str(&self, name: &str) -> anyhow::Result<&str> {
        self.str(name)
            .ok_or_else(|| anyhow::anyhow!("missing string property `{name}`"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for PropertyValues {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

//! Resource type registry
//!
//! Maps resource type names to their schema (property descriptors,
//! actions) and their ordered provider bindings. A registry is built
//! explicitly at startup; registering a name twice merges the second
//! declaration into the first.

use crate::applicability::Applicability;
use crate::error::{Error, Result};
use crate::facts::PlatformFacts;
use crate::guard::Guard;
use crate::instance::ResourceInstance;
use crate::property::PropertyDescriptor;
use crate::provider::{Provider, ProviderBinding};
use crate::redact::MessageTransform;
use crate::types::Action;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A `provides` declaration: this type can stand in for `type_name` on
/// platforms matching `applicability`
#[derive(Debug, Clone)]
pub struct Provides {
    type_name: String,
    applicability: Applicability,
}

impl Provides {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn applicability(&self) -> &Applicability {
        &self.applicability
    }
}

/// Schema of a resource type
#[derive(Clone)]
pub struct ResourceTypeSpec {
    name: String,
    also_known_as: Vec<String>,
    properties: IndexMap<String, PropertyDescriptor>,
    actions: Vec<Action>,
    default_action: Option<Action>,
    bindings: Vec<ProviderBinding>,
    provides: Vec<Provides>,
    message_transform: Option<MessageTransform>,
}

impl ResourceTypeSpec {
    pub fn builder(name: impl Into<String>) -> ResourceTypeBuilder {
        ResourceTypeBuilder {
            spec: Self {
                name: name.into(),
                also_known_as: Vec::new(),
                properties: IndexMap::new(),
                actions: Vec::new(),
                default_action: None,
                bindings: Vec::new(),
                provides: Vec::new(),
                message_transform: None,
            },
        }
    }

    /// Start a subtype: the parent's properties, actions, default action
    /// and message transform, under a new name.
    ///
    /// Bindings, synonyms and `provides` declarations are not inherited.
    pub fn derive(name: impl Into<String>, parent: &Self) -> ResourceTypeBuilder {
        let mut builder = Self::builder(name);
        builder.spec.properties = parent.properties.clone();
        builder.spec.actions = parent.actions.clone();
        builder.spec.default_action = parent.default_action.clone();
        builder.spec.message_transform = parent.message_transform.clone();
        builder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn synonyms(&self) -> &[String] {
        &self.also_known_as
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// Properties that make up the resource identity
    pub fn identity_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values().filter(|p| p.is_identity())
    }

    /// Declared actions plus the implicit `nothing`
    pub fn allowed_actions(&self) -> Vec<Action> {
        let mut actions = self.actions.clone();
        if !actions.iter().any(Action::is_nothing) {
            actions.push(Action::nothing());
        }
        actions
    }

    pub fn allows(&self, action: &Action) -> bool {
        action.is_nothing() || self.actions.contains(action)
    }

    /// Explicit default, else the first declared action, else `nothing`
    pub fn default_action(&self) -> Action {
        self.default_action
            .clone()
            .or_else(|| self.actions.first().cloned())
            .unwrap_or_else(Action::nothing)
    }

    /// Bindings declared directly on this type, in priority order
    pub fn bindings(&self) -> &[ProviderBinding] {
        &self.bindings
    }

    pub fn provides(&self) -> &[Provides] {
        &self.provides
    }

    pub fn message_transform(&self) -> Option<&MessageTransform> {
        self.message_transform.as_ref()
    }

    /// Fold a later registration of the same name into this one.
    ///
    /// Same-named properties are replaced in place, new ones appended.
    /// Bindings are appended after existing ones so a later registration
    /// never takes priority by accident.
    fn merge(&mut self, other: Self) {
        for (name, property) in other.properties {
            self.properties.insert(name, property);
        }
        for action in other.actions {
            if !self.actions.contains(&action) {
                self.actions.push(action);
            }
        }
        if other.default_action.is_some() {
            self.default_action = other.default_action;
        }
        for synonym in other.also_known_as {
            if !self.also_known_as.contains(&synonym) {
                self.also_known_as.push(synonym);
            }
        }
        self.bindings.extend(other.bindings);
        self.provides.extend(other.provides);
        if other.message_transform.is_some() {
            self.message_transform = other.message_transform;
        }
    }
}

impl fmt::Debug for ResourceTypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTypeSpec")
            .field("name", &self.name)
            .field("also_known_as", &self.also_known_as)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("actions", &self.actions)
            .field("default_action", &self.default_action())
            .field("bindings", &self.bindings)
            .field("provides", &self.provides)
            .finish_non_exhaustive()
    }
}

/// Builds a [`ResourceTypeSpec`]
pub struct ResourceTypeBuilder {
    spec: ResourceTypeSpec,
}

impl ResourceTypeBuilder {
    /// Add a property, replacing any inherited one of the same name
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.spec
            .properties
            .insert(property.name().to_string(), property);
        self
    }

    pub fn action(mut self, action: impl Into<Action>) -> Self {
        let action = action.into();
        if !self.spec.actions.contains(&action) {
            self.spec.actions.push(action);
        }
        self
    }

    pub fn actions<A: Into<Action>>(self, actions: impl IntoIterator<Item = A>) -> Self {
        actions
            .into_iter()
            .fold(self, |builder, action| builder.action(action))
    }

    pub fn default_action(mut self, action: impl Into<Action>) -> Self {
        let action = action.into();
        self = self.action(action.clone());
        self.spec.default_action = Some(action);
        self
    }

    pub fn also_known_as(mut self, synonym: impl Into<String>) -> Self {
        self.spec.also_known_as.push(synonym.into());
        self
    }

    /// Declare that this type can stand in for `type_name` where
    /// `applicability` holds
    pub fn provides(mut self, type_name: impl Into<String>, applicability: Applicability) -> Self {
        self.spec.provides.push(Provides {
            type_name: type_name.into(),
            applicability,
        });
        self
    }

    /// Append a provider binding
    pub fn provider(mut self, provider: Arc<dyn Provider>, applicability: Applicability) -> Self {
        self.spec
            .bindings
            .push(ProviderBinding::new(provider, applicability));
        self
    }

    /// Rewrite provider failure messages before they surface
    pub fn message_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&ResourceInstance, &str) -> String + Send + Sync + 'static,
    {
        self.spec.message_transform = Some(Arc::new(transform));
        self
    }

    pub fn build(self) -> ResourceTypeSpec {
        self.spec
    }
}

/// Registry of resource types
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: IndexMap<String, Arc<ResourceTypeSpec>>,
    synonyms: IndexMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a type, or merge it into an existing type of the same name
    pub fn register(&mut self, spec: ResourceTypeSpec) -> Result<()> {
        if let Some(owner) = self.synonyms.get(spec.name())
            && owner != spec.name()
        {
            return Err(Error::DuplicateSynonym {
                synonym: spec.name().to_string(),
                existing: owner.clone(),
            });
        }
        for synonym in spec.synonyms() {
            let owner = if self.types.contains_key(synonym) {
                Some(synonym.as_str())
            } else {
                self.synonyms.get(synonym).map(String::as_str)
            };
            if let Some(owner) = owner
                && owner != spec.name()
            {
                return Err(Error::DuplicateSynonym {
                    synonym: synonym.clone(),
                    existing: owner.to_string(),
                });
            }
        }

        for synonym in spec.synonyms() {
            self.synonyms
                .insert(synonym.clone(), spec.name().to_string());
        }

        match self.types.get_mut(spec.name()) {
            Some(existing) => {
                log::debug!("Merging registration into resource type {}", spec.name());
                Arc::make_mut(existing).merge(spec);
            }
            None => {
                log::debug!("Registered resource type {}", spec.name());
                self.types.insert(spec.name().to_string(), Arc::new(spec));
            }
        }
        Ok(())
    }

    /// Declaration-surface shorthand for registering a plain type
    pub fn define_resource_type<A: Into<Action>>(
        &mut self,
        name: &str,
        properties: impl IntoIterator<Item = PropertyDescriptor>,
        actions: impl IntoIterator<Item = A>,
        default_action: Option<Action>,
    ) -> Result<()> {
        let mut builder = properties
            .into_iter()
            .fold(ResourceTypeSpec::builder(name), ResourceTypeBuilder::property)
            .actions(actions);
        if let Some(action) = default_action {
            builder = builder.default_action(action);
        }
        self.register(builder.build())
    }

    /// Append a binding after the type's existing ones
    pub fn register_provider(
        &mut self,
        type_name: &str,
        applicability: Applicability,
        provider: Arc<dyn Provider>,
    ) -> Result<()> {
        let spec = self.spec_mut(type_name)?;
        spec.bindings
            .push(ProviderBinding::new(provider, applicability));
        Ok(())
    }

    /// Insert a binding ahead of every existing one
    pub fn register_provider_first(
        &mut self,
        type_name: &str,
        applicability: Applicability,
        provider: Arc<dyn Provider>,
    ) -> Result<()> {
        let spec = self.spec_mut(type_name)?;
        spec.bindings
            .insert(0, ProviderBinding::new(provider, applicability));
        Ok(())
    }

    /// Canonical type name for a type name or synonym
    pub fn resolve_synonym<'a>(&'a self, name: &'a str) -> Result<&'a str> {
        if self.types.contains_key(name) {
            return Ok(name);
        }
        self.synonyms
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownResourceType(name.to_string()))
    }

    /// Look up a type by name or synonym
    pub fn lookup(&self, name: &str) -> Result<&Arc<ResourceTypeSpec>> {
        let canonical = self.resolve_synonym(name)?;
        self.types
            .get(canonical)
            .ok_or_else(|| Error::UnknownResourceType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve_synonym(name).is_ok()
    }

    /// Registered types in registration order
    pub fn types(&self) -> impl Iterator<Item = &Arc<ResourceTypeSpec>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Create an unbound instance with the type's default action
    pub fn declare(&self, type_name: &str, declared_name: &str) -> Result<ResourceInstance> {
        let spec = Arc::clone(self.lookup(type_name)?);
        Ok(ResourceInstance::new(spec, declared_name))
    }

    /// Declare, assign properties, attach guards and resolve a provider.
    ///
    /// Name fallbacks are validated and required properties checked here,
    /// so any failure happens before anything executes.
    pub fn declare_resource<S: AsRef<str>>(
        &self,
        type_name: &str,
        declared_name: &str,
        setters: impl IntoIterator<Item = (S, Value)>,
        action: Option<Action>,
        guards: Vec<Guard>,
        facts: &PlatformFacts,
    ) -> Result<ResourceInstance> {
        let mut instance = self.declare(type_name, declared_name)?;
        for (name, value) in setters {
            instance.set(name.as_ref(), value)?;
        }
        if let Some(action) = action {
            instance.set_action(action)?;
        }
        for guard in guards {
            instance.add_guard(guard);
        }
        instance.check_declared()?;
        instance.bind(self, facts)?;
        Ok(instance)
    }

    fn spec_mut(&mut self, name: &str) -> Result<&mut ResourceTypeSpec> {
        let canonical = self.resolve_synonym(name)?.to_string();
        self.types
            .get_mut(&canonical)
            .map(Arc::make_mut)
            .ok_or(Error::UnknownResourceType(canonical))
    }
}

//! Property descriptors
//!
//! A descriptor declares one attribute of a resource type: which values it
//! accepts, how it defaults, and what role it plays (name fallback,
//! identity, desired state). Descriptors are immutable once a type is
//! registered; per-instance state such as cached deferred defaults lives on
//! [`ResourceInstance`](crate::instance::ResourceInstance).

use crate::error::{Error, Result};
use crate::instance::ResourceInstance;
use crate::value::{Value, ValueKind};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Computes a default value for one resource instance.
///
/// Called at most once per instance, on first read.
pub type DeferredDefault = Arc<dyn Fn(&ResourceInstance) -> Value + Send + Sync>;

/// Canonicalises a raw value before validation.
pub type Coercion = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Which values a property accepts
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Anything
    Any,
    /// Values of one shape
    Kind(ValueKind),
    /// Exactly one of the listed values
    OneOf(Vec<Value>),
    /// Strings matching a pattern
    Pattern(Regex),
    /// At least one of the nested constraints
    AnyOf(Vec<Constraint>),
}

impl Constraint {
    /// Check a value, returning the rejection reason on failure
    pub fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            Self::Any => Ok(()),
            Self::Kind(kind) => {
                if value.kind() == *kind {
                    Ok(())
                } else {
                    Err(format!("expected {kind}, got {}", value.kind()))
                }
            }
            Self::OneOf(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err(format!("must be one of {}", Value::List(allowed.clone())))
                }
            }
            Self::Pattern(re) => match value.as_str() {
                Some(s) if re.is_match(s) => Ok(()),
                Some(_) => Err(format!("must match /{}/", re.as_str())),
                None => Err(format!("expected string, got {}", value.kind())),
            },
            Self::AnyOf(options) => {
                if options.iter().any(|c| c.check(value).is_ok()) {
                    Ok(())
                } else {
                    Err(format!("must be {self}"))
                }
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Kind(kind) => write!(f, "{kind}"),
            Self::OneOf(allowed) => write!(f, "one of {}", Value::List(allowed.clone())),
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
            Self::AnyOf(options) => {
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{option}")?;
                }
                Ok(())
            }
        }
    }
}

/// How an unset property gets its value
#[derive(Clone)]
pub enum PropertyDefault {
    /// No default; reads of an unset value yield nothing
    None,
    /// A fixed value shared by every instance
    Literal(Value),
    /// Computed once per instance at first read
    Deferred(DeferredDefault),
}

impl fmt::Debug for PropertyDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Declaration of a single resource property
#[derive(Clone)]
pub struct PropertyDescriptor {
    name: String,
    constraint: Constraint,
    default: PropertyDefault,
    name_property: bool,
    identity: bool,
    desired_state: bool,
    required: bool,
    sensitive: bool,
    coerce: Option<Coercion>,
}

impl PropertyDescriptor {
    /// A property that accepts anything and has no default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: Constraint::Any,
            default: PropertyDefault::None,
            name_property: false,
            identity: false,
            desired_state: true,
            required: false,
            sensitive: false,
            coerce: None,
        }
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Shorthand for `constraint(Constraint::Kind(kind))`
    pub fn kind(self, kind: ValueKind) -> Self {
        self.constraint(Constraint::Kind(kind))
    }

    /// Shorthand for a set of allowed values
    pub fn one_of<V: Into<Value>>(self, allowed: impl IntoIterator<Item = V>) -> Self {
        self.constraint(Constraint::OneOf(
            allowed.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = PropertyDefault::Literal(value.into());
        self
    }

    /// Default computed per instance on first read.
    ///
    /// The closure may read other properties of the instance. Reading this
    /// same property again, directly or through another deferred default,
    /// makes that inner read fail with [`Error::DeferredDefaultCycle`].
    ///
    /// [`Error::DeferredDefaultCycle`]: crate::Error::DeferredDefaultCycle
    pub fn deferred_default<F>(mut self, compute: F) -> Self
    where
        F: Fn(&ResourceInstance) -> Value + Send + Sync + 'static,
    {
        self.default = PropertyDefault::Deferred(Arc::new(compute));
        self
    }

    /// Fill from the resource's declared name when unset
    pub fn name_property(mut self) -> Self {
        self.name_property = true;
        self
    }

    /// Part of the resource identity
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Configures behaviour only; excluded from desired-state reporting
    pub fn not_desired_state(mut self) -> Self {
        self.desired_state = false;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Suppress the value in reports and failure messages
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn coerce<F>(mut self, coerce: F) -> Self
    where
        F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.coerce = Some(Arc::new(coerce));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_constraint(&self) -> &Constraint {
        &self.constraint
    }

    pub fn default(&self) -> &PropertyDefault {
        &self.default
    }

    pub fn is_name_property(&self) -> bool {
        self.name_property
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn affects_desired_state(&self) -> bool {
        self.desired_state
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Coerce then validate a raw value.
    ///
    /// `resource` labels the error (`type[name]`).
    pub fn validate(&self, resource: &str, raw: Value) -> Result<Value> {
        let value = match &self.coerce {
            Some(coerce) => {
                coerce(raw.clone()).map_err(|reason| self.violation(resource, &raw, reason))?
            }
            None => raw,
        };

        self.constraint
            .check(&value)
            .map_err(|reason| self.violation(resource, &value, reason))?;

        Ok(value)
    }

    fn violation(&self, resource: &str, value: &Value, reason: String) -> Error {
        let rendered = if self.sensitive {
            crate::redact::SUPPRESSED.to_string()
        } else {
            value.to_string()
        };
        Error::ConstraintViolation {
            resource: resource.to_string(),
            property: self.name.clone(),
            value: rendered,
            reason,
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("constraint", &self.constraint)
            .field("default", &self.default)
            .field("name_property", &self.name_property)
            .field("identity", &self.identity)
            .field("desired_state", &self.desired_state)
            .field("required", &self.required)
            .field("sensitive", &self.sensitive)
            .finish_non_exhaustive()
    }
}

//! Platform facts consumed by provider resolution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const OS: &str = "os";
pub const PLATFORM: &str = "platform";
pub const PLATFORM_FAMILY: &str = "platform_family";
pub const PLATFORM_VERSION: &str = "platform_version";

/// An immutable set of facts about the running platform.
///
/// Keys are fact names such as `os`, `platform_family` and
/// `platform_version`. Iteration order is sorted by key so rendering and
/// resolution never depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformFacts {
    facts: BTreeMap<String, String>,
}

impl PlatformFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` pairs; later pairs win
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            facts: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Return a copy with one fact added or replaced
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.insert(name.into(), value.into());
        self
    }

    /// Return a copy with `overrides` laid over these facts
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut facts = self.facts.clone();
        facts.extend(
            overrides
                .facts
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Self { facts }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.facts.get(name).map(String::as_str)
    }

    pub fn os(&self) -> Option<&str> {
        self.get(OS)
    }

    pub fn platform(&self) -> Option<&str> {
        self.get(PLATFORM)
    }

    pub fn platform_family(&self) -> Option<&str> {
        self.get(PLATFORM_FAMILY)
    }

    pub fn platform_version(&self) -> Option<&str> {
        self.get(PLATFORM_VERSION)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl fmt::Display for PlatformFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.facts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

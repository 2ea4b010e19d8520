//! Applicability predicates for provider bindings
//!
//! The common case is data: per-fact allow/deny lists and platform version
//! requirements, all of which must hold. Cases the data form cannot express
//! go through an optional predicate function. Evaluation is pure; the same
//! facts always give the same answer.

use crate::error::{Error, Result};
use crate::facts::{PLATFORM_FAMILY, PLATFORM_VERSION, PlatformFacts};
use indexmap::IndexMap;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Escape hatch for conditions equality can't express
pub type Predicate = Arc<dyn Fn(&PlatformFacts) -> bool + Send + Sync>;

/// Platform family groups accepted in `platform_family` filters
const FAMILY_GROUPS: &[(&str, &[&str])] = &[
    ("rpm_based", &["rhel", "fedora", "amazon", "suse"]),
    ("redhat_based", &["rhel", "fedora", "amazon"]),
    ("fedora_derived", &["rhel", "fedora", "amazon"]),
    ("bsd_based", &["freebsd", "openbsd", "netbsd", "dragonflybsd"]),
    ("solaris_based", &["solaris2", "smartos", "omnios", "openindiana"]),
];

static REQUIREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(~>|>=|<=|!=|=|>|<)?\s*(\d+(?:\.\d+)*)\s*$")
        .expect("version requirement pattern is valid")
});

/// Allow/deny list for one fact.
///
/// Values prefixed with `!` deny. With no allow entries, anything not
/// denied matches; `all` allows any value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactMatcher {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl FactMatcher {
    pub fn new<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        let mut allow = Vec::new();
        let mut deny = Vec::new();
        for value in values {
            let value = value.into();
            match value.strip_prefix('!') {
                Some(denied) => deny.push(denied.to_string()),
                None => allow.push(value),
            }
        }
        Self { allow, deny }
    }

    /// Whether `value` of fact `fact` passes this matcher
    pub fn matches(&self, fact: &str, value: Option<&str>) -> bool {
        let hit = |filter: &str| match value {
            Some(v) => filter == v || (fact == PLATFORM_FAMILY && in_family_group(filter, v)),
            None => false,
        };

        if self.deny.iter().any(|d| hit(d)) {
            return false;
        }

        self.allow.is_empty() || self.allow.iter().any(|a| a == "all" || hit(a))
    }
}

impl From<&str> for FactMatcher {
    fn from(value: &str) -> Self {
        Self::new([value])
    }
}

impl From<String> for FactMatcher {
    fn from(value: String) -> Self {
        Self::new([value])
    }
}

impl From<Vec<&str>> for FactMatcher {
    fn from(values: Vec<&str>) -> Self {
        Self::new(values)
    }
}

impl<const N: usize> From<[&str; N]> for FactMatcher {
    fn from(values: [&str; N]) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for FactMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .allow
            .iter()
            .cloned()
            .chain(self.deny.iter().map(|d| format!("!{d}")))
            .collect();
        f.write_str(&parts.join("|"))
    }
}

fn in_family_group(group: &str, family: &str) -> bool {
    FAMILY_GROUPS
        .iter()
        .any(|(name, members)| *name == group && members.contains(&family))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VersionOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Pessimistic,
}

impl VersionOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Pessimistic => "~>",
        }
    }
}

/// A platform version requirement such as `>= 8, < 9` or `~> 5.10`.
///
/// Comma separated clauses must all hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    clauses: Vec<(VersionOp, Vec<u64>)>,
}

impl VersionRequirement {
    pub fn parse(requirement: &str) -> Result<Self> {
        let mut clauses = Vec::new();
        for clause in requirement.split(',') {
            let caps = REQUIREMENT
                .captures(clause)
                .ok_or_else(|| Error::InvalidVersionRequirement(requirement.to_string()))?;
            let op = match caps.get(1).map(|m| m.as_str()) {
                None | Some("=") => VersionOp::Eq,
                Some("!=") => VersionOp::Ne,
                Some(">") => VersionOp::Gt,
                Some(">=") => VersionOp::Ge,
                Some("<") => VersionOp::Lt,
                Some("<=") => VersionOp::Le,
                Some(_) => VersionOp::Pessimistic,
            };
            let version = parse_version(&caps[2])
                .ok_or_else(|| Error::InvalidVersionRequirement(requirement.to_string()))?;
            clauses.push((op, version));
        }
        Ok(Self { clauses })
    }

    /// Whether a version string satisfies every clause.
    ///
    /// Versions that don't parse never satisfy a requirement.
    pub fn satisfied_by(&self, version: &str) -> bool {
        let Some(actual) = parse_version(version) else {
            return false;
        };
        self.clauses.iter().all(|(op, wanted)| {
            let ord = compare_versions(&actual, wanted);
            match op {
                VersionOp::Eq => ord == Ordering::Equal,
                VersionOp::Ne => ord != Ordering::Equal,
                VersionOp::Gt => ord == Ordering::Greater,
                VersionOp::Ge => ord != Ordering::Less,
                VersionOp::Lt => ord == Ordering::Less,
                VersionOp::Le => ord != Ordering::Greater,
                VersionOp::Pessimistic => {
                    let ceiling = pessimistic_ceiling(wanted);
                    ord != Ordering::Less && compare_versions(&actual, &ceiling) == Ordering::Less
                }
            }
        })
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|(op, v)| {
                let dotted: Vec<String> = v.iter().map(u64::to_string).collect();
                format!("{} {}", op.symbol(), dotted.join("."))
            })
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Leading numeric segments of a dotted version (`"22.04"` → `[22, 4]`)
fn parse_version(version: &str) -> Option<Vec<u64>> {
    let segments: Vec<u64> = version
        .trim()
        .split('.')
        .map_while(|segment| {
            let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect();
    if segments.is_empty() { None } else { Some(segments) }
}

fn compare_versions(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Upper bound for `~>`: drop the last segment and bump the one before it.
///
/// A single segment is bumped in place, so `~> 5` means `>= 5, < 6`.
fn pessimistic_ceiling(version: &[u64]) -> Vec<u64> {
    let mut ceiling = match version {
        [] => return vec![u64::MAX],
        [only] => vec![*only],
        [kept @ .., _] => kept.to_vec(),
    };
    if let Some(last) = ceiling.last_mut() {
        *last = last.saturating_add(1);
    }
    ceiling
}

/// When a provider binding applies.
///
/// All fact matchers, at least one version requirement (when any are
/// given) and the predicate (when set) must hold.
#[derive(Clone, Default)]
pub struct Applicability {
    facts: IndexMap<String, FactMatcher>,
    versions: Vec<VersionRequirement>,
    predicate: Option<Predicate>,
}

impl Applicability {
    /// Applies everywhere
    pub fn any() -> Self {
        Self::default()
    }

    /// Constrain an arbitrary fact
    pub fn fact(mut self, name: impl Into<String>, matcher: impl Into<FactMatcher>) -> Self {
        self.facts.insert(name.into(), matcher.into());
        self
    }

    pub fn os(self, matcher: impl Into<FactMatcher>) -> Self {
        self.fact(crate::facts::OS, matcher)
    }

    pub fn platform(self, matcher: impl Into<FactMatcher>) -> Self {
        self.fact(crate::facts::PLATFORM, matcher)
    }

    pub fn platform_family(self, matcher: impl Into<FactMatcher>) -> Self {
        self.fact(PLATFORM_FAMILY, matcher)
    }

    /// Add a version requirement; several requirements are alternatives
    pub fn platform_version(mut self, requirement: VersionRequirement) -> Self {
        self.versions.push(requirement);
        self
    }

    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlatformFacts) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn applies(&self, facts: &PlatformFacts) -> bool {
        let facts_match = self
            .facts
            .iter()
            .all(|(name, matcher)| matcher.matches(name, facts.get(name)));
        if !facts_match {
            return false;
        }

        if !self.versions.is_empty() {
            let Some(version) = facts.get(PLATFORM_VERSION) else {
                return false;
            };
            if !self.versions.iter().any(|req| req.satisfied_by(version)) {
                return false;
            }
        }

        self.predicate.as_ref().is_none_or(|predicate| predicate(facts))
    }

    /// Same data constraints and no predicate on either side.
    ///
    /// Predicates are opaque, so two bindings using one are never reported
    /// as masking each other.
    pub fn same_constraints(&self, other: &Self) -> bool {
        self.predicate.is_none()
            && other.predicate.is_none()
            && self.facts == other.facts
            && self.versions == other.versions
    }

    pub fn is_unconstrained(&self) -> bool {
        self.facts.is_empty() && self.versions.is_empty() && self.predicate.is_none()
    }
}

impl fmt::Debug for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Applicability({self})")
    }
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unconstrained() {
            return f.write_str("any platform");
        }
        let mut parts: Vec<String> = self
            .facts
            .iter()
            .map(|(name, matcher)| format!("{name}={matcher}"))
            .collect();
        if !self.versions.is_empty() {
            let versions: Vec<String> = self.versions.iter().map(ToString::to_string).collect();
            parts.push(format!("platform_version {}", versions.join(" | ")));
        }
        if self.predicate.is_some() {
            parts.push("<predicate>".to_string());
        }
        f.write_str(&parts.join(", "))
    }
}

//! Provider resolution
//!
//! First match wins: candidate bindings are evaluated in declaration order
//! and the first applicable one is returned. There is no specificity
//! ranking; registrations must be ordered most-specific-first.
//!
//! Candidates are the type's own bindings followed by the bindings of every
//! type that declares `provides` for it (in registration order), the latter
//! only where the `provides` applicability holds.

use crate::error::{Error, Result};
use crate::facts::PlatformFacts;
use crate::provider::ProviderBinding;
use crate::registry::{Registry, ResourceTypeSpec};

/// The winning binding plus any later bindings it masks
#[derive(Debug)]
pub struct Resolution<'a> {
    pub binding: &'a ProviderBinding,
    /// Later applicable bindings with the winner's exact constraints
    pub masked: Vec<&'a ProviderBinding>,
}

/// Resolves providers against a registry
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a Registry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// First applicable binding for `type_name` on `facts`
    pub fn resolve(&self, type_name: &str, facts: &PlatformFacts) -> Result<&'a ProviderBinding> {
        let spec = self.registry.lookup(type_name)?;
        self.candidates(spec, facts)
            .into_iter()
            .find(|binding| applies(spec.name(), binding, facts))
            .ok_or_else(|| no_provider(type_name, facts))
    }

    /// Like [`resolve`](Self::resolve), also reporting masked bindings.
    ///
    /// A masked binding would have matched but can never win because an
    /// earlier binding carries identical constraints. Each is logged as a
    /// warning.
    pub fn resolve_detailed(
        &self,
        type_name: &str,
        facts: &PlatformFacts,
    ) -> Result<Resolution<'a>> {
        let spec = self.registry.lookup(type_name)?;
        let mut applicable = self
            .candidates(spec, facts)
            .into_iter()
            .filter(|binding| applies(spec.name(), binding, facts));

        let binding = applicable
            .next()
            .ok_or_else(|| no_provider(type_name, facts))?;

        let masked: Vec<&ProviderBinding> = applicable
            .filter(|later| {
                later
                    .applicability()
                    .same_constraints(binding.applicability())
            })
            .collect();

        for later in &masked {
            log::warn!(
                "{}: provider {} is masked by {} ({})",
                spec.name(),
                later.provider_id(),
                binding.provider_id(),
                binding.applicability()
            );
        }

        Ok(Resolution { binding, masked })
    }

    /// Every applicable binding, in priority order
    pub fn resolve_all(
        &self,
        type_name: &str,
        facts: &PlatformFacts,
    ) -> Result<Vec<&'a ProviderBinding>> {
        let spec = self.registry.lookup(type_name)?;
        Ok(self
            .candidates(spec, facts)
            .into_iter()
            .filter(|binding| applies(spec.name(), binding, facts))
            .collect())
    }

    /// Own bindings, then bindings contributed through `provides`
    fn candidates(
        &self,
        spec: &'a ResourceTypeSpec,
        facts: &PlatformFacts,
    ) -> Vec<&'a ProviderBinding> {
        let mut candidates: Vec<&ProviderBinding> = spec.bindings().iter().collect();

        for other in self.registry.types() {
            if other.name() == spec.name() {
                continue;
            }
            let contributes = other.provides().iter().any(|provides| {
                self.registry
                    .resolve_synonym(provides.type_name())
                    .is_ok_and(|canonical| canonical == spec.name())
                    && provides.applicability().applies(facts)
            });
            if contributes {
                log::trace!("{} contributes bindings to {}", other.name(), spec.name());
                candidates.extend(other.bindings());
            }
        }

        candidates
    }
}

impl Registry {
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self)
    }
}

fn applies(type_name: &str, binding: &ProviderBinding, facts: &PlatformFacts) -> bool {
    let applies = binding.applicability().applies(facts);
    log::debug!(
        "{type_name}: {} ({}) {}",
        binding.provider_id(),
        binding.applicability(),
        if applies { "applies" } else { "does not apply" }
    );
    applies
}

fn no_provider(type_name: &str, facts: &PlatformFacts) -> Error {
    Error::NoProviderFound {
        type_name: type_name.to_string(),
        facts: facts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicability::{Applicability, VersionRequirement};
    use crate::instance::PropertyValues;
    use crate::provider::Provider;
    use crate::types::{Action, Mutation};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Provider for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn perform(
            &self,
            _action: &Action,
            _properties: &PropertyValues,
        ) -> anyhow::Result<Mutation> {
            Ok(Mutation::NoChange)
        }
    }

    fn facts(pairs: &[(&str, &str)]) -> PlatformFacts {
        PlatformFacts::from_pairs(pairs.iter().copied())
    }

    fn solaris_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(
                ResourceTypeSpec::builder("package")
                    .provider(Arc::new(Named("solaris")), Applicability::any().os("solaris2"))
                    .provider(
                        Arc::new(Named("nexenta")),
                        Applicability::any()
                            .os("solaris2")
                            .platform_family("nexentacore"),
                    )
                    .build(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_first_match_beats_specificity() {
        let registry = solaris_registry();
        let f = facts(&[("os", "solaris2"), ("platform_family", "nexentacore")]);
        assert_eq!(registry.resolver().resolve("package", &f).unwrap().provider_id(), "solaris");
    }

    #[test]
    fn test_no_provider_found() {
        let registry = solaris_registry();
        let err = registry
            .resolver()
            .resolve("package", &facts(&[("os", "linuxB")]))
            .unwrap_err();
        assert_eq!(
            err,
            Error::NoProviderFound {
                type_name: "package".into(),
                facts: "{os: linuxB}".into(),
            }
        );
    }

    #[test]
    fn test_unknown_type() {
        let registry = Registry::new();
        assert!(matches!(
            registry.resolver().resolve("pkg", &PlatformFacts::new()),
            Err(Error::UnknownResourceType(_))
        ));
    }

    #[test]
    fn test_resolve_all_in_order() {
        let registry = solaris_registry();
        let f = facts(&[("os", "solaris2"), ("platform_family", "nexentacore")]);
        let ids: Vec<&str> = registry
            .resolver()
            .resolve_all("package", &f)
            .unwrap()
            .into_iter()
            .map(ProviderBinding::provider_id)
            .collect();
        assert_eq!(ids, ["solaris", "nexenta"]);
    }

    #[test]
    fn test_masked_binding_reported() {
        let mut registry = Registry::new();
        registry
            .register(
                ResourceTypeSpec::builder("service")
                    .provider(Arc::new(Named("systemd")), Applicability::any().os("linux"))
                    .provider(Arc::new(Named("upstart")), Applicability::any().os("linux"))
                    .provider(Arc::new(Named("generic")), Applicability::any())
                    .build(),
            )
            .unwrap();

        let resolution = registry
            .resolver()
            .resolve_detailed("service", &facts(&[("os", "linux")]))
            .unwrap();
        assert_eq!(resolution.binding.provider_id(), "systemd");
        let masked: Vec<&str> = resolution
            .masked
            .iter()
            .map(|b| b.provider_id())
            .collect();
        assert_eq!(masked, ["upstart"]);
    }

    #[test]
    fn test_provides_contributes_after_own_bindings() {
        let mut registry = Registry::new();
        registry
            .register(
                ResourceTypeSpec::builder("package")
                    .provider(Arc::new(Named("generic")), Applicability::any().os("aix"))
                    .build(),
            )
            .unwrap();
        registry
            .register(
                ResourceTypeSpec::builder("apt_package")
                    .provides("package", Applicability::any().platform_family("debian"))
                    .provider(Arc::new(Named("apt")), Applicability::any())
                    .build(),
            )
            .unwrap();
        registry
            .register(
                ResourceTypeSpec::builder("dnf_package")
                    .provides("package", Applicability::any().platform_family("rpm_based"))
                    .provider(Arc::new(Named("dnf")), Applicability::any())
                    .build(),
            )
            .unwrap();

        let resolver = registry.resolver();
        let debian = facts(&[("os", "linux"), ("platform_family", "debian")]);
        assert_eq!(resolver.resolve("package", &debian).unwrap().provider_id(), "apt");

        let fedora = facts(&[("os", "linux"), ("platform_family", "fedora")]);
        assert_eq!(resolver.resolve("package", &fedora).unwrap().provider_id(), "dnf");

        // Own bindings come first
        let aix = facts(&[("os", "aix"), ("platform_family", "debian")]);
        assert_eq!(resolver.resolve("package", &aix).unwrap().provider_id(), "generic");

        // The subtype still resolves directly
        assert_eq!(
            resolver.resolve("apt_package", &fedora).unwrap().provider_id(),
            "apt"
        );
    }

    #[test]
    fn test_version_predicate_escape_hatch() {
        let mut registry = Registry::new();
        registry
            .register(
                ResourceTypeSpec::builder("package")
                    .provider(
                        Arc::new(Named("ips")),
                        Applicability::any()
                            .os("solaris2")
                            .platform_version(VersionRequirement::parse("> 5.10").unwrap()),
                    )
                    .provider(
                        Arc::new(Named("sysv")),
                        Applicability::any().os("solaris2").when(|f| {
                            f.platform_version().is_some_and(|v| v.starts_with("5."))
                        }),
                    )
                    .build(),
            )
            .unwrap();

        let resolver = registry.resolver();
        let new = facts(&[("os", "solaris2"), ("platform_version", "5.11")]);
        let old = facts(&[("os", "solaris2"), ("platform_version", "5.10")]);
        assert_eq!(resolver.resolve("package", &new).unwrap().provider_id(), "ips");
        assert_eq!(resolver.resolve("package", &old).unwrap().provider_id(), "sysv");
    }
}

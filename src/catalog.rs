//! Built-in resource types
//!
//! The generic `package` type has no providers of its own. Each
//! platform-specific package type inherits its schema and declares where
//! it can stand in for `package`, so `package[curl]` resolves to apt on
//! Debian, dnf on Fedora and so on.

use anyhow::Result;
use converge::{
    Applicability, Constraint, PropertyDescriptor, Provider, Registry, ResourceInstance,
    ResourceTypeSpec, Value, ValueKind, VersionRequirement, redact,
};
use regex::Regex;
use std::sync::Arc;

use crate::providers::{
    DirectoryProvider, ExecuteProvider, FileProvider, LogProvider, PackageManager,
    PackageProvider,
};
use crate::runner::CommandRunner;

/// Registry with every built-in type and provider
pub fn builtin(runner: &Arc<dyn CommandRunner>) -> Result<Registry> {
    let mut registry = Registry::new();

    registry.register(file_type()?)?;
    registry.register(directory_type()?)?;
    registry.register(execute_type(runner))?;
    registry.register(log_type())?;

    let package = package_type();
    let platform_packages = package_providers(&package, runner)?;
    registry.register(package)?;
    for spec in platform_packages {
        registry.register(spec)?;
    }

    Ok(registry)
}

fn mode_property() -> Result<PropertyDescriptor> {
    Ok(PropertyDescriptor::new("mode")
        .coerce(|value| match value {
            // mode = 644 means the octal digits 644
            Value::Integer(digits) => Ok(Value::String(digits.to_string())),
            other => Ok(other),
        })
        .constraint(Constraint::Pattern(Regex::new("^[0-7]{3,4}$")?)))
}

fn path_property() -> PropertyDescriptor {
    PropertyDescriptor::new("path")
        .kind(ValueKind::String)
        .name_property()
        .identity()
}

fn file_type() -> Result<ResourceTypeSpec> {
    Ok(ResourceTypeSpec::builder("file")
        .property(path_property())
        .property(PropertyDescriptor::new("content").kind(ValueKind::String))
        .property(mode_property()?)
        .actions(["create", "delete", "touch"])
        .provider(Arc::new(FileProvider), Applicability::any())
        .build())
}

fn directory_type() -> Result<ResourceTypeSpec> {
    Ok(ResourceTypeSpec::builder("directory")
        .property(path_property())
        .property(
            PropertyDescriptor::new("recursive")
                .kind(ValueKind::Boolean)
                .default_value(false)
                .not_desired_state(),
        )
        .property(mode_property()?)
        .actions(["create", "delete"])
        .provider(Arc::new(DirectoryProvider), Applicability::any())
        .build())
}

fn execute_type(runner: &Arc<dyn CommandRunner>) -> ResourceTypeSpec {
    ResourceTypeSpec::builder("execute")
        .property(
            PropertyDescriptor::new("command")
                .kind(ValueKind::String)
                .name_property()
                .identity(),
        )
        .property(PropertyDescriptor::new("cwd").kind(ValueKind::String))
        .property(
            PropertyDescriptor::new("environment")
                .kind(ValueKind::Map)
                .deferred_default(|_| Value::empty_map()),
        )
        .property(PropertyDescriptor::new("creates").kind(ValueKind::String))
        .property(
            PropertyDescriptor::new("sensitive")
                .kind(ValueKind::Boolean)
                .default_value(false)
                .not_desired_state(),
        )
        .action("run")
        .message_transform(redact_sensitive_command)
        .provider(
            Arc::new(ExecuteProvider::new(Arc::clone(runner))),
            Applicability::any().os("!windows"),
        )
        .build()
}

/// Hide the command line of an execute resource marked sensitive
fn redact_sensitive_command(instance: &ResourceInstance, message: &str) -> String {
    let sensitive = instance
        .get("sensitive")
        .ok()
        .flatten()
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let command = instance
        .get("command")
        .ok()
        .flatten()
        .and_then(Value::as_str)
        .map(String::from);

    match command {
        Some(command) if sensitive => redact(message, &[command]),
        _ => message.to_string(),
    }
}

fn log_type() -> ResourceTypeSpec {
    ResourceTypeSpec::builder("log")
        .property(
            PropertyDescriptor::new("message")
                .kind(ValueKind::String)
                .name_property(),
        )
        .property(
            PropertyDescriptor::new("level")
                .one_of(["debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .action("write")
        .provider(Arc::new(LogProvider), Applicability::any())
        .build()
}

fn package_type() -> ResourceTypeSpec {
    ResourceTypeSpec::builder("package")
        .property(
            PropertyDescriptor::new("package_name")
                .kind(ValueKind::String)
                .name_property()
                .identity(),
        )
        .property(PropertyDescriptor::new("version").kind(ValueKind::String))
        .property(
            PropertyDescriptor::new("options")
                .kind(ValueKind::List)
                .deferred_default(|_| Value::empty_list())
                .not_desired_state(),
        )
        .actions(["install", "upgrade", "remove"])
        .build()
}

fn version(requirement: &str) -> converge::Result<VersionRequirement> {
    VersionRequirement::parse(requirement)
}

/// Platform package types, most specific first
fn package_providers(
    package: &ResourceTypeSpec,
    runner: &Arc<dyn CommandRunner>,
) -> Result<Vec<ResourceTypeSpec>> {
    let provider = |manager| -> Arc<dyn Provider> {
        Arc::new(PackageProvider::new(manager, Arc::clone(runner)))
    };

    let apt = ResourceTypeSpec::derive("apt_package", package)
        .provides("package", Applicability::any().platform_family("debian"))
        .provider(provider(PackageManager::Apt), Applicability::any().os("linux"))
        .build();

    let dnf = ResourceTypeSpec::derive("dnf_package", package)
        .provides("package", Applicability::any().platform_family("fedora"))
        .provides(
            "package",
            Applicability::any()
                .platform_family("rhel")
                .platform_version(version(">= 8")?),
        )
        .provides(
            "package",
            Applicability::any()
                .platform_family("amazon")
                .platform_version(version(">= 2023")?),
        )
        .provider(provider(PackageManager::Dnf), Applicability::any().os("linux"))
        .build();

    let yum = ResourceTypeSpec::derive("yum_package", package)
        .provides(
            "package",
            Applicability::any()
                .platform_family("rhel")
                .platform_version(version("< 8")?),
        )
        .provides(
            "package",
            Applicability::any()
                .platform_family("amazon")
                .platform_version(version("< 2023")?),
        )
        .provider(provider(PackageManager::Yum), Applicability::any().os("linux"))
        .build();

    let apk = ResourceTypeSpec::derive("apk_package", package)
        .provides("package", Applicability::any().platform_family("alpine"))
        .provider(provider(PackageManager::Apk), Applicability::any().os("linux"))
        .build();

    let homebrew = ResourceTypeSpec::derive("homebrew_package", package)
        .also_known_as("brew_package")
        .provides("package", Applicability::any().platform_family("mac_os_x"))
        .provider(provider(PackageManager::Homebrew), Applicability::any().os("darwin"))
        .build();

    Ok(vec![apt, dnf, yum, apk, homebrew])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::FakeRunner;
    use converge::{Action, Error, NO_SETTERS, Outcome, PlatformFacts};

    fn registry_with(runner: FakeRunner) -> Registry {
        let runner: Arc<dyn CommandRunner> = Arc::new(runner);
        builtin(&runner).unwrap()
    }

    fn registry() -> Registry {
        registry_with(FakeRunner::default())
    }

    fn linux(family: &str, version: &str) -> PlatformFacts {
        PlatformFacts::from_pairs([
            ("os", "linux"),
            ("platform_family", family),
            ("platform_version", version),
        ])
    }

    fn package_provider(facts: &PlatformFacts) -> converge::Result<String> {
        let registry = registry();
        let binding = registry.resolver().resolve("package", facts)?;
        Ok(binding.provider_id().to_string())
    }

    #[test]
    fn test_package_resolves_per_platform() {
        let cases = [
            (linux("debian", "12"), "package/apt"),
            (linux("fedora", "39"), "package/dnf"),
            (linux("rhel", "9.3"), "package/dnf"),
            (linux("rhel", "7.9"), "package/yum"),
            (linux("amazon", "2"), "package/yum"),
            (linux("amazon", "2023"), "package/dnf"),
            (linux("alpine", "3.19.1"), "package/apk"),
            (
                PlatformFacts::from_pairs([("os", "darwin"), ("platform_family", "mac_os_x")]),
                "package/homebrew",
            ),
        ];
        for (facts, expected) in cases {
            assert_eq!(package_provider(&facts).unwrap(), expected, "{facts}");
        }
    }

    #[test]
    fn test_package_unsupported_platform() {
        let facts = PlatformFacts::from_pairs([("os", "windows"), ("platform_family", "windows")]);
        assert!(matches!(
            package_provider(&facts),
            Err(Error::NoProviderFound { .. })
        ));
    }

    #[test]
    fn test_brew_synonym() {
        let registry = registry();
        assert_eq!(registry.resolve_synonym("brew_package").unwrap(), "homebrew_package");
    }

    #[test]
    fn test_file_mode_coerced_from_integer() {
        let registry = registry();
        let facts = linux("debian", "12");
        let instance = registry
            .declare_resource(
                "file",
                "/etc/motd",
                [("mode", Value::Integer(644))],
                None,
                vec![],
                &facts,
            )
            .unwrap();
        assert_eq!(instance.get("mode").unwrap(), Some(&Value::from("644")));
        assert_eq!(instance.action(), &Action::from("create"));

        let err = registry
            .declare_resource(
                "file",
                "/etc/motd",
                [("mode", Value::from("999"))],
                None,
                vec![],
                &facts,
            )
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation { .. }));
    }

    #[test]
    fn test_package_options_default_per_instance() {
        let registry = registry();
        let facts = linux("debian", "12");
        let a = registry
            .declare_resource("package", "curl", NO_SETTERS, None, vec![], &facts)
            .unwrap();
        let b = registry
            .declare_resource("package", "jq", NO_SETTERS, None, vec![], &facts)
            .unwrap();
        assert_eq!(a.get("options").unwrap(), Some(&Value::empty_list()));
        assert!(!std::ptr::eq(
            a.get("options").unwrap().unwrap(),
            b.get("options").unwrap().unwrap()
        ));
        assert_eq!(a.identity_key().unwrap(), "package[curl]");
    }

    #[test]
    fn test_sensitive_execute_redacts_command() {
        let registry = registry_with(FakeRunner::default().respond(7, "denied"));
        let facts = linux("debian", "12");
        let command = "curl -u admin:hunter2 https://example.invalid";
        let instance = registry
            .declare_resource(
                "execute",
                "fetch-config",
                [("command", Value::from(command)), ("sensitive", Value::from(true))],
                None,
                vec![],
                &facts,
            )
            .unwrap();

        let report = converge::execute(instance);
        let Outcome::Failed { error } = &report.outcome else {
            panic!("expected failure, got {:?}", report.outcome);
        };
        let message = error.to_string();
        assert!(message.contains("received 7"));
        assert!(!message.contains("hunter2"));
    }

    #[test]
    fn test_sensitive_execute_redacts_command_used_as_name() {
        let registry = registry_with(FakeRunner::default().respond(7, "denied"));
        let facts = linux("debian", "12");
        let command = "curl -u admin:hunter2 https://example.invalid";
        let instance = registry
            .declare_resource(
                "execute",
                command,
                [("sensitive", Value::from(true))],
                None,
                vec![],
                &facts,
            )
            .unwrap();

        let report = converge::execute(instance);
        let message = report.outcome.error().map(ToString::to_string).unwrap_or_default();
        assert!(message.starts_with("execute[*sensitive value suppressed*] action run failed"));
        assert!(!message.contains("hunter2"));
        assert!(!report.label().contains("hunter2"));
        assert!(!report.identity_key.contains("hunter2"));
    }

    #[test]
    fn test_log_level_must_be_known() {
        let registry = registry();
        let facts = linux("debian", "12");
        let err = registry
            .declare_resource(
                "log",
                "hello",
                [("level", Value::from("loud"))],
                None,
                vec![],
                &facts,
            )
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation { .. }));
    }
}

use converge::{
    Action, Applicability, Error, ExecutionState, Guard, Mutation, Outcome, PlatformFacts,
    PropertyDescriptor, PropertyValues, Provider, Registry, ResourceTypeSpec, SUPPRESSED, Value,
    ValueKind, execute,
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct RecordingProvider {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl Provider for RecordingProvider {
    fn id(&self) -> &str {
        "pkg/recording"
    }

    fn perform(&self, action: &Action, properties: &PropertyValues) -> anyhow::Result<Mutation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = properties.require_str("name")?;
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(format!("{action} {name}"));
        }
        Ok(Mutation::Created)
    }
}

fn pkg_registry(provider: Arc<RecordingProvider>) -> Registry {
    let mut registry = Registry::new();
    registry
        .define_resource_type(
            "pkg",
            [PropertyDescriptor::new("name")
                .kind(ValueKind::String)
                .name_property()
                .identity()],
            ["install", "remove"],
            None,
        )
        .unwrap();
    registry
        .register_provider("pkg", Applicability::any().os("linuxA"), provider)
        .unwrap();
    registry
}

fn linux_a() -> PlatformFacts {
    PlatformFacts::from_pairs([("os", "linuxA")])
}

// ── Declare, resolve, execute ────────────────────────────────────

#[test]
fn test_resolves_and_converges() {
    let provider = Arc::new(RecordingProvider::default());
    let registry = pkg_registry(Arc::clone(&provider));

    let binding = registry.resolver().resolve("pkg", &linux_a()).unwrap();
    assert_eq!(binding.provider_id(), "pkg/recording");

    let instance = registry
        .declare_resource(
            "pkg",
            "foo",
            converge::NO_SETTERS,
            Some(Action::from("install")),
            vec![],
            &linux_a(),
        )
        .unwrap();
    let report = execute(instance);

    assert_eq!(
        report.transitions,
        [
            ExecutionState::Pending,
            ExecutionState::Converging,
            ExecutionState::Converged
        ]
    );
    assert_eq!(
        report.outcome,
        Outcome::Converged {
            mutation: Mutation::Created
        }
    );
    assert_eq!(report.identity_key, "pkg[foo]");
    assert_eq!(*provider.seen.lock().unwrap(), ["install foo"]);
}

#[test]
fn test_no_provider_on_other_platform() {
    let registry = pkg_registry(Arc::new(RecordingProvider::default()));
    let facts = PlatformFacts::from_pairs([("os", "linuxB")]);

    let err = registry.resolver().resolve("pkg", &facts).unwrap_err();
    assert!(matches!(err, Error::NoProviderFound { ref type_name, .. } if type_name == "pkg"));

    // Declaration fails before anything executes
    let err = registry
        .declare_resource("pkg", "foo", converge::NO_SETTERS, None, vec![], &facts)
        .unwrap_err();
    assert!(err.is_declaration_error());
}

#[test]
fn test_guard_skips_without_invoking_provider() {
    let provider = Arc::new(RecordingProvider::default());
    let registry = pkg_registry(Arc::clone(&provider));
    let already_installed = Guard::not_if("package already installed", || Ok(true));

    let instance = registry
        .declare_resource(
            "pkg",
            "foo",
            converge::NO_SETTERS,
            Some(Action::from("install")),
            vec![already_installed],
            &linux_a(),
        )
        .unwrap();
    let report = execute(instance);

    assert_eq!(
        report.outcome,
        Outcome::Skipped {
            reason: "not_if package already installed".into()
        }
    );
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

// ── Resolution and property semantics ────────────────────────────

#[test]
fn test_resolution_is_deterministic_across_threads() {
    let mut registry = Registry::new();
    let mut spec = ResourceTypeSpec::builder("service");
    for (id, os) in [("a", "linux"), ("b", "linux"), ("c", "aix"), ("d", "linux")] {
        spec = spec.provider(Arc::new(Named(id)), Applicability::any().os(os));
    }
    registry.register(spec.build()).unwrap();

    let facts = PlatformFacts::from_pairs([("os", "linux")]);
    let ids: Vec<String> = (0..256)
        .into_par_iter()
        .map(|_| {
            registry
                .resolver()
                .resolve("service", &facts)
                .map(|b| b.provider_id().to_string())
                .unwrap()
        })
        .collect();
    assert!(ids.iter().all(|id| id == "a"));
}

#[test]
fn test_first_declared_binding_wins_over_more_specific() {
    let mut registry = Registry::new();
    registry
        .register(
            ResourceTypeSpec::builder("package")
                .provider(Arc::new(Named("broad")), Applicability::any().os("solaris2"))
                .provider(
                    Arc::new(Named("narrow")),
                    Applicability::any()
                        .os("solaris2")
                        .platform_family("nexentacore"),
                )
                .build(),
        )
        .unwrap();
    let facts =
        PlatformFacts::from_pairs([("os", "solaris2"), ("platform_family", "nexentacore")]);
    assert_eq!(
        registry.resolver().resolve("package", &facts).unwrap().provider_id(),
        "broad"
    );
}

#[test]
fn test_later_registration_never_outranks_builtin() {
    let provider = Arc::new(RecordingProvider::default());
    let mut registry = pkg_registry(provider);
    registry
        .register_provider("pkg", Applicability::any().os("linuxA"), Arc::new(Named("plugin")))
        .unwrap();
    assert_eq!(
        registry.resolver().resolve("pkg", &linux_a()).unwrap().provider_id(),
        "pkg/recording"
    );

    registry
        .register_provider_first("pkg", Applicability::any(), Arc::new(Named("override")))
        .unwrap();
    assert_eq!(
        registry.resolver().resolve("pkg", &linux_a()).unwrap().provider_id(),
        "override"
    );
}

#[test]
fn test_deferred_default_evaluated_once_per_instance() {
    let mut registry = Registry::new();
    registry
        .define_resource_type(
            "template",
            [PropertyDescriptor::new("variables").deferred_default(|_| Value::empty_map())],
            ["create"],
            None,
        )
        .unwrap();

    let a = registry.declare("template", "a").unwrap();
    let b = registry.declare("template", "b").unwrap();
    let first = a.get("variables").unwrap().unwrap();
    let again = a.get("variables").unwrap().unwrap();
    let other = b.get("variables").unwrap().unwrap();

    assert!(std::ptr::eq(first, again));
    assert!(!std::ptr::eq(first, other));
}

#[test]
fn test_name_property_equals_declared_name() {
    let registry = pkg_registry(Arc::new(RecordingProvider::default()));
    let instance = registry.declare("pkg", "curl").unwrap();
    assert_eq!(instance.get("name").unwrap(), Some(&Value::from("curl")));
}

#[test]
fn test_nothing_action_skips_even_when_guards_pass() {
    let provider = Arc::new(RecordingProvider::default());
    let registry = pkg_registry(Arc::clone(&provider));
    let instance = registry
        .declare_resource(
            "pkg",
            "foo",
            converge::NO_SETTERS,
            Some(Action::nothing()),
            vec![Guard::only_if("always", || Ok(true))],
            &linux_a(),
        )
        .unwrap();

    assert_eq!(execute(instance).outcome.state(), ExecutionState::Skipped);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_one_failing_guard_skips() {
    let provider = Arc::new(RecordingProvider::default());
    let registry = pkg_registry(Arc::clone(&provider));
    let instance = registry
        .declare_resource(
            "pkg",
            "foo",
            converge::NO_SETTERS,
            None,
            vec![
                Guard::only_if("satisfied", || Ok(true)),
                Guard::only_if("unsatisfied", || Ok(false)),
            ],
            &linux_a(),
        )
        .unwrap();

    assert_eq!(execute(instance).outcome.state(), ExecutionState::Skipped);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_configured_secret_never_leaks_from_failure() {
    #[derive(Debug)]
    struct Leaky;

    impl Provider for Leaky {
        fn id(&self) -> &str {
            "leaky"
        }

        fn perform(
            &self,
            _action: &Action,
            _properties: &PropertyValues,
        ) -> anyhow::Result<Mutation> {
            anyhow::bail!("curl -u admin:t0ps3cret failed; retry with admin:t0ps3cret")
        }
    }

    let mut registry = Registry::new();
    registry
        .register(
            ResourceTypeSpec::builder("remote_file")
                .action("create")
                .provider(Arc::new(Leaky), Applicability::any())
                .message_transform(|_, message| {
                    converge::redact(message, &["t0ps3cret".to_string()])
                })
                .build(),
        )
        .unwrap();

    let instance = registry
        .declare_resource(
            "remote_file",
            "/etc/motd",
            converge::NO_SETTERS,
            None,
            vec![],
            &PlatformFacts::new(),
        )
        .unwrap();
    let report = execute(instance);

    let message = report.outcome.error().map(ToString::to_string).unwrap();
    assert!(!message.contains("t0ps3cret"));
    assert_eq!(message.matches(SUPPRESSED).count(), 2);
    assert!(message.starts_with("remote_file[/etc/motd] action create failed"));
}

#[derive(Debug)]
struct Named(&'static str);

impl Provider for Named {
    fn id(&self) -> &str {
        self.0
    }

    fn perform(&self, _action: &Action, _properties: &PropertyValues) -> anyhow::Result<Mutation> {
        Ok(Mutation::NoChange)
    }
}

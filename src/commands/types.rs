//! `tend types` - list the built-in resource types

use anyhow::Result;
use colored::Colorize;
use converge::{Action, PropertyDescriptor, ResourceTypeSpec};
use std::sync::Arc;

use crate::catalog;
use crate::runner::{CommandRunner, SystemRunner};
use crate::ui;

pub fn run() -> Result<()> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let registry = catalog::builtin(&runner)?;

    ui::header("Resource types");
    for spec in registry.types() {
        print_type(spec);
    }
    Ok(())
}

fn print_type(spec: &ResourceTypeSpec) {
    let title = if spec.synonyms().is_empty() {
        spec.name().to_string()
    } else {
        format!("{} (also {})", spec.name(), spec.synonyms().join(", "))
    };
    ui::section(&title);

    let actions: Vec<String> = spec.allowed_actions().iter().map(Action::to_string).collect();
    ui::kv("actions", &actions.join(", "));
    ui::kv("default", spec.default_action().as_str());
    for provides in spec.provides() {
        ui::kv("provides", &format!("{} on {}", provides.type_name(), provides.applicability()));
    }
    for binding in spec.bindings() {
        ui::kv("provider", &format!("{} on {}", binding.provider_id(), binding.applicability()));
    }
    for property in spec.properties() {
        println!("    {}", property_line(property));
    }
}

/// `name: constraint [flags]`
fn property_line(property: &PropertyDescriptor) -> String {
    let flags: Vec<&str> = [
        (property.is_name_property(), "name"),
        (property.is_identity(), "identity"),
        (property.is_required(), "required"),
        (property.is_sensitive(), "sensitive"),
        (!property.affects_desired_state(), "behaviour"),
    ]
    .into_iter()
    .filter_map(|(set, flag)| set.then_some(flag))
    .collect();

    let mut line = format!("{}: {}", property.name().bold(), property.value_constraint());
    if !flags.is_empty() {
        line.push_str(&format!(" {}", format!("[{}]", flags.join(", ")).dimmed()));
    }
    line
}

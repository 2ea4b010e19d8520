//! `tend resolve` - which provider would handle a type here

use anyhow::{Result, bail};
use colored::Colorize;
use converge::{PlatformFacts, Registry};
use std::sync::Arc;

use crate::catalog;
use crate::cli::ResolveArgs;
use crate::config::Config;
use crate::runner::{CommandRunner, SystemRunner};
use crate::ui;

pub fn run(args: ResolveArgs) -> Result<()> {
    let config = Config::load()?;
    let facts = super::platform_facts(&config, &args.facts)?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let registry = catalog::builtin(&runner)?;

    let canonical = registry.resolve_synonym(&args.type_name)?;
    ui::header(&format!("Resolving {canonical}"));
    ui::dim(&facts.to_string());
    println!();

    if args.all {
        let candidates = applicable(&registry, &args.type_name, &facts)?;
        if candidates.is_empty() {
            bail!("No provider for {canonical} applies on {facts}");
        }
        for (i, (provider, applies_when)) in candidates.iter().enumerate() {
            let marker = if i == 0 { "✓".green() } else { " ".normal() };
            println!("  {marker} {}. {}  {}", i + 1, provider.bold(), applies_when.dimmed());
        }
        return Ok(());
    }

    let resolution = registry.resolver().resolve_detailed(&args.type_name, &facts)?;
    ui::success(&format!("{canonical} -> {}", resolution.binding.provider_id()));
    ui::kv("applies when", &resolution.binding.applicability().to_string());
    for masked in &resolution.masked {
        ui::warn(&format!(
            "{} has the same constraints and can never be selected",
            masked.provider_id()
        ));
    }
    Ok(())
}

/// `(provider id, applicability)` of every applicable binding, winner first
fn applicable(
    registry: &Registry,
    type_name: &str,
    facts: &PlatformFacts,
) -> Result<Vec<(String, String)>> {
    Ok(registry
        .resolver()
        .resolve_all(type_name, facts)?
        .into_iter()
        .map(|binding| {
            (
                binding.provider_id().to_string(),
                binding.applicability().to_string(),
            )
        })
        .collect())
}

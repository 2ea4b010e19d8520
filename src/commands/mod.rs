//! Subcommand implementations

pub mod apply;
pub mod facts;
pub mod resolve;
pub mod types;

use anyhow::{Context, Result};
use converge::PlatformFacts;

use crate::cli::FactArgs;
use crate::config::Config;

/// Gathered facts, then config overrides, then `--fact` overrides
pub fn platform_facts(config: &Config, overrides: &FactArgs) -> Result<PlatformFacts> {
    let gathered = ::facts::gather().context("Failed to gather platform facts")?;
    merge_facts(&gathered, config, overrides)
}

fn merge_facts(
    gathered: &PlatformFacts,
    config: &Config,
    overrides: &FactArgs,
) -> Result<PlatformFacts> {
    let cli = overrides
        .facts
        .iter()
        .map(|input| ::facts::parse_override(input))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(gathered
        .merged(&config.fact_overrides())
        .merged(&PlatformFacts::from_pairs(cli)))
}

//! `tend apply` - converge the machine to a recipe
//!
//! Every declaration is validated and resolved up front, in parallel, so a
//! typo or an unsupported platform fails the run before anything changes.
//! Resources then execute one at a time in declaration order.

use anyhow::{Result, bail};
use converge::{ExecuteOptions, ExecutionEvents, Executor, PlatformFacts, Registry};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Context;
use crate::catalog;
use crate::cli::ApplyArgs;
use crate::config::Config;
use crate::recipe::Recipe;
use crate::report::RunReport;
use crate::runner::{CommandRunner, SystemRunner};
use crate::ui;

/// How a run treats dry runs and failures
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub dry_run: bool,
    pub fail_fast: bool,
}

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = Config::load()?;
    let facts = super::platform_facts(&config, &args.facts)?;
    let settings = Settings {
        dry_run: args.dry_run,
        fail_fast: config.fail_fast && !args.continue_on_error,
    };

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let registry = catalog::builtin(&runner)?;
    let recipe = Recipe::load(&args.recipe)?;

    if !ctx.quiet {
        ui::header(&format!("Applying {}", args.recipe.display()));
        ui::dim(&facts.to_string());
    }

    let mut events = ui::ConsoleEvents::new(recipe.resources.len(), ctx.quiet);
    let report = converge_recipe(&recipe, &registry, &facts, &runner, settings, &mut events)?;

    if let Some(path) = &args.report {
        report.write(path)?;
        if !ctx.quiet {
            ui::info(&format!("Report written to {}", path.display()));
        }
    }

    let not_attempted = recipe.resources.len() - report.resources.len();
    if not_attempted > 0 {
        ui::warn(&format!(
            "Stopped after the first failure; {not_attempted} resources not attempted"
        ));
    }
    if !ctx.quiet {
        ui::print_summary(&report.summary, settings.dry_run);
    }

    if !report.summary.is_success() {
        bail!("{} resources failed", report.summary.failed);
    }
    Ok(())
}

/// Declare, resolve and execute every resource of `recipe`.
///
/// Declaration errors abort before any execution. Execution failures are
/// recorded in the report; with `fail_fast` the run stops at the first one.
pub fn converge_recipe(
    recipe: &Recipe,
    registry: &Registry,
    facts: &PlatformFacts,
    runner: &Arc<dyn CommandRunner>,
    settings: Settings,
    events: &mut dyn ExecutionEvents,
) -> Result<RunReport> {
    let instances = recipe.declare(registry, facts, runner)?;
    log::info!("Resolved {} resources", instances.len());

    let mut run = RunReport::new(facts.clone(), settings.dry_run);
    let mut executor = Executor::new(
        ExecuteOptions {
            dry_run: settings.dry_run,
        },
        events,
    );

    for instance in instances {
        let state: BTreeMap<_, _> = instance.reportable_state().into_iter().collect();
        let report = executor.execute(instance);
        let failed = report.outcome.is_failure();
        run.record(&report, state);

        if failed && settings.fail_fast {
            log::warn!("{} failed, stopping", report.label());
            break;
        }
    }

    run.finish();
    Ok(run)
}

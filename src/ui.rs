use colored::Colorize;
use converge::{Action, Error, ExecutionEvents, Mutation, RunSummary};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

/// Progress printer for `tend apply`
#[derive(Debug)]
pub struct ConsoleEvents {
    total: usize,
    current: usize,
    quiet: bool,
}

impl ConsoleEvents {
    pub fn new(total: usize, quiet: bool) -> Self {
        Self {
            total,
            current: 0,
            quiet,
        }
    }
}

impl ExecutionEvents for ConsoleEvents {
    fn on_resource_start(&mut self, resource: &str, action: &Action) {
        self.current += 1;
        if !self.quiet {
            step(self.current, self.total, &format!("{} {}", resource.bold(), action));
        }
    }

    fn on_skipped(&mut self, _resource: &str, reason: &str) {
        if !self.quiet {
            dim(&format!("skipped ({reason})"));
        }
    }

    fn on_updated(&mut self, _resource: &str, mutation: &Mutation) {
        if !self.quiet {
            println!("  {} {}", "✓".green(), mutation);
        }
    }

    fn on_up_to_date(&mut self, _resource: &str) {
        if !self.quiet {
            dim("up to date");
        }
    }

    fn on_failed(&mut self, _resource: &str, err: &Error) {
        eprintln!("  {} {}", "✗".red(), err);
    }
}

pub fn print_summary(summary: &RunSummary, dry_run: bool) {
    println!();
    if !summary.is_success() {
        println!("  {} Converged with errors", "⚠".yellow().bold());
    } else if dry_run {
        println!("  {} Dry run complete, nothing was changed", "ℹ".blue().bold());
    } else {
        println!("  {} System converged", "✓".green().bold());
    }

    if summary.updated > 0 {
        println!("    • {} resources updated", summary.updated);
    }
    if summary.up_to_date > 0 {
        println!("    • {} resources up to date", summary.up_to_date);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

//! Machine-readable run reports (`tend apply --report <path>`)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use converge::{Outcome, PlatformFacts, Report, RunSummary, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Terminal status of one resource, as reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Updated,
    UpToDate,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceRecord {
    /// `type[name]`
    pub resource: String,
    pub identity: String,
    pub action: String,
    pub status: Status,
    /// Mutation, skip reason or (redacted) error message
    pub detail: String,
    /// Desired state as declared, sensitive values suppressed
    pub state: BTreeMap<String, Value>,
}

impl ResourceRecord {
    pub fn new(report: &Report, state: BTreeMap<String, Value>) -> Self {
        let (status, detail) = match &report.outcome {
            Outcome::Converged { mutation } if mutation.is_change() => {
                (Status::Updated, mutation.to_string())
            }
            Outcome::Converged { mutation } => (Status::UpToDate, mutation.to_string()),
            Outcome::Skipped { reason } => (Status::Skipped, reason.clone()),
            Outcome::Failed { error } => (Status::Failed, error.to_string()),
        };
        Self {
            resource: report.label(),
            identity: report.identity_key.clone(),
            action: report.action.to_string(),
            status,
            detail,
            state,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub facts: PlatformFacts,
    pub summary: RunSummary,
    pub resources: Vec<ResourceRecord>,
}

impl RunReport {
    pub fn new(facts: PlatformFacts, dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            facts,
            summary: RunSummary::default(),
            resources: Vec::new(),
        }
    }

    pub fn record(&mut self, report: &Report, state: BTreeMap<String, Value>) {
        self.summary.add(&report.outcome);
        self.resources.push(ResourceRecord::new(report, state));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Write as pretty JSON, creating parent directories
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        log::debug!("Report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{Action, Error, ExecutionState, Mutation};

    fn report(outcome: Outcome) -> Report {
        Report {
            type_name: "package".into(),
            name: "curl".into(),
            action: Action::from("install"),
            identity_key: "package[curl]".into(),
            transitions: vec![ExecutionState::Pending, outcome.state()],
            outcome,
        }
    }

    #[test]
    fn test_record_statuses() {
        let mut run = RunReport::new(PlatformFacts::from_pairs([("os", "linux")]), false);
        run.record(
            &report(Outcome::Converged {
                mutation: Mutation::Created,
            }),
            BTreeMap::new(),
        );
        run.record(
            &report(Outcome::Skipped {
                reason: "not_if command -v curl".into(),
            }),
            BTreeMap::new(),
        );
        run.record(
            &report(Outcome::Failed {
                error: Error::Unresolved("package[curl]".into()),
            }),
            BTreeMap::new(),
        );

        let statuses: Vec<Status> = run.resources.iter().map(|r| r.status).collect();
        assert_eq!(statuses, [Status::Updated, Status::Skipped, Status::Failed]);
        assert_eq!(run.resources[0].detail, "created");
        assert_eq!(run.summary.total(), 3);
        assert_eq!(run.summary.failed, 1);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("last.json");
        let mut run = RunReport::new(PlatformFacts::from_pairs([("os", "linux")]), true);
        let state = BTreeMap::from([("version".to_string(), Value::from("8.5.0"))]);
        run.record(
            &report(Outcome::Converged {
                mutation: Mutation::NoChange,
            }),
            state,
        );
        run.finish();
        run.write(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["facts"]["os"], "linux");
        assert_eq!(json["resources"][0]["status"], "up_to_date");
        assert_eq!(json["resources"][0]["state"]["version"], "8.5.0");
        assert_eq!(json["summary"]["up_to_date"], 1);
        assert!(json["finished_at"].is_string());
    }
}

//! Log provider - writes a message to the run log

use anyhow::{Result, bail};
use converge::{Action, Mutation, PropertyValues, Provider};
use log::Level;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogProvider;

impl Provider for LogProvider {
    fn id(&self) -> &str {
        "log/default"
    }

    fn perform(&self, action: &Action, properties: &PropertyValues) -> Result<Mutation> {
        if action.as_str() != "write" {
            bail!("log does not implement action {action}");
        }

        let message = properties.require_str("message")?;
        let level = match properties.str("level").unwrap_or("info") {
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warn" => Level::Warn,
            "error" => Level::Error,
            other => bail!("unknown log level {other}"),
        };
        log::log!(level, "{message}");
        Ok(Mutation::Modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::Value;

    #[test]
    fn test_write_counts_as_update() {
        let properties: PropertyValues = [
            ("message", Value::from("deploy finished")),
            ("level", Value::from("warn")),
        ]
        .into_iter()
        .collect();
        let mutation = LogProvider.perform(&Action::from("write"), &properties).unwrap();
        assert_eq!(mutation, Mutation::Modified);
    }

    #[test]
    fn test_unknown_level() {
        let properties: PropertyValues = [
            ("message", Value::from("x")),
            ("level", Value::from("loud")),
        ]
        .into_iter()
        .collect();
        assert!(LogProvider.perform(&Action::from("write"), &properties).is_err());
    }
}

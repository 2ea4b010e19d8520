//! `/etc/os-release` parsing
//!
//! The file is a list of shell-style `KEY=value` assignments; values may be
//! double or single quoted. Comments and blank lines are ignored.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Fields of an os-release file relevant to platform detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    /// Lower-case distribution id (`ubuntu`, `rocky`, ...)
    pub id: String,
    /// Distributions this one derives from, nearest first
    pub id_like: Vec<String>,
    pub version_id: Option<String>,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    /// Parse os-release content. `path` only labels errors.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let fields = parse_assignments(content);

        let id = fields
            .get("ID")
            .map(|id| id.to_lowercase())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::MissingPlatformId {
                path: path.to_path_buf(),
            })?;

        let id_like = fields
            .get("ID_LIKE")
            .map(|like| like.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        Ok(Self {
            id,
            id_like,
            version_id: fields.get("VERSION_ID").cloned(),
            pretty_name: fields.get("PRETTY_NAME").cloned(),
        })
    }

    /// Read and parse an os-release file; `Ok(None)` when it doesn't exist
    pub fn read(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn parse_assignments(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), unquote(value.trim())))
        .collect()
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.replace("\\\"", "\"");
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"
PRETTY_NAME="Ubuntu 22.04.4 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
ID=ubuntu
ID_LIKE=debian
"#;

    #[test]
    fn test_parse_ubuntu() {
        let release = OsRelease::parse(UBUNTU, Path::new("os-release")).unwrap();
        assert_eq!(release.id, "ubuntu");
        assert_eq!(release.id_like, ["debian"]);
        assert_eq!(release.version_id.as_deref(), Some("22.04"));
        assert_eq!(release.pretty_name.as_deref(), Some("Ubuntu 22.04.4 LTS"));
    }

    #[test]
    fn test_parse_multiple_id_like() {
        let content = "ID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\nVERSION_ID='9.3'\n";
        let release = OsRelease::parse(content, Path::new("os-release")).unwrap();
        assert_eq!(release.id, "rocky");
        assert_eq!(release.id_like, ["rhel", "centos", "fedora"]);
        assert_eq!(release.version_id.as_deref(), Some("9.3"));
    }

    #[test]
    fn test_missing_id() {
        let err = OsRelease::parse("NAME=Mystery\n", Path::new("/etc/os-release")).unwrap_err();
        assert!(matches!(err, Error::MissingPlatformId { .. }));
    }

    #[test]
    fn test_comments_ignored() {
        let content = "# ID=wrong\nID=alpine\n";
        let release = OsRelease::parse(content, Path::new("os-release")).unwrap();
        assert_eq!(release.id, "alpine");
        assert!(release.id_like.is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OsRelease::read(&dir.path().join("os-release")).unwrap().is_none());
    }
}

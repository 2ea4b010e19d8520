//! Platform fact gathering
//!
//! Collects the facts provider resolution matches on: `os`, `platform`,
//! `platform_family`, `platform_version`, `arch` and `hostname`. On Linux
//! the platform comes from os-release; other systems are identified from
//! the compile target.
//!
//! # Example
//!
//! ```no_run
//! let facts = facts::gather().unwrap();
//! println!("{facts}");
//! ```

pub mod error;
pub mod family;
pub mod os_release;

pub use error::{Error, Result};
pub use os_release::OsRelease;

use converge::PlatformFacts;
use converge::facts::{OS, PLATFORM, PLATFORM_FAMILY, PLATFORM_VERSION};
use std::path::PathBuf;

pub const ARCH: &str = "arch";
pub const HOSTNAME: &str = "hostname";

/// Gather facts for the running machine
pub fn gather() -> Result<PlatformFacts> {
    Gatherer::new("/").gather()
}

/// Parse a `key=value` fact override
pub fn parse_override(input: &str) -> Result<(String, String)> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::InvalidOverride(input.to_string())),
    }
}

/// Reads fact sources relative to a filesystem root
#[derive(Debug, Clone)]
pub struct Gatherer {
    root: PathBuf,
    target_os: String,
}

impl Gatherer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            target_os: std::env::consts::OS.to_string(),
        }
    }

    /// Pretend to run on another target OS
    pub fn with_target_os(mut self, target_os: impl Into<String>) -> Self {
        self.target_os = target_os.into();
        self
    }

    pub fn gather(&self) -> Result<PlatformFacts> {
        let mut facts = PlatformFacts::new()
            .with(OS, family::os_name(&self.target_os))
            .with(ARCH, std::env::consts::ARCH);

        if let Some(hostname) = self.hostname() {
            facts = facts.with(HOSTNAME, hostname);
        }

        match self.target_os.as_str() {
            "linux" => {
                let path = self.path("etc/os-release");
                match OsRelease::read(&path)? {
                    Some(release) => {
                        let platform = family::platform_name(&release.id);
                        let family = family::platform_family(&platform, &release.id_like);
                        facts = facts
                            .with(PLATFORM, platform)
                            .with(PLATFORM_FAMILY, family);
                        if let Some(version) = release.version_id {
                            facts = facts.with(PLATFORM_VERSION, version);
                        }
                    }
                    None => log::warn!("{} not found; platform facts unavailable", path.display()),
                }
            }
            "macos" => {
                facts = facts
                    .with(PLATFORM, "mac_os_x")
                    .with(PLATFORM_FAMILY, "mac_os_x");
            }
            other => {
                let platform = family::os_name(other).to_string();
                let family = family::platform_family(&platform, &[]);
                facts = facts.with(PLATFORM, platform).with(PLATFORM_FAMILY, family);
            }
        }

        log::debug!("Gathered facts: {facts}");
        Ok(facts)
    }

    fn hostname(&self) -> Option<String> {
        let from_file = ["proc/sys/kernel/hostname", "etc/hostname"]
            .iter()
            .find_map(|p| std::fs::read_to_string(self.path(p)).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        from_file.or_else(|| std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty()))
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn root_with_os_release(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("etc")).unwrap();
        fs::write(dir.path().join("etc/os-release"), content).unwrap();
        fs::write(dir.path().join("etc/hostname"), "build-01\n").unwrap();
        dir
    }

    #[test]
    fn test_gather_linux_from_os_release() {
        let root = root_with_os_release("ID=ubuntu\nID_LIKE=debian\nVERSION_ID=\"22.04\"\n");
        let facts = Gatherer::new(root.path())
            .with_target_os("linux")
            .gather()
            .unwrap();

        assert_eq!(facts.os(), Some("linux"));
        assert_eq!(facts.platform(), Some("ubuntu"));
        assert_eq!(facts.platform_family(), Some("debian"));
        assert_eq!(facts.platform_version(), Some("22.04"));
        assert_eq!(facts.get(HOSTNAME), Some("build-01"));
        assert!(facts.get(ARCH).is_some());
    }

    #[test]
    fn test_gather_linux_without_os_release() {
        let root = tempfile::tempdir().unwrap();
        let facts = Gatherer::new(root.path())
            .with_target_os("linux")
            .gather()
            .unwrap();
        assert_eq!(facts.os(), Some("linux"));
        assert!(facts.platform().is_none());
    }

    #[test]
    fn test_gather_macos() {
        let root = tempfile::tempdir().unwrap();
        let facts = Gatherer::new(root.path())
            .with_target_os("macos")
            .gather()
            .unwrap();
        assert_eq!(facts.os(), Some("darwin"));
        assert_eq!(facts.platform_family(), Some("mac_os_x"));
    }

    #[test]
    fn test_gather_freebsd() {
        let root = tempfile::tempdir().unwrap();
        let facts = Gatherer::new(root.path())
            .with_target_os("freebsd")
            .gather()
            .unwrap();
        assert_eq!(facts.platform(), Some("freebsd"));
        assert_eq!(facts.platform_family(), Some("freebsd"));
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("platform_family=rhel").unwrap(),
            ("platform_family".to_string(), "rhel".to_string())
        );
        assert!(parse_override("novalue").is_err());
        assert!(parse_override("=x").is_err());
    }
}

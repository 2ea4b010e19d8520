//! Package providers for the system package managers
//!
//! One [`PackageProvider`] per manager. Every action first queries the
//! installed version so that repeat runs report no change.

use anyhow::{Result, bail};
use converge::{Action, Mutation, PropertyValues, Provider, Value};
use std::fmt;
use std::sync::Arc;

use crate::runner::{CommandRunner, Invocation};

/// A supported package manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Apk,
    Homebrew,
}

/// A command line as owned strings
struct CommandLine {
    program: &'static str,
    args: Vec<String>,
}

impl CommandLine {
    fn new(program: &'static str, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn args<'a>(mut self, args: impl IntoIterator<Item = &'a str>) -> Self {
        self.args.extend(args.into_iter().map(String::from));
        self
    }

    fn invocation(&self) -> Invocation<'_> {
        Invocation::new(self.program, self.args.iter().map(String::as_str))
    }
}

impl PackageManager {
    pub fn id(self) -> &'static str {
        match self {
            Self::Apt => "package/apt",
            Self::Dnf => "package/dnf",
            Self::Yum => "package/yum",
            Self::Apk => "package/apk",
            Self::Homebrew => "package/homebrew",
        }
    }

    fn query(self, name: &str) -> CommandLine {
        match self {
            Self::Apt => CommandLine::new("dpkg-query", &["-W", "-f=${Status}\t${Version}"]),
            Self::Dnf | Self::Yum => {
                CommandLine::new("rpm", &["-q", "--qf", "%{VERSION}-%{RELEASE}"])
            }
            Self::Apk => CommandLine::new("apk", &["list", "--installed"]),
            Self::Homebrew => CommandLine::new("brew", &["list", "--versions"]),
        }
        .arg(name)
    }

    /// Installed version from a successful query's output
    fn parse_installed(self, name: &str, stdout: &str) -> Option<String> {
        let line = stdout.lines().next()?.trim();
        match self {
            Self::Apt => {
                let (status, version) = line.split_once('\t')?;
                (status.ends_with(" installed") && !version.is_empty()).then(|| version.to_string())
            }
            Self::Dnf | Self::Yum => {
                (!line.is_empty() && !line.contains("not installed")).then(|| line.to_string())
            }
            // curl-8.5.0-r0 x86_64 {curl} (MIT) [installed]
            Self::Apk => line
                .split_whitespace()
                .next()?
                .strip_prefix(name)?
                .strip_prefix('-')
                .map(String::from),
            // curl 8.5.0 8.4.0
            Self::Homebrew => line.split_whitespace().nth(1).map(String::from),
        }
    }

    fn install(self, name: &str, version: Option<&str>, options: &[&str]) -> CommandLine {
        let target = match (self, version) {
            (Self::Apt | Self::Apk, Some(version)) => format!("{name}={version}"),
            (Self::Dnf | Self::Yum, Some(version)) => format!("{name}-{version}"),
            (Self::Homebrew, Some(version)) => {
                log::warn!("homebrew cannot pin {name} to {version}, installing latest");
                name.to_string()
            }
            (_, None) => name.to_string(),
        };
        match self {
            Self::Apt => CommandLine::new("apt-get", &["install", "-y", "-q"]),
            Self::Dnf => CommandLine::new("dnf", &["install", "-y"]),
            Self::Yum => CommandLine::new("yum", &["install", "-y"]),
            Self::Apk => CommandLine::new("apk", &["add"]),
            Self::Homebrew => CommandLine::new("brew", &["install"]),
        }
        .args(options.iter().copied())
        .arg(target)
    }

    fn upgrade(self, name: &str, options: &[&str]) -> CommandLine {
        match self {
            Self::Apt => CommandLine::new("apt-get", &["install", "-y", "-q", "--only-upgrade"]),
            Self::Dnf => CommandLine::new("dnf", &["upgrade", "-y"]),
            Self::Yum => CommandLine::new("yum", &["update", "-y"]),
            Self::Apk => CommandLine::new("apk", &["upgrade"]),
            Self::Homebrew => CommandLine::new("brew", &["upgrade"]),
        }
        .args(options.iter().copied())
        .arg(name)
    }

    fn remove(self, name: &str, options: &[&str]) -> CommandLine {
        match self {
            Self::Apt => CommandLine::new("apt-get", &["remove", "-y", "-q"]),
            Self::Dnf => CommandLine::new("dnf", &["remove", "-y"]),
            Self::Yum => CommandLine::new("yum", &["remove", "-y"]),
            Self::Apk => CommandLine::new("apk", &["del"]),
            Self::Homebrew => CommandLine::new("brew", &["uninstall"]),
        }
        .args(options.iter().copied())
        .arg(name)
    }

    /// Variables every mutating command runs with
    fn environment(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Apt => &[("DEBIAN_FRONTEND", "noninteractive")],
            Self::Homebrew => &[("HOMEBREW_NO_AUTO_UPDATE", "1")],
            _ => &[],
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id().trim_start_matches("package/"))
    }
}

/// Whether an installed version satisfies a requested one.
///
/// A request without a release suffix matches any release of that
/// version (`8.5.0` matches `8.5.0-1ubuntu1`).
fn version_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || installed
            .strip_prefix(wanted)
            .is_some_and(|rest| rest.starts_with('-'))
}

#[derive(Debug)]
pub struct PackageProvider {
    manager: PackageManager,
    runner: Arc<dyn CommandRunner>,
}

impl PackageProvider {
    pub fn new(manager: PackageManager, runner: Arc<dyn CommandRunner>) -> Self {
        Self { manager, runner }
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        let query = self.manager.query(name);
        let stdout = self.runner.query(&query.invocation())?;
        self.manager.parse_installed(name, &stdout)
    }

    fn run(&self, command: &CommandLine) -> Result<()> {
        let invocation = self
            .manager
            .environment()
            .iter()
            .fold(command.invocation(), |invocation, (key, value)| {
                invocation.env(key, value)
            });
        log::info!("{}", invocation);
        self.runner.run_checked(&invocation)?;
        Ok(())
    }
}

impl Provider for PackageProvider {
    fn id(&self) -> &str {
        self.manager.id()
    }

    fn perform(&self, action: &Action, properties: &PropertyValues) -> Result<Mutation> {
        let name = properties.require_str("package_name")?;
        let version = properties.str("version");
        let options: Vec<&str> = properties
            .list("options")
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .collect();

        let installed = self.installed_version(name);
        log::debug!(
            "{} {name}: installed {}",
            self.manager,
            installed.as_deref().unwrap_or("none")
        );

        match action.as_str() {
            "install" => {
                let satisfied = match (&installed, version) {
                    (Some(current), Some(wanted)) => version_matches(current, wanted),
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if satisfied {
                    return Ok(Mutation::NoChange);
                }
                self.run(&self.manager.install(name, version, &options))?;
                Ok(if installed.is_some() {
                    Mutation::Modified
                } else {
                    Mutation::Created
                })
            }
            "upgrade" => {
                if installed.is_none() {
                    self.run(&self.manager.install(name, version, &options))?;
                    return Ok(Mutation::Created);
                }
                self.run(&self.manager.upgrade(name, &options))?;
                if self.installed_version(name) == installed {
                    Ok(Mutation::NoChange)
                } else {
                    Ok(Mutation::Modified)
                }
            }
            "remove" => {
                if installed.is_none() {
                    return Ok(Mutation::NoChange);
                }
                self.run(&self.manager.remove(name, &options))?;
                Ok(Mutation::Removed)
            }
            other => bail!("{} does not implement action {other}", self.manager),
        }
    }
}

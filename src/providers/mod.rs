//! Built-in providers
//!
//! Each provider realizes one resource type's actions on the local
//! machine. Anything that shells out goes through a
//! [`CommandRunner`](crate::runner::CommandRunner).

pub mod directory;
pub mod execute;
pub mod file;
pub mod logger;
pub mod package;

pub use directory::DirectoryProvider;
pub use execute::ExecuteProvider;
pub use file::FileProvider;
pub use logger::LogProvider;
pub use package::{PackageManager, PackageProvider};

use anyhow::Result;
use std::path::Path;

/// Bring `path` to the octal `mode`, returning whether it changed
#[cfg(unix)]
pub(crate) fn apply_mode(path: &Path, mode: &str) -> Result<bool> {
    use anyhow::Context;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let wanted = u32::from_str_radix(mode, 8)
        .with_context(|| format!("Invalid mode {mode:?} for {}", path.display()))?;
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let current = metadata.permissions().mode() & 0o7777;
    if current == wanted {
        return Ok(false);
    }

    log::info!("{}: mode {current:o} -> {wanted:o}", path.display());
    fs::set_permissions(path, fs::Permissions::from_mode(wanted))
        .with_context(|| format!("Failed to chmod {}", path.display()))?;
    Ok(true)
}

#[cfg(not(unix))]
pub(crate) fn apply_mode(path: &Path, mode: &str) -> Result<bool> {
    log::warn!("{}: ignoring mode {mode} on this platform", path.display());
    Ok(false)
}

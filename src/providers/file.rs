//! File provider - create, delete and touch regular files

use anyhow::{Context, Result, bail};
use converge::{Action, Mutation, PropertyValues, Provider};
use similar::TextDiff;
use std::fs::{self, File};
use std::path::Path;
use std::time::SystemTime;

use super::apply_mode;

#[derive(Debug, Default, Clone, Copy)]
pub struct FileProvider;

impl Provider for FileProvider {
    fn id(&self) -> &str {
        "file/local"
    }

    fn perform(&self, action: &Action, properties: &PropertyValues) -> Result<Mutation> {
        let path = Path::new(properties.require_str("path")?);
        if path.is_dir() {
            bail!("{} is a directory", path.display());
        }

        match action.as_str() {
            "create" => create(path, properties.str("content"), properties.str("mode")),
            "delete" => delete(path),
            "touch" => touch(path, properties.str("mode")),
            other => bail!("file does not implement action {other}"),
        }
    }
}

fn create(path: &Path, content: Option<&str>, mode: Option<&str>) -> Result<Mutation> {
    let existed = path.exists();
    let mut changed = false;

    match content {
        Some(desired) => {
            let current = if existed {
                Some(
                    fs::read_to_string(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                )
            } else {
                None
            };
            if current.as_deref() != Some(desired) {
                if let Some(current) = &current {
                    log_diff(path, current, desired);
                }
                write(path, desired)?;
                changed = true;
            }
        }
        None if !existed => {
            write(path, "")?;
            changed = true;
        }
        None => {}
    }

    if let Some(mode) = mode {
        changed |= apply_mode(path, mode)?;
    }

    Ok(match (existed, changed) {
        (false, _) => Mutation::Created,
        (true, true) => Mutation::Modified,
        (true, false) => Mutation::NoChange,
    })
}

fn delete(path: &Path) -> Result<Mutation> {
    if !path.exists() && !path.is_symlink() {
        return Ok(Mutation::NoChange);
    }
    fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(Mutation::Removed)
}

fn touch(path: &Path, mode: Option<&str>) -> Result<Mutation> {
    let mutation = if path.exists() {
        File::options()
            .write(true)
            .open(path)
            .and_then(|file| file.set_modified(SystemTime::now()))
            .with_context(|| format!("Failed to touch {}", path.display()))?;
        Mutation::Modified
    } else {
        write(path, "")?;
        Mutation::Created
    };
    if let Some(mode) = mode {
        apply_mode(path, mode)?;
    }
    Ok(mutation)
}

fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn log_diff(path: &Path, current: &str, desired: &str) {
    let diff = TextDiff::from_lines(current, desired);
    let mut unified = diff.unified_diff();
    unified.context_radius(3).header("current", "desired");
    log::info!("{}: content differs\n{unified}", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::Value;

    fn props(pairs: &[(&str, &str)]) -> PropertyValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_create_then_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motd");
        let path_str = path.to_str().unwrap();
        let properties = props(&[("path", path_str), ("content", "hello\n")]);
        let create = Action::from("create");

        assert_eq!(FileProvider.perform(&create, &properties).unwrap(), Mutation::Created);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
        assert_eq!(FileProvider.perform(&create, &properties).unwrap(), Mutation::NoChange);
    }

    #[test]
    fn test_create_rewrites_changed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motd");
        fs::write(&path, "old\n").unwrap();
        let properties = props(&[("path", path.to_str().unwrap()), ("content", "new\n")]);

        let mutation = FileProvider.perform(&Action::from("create"), &properties).unwrap();
        assert_eq!(mutation, Mutation::Modified);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_create_without_content_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep");
        fs::write(&path, "data").unwrap();
        let properties = props(&[("path", path.to_str().unwrap())]);

        let mutation = FileProvider.perform(&Action::from("create"), &properties).unwrap();
        assert_eq!(mutation, Mutation::NoChange);
        assert_eq!(fs::read_to_string(&path).unwrap(), "data");
    }

    #[cfg(unix)]
    #[test]
    fn test_mode_applied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, "x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        let properties = props(&[("path", path.to_str().unwrap()), ("mode", "600")]);

        let mutation = FileProvider.perform(&Action::from("create"), &properties).unwrap();
        assert_eq!(mutation, Mutation::Modified);
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone");
        fs::write(&path, "x").unwrap();
        let properties = props(&[("path", path.to_str().unwrap())]);
        let delete = Action::from("delete");

        assert_eq!(FileProvider.perform(&delete, &properties).unwrap(), Mutation::Removed);
        assert!(!path.exists());
        assert_eq!(FileProvider.perform(&delete, &properties).unwrap(), Mutation::NoChange);
    }

    #[test]
    fn test_touch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamp");
        let properties = props(&[("path", path.to_str().unwrap())]);
        let touch = Action::from("touch");

        assert_eq!(FileProvider.perform(&touch, &properties).unwrap(), Mutation::Created);
        assert_eq!(FileProvider.perform(&touch, &properties).unwrap(), Mutation::Modified);
    }

    #[test]
    fn test_directory_path_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let properties = props(&[("path", dir.path().to_str().unwrap())]);
        let err = FileProvider
            .perform(&Action::from("create"), &properties)
            .unwrap_err();
        assert!(err.to_string().contains("is a directory"));
    }
}

//! Directory provider

use anyhow::{Context, Result, bail};
use converge::{Action, Mutation, PropertyValues, Provider};
use std::fs;
use std::path::Path;

use super::apply_mode;

#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryProvider;

impl Provider for DirectoryProvider {
    fn id(&self) -> &str {
        "directory/local"
    }

    fn perform(&self, action: &Action, properties: &PropertyValues) -> Result<Mutation> {
        let path = Path::new(properties.require_str("path")?);
        let recursive = properties.bool("recursive").unwrap_or(false);

        match action.as_str() {
            "create" => create(path, recursive, properties.str("mode")),
            "delete" => delete(path, recursive),
            other => bail!("directory does not implement action {other}"),
        }
    }
}

fn create(path: &Path, recursive: bool, mode: Option<&str>) -> Result<Mutation> {
    let mut mutation = Mutation::NoChange;
    if path.exists() {
        if !path.is_dir() {
            bail!("{} exists and is not a directory", path.display());
        }
    } else {
        let created = if recursive {
            fs::create_dir_all(path)
        } else {
            fs::create_dir(path)
        };
        created.with_context(|| format!("Failed to create {}", path.display()))?;
        mutation = Mutation::Created;
    }

    if let Some(mode) = mode
        && apply_mode(path, mode)?
        && mutation == Mutation::NoChange
    {
        mutation = Mutation::Modified;
    }
    Ok(mutation)
}

fn delete(path: &Path, recursive: bool) -> Result<Mutation> {
    if !path.exists() {
        return Ok(Mutation::NoChange);
    }
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }

    let removed = if recursive {
        fs::remove_dir_all(path)
    } else {
        fs::remove_dir(path)
    };
    removed.with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(Mutation::Removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::Value;

    fn props(path: &Path, recursive: bool) -> PropertyValues {
        [
            ("path", Value::from(path.to_str().unwrap())),
            ("recursive", Value::from(recursive)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_create_needs_parent_unless_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let create = Action::from("create");

        assert!(DirectoryProvider.perform(&create, &props(&nested, false)).is_err());
        let mutation = DirectoryProvider.perform(&create, &props(&nested, true)).unwrap();
        assert_eq!(mutation, Mutation::Created);
        assert!(nested.is_dir());

        let again = DirectoryProvider.perform(&create, &props(&nested, true)).unwrap();
        assert_eq!(again, Mutation::NoChange);
    }

    #[test]
    fn test_delete_non_empty_requires_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cache");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("entry"), "x").unwrap();
        let delete = Action::from("delete");

        assert!(DirectoryProvider.perform(&delete, &props(&target, false)).is_err());
        let mutation = DirectoryProvider.perform(&delete, &props(&target, true)).unwrap();
        assert_eq!(mutation, Mutation::Removed);
        assert!(!target.exists());
    }

    #[test]
    fn test_file_in_the_way() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file");
        fs::write(&path, "x").unwrap();
        let err = DirectoryProvider
            .perform(&Action::from("create"), &props(&path, false))
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}

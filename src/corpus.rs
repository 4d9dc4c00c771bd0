//! Fixture corpus discovery.

use std::fs::{self, ReadDir};
use std::path::Path;

use jsonharness_core::Fixture;

use crate::error::{HarnessError, HarnessResult};

/// Recursively collect every regular file under `root` as a fixture.
///
/// Traversal order is whatever the filesystem yields; callers must not depend on it. Only an
/// unreadable `root` is an error. Subdirectories and entries that cannot be read are logged and
/// left out.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn scan(root: &Path) -> HarnessResult<Vec<Fixture>> {
    if !root.is_dir() {
        return Err(HarnessError::DirectoryNotFound(root.to_path_buf()));
    }

    let entries = fs::read_dir(root).map_err(|e| HarnessError::io(root, e))?;
    let mut fixtures = Vec::new();
    visit(entries, root, &mut fixtures);
    tracing::debug!(count = fixtures.len(), "scanned fixture corpus");
    Ok(fixtures)
}

fn walk(dir: &Path, fixtures: &mut Vec<Fixture>) {
    match fs::read_dir(dir) {
        Ok(entries) => visit(entries, dir, fixtures),
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory"),
    }
}

fn visit(entries: ReadDir, dir: &Path, fixtures: &mut Vec<Fixture>) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping entry of unknown type");
                continue;
            }
        };

        if file_type.is_dir() {
            walk(&path, fixtures);
        } else if file_type.is_file() {
            fixtures.push(Fixture::new(path));
        } else if file_type.is_symlink() && path.is_file() {
            // Symlinked fixtures count, symlinked directories are not followed
            fixtures.push(Fixture::new(path));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jsonharness_core::FixtureKind;

    #[test]
    fn test_missing_root_is_directory_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("tests");
        let err = scan(&missing).unwrap_err();
        assert!(matches!(err, HarnessError::DirectoryNotFound(p) if p == missing));
    }

    #[test]
    fn test_root_that_is_a_file_is_directory_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tests");
        fs::write(&file, "{}").unwrap();
        assert!(matches!(scan(&file), Err(HarnessError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_scan_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("y_empty_object.json"), "{}").unwrap();
        fs::write(root.join("n_trailing_comma.json"), r#"{"a":1,}"#).unwrap();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::write(root.join("nested/y_array.json"), "[]").unwrap();
        fs::write(root.join("nested/deeper/n_unclosed.json"), "[").unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();

        let mut names: Vec<_> = scan(root)
            .unwrap()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        // Order is unspecified
        names.sort();
        assert_eq!(
            names,
            ["n_trailing_comma.json", "n_unclosed.json", "y_array.json", "y_empty_object.json"]
        );
    }

    #[test]
    fn test_scanned_fixtures_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("n_bad.json"), "[1,]").unwrap();
        let fixtures = scan(dir.path()).unwrap();
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].kind(), FixtureKind::ExpectNonConformant);
        assert_eq!(fixtures[0].path(), dir.path().join("n_bad.json"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("y_top.json"), "{}").unwrap();
        let locked = root.join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("y_hidden.json"), "[]").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read it anyway
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = scan(root);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let names: Vec<_> = result.unwrap().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, ["y_top.json"]);
    }

    #[test]
    fn test_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan(dir.path()).unwrap().is_empty());
    }
}

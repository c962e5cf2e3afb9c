//! Filesystem utilities for quay.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Remove a file. No error if the file is absent.
///
/// Returns `true` when a file was actually removed.
///
/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool, UtilError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Write `contents` to `path` through a temporary sibling and a rename,
/// so readers never observe a half-written file.
///
/// # Errors
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), UtilError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".tmp-{}-{file_name}", std::process::id()));

    std::fs::write(&tmp_path, contents).map_err(|source| UtilError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;

    if let Err(source) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        });
    }
    Ok(())
}

/// List regular files directly inside `dir` whose names match the glob
/// `pattern` (e.g. `"*.whl"`), sorted by path.
///
/// A missing `dir` yields an empty list.
///
/// # Errors
/// Returns an error if the glob pattern is invalid.
pub fn list_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, UtilError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let escaped_dir = glob::Pattern::escape(&dir.display().to_string());
    let full_pattern = format!("{escaped_dir}/{pattern}");

    let mut paths: Vec<PathBuf> = glob::glob(&full_pattern)
        .map_err(|e| UtilError::GlobPattern {
            pattern: full_pattern.clone(),
            message: e.to_string(),
        })?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();

    paths.sort();
    Ok(paths)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b").join("c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn ensure_dir_existing_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        ensure_dir(tmp.path()).unwrap();
    }

    #[test]
    fn remove_file_if_exists_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("proj-1.0.tar.gz");
        fs::write(&file, b"x").unwrap();

        assert!(remove_file_if_exists(&file).unwrap());
        assert!(!file.exists());
    }

    #[test]
    fn remove_file_if_exists_absent_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!remove_file_if_exists(&tmp.path().join("missing")).unwrap());
    }

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".quay").join("build-record.toml");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = fs::read_dir(tmp.path().join(".quay"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn list_files_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b-1.0-py3-none-any.whl"), b"").unwrap();
        fs::write(tmp.path().join("a-1.0-py3-none-any.whl"), b"").unwrap();
        fs::write(tmp.path().join("a-1.0.tar.gz"), b"").unwrap();
        fs::create_dir(tmp.path().join("c.whl")).unwrap();

        let files = list_files(tmp.path(), "*.whl").unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a-1.0-py3-none-any.whl", "b-1.0-py3-none-any.whl"]);
    }

    #[test]
    fn list_files_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let files = list_files(&tmp.path().join("dist"), "*").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn list_files_dir_with_glob_chars() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("weird[dir]");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("x.whl"), b"").unwrap();

        assert_eq!(list_files(&dir, "*.whl").unwrap().len(), 1);
    }
}

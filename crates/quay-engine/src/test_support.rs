//! Scratch projects with stub tools for operation tests.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use quay_tools::{Tool, ToolLocator};

use crate::project::Context;

/// A manifest for `proj 2.3.1` with one console script.
pub(crate) const PROJ_MANIFEST: &str = r#"
[project]
name = "proj"
version = "2.3.1"
description = "A demo project"
readme = "README.md"
dependencies = ["requests>=2.31"]

[project.scripts]
proj = "proj.main:main"
"#;

/// A `poetry` stub whose `build` writes both artifacts of `proj 2.3.1`.
pub(crate) const POETRY_BUILDS_PROJ: &str = r#"
case "$1" in
  build)
    mkdir -p dist
    echo sdist > dist/proj-2.3.1.tar.gz
    echo wheel > dist/proj-2.3.1-py3-none-any.whl
    ;;
esac
"#;

/// A temporary project root plus a private `bin/` directory used as the
/// only tool search path.
pub(crate) struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    /// An empty project directory.
    pub(crate) fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("root")).unwrap();
        std::fs::create_dir(dir.path().join("bin")).unwrap();
        std::fs::create_dir(dir.path().join("logs")).unwrap();
        Self { dir }
    }

    /// A project directory holding `manifest` as its `pyproject.toml`.
    pub(crate) fn with_manifest(manifest: &str) -> Self {
        let sandbox = Self::empty();
        sandbox.write("pyproject.toml", manifest);
        sandbox
    }

    pub(crate) fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    /// Write a file relative to the project root, creating parents.
    pub(crate) fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Install a stub for `tool`. Every invocation appends its arguments to a
    /// per-tool log, then runs `body` as `sh`.
    pub(crate) fn stub(&self, tool: Tool, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = self.dir.path().join("bin").join(tool.program());
        let log = self.log_path(tool);
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\n{body}\n",
            log.display()
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Argument lines recorded by the stub for `tool`, one per invocation.
    pub(crate) fn calls(&self, tool: Tool) -> Vec<String> {
        std::fs::read_to_string(self.log_path(tool))
            .map(|s| s.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    fn log_path(&self, tool: Tool) -> PathBuf {
        self.dir
            .path()
            .join("logs")
            .join(format!("{}.log", tool.program()))
    }

    /// A context that only sees the sandbox's stubs.
    pub(crate) fn context(&self) -> Context {
        let tools = ToolLocator::default().with_search_path(self.dir.path().join("bin"));
        Context::new(self.root(), tools)
    }

    /// File names currently in `dist/`.
    pub(crate) fn dist_files(&self) -> Vec<String> {
        list_names(&self.root().join("dist"))
    }
}

fn list_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

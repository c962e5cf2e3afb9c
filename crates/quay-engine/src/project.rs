//! The project an operation acts on: its root, manifest and tool locator.

use std::path::{Path, PathBuf};

use quay_config::{Manifest, ProjectMetadata, MANIFEST_FILE, RECORD_PATH};
use quay_tools::ToolLocator;

use crate::error::EngineError;

/// Where an operation runs and how it finds its tools.
#[derive(Debug, Clone)]
pub struct Context {
    /// Project root (the directory holding `pyproject.toml`).
    pub root: PathBuf,
    /// Resolves Poetry, pipx and Ruff.
    pub tools: ToolLocator,
}

impl Context {
    /// A context rooted at `root` using `tools` for lookups.
    pub fn new(root: impl Into<PathBuf>, tools: ToolLocator) -> Self {
        Self {
            root: root.into(),
            tools,
        }
    }

    /// Path of the manifest, whether or not it exists.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Load and parse the manifest.
    ///
    /// # Errors
    /// Returns an error if the manifest is missing or cannot be parsed.
    pub fn load(&self) -> Result<Project, EngineError> {
        let manifest = Manifest::from_path(&self.manifest_path())?;
        Ok(Project {
            root: self.root.clone(),
            manifest,
        })
    }
}

/// A loaded project.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub manifest: Manifest,
}

impl Project {
    /// Validated project metadata.
    ///
    /// # Errors
    /// Returns an error if the name or version is missing or malformed.
    pub fn metadata(&self) -> Result<ProjectMetadata, EngineError> {
        Ok(self.manifest.metadata()?)
    }

    /// Output directory as configured (relative to the root unless absolute).
    pub fn dist_dir(&self) -> PathBuf {
        self.root.join(&self.manifest.settings().dist_dir)
    }

    /// The configured output directory when it differs from Poetry's default,
    /// for tools that must be told about it.
    pub fn custom_dist_dir(&self) -> Option<&Path> {
        let dir = Path::new(&self.manifest.settings().dist_dir);
        (dir != Path::new("dist")).then_some(dir)
    }

    /// Path of the build record.
    pub fn record_path(&self) -> PathBuf {
        self.root.join(RECORD_PATH)
    }

    /// Display a path relative to the project root when possible.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

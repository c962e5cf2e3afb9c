//! Resolved project metadata and Python distribution naming rules.

use std::path::PathBuf;
use std::str::FromStr;

use pep440_rs::Version;

use crate::manifest::{Manifest, ManifestError};

/// Project metadata with `[project]` taking precedence over `[tool.poetry]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    /// Name as declared.
    pub name: String,
    /// Parsed PEP 440 version.
    pub version: Version,
    /// One-line summary, if declared.
    pub description: Option<String>,
    /// Readme files, relative to the project root.
    pub readme: Vec<PathBuf>,
    /// Console script names.
    pub scripts: Vec<String>,
}

impl ProjectMetadata {
    /// PEP 503 normalized name (`Primitive_DB` becomes `primitive-db`).
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Name as it appears in artifact file names (`primitive_db`).
    pub fn escaped_name(&self) -> String {
        escape_name(&self.name)
    }

    /// Normalized version string as it appears in artifact file names.
    pub fn version_string(&self) -> String {
        self.version.to_string()
    }
}

impl Manifest {
    /// Resolve and validate the project's name and version.
    ///
    /// # Errors
    /// Returns an error if `name` or `version` is missing, the name is not a
    /// valid distribution name, or the version is not valid PEP 440.
    pub fn metadata(&self) -> Result<ProjectMetadata, ManifestError> {
        let project = self.project.as_ref();
        let poetry = self.tool.poetry.as_ref();

        let name = non_empty(project.and_then(|p| p.name.as_deref()))
            .or_else(|| non_empty(poetry.and_then(|p| p.name.as_deref())))
            .ok_or(ManifestError::MissingField { field: "name" })?;
        if !is_valid_name(name) {
            return Err(ManifestError::InvalidName {
                name: name.to_owned(),
            });
        }

        let raw_version = non_empty(project.and_then(|p| p.version.as_deref()))
            .or_else(|| non_empty(poetry.and_then(|p| p.version.as_deref())))
            .ok_or(ManifestError::MissingField { field: "version" })?;
        let version = parse_version(raw_version)?;

        let description = non_empty(project.and_then(|p| p.description.as_deref()))
            .or_else(|| non_empty(poetry.and_then(|p| p.description.as_deref())))
            .map(str::to_owned);

        let readme = project
            .and_then(|p| p.readme.as_ref())
            .or_else(|| poetry.and_then(|p| p.readme.as_ref()))
            .map(crate::manifest::Readme::files)
            .unwrap_or_default();

        Ok(ProjectMetadata {
            name: name.to_owned(),
            version,
            description,
            readme,
            scripts: self.script_names(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a PEP 440 version.
///
/// # Errors
/// Returns [`ManifestError::InvalidVersion`] if the string is not valid PEP 440.
pub fn parse_version(raw: &str) -> Result<Version, ManifestError> {
    Version::from_str(raw).map_err(|e| ManifestError::InvalidVersion {
        version: raw.to_owned(),
        message: e.to_string(),
    })
}

/// Whether `name` is a valid distribution name:
/// `^([A-Z0-9]|[A-Z0-9][A-Z0-9._-]*[A-Z0-9])$`, case-insensitive.
pub fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// PEP 503 normalization: lower-case, runs of `-`, `_`, `.` collapsed to `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for ch in name.chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(ch.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Artifact file-name form of a distribution name: normalized, with `_`
/// as the only separator.
pub fn escape_name(name: &str) -> String {
    normalize_name(name).replace('-', "_")
}

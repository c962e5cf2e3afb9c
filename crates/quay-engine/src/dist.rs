//! Distribution artifact names and output-directory scanning.
//!
//! Artifact file names follow the packaging conventions:
//! - sdist: `{name}-{version}.tar.gz`
//! - wheel: `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use pep440_rs::Version;
use quay_config::metadata::{is_valid_name, normalize_name};
use quay_config::{ArtifactKind, ProjectMetadata};

use crate::error::EngineError;

const SDIST_SUFFIX: &str = ".tar.gz";
const WHEEL_SUFFIX: &str = ".whl";

/// The parts encoded in an artifact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub kind: ArtifactKind,
    /// Distribution name as spelled in the file name.
    pub name: String,
    pub version: Version,
    /// Wheel build tag, if any.
    pub build: Option<String>,
    /// Wheel compatibility tags joined as `python-abi-platform`.
    pub tags: Option<String>,
}

impl ArtifactName {
    /// Whether this artifact belongs to the given project and version.
    pub fn matches(&self, meta: &ProjectMetadata) -> bool {
        self.is_version(&meta.version) && normalize_name(&self.name) == meta.normalized_name()
    }

    /// Whether the artifact is for `version`.
    pub fn is_version(&self, version: &Version) -> bool {
        &self.version == version
    }
}

/// Outcome of parsing a file name found in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedName {
    /// A well-formed sdist or wheel name.
    Artifact(ArtifactName),
    /// Has an artifact extension but a broken name.
    Malformed { reason: String },
    /// Not an artifact at all (e.g. `.gitignore`).
    Unrelated,
}

/// Parse an artifact file name.
pub fn parse_artifact_name(file_name: &str) -> ParsedName {
    if let Some(stem) = file_name.strip_suffix(WHEEL_SUFFIX) {
        parse_wheel(stem)
    } else if let Some(stem) = file_name.strip_suffix(SDIST_SUFFIX) {
        parse_sdist(stem)
    } else {
        ParsedName::Unrelated
    }
}

fn parse_wheel(stem: &str) -> ParsedName {
    let parts: Vec<&str> = stem.split('-').collect();
    let (name, version, build, tags) = match parts.as_slice() {
        [name, version, py, abi, plat] => (*name, *version, None, [*py, *abi, *plat]),
        [name, version, build, py, abi, plat] => {
            if !build.starts_with(|c: char| c.is_ascii_digit()) {
                return malformed(format!("wheel build tag `{build}` must start with a digit"));
            }
            (*name, *version, Some(*build), [*py, *abi, *plat])
        }
        _ => {
            return malformed(
                "wheel names need 5 or 6 dash-separated parts: name-version(-build)-python-abi-platform"
                    .to_owned(),
            )
        }
    };
    if tags.iter().any(|t| t.is_empty()) {
        return malformed("wheel compatibility tags must not be empty".to_owned());
    }
    finish(ArtifactKind::Wheel, name, version, build, Some(tags.join("-")))
}

fn parse_sdist(stem: &str) -> ParsedName {
    let Some((name, version)) = stem.rsplit_once('-') else {
        return malformed("sdist names need the form name-version.tar.gz".to_owned());
    };
    finish(ArtifactKind::Sdist, name, version, None, None)
}

fn finish(
    kind: ArtifactKind,
    name: &str,
    version: &str,
    build: Option<&str>,
    tags: Option<String>,
) -> ParsedName {
    if !is_valid_name(name) {
        return malformed(format!("`{name}` is not a valid distribution name"));
    }
    let Ok(version) = Version::from_str(version) else {
        return malformed(format!("`{version}` is not a valid version"));
    };
    ParsedName::Artifact(ArtifactName {
        kind,
        name: name.to_owned(),
        version,
        build: build.map(str::to_owned),
        tags,
    })
}

fn malformed(reason: String) -> ParsedName {
    ParsedName::Malformed { reason }
}

/// An artifact file found in the output directory.
#[derive(Debug, Clone)]
pub struct DistFile {
    pub path: PathBuf,
    pub file_name: String,
    pub parsed: ParsedName,
}

impl DistFile {
    /// The parsed name, if well-formed.
    pub fn artifact(&self) -> Option<&ArtifactName> {
        match &self.parsed {
            ParsedName::Artifact(a) => Some(a),
            _ => None,
        }
    }
}

/// List every file in the output directory with its parsed name, sorted by
/// file name. A missing directory yields nothing.
///
/// # Errors
/// Returns an error if the directory exists but cannot be read.
pub fn scan(dist_dir: &Path) -> Result<Vec<DistFile>, EngineError> {
    let files = quay_util::fs::list_files(dist_dir, "*")?;
    let mut out = Vec::with_capacity(files.len());
    for path in files {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
            tracing::debug!(path = %path.display(), "skipping non-UTF-8 file name");
            continue;
        };
        let parsed = parse_artifact_name(&file_name);
        out.push(DistFile {
            path,
            file_name,
            parsed,
        });
    }
    Ok(out)
}

/// Artifacts in the output directory that belong to this project version.
///
/// # Errors
/// Returns an error if the directory exists but cannot be read.
pub fn project_artifacts(
    dist_dir: &Path,
    meta: &ProjectMetadata,
) -> Result<Vec<DistFile>, EngineError> {
    Ok(scan(dist_dir)?
        .into_iter()
        .filter(|f| f.artifact().is_some_and(|a| a.matches(meta)))
        .collect())
}

/// Human-readable byte count (`512 B`, `12.3 KiB`, `4.0 MiB`).
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = "KiB";
    for next in UNITS.iter().skip(1) {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Location of the build record, relative to the project root.
pub const RECORD_PATH: &str = ".quay/build-record.toml";

/// Kind of distribution artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Source archive (`.tar.gz`).
    Sdist,
    /// Binary package (`.whl`).
    Wheel,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactKind::Sdist => "sdist",
            ArtifactKind::Wheel => "wheel",
        })
    }
}

/// The `.quay/build-record.toml` written after every successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub name: String,
    pub version: String,
    /// Seconds since the Unix epoch, e.g. "1708646400s-since-epoch".
    pub built_at: String,
    #[serde(default, rename = "artifact", skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<RecordedArtifact>,
}

/// One artifact produced by the recorded build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedArtifact {
    /// File name inside the output directory.
    pub file: String,
    pub kind: ArtifactKind,
    pub size: u64,
    pub sha256: String,
}

impl BuildRecord {
    /// Read the record at `path`, or `None` if no build has been recorded.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Option<Self>, RecordError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| RecordError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let record: BuildRecord = toml::from_str(&content).map_err(|e| RecordError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Some(record))
    }

    /// Write the record as TOML, atomically.
    ///
    /// # Errors
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<(), RecordError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| RecordError::Serialize { source: e })?;
        quay_util::fs::write_atomic(path, &content)?;
        Ok(())
    }

    /// Whether this record describes a build of `version`.
    ///
    /// Versions compare as normalized strings, which is how they appear in
    /// artifact names.
    pub fn is_for_version(&self, version: &str) -> bool {
        self.version == version
    }

    /// Look up an artifact by file name.
    pub fn find(&self, file: &str) -> Option<&RecordedArtifact> {
        self.artifacts.iter().find(|a| a.file == file)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid build record at {path}: {source} (delete it and rebuild)")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("cannot serialize build record: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("{0}")]
    Write(#[from] quay_util::error::UtilError),
}

//! Parse and validate `pyproject.toml` and quay's build record.

pub mod manifest;
pub mod metadata;
pub mod record;

pub use manifest::{Manifest, ManifestError, QuaySettings, MANIFEST_FILE};
pub use metadata::ProjectMetadata;
pub use record::{ArtifactKind, BuildRecord, RecordError, RECORD_PATH};

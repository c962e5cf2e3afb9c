//! Publish validation and the dry-run upload.
//!
//! Every local rule runs before Poetry is invoked, and all violations are
//! reported together. Poetry is always called with `--dry-run`.

use std::collections::BTreeMap;
use std::fmt;

use quay_config::metadata::normalize_name;
use quay_config::{ArtifactKind, BuildRecord, ProjectMetadata};
use quay_tools::{Tool, ToolCommand};

use crate::dist::{self, DistFile, ParsedName};
use crate::error::EngineError;
use crate::project::{Context, Project};

/// A local publish check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rule {
    ArtifactFilename,
    ArtifactProject,
    ArtifactDuplicate,
    ArtifactModified,
    MetadataDescription,
    MetadataReadme,
}

impl Rule {
    /// Stable identifier shown in reports.
    pub fn id(self) -> &'static str {
        match self {
            Rule::ArtifactFilename => "artifact-filename",
            Rule::ArtifactProject => "artifact-project",
            Rule::ArtifactDuplicate => "artifact-duplicate",
            Rule::ArtifactModified => "artifact-modified",
            Rule::MetadataDescription => "metadata-description",
            Rule::MetadataReadme => "metadata-readme",
        }
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule: Rule,
    /// File or metadata field the violation is about.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.rule.id(), self.subject, self.message)
    }
}

/// Options for `quay publish`.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Repository name configured in Poetry.
    pub repository: Option<String>,
    /// Arguments forwarded to `poetry publish`.
    pub extra_args: Vec<String>,
}

/// Result of a successful dry run.
#[derive(Debug)]
pub struct PublishResult {
    /// File names of the artifacts that were checked.
    pub artifacts: Vec<String>,
}

/// Validate the current version's artifacts, then run
/// `poetry publish --dry-run`.
///
/// Checks run in this order and stop at the first failing stage:
/// 1. Manifest and metadata are valid
/// 2. At least one artifact exists for this name and version
/// 3. Every local rule passes (all violations are collected)
/// 4. Poetry's own dry run succeeds
///
/// # Errors
/// Returns an error for invalid metadata, missing artifacts, any rule
/// violation, or a failing dry run. No upload ever happens.
pub fn publish(ctx: &Context, options: &PublishOptions) -> Result<PublishResult, EngineError> {
    let project = ctx.load()?;
    let meta = project.metadata()?;
    let dist_dir = project.dist_dir();
    let files = dist::scan(&dist_dir)?;

    let own: Vec<&DistFile> = files
        .iter()
        .filter(|f| f.artifact().is_some_and(|a| a.matches(&meta)))
        .collect();
    if own.is_empty() {
        return Err(EngineError::NoArtifacts {
            name: meta.name.clone(),
            version: meta.version_string(),
            dir: dist_dir.display().to_string(),
        });
    }

    let record = BuildRecord::from_path(&project.record_path())?;
    let violations = validate(&project, &meta, &files, record.as_ref())?;
    if !violations.is_empty() {
        return Err(EngineError::PublishRejected { violations });
    }

    let poetry = ctx.tools.locate(Tool::Poetry)?;
    eprintln!(
        "   Verifying {} artifact(s) for {} {} (dry run)",
        own.len(),
        meta.name,
        meta.version_string()
    );
    let cmd = ToolCommand::poetry_publish_dry_run(
        &poetry,
        project.custom_dist_dir(),
        options.repository.as_deref(),
    )
    .extra_args(&options.extra_args)
    .current_dir(&project.root);
    let code = quay_util::process::run_passthrough(&mut cmd.command())?;
    if code != 0 {
        return Err(EngineError::ToolFailed {
            tool: Tool::Poetry,
            command: cmd.display(),
            code,
        });
    }

    Ok(PublishResult {
        artifacts: own.iter().map(|f| f.file_name.clone()).collect(),
    })
}

/// Run every local rule over the output directory.
///
/// Only files for the project's current version are considered. A malformed
/// name is attributed to this version when it contains the version string.
///
/// # Errors
/// Returns an error if an artifact cannot be hashed.
pub fn validate(
    project: &Project,
    meta: &ProjectMetadata,
    files: &[DistFile],
    record: Option<&BuildRecord>,
) -> Result<Vec<Violation>, EngineError> {
    let version = meta.version_string();
    let mut violations = Vec::new();

    for file in files {
        match &file.parsed {
            ParsedName::Malformed { reason } if file.file_name.contains(&version) => {
                violations.push(Violation {
                    rule: Rule::ArtifactFilename,
                    subject: file.file_name.clone(),
                    message: reason.clone(),
                });
            }
            ParsedName::Artifact(a)
                if a.is_version(&meta.version)
                    && normalize_name(&a.name) != meta.normalized_name() =>
            {
                violations.push(Violation {
                    rule: Rule::ArtifactProject,
                    subject: file.file_name.clone(),
                    message: format!(
                        "belongs to `{}`, not `{}`",
                        normalize_name(&a.name),
                        meta.normalized_name()
                    ),
                });
            }
            _ => {}
        }
    }

    let own: Vec<&DistFile> = files
        .iter()
        .filter(|f| f.artifact().is_some_and(|a| a.matches(meta)))
        .collect();
    violations.extend(duplicates(&own));

    if let Some(record) = record.filter(|r| r.is_for_version(&version)) {
        for file in &own {
            if let Some(message) = modification(record, file)? {
                violations.push(Violation {
                    rule: Rule::ArtifactModified,
                    subject: file.file_name.clone(),
                    message,
                });
            }
        }
    } else {
        tracing::debug!("no build record for {version}; skipping modification check");
    }

    if meta.description.is_none() {
        violations.push(Violation {
            rule: Rule::MetadataDescription,
            subject: "description".to_owned(),
            message: "no summary declared (set `description` in [project] or [tool.poetry])"
                .to_owned(),
        });
    }

    for readme in &meta.readme {
        if !project.root.join(readme).is_file() {
            violations.push(Violation {
                rule: Rule::MetadataReadme,
                subject: readme.display().to_string(),
                message: "declared readme does not exist".to_owned(),
            });
        }
    }

    Ok(violations)
}

fn modification(record: &BuildRecord, file: &DistFile) -> Result<Option<String>, EngineError> {
    let Some(recorded) = record.find(&file.file_name) else {
        return Ok(Some(
            "not produced by the recorded build (rebuild with `quay build`)".to_owned(),
        ));
    };
    let actual = quay_util::hash::sha256_file(&file.path)?;
    if actual == recorded.sha256 {
        return Ok(None);
    }
    Ok(Some(format!(
        "sha256 {} does not match the build record ({})",
        short(&actual),
        short(&recorded.sha256)
    )))
}

fn duplicates(own: &[&DistFile]) -> Vec<Violation> {
    let mut groups: BTreeMap<(ArtifactKind, Option<&str>), Vec<&str>> = BTreeMap::new();
    for file in own {
        if let Some(a) = file.artifact() {
            groups
                .entry((a.kind, a.tags.as_deref()))
                .or_default()
                .push(file.file_name.as_str());
        }
    }
    groups
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|((kind, tags), names)| Violation {
            rule: Rule::ArtifactDuplicate,
            subject: names.join(", "),
            message: match tags {
                Some(tags) => format!("{} {kind}s share tags {tags}", names.len()),
                None => format!("{} {kind}s for one version", names.len()),
            },
        })
        .collect()
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

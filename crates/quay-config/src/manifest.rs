use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "pyproject.toml";

/// The `pyproject.toml` project manifest.
///
/// Only the tables quay reads are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// PEP 621 `[project]` table.
    #[serde(default)]
    pub project: Option<ProjectTable>,
    #[serde(default)]
    pub tool: ToolTables,
}

/// PEP 621 `[project]` metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectTable {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub readme: Option<Readme>,
    /// PEP 508 requirement strings.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Console scripts: name to `module:function`.
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolTables {
    pub poetry: Option<PoetryTable>,
    #[serde(default)]
    pub quay: QuaySettings,
}

/// Legacy `[tool.poetry]` metadata, used where `[project]` is silent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoetryTable {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub readme: Option<Readme>,
    /// Script values are either `"module:function"` or a table.
    #[serde(default)]
    pub scripts: BTreeMap<String, toml::Value>,
    /// Poetry constraint syntax (`^1.0`, tables), opaque to quay.
    #[serde(default)]
    pub dependencies: BTreeMap<String, toml::Value>,
}

/// `readme` accepts a path, a list of paths (Poetry), or a table (PEP 621).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Readme {
    Path(String),
    Paths(Vec<String>),
    Table {
        file: Option<String>,
        text: Option<String>,
    },
}

impl Readme {
    /// Files the readme refers to, relative to the project root.
    pub fn files(&self) -> Vec<PathBuf> {
        match self {
            Readme::Path(p) => vec![PathBuf::from(p)],
            Readme::Paths(ps) => ps.iter().map(PathBuf::from).collect(),
            Readme::Table { file, .. } => file.iter().map(PathBuf::from).collect(),
        }
    }
}

/// quay's own `[tool.quay]` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QuaySettings {
    /// Output directory for distribution artifacts, relative to the project root.
    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,
    /// Script run by `quay project` when none is given on the command line.
    #[serde(default)]
    pub entry_point: Option<String>,
    /// Paths handed to the linter.
    #[serde(default = "default_lint_paths")]
    pub lint_paths: Vec<String>,
}

impl Default for QuaySettings {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
            entry_point: None,
            lint_paths: default_lint_paths(),
        }
    }
}

fn default_dist_dir() -> String {
    "dist".to_owned()
}

fn default_lint_paths() -> Vec<String> {
    vec![".".to_owned()]
}

impl Manifest {
    /// Read and parse a `pyproject.toml` from the given path.
    ///
    /// # Errors
    /// Returns [`ManifestError::Missing`] if the file does not exist, or another
    /// error if it cannot be read or contains invalid TOML.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ManifestError::Missing {
                    path: path.display().to_string(),
                }
            } else {
                ManifestError::Read {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;
        Self::from_str_at(&content, path)
    }

    /// Parse manifest text; `path` is only used in error messages.
    ///
    /// # Errors
    /// Returns an error if the content is not valid TOML for this model.
    pub fn from_str_at(content: &str, path: &Path) -> Result<Self, ManifestError> {
        toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// The `[tool.quay]` settings (defaults when the table is absent).
    pub fn settings(&self) -> &QuaySettings {
        &self.tool.quay
    }

    /// Names of all declared console scripts, `[project.scripts]` first.
    pub fn script_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        if let Some(project) = &self.project {
            names.extend(project.scripts.keys().cloned());
        }
        if let Some(poetry) = &self.tool.poetry {
            for name in poetry.scripts.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Check every declared dependency before handing the manifest to the
    /// installer.
    ///
    /// PEP 621 entries must be valid PEP 508 requirements. Poetry entries are
    /// keyed by distribution name, so only the key is checked.
    ///
    /// # Errors
    /// Returns the first invalid dependency.
    pub fn validate_dependencies(&self) -> Result<(), ManifestError> {
        if let Some(project) = &self.project {
            for requirement in &project.dependencies {
                requirement
                    .parse::<pep508_rs::Requirement>()
                    .map_err(|e| ManifestError::InvalidDependency {
                        requirement: requirement.clone(),
                        message: e.to_string(),
                    })?;
            }
        }
        if let Some(poetry) = &self.tool.poetry {
            for name in poetry.dependencies.keys() {
                if name == "python" {
                    continue;
                }
                if !crate::metadata::is_valid_name(name) {
                    return Err(ManifestError::InvalidDependency {
                        requirement: name.clone(),
                        message: "not a valid distribution name".to_owned(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("no pyproject.toml found at {path}")]
    Missing { path: String },
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid pyproject.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("project metadata is missing `{field}` (set it in [project] or [tool.poetry])")]
    MissingField { field: &'static str },
    #[error("invalid project name \"{name}\": names must start and end with a letter or digit and contain only letters, digits, `.`, `_` and `-`")]
    InvalidName { name: String },
    #[error("invalid project version \"{version}\": {message}")]
    InvalidVersion { version: String, message: String },
    #[error("invalid dependency \"{requirement}\": {message}")]
    InvalidDependency { requirement: String, message: String },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Manifest {
        Manifest::from_str_at(content, Path::new("pyproject.toml")).unwrap()
    }

    #[test]
    fn parse_poetry_manifest() {
        let manifest = parse(
            r#"
[tool.poetry]
name = "primitive-db"
version = "0.1.0"
description = "A tiny table store"
authors = ["Ann <ann@example.com>"]
readme = "README.md"

[tool.poetry.dependencies]
python = "^3.11"
prompt = "^0.4.1"

[tool.poetry.scripts]
project = "primitive_db.main:main"
"#,
        );
        let poetry = manifest.tool.poetry.unwrap();
        assert_eq!(poetry.name.as_deref(), Some("primitive-db"));
        assert!(poetry.scripts.contains_key("project"));
        assert_eq!(poetry.readme, Some(Readme::Path("README.md".to_owned())));
        assert!(manifest.project.is_none());
    }

    #[test]
    fn parse_pep621_manifest() {
        let manifest = parse(
            r#"
[project]
name = "proj"
version = "2.3.1"
authors = [{ name = "Ann", email = "ann@example.com" }]
dynamic = ["classifiers"]
dependencies = ["A==1.0"]
readme = { file = "README.rst", content-type = "text/x-rst" }

[project.scripts]
proj = "proj.cli:main"
"#,
        );
        let project = manifest.project.unwrap();
        assert_eq!(project.dependencies, vec!["A==1.0"]);
        assert_eq!(
            project.readme.map(|r| r.files()),
            Some(vec![PathBuf::from("README.rst")])
        );
    }

    #[test]
    fn settings_default_when_absent() {
        let manifest = parse("[project]\nname = \"x\"\n");
        assert_eq!(manifest.settings(), &QuaySettings::default());
        assert_eq!(manifest.settings().dist_dir, "dist");
        assert_eq!(manifest.settings().lint_paths, vec!["."]);
        assert!(manifest.settings().entry_point.is_none());
    }

    #[test]
    fn settings_kebab_case_keys() {
        let manifest = parse(
            r#"
[tool.quay]
dist-dir = "out"
entry-point = "serve"
lint-paths = ["src", "tests"]
"#,
        );
        let settings = manifest.settings();
        assert_eq!(settings.dist_dir, "out");
        assert_eq!(settings.entry_point.as_deref(), Some("serve"));
        assert_eq!(settings.lint_paths, vec!["src", "tests"]);
    }

    #[test]
    fn script_names_merge_without_duplicates() {
        let manifest = parse(
            r#"
[project.scripts]
b = "m:b"

[tool.poetry.scripts]
a = "m:a"
b = "m:b"
c = { reference = "bin/c", type = "file" }
"#,
        );
        assert_eq!(manifest.script_names(), vec!["b", "a", "c"]);
    }

    #[test]
    fn readme_list_form() {
        let manifest = parse("[tool.poetry]\nreadme = [\"README.md\", \"CHANGES.md\"]\n");
        let readme = manifest
            .tool
            .poetry
            .and_then(|p| p.readme)
            .unwrap();
        assert_eq!(readme.files().len(), 2);
    }

    #[test]
    fn missing_file_is_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::from_path(&dir.path().join(MANIFEST_FILE))
            .unwrap_err();
        assert!(matches!(err, ManifestError::Missing { .. }));
        assert!(err.to_string().contains("no pyproject.toml"));
    }

    #[test]
    fn invalid_toml_reports_path() {
        let err = Manifest::from_str_at("[project\nname=", Path::new("/p/pyproject.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("/p/pyproject.toml"));
    }

    #[test]
    fn valid_dependencies_pass() {
        let manifest = parse(
            r#"
[project]
dependencies = ["A==1.0", "requests>=2.31; python_version >= '3.8'"]

[tool.poetry.dependencies]
python = "^3.11"
prompt = "^0.4.1"
"#,
        );
        assert!(manifest.validate_dependencies().is_ok());
    }

    #[test]
    fn malformed_pep508_dependency_rejected() {
        let manifest = parse("[project]\ndependencies = [\"A[extra\"]\n");
        let err = manifest
            .validate_dependencies()
            .unwrap_err();
        assert!(err.to_string().contains("A[extra"));
    }

    #[test]
    fn malformed_poetry_dependency_name_rejected() {
        let manifest = parse("[tool.poetry.dependencies]\n\"-bad-\" = \"^1\"\n");
        assert!(manifest.validate_dependencies().is_err());
    }
}

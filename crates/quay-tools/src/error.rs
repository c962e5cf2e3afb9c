//! Error types for quay-tools.

use std::path::PathBuf;

use crate::detect::Tool;

/// Errors produced by tool detection and invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool is not on `PATH` and no override is set.
    #[error("{tool} not found on PATH; install it ({hint}) or set {env_var} to its path")]
    NotFound {
        tool: Tool,
        hint: &'static str,
        env_var: &'static str,
    },

    /// An override variable points at a file that does not exist.
    #[error("{env_var} points to {path}, which does not exist")]
    OverrideMissing {
        env_var: &'static str,
        path: PathBuf,
    },

    /// The resolved binary lacks execute permission.
    #[error("{tool} found at {path} but is not executable; check file permissions")]
    NotExecutable { tool: Tool, path: PathBuf },

    /// `<tool> --version` printed nothing recognisable.
    #[error("cannot parse {tool} version from output: {output}")]
    VersionParse { tool: Tool, output: String },

    /// The tool could not be spawned.
    #[error("{0}")]
    Exec(#[from] quay_util::error::UtilError),
}

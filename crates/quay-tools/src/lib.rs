//! Discovery and invocation of the external tools quay drives:
//! Poetry, pipx and Ruff.

pub mod detect;
pub mod error;
pub mod invoke;

pub use detect::{Tool, ToolInfo, ToolLocator};
pub use error::ToolError;
pub use invoke::{parse_ruff_json, LintFinding, ToolCommand};

//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod analyze;
pub mod extract;
pub mod merge;
pub mod paths;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::model::{Graph, GraphDocument};

pub use analyze::run as analyze_run;
pub use extract::run as extract_run;
pub use merge::run as merge_run;
pub use paths::run as paths_run;

/// Pretty JSON to `output`, or stdout when no path is given.
pub(crate) fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialise output")?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
            }
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub(crate) fn load_graph(path: &Path) -> Result<Graph> {
    let document = GraphDocument::load(path)
        .with_context(|| format!("failed to load graph document {}", path.display()))?;
    Ok(document.to_graph())
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Optional `depgraph.toml` defaults, read from the build root and then the
/// current directory. CLI flags and environment variables always win over
/// whatever this file supplies.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub source_root: Option<PathBuf>,
    pub enterprise_source_root: Option<PathBuf>,
    pub ninja_path: Option<String>,
}

pub fn load(build_root: &Path) -> Result<FileConfig> {
    for candidate in [build_root.join("depgraph.toml"), PathBuf::from("depgraph.toml")] {
        if candidate.is_file() {
            let text = std::fs::read_to_string(&candidate)
                .with_context(|| format!("reading {}", candidate.display()))?;
            return toml::from_str(&text).with_context(|| format!("parsing {}", candidate.display()));
        }
    }
    Ok(FileConfig::default())
}

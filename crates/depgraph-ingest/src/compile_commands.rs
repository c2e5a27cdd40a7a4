use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{IngestError, Result};

/// A single entry of `compile_commands.json`. Only `directory` is used by the
/// rest of the pipeline (it seeds the set of directories link.txt/depend.make
/// files were produced from for a make-backed build); `file` and `command`
/// are kept for diagnostics but otherwise unused.
#[derive(Debug, Deserialize)]
pub struct CompileCommandEntry {
    pub directory: PathBuf,
    #[serde(default)]
    pub file: PathBuf,
    #[serde(default)]
    pub command: String,
}

/// Load `compile_commands.json` from the build root and return the set of
/// distinct `directory` values it lists.
pub fn load_compile_dirs(build_root: &Path) -> Result<HashSet<PathBuf>> {
    let path = build_root.join("compile_commands.json");
    let text = std::fs::read_to_string(&path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let entries: Vec<CompileCommandEntry> = serde_json::from_str(&text)
        .map_err(|e| IngestError::CompileCommands(path.display().to_string(), e))?;
    Ok(entries.into_iter().map(|e| e.directory).collect())
}

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{DiffOptions, Repository};

/// Resolve a rev-spec (`<rev>..<rev>` or a bare `<rev>`, diffed against the
/// working tree) into the set of absolute paths it touches. Mirrors the
/// original tool's `git diff --name-only` resolution, just through `git2`
/// instead of shelling out.
pub fn changed_files(repo_root: &Path, rev_spec: &str) -> Result<HashSet<PathBuf>> {
    let repo = Repository::discover(repo_root)
        .with_context(|| format!("no git repository found above {}", repo_root.display()))?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| anyhow::anyhow!("git repository at {} has no working directory", repo_root.display()))?
        .to_path_buf();

    let mut opts = DiffOptions::new();
    let diff = match rev_spec.split_once("..") {
        Some((from, to)) if !to.is_empty() => {
            let from_tree = repo
                .revparse_single(from)
                .and_then(|o| o.peel_to_tree())
                .with_context(|| format!("resolving git rev {from:?}"))?;
            let to_tree = repo
                .revparse_single(to)
                .and_then(|o| o.peel_to_tree())
                .with_context(|| format!("resolving git rev {to:?}"))?;
            repo.diff_tree_to_tree(Some(&from_tree), Some(&to_tree), Some(&mut opts))?
        }
        Some((from, _)) => {
            let from_tree = repo
                .revparse_single(from)
                .and_then(|o| o.peel_to_tree())
                .with_context(|| format!("resolving git rev {from:?}"))?;
            repo.diff_tree_to_workdir_with_index(Some(&from_tree), Some(&mut opts))?
        }
        None => {
            let tree = repo
                .revparse_single(rev_spec)
                .and_then(|o| o.peel_to_tree())
                .with_context(|| format!("resolving git rev {rev_spec:?}"))?;
            repo.diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?
        }
    };

    let mut files = HashSet::new();
    diff.foreach(
        &mut |delta, _progress| {
            if let Some(path) = delta.new_file().path() {
                files.insert(workdir.join(path));
            }
            if let Some(path) = delta.old_file().path() {
                files.insert(workdir.join(path));
            }
            true
        },
        None,
        None,
        None,
    )?;
    Ok(files)
}

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::Result;

/// Symbolic target names that never correspond one-to-one with an artifact
/// (e.g. a synthetic top-level aggregation target) and are dropped wherever
/// they appear, on either side of a dependency line.
pub const IGNORED_TARGET_NAMES: &[&str] = &["gen_version_info", "latest_symlink", "postgres"];

/// The coarse-grained target-to-target dependency graph, parsed from a flat
/// text listing (one line per target: `name : dep1;dep2;...`). Carries no
/// path information -- nodes here are bare symbolic names.
#[derive(Debug, Default, Clone)]
pub struct TargetGraph {
    deps: HashMap<String, HashSet<String>>,
    targets: HashSet<String>,
}

impl TargetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets(&self) -> impl Iterator<Item = &String> {
        self.targets.iter()
    }

    pub fn deps_of(&self, target: &str) -> Option<&HashSet<String>> {
        self.deps.get(target)
    }

    fn dep_set_of(&mut self, target: &str) -> &mut HashSet<String> {
        self.targets.insert(target.to_string());
        self.deps.entry(target.to_string()).or_default()
    }

    pub fn add_dependency(&mut self, from: &str, to: &str) {
        if IGNORED_TARGET_NAMES.contains(&from) || IGNORED_TARGET_NAMES.contains(&to) {
            return;
        }
        self.dep_set_of(from).insert(to.to_string());
        self.targets.insert(to.to_string());
    }

    /// Parse the flat `<target> : <dep>;<dep>;...` listing. Blank lines and
    /// `#`-comment lines are ignored; any other malformed line is a fatal
    /// parse error.
    pub fn parse_str(text: &str) -> Result<Self> {
        let mut graph = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, ':');
            let lhs = parts.next().unwrap_or_default().trim();
            let rhs = match parts.next() {
                Some(r) => r.trim(),
                None => continue,
            };
            if IGNORED_TARGET_NAMES.contains(&lhs) {
                continue;
            }
            let dep_set = graph.dep_set_of(lhs);
            for dep in rhs.split(';') {
                let dep = dep.trim();
                if dep.is_empty() || IGNORED_TARGET_NAMES.contains(&dep) {
                    continue;
                }
                dep_set.insert(dep.to_string());
            }
        }
        Ok(graph)
    }

    /// Transitive closure of `target`'s dependencies, excluding `target`
    /// itself, computed with an explicit worklist rather than recursion.
    pub fn recursive_deps(&self, target: &str) -> HashSet<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut result: HashSet<String> = HashSet::new();
        let mut worklist: VecDeque<String> = VecDeque::new();
        worklist.push_back(target.to_string());

        while let Some(cur) = worklist.pop_front() {
            if !visited.insert(cur.clone()) {
                continue;
            }
            if let Some(deps) = self.deps.get(&cur) {
                for dep in deps {
                    if cur != target || dep != target {
                        result.insert(dep.clone());
                    }
                    if !visited.contains(dep) {
                        worklist.push_back(dep.clone());
                    }
                }
            }
        }
        result.remove(target);
        result
    }
}

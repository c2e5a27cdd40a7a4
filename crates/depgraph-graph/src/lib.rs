//! The build-artifact dependency graph, its coarse-grained target-graph
//! counterpart, the matcher that links them, structural validators, and JSON
//! persistence of the artifact graph.

pub mod artifact_graph;
pub mod error;
pub mod matcher;
pub mod persistence;
pub mod target_graph;
pub mod validators;

pub use artifact_graph::{ArtifactGraph, ArtifactNode, NodeIndex};
pub use error::{GraphError, Result};
pub use matcher::{
    cmake_target_name, generation_target_name, infer_proto_generation_deps, match_targets,
    schema_target_name,
};
pub use target_graph::{TargetGraph, IGNORED_TARGET_NAMES};

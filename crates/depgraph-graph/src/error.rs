use thiserror::Error;

/// Structural errors from building, matching or validating the graph. All of
/// these are fatal in the taxonomy of SPEC_FULL.md §7 -- none are retried.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("cannot add a dependency from a node to itself: {0}")]
    SelfEdge(String),

    #[error("ambiguous nodes found for target '{target}': {candidates:?}")]
    AmbiguousTargetMatch {
        target: String,
        candidates: Vec<String>,
    },

    #[error("ambiguous reverse dependency while resolving {0}: {1:?}")]
    AmbiguousReverseDep(String, Vec<String>),

    #[error("circular dependency detected: {0}")]
    Cycle(String),

    #[error("path does not exist on disk: {0} (introduced by: {1})")]
    MissingArtifact(String, String),

    #[error("node not found by path: {0}")]
    NodeNotFound(String),

    #[error("protobuf dependency soundness check failed:\n{0}")]
    ProtoDependency(String),

    #[error("multiple .proto nodes share relative path '{0}': {1} and {2}")]
    DuplicateSchemaPath(String, String, String),

    #[error("schema file '{0}' has no generated .pb.h/.pb.cc counterpart")]
    MissingGeneratedPair(String),

    #[error("generated file(s) at '{0}' have no corresponding .proto file")]
    MissingSchemaFile(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse compile_commands.json at '{0}': {1}")]
    CompileCommands(String, serde_json::Error),

    #[error("could not parse line {line} of '{path}':\n{text}")]
    MalformedDependLine {
        path: String,
        line: usize,
        text: String,
    },

    #[error("dependency line in '{path}' lists a prerequisite before any dependent was seen: {text}")]
    OrphanDependency { path: String, text: String },

    #[error("multiple output paths for a single link command ('{first}' and '{second}'): {command}")]
    ConflictingLinkOutput {
        first: String,
        second: String,
        command: String,
    },

    #[error("ninja invocation failed: {0}")]
    NinjaFailed(String),

    #[error(transparent)]
    Graph(#[from] depgraph_graph::GraphError),

    #[error(transparent)]
    Core(#[from] depgraph_core::CoreError),
}

pub type Result<T> = std::result::Result<T, IngestError>;

use thiserror::Error;

/// Errors shared by every stage of the dependency graph pipeline: configuration
/// loading, path resolution, and the diagnostics that flow out of them.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot resolve relative dependent path: {0}")]
    UnresolvableDependent(String),

    #[error("directory does not exist, or is not a directory: {}", .0.display())]
    MissingDirectory(std::path::PathBuf),
}

pub type Result<T> = std::result::Result<T, CoreError>;

//! Shared primitives for the native build-artifact dependency graph: process
//! context, error types, node-kind classification, and path resolution. Every
//! other crate in the workspace depends on this one and nothing else in it.

pub mod context;
pub mod error;
pub mod node;
pub mod path_resolver;

pub use context::{BuildContext, ENTERPRISE_SOURCE_PREFIX, NINJA_MARKER_FILE};
pub use error::{CoreError, Result};
pub use node::{classify_path, NodeKind, NodeKindFilter};
pub use path_resolver::PathResolver;

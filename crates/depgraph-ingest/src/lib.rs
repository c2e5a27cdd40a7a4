//! Ingestors that populate an [`ArtifactGraph`] from build metadata:
//! `compile_commands.json`, `depend.make`/`ninja -t deps` output, `link.txt`/
//! `ninja -t commands` output, and a `.proto` discovery walk.

pub mod backend;
pub mod compile_commands;
pub mod depend;
pub mod error;
pub mod link;
pub mod ninja;
pub mod schema;

use depgraph_core::{BuildContext, PathResolver};
use depgraph_graph::ArtifactGraph;

pub use backend::{select_backend, BuildBackend, MakeBackend, NinjaBackend};
pub use error::{IngestError, Result};

/// Run the full ingestion pipeline against a fresh graph: pick the backend by
/// build-tree shape, ingest its link/compile metadata, then discover every
/// `.proto` schema file across the configured source roots.
pub fn ingest_build_metadata<'a>(
    ctx: &'a BuildContext,
    resolver: &PathResolver,
) -> Result<ArtifactGraph<'a>> {
    let mut graph = ArtifactGraph::new(ctx);
    let backend = select_backend(ctx);
    backend.ingest(&mut graph, ctx, resolver)?;
    schema::find_proto_files(&mut graph, ctx, resolver)?;
    Ok(graph)
}

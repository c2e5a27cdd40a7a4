use depgraph_core::{BuildContext, PathResolver};
use depgraph_graph::ArtifactGraph;
use ignore::WalkBuilder;

use crate::error::{IngestError, Result};
use crate::{depend, link, ninja};

/// Ingests build metadata (link commands and compile-time header
/// dependencies) into the artifact graph. Ninja and recursive-make projects
/// expose this information through entirely different file layouts, so the
/// two backends are kept as separate implementations behind one trait.
pub trait BuildBackend {
    fn ingest(&self, graph: &mut ArtifactGraph, ctx: &BuildContext, resolver: &PathResolver) -> Result<()>;
}

pub struct NinjaBackend;

impl BuildBackend for NinjaBackend {
    fn ingest(&self, graph: &mut ArtifactGraph, ctx: &BuildContext, resolver: &PathResolver) -> Result<()> {
        let (commands_path, deps_path) = ninja::collect_ninja_metadata(ctx)?;
        link::parse_link_txt_file(&commands_path, graph, resolver, ctx, true)?;
        depend::parse_depend_file(&deps_path, graph, resolver)?;
        Ok(())
    }
}

pub struct MakeBackend;

impl BuildBackend for MakeBackend {
    fn ingest(&self, graph: &mut ArtifactGraph, ctx: &BuildContext, resolver: &PathResolver) -> Result<()> {
        tracing::info!(build_root = %ctx.build_root.display(), "parsing link.txt and depend.make files");
        let walker = WalkBuilder::new(&ctx.build_root).hidden(false).build();
        let mut num_parsed = 0u64;
        for entry in walker {
            let entry = entry.map_err(|e| IngestError::Io {
                path: ctx.build_root.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })?;
            match entry.path().file_name().and_then(|n| n.to_str()) {
                Some("depend.make") => {
                    depend::parse_depend_file(entry.path(), graph, resolver)?;
                    num_parsed += 1;
                }
                Some("link.txt") => {
                    link::parse_link_txt_file(entry.path(), graph, resolver, ctx, false)?;
                    num_parsed += 1;
                }
                _ => {}
            }
        }
        tracing::info!(num_parsed, "finished parsing make build metadata");
        Ok(())
    }
}

/// Select the ingestion back end by the presence of `build.ninja` in the
/// build root.
pub fn select_backend(ctx: &BuildContext) -> Box<dyn BuildBackend> {
    if ctx.is_ninja_build_root() {
        Box::new(NinjaBackend)
    } else {
        Box::new(MakeBackend)
    }
}

use std::path::{Path, PathBuf};
use std::process::Command;

use depgraph_core::BuildContext;

use crate::error::{IngestError, Result};

/// Run `<ninja> -t <tool>` in the build root and write its stdout to
/// `output_file`. `ctx.ninja_path` already reflects the `YB_NINJA_PATH`
/// environment override, if any.
fn run_ninja_tool(ctx: &BuildContext, tool: &str, output_file: &Path) -> Result<()> {
    tracing::info!(tool, ninja = %ctx.ninja_path, "running ninja introspection tool");
    let output = Command::new(&ctx.ninja_path)
        .arg("-t")
        .arg(tool)
        .current_dir(&ctx.build_root)
        .output()
        .map_err(|e| IngestError::NinjaFailed(format!("failed to spawn '{}': {e}", ctx.ninja_path)))?;

    if !output.status.success() {
        return Err(IngestError::NinjaFailed(format!(
            "'{} -t {tool}' exited with {}: {}",
            ctx.ninja_path,
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    std::fs::write(output_file, output.stdout).map_err(|source| IngestError::Io {
        path: output_file.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Invoke `ninja -t commands` and `ninja -t deps`, returning the paths to the
/// two generated metadata files for [`crate::link::parse_link_txt_file`] and
/// [`crate::depend::parse_depend_file`] to consume.
pub fn collect_ninja_metadata(ctx: &BuildContext) -> Result<(PathBuf, PathBuf)> {
    let commands_path = ctx.build_root.join("ninja_commands.txt");
    run_ninja_tool(ctx, "commands", &commands_path)?;

    let deps_path = ctx.build_root.join("ninja_deps.txt");
    run_ninja_tool(ctx, "deps", &deps_path)?;

    Ok((commands_path, deps_path))
}

//! Module dependency graph: a script run by the scripting interpreter prints
//! the graph in dot format, and the layout tool renders it.

use std::path::Path;

use nightly_core::NightlyConfig;
use tracing::warn;

use crate::runner::CiRunner;
use crate::stage::StageConfig;

pub const GRAPH_PNG: &str = "cdkdep.png";
pub const GRAPH_PS: &str = "cdkdep.ps";

/// Scratch file, in the log directory, holding the dot source.
const DOT_SOURCE: &str = "cdkdep.dot";

/// Render the dependency graph into `site`.
///
/// Returns `false` when the auxiliary libraries are missing or any step
/// fails; the page then has no graph row.
pub async fn generate(config: &NightlyConfig, site: &Path) -> anyhow::Result<bool> {
    let Some(classpath) = config.depgraph_classpath() else {
        warn!("interpreter or graph library not found, skipping dependency graph");
        return Ok(false);
    };

    let script = config.layout.depgraph_script.to_string_lossy().into_owned();
    let source = StageConfig::custom(
        "depgraph".to_string(),
        vec![
            config.commands.java.clone(),
            "-cp".to_string(),
            classpath,
            "bsh.Interpreter".to_string(),
            script,
        ],
        DOT_SOURCE.to_string(),
        config.timeout_secs,
    )
    .stdout_only();
    let result = CiRunner::execute_stage(&source, &config.source_dir, &config.log_dir).await?;

    let mut rendered = result.passed();
    if rendered {
        for (format, output) in [("-Tpng", GRAPH_PNG), ("-Tps", GRAPH_PS)] {
            let render = StageConfig::custom(
                format!("dot {format}"),
                vec![
                    config.commands.dot.clone(),
                    format.to_string(),
                    result.log_path.to_string_lossy().into_owned(),
                    "-o".to_string(),
                    site.join(output).to_string_lossy().into_owned(),
                ],
                "dot.log".to_string(),
                config.timeout_secs,
            );
            let drawn = CiRunner::execute_stage(&render, &config.source_dir, &config.log_dir).await?;
            rendered &= drawn.passed();
        }
    } else {
        warn!(outcome = ?result.outcome, "dependency graph script failed");
    }

    if let Err(e) = std::fs::remove_file(&result.log_path) {
        warn!(error = %e, "could not remove dot scratch file");
    }
    Ok(rendered)
}

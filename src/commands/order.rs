// ABOUTME: Order command implementation.
// ABOUTME: Prints the strategies a dispatch would try, highest priority first.

use super::runtime_connection::{build_order, connect_to_runtime};
use hotpatch::build::{StrategyKind, UpdateMode};
use hotpatch::config::Project;
use hotpatch::error::Result;
use hotpatch::output::Output;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct OrderSummary {
    environment: String,
    runtime: Option<String>,
    mode: UpdateMode,
    strategies: Vec<StrategyKind>,
}

pub async fn order(dir: &Path, mode: Option<UpdateMode>, output: Output) -> Result<()> {
    let project = Project::discover(dir)?;
    let runtime = connect_to_runtime(&project, &output).await;
    let (env, mode, order) = build_order(&project, runtime, mode)?;

    let summary = OrderSummary {
        environment: env.deploy.to_string(),
        runtime: env.runtime.map(|r| r.to_string()),
        mode,
        strategies: order.kinds(),
    };

    for (i, kind) in summary.strategies.iter().enumerate() {
        output.progress(&format!("  {}. {}", i + 1, kind));
    }

    let names: Vec<String> = summary.strategies.iter().map(|k| k.to_string()).collect();
    output.report(
        &format!(
            "Build order ({}, {} mode): {}",
            summary.environment,
            summary.mode,
            names.join(" → ")
        ),
        &summary,
    );
    Ok(())
}

// ABOUTME: Check command implementation.
// ABOUTME: Evaluates hotpatch.yml, converting every live_update and checking no step went unused.

use hotpatch::config::Project;
use hotpatch::error::Result;
use hotpatch::output::Output;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct TargetSummary {
    name: String,
    workload: String,
    live_update_steps: Option<usize>,
    image: Option<String>,
    compose_service: Option<String>,
}

pub fn check(dir: &Path, output: Output) -> Result<()> {
    let project = Project::discover(dir)?;

    let summaries: Vec<TargetSummary> = project
        .targets
        .iter()
        .map(|t| TargetSummary {
            name: t.name.to_string(),
            workload: t.workload.to_string(),
            live_update_steps: t.live_update.as_ref().map(|lu| lu.steps().len()),
            image: t.image.as_ref().map(|i| i.repository.to_string()),
            compose_service: t.compose_service.clone(),
        })
        .collect();

    for summary in &summaries {
        let mut parts = Vec::new();
        if let Some(n) = summary.live_update_steps {
            parts.push(format!("live_update ({} steps)", n));
        }
        if let Some(ref image) = summary.image {
            parts.push(format!("image {}", image));
        }
        if let Some(ref service) = summary.compose_service {
            parts.push(format!("compose service {}", service));
        }
        output.progress(&format!(
            "  {} ({}): {}",
            summary.name,
            summary.workload,
            parts.join(", ")
        ));
    }

    output.report(
        &format!("Configuration OK: {} target(s)", summaries.len()),
        &summaries,
    );
    Ok(())
}

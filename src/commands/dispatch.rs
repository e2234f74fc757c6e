// ABOUTME: Dispatch command implementation.
// ABOUTME: Sends one change through the strategy chain; Ctrl-C cancels between steps.

use super::runtime_connection::{build_order, connect_to_runtime};
use hotpatch::build::{CompositeBuildAndDeployer, Deployed, UpdateMode};
use hotpatch::config::Project;
use hotpatch::error::{Error, Result};
use hotpatch::output::Output;
use hotpatch::types::ChangeSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

pub async fn dispatch(
    dir: &Path,
    target_name: &str,
    paths: Vec<PathBuf>,
    mode: Option<UpdateMode>,
    mut output: Output,
) -> Result<()> {
    if paths.is_empty() {
        return Err(Error::NoChanges);
    }
    output.start_timer();

    let project = Project::discover(dir)?;
    let target = project
        .target(target_name)
        .ok_or_else(|| Error::UnknownTarget(target_name.to_string()))?;

    let changes: ChangeSet = paths
        .into_iter()
        .map(|p| if p.is_absolute() { p } else { dir.join(p) })
        .collect();

    let runtime = connect_to_runtime(&project, &output).await;
    let (_, mode, order) = build_order(&project, runtime, mode)?;
    output.progress(&format!(
        "Updating {} ({} changed file(s), {} mode)",
        target.name,
        changes.len(),
        mode
    ));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling after the current step");
            on_interrupt.cancel();
        }
    });

    // One dispatch per process; a long-lived caller would share a TargetLocks.
    let report = CompositeBuildAndDeployer::new(order)
        .dispatch(&cancel, target, &changes)
        .await?;

    for redirect in &report.redirects {
        output.progress(&format!("  → {} skipped: {}", redirect.strategy, redirect.reason));
    }

    let what = match report.outcome.deployed {
        Deployed::Container(ref id) => format!("patched container {}", id.short()),
        Deployed::Image(ref image) => format!("deployed {}", image),
        Deployed::ComposeService(ref service) => format!("rebuilt service {}", service),
    };
    output.report(
        &format!(
            "{} updated via {}: {}",
            target.name, report.outcome.strategy, what
        ),
        &report,
    );
    Ok(())
}

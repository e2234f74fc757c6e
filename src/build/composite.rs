// ABOUTME: Dispatches one change through the build order until a strategy handles it.
// ABOUTME: Redirects advance to the next strategy; fatal errors and cancellation stop the walk.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::order::BuildOrder;
use super::result::{BuildError, BuildOutcome, BuildResult, RedirectReason, StrategyKind};
use super::target::BuildTarget;
use crate::types::{ChangeSet, TargetName};

/// A strategy that declined the change, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectRecord {
    pub strategy: StrategyKind,
    #[serde(flatten)]
    pub reason: RedirectReason,
}

impl fmt::Display for RedirectRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.strategy, self.reason)
    }
}

/// `"; after: a (why), b (why)"`, or nothing when no strategy redirected.
fn redirect_chain(redirects: &[RedirectRecord]) -> String {
    if redirects.is_empty() {
        return String::new();
    }
    let chain: Vec<String> = redirects.iter().map(ToString::to_string).collect();
    format!("; after: {}", chain.join(", "))
}

/// A successful dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub outcome: BuildOutcome,
    /// Strategies that declined before the one that succeeded, in order.
    pub redirects: Vec<RedirectRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("every strategy declined {target}; last was {strategy}: {reason}{}", redirect_chain(.redirects))]
    AllDeclined {
        target: TargetName,
        strategy: StrategyKind,
        reason: RedirectReason,
        redirects: Vec<RedirectRecord>,
    },

    #[error("{strategy} failed for {target}: {source}{}", redirect_chain(.redirects))]
    Fatal {
        target: TargetName,
        strategy: StrategyKind,
        #[source]
        source: BuildError,
        redirects: Vec<RedirectRecord>,
    },

    /// Cancelled; safe to retry later. `strategy` is the one running when it happened.
    #[error(
        "update of {target} cancelled{}{}",
        .strategy.map(|s| format!(" during {}", s)).unwrap_or_default(),
        redirect_chain(.redirects)
    )]
    Cancelled {
        target: TargetName,
        strategy: Option<StrategyKind>,
        redirects: Vec<RedirectRecord>,
    },
}

impl DispatchError {
    /// The strategy attempted last, if any ran.
    pub fn last_strategy(&self) -> Option<StrategyKind> {
        match self {
            DispatchError::AllDeclined { strategy, .. } | DispatchError::Fatal { strategy, .. } => {
                Some(*strategy)
            }
            DispatchError::Cancelled { strategy, .. } => *strategy,
        }
    }

    /// Redirects that happened before the dispatch ended.
    pub fn redirects(&self) -> &[RedirectRecord] {
        match self {
            DispatchError::AllDeclined { redirects, .. }
            | DispatchError::Fatal { redirects, .. }
            | DispatchError::Cancelled { redirects, .. } => redirects,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled { .. })
    }
}

/// Where a dispatch is in its walk over the build order.
enum DispatchState {
    Pending(usize),
    Done(BuildOutcome),
    Failed(DispatchError),
}

/// Tries each strategy of a [`BuildOrder`] in turn.
#[derive(Debug, Clone)]
pub struct CompositeBuildAndDeployer {
    order: BuildOrder,
}

impl CompositeBuildAndDeployer {
    pub fn new(order: BuildOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &BuildOrder {
        &self.order
    }

    /// Update `target` for `changes`.
    ///
    /// Strategies run strictly one after another and are never retried.
    pub async fn dispatch(
        &self,
        cancel: &CancellationToken,
        target: &BuildTarget,
        changes: &ChangeSet,
    ) -> Result<DispatchReport, DispatchError> {
        let started_at = Utc::now();
        let mut redirects: Vec<RedirectRecord> = Vec::new();
        let mut state = DispatchState::Pending(0);

        tracing::info!(
            target = %target.name,
            changes = changes.len(),
            order = ?self.order,
            "dispatching update"
        );

        loop {
            state = match state {
                DispatchState::Pending(index) => {
                    self.attempt(index, cancel, target, changes, &mut redirects)
                        .await
                }
                DispatchState::Done(outcome) => {
                    tracing::info!(
                        target = %target.name,
                        strategy = %outcome.strategy,
                        redirects = redirects.len(),
                        "update succeeded"
                    );
                    return Ok(DispatchReport {
                        outcome,
                        redirects,
                        started_at,
                        finished_at: Utc::now(),
                    });
                }
                DispatchState::Failed(err) => {
                    tracing::debug!(target = %target.name, error = %err, "update failed");
                    return Err(err);
                }
            };
        }
    }

    async fn attempt(
        &self,
        index: usize,
        cancel: &CancellationToken,
        target: &BuildTarget,
        changes: &ChangeSet,
        redirects: &mut Vec<RedirectRecord>,
    ) -> DispatchState {
        if cancel.is_cancelled() {
            tracing::debug!(target = %target.name, index, "cancelled before strategy");
            return DispatchState::Failed(DispatchError::Cancelled {
                target: target.name.clone(),
                strategy: None,
                redirects: std::mem::take(redirects),
            });
        }

        let strategy = &self.order.strategies()[index];
        let kind = strategy.kind();

        let result = if strategy.can_apply(target, changes) {
            tracing::info!(target = %target.name, strategy = %kind, "trying strategy");
            strategy.build_and_deploy(cancel, target, changes).await
        } else {
            BuildResult::Redirect(RedirectReason::not_applicable(format!(
                "{} cannot handle this change",
                kind
            )))
        };

        match result {
            BuildResult::Success(outcome) => DispatchState::Done(outcome),
            BuildResult::Redirect(reason) => {
                tracing::warn!(target = %target.name, strategy = %kind, %reason, "strategy redirected");
                if index + 1 < self.order.len() {
                    redirects.push(RedirectRecord {
                        strategy: kind,
                        reason,
                    });
                    DispatchState::Pending(index + 1)
                } else {
                    DispatchState::Failed(DispatchError::AllDeclined {
                        target: target.name.clone(),
                        strategy: kind,
                        reason,
                        redirects: std::mem::take(redirects),
                    })
                }
            }
            BuildResult::Fatal(source) if source.is_cancelled() => {
                tracing::debug!(target = %target.name, strategy = %kind, %source, "strategy cancelled");
                DispatchState::Failed(DispatchError::Cancelled {
                    target: target.name.clone(),
                    strategy: Some(kind),
                    redirects: std::mem::take(redirects),
                })
            }
            BuildResult::Fatal(source) => DispatchState::Failed(DispatchError::Fatal {
                target: target.name.clone(),
                strategy: kind,
                source,
                redirects: std::mem::take(redirects),
            }),
        }
    }
}

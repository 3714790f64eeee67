//! The periodic merge-conflict sweep.
//!
//! Webhooks only fire when a PR changes, but a merge conflict can appear
//! because *another* PR landed. The sweep walks every open pull request on
//! an interval and applies the same conflict reconciliation the webhook
//! path uses.

use crate::caching::ScopeId;
use crate::error::{Error, Result};
use crate::hooks::reconcile_conflict_state;
use crate::service::Service;

/// The result of one sweep pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Open PRs examined.
    pub checked: usize,
    /// PRs skipped because GitHub had not computed their mergeability within
    /// the retry budget. They get picked up on the next pass.
    pub skipped: usize,
    /// PRs that failed to process for other reasons (logged, not fatal).
    pub failed: usize,
}

/// Runs one sweep over all open pull requests of the configured repository.
///
/// All fetches share one sweep-wide scope, so a PR's issue or labels are
/// only fetched once even if the listing paginates strangely. Individual PR
/// failures are logged and counted, never abort the pass.
pub async fn sweep_once(service: &Service) -> Result<SweepReport> {
    let Some(repo) = service.github_config().repo.as_deref() else {
        return Err(Error::Payload("github.repo"));
    };

    let scope = ScopeId::random();
    let gh = service.gh();

    let list_url = format!("/repos/{repo}/pulls?sort=updated");
    let prs = service
        .retry()
        .run_all_retryable(|| async { gh.get_paginated(&list_url).await })
        .await?;

    let mut report = SweepReport::default();

    for pr in &prs {
        let Some(pr_url) = pr["url"].as_str() else {
            continue;
        };
        report.checked += 1;

        let pr = match gh
            .item_when(service.cache(), &scope, pr_url, |pr| {
                !pr["mergeable"].is_null()
            })
            .await
        {
            Ok(pr) => pr,
            Err(Error::NotReady) => {
                // Mergeability still unknown; leave it for the next pass.
                report.skipped += 1;
                continue;
            }
            Err(err) => {
                tracing::warn!(pr = pr_url, error = %err, "failed to fetch pull request");
                report.failed += 1;
                continue;
            }
        };

        if let Err(err) = reconcile_conflict_state(service, &scope, &pr).await {
            tracing::warn!(pr = pr_url, error = %err, "failed to reconcile conflict state");
            report.failed += 1;
        }
    }

    tracing::info!(
        repo,
        checked = report.checked,
        skipped = report.skipped,
        failed = report.failed,
        "conflict sweep finished"
    );

    Ok(report)
}

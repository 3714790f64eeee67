use async_trait::async_trait;
use serde_json::{Value, json};

use crate::caching::ScopeId;
use crate::error::Result;
use crate::event::WebhookEvent;
use crate::service::Service;

use super::{Hook, strip_uri_template};

/// The label marking conflicted pull requests.
pub(crate) const CONFLICT_LABEL: &str = "needs rebase or merge";

const MESSAGE: &str = "\
Hello!

I am an automated bot and I have noticed that this pull request is not \
currently able to be merged. If you are able to either merge the ``master`` \
branch into this pull request or rebase this pull request against ``master`` \
then it will eligible for code review and hopefully merging!";

const ACTIONS: &[&str] = &["opened", "reopened", "synchronize"];

/// What [`reconcile_conflict_state`] did to a pull request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictStatus {
    /// The PR is mergeable again; the conflict label was removed.
    Cleared,
    /// The PR has a conflict; it was labeled and commented on.
    Marked,
    /// Labeling already reflected the mergeable state.
    Unchanged,
}

/// Brings the conflict label in line with the PR's mergeable state.
///
/// Expects a PR body whose `mergeable` field is already computed (not null);
/// callers gate on that with a success condition when fetching.
pub(crate) async fn reconcile_conflict_state(
    service: &Service,
    scope: &ScopeId,
    pr: &Value,
) -> Result<ConflictStatus> {
    let gh = service.gh();
    let cache = service.cache();

    let issue = gh
        .item(cache, scope, pr["issue_url"].as_str().unwrap_or_default())
        .await?;
    let labels_url = strip_uri_template(issue["labels_url"].as_str().unwrap_or_default());
    let labels = gh.item(cache, scope, labels_url).await?;

    let labeled = labels
        .as_array()
        .into_iter()
        .flatten()
        .any(|label| label["name"] == CONFLICT_LABEL);
    let mergeable = pr["mergeable"].as_bool().unwrap_or(false);

    let status = if mergeable && labeled {
        // The conflict is resolved, take the label back off.
        gh.delete_label(labels_url, CONFLICT_LABEL).await?;
        ConflictStatus::Cleared
    } else if !mergeable && !labeled {
        gh.post(
            issue["comments_url"].as_str().unwrap_or_default(),
            &json!({ "body": MESSAGE }),
        )
        .await?;
        gh.post(labels_url, &json!([CONFLICT_LABEL])).await?;
        ConflictStatus::Marked
    } else {
        ConflictStatus::Unchanged
    };

    tracing::info!(
        pr = pr["number"].as_u64().unwrap_or_default(),
        mergeable,
        ?status,
        "reconciled conflict state"
    );

    Ok(status)
}

/// Labels pull requests that have merge conflicts and comments with
/// instructions, clearing the label once the conflict is resolved.
#[derive(Debug)]
pub struct MergeConflictHook;

#[async_trait]
impl Hook for MergeConflictHook {
    fn name(&self) -> &'static str {
        "merge-conflict"
    }

    fn matches(&self, event: &WebhookEvent) -> bool {
        event.name == "pull_request"
            && event.action().is_some_and(|action| ACTIONS.contains(&action))
    }

    async fn run(&self, service: &Service, event: &WebhookEvent) -> Result<()> {
        let scope = &event.delivery;

        // GitHub computes mergeability lazily; retry the fetch until the
        // field is filled in.
        let pr = service
            .gh()
            .item_when(
                service.cache(),
                scope,
                event.url("pull_request", "url")?,
                |pr| !pr["mergeable"].is_null(),
            )
            .await?;

        reconcile_conflict_state(service, scope, &pr).await?;
        Ok(())
    }
}

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use crate::diff;
use crate::error::Result;
use crate::event::WebhookEvent;
use crate::service::Service;

use super::{Hook, strip_uri_template};

/// The commit status context the news check reports under.
const NEWS_FILE_CONTEXT: &str = "news-file/pr";

/// Where the failure status points contributors for help.
const HELP_URL: &str = "https://pip.pypa.io/en/latest/development/#adding-a-news-entry";

const ACTIONS: &[&str] = &["labeled", "unlabeled", "opened", "reopened", "synchronize"];

static NEWS_FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"news/[^\./]+\.(removal|feature|bugfix|doc|vendor|trivial)$").unwrap()
});

/// Checks that a pull request adds a news fragment (or is labeled trivial)
/// and reports the result as a commit status.
#[derive(Debug)]
pub struct NewsFileHook;

#[async_trait]
impl Hook for NewsFileHook {
    fn name(&self) -> &'static str {
        "news-file"
    }

    fn matches(&self, event: &WebhookEvent) -> bool {
        event.name == "pull_request"
            && event.action().is_some_and(|action| ACTIONS.contains(&action))
    }

    async fn run(&self, service: &Service, event: &WebhookEvent) -> Result<()> {
        let gh = service.gh();
        let cache = service.cache();
        let scope = &event.delivery;

        // Fetch the PR and its labels fresh from the API; the delivered
        // payload may be stale by the time we process it.
        let pr = gh.item(cache, scope, event.url("pull_request", "url")?).await?;
        let issue = gh
            .item(cache, scope, pr["issue_url"].as_str().unwrap_or_default())
            .await?;
        let labels = gh
            .item(
                cache,
                scope,
                strip_uri_template(issue["labels_url"].as_str().unwrap_or_default()),
            )
            .await?;

        let label_names: Vec<&str> = labels
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|label| label["name"].as_str())
            .collect();

        let diff_text = gh
            .get_text(pr["diff_url"].as_str().unwrap_or_default())
            .await?;
        let files = diff::scan(&diff_text);

        let has_fragment = files
            .iter()
            .any(|file| !file.is_removed && NEWS_FRAGMENT_RE.is_match(&file.path));
        let satisfied = label_names.contains(&"trivial") || has_fragment;

        let (state, description) = if satisfied {
            ("success", "News files updated and/or change is trivial.")
        } else {
            ("failure", "Missing either a news entry or a trivial file/label.")
        };

        gh.post(
            pr["statuses_url"].as_str().unwrap_or_default(),
            &json!({
                "context": NEWS_FILE_CONTEXT,
                "target_url": HELP_URL,
                "state": state,
                "description": description,
            }),
        )
        .await?;

        tracing::info!(
            pr = pr["number"].as_u64().unwrap_or_default(),
            state,
            files = files.len(),
            "news file status posted"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_fragment_regex() {
        assert!(NEWS_FRAGMENT_RE.is_match("news/1234.bugfix"));
        assert!(NEWS_FRAGMENT_RE.is_match("news/deadbeef.trivial"));
        assert!(NEWS_FRAGMENT_RE.is_match("news/9.feature"));

        // Wrong extension, nested dots, or outside the news directory.
        assert!(!NEWS_FRAGMENT_RE.is_match("news/1234.txt"));
        assert!(!NEWS_FRAGMENT_RE.is_match("news/12.34.bugfix"));
        assert!(!NEWS_FRAGMENT_RE.is_match("src/1234.bugfix"));
        assert!(!NEWS_FRAGMENT_RE.is_match("news/.bugfix"));
    }
}

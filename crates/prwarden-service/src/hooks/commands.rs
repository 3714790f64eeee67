use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};

use crate::error::Result;
use crate::event::WebhookEvent;
use crate::service::Service;

use super::Hook;

const ACTIONS: &[&str] = &["created", "edited"];

/// A comment command.
///
/// Commands live on their own line of a comment, addressed to the bot:
/// `@<bot username> <command>`. The address match is case-insensitive, the
/// command itself is not.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    /// The pattern the command text (after the address) must match.
    fn pattern(&self) -> &Regex;

    /// Runs the command against the comment it appeared in.
    async fn run(&self, service: &Service, event: &WebhookEvent, comment: &Value) -> Result<()>;
}

/// Scans issue comments for lines addressed to the bot and dispatches them
/// to the registered commands.
pub struct CommandHook {
    commands: Vec<Box<dyn Command>>,
}

impl CommandHook {
    pub fn new(commands: Vec<Box<dyn Command>>) -> Self {
        Self { commands }
    }
}

impl std::fmt::Debug for CommandHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHook")
            .field(
                "commands",
                &self.commands.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Strips the `@botname` address off a comment line, case-insensitively.
///
/// Returns the rest of the line, trimmed, if the line was addressed to us.
fn strip_address<'a>(line: &'a str, bot_username: &str) -> Option<&'a str> {
    let line = line.trim();
    let rest = line.strip_prefix('@')?;
    let address = rest.get(..bot_username.len())?;
    if !address.eq_ignore_ascii_case(bot_username) {
        return None;
    }
    let rest = &rest[bot_username.len()..];
    // Reject prefixes of longer usernames, e.g. `@prwardenfan`.
    if rest.chars().next().is_some_and(|c| !c.is_whitespace()) {
        return None;
    }
    Some(rest.trim())
}

#[async_trait]
impl Hook for CommandHook {
    fn name(&self) -> &'static str {
        "commands"
    }

    fn matches(&self, event: &WebhookEvent) -> bool {
        event.name == "issue_comment"
            && event.action().is_some_and(|action| ACTIONS.contains(&action))
    }

    async fn run(&self, service: &Service, event: &WebhookEvent) -> Result<()> {
        // Re-fetch the comment; edits may have raced the delivery.
        let comment = service
            .gh()
            .item(service.cache(), &event.delivery, event.url("comment", "url")?)
            .await?;

        let bot_username = &service.github_config().bot_username;
        let body = comment["body"].as_str().unwrap_or_default();

        for line in body.lines() {
            let Some(text) = strip_address(line, bot_username) else {
                continue;
            };

            // First matching command wins for a given line.
            for command in &self.commands {
                if command.pattern().is_match(text) {
                    tracing::info!(
                        command = command.name(),
                        comment = comment["url"].as_str().unwrap_or_default(),
                        "running comment command"
                    );
                    command.run(service, event, &comment).await?;
                    break;
                }
            }
        }

        Ok(())
    }
}

static REQUEST_REVIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^request\s+review$").unwrap());

/// `request review`: dismisses the existing reviews on a pull request so it
/// re-enters the review queue.
#[derive(Debug)]
pub struct RequestReviewCommand;

#[async_trait]
impl Command for RequestReviewCommand {
    fn name(&self) -> &'static str {
        "request-review"
    }

    fn pattern(&self) -> &Regex {
        &REQUEST_REVIEW_RE
    }

    async fn run(&self, service: &Service, event: &WebhookEvent, comment: &Value) -> Result<()> {
        let gh = service.gh();
        let cache = service.cache();
        let scope = &event.delivery;

        let issue = gh
            .item(cache, scope, comment["issue_url"].as_str().unwrap_or_default())
            .await?;

        // Comments on plain issues carry no reviews to dismiss.
        let Some(pr_url) = issue["pull_request"]["url"].as_str() else {
            tracing::info!(
                issue = issue["url"].as_str().unwrap_or_default(),
                "review requested on something that is not a pull request"
            );
            return Ok(());
        };

        let pr = gh.item(cache, scope, pr_url).await?;
        let pr_url = pr["url"].as_str().unwrap_or_default().to_owned();

        let reviews_url = format!("{pr_url}/reviews");
        let reviews = service
            .retry()
            .run_all_retryable(|| async { gh.get_paginated(&reviews_url).await })
            .await?;

        for review in &reviews {
            // Only submitted verdicts can be dismissed.
            let state = review["state"].as_str().unwrap_or_default();
            if state != "APPROVED" && state != "CHANGES_REQUESTED" {
                continue;
            }
            let Some(id) = review["id"].as_u64() else {
                continue;
            };

            let dismiss_url = format!("{pr_url}/reviews/{id}/dismissals");
            service
                .retry()
                .run_all_retryable(|| async {
                    gh.put(
                        &dismiss_url,
                        &json!({ "message": "Dismissing reviews on request, please re-review." }),
                    )
                    .await
                })
                .await?;
        }

        tracing::info!(
            pr = pr["number"].as_u64().unwrap_or_default(),
            reviews = reviews.len(),
            "review requested"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_address() {
        assert_eq!(strip_address("@prwarden request review", "prwarden"), Some("request review"));
        assert_eq!(strip_address("  @PRWarden   request review  ", "prwarden"), Some("request review"));
        assert_eq!(strip_address("@prwarden", "prwarden"), Some(""));

        assert_eq!(strip_address("prwarden request review", "prwarden"), None);
        assert_eq!(strip_address("@prwardenfan request review", "prwarden"), None);
        assert_eq!(strip_address("see @prwarden request review", "prwarden"), None);
    }

    #[test]
    fn test_request_review_pattern() {
        assert!(REQUEST_REVIEW_RE.is_match("request review"));
        assert!(REQUEST_REVIEW_RE.is_match("request   review"));

        // Case sensitive, no trailing chatter.
        assert!(!REQUEST_REVIEW_RE.is_match("Request review"));
        assert!(!REQUEST_REVIEW_RE.is_match("request review please"));
    }
}

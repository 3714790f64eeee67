use crate::caching::ItemCache;
use crate::config::{CacheConfig, GitHubConfig, RetryConfig};
use crate::error::Result;
use crate::event::WebhookEvent;
use crate::gh::GitHubClient;
use crate::hooks::{CommandHook, Hook, MergeConflictHook, NewsFileHook, RequestReviewCommand};
use crate::retry::RetryPolicy;

/// The shared state behind both the webhook endpoint and the sweep task.
///
/// Owns the GitHub client, the item cache that deduplicates fetches within a
/// delivery, the retry policy, and the list of hooks.
pub struct Service {
    github: GitHubConfig,
    gh: GitHubClient,
    cache: ItemCache,
    retry: RetryPolicy,
    hooks: Vec<Box<dyn Hook>>,
}

impl Service {
    /// Creates the service with the default hook set.
    pub fn create(
        github: GitHubConfig,
        cache: &CacheConfig,
        retry: &RetryConfig,
    ) -> Result<Self> {
        let hooks: Vec<Box<dyn Hook>> = vec![
            Box::new(NewsFileHook),
            Box::new(MergeConflictHook),
            Box::new(CommandHook::new(vec![Box::new(RequestReviewCommand)])),
        ];
        Self::with_hooks(github, cache, retry, hooks)
    }

    /// Creates the service with an explicit hook set. Used by tests that
    /// want to exercise a single hook.
    pub fn with_hooks(
        github: GitHubConfig,
        cache: &CacheConfig,
        retry: &RetryConfig,
        hooks: Vec<Box<dyn Hook>>,
    ) -> Result<Self> {
        let retry = RetryPolicy::new(retry.max_attempts, retry.delay);
        Ok(Self {
            gh: GitHubClient::new(&github)?,
            cache: ItemCache::new(cache, retry),
            github,
            retry,
            hooks,
        })
    }

    pub fn github_config(&self) -> &GitHubConfig {
        &self.github
    }

    pub fn gh(&self) -> &GitHubClient {
        &self.gh
    }

    pub fn cache(&self) -> &ItemCache {
        &self.cache
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Runs every matching hook for the delivery, sequentially.
    ///
    /// Returns the names of the hooks that ran. The first hook failure
    /// aborts the remainder and propagates; the caller reports it.
    pub async fn handle(&self, event: &WebhookEvent) -> Result<Vec<&'static str>> {
        let mut ran = Vec::new();

        for hook in &self.hooks {
            if !hook.matches(event) {
                continue;
            }

            tracing::info!(
                hook = hook.name(),
                event = %event.name,
                delivery = %event.delivery,
                "running hook"
            );
            hook.run(self, event).await?;
            ran.push(hook.name());
        }

        if ran.is_empty() {
            tracing::debug!(
                event = %event.name,
                action = event.action().unwrap_or_default(),
                "no hook matched the delivery"
            );
        }

        Ok(ran)
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("hooks", &self.hooks.iter().map(|h| h.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

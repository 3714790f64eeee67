use std::time::Duration;

use serde::Deserialize;

/// Access to the GitHub API.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Base URL of the GitHub REST API.
    pub api_url: String,

    /// OAuth token used for authenticated requests.
    ///
    /// Without a token the bot can still read public resources, but any
    /// write (statuses, labels, comments) will be rejected upstream.
    pub token: Option<String>,

    /// Shared secret used to verify webhook delivery signatures.
    ///
    /// When unset, signature verification is skipped.
    pub webhook_secret: Option<String>,

    /// The account name the bot runs as. Comment commands must be addressed
    /// to this name.
    pub bot_username: String,

    /// The `owner/name` repository the periodic conflict sweep iterates.
    pub repo: Option<String>,

    /// The user agent reported to GitHub.
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".into(),
            token: None,
            webhook_secret: None,
            bot_username: "prwarden".into(),
            repo: None,
            user_agent: concat!("prwarden/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Fine-tuning of the per-delivery item cache.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached items (and per-key locks).
    pub capacity: u64,

    /// Time to live for cached items, measured from last write.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Upper bound on how long a caller may wait for another in-flight fetch
    /// of the same resource.
    ///
    /// Defaults to no bound, which mirrors the behavior of waiting for the
    /// full retry budget of whoever holds the lock.
    #[serde(with = "humantime_serde")]
    pub lock_wait_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(5 * 60),
            lock_wait_timeout: None,
        }
    }
}

/// Fine-tuning of the fetch retry budget.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of tries before a retryable failure becomes fatal.
    pub max_attempts: usize,

    /// Fixed delay between attempts.
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// The periodic merge-conflict sweep over all open pull requests.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Whether the sweep runs at all. It additionally requires
    /// [`GitHubConfig::repo`] to be set.
    pub enabled: bool,

    /// How often the sweep runs.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(3600),
        }
    }
}

//! A thin client for the handful of GitHub REST calls the bot makes.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, LINK};
use serde_json::Value;
use url::Url;

use crate::caching::{ItemCache, ScopeId};
use crate::config::GitHubConfig;
use crate::error::{Error, Result};

/// Extracts the `rel="next"` target from a `Link` header value.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        params
            .contains("rel=\"next\"")
            .then(|| target.trim().trim_start_matches('<').trim_end_matches('>').to_owned())
    })
}

/// An authenticated GitHub API client.
///
/// URLs handled here are opaque: the hooks pass along whatever resource URLs
/// GitHub put into the payloads it delivered. Relative paths (used by the
/// sweep) are resolved against the configured API base URL, which tests
/// point at a local mock server.
#[derive(Clone, Debug)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));
        if let Some(token) = &config.token {
            let mut auth = HeaderValue::from_str(&format!("token {token}"))
                .map_err(|_| Error::Payload("github.token"))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;
        let base_url = config
            .api_url
            .parse()
            .map_err(|_| Error::Payload("github.api_url"))?;

        Ok(Self { client, base_url })
    }

    /// Resolves a possibly-relative resource URL against the API base.
    fn resolve(&self, url: &str) -> Result<Url> {
        self.base_url
            .join(url.trim_start_matches('/'))
            .map_err(|_| Error::Payload("resource url"))
    }

    /// Fetches a single resource as JSON.
    pub async fn get_item(&self, url: &str) -> Result<Value> {
        let response = self.client.get(self.resolve(url)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::from_status(status, url));
        }
        Ok(response.json().await?)
    }

    /// Fetches a resource as plain text, e.g. a pull request diff.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(self.resolve(url)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::from_status(status, url));
        }
        Ok(response.text().await?)
    }

    /// Fetches a paginated collection, following `Link: rel="next"` headers
    /// and concatenating the array pages.
    pub async fn get_paginated(&self, url: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut next = Some(self.resolve(url)?);

        while let Some(page_url) = next.take() {
            let response = self.client.get(page_url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::from_status(status, url));
            }

            next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_link)
                .map(|target| self.resolve(&target))
                .transpose()?;

            match response.json().await? {
                Value::Array(page) => items.extend(page),
                other => items.push(other),
            }
        }

        Ok(items)
    }

    /// POSTs a JSON body, ignoring the response body.
    pub async fn post(&self, url: &str, body: &Value) -> Result<()> {
        let response = self.client.post(self.resolve(url)?).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::from_status(status, url));
        }
        Ok(())
    }

    /// PUTs a JSON body, ignoring the response body.
    pub async fn put(&self, url: &str, body: &Value) -> Result<()> {
        let response = self.client.put(self.resolve(url)?).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::from_status(status, url));
        }
        Ok(())
    }

    /// Issues a DELETE with a JSON body, ignoring the response body.
    pub async fn delete(&self, url: &str, body: &Value) -> Result<()> {
        let response = self
            .client
            .delete(self.resolve(url)?)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::from_status(status, url));
        }
        Ok(())
    }

    /// Removes a single label from an issue.
    ///
    /// `labels_url` is the issue's labels collection URL (template already
    /// stripped); the label name gets percent-encoded into the path.
    pub async fn delete_label(&self, labels_url: &str, name: &str) -> Result<()> {
        let mut url = self.resolve(labels_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::Payload("labels_url"))?
            .push(name);

        let response = self.client.delete(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::from_status(status, labels_url));
        }
        Ok(())
    }

    /// Fetches `url` through the item cache: deduplicated within `scope` and
    /// retried on failure.
    pub async fn item(
        &self,
        cache: &ItemCache,
        scope: &ScopeId,
        url: &str,
    ) -> Result<Arc<Value>> {
        cache
            .get_or_fetch(scope, url, |url| async move { self.get_item(&url).await })
            .await
    }

    /// Like [`item`](Self::item), but keeps refetching until the value
    /// satisfies `success_condition` or the retry budget runs out.
    pub async fn item_when<P>(
        &self,
        cache: &ItemCache,
        scope: &ScopeId,
        url: &str,
        success_condition: P,
    ) -> Result<Arc<Value>>
    where
        P: Fn(&Value) -> bool + Sync,
    {
        cache
            .get_or_fetch_when(
                scope,
                url,
                |url| async move { self.get_item(&url).await },
                success_condition,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_link() {
        let header = "<https://api.github.com/repositories/1/pulls?page=2>; rel=\"next\", \
                      <https://api.github.com/repositories/1/pulls?page=5>; rel=\"last\"";
        assert_eq!(
            next_link(header).as_deref(),
            Some("https://api.github.com/repositories/1/pulls?page=2")
        );

        let header = "<https://api.github.com/repositories/1/pulls?page=1>; rel=\"prev\"";
        assert_eq!(next_link(header), None);
    }
}

//! PokeAPI Client
//!
//! Thin lookup client over the PokeAPI `pokemon` resource. Every call is one
//! HTTP GET plus a JSON decode, handed as a whole to the retry engine.

pub mod pokemon;

pub use pokemon::{Pokemon, PokemonList};

use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::types::{ClientError, ClientResult, LookupError};
use crate::utils::retry::{RetryCondition, RetryEngine, RetryPolicy};

/// HTTP client for the PokeAPI.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct PokeClient {
    http: Client,
    config: ClientConfig,
    engine: RetryEngine<LookupError>,
}

impl PokeClient {
    /// Create a client with its own connection pool and the default retry policy.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::HttpClient)?;

        Ok(Self::with_http_client(config, http))
    }

    /// Create a client around an existing `reqwest::Client`.
    ///
    /// The caller owns the transport configuration; `config.timeout` is not
    /// applied to it.
    pub fn with_http_client(config: ClientConfig, http: Client) -> Self {
        Self {
            http,
            config,
            engine: RetryEngine::new(RetryPolicy::default()),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.engine = RetryEngine::new(policy);
        self
    }

    /// Restrict which attempt failures are retried, e.g.
    /// `RetryCondition::custom(LookupError::is_transient)`.
    pub fn with_retry_condition(mut self, condition: RetryCondition<LookupError>) -> Self {
        self.engine = self.engine.with_condition(condition);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.engine.policy()
    }

    /// Base URL joined with an optional path segment.
    ///
    /// The segment is percent-encoded, so `/`, `?` and `#` in an identifier
    /// cannot change the path or add a query. An unparseable base is passed
    /// through and rejected by the attempt itself.
    fn endpoint(&self, segment: Option<&str>) -> String {
        let base = self.config.url.trim_end_matches('/');
        let Some(segment) = segment else {
            return base.to_string();
        };

        let Ok(mut url) = Url::parse(base) else {
            return format!("{}/{}", base, segment);
        };
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push(segment);
            }
            Err(()) => return format!("{}/{}", base, segment),
        }
        url.to_string()
    }

    /// One attempt: GET `url` and decode the JSON body into `T`.
    ///
    /// The body is read to completion on every path so the connection can be
    /// reused.
    async fn get_json<T>(&self, url: &str) -> Result<T, LookupError>
    where
        T: DeserializeOwned,
    {
        let url = Url::parse(url).map_err(|e| LookupError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(LookupError::Transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(LookupError::Transport)?;

        if !status.is_success() {
            debug!(
                status = status.as_u16(),
                body_len = body.len(),
                "Discarding error response body"
            );
            return Err(LookupError::UnexpectedStatus { status });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

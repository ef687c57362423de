//! HTTP client for the CDN purge endpoint.
//!
//! A purge is a single `DELETE {base}/{alias}/zones/pull.json/{zone_id}/cache`
//! authenticated with the account's consumer key and secret. The API wraps
//! its answers in a JSON envelope whose `code` mirrors the HTTP status; a
//! failing envelope is surfaced as [`PurgeError::Api`] even on a 2xx reply.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::PurgeError;

/// Credentials and location of the pull zone to purge.
#[derive(Clone)]
pub struct PurgeConfig {
    pub base_url: String,
    pub alias: String,
    pub zone_id: String,
    pub key: String,
    pub secret: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl std::fmt::Debug for PurgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurgeConfig")
            .field("base_url", &self.base_url)
            .field("alias", &self.alias)
            .field("zone_id", &self.zone_id)
            .field("key", &"[redacted]")
            .field("secret", &"[redacted]")
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Client for the purge endpoint of one pull zone.
///
/// Performs exactly one request per [`PurgeClient::purge`] call; callers
/// decide what to do with failures.
#[derive(Debug, Clone)]
pub struct PurgeClient {
    client: Client,
    url: Url,
    key: String,
    secret: String,
}

impl PurgeClient {
    /// Creates a client for the zone described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PurgeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PurgeError::InvalidConfig`] if the base
    /// URL is not a valid URL.
    pub fn new(config: &PurgeConfig) -> Result<Self, PurgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;

        let url = build_purge_url(&config.base_url, &config.alias, &config.zone_id)?;

        Ok(Self {
            client,
            url,
            key: config.key.clone(),
            secret: config.secret.clone(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Purges the whole pull-zone cache.
    ///
    /// Authenticates with HTTP basic auth using the key and secret. Endpoints
    /// that only accept OAuth 1.0a signed requests will reject it.
    ///
    /// # Errors
    ///
    /// - [`PurgeError::Http`] on network failure or non-2xx HTTP status.
    /// - [`PurgeError::Deserialize`] if a non-empty body is not JSON.
    /// - [`PurgeError::Api`] if the envelope reports a failure.
    pub async fn purge(&self) -> Result<(), PurgeError> {
        tracing::debug!(url = %self.url, "purge: sending cache purge request");

        let response = self
            .client
            .delete(self.url.clone())
            .basic_auth(&self.key, Some(&self.secret))
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(());
        }

        let envelope: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| PurgeError::Deserialize {
                context: self.url.to_string(),
                source: e,
            })?;
        check_api_error(&envelope)
    }
}

/// Normalises `base_url` and appends the purge path, percent-encoding the
/// alias and zone id as individual path segments.
fn build_purge_url(base_url: &str, alias: &str, zone_id: &str) -> Result<Url, PurgeError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    let mut url = Url::parse(&normalised)
        .map_err(|e| PurgeError::InvalidConfig(format!("invalid base URL '{base_url}': {e}")))?;

    url.path_segments_mut()
        .map_err(|()| PurgeError::InvalidConfig(format!("base URL '{base_url}' cannot be a base")))?
        .pop_if_empty()
        .extend([alias, "zones", "pull.json", zone_id, "cache"]);

    Ok(url)
}

/// Checks the `code` and `error` fields of the response envelope.
fn check_api_error(body: &serde_json::Value) -> Result<(), PurgeError> {
    let code = body.get("code").and_then(serde_json::Value::as_u64);
    let error = body.get("error");

    if code.is_some_and(|c| c >= 400) || error.is_some_and(|e| !e.is_null()) {
        let msg = error
            .and_then(|e| e.get("message"))
            .and_then(serde_json::Value::as_str)
            .map_or_else(
                || format!("purge rejected (code {})", code.unwrap_or_default()),
                ToOwned::to_owned,
            );
        return Err(PurgeError::Api(msg));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_purge_url_appends_zone_path() {
        let url = build_purge_url("https://rws.maxcdn.com", "acme", "42").unwrap();
        assert_eq!(
            url.as_str(),
            "https://rws.maxcdn.com/acme/zones/pull.json/42/cache"
        );
    }

    #[test]
    fn build_purge_url_strips_trailing_slash_and_keeps_prefix() {
        let url = build_purge_url("http://127.0.0.1:9000/api/", "acme", "42").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/api/acme/zones/pull.json/42/cache"
        );
    }

    #[test]
    fn build_purge_url_encodes_segments() {
        let url = build_purge_url("https://rws.maxcdn.com", "a b", "1/2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://rws.maxcdn.com/a%20b/zones/pull.json/1%2F2/cache"
        );
    }

    #[test]
    fn build_purge_url_rejects_garbage() {
        let err = build_purge_url("not a url", "acme", "42").unwrap_err();
        assert!(matches!(err, PurgeError::InvalidConfig(_)));
    }

    #[test]
    fn check_api_error_accepts_success_envelope() {
        assert!(check_api_error(&serde_json::json!({"code": 200})).is_ok());
        assert!(check_api_error(&serde_json::json!({"code": 200, "error": null})).is_ok());
    }

    #[test]
    fn check_api_error_reports_message() {
        let body = serde_json::json!({
            "code": 401,
            "error": {"type": "unauthorized", "message": "bad consumer key"}
        });
        let err = check_api_error(&body).unwrap_err();
        assert_eq!(err.to_string(), "purge API error: bad consumer key");
    }

    #[test]
    fn check_api_error_without_message_uses_code() {
        let err = check_api_error(&serde_json::json!({"code": 500})).unwrap_err();
        assert_eq!(err.to_string(), "purge API error: purge rejected (code 500)");
    }

    #[test]
    fn debug_redacts_credentials() {
        let config = PurgeConfig {
            base_url: "https://rws.maxcdn.com".to_string(),
            alias: "acme".to_string(),
            zone_id: "42".to_string(),
            key: "the-key".to_string(),
            secret: "the-secret".to_string(),
            timeout_secs: 5,
            user_agent: "ua".to_string(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("the-secret"));
        assert!(!rendered.contains("the-key"));
    }
}

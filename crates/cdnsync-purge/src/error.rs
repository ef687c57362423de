use thiserror::Error;

/// Errors returned by the CDN purge client.
#[derive(Debug, Error)]
pub enum PurgeError {
    /// Network or TLS failure, or a non-2xx status from the purge API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The purge API answered 2xx but reported a failure in its envelope.
    #[error("purge API error: {0}")]
    Api(String),

    /// The response body was not valid JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Base URL, alias, or zone id could not form a request URL.
    #[error("invalid purge configuration: {0}")]
    InvalidConfig(String),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected payload from {url}: {reason}")]
    UnexpectedPayload { url: String, reason: String },

    #[error("payload from {url} contained no configured cdn")]
    EmptyPayload { url: String },

    #[error("database error: {0}")]
    Db(#[from] cdnsync_db::DbError),

    /// Catch-all for `Task` implementations outside this crate that have no
    /// more specific variant to report.
    #[error("{0}")]
    Failed(String),
}

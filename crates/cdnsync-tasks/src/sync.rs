//! The `sync` task: pull the source document and store one snapshot per CDN.
//!
//! The source is a JSON object keyed by each CDN's `source_key`. Entries for
//! CDNs that are not configured are ignored; configured CDNs missing from the
//! document are logged and skipped. A document that matches no configured
//! CDN fails the run so that nothing gets purged.

use cdnsync_core::SchemaRegistry;
use serde_json::{Map, Value};

use crate::error::TaskError;
use crate::imports::ImportsBundle;
use crate::task::{Task, TaskFuture, TaskReport};

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncTask;

impl SyncTask {
    pub const NAME: &'static str = "sync";
}

impl Task for SyncTask {
    fn run(&self, imports: ImportsBundle) -> TaskFuture {
        Box::pin(async move {
            let payload = fetch_payload(&imports.http, &imports.sync_url).await?;
            let entries = extract_cdn_entries(&imports.schemas, &imports.sync_url, &payload)?;

            for (slug, data) in &entries {
                let row =
                    cdnsync_db::insert_cdn_snapshot(&imports.pool, slug, Self::NAME, data).await?;
                tracing::debug!(cdn = %slug, snapshot_id = row.id, "sync: stored snapshot");
            }

            tracing::info!(
                url = %imports.sync_url,
                cdns = entries.len(),
                "sync: stored cdn snapshots"
            );
            Ok(TaskReport {
                records: entries.len(),
            })
        })
    }
}

/// GET the source document and parse it as a JSON object.
///
/// # Errors
///
/// - [`TaskError::Http`] on network failure.
/// - [`TaskError::UnexpectedStatus`] for any non-2xx status.
/// - [`TaskError::Deserialize`] if the body is not JSON.
/// - [`TaskError::UnexpectedPayload`] if the JSON is not an object.
pub async fn fetch_payload(
    client: &reqwest::Client,
    url: &str,
) -> Result<Map<String, Value>, TaskError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(TaskError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await?;
    let value: Value = serde_json::from_str(&body).map_err(|e| TaskError::Deserialize {
        context: url.to_string(),
        source: e,
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(TaskError::UnexpectedPayload {
            url: url.to_string(),
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

/// Pick each configured CDN's entry out of the source document.
///
/// Returns `(slug, data)` pairs in registry order.
///
/// # Errors
///
/// Returns [`TaskError::EmptyPayload`] if no configured CDN is present.
pub fn extract_cdn_entries(
    schemas: &SchemaRegistry,
    url: &str,
    payload: &Map<String, Value>,
) -> Result<Vec<(String, Value)>, TaskError> {
    let mut entries = Vec::new();
    for schema in schemas.iter() {
        match payload.get(&schema.source_key) {
            Some(Value::Null) | None => {
                tracing::warn!(
                    cdn = %schema.slug,
                    source_key = %schema.source_key,
                    "sync: cdn missing from payload; skipping"
                );
            }
            Some(data) => entries.push((schema.slug.clone(), data.clone())),
        }
    }

    if entries.is_empty() {
        return Err(TaskError::EmptyPayload {
            url: url.to_string(),
        });
    }
    Ok(entries)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

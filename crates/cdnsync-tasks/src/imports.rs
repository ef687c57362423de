use std::sync::Arc;

use cdnsync_core::{CdnDefinition, SchemaRegistry};
use sqlx::PgPool;

/// Everything a task may use during one run.
///
/// Built fresh for each run; the heavy members are shared handles.
#[derive(Debug, Clone)]
pub struct ImportsBundle {
    pub pool: PgPool,
    pub http: reqwest::Client,
    pub sync_url: Arc<str>,
    pub cdns: Arc<[CdnDefinition]>,
    pub schemas: Arc<SchemaRegistry>,
}

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use cdnsync_core::CdnSchema;
use cdnsync_db::{CdnSnapshotRow, DbError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SnapshotsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SnapshotItem {
    snapshot_id: Uuid,
    cdn_slug: String,
    task_name: String,
    captured_at: DateTime<Utc>,
    data: serde_json::Value,
}

impl From<CdnSnapshotRow> for SnapshotItem {
    fn from(row: CdnSnapshotRow) -> Self {
        Self {
            snapshot_id: row.public_id,
            cdn_slug: row.cdn_slug,
            task_name: row.task_name,
            captured_at: row.captured_at,
            data: row.payload,
        }
    }
}

fn unknown_cdn(request_id: String, slug: &str) -> ApiError {
    ApiError::new(request_id, "not_found", format!("unknown cdn: {slug}"))
}

pub(super) async fn list_cdns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<CdnSchema>>> {
    Json(ApiResponse {
        data: state.schemas.iter().cloned().collect(),
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn latest_snapshot(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<SnapshotItem>>, ApiError> {
    if state.schemas.get(&slug).is_none() {
        return Err(unknown_cdn(req_id.0, &slug));
    }

    let row = match cdnsync_db::latest_cdn_snapshot(&state.pool, &slug).await {
        Ok(row) => row,
        Err(DbError::NotFound) => {
            return Err(ApiError::new(
                req_id.0,
                "not_found",
                format!("no data synced yet for cdn: {slug}"),
            ));
        }
        Err(e) => return Err(map_db_error(req_id.0, &e)),
    };

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_snapshots(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<SnapshotsQuery>,
) -> Result<Json<ApiResponse<Vec<SnapshotItem>>>, ApiError> {
    if state.schemas.get(&slug).is_none() {
        return Err(unknown_cdn(req_id.0, &slug));
    }

    let rows = cdnsync_db::list_cdn_snapshots(&state.pool, &slug, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SnapshotItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

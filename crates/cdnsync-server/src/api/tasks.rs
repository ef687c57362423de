use axum::{extract::State, Extension, Json};

use crate::middleware::RequestId;
use crate::scheduler::TaskStatus;

use super::{ApiResponse, AppState, ResponseMeta};

pub(super) async fn list_tasks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<TaskStatus>>> {
    Json(ApiResponse {
        data: state.board.snapshot().await,
        meta: ResponseMeta::new(req_id.0),
    })
}

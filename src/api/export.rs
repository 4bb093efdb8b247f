use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

pub const EXPORT_FILENAME: &str = "export.tsv";

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Uuid,
}

/// GET /api/export — the session's cumulative result table as TSV.
pub async fn export_tsv(
    State(state): State<AppState>,
    Query(params): Query<SessionQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .get_session(params.session_id)
        .ok_or((StatusCode::NOT_FOUND, "Unknown session".to_string()))?;
    let session = session.lock().await;

    let body = session.export_table.to_tsv();
    tracing::info!(
        "exporting {} row(s) for session {}",
        session.export_table.len(),
        params.session_id
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/tab-separated-values".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        body,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub session_id: Uuid,
    pub export_rows: usize,
}

/// POST /api/reset — clear the session's history and export table.
pub async fn reset_session(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, (StatusCode, String)> {
    let session = state
        .get_session(req.session_id)
        .ok_or((StatusCode::NOT_FOUND, "Unknown session".to_string()))?;
    let mut session = session.lock().await;
    session.reset();

    Ok(Json(ResetResponse {
        session_id: req.session_id,
        export_rows: session.export_table.len(),
    }))
}

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub collection: String,
    pub vintage: Option<String>,
    pub documents: usize,
}

/// GET /api/meta — which data vintage is being served.
pub async fn meta(State(state): State<AppState>) -> Json<MetaResponse> {
    Json(MetaResponse {
        collection: state.vectors.collection_name().to_string(),
        vintage: state.vectors.vintage(),
        documents: state.vectors.entry_count(),
    })
}

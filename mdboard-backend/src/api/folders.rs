use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use mdboard_core::storage::StorageError;
use mdboard_core::types::{folder_display_name, BoardPayload};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{log_api_issue, ErrorResponse};
use crate::session::FolderSession;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderInfo {
    id: String,
    folder_path: String,
    folder_name: String,
}

impl FolderInfo {
    fn of(session: &FolderSession) -> Self {
        Self {
            id: session.id().to_string(),
            folder_path: session.folder().to_string_lossy().to_string(),
            folder_name: folder_display_name(session.folder()),
        }
    }
}

#[derive(Deserialize)]
pub struct OpenFolderBody {
    path: String,
}

fn api_error(status: StatusCode, target: &'static str, error: String) -> ApiError {
    log_api_issue(status, target, &error);
    (status, Json(ErrorResponse { error }))
}

pub async fn list_folders(State(state): State<AppState>) -> Json<serde_json::Value> {
    let folders: Vec<FolderInfo> = state
        .sessions
        .list()
        .iter()
        .map(|session| FolderInfo::of(session))
        .collect();
    Json(serde_json::json!({ "folders": folders }))
}

pub async fn open_folder(
    State(state): State<AppState>,
    Json(body): Json<OpenFolderBody>,
) -> Result<(StatusCode, Json<FolderInfo>), ApiError> {
    let path = PathBuf::from(body.path.trim());
    match state.sessions.open(&path) {
        Ok(session) => Ok((StatusCode::OK, Json(FolderInfo::of(&session)))),
        Err(StorageError::InvalidFolder(folder)) => Err(api_error(
            StatusCode::BAD_REQUEST,
            "mdboard.api.open_folder",
            format!("Not a folder: {}", folder),
        )),
        Err(e) => Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "mdboard.api.open_folder",
            format!("Failed to open {}: {}", path.display(), e),
        )),
    }
}

pub async fn close_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.close(&folder_id) {
        log::info!("[mdboard.api.close_folder] Closed {}", folder_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(
            StatusCode::NOT_FOUND,
            "mdboard.api.close_folder",
            format!("Folder not open: {}", folder_id),
        ))
    }
}

pub async fn get_board(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
) -> Result<Json<BoardPayload>, ApiError> {
    let session = state.sessions.get(&folder_id).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            "mdboard.api.get_board",
            format!("Folder not open: {}", folder_id),
        )
    })?;

    session.snapshot().map(Json).ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "mdboard.api.get_board",
            format!("Board {} has not loaded yet", folder_id),
        )
    })
}

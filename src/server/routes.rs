//! Route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path as RoutePath, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use schemars::JsonSchema;
use tempfile::TempDir;
use tokio::fs;
use uuid::Uuid;

use super::AppState;
use crate::{coords::GeoPoint, error::PipelineError, prelude::*};

/// Successful upload.
#[derive(Debug, Deserialize, JsonSchema, Serialize)]
pub struct UploadResponse {
    /// Always `true`.
    pub success: bool,
    /// Converted coordinates, as `[lat, lon]` pairs in document order.
    pub coordinates: Vec<GeoPoint>,
    /// Where to fetch the rendered map.
    pub map_url: String,
}

/// Error response body.
#[derive(Debug, Deserialize, JsonSchema, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Errors from `POST /upload`.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file part")]
    NoFilePart,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("Invalid upload: {0}")]
    InvalidMultipart(#[from] MultipartError),

    #[error("Failed to save image")]
    SaveFailed(#[source] std::io::Error),

    #[error("{}", .0.user_message())]
    Pipeline(#[from] PipelineError),

    #[error("Failed to create map")]
    MapNotStored(#[source] std::io::Error),
}

impl UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadError::NoFilePart | UploadError::NoSelectedFile => {
                StatusCode::BAD_REQUEST
            }
            UploadError::InvalidMultipart(err) => err.status(),
            UploadError::SaveFailed(_) | UploadError::MapNotStored(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            UploadError::Pipeline(PipelineError::Render(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            UploadError::Pipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = ?self, "Upload failed");
        } else {
            warn!(error = %self, "Upload rejected");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// A file from a multipart upload.
struct UploadedFile {
    file_name: String,
    data: Bytes,
}

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.index_html().to_owned())
}

/// `GET /health`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /upload`
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadError> {
    let mut file = None;
    let mut satellite = false;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let data = field.bytes().await?;
                debug!(%file_name, bytes = data.len(), "Received file");
                file = Some(UploadedFile { file_name, data });
            }
            "satellite" => {
                let value = field.text().await?;
                satellite = is_checked(&value);
            }
            _ => debug!(%name, "Ignoring multipart field"),
        }
    }

    let file = file.ok_or(UploadError::NoFilePart)?;
    if file.file_name.is_empty() {
        return Err(UploadError::NoSelectedFile);
    }

    // Each upload gets its own directory, so concurrent uploads never collide.
    let upload_dir = TempDir::with_prefix("upload").map_err(UploadError::SaveFailed)?;
    let image_path = upload_dir.path().join(saved_file_name(&file.file_name));
    fs::write(&image_path, &file.data)
        .await
        .map_err(UploadError::SaveFailed)?;

    let output = state.pipeline().run(&image_path, satellite).await?;

    let id = Uuid::new_v4();
    state
        .store_map(id, &output.map.html)
        .await
        .map_err(UploadError::MapNotStored)?;
    info!(%id, file_name = %file.file_name, "Stored map");

    Ok(Json(UploadResponse {
        success: true,
        coordinates: output.map.markers,
        map_url: format!("/map/{id}"),
    }))
}

/// `GET /map`
pub async fn latest_map(State(state): State<AppState>) -> Response {
    match state.latest_map().await {
        Some(id) => serve_map(&state, id).await,
        None => not_found("No map has been created yet"),
    }
}

/// `GET /map/:id`
pub async fn map_by_id(
    State(state): State<AppState>,
    RoutePath(id): RoutePath<String>,
) -> Response {
    match id.parse::<Uuid>() {
        Ok(id) => serve_map(&state, id).await,
        Err(_) => not_found("Map not found"),
    }
}

async fn serve_map(state: &AppState, id: Uuid) -> Response {
    match fs::read_to_string(state.map_path(id)).await {
        Ok(html) => Html(html).into_response(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            not_found("Map not found")
        }
        Err(err) => {
            error!(%id, "Failed to read map: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to read map")),
            )
                .into_response()
        }
    }
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(message))).into_response()
}

/// Is an HTML checkbox value "on"?
fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

/// Pick a safe local name for an uploaded file, keeping a plain extension.
fn saved_file_name(file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("image.{}", ext.to_ascii_lowercase()),
        None => "image".to_owned(),
    }
}

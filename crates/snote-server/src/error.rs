use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use snote_refs::ExtractError;
use snote_render::RenderError;
use snote_store::StoreError;
use snote_types::TypeError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("cannot extract references from note {note_id}: {source}")]
    Extract {
        note_id: String,
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    InvalidId(#[from] TypeError),

    #[error("note already exists: {0}")]
    NoteExists(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Store(StoreError::InvalidNoteId(_)) => StatusCode::BAD_REQUEST,
            Self::Render(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Render(RenderError::Store(StoreError::InvalidNoteId(_))) => StatusCode::BAD_REQUEST,
            Self::Extract { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidId(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoteExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

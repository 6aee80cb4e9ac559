use std::collections::BTreeSet;
use std::io;

use axum::body::Body;
use axum::extract::{Form, Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use snote_gc::TriggerOutcome;
use snote_refs::blob_url;
use snote_types::{is_reserved_note_id, validate_note_id, BlobId, Note, TypeError};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, info};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Body of `PUT /api/note/:note_id`. The ID comes from the path and the
/// edit time from the store; both are ignored if present.
#[derive(Debug, Deserialize)]
pub struct NoteInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateNote {
    pub suggested_id: String,
}

/// Reject IDs that cannot be stored or that belong to the listing notes.
fn check_user_note_id(id: &str) -> ServerResult<()> {
    validate_note_id(id)?;
    if is_reserved_note_id(id) {
        return Err(TypeError::ReservedNoteId(id.to_string()).into());
    }
    Ok(())
}

pub async fn index_handler() -> Redirect {
    Redirect::temporary("/ls")
}

/// Rendered HTML page for a note or a listing.
pub async fn html_note_handler(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> ServerResult<Html<String>> {
    let rendered = state.render.render_note(&note_id).await?;
    Ok(Html(page(&rendered.note, &rendered.html)))
}

fn page(note: &Note, body: &str) -> String {
    let title = if note.title.is_empty() {
        &note.id
    } else {
        &note.title
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<article id=\"{}\">\n{}</article>\n</body>\n</html>\n",
        escape_html(title),
        escape_html(&note.id),
        body
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub async fn get_note_handler(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> ServerResult<Json<Note>> {
    Ok(Json(state.notes.load_note(&note_id).await?))
}

/// Create or fully replace a note.
///
/// The contents must pass reference extraction; an empty title is derived
/// from the first heading.
pub async fn put_note_handler(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Json(input): Json<NoteInput>,
) -> ServerResult<Json<Note>> {
    check_user_note_id(&note_id)?;
    let extraction =
        state
            .extractor
            .extract(&input.contents)
            .map_err(|source| ServerError::Extract {
                note_id: note_id.clone(),
                source,
            })?;
    let title = if input.title.trim().is_empty() {
        extraction.title
    } else {
        input.title
    };
    let note = Note::new(note_id, input.contents)
        .with_title(title)
        .with_tags(input.tags)
        .public(input.is_public);

    let saved = state.notes.save_note(note).await?;
    info!(
        note_id = %saved.id,
        bytes = saved.content_size(),
        blobs = extraction.blob_ids.len(),
        "note saved"
    );
    Ok(Json(saved))
}

pub async fn delete_note_handler(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> ServerResult<StatusCode> {
    state.notes.delete_note(&note_id).await?;
    info!(note_id = %note_id, "note deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Create an empty note under a suggested ID.
pub async fn create_note_handler(
    State(state): State<AppState>,
    Form(form): Form<CreateNote>,
) -> ServerResult<Response> {
    let id = form.suggested_id.trim().to_string();
    check_user_note_id(&id)?;
    if state.notes.note_exists(&id).await? {
        return Err(ServerError::NoteExists(id));
    }
    let saved = state.notes.save_note(Note::new(id.as_str(), "")).await?;
    info!(note_id = %saved.id, "note created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/note/{id}"))],
        Json(saved),
    )
        .into_response())
}

/// Store the first file field of a multipart upload.
///
/// The body is streamed into the blob store and hashed on the way, never
/// buffered whole.
pub async fn upload_blob_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let stream = field.map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let mut reader = Box::pin(StreamReader::new(stream));
        let id = state.blobs.put_blob_reader(&mut reader).await?;
        let url = blob_url(&id, &filename);
        info!(blob_id = %id, filename = %filename, "blob uploaded");
        return Ok((
            StatusCode::CREATED,
            [(header::LOCATION, url.clone())],
            Json(json!({ "id": id, "url": url })),
        )
            .into_response());
    }
    Err(ServerError::BadRequest("upload has no file field".into()))
}

/// Stream a blob back, suggesting `filename` for downloads.
pub async fn get_blob_handler(
    State(state): State<AppState>,
    Path((blob_id, filename)): Path<(String, String)>,
) -> ServerResult<Response> {
    serve_blob(&state, &blob_id, Some(&filename)).await
}

/// Stream a blob linked without a filename segment.
pub async fn get_bare_blob_handler(
    State(state): State<AppState>,
    Path(blob_id): Path<String>,
) -> ServerResult<Response> {
    serve_blob(&state, &blob_id, None).await
}

async fn serve_blob(state: &AppState, blob_id: &str, filename: Option<&str>) -> ServerResult<Response> {
    let id = BlobId::parse(blob_id)?;
    let reader = state.blobs.get_blob(&id).await?;
    debug!(blob_id = %id, filename = filename.unwrap_or_default(), "serving blob");

    let disposition = match filename {
        Some(name) => {
            let value = format!("inline; filename=\"{}\"", name.replace(['"', '\\'], "_"));
            HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("inline"))
        }
        None => HeaderValue::from_static("inline"),
    };
    Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(filename.unwrap_or_default()))
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| ServerError::Internal(e.to_string()))
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Ask the scheduler for an immediate collection pass.
pub async fn trigger_gc_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.gc.as_ref().map(|gc| gc.trigger()) {
        Some(TriggerOutcome::Started) => (StatusCode::ACCEPTED, Json(json!({ "gc": "started" }))),
        Some(TriggerOutcome::Dropped) => (StatusCode::CONFLICT, Json(json!({ "gc": "running" }))),
        Some(TriggerOutcome::Stopped) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "gc": "stopped" })),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({ "gc": "disabled" }))),
    }
}

pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let gc = state.gc.as_ref().map(|gc| {
        json!({
            "running": gc.is_running(),
            "passes_completed": gc.passes_completed(),
            "last_pass_ok": gc.last_report().map(|r| r.is_ok()),
        })
    });
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "gc": gc,
    }))
}

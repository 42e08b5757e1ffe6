use std::convert::Infallible;

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use futures::Stream;
use serde::Deserialize;
use tracing::info;

use super::error::ApiError;
use super::render;
use super::state::AppState;
use crate::fetch;

#[derive(Debug, Deserialize)]
pub struct LandingParams {
    pub id: Option<String>,
}

/// `GET /` — the landing page, or, with `?id=<album-id>`, a synchronous
/// scrape-and-download that acknowledges in plain text once the file is
/// saved.
pub async fn landing(
    State(state): State<AppState>,
    Query(params): Query<LandingParams>,
) -> Result<Response, ApiError> {
    let Some(album_id) = params.id else {
        return Ok(Html(render::INDEX_HTML).into_response());
    };

    let album_id = album_id.trim().to_string();
    if album_id.is_empty() {
        return Err(ApiError::InvalidRequest("empty album id".to_string()));
    }

    let saved = fetch::run_album(&state.config, &album_id)
        .await
        .map_err(|e| ApiError::DownloadFailed(e.to_string()))?;

    Ok((
        StatusCode::OK,
        format!("Downloaded album {album_id} to {}\n", saved.display()),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct AddTaskForm {
    #[serde(rename = "AlbumID")]
    pub album_id: String,
}

/// `POST /do-the-thing` — append an album to the pending list, hand it to
/// the worker pool, return the single-item fragment.
pub async fn add_task(
    State(state): State<AppState>,
    Form(form): Form<AddTaskForm>,
) -> Result<Html<String>, ApiError> {
    let album_id = form.album_id.trim().to_string();

    if album_id.is_empty() {
        return Err(ApiError::InvalidRequest(
            "AlbumID must not be empty".to_string(),
        ));
    }

    let index = state.pending.push(album_id.clone());

    if let Err(e) = state.runner.submit(album_id.clone()) {
        // Leave the list exactly as it was before this request.
        state.pending.remove_album(&album_id);
        return Err(e.into());
    }

    info!(album_id, index, "album queued");

    Ok(Html(render::task_item(&album_id, index)))
}

#[derive(Debug, Deserialize)]
pub struct RemoveParams {
    pub index: usize,
}

/// `GET /remove-queue-element?index=<n>` — bounds-checked removal,
/// returning the re-rendered full list.
pub async fn remove_queue_element(
    State(state): State<AppState>,
    Query(params): Query<RemoveParams>,
) -> Result<Html<String>, ApiError> {
    let removed = state.pending.remove(params.index)?;

    info!(album_id = removed, index = params.index, "album removed from queue");

    Ok(Html(render::task_list(&state.pending.snapshot())))
}

/// `GET /stream` — SSE channel pushing a re-rendered pending list on every
/// change. Requires an `Accept: text/event-stream` header.
pub async fn stream(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let accepts_event_stream = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains(mime::TEXT_EVENT_STREAM.essence_str()));

    if !accepts_event_stream {
        return Err(ApiError::InvalidRequest(
            "stream endpoint requires Accept: text/event-stream".to_string(),
        ));
    }

    let pending = state.pending.clone();
    let rx = pending.subscribe();

    // Current state first, then one event per list change.
    let initial = render_event(&pending);
    let initial = futures::stream::once(async move { Ok::<_, Infallible>(initial) });

    let updates = futures::stream::unfold((rx, pending), |(mut rx, pending)| async move {
        if rx.changed().await.is_err() {
            return None;
        }

        let event = render_event(&pending);
        Some((Ok(event), (rx, pending)))
    });

    let stream = futures::StreamExt::chain(initial, updates);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn render_event(pending: &crate::queue::PendingList) -> Event {
    Event::default()
        .event("list-reload")
        .data(render::task_list(&pending.snapshot()))
}

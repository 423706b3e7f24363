//! Server-Sent Events streams over the fan-out bus.
//!
//! Each stream is one topic subscription. Events are hints: clients
//! re-fetch the affected feed or post on receipt, so a lagged receiver
//! that missed events just re-fetches once and is caught up.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use nagare_common::{AppError, AppResult, Identity};
use nagare_queue::{ChangeEvent, Topic};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::{extractors::AuthUser, middleware::AppState};

/// Turn a topic receiver into an SSE response.
///
/// Starts with a `connected` event so clients know the subscription is
/// live, then forwards change events as JSON. Keep-alive pings hold the
/// connection open through idle periods.
fn change_stream(
    rx: broadcast::Receiver<ChangeEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        result.ok().map(|event| {
            Ok(Event::default()
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().data("error")))
        })
    });

    let initial = stream::once(async { Ok(Event::default().event("connected").data("{}")) });

    Sse::new(initial.chain(stream)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

fn require_admin(caller: &Identity) -> AppResult<()> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin privilege required".to_string()))
    }
}

/// Public approved-posts stream.
async fn approved_posts(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.fanout.subscribe(&Topic::ApprovedPosts).await;
    change_stream(rx)
}

/// Single-post stream (comments and reactions on one post).
async fn single_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.fanout.subscribe(&Topic::Post(id)).await;
    change_stream(rx)
}

/// Admin pending-queue stream.
async fn pending_posts(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    require_admin(&caller)?;
    let rx = state.fanout.subscribe(&Topic::PendingPosts).await;
    Ok(change_stream(rx))
}

/// Admin reports stream.
async fn reports(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    require_admin(&caller)?;
    let rx = state.fanout.subscribe(&Topic::Reports).await;
    Ok(change_stream(rx))
}

/// Create SSE router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(approved_posts))
        .route("/posts/{id}", get(single_post))
        .route("/pending", get(pending_posts))
        .route("/reports", get(reports))
}

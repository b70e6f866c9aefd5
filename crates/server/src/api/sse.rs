// SSE transport: GET /sse opens a session stream, POST /messages feeds it

use super::{ApiError, ApiResult};
use crate::config::AppState;
use crate::sessions::{PendingReply, Session, SessionGuard, SessionTable};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
};
use futures::Stream;
use searxng_mcp::protocol::JsonRpcResponse;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Open a session and stream its replies
pub async fn open_stream(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let (session, outbound) = state.sessions.open().map_err(|e| {
        tracing::error!(error = %e, "Refusing new SSE session");
        ApiError::unavailable(e)
    })?;

    // Owned by the stream from the start, so dropping it unpolled still
    // releases the session
    let guard = SessionGuard::new(state.sessions.clone(), session.id());
    let stream = session_events(
        state.sessions.clone(),
        guard,
        session,
        outbound,
        state.idle_timeout,
    );

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.keep_alive)
            .text("keep-alive"),
    ))
}

fn session_events(
    table: Arc<SessionTable>,
    guard: SessionGuard,
    session: Arc<Session>,
    mut outbound: mpsc::UnboundedReceiver<PendingReply>,
    idle_timeout: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let _guard = guard;

        yield Ok(Event::default()
            .event("endpoint")
            .data(format!("/messages?sessionId={}", session.id())));

        loop {
            let pending = tokio::select! {
                biased;
                next = outbound.recv() => match next {
                    Some(pending) => pending,
                    None => break,
                },
                _ = tokio::time::sleep_until(session.idle_deadline(idle_timeout)) => {
                    if tokio::time::Instant::now() >= session.idle_deadline(idle_timeout) {
                        tracing::info!(session_id = %session.id(), "SSE session idle, closing");
                        table.close(&session.id());
                    }
                    continue;
                }
            };

            // Notifications leave their slot empty
            let Ok(response) = pending.await else {
                continue;
            };

            match serde_json::to_string(&response) {
                Ok(data) => yield Ok(Event::default().event("message").data(data)),
                Err(e) => tracing::error!(error = %e, "Failed to serialize SSE reply"),
            }
        }

        tracing::debug!(session_id = %session.id(), "SSE stream finished");
    }
}

/// Accept one JSON-RPC message for an open session.
///
/// The session is resolved before the body is looked at; the reply, if any,
/// arrives on the session's stream.
pub async fn submit_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let raw_id = query
        .get("sessionId")
        .ok_or_else(|| ApiError::bad_request(anyhow::anyhow!("Missing sessionId")))?;
    let session_id = Uuid::parse_str(raw_id)
        .map_err(|_| ApiError::bad_request(anyhow::anyhow!("Invalid sessionId")))?;

    let session = state.sessions.get(&session_id).ok_or_else(|| {
        tracing::warn!(session_id = %session_id, "Message for unknown session");
        ApiError::not_found(anyhow::anyhow!("Session not found"))
    })?;
    let slot = session.submit().map_err(ApiError::not_found)?;

    // The call runs to completion even if the session closes meanwhile
    let server = state.server.clone();
    tokio::spawn(async move {
        server
            .handle(&body, move |response: JsonRpcResponse| {
                let _ = slot.send(response);
            })
            .await;
    });

    Ok(StatusCode::ACCEPTED)
}

// SSE session table
//
// Each session owns an ordered queue of pending replies. A submission
// reserves its slot at accept time, so the stream writer emits replies in
// acceptance order even when the calls themselves finish out of order.

use chrono::{DateTime, Utc};
use searxng_mcp::protocol::JsonRpcResponse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use uuid::Uuid;

/// Slot for one accepted submission. Dropped without a value when the
/// request was a notification.
pub type PendingReply = oneshot::Receiver<JsonRpcResponse>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Stream accepted, no message submitted yet
    Open,
    /// At least one message accepted
    Active,
    Closed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Too many open sessions (limit {0})")]
    Capacity(usize),
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    last_activity: Instant,
    outbound: Option<mpsc::UnboundedSender<PendingReply>>,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state
    }

    /// Reserve the next reply slot on this session's stream.
    pub fn submit(&self) -> Result<oneshot::Sender<JsonRpcResponse>, SessionError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == SessionState::Closed {
            return Err(SessionError::NotFound);
        }
        let outbound = inner.outbound.as_ref().ok_or(SessionError::NotFound)?;

        let (tx, rx) = oneshot::channel();
        outbound.send(rx).map_err(|_| SessionError::NotFound)?;

        inner.state = SessionState::Active;
        inner.last_activity = Instant::now();
        Ok(tx)
    }

    /// When the session expires if nothing else is submitted.
    pub fn idle_deadline(&self, idle_timeout: Duration) -> Instant {
        self.inner.lock().unwrap().last_activity + idle_timeout
    }

    /// Mark closed and drop the queue sender. Replies already queued are
    /// still drained by the writer.
    fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = SessionState::Closed;
        inner.outbound = None;
    }
}

/// All live SSE sessions, keyed by their token.
///
/// The map lock is only held to insert, look up or remove; per-session state
/// sits behind each session's own lock.
#[derive(Debug)]
pub struct SessionTable {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    max_sessions: usize,
}

impl SessionTable {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Mint a session and hand back the receiving end of its reply queue.
    pub fn open(
        &self,
    ) -> Result<(Arc<Session>, mpsc::UnboundedReceiver<PendingReply>), SessionError> {
        let mut sessions = self.sessions.write().unwrap();
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::Capacity(self.max_sessions));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Session {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Open,
                last_activity: Instant::now(),
                outbound: Some(tx),
            }),
        });
        sessions.insert(session.id, session.clone());

        tracing::info!(session_id = %session.id, active = sessions.len(), "SSE session opened");
        Ok((session, rx))
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.read().unwrap().get(id).cloned()
    }

    /// Close and forget a session. Returns false if it was already gone.
    pub fn close(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().unwrap().remove(id);
        match removed {
            Some(session) => {
                session.close();
                let lifetime = Utc::now().signed_duration_since(session.created_at());
                tracing::info!(
                    session_id = %id,
                    lifetime_secs = lifetime.num_seconds(),
                    "SSE session closed"
                );
                true
            }
            None => false,
        }
    }

    pub fn close_all(&self) {
        let drained: Vec<Arc<Session>> = self
            .sessions
            .write()
            .unwrap()
            .drain()
            .map(|(_, session)| session)
            .collect();
        for session in &drained {
            session.close();
        }
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "Closed all SSE sessions");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes its session from the table when the stream that owns it is
/// dropped, whether it ended or the client went away.
pub struct SessionGuard {
    table: Arc<SessionTable>,
    id: Uuid,
}

impl SessionGuard {
    pub fn new(table: Arc<SessionTable>, id: Uuid) -> Self {
        Self { table, id }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.table.close(&self.id);
    }
}

//! Session router for flattened target sessions.
//!
//! Tracks which session id to prefix on commands for each logical
//! execution context and manages attach/detach of targets. All sessions
//! share the single [`Connection`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             SessionRouter               │
//! │            (one connection)             │
//! │  ┌─────────────────────────────────┐    │
//! │  │ <top-level>  → page             │    │
//! │  │ SessionId=A  → TargetId=page-2  │    │
//! │  │ SessionId=B  → TargetId=frame-1 │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Sessions are forgotten when the browser reports
//! `Target.detachedFromTarget` or `Target.targetDestroyed`. Commands still
//! sent with a forgotten id fail with the browser's own "session not found"
//! error.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::identifiers::{SessionId, TargetId};
use crate::protocol::{AttachResult, Command, ParsedEvent, TargetCommand, TargetInfo, TargetInfosResult};
use crate::transport::{Connection, EventStream};

// ============================================================================
// Session
// ============================================================================

/// A logical execution context reachable over the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    target_id: Option<TargetId>,
    parent: Option<SessionId>,
}

impl Session {
    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the attached target, if any.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> Option<&TargetId> {
        self.target_id.as_ref()
    }

    /// Returns the session the attach was issued from.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&SessionId> {
        self.parent.as_ref()
    }

    /// Returns `true` for the implicit top-level session.
    #[inline]
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.id.is_top_level()
    }
}

// ============================================================================
// SessionRouter
// ============================================================================

/// Maps targets to flattened sessions on one connection.
///
/// Thread-safe; shared behind an `Arc` by every routing context.
pub struct SessionRouter {
    /// Shared connection.
    connection: Connection,

    /// Attached sessions by id.
    sessions: RwLock<FxHashMap<SessionId, Session>>,

    /// Session per attached target.
    targets: RwLock<FxHashMap<TargetId, SessionId>>,

    /// Serializes attach round-trips so a target is attached once.
    attach_lock: tokio::sync::Mutex<()>,
}

// ============================================================================
// SessionRouter - Constructor
// ============================================================================

impl SessionRouter {
    /// Creates a router over a connection and starts the target watcher.
    #[must_use]
    pub fn new(connection: Connection) -> Arc<Self> {
        let detached = connection.subscribe("Target.detachedFromTarget", None);
        let destroyed = connection.subscribe("Target.targetDestroyed", None);

        let router = Arc::new(Self {
            connection,
            sessions: RwLock::new(FxHashMap::default()),
            targets: RwLock::new(FxHashMap::default()),
            attach_lock: tokio::sync::Mutex::new(()),
        });

        tokio::spawn(Self::watch_targets(Arc::downgrade(&router), detached, destroyed));

        router
    }

    /// Forgets sessions as the browser reports them gone.
    async fn watch_targets(router: Weak<Self>, mut detached: EventStream, mut destroyed: EventStream) {
        loop {
            let event = tokio::select! {
                event = detached.next() => event,
                event = destroyed.next() => event,
            };

            let Some(event) = event else {
                debug!("Target watcher stopped");
                break;
            };
            let Some(router) = router.upgrade() else {
                break;
            };

            match event.parse() {
                ParsedEvent::DetachedFromTarget { session_id, .. } => {
                    router.forget_session(&session_id);
                }
                ParsedEvent::TargetDestroyed { target_id } => {
                    router.forget_target(&target_id);
                }
                _ => {}
            }
        }
    }
}

// ============================================================================
// SessionRouter - Public API
// ============================================================================

impl SessionRouter {
    /// Returns the shared connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the implicit top-level session.
    #[must_use]
    pub fn resolve_default_session(&self) -> Session {
        Session {
            id: SessionId::top_level(),
            target_id: None,
            parent: None,
        }
    }

    /// Attaches to a target from the top-level session.
    ///
    /// Idempotent: an already-attached target returns its existing session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Protocol`] if the browser refuses the attach.
    pub async fn attach_to_target(&self, target_id: &TargetId) -> Result<Session> {
        self.attach_to_target_from(target_id, &SessionId::top_level())
            .await
    }

    /// Attaches to a target, issuing the attach through `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Protocol`] if the browser refuses the attach.
    pub async fn attach_to_target_from(
        &self,
        target_id: &TargetId,
        parent: &SessionId,
    ) -> Result<Session> {
        if let Some(session) = self.session_for_target(target_id) {
            return Ok(session);
        }

        let _guard = self.attach_lock.lock().await;

        // Another caller may have attached while we waited.
        if let Some(session) = self.session_for_target(target_id) {
            return Ok(session);
        }

        let value = self
            .connection
            .send(
                TargetCommand::AttachToTarget {
                    target_id: target_id.clone(),
                    flatten: true,
                },
                parent,
            )
            .await?;
        let AttachResult { session_id } = serde_json::from_value(value)?;

        let session = Session {
            id: session_id.clone(),
            target_id: Some(target_id.clone()),
            parent: Some(parent.clone()),
        };

        self.sessions.write().insert(session_id.clone(), session.clone());
        self.targets.write().insert(target_id.clone(), session_id.clone());

        info!(%target_id, %session_id, parent = %parent, "Attached to target");

        Ok(session)
    }

    /// Detaches a session and forgets it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Protocol`] if the browser rejects the detach.
    pub async fn detach(&self, session_id: &SessionId) -> Result<()> {
        let via = self
            .session(session_id)
            .and_then(|s| s.parent)
            .unwrap_or_default();

        let result = self
            .connection
            .send(
                TargetCommand::DetachFromTarget {
                    session_id: session_id.clone(),
                },
                &via,
            )
            .await;

        self.forget_session(session_id);
        result.map(|_| ())
    }

    /// Lists targets known to the browser.
    ///
    /// # Errors
    ///
    /// Returns an error if `Target.getTargets` fails.
    pub async fn targets(&self) -> Result<Vec<TargetInfo>> {
        let value = self
            .connection
            .send(TargetCommand::GetTargets, &SessionId::top_level())
            .await?;
        let TargetInfosResult { target_infos } = serde_json::from_value(value)?;
        Ok(target_infos)
    }

    /// Sends a command through a session.
    ///
    /// The id is used verbatim; a detached id surfaces the browser's
    /// rejection.
    ///
    /// # Errors
    ///
    /// Any error from [`Connection::send`].
    pub async fn execute(&self, session_id: &SessionId, command: impl Into<Command>) -> Result<Value> {
        self.connection.send(command, session_id).await
    }

    /// Returns an attached session by id.
    #[must_use]
    pub fn session(&self, session_id: &SessionId) -> Option<Session> {
        if session_id.is_top_level() {
            return Some(self.resolve_default_session());
        }
        self.sessions.read().get(session_id).cloned()
    }

    /// Returns the session attached to a target.
    #[must_use]
    pub fn session_for_target(&self, target_id: &TargetId) -> Option<Session> {
        let session_id = self.targets.read().get(target_id).cloned()?;
        self.sessions.read().get(&session_id).cloned()
    }

    /// Returns the number of attached sessions (excluding top-level).
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

// ============================================================================
// SessionRouter - Internal
// ============================================================================

impl SessionRouter {
    /// Forgets a session and every session attached through it.
    fn forget_session(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.write();
        let mut targets = self.targets.write();

        let mut doomed = vec![session_id.clone()];
        while let Some(id) = doomed.pop() {
            if let Some(session) = sessions.remove(&id) {
                if let Some(target_id) = &session.target_id {
                    targets.remove(target_id);
                }
                debug!(session_id = %id, "Session forgotten");
            }
            doomed.extend(
                sessions
                    .values()
                    .filter(|s| s.parent.as_ref() == Some(&id))
                    .map(|s| s.id.clone()),
            );
        }
    }

    /// Forgets the session of a destroyed target.
    fn forget_target(&self, target_id: &TargetId) {
        let session_id = self.targets.read().get(target_id).cloned();
        match session_id {
            Some(session_id) => self.forget_session(&session_id),
            None => debug!(%target_id, "Destroyed target had no session"),
        }
    }
}

impl std::fmt::Debug for SessionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRouter")
            .field("sessions", &self.session_count())
            .field("connection", &self.connection)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Routing context carried by every queryable entity.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::SessionId;
use crate::protocol::Command;
use crate::wait::WaitOptions;

use super::SessionRouter;

// ============================================================================
// RoutingContext
// ============================================================================

/// The (session, router) pair a command on an entity must use.
///
/// Entities produced by a query inherit their scope's context; crossing
/// into an out-of-process frame replaces it with the attached session's.
/// The context also carries the wait defaults, which follow it across
/// sessions.
#[derive(Clone)]
pub struct RoutingContext {
    session_id: SessionId,
    router: Arc<SessionRouter>,
    wait: WaitOptions,
}

impl RoutingContext {
    /// Creates a context for a session.
    #[inline]
    #[must_use]
    pub fn new(router: Arc<SessionRouter>, session_id: SessionId) -> Self {
        Self {
            session_id,
            router,
            wait: WaitOptions::default(),
        }
    }

    /// Sets the wait defaults used by `wait_for`-style operations.
    #[inline]
    #[must_use]
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Creates the top-level context.
    #[inline]
    #[must_use]
    pub fn top_level(router: Arc<SessionRouter>) -> Self {
        Self::new(router, SessionId::top_level())
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the wait defaults.
    #[inline]
    #[must_use]
    pub fn wait(&self) -> WaitOptions {
        self.wait
    }

    /// Returns the router.
    #[inline]
    #[must_use]
    pub fn router(&self) -> &Arc<SessionRouter> {
        &self.router
    }

    /// Returns a context for another session on the same router.
    #[inline]
    #[must_use]
    pub fn for_session(&self, session_id: SessionId) -> Self {
        Self::new(Arc::clone(&self.router), session_id).with_wait(self.wait)
    }

    /// Sends a command through this context's session.
    ///
    /// # Errors
    ///
    /// Any transport or protocol error.
    pub async fn execute(&self, command: impl Into<Command>) -> Result<Value> {
        self.router.execute(&self.session_id, command).await
    }

    /// Sends a command and deserializes its result.
    ///
    /// # Errors
    ///
    /// Any transport or protocol error, or [`crate::Error::Json`] if the
    /// result does not have the expected shape.
    pub async fn call<T: DeserializeOwned>(&self, command: impl Into<Command>) -> Result<T> {
        let value = self.execute(command).await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl PartialEq for RoutingContext {
    fn eq(&self, other: &Self) -> bool {
        self.session_id == other.session_id && Arc::ptr_eq(&self.router, &other.router)
    }
}

impl Eq for RoutingContext {}

impl fmt::Debug for RoutingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingContext")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Event subscription registry.
//!
//! Subscribers are keyed by event method and optionally filtered by
//! session. Each subscriber owns an unbounded channel, so delivery never
//! blocks the event loop and preserves receive order per method.
//!
//! Dropping an [`EventStream`] unsubscribes it.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::trace;

use crate::identifiers::{SessionId, SubscriptionId};
use crate::protocol::Event;

// ============================================================================
// SubscriptionRegistry
// ============================================================================

/// One registered listener.
struct Subscriber {
    id: SubscriptionId,
    session: Option<SessionId>,
    tx: mpsc::UnboundedSender<Event>,
}

/// Listeners grouped by method.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    by_method: FxHashMap<String, Vec<Subscriber>>,
    closed: bool,
}

impl SubscriptionRegistry {
    /// Registers a listener and returns its stream.
    ///
    /// After [`clear`](Self::clear) the returned stream is already ended.
    pub(crate) fn subscribe(
        registry: &Arc<Mutex<Self>>,
        method: &str,
        session: Option<SessionId>,
    ) -> EventStream {
        let id = SubscriptionId::next();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut guard = registry.lock();
            if guard.closed {
                trace!(%id, method, "Subscribed after close");
            } else {
                guard
                    .by_method
                    .entry(method.to_string())
                    .or_default()
                    .push(Subscriber { id, session, tx });
                trace!(%id, method, "Subscribed");
            }
        }

        EventStream {
            id,
            method: method.to_string(),
            rx,
            registry: Arc::downgrade(registry),
        }
    }

    /// Removes a listener.
    fn unsubscribe(&mut self, method: &str, id: SubscriptionId) {
        if let Some(subscribers) = self.by_method.get_mut(method) {
            subscribers.retain(|s| s.id != id);
            if subscribers.is_empty() {
                self.by_method.remove(method);
            }
        }
    }

    /// Delivers an event to every matching listener.
    ///
    /// Returns the number of listeners reached.
    pub(crate) fn dispatch(&mut self, event: &Event) -> usize {
        let Some(subscribers) = self.by_method.get_mut(&event.method) else {
            return 0;
        };

        let mut delivered = 0;
        subscribers.retain(|s| {
            if s.session.as_ref().is_some_and(|sid| *sid != event.session_id) {
                return true;
            }
            match s.tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }

    /// Returns the number of listeners for a method.
    #[cfg(test)]
    pub(crate) fn count(&self, method: &str) -> usize {
        self.by_method.get(method).map_or(0, Vec::len)
    }

    /// Drops every listener, ending their streams, and refuses new ones.
    pub(crate) fn clear(&mut self) {
        self.closed = true;
        self.by_method.clear();
    }
}

// ============================================================================
// EventStream
// ============================================================================

/// Stream of events for one method.
///
/// Ends when the connection closes. Dropping it unsubscribes.
pub struct EventStream {
    id: SubscriptionId,
    method: String,
    rx: mpsc::UnboundedReceiver<Event>,
    registry: Weak<Mutex<SubscriptionRegistry>>,
}

impl EventStream {
    /// Returns the subscription id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the subscribed method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the connection has closed.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().unsubscribe(&self.method, self.id);
            trace!(id = %self.id, method = %self.method, "Unsubscribed");
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("id", &self.id)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn event(method: &str, session: &str) -> Event {
        Event {
            method: method.to_string(),
            params: json!({}),
            session_id: SessionId::new(session),
        }
    }

    #[test]
    fn test_session_filter() {
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::default()));
        let mut any = SubscriptionRegistry::subscribe(&registry, "Page.loadEventFired", None);
        let mut only_a =
            SubscriptionRegistry::subscribe(&registry, "Page.loadEventFired", Some(SessionId::new("A")));

        let delivered = registry.lock().dispatch(&event("Page.loadEventFired", "B"));
        assert_eq!(delivered, 1);

        assert!(any.rx.try_recv().is_ok());
        assert!(only_a.rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::default()));
        let stream = SubscriptionRegistry::subscribe(&registry, "Target.targetDestroyed", None);
        assert_eq!(registry.lock().count("Target.targetDestroyed"), 1);

        drop(stream);
        assert_eq!(registry.lock().count("Target.targetDestroyed"), 0);
    }

    #[tokio::test]
    async fn test_clear_ends_streams() {
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::default()));
        let mut stream = SubscriptionRegistry::subscribe(&registry, "Runtime.consoleAPICalled", None);

        registry.lock().clear();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscribe_after_clear_is_ended() {
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::default()));
        registry.lock().clear();

        let mut stream = SubscriptionRegistry::subscribe(&registry, "Target.targetDestroyed", None);
        assert_eq!(registry.lock().count("Target.targetDestroyed"), 0);
        assert!(stream.next().await.is_none());
    }
}

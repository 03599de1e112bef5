//! Client facade.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::dom::Page;
use crate::error::Result;
use crate::identifiers::TargetId;
use crate::protocol::TargetInfo;
use crate::session::{RoutingContext, SessionRouter};
use crate::transport::Connection;

use super::builder::ClientBuilder;
use super::limiter::TaskLimiter;
use super::options::ClientOptions;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
struct ClientInner {
    /// Session router over the shared connection.
    router: Arc<SessionRouter>,
    /// Configuration.
    options: ClientOptions,
    /// Bound for high-level tasks.
    limiter: TaskLimiter,
}

// ============================================================================
// Client
// ============================================================================

/// Entry point: one connection, its sessions, and a task limiter.
///
/// # Example
///
/// ```no_run
/// use cdp_scope::{By, Client};
///
/// # async fn example() -> cdp_scope::Result<()> {
/// let client = Client::builder()
///     .endpoint("ws://127.0.0.1:9222/devtools/page/ABC")
///     .connect()
///     .await?;
///
/// let page = client.page();
/// let button = page.find(By::css("#host iframe > button")).await?;
/// button.click().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("sessions", &self.inner.router.session_count())
            .field("max_concurrency", &self.inner.limiter.max())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Construction
// ============================================================================

impl Client {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Wraps an established connection.
    #[must_use]
    pub fn from_connection(connection: Connection, options: ClientOptions) -> Self {
        let limiter = TaskLimiter::new(options.max_concurrency.max(1));
        Self {
            inner: Arc::new(ClientInner {
                router: SessionRouter::new(connection),
                options,
                limiter,
            }),
        }
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Returns the session router.
    #[inline]
    #[must_use]
    pub fn router(&self) -> &Arc<SessionRouter> {
        &self.inner.router
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Returns the task limiter.
    #[inline]
    #[must_use]
    pub fn limiter(&self) -> &TaskLimiter {
        &self.inner.limiter
    }

    /// Returns the page of the default (top-level) session.
    ///
    /// The page and everything found through it use the configured wait
    /// defaults.
    #[must_use]
    pub fn page(&self) -> Page {
        let context = RoutingContext::top_level(Arc::clone(&self.inner.router))
            .with_wait(self.inner.options.wait);
        Page::new(context, None)
    }
}

// ============================================================================
// Client - Targets
// ============================================================================

impl Client {
    /// Lists targets known to the browser.
    ///
    /// # Errors
    ///
    /// Any transport or protocol error.
    pub async fn targets(&self) -> Result<Vec<TargetInfo>> {
        self.inner.router.targets().await
    }

    /// Attaches to a page target and returns its page.
    ///
    /// Attaching an already-attached target reuses its session.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Protocol`] if the browser refuses the attach.
    pub async fn attach_page(&self, target_id: &TargetId) -> Result<Page> {
        let session = self.inner.router.attach_to_target(target_id).await?;
        let context = RoutingContext::new(Arc::clone(&self.inner.router), session.id().clone())
            .with_wait(self.inner.options.wait);
        Ok(Page::new(context, Some(target_id.clone())))
    }
}

// ============================================================================
// Client - Tasks & Lifecycle
// ============================================================================

impl Client {
    /// Runs a task once fewer than `max_concurrency` tasks are running.
    ///
    /// # Errors
    ///
    /// The task's own error, or [`crate::Error::ConnectionClosed`] after
    /// [`Client::close`].
    pub async fn run<T, F>(&self, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.inner.limiter.run(task).await
    }

    /// Stops admitting tasks and closes the connection.
    pub fn close(&self) {
        info!("Closing client");
        self.inner.limiter.close();
        self.inner.router.connection().shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    use crate::testing::{FakeBrowser, Reply};
    use crate::wait::WaitOptions;

    #[tokio::test]
    async fn test_attach_page_routes_through_new_session() {
        let (browser, connection) = FakeBrowser::start(|request| match request.method.as_str() {
            "Target.attachToTarget" => Reply::Result(json!({ "sessionId": "TAB-1" })),
            _ => Reply::Result(json!({ "result": { "type": "number", "value": 2 } })),
        })
        .await;
        let client = Client::from_connection(connection, ClientOptions::new());

        let page = client.attach_page(&TargetId::new("T1")).await.expect("attach");
        assert_eq!(page.session_id().as_str(), "TAB-1");
        assert_eq!(page.target_id().map(TargetId::as_str), Some("T1"));

        let value = page.evaluate("1 + 1").await.expect("evaluate");
        assert_eq!(value, json!(2));
        assert_eq!(browser.requests_for("Runtime.evaluate")[0].session_id.as_str(), "TAB-1");

        // Second attach reuses the session.
        client.attach_page(&TargetId::new("T1")).await.expect("attach again");
        assert_eq!(browser.requests_for("Target.attachToTarget").len(), 1);
    }

    #[tokio::test]
    async fn test_default_page_is_top_level() {
        let (_browser, connection) = FakeBrowser::start(|_| Reply::Result(json!({}))).await;
        let client = Client::from_connection(connection, ClientOptions::new());

        assert!(client.page().session_id().is_top_level());
        assert!(client.page().target_id().is_none());
    }

    #[tokio::test]
    async fn test_pages_use_configured_wait_defaults() {
        let (_browser, connection) = FakeBrowser::start(|request| match request.method.as_str() {
            "Target.attachToTarget" => Reply::Result(json!({ "sessionId": "TAB-1" })),
            _ => Reply::Result(json!({ "result": { "type": "object", "subtype": "null", "value": null } })),
        })
        .await;
        let wait = WaitOptions::new(Duration::from_millis(120)).with_interval(Duration::from_millis(20));
        let client = Client::from_connection(connection, ClientOptions::new().with_wait(wait));

        assert_eq!(client.page().context().wait(), wait);
        let attached = client.attach_page(&TargetId::new("T1")).await.expect("attach");
        assert_eq!(attached.context().wait(), wait);

        let err = client.page().wait_for("#never").await.unwrap_err();
        assert!(matches!(err, crate::Error::Timeout { timeout_ms: 120, .. }));
    }

    #[tokio::test]
    async fn test_close_rejects_new_tasks_and_stops_connection() {
        let (_browser, connection) = FakeBrowser::start(|_| Reply::Result(json!({}))).await;
        let client = Client::from_connection(connection, ClientOptions::new().with_max_concurrency(1));

        let value = client.run(async { Ok(5) }).await.expect("run");
        assert_eq!(value, 5);

        client.close();
        assert!(client.run(async { Ok(()) }).await.is_err());

        tokio::time::timeout(Duration::from_secs(2), async {
            while !client.router().connection().is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("connection closes");
    }
}

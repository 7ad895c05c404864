//! Per-call session acquisition with the store-facing retry policy.
//!
//! The gateway never retries; all resilience for the connection attempt
//! itself lives here, bounded by the fixed client tuning.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::warn;

use configs::StoreConfig;

use crate::errors::StoreError;
use crate::store::{SessionOptions, StoreConnection, StoreTransport};

/// Client-side resilience knobs for a single connect call.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub retry_pause: Duration,
    /// Bound on one session-open attempt.
    pub session_timeout: Duration,
    /// Bound on the whole connect call, pauses included.
    pub recoverable_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_pause: Duration::from_millis(1000),
            session_timeout: Duration::from_millis(10_000),
            recoverable_wait: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &StoreConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            retry_pause: Duration::from_millis(cfg.retry_pause_ms),
            session_timeout: Duration::from_millis(cfg.session_timeout_ms),
            recoverable_wait: Duration::from_millis(cfg.recoverable_wait_ms),
        }
    }
}

/// Opens one authenticated session per call against the configured
/// transport. Authentication failures surface immediately; any other
/// fault is retried within the policy bounds, then surfaced as
/// [`StoreError::Io`].
pub struct ConnectionFactory {
    transport: Arc<dyn StoreTransport>,
    opts: SessionOptions,
    retry: RetryPolicy,
}

impl ConnectionFactory {
    pub fn new(transport: Arc<dyn StoreTransport>, opts: SessionOptions, retry: RetryPolicy) -> Self {
        Self { transport, opts, retry }
    }

    pub fn from_config(transport: Arc<dyn StoreTransport>, cfg: &StoreConfig) -> Self {
        Self::new(
            transport,
            SessionOptions { principal: cfg.principal.clone() },
            RetryPolicy::from_config(cfg),
        )
    }

    pub async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        let attempts = async {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                let opened = timeout(self.retry.session_timeout, self.transport.open_session(&self.opts)).await;
                let err = match opened {
                    Ok(Ok(conn)) => return Ok(conn),
                    Ok(Err(err @ StoreError::Authentication(_))) => return Err(err),
                    Ok(Err(err)) => err,
                    Err(_) => StoreError::Io(format!(
                        "session open timed out after {:?}",
                        self.retry.session_timeout
                    )),
                };
                if attempt > self.retry.max_retries {
                    return Err(err);
                }
                warn!(attempt, error = %err, "session open failed, retrying");
                sleep(self.retry.retry_pause).await;
            }
        };

        match timeout(self.retry.recoverable_wait, attempts).await {
            Ok(outcome) => outcome,
            Err(_) => Err(StoreError::Io(format!(
                "store unreachable within {:?}",
                self.retry.recoverable_wait
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            retry_pause: Duration::from_millis(5),
            session_timeout: Duration::from_millis(100),
            recoverable_wait: Duration::from_millis(500),
        }
    }

    fn factory(store: &MemoryStore, retry: RetryPolicy) -> ConnectionFactory {
        ConnectionFactory::new(Arc::new(store.clone()), SessionOptions::default(), retry)
    }

    #[tokio::test]
    async fn transient_faults_are_retried_until_success() {
        let store = MemoryStore::new();
        store.fail_next_connects(2);

        let conn = factory(&store, fast_policy()).connect().await.unwrap();
        conn.close().await;
        assert_eq!(store.connect_attempts(), 3);
        assert_eq!(store.open_handles(), 0);
    }

    #[tokio::test]
    async fn retries_exhaust_into_io() {
        let store = MemoryStore::new();
        store.fail_next_connects(10);

        let err = factory(&store, fast_policy()).connect().await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        // first attempt plus max_retries
        assert_eq!(store.connect_attempts(), 4);
    }

    #[tokio::test]
    async fn authentication_failures_are_never_retried() {
        let store = MemoryStore::with_required_principal("svc");

        let err = factory(&store, fast_policy()).connect().await.unwrap_err();
        assert!(matches!(err, StoreError::Authentication(_)));
        assert_eq!(store.connect_attempts(), 1);
    }

    struct HangingTransport;

    #[async_trait]
    impl crate::store::StoreTransport for HangingTransport {
        async fn open_session(
            &self,
            _opts: &SessionOptions,
        ) -> Result<Box<dyn StoreConnection>, StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stuck_transport_surfaces_io_within_session_timeout() {
        let retry = RetryPolicy {
            max_retries: 0,
            retry_pause: Duration::from_millis(1),
            session_timeout: Duration::from_millis(20),
            recoverable_wait: Duration::from_millis(200),
        };
        let factory = ConnectionFactory::new(Arc::new(HangingTransport), SessionOptions::default(), retry);

        let err = factory.connect().await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}

//! Connection manager: opens sessions following an [`AttemptPlan`].

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{AttemptLimit, AttemptPlan, ConnectError};
use crate::ssh::{Session, SessionProvider, SshTarget};

/// Opens sessions to one target, retrying per plan.
///
/// Holds no state between calls to [`connect`](Self::connect).
#[derive(Clone)]
pub struct ConnectionManager {
    provider: Arc<dyn SessionProvider>,
    target: SshTarget,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    #[must_use]
    pub fn new(provider: Arc<dyn SessionProvider>, target: SshTarget) -> Self {
        Self { provider, target }
    }

    #[must_use]
    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Open a session, trying up to `limit` times with `retry_delay` between
    /// attempts.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::Exhausted` with the last transport failure once
    /// the plan runs out, or `ConnectError::Cancelled` if `cancel` fires.
    pub async fn connect(
        &self,
        limit: AttemptLimit,
        retry_delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn Session>, ConnectError> {
        let host = &self.target.hostname;
        let port = self.target.port;

        for attempt in AttemptPlan::new(limit, retry_delay) {
            if cancel.is_cancelled() {
                return Err(ConnectError::Cancelled);
            }
            tracing::debug!(
                attempt = attempt.number,
                %host,
                port,
                retry_delay = ?attempt.retry_delay,
                "Connection attempt"
            );

            let result = tokio::select! {
                biased;

                () = cancel.cancelled() => return Err(ConnectError::Cancelled),
                result = self.provider.open(&self.target) => result,
            };

            let error = match result {
                Ok(session) => return Ok(session),
                Err(e) => e,
            };
            tracing::error!(error = %error, %host, port, "Exception connecting");

            let Some(delay) = attempt.retry_delay else {
                return Err(ConnectError::Exhausted {
                    attempts: attempt.number,
                    source: error,
                });
            };

            if delay > Duration::ZERO {
                tracing::info!(delay = ?delay, "Trying again");
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => return Err(ConnectError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        // Bounded plans always end on an attempt without a delay, which
        // returns above; unbounded plans never end.
        Err(ConnectError::Cancelled)
    }
}

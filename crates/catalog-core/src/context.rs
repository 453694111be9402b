//! Cancellable, time-bounded operation context.
//!
//! Every storage operation receives an [`OpContext`]. Backends call
//! [`OpContext::check`] on entry and again right before committing, so a
//! cancelled or expired context never leaves a partial write behind.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CatalogError, CatalogResult, ErrorCode};

/// Cancellation token plus an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Build a context around an existing token (e.g. a shutdown token).
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// A child context: cancelled with its parent, optionally with a tighter deadline.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout) {
            (Some(parent), Some(t)) => Some(parent.min(Instant::now() + t)),
            (None, Some(t)) => Some(Instant::now() + t),
            (parent, None) => parent,
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Cancel this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the context is cancelled or expired.
    pub fn check(&self) -> CatalogResult<()> {
        if self.token.is_cancelled() {
            return Err(CatalogError::Cancelled {
                message: "operation was cancelled".to_string(),
                code: ErrorCode::CtxCancelled,
            });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(deadline_exceeded());
            }
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or expires first.
    ///
    /// On cancellation the future is dropped before it completes.
    pub async fn run<T, F>(&self, fut: F) -> CatalogResult<T>
    where
        F: Future<Output = CatalogResult<T>>,
    {
        self.check()?;
        let sleep = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(CatalogError::Cancelled {
                message: "operation was cancelled".to_string(),
                code: ErrorCode::CtxCancelled,
            }),
            _ = sleep => Err(deadline_exceeded()),
            result = fut => result,
        }
    }
}

fn deadline_exceeded() -> CatalogError {
    CatalogError::Cancelled {
        message: "operation deadline exceeded".to_string(),
        code: ErrorCode::CtxDeadlineExceeded,
    }
}

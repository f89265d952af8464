// Cancellable tasks with an optional deadline.
//
// Timeouts and teardown share one mechanism: every guarded future races the
// owner's cancel signal and, when given, a deadline.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

use crate::domain::errors::ClientError;

/// Owner side of a cancellation pair. Dropping it cancels.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.tx.send_replace(true);
    }
}

/// Observer side of a cancellation pair, cheap to clone into tasks.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires, for callers without an owning view.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the owner cancels or goes away.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending::<()>().await;
        };
        let mut rx = rx.clone();
        // A closed channel means the handle was dropped, which also cancels.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx: Some(rx) })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    TimedOut(Duration),
    Cancelled,
}

impl From<Interrupted> for ClientError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::TimedOut(limit) => ClientError::Timeout(limit),
            Interrupted::Cancelled => ClientError::Cancelled,
        }
    }
}

/// Drives `fut` until it completes, the deadline passes, or `signal` fires.
/// Cancellation wins ties so no result is delivered after teardown.
pub async fn run_guarded<F>(
    fut: F,
    deadline: Option<Duration>,
    signal: &CancelSignal,
) -> Result<F::Output, Interrupted>
where
    F: Future,
{
    let expiry = async {
        match deadline {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(Interrupted::Cancelled),
        output = fut => Ok(output),
        _ = expiry => Err(Interrupted::TimedOut(deadline.unwrap_or_default())),
    }
}

/// Same as [`run_guarded`] for fallible calls, folding interruptions into
/// the call's own error type.
pub async fn guarded_call<F, T>(
    fut: F,
    deadline: Option<Duration>,
    signal: &CancelSignal,
) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    run_guarded(fut, deadline, signal).await?
}

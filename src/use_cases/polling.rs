// Bounded, sequential status polling for asynchronous backend operations.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::errors::ClientError;
use crate::domain::payment::{StatusPhase, StatusSnapshot};
use crate::domain::ports::{PaymentApi, QueueApi, StatusSource};
use crate::use_cases::task::{CancelHandle, CancelSignal, cancel_pair, run_guarded};

/// Timing and retry limits for one polling sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between attempts when the server suggests none.
    pub interval: Duration,
    /// Extra checks allowed after the first one before giving up.
    pub max_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_retries: 3,
        }
    }
}

impl PollSettings {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// How a polling sequence ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded(StatusSnapshot),
    Failed(StatusSnapshot),
    /// The server reported the operation as canceled or expired.
    Canceled(StatusSnapshot),
    /// The server reported a status this client does not know.
    Unrecognized(StatusSnapshot),
    /// Every allowed attempt came back in flight.
    GaveUp { last: StatusSnapshot, attempts: u32 },
    /// A request failed; polling does not resume on its own.
    Errored { error: ClientError, attempts: u32 },
    /// The owner tore the sequence down.
    Stopped,
}

impl PollOutcome {
    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            PollOutcome::Succeeded(snapshot)
            | PollOutcome::Failed(snapshot)
            | PollOutcome::Canceled(snapshot)
            | PollOutcome::Unrecognized(snapshot)
            | PollOutcome::GaveUp { last: snapshot, .. } => Some(snapshot),
            PollOutcome::Errored { .. } | PollOutcome::Stopped => None,
        }
    }
}

/// Latest state published by a spawned poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollProgress {
    Starting,
    Update { attempt: u32, snapshot: StatusSnapshot },
    Finished(PollOutcome),
}

pub struct StatusPoller<S> {
    pub source: S,
    pub settings: PollSettings,
}

impl<S> StatusPoller<S>
where
    S: StatusSource,
{
    pub fn new(source: S, settings: PollSettings) -> Self {
        Self { source, settings }
    }

    /// Polls `id` until a terminal status, an error, the attempt cap, or
    /// cancellation. `on_update` sees every snapshot received before teardown.
    #[tracing::instrument(name = "status_poll", skip_all, fields(id = id))]
    pub async fn run<F>(&self, id: u64, signal: &CancelSignal, mut on_update: F) -> PollOutcome
    where
        F: FnMut(u32, &StatusSnapshot),
    {
        let max_attempts = self.settings.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let fetched = match run_guarded(self.source.fetch_status(id), None, signal).await {
                Ok(fetched) => fetched,
                Err(_) => {
                    tracing::debug!(attempt, "poll torn down mid-request");
                    return PollOutcome::Stopped;
                }
            };

            let snapshot = match fetched {
                Ok(snapshot) => snapshot,
                Err(ClientError::Cancelled) => return PollOutcome::Stopped,
                Err(error) => {
                    tracing::warn!(attempt, error = %error, "status check failed");
                    return PollOutcome::Errored {
                        error,
                        attempts: attempt,
                    };
                }
            };

            tracing::debug!(attempt, status = %snapshot.status, "status received");
            on_update(attempt, &snapshot);

            match snapshot.status.phase() {
                StatusPhase::Succeeded => return PollOutcome::Succeeded(snapshot),
                StatusPhase::Failed => return PollOutcome::Failed(snapshot),
                StatusPhase::Cancelled => return PollOutcome::Canceled(snapshot),
                StatusPhase::Unknown => {
                    tracing::warn!(status = %snapshot.status, "unrecognized status");
                    return PollOutcome::Unrecognized(snapshot);
                }
                StatusPhase::InFlight => {}
            }

            if attempt >= max_attempts {
                tracing::info!(attempts = attempt, "giving up on status polling");
                return PollOutcome::GaveUp {
                    last: snapshot,
                    attempts: attempt,
                };
            }

            let delay = snapshot
                .suggested_interval()
                .unwrap_or(self.settings.interval);
            if run_guarded(tokio::time::sleep(delay), None, signal)
                .await
                .is_err()
            {
                tracing::debug!(attempt, "poll torn down while waiting");
                return PollOutcome::Stopped;
            }
        }
    }
}

impl<S> StatusPoller<S>
where
    S: StatusSource + 'static,
{
    /// Runs the loop on its own task. Dropping the returned handle stops it.
    pub fn spawn(self, id: u64) -> PollHandle {
        let (cancel, signal) = cancel_pair();
        let (progress_tx, progress_rx) = watch::channel(PollProgress::Starting);

        let task = tokio::spawn(async move {
            let outcome = self
                .run(id, &signal, |attempt, snapshot| {
                    progress_tx.send_replace(PollProgress::Update {
                        attempt,
                        snapshot: snapshot.clone(),
                    });
                })
                .await;
            if outcome != PollOutcome::Stopped {
                progress_tx.send_replace(PollProgress::Finished(outcome.clone()));
            }
            outcome
        });

        PollHandle {
            cancel,
            progress: progress_rx,
            task,
        }
    }
}

/// Owner handle of a spawned poll; its cancel handle is registered at
/// creation and fires when the handle is dropped.
pub struct PollHandle {
    cancel: CancelHandle,
    progress: watch::Receiver<PollProgress>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Latest progress only: a slow reader can miss intermediate attempts,
    /// and the last update is replaced by `Finished`. Pass an observer to
    /// `StatusPoller::run` to see every attempt.
    pub fn progress(&self) -> watch::Receiver<PollProgress> {
        self.progress.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the loop to end while keeping it alive.
    pub async fn finish(self) -> PollOutcome {
        let PollHandle { cancel, task, .. } = self;
        let outcome = task.await.unwrap_or_else(|err| {
            tracing::error!(error = %err, "poll task failed");
            PollOutcome::Stopped
        });
        drop(cancel);
        outcome
    }
}

/// Polls the payment status endpoint of an application.
#[derive(Clone)]
pub struct PaymentStatusSource<P>(pub P);

#[async_trait]
impl<P> StatusSource for PaymentStatusSource<P>
where
    P: PaymentApi,
{
    async fn fetch_status(&self, id: u64) -> Result<StatusSnapshot, ClientError> {
        self.0.payment_status(id).await.map(|reply| reply.data)
    }
}

/// Polls the permit-generation queue position of an application.
#[derive(Clone)]
pub struct QueueStatusSource<Q>(pub Q);

#[async_trait]
impl<Q> StatusSource for QueueStatusSource<Q>
where
    Q: QueueApi,
{
    async fn fetch_status(&self, id: u64) -> Result<StatusSnapshot, ClientError> {
        self.0.queue_status(id).await.map(|reply| reply.data)
    }
}

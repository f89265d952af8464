// Payment recovery: re-check a payment the user may already have completed.

use crate::domain::payment::StatusSnapshot;
use crate::domain::ports::PaymentApi;
use crate::use_cases::normalize::into_failure;
use crate::use_cases::polling::{PaymentStatusSource, PollOutcome, PollSettings, StatusPoller};
use crate::use_cases::task::CancelSignal;

pub const RECOVERY_FAILED_MESSAGE: &str =
    "No pudimos verificar el estado de tu pago. Por favor, intenta nuevamente.";

/// Receives the result of a recovery check.
pub trait RecoveryListener: Send + Sync {
    fn on_recovery_success(&self, snapshot: &StatusSnapshot);
    fn on_recovery_failed(&self, message: &str);
    // Called when the payment is still settling after every allowed check.
    fn on_still_processing(&self, _snapshot: &StatusSnapshot) {}
}

pub struct PaymentRecovery<P, L> {
    poller: StatusPoller<PaymentStatusSource<P>>,
    listener: L,
}

impl<P, L> PaymentRecovery<P, L>
where
    P: PaymentApi,
    L: RecoveryListener,
{
    pub fn new(payments: P, settings: PollSettings, listener: L) -> Self {
        Self {
            poller: StatusPoller::new(PaymentStatusSource(payments), settings),
            listener,
        }
    }

    /// Checks the payment of `application_id`, re-polling while it settles,
    /// and notifies the listener once. A torn down check notifies nobody.
    pub async fn check_payment_status(
        &self,
        application_id: u64,
        signal: &CancelSignal,
    ) -> PollOutcome {
        let outcome = self.poller.run(application_id, signal, |_, _| {}).await;

        match &outcome {
            PollOutcome::Succeeded(snapshot) => self.listener.on_recovery_success(snapshot),
            PollOutcome::Failed(snapshot)
            | PollOutcome::Canceled(snapshot)
            | PollOutcome::Unrecognized(snapshot) => {
                self.listener.on_recovery_failed(&snapshot.display_message());
            }
            PollOutcome::GaveUp { last, .. } => self.listener.on_still_processing(last),
            PollOutcome::Errored { error, .. } => {
                tracing::warn!(application_id, error = %error, "payment recovery check failed");
                let failure = into_failure::<()>(error.clone(), RECOVERY_FAILED_MESSAGE);
                if let Ok(failure) = failure {
                    let message = failure.message().unwrap_or(RECOVERY_FAILED_MESSAGE);
                    self.listener.on_recovery_failed(message);
                }
            }
            PollOutcome::Stopped => {}
        }

        outcome
    }
}

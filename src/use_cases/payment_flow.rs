// Card vs. cash-voucher payment submission as a small state machine.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::errors::{Cancelled, FlowError};
use crate::domain::payment::{
    CardIntent, OxxoVoucher, PaymentMethod, ProcessorConfirmation, StatusKind, StatusPhase,
    mapped_processor_message, processor_error_message,
};
use crate::domain::ports::{CardProcessor, PaymentApi};
use crate::domain::result::OperationResult;
use crate::use_cases::normalize::normalize;

const ORDER_FAILED_MESSAGE: &str =
    "No se pudo preparar la orden de pago. Por favor, intenta nuevamente.";
const CARD_SETUP_FAILED_MESSAGE: &str =
    "No se pudo iniciar el pago con tarjeta. Por favor, intenta nuevamente.";
const VOUCHER_FAILED_MESSAGE: &str =
    "No se pudo generar la ficha de pago en OXXO. Por favor, intenta nuevamente.";
pub const AUTHENTICATION_REQUIRED_MESSAGE: &str = "Tu banco requiere autenticación adicional para este pago. Por favor, intenta nuevamente o usa otra tarjeta.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Initializing,
    Ready,
    Submitting,
    // Confirmed with the processor but not settled; the backend status decides.
    Pending,
    Succeeded,
    Failed,
}

impl FlowState {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Initializing => "initializing",
            FlowState::Ready => "ready",
            FlowState::Submitting => "submitting",
            FlowState::Pending => "pending",
            FlowState::Succeeded => "succeeded",
            FlowState::Failed => "failed",
        }
    }
}

/// What a view renders for the flow at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub method: PaymentMethod,
    pub error: Option<String>,
    pub voucher: Option<OxxoVoucher>,
}

struct FlowInner {
    state: FlowState,
    method: PaymentMethod,
    error: Option<String>,
    client_secret: Option<String>,
    voucher: Option<OxxoVoucher>,
}

impl FlowInner {
    fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            state: self.state,
            method: self.method,
            error: self.error.clone(),
            voucher: self.voucher.clone(),
        }
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        if self.state == FlowState::Submitting {
            return FlowError::AlreadySubmitting;
        }
        FlowError::InvalidTransition {
            action,
            state: self.state.as_str(),
        }
    }

    fn begin_initializing(&mut self, method: PaymentMethod) {
        self.method = method;
        self.state = FlowState::Initializing;
        self.error = None;
        self.client_secret = None;
    }

    fn fail(&mut self, message: String) {
        self.state = FlowState::Failed;
        self.error = Some(message);
    }
}

fn lock_inner(inner: &Mutex<FlowInner>) -> MutexGuard<'_, FlowInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

// Marks a request as in flight. If the request future is dropped before
// `settle`, the flow goes back to `fallback` instead of staying busy.
struct InFlight<'a> {
    inner: &'a Mutex<FlowInner>,
    busy: FlowState,
    fallback: FlowState,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(inner: &'a Mutex<FlowInner>, busy: FlowState, fallback: FlowState) -> Self {
        Self {
            inner,
            busy,
            fallback,
            settled: false,
        }
    }

    fn settle(mut self) -> MutexGuard<'a, FlowInner> {
        self.settled = true;
        lock_inner(self.inner)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut inner = lock_inner(self.inner);
        if inner.state == self.busy {
            tracing::debug!(
                from = self.busy.as_str(),
                to = self.fallback.as_str(),
                "payment request abandoned"
            );
            inner.state = self.fallback;
        }
    }
}

/// Payment submission for one application.
///
/// State lives behind a mutex that is never held across a request, so
/// concurrent triggers observe `Submitting` and back off instead of queueing.
pub struct PaymentFlow<P, C> {
    payments: P,
    processor: C,
    application_id: u64,
    inner: Mutex<FlowInner>,
}

impl<P, C> PaymentFlow<P, C>
where
    P: PaymentApi,
    C: CardProcessor,
{
    pub fn new(payments: P, processor: C, application_id: u64, method: PaymentMethod) -> Self {
        Self {
            payments,
            processor,
            application_id,
            inner: Mutex::new(FlowInner {
                state: FlowState::Idle,
                method,
                error: None,
                client_secret: None,
                voucher: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlowInner> {
        lock_inner(&self.inner)
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.lock().snapshot()
    }

    /// `Idle → Initializing → {Ready | Failed}` for the current method.
    pub async fn initialize(&self) -> Result<FlowSnapshot, FlowError> {
        let method = {
            let mut inner = self.lock();
            if inner.state != FlowState::Idle {
                return Err(inner.invalid("initialize"));
            }
            let method = inner.method;
            inner.begin_initializing(method);
            method
        };
        self.prepare(method).await
    }

    /// `Failed → Initializing` on explicit user retry.
    pub async fn retry(&self) -> Result<FlowSnapshot, FlowError> {
        let method = {
            let mut inner = self.lock();
            if inner.state != FlowState::Failed {
                return Err(inner.invalid("retry"));
            }
            let method = inner.method;
            inner.begin_initializing(method);
            method
        };
        self.prepare(method).await
    }

    /// Switches branch, clearing any shown error, and initializes it.
    pub async fn select_method(&self, method: PaymentMethod) -> Result<FlowSnapshot, FlowError> {
        {
            let mut inner = self.lock();
            if !matches!(
                inner.state,
                FlowState::Idle | FlowState::Ready | FlowState::Failed
            ) {
                return Err(inner.invalid("switch payment method"));
            }
            tracing::debug!(
                application_id = self.application_id,
                from = inner.method.as_str(),
                to = method.as_str(),
                "payment method switched"
            );
            inner.begin_initializing(method);
        }
        self.prepare(method).await
    }

    async fn prepare(&self, method: PaymentMethod) -> Result<FlowSnapshot, FlowError> {
        let in_flight = InFlight::new(&self.inner, FlowState::Initializing, FlowState::Idle);
        let prepared = match method {
            PaymentMethod::Card => self.prepare_card().await.map(|result| result.map(Some)),
            // Nothing to prefetch; the voucher is requested on submit.
            PaymentMethod::Voucher => Ok(OperationResult::success(None, None)),
        };

        let mut inner = in_flight.settle();
        match prepared {
            Ok(OperationResult::Success { data, .. }) => {
                inner.client_secret = data.map(|intent| intent.client_secret);
                inner.state = FlowState::Ready;
            }
            Ok(OperationResult::Failure { message, .. }) => inner.fail(message),
            Err(Cancelled) => {
                inner.state = FlowState::Idle;
                return Err(FlowError::Cancelled(Cancelled));
            }
        }
        Ok(inner.snapshot())
    }

    async fn prepare_card(&self) -> Result<OperationResult<CardIntent>, Cancelled> {
        let order = match normalize(
            self.payments.create_order(self.application_id),
            ORDER_FAILED_MESSAGE,
        )
        .await?
        {
            OperationResult::Success { data, .. } => data,
            OperationResult::Failure {
                message,
                error_code,
            } => {
                return Ok(OperationResult::Failure {
                    message,
                    error_code,
                });
            }
        };

        normalize(
            self.payments
                .create_card_payment(self.application_id, &order),
            CARD_SETUP_FAILED_MESSAGE,
        )
        .await
    }

    /// Confirms the card payment with the processor exactly once.
    #[tracing::instrument(skip_all, fields(application_id = self.application_id))]
    pub async fn submit_card(
        &self,
        payment_method: &str,
    ) -> Result<OperationResult<ProcessorConfirmation>, FlowError> {
        let client_secret = {
            let mut inner = self.lock();
            if inner.method != PaymentMethod::Card {
                return Err(FlowError::WrongMethod {
                    action: "card submission",
                    method: inner.method.as_str(),
                });
            }
            let Some(secret) = inner.client_secret.clone().filter(|_| inner.state == FlowState::Ready)
            else {
                return Err(inner.invalid("submit card payment"));
            };
            inner.state = FlowState::Submitting;
            inner.error = None;
            secret
        };

        let in_flight = InFlight::new(&self.inner, FlowState::Submitting, FlowState::Ready);
        let confirmed = self
            .processor
            .confirm_card_payment(&client_secret, payment_method)
            .await;

        let mut inner = in_flight.settle();
        let result = match confirmed {
            Ok(confirmation) => match confirmation.status.phase() {
                StatusPhase::Succeeded => {
                    tracing::info!(status = %confirmation.status, "card payment confirmed");
                    inner.state = FlowState::Succeeded;
                    OperationResult::success(confirmation, None)
                }
                // The extra authentication step cannot be completed from here.
                StatusPhase::InFlight if confirmation.status == StatusKind::RequiresAction => {
                    tracing::warn!("card payment requires authentication");
                    inner.fail(AUTHENTICATION_REQUIRED_MESSAGE.to_string());
                    OperationResult::failure(
                        Some(AUTHENTICATION_REQUIRED_MESSAGE.to_string()),
                        "",
                        Some(confirmation.status.to_string()),
                    )
                }
                StatusPhase::InFlight => {
                    tracing::info!(status = %confirmation.status, "card payment pending");
                    inner.state = FlowState::Pending;
                    OperationResult::failure(
                        Some(confirmation.status.user_message().to_string()),
                        "",
                        Some(confirmation.status.to_string()),
                    )
                }
                _ => {
                    let message = confirmation.status.user_message().to_string();
                    inner.fail(message.clone());
                    OperationResult::failure(Some(message), "", Some(confirmation.status.to_string()))
                }
            },
            Err(error) => {
                if error
                    .code
                    .as_deref()
                    .is_some_and(|code| mapped_processor_message(code).is_none())
                {
                    tracing::warn!(code = ?error.code, "unmapped processor error code");
                }
                let message = processor_error_message(&error);
                inner.fail(message.clone());
                OperationResult::failure(Some(message), "", error.code)
            }
        };
        Ok(result)
    }

    /// Requests the cash voucher. Triggers arriving while a request is in
    /// flight are rejected without touching the network.
    #[tracing::instrument(skip_all, fields(application_id = self.application_id))]
    pub async fn generate_voucher(&self) -> Result<OperationResult<OxxoVoucher>, FlowError> {
        {
            let mut inner = self.lock();
            if inner.method != PaymentMethod::Voucher {
                return Err(FlowError::WrongMethod {
                    action: "voucher generation",
                    method: inner.method.as_str(),
                });
            }
            if inner.state != FlowState::Ready {
                return Err(inner.invalid("generate voucher"));
            }
            inner.state = FlowState::Submitting;
            inner.error = None;
        }

        let in_flight = InFlight::new(&self.inner, FlowState::Submitting, FlowState::Ready);
        let generated = normalize(
            self.payments.create_oxxo_payment(self.application_id),
            VOUCHER_FAILED_MESSAGE,
        )
        .await;

        let mut inner = in_flight.settle();
        match generated {
            Ok(OperationResult::Success { data, message }) => {
                tracing::info!(reference = %data.reference, "voucher generated");
                inner.voucher = Some(data.clone());
                inner.state = FlowState::Succeeded;
                Ok(OperationResult::Success { data, message })
            }
            Ok(OperationResult::Failure {
                message,
                error_code,
            }) => {
                inner.fail(message.clone());
                Ok(OperationResult::Failure {
                    message,
                    error_code,
                })
            }
            Err(Cancelled) => {
                inner.state = FlowState::Ready;
                Err(FlowError::Cancelled(Cancelled))
            }
        }
    }
}

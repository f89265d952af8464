use std::time::Duration;
use thiserror::Error;

// Transport-level failures produced by the request adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    // The server answered with an error status or `success: false`.
    #[error("server rejected request with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
        error_code: Option<String>,
    },
    // No response was received (connect, read or body failure).
    #[error("network error: {0}")]
    Network(String),
    // The request could not be built; a programming error, never user-facing.
    #[error("request setup failed: {0}")]
    Setup(String),
    // A 2xx body did not match the canonical envelope.
    #[error("response violated the api contract: {0}")]
    Contract(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Rejected { status: 401, .. })
    }
}

// Marker returned when an operation was torn down by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

// Misuse of the payment flow state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("cannot {action} while the flow is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("a payment request is already in flight")]
    AlreadySubmitting,
    #[error("{action} is not available for the {method} payment method")]
    WrongMethod {
        action: &'static str,
        method: &'static str,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

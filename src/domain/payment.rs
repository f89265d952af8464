use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Text shown for processor errors without a usable message.
pub const GENERIC_PAYMENT_ERROR_MESSAGE: &str =
    "Ocurrió un error al procesar el pago. Por favor, intenta nuevamente.";

/// Server-defined status of a payment or a permit-generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusKind {
    Processing,
    Pending,
    Queued,
    Generating,
    RequiresAction,
    Succeeded,
    Completed,
    Paid,
    RequiresPaymentMethod,
    Failed,
    PaymentFailed,
    Canceled,
    Expired,
    Unknown(String),
}

/// Coarse classification driving the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPhase {
    InFlight,
    Succeeded,
    Failed,
    Cancelled,
    Unknown,
}

impl StatusKind {
    pub fn phase(&self) -> StatusPhase {
        match self {
            StatusKind::Processing
            | StatusKind::Pending
            | StatusKind::Queued
            | StatusKind::Generating
            | StatusKind::RequiresAction => StatusPhase::InFlight,
            StatusKind::Succeeded | StatusKind::Completed | StatusKind::Paid => {
                StatusPhase::Succeeded
            }
            StatusKind::RequiresPaymentMethod | StatusKind::Failed | StatusKind::PaymentFailed => {
                StatusPhase::Failed
            }
            StatusKind::Canceled | StatusKind::Expired => StatusPhase::Cancelled,
            StatusKind::Unknown(_) => StatusPhase::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase() != StatusPhase::InFlight
    }

    pub fn as_str(&self) -> &str {
        match self {
            StatusKind::Processing => "processing",
            StatusKind::Pending => "pending",
            StatusKind::Queued => "queued",
            StatusKind::Generating => "generating",
            StatusKind::RequiresAction => "requires_action",
            StatusKind::Succeeded => "succeeded",
            StatusKind::Completed => "completed",
            StatusKind::Paid => "paid",
            StatusKind::RequiresPaymentMethod => "requires_payment_method",
            StatusKind::Failed => "failed",
            StatusKind::PaymentFailed => "payment_failed",
            StatusKind::Canceled => "canceled",
            StatusKind::Expired => "expired",
            StatusKind::Unknown(raw) => raw,
        }
    }

    /// Fallback text for users when the server sent no message of its own.
    pub fn user_message(&self) -> &'static str {
        match self.phase() {
            StatusPhase::InFlight => "Tu pago se está procesando. Esto puede tardar unos minutos.",
            StatusPhase::Succeeded => "¡Pago confirmado! Tu permiso está en proceso.",
            StatusPhase::Failed => {
                "El pago no pudo completarse. Por favor, intenta con otro método de pago."
            }
            StatusPhase::Cancelled => "El pago fue cancelado o expiró.",
            StatusPhase::Unknown => {
                "No pudimos determinar el estado de tu pago. Por favor, contacta a soporte."
            }
        }
    }
}

impl From<String> for StatusKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "processing" => StatusKind::Processing,
            "pending" => StatusKind::Pending,
            "queued" => StatusKind::Queued,
            "generating" => StatusKind::Generating,
            "requires_action" => StatusKind::RequiresAction,
            "succeeded" => StatusKind::Succeeded,
            "completed" => StatusKind::Completed,
            "paid" => StatusKind::Paid,
            "requires_payment_method" => StatusKind::RequiresPaymentMethod,
            "failed" => StatusKind::Failed,
            "payment_failed" => StatusKind::PaymentFailed,
            "canceled" | "cancelled" => StatusKind::Canceled,
            "expired" => StatusKind::Expired,
            _ => StatusKind::Unknown(raw),
        }
    }
}

impl From<StatusKind> for String {
    fn from(kind: StatusKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One poll response. Each response supersedes the previous one entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: StatusKind,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub estimated_wait_minutes: Option<f64>,
    // Server-suggested delay before the next poll, in milliseconds.
    #[serde(default)]
    pub next_poll_interval: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusSnapshot {
    pub fn new(status: StatusKind) -> Self {
        Self {
            status,
            position: None,
            estimated_wait_minutes: None,
            next_poll_interval: None,
            message: None,
        }
    }

    pub fn suggested_interval(&self) -> Option<Duration> {
        self.next_poll_interval
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
    }

    pub fn display_message(&self) -> String {
        self.message
            .clone()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| self.status.user_message().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Card,
    Voucher,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Voucher => "voucher",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "MXN".to_string()
}

// Secret handed to the card processor to confirm the intent client-side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardIntent {
    pub client_secret: String,
    pub payment_intent_id: String,
}

// Cash-voucher reference the user takes to a store counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OxxoVoucher {
    pub reference: String,
    pub amount: f64,
    pub expires_at: String,
    #[serde(default)]
    pub barcode_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfirmation {
    pub payment_intent_id: String,
    pub status: StatusKind,
}

/// Domain error reported by the payment processor during confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorError {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Maps a processor error code to its fixed user-facing text.
pub fn mapped_processor_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "card_declined" => "Tu tarjeta fue rechazada. Por favor, intenta con otra tarjeta.",
        "insufficient_funds" => {
            "Fondos insuficientes. Por favor, verifica tu saldo o usa otra tarjeta."
        }
        "expired_card" => "Tu tarjeta ha expirado. Por favor, usa una tarjeta vigente.",
        "incorrect_cvc" => "El código de seguridad (CVC) es incorrecto.",
        "incorrect_number" | "invalid_number" => "El número de tarjeta es incorrecto.",
        "invalid_expiry_month" | "invalid_expiry_year" => {
            "La fecha de vencimiento de la tarjeta no es válida."
        }
        "processing_error" => {
            "Ocurrió un error al procesar tu tarjeta. Por favor, intenta nuevamente."
        }
        "authentication_required" | "payment_intent_authentication_failure" => {
            "No se pudo autenticar el pago. Por favor, intenta nuevamente o usa otra tarjeta."
        }
        "rate_limit" => "Demasiados intentos. Por favor, espera un momento e intenta de nuevo.",
        _ => return None,
    };
    Some(message)
}

/// Message to display for a processor error: the table entry when the code is
/// known, otherwise the processor's own message, otherwise a generic text.
pub fn processor_error_message(error: &ProcessorError) -> String {
    if let Some(mapped) = error.code.as_deref().and_then(mapped_processor_message) {
        return mapped.to_string();
    }
    match error.message.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.to_string(),
        _ => GENERIC_PAYMENT_ERROR_MESSAGE.to_string(),
    }
}

// Request envelope normalizer: folds every backend call into an OperationResult.

use std::future::Future;

use crate::domain::errors::{Cancelled, ClientError};
use crate::domain::result::{ApiReply, OperationResult};

pub const NETWORK_ERROR_MESSAGE: &str =
    "Error de red. Por favor, verifica tu conexión e intenta nuevamente.";
pub const TIMEOUT_ERROR_MESSAGE: &str =
    "La solicitud tardó demasiado. Por favor, intenta nuevamente.";
pub const INVALID_RESPONSE_CODE: &str = "INVALID_RESPONSE";

/// Awaits `call` and maps its outcome into the uniform result shape.
///
/// Cancellation is the only error that escapes, so callers can tell a torn
/// down operation apart from a failed one.
pub async fn normalize<T, F>(call: F, default_message: &str) -> Result<OperationResult<T>, Cancelled>
where
    F: Future<Output = Result<ApiReply<T>, ClientError>>,
{
    match call.await {
        Ok(reply) => Ok(OperationResult::success(reply.data, reply.message)),
        Err(err) => into_failure(err, default_message),
    }
}

/// Maps one transport error to a failure result.
pub fn into_failure<T>(err: ClientError, default_message: &str) -> Result<OperationResult<T>, Cancelled> {
    let result = match err {
        ClientError::Rejected {
            status,
            message,
            error_code,
        } => {
            tracing::debug!(status, ?error_code, "request rejected by server");
            OperationResult::failure(message, default_message, error_code)
        }
        ClientError::Network(detail) => {
            tracing::warn!(error = %detail, "no response received");
            OperationResult::failure(None, NETWORK_ERROR_MESSAGE, None)
        }
        ClientError::Timeout(limit) => {
            tracing::warn!(timeout_ms = limit.as_millis(), "request timed out");
            OperationResult::failure(None, TIMEOUT_ERROR_MESSAGE, None)
        }
        ClientError::Setup(detail) => {
            tracing::error!(error = %detail, "request setup failed");
            OperationResult::failure(None, default_message, None)
        }
        ClientError::Contract(detail) => {
            tracing::error!(error = %detail, "response did not match the api contract");
            OperationResult::failure(
                None,
                default_message,
                Some(INVALID_RESPONSE_CODE.to_string()),
            )
        }
        ClientError::Cancelled => return Err(Cancelled),
    };
    Ok(result)
}

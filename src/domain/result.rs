// Uniform outcome shapes shared by every request module.

/// Text shown when a failure carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Ocurrió un error inesperado. Por favor, intenta nuevamente.";

/// Payload of a successful backend call together with the server's message.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply<T> {
    pub data: T,
    pub message: Option<String>,
}

impl<T> ApiReply<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}

/// Result handed to callers of the request modules.
///
/// A failure always carries a non-empty message; the constructors substitute
/// a fallback when the supplied text is blank.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult<T> {
    Success {
        data: T,
        message: Option<String>,
    },
    Failure {
        message: String,
        error_code: Option<String>,
    },
}

impl<T> OperationResult<T> {
    pub fn success(data: T, message: Option<String>) -> Self {
        OperationResult::Success {
            data,
            message: message.filter(|text| !text.trim().is_empty()),
        }
    }

    /// Builds a failure, falling back to `fallback` (then to a generic text)
    /// when `message` is missing or blank.
    pub fn failure(message: Option<String>, fallback: &str, error_code: Option<String>) -> Self {
        let message = message
            .filter(|text| !text.trim().is_empty())
            .or_else(|| Some(fallback.to_string()).filter(|text| !text.trim().is_empty()))
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        OperationResult::Failure {
            message,
            error_code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            OperationResult::Success { message, .. } => message.as_deref(),
            OperationResult::Failure { message, .. } => Some(message),
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            OperationResult::Success { .. } => None,
            OperationResult::Failure { error_code, .. } => error_code.as_deref(),
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            OperationResult::Success { data, .. } => Some(data),
            OperationResult::Failure { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            OperationResult::Success { data, .. } => Some(data),
            OperationResult::Failure { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        match self {
            OperationResult::Success { data, message } => OperationResult::Success {
                data: f(data),
                message,
            },
            OperationResult::Failure {
                message,
                error_code,
            } => OperationResult::Failure {
                message,
                error_code,
            },
        }
    }
}

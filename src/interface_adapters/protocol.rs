use serde::{Deserialize, Serialize};
use serde_json::Value;

// Canonical body of every 2xx response. `success` is required: a payload
// without it is a contract violation, never an implied success.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error_code: Option<String>,
}

// Lenient error body for non-2xx responses; every field is optional and a
// field of an unexpected type is read as absent rather than failing the body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    error_code: Option<Value>,
}

impl ErrorBody {
    /// Server text for the user: `message` first, then a string `error`.
    pub fn message(&self) -> Option<String> {
        text(&self.message).or_else(|| text(&self.error))
    }

    pub fn error_code(&self) -> Option<String> {
        text(&self.error_code)
    }
}

fn text(value: &Option<Value>) -> Option<String> {
    value
        .as_ref()
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenData {
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub struct EmptyBody {}

#[derive(Debug, Serialize)]
pub struct EmailRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPaymentRequest<'a> {
    pub order_id: &'a str,
}

// Payment processor confirmation answer.
#[derive(Debug, Deserialize)]
pub struct ProcessorIntent {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessorErrorBody {
    pub error: ProcessorErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ProcessorErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub decline_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

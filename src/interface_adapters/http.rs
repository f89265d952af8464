// Shared HTTP client: one reqwest client carrying cookies and the CSRF header.

use reqwest::header::ACCEPT;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

use crate::domain::errors::ClientError;
use crate::domain::ports::ApiResult;
use crate::domain::result::ApiReply;
use crate::interface_adapters::protocol::{ApiEnvelope, CsrfTokenData, EmptyBody, ErrorBody};

pub const CSRF_HEADER: &str = "X-CSRF-Token";
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";
pub const CSRF_PATH: &str = "/auth/csrf-token";
pub const CSRF_INVALID_CODE: &str = "CSRF_INVALID";

// Status and body of a response, read in full so errors can be inspected.
struct RawResponse {
    status: StatusCode,
    body: Vec<u8>,
}

pub struct ApiHttp {
    http: Client,
    base_url: String,
    timeout: Duration,
    csrf_token: Mutex<Option<String>>,
}

impl ApiHttp {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            timeout,
            csrf_token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_json<T>(&self, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let raw = self
            .execute::<EmptyBody>(Method::GET, path, None, None)
            .await?;
        into_reply(raw)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let raw = self.post_with_csrf(path, body).await?;
        into_reply(raw)
    }

    // For endpoints whose success carries no payload worth reading.
    pub async fn post_ack<B>(&self, path: &str, body: &B) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        let raw = self.post_with_csrf(path, body).await?;
        let envelope = check_envelope(&raw)?;
        Ok(ApiReply {
            data: (),
            message: envelope.message,
        })
    }

    /// Returns the cached CSRF token, fetching it on first use.
    pub async fn csrf_token(&self) -> Result<String, ClientError> {
        let mut cached = self.csrf_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let raw = self
            .execute::<EmptyBody>(Method::GET, CSRF_PATH, None, None)
            .await?;
        let reply: ApiReply<CsrfTokenData> = into_reply(raw)?;
        tracing::debug!("csrf token fetched");
        *cached = Some(reply.data.csrf_token.clone());
        Ok(reply.data.csrf_token)
    }

    pub async fn reset_csrf_token(&self) {
        *self.csrf_token.lock().await = None;
    }

    async fn post_with_csrf<B>(&self, path: &str, body: &B) -> Result<RawResponse, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let token = self.csrf_token().await?;
        let raw = self
            .execute(Method::POST, path, Some(body), Some(&token))
            .await?;

        // A rotated token is refreshed once; a second rejection is final.
        if raw.status == StatusCode::FORBIDDEN
            && error_body(&raw).error_code().as_deref() == Some(CSRF_INVALID_CODE)
        {
            tracing::info!(path, "csrf token rejected, refreshing");
            self.reset_csrf_token().await;
            let token = self.csrf_token().await?;
            return self
                .execute(Method::POST, path, Some(body), Some(&token))
                .await;
        }
        Ok(raw)
    }

    #[tracing::instrument(name = "api_request", skip(self, body, csrf), fields(request_id = tracing::field::Empty))]
    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        csrf: Option<&str>,
    ) -> Result<RawResponse, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(token) = csrf {
            request = request.header(CSRF_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;

        tracing::debug!(status = status.as_u16(), "api response");
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_builder() {
            ClientError::Setup(err.to_string())
        } else if err.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

fn error_body(raw: &RawResponse) -> ErrorBody {
    serde_json::from_slice(&raw.body).unwrap_or_default()
}

// Validates status and envelope, turning `success: false` into a rejection.
fn check_envelope(raw: &RawResponse) -> Result<ApiEnvelope, ClientError> {
    if !raw.status.is_success() {
        let body = error_body(raw);
        return Err(ClientError::Rejected {
            status: raw.status.as_u16(),
            message: body.message(),
            error_code: body.error_code(),
        });
    }

    let envelope: ApiEnvelope = serde_json::from_slice(&raw.body)
        .map_err(|err| ClientError::Contract(format!("invalid envelope: {err}")))?;
    if !envelope.success {
        return Err(ClientError::Rejected {
            status: raw.status.as_u16(),
            message: envelope.message,
            error_code: envelope.error_code,
        });
    }
    Ok(envelope)
}

fn into_reply<T>(raw: RawResponse) -> ApiResult<T>
where
    T: DeserializeOwned,
{
    let envelope = check_envelope(&raw)?;
    let data = envelope
        .data
        .filter(|value| !value.is_null())
        .ok_or_else(|| ClientError::Contract("missing `data` in successful response".to_string()))?;
    let data = serde_json::from_value(data)
        .map_err(|err| ClientError::Contract(format!("unexpected `data` shape: {err}")))?;
    Ok(ApiReply {
        data,
        message: envelope.message,
    })
}

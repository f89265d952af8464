use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use url::form_urlencoded;

use crate::domain::payment::{
    ProcessorConfirmation, ProcessorError, StatusKind, mapped_processor_message,
};
use crate::domain::ports::CardProcessor;
use crate::interface_adapters::protocol::{
    ProcessorErrorBody, ProcessorErrorDetail, ProcessorIntent,
};

const SECRET_SEPARATOR: &str = "_secret_";

// Confirms payment intents against the processor's public REST API using the
// publishable key, the same call its browser widget makes.
#[derive(Clone)]
pub struct ProcessorClient {
    http: Client,
    api_base: String,
    publishable_key: String,
}

impl ProcessorClient {
    pub fn new(
        api_base: impl Into<String>,
        publishable_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            publishable_key: publishable_key.into(),
        })
    }
}

/// Extracts the intent id (`pi_123`) from a client secret (`pi_123_secret_abc`).
pub fn intent_id(client_secret: &str) -> Option<&str> {
    client_secret
        .split_once(SECRET_SEPARATOR)
        .map(|(id, _)| id)
        .filter(|id| !id.is_empty())
}

// Prefers the decline code when the table knows it; it is more specific.
fn processor_error(detail: ProcessorErrorDetail) -> ProcessorError {
    let code = match detail.decline_code {
        Some(decline) if mapped_processor_message(&decline).is_some() => Some(decline),
        _ => detail.code,
    };
    ProcessorError {
        code,
        message: detail.message,
    }
}

#[async_trait]
impl CardProcessor for ProcessorClient {
    #[tracing::instrument(skip_all)]
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        payment_method: &str,
    ) -> Result<ProcessorConfirmation, ProcessorError> {
        let Some(intent) = intent_id(client_secret) else {
            tracing::error!("malformed client secret");
            return Err(ProcessorError {
                code: None,
                message: None,
            });
        };

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_secret", client_secret)
            .append_pair("payment_method", payment_method)
            .append_pair("key", &self.publishable_key)
            .finish();

        let response = self
            .http
            .post(format!("{}/v1/payment_intents/{intent}/confirm", self.api_base))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "processor unreachable");
                ProcessorError {
                    code: None,
                    message: None,
                }
            })?;

        if response.status().is_success() {
            let intent = response.json::<ProcessorIntent>().await.map_err(|err| {
                tracing::error!(error = %err, "processor response decode error");
                ProcessorError {
                    code: None,
                    message: None,
                }
            })?;
            return Ok(ProcessorConfirmation {
                payment_intent_id: intent.id,
                status: StatusKind::from(intent.status),
            });
        }

        let status = response.status();
        match response.json::<ProcessorErrorBody>().await {
            Ok(body) => Err(processor_error(body.error)),
            Err(err) => {
                tracing::warn!(status = status.as_u16(), error = %err, "processor error without body");
                Err(ProcessorError {
                    code: None,
                    message: None,
                })
            }
        }
    }
}

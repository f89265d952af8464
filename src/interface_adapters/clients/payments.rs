use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::payment::{CardIntent, OxxoVoucher, PaymentOrder, StatusSnapshot};
use crate::domain::ports::{ApiResult, PaymentApi, QueueApi};
use crate::interface_adapters::http::ApiHttp;
use crate::interface_adapters::protocol::{CardPaymentRequest, EmptyBody};

// Payment endpoints nested under one application.
#[derive(Clone)]
pub struct PaymentClient {
    http: Arc<ApiHttp>,
}

impl PaymentClient {
    pub fn new(http: Arc<ApiHttp>) -> Self {
        Self { http }
    }
}

fn payment_path(application_id: u64, action: &str) -> String {
    format!("/applications/{application_id}/payment/{action}")
}

#[async_trait]
impl PaymentApi for PaymentClient {
    #[tracing::instrument(skip(self))]
    async fn create_order(&self, application_id: u64) -> ApiResult<PaymentOrder> {
        self.http
            .post_json(&payment_path(application_id, "order"), &EmptyBody {})
            .await
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.order_id))]
    async fn create_card_payment(
        &self,
        application_id: u64,
        order: &PaymentOrder,
    ) -> ApiResult<CardIntent> {
        self.http
            .post_json(
                &payment_path(application_id, "card"),
                &CardPaymentRequest {
                    order_id: &order.order_id,
                },
            )
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn create_oxxo_payment(&self, application_id: u64) -> ApiResult<OxxoVoucher> {
        self.http
            .post_json(&payment_path(application_id, "oxxo"), &EmptyBody {})
            .await
    }

    async fn payment_status(&self, application_id: u64) -> ApiResult<StatusSnapshot> {
        self.http
            .get_json(&payment_path(application_id, "status"))
            .await
    }
}

// Permit-generation queue position.
#[derive(Clone)]
pub struct QueueClient {
    http: Arc<ApiHttp>,
}

impl QueueClient {
    pub fn new(http: Arc<ApiHttp>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl QueueApi for QueueClient {
    async fn queue_status(&self, application_id: u64) -> ApiResult<StatusSnapshot> {
        self.http
            .get_json(&format!("/queue/status/{application_id}"))
            .await
    }
}

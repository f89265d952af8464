use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::application::{
    Application, ApplicationForm, ApplicationStatusInfo, RenewalEligibility,
};
use crate::domain::ports::{ApiResult, ApplicationApi};
use crate::interface_adapters::http::ApiHttp;
use crate::interface_adapters::protocol::EmptyBody;

#[derive(Clone)]
pub struct ApplicationClient {
    http: Arc<ApiHttp>,
}

impl ApplicationClient {
    pub fn new(http: Arc<ApiHttp>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ApplicationApi for ApplicationClient {
    async fn list(&self) -> ApiResult<Vec<Application>> {
        self.http.get_json("/applications").await
    }

    async fn get(&self, application_id: u64) -> ApiResult<Application> {
        self.http
            .get_json(&format!("/applications/{application_id}"))
            .await
    }

    #[tracing::instrument(skip_all)]
    async fn create(&self, form: &ApplicationForm) -> ApiResult<Application> {
        self.http.post_json("/applications", form).await
    }

    async fn status(&self, application_id: u64) -> ApiResult<ApplicationStatusInfo> {
        self.http
            .get_json(&format!("/applications/{application_id}/status"))
            .await
    }

    async fn renewal_eligibility(&self, application_id: u64) -> ApiResult<RenewalEligibility> {
        self.http
            .get_json(&format!("/applications/{application_id}/renewal-eligibility"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn renew(&self, application_id: u64) -> ApiResult<Application> {
        self.http
            .post_json(&format!("/applications/{application_id}/renew"), &EmptyBody {})
            .await
    }
}

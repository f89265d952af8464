use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::ports::{ApiResult, AuthApi};
use crate::domain::session::{
    Credentials, PasswordChange, PasswordReset, Registration, SessionStatus, User,
};
use crate::interface_adapters::http::ApiHttp;
use crate::interface_adapters::protocol::{EmailRequest, EmptyBody};

// Thin wrapper over the shared client for the session endpoints.
#[derive(Clone)]
pub struct AuthClient {
    http: Arc<ApiHttp>,
}

impl AuthClient {
    pub fn new(http: Arc<ApiHttp>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    #[tracing::instrument(skip_all)]
    async fn login(&self, credentials: &Credentials) -> ApiResult<User> {
        self.http.post_json("/auth/login", credentials).await
    }

    #[tracing::instrument(skip_all)]
    async fn register(&self, registration: &Registration) -> ApiResult<User> {
        self.http.post_json("/auth/register", registration).await
    }

    async fn status(&self) -> ApiResult<SessionStatus> {
        self.http.get_json("/auth/status").await
    }

    #[tracing::instrument(skip_all)]
    async fn logout(&self) -> ApiResult<()> {
        let result = self.http.post_ack("/auth/logout", &EmptyBody {}).await;
        // The token is bound to the session that just ended.
        self.http.reset_csrf_token().await;
        result
    }

    async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        self.http
            .post_ack("/auth/forgot-password", &EmailRequest { email })
            .await
    }

    async fn reset_password(&self, reset: &PasswordReset) -> ApiResult<()> {
        self.http.post_ack("/auth/reset-password", reset).await
    }

    async fn change_password(&self, change: &PasswordChange) -> ApiResult<()> {
        self.http.post_ack("/auth/change-password", change).await
    }

    async fn resend_verification(&self, email: &str) -> ApiResult<()> {
        self.http
            .post_ack("/auth/resend-verification", &EmailRequest { email })
            .await
    }
}

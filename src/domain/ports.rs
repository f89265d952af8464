use async_trait::async_trait;

use crate::domain::application::{
    Application, ApplicationForm, ApplicationStatusInfo, RenewalEligibility,
};
use crate::domain::errors::ClientError;
use crate::domain::payment::{
    CardIntent, OxxoVoucher, PaymentOrder, ProcessorConfirmation, ProcessorError, StatusSnapshot,
};
use crate::domain::result::ApiReply;
use crate::domain::session::{
    AuthState, Credentials, PasswordChange, PasswordReset, Registration, SessionStatus, User,
};

// Use cases depend on these traits, not on the reqwest clients.
// Dependencies point inwards to the domain layer.

pub type ApiResult<T> = Result<ApiReply<T>, ClientError>;

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> ApiResult<User>;
    async fn register(&self, registration: &Registration) -> ApiResult<User>;
    async fn status(&self) -> ApiResult<SessionStatus>;
    async fn logout(&self) -> ApiResult<()>;
    async fn forgot_password(&self, email: &str) -> ApiResult<()>;
    async fn reset_password(&self, reset: &PasswordReset) -> ApiResult<()>;
    async fn change_password(&self, change: &PasswordChange) -> ApiResult<()>;
    async fn resend_verification(&self, email: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait ApplicationApi: Send + Sync {
    async fn list(&self) -> ApiResult<Vec<Application>>;
    async fn get(&self, application_id: u64) -> ApiResult<Application>;
    async fn create(&self, form: &ApplicationForm) -> ApiResult<Application>;
    async fn status(&self, application_id: u64) -> ApiResult<ApplicationStatusInfo>;
    async fn renewal_eligibility(&self, application_id: u64) -> ApiResult<RenewalEligibility>;
    async fn renew(&self, application_id: u64) -> ApiResult<Application>;
}

#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn create_order(&self, application_id: u64) -> ApiResult<PaymentOrder>;
    async fn create_card_payment(
        &self,
        application_id: u64,
        order: &PaymentOrder,
    ) -> ApiResult<CardIntent>;
    async fn create_oxxo_payment(&self, application_id: u64) -> ApiResult<OxxoVoucher>;
    async fn payment_status(&self, application_id: u64) -> ApiResult<StatusSnapshot>;
}

#[async_trait]
pub trait QueueApi: Send + Sync {
    async fn queue_status(&self, application_id: u64) -> ApiResult<StatusSnapshot>;
}

/// Anything the polling loop can ask for the latest status of an operation.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, id: u64) -> Result<StatusSnapshot, ClientError>;
}

/// Boundary to the payment processor's card-collection widget.
#[async_trait]
pub trait CardProcessor: Send + Sync {
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        payment_method: &str,
    ) -> Result<ProcessorConfirmation, ProcessorError>;
}

/// Injected holder of the current session identity.
///
/// Writers replace the whole state in one step.
pub trait AuthStateStore: Send + Sync {
    fn current(&self) -> AuthState;
    fn set_authenticated(&self, user: User);
    fn clear(&self);
}

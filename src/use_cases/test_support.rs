use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::application::{
    Application, ApplicationForm, ApplicationStatus, ApplicationStatusInfo, RenewalEligibility,
};
use crate::domain::errors::ClientError;
use crate::domain::payment::{
    CardIntent, OxxoVoucher, PaymentOrder, ProcessorConfirmation, ProcessorError, StatusKind,
    StatusSnapshot,
};
use crate::domain::ports::{
    ApiResult, ApplicationApi, AuthApi, AuthStateStore, CardProcessor, PaymentApi, StatusSource,
};
use crate::domain::result::ApiReply;
use crate::domain::session::{
    AuthState, Credentials, PasswordChange, PasswordReset, Registration, SessionStatus, User,
};
use crate::use_cases::recovery::RecoveryListener;

pub(crate) fn snapshot(status: &str) -> StatusSnapshot {
    StatusSnapshot::new(StatusKind::from(status.to_string()))
}

pub(crate) fn test_user() -> User {
    User {
        id: 7,
        email: "maria@example.mx".to_string(),
        first_name: "María".to_string(),
        last_name: "López".to_string(),
        account_type: "client".to_string(),
        email_verified: true,
    }
}

pub(crate) fn test_application(status: ApplicationStatus) -> Application {
    Application {
        id: 42,
        status,
        nombre_completo: "María López Hernández".to_string(),
        marca: "Nissan".to_string(),
        linea: "Versa".to_string(),
        ano_modelo: "2019".to_string(),
        amount: Some(150.0),
        created_at: None,
        expires_at: None,
    }
}

pub(crate) fn valid_form() -> ApplicationForm {
    ApplicationForm {
        nombre_completo: "María López Hernández".to_string(),
        curp_rfc: "LOHM800101MDFPRR09".to_string(),
        domicilio: "Av. Juárez 100, Centro".to_string(),
        marca: "Nissan".to_string(),
        linea: "Versa".to_string(),
        color: "Blanco".to_string(),
        numero_serie: "3N1CN7AD5KL812345".to_string(),
        numero_motor: "HR16123456".to_string(),
        ano_modelo: "2019".to_string(),
    }
}

pub(crate) fn network_error() -> ClientError {
    ClientError::Network("connection refused".to_string())
}

// Status source that replays a fixed script and counts requests.
#[derive(Clone)]
pub(crate) struct ScriptedStatusSource {
    script: Arc<Mutex<VecDeque<Result<StatusSnapshot, ClientError>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedStatusSource {
    pub(crate) fn new(script: Vec<Result<StatusSnapshot, ClientError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn statuses(statuses: &[&str]) -> Self {
        Self::new(statuses.iter().map(|status| Ok(snapshot(status))).collect())
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedStatusSource {
    async fn fetch_status(&self, _id: u64) -> Result<StatusSnapshot, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield like a real request would.
        tokio::task::yield_now().await;
        let mut script = self.script.lock().expect("script mutex poisoned");
        script
            .pop_front()
            .unwrap_or_else(|| Ok(snapshot("processing")))
    }
}

#[derive(Clone)]
pub(crate) enum Scripted<T> {
    Reply(T),
    Fail(ClientError),
    // Never resolves; used to trip client-side deadlines.
    Hang,
}

impl<T: Clone> Scripted<T> {
    async fn play(&self) -> ApiResult<T> {
        match self {
            Scripted::Reply(data) => Ok(ApiReply::new(data.clone())),
            Scripted::Fail(err) => Err(err.clone()),
            Scripted::Hang => std::future::pending().await,
        }
    }
}

#[derive(Clone)]
pub(crate) struct RecordingAuthApi {
    pub(crate) login: Scripted<User>,
    pub(crate) status: Scripted<SessionStatus>,
    pub(crate) logout: Scripted<()>,
    pub(crate) acknowledge: Scripted<()>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingAuthApi {
    pub(crate) fn new() -> Self {
        Self {
            login: Scripted::Reply(test_user()),
            status: Scripted::Reply(SessionStatus {
                is_logged_in: true,
                user: Some(test_user()),
            }),
            logout: Scripted::Reply(()),
            acknowledge: Scripted::Reply(()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }
}

#[async_trait]
impl AuthApi for RecordingAuthApi {
    async fn login(&self, _credentials: &Credentials) -> ApiResult<User> {
        self.record("login");
        self.login.play().await
    }

    async fn register(&self, _registration: &Registration) -> ApiResult<User> {
        self.record("register");
        self.login.play().await
    }

    async fn status(&self) -> ApiResult<SessionStatus> {
        self.record("status");
        self.status.play().await
    }

    async fn logout(&self) -> ApiResult<()> {
        self.record("logout");
        self.logout.play().await
    }

    async fn forgot_password(&self, _email: &str) -> ApiResult<()> {
        self.record("forgot_password");
        self.acknowledge.play().await
    }

    async fn reset_password(&self, _reset: &PasswordReset) -> ApiResult<()> {
        self.record("reset_password");
        self.acknowledge.play().await
    }

    async fn change_password(&self, _change: &PasswordChange) -> ApiResult<()> {
        self.record("change_password");
        self.acknowledge.play().await
    }

    async fn resend_verification(&self, _email: &str) -> ApiResult<()> {
        self.record("resend_verification");
        self.acknowledge.play().await
    }
}

// Plain mutex-backed store; the watch-backed adapter is tested separately.
#[derive(Clone, Default)]
pub(crate) struct MemoryAuthStore {
    state: Arc<Mutex<AuthState>>,
}

impl AuthStateStore for MemoryAuthStore {
    fn current(&self) -> AuthState {
        self.state.lock().expect("auth mutex poisoned").clone()
    }

    fn set_authenticated(&self, user: User) {
        *self.state.lock().expect("auth mutex poisoned") = AuthState::authenticated(user);
    }

    fn clear(&self) {
        *self.state.lock().expect("auth mutex poisoned") = AuthState::default();
    }
}

#[derive(Clone)]
pub(crate) struct RecordingApplicationApi {
    pub(crate) application: Scripted<Application>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingApplicationApi {
    pub(crate) fn new() -> Self {
        Self {
            application: Scripted::Reply(test_application(ApplicationStatus::AwaitingPayment)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }
}

#[async_trait]
impl ApplicationApi for RecordingApplicationApi {
    async fn list(&self) -> ApiResult<Vec<Application>> {
        self.record("list");
        let application = self.application.play().await?;
        Ok(ApiReply::new(vec![application.data]))
    }

    async fn get(&self, _application_id: u64) -> ApiResult<Application> {
        self.record("get");
        self.application.play().await
    }

    async fn create(&self, _form: &ApplicationForm) -> ApiResult<Application> {
        self.record("create");
        self.application.play().await
    }

    async fn status(&self, _application_id: u64) -> ApiResult<ApplicationStatusInfo> {
        self.record("status");
        let application = self.application.play().await?;
        Ok(ApiReply::new(ApplicationStatusInfo {
            status: application.data.status,
            allowed_actions: Vec::new(),
            status_message: None,
        }))
    }

    async fn renewal_eligibility(&self, _application_id: u64) -> ApiResult<RenewalEligibility> {
        self.record("renewal_eligibility");
        Ok(ApiReply::new(RenewalEligibility {
            eligible: true,
            message: None,
            days_until_expiration: Some(5),
        }))
    }

    async fn renew(&self, _application_id: u64) -> ApiResult<Application> {
        self.record("renew");
        self.application.play().await
    }
}

#[derive(Clone)]
pub(crate) struct RecordingPaymentApi {
    pub(crate) order: Scripted<PaymentOrder>,
    pub(crate) card: Scripted<CardIntent>,
    pub(crate) oxxo: Scripted<OxxoVoucher>,
    pub(crate) status: Scripted<StatusSnapshot>,
    // Artificial latency so concurrent triggers overlap the first request.
    pub(crate) latency: Duration,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingPaymentApi {
    pub(crate) fn new() -> Self {
        Self {
            order: Scripted::Reply(PaymentOrder {
                order_id: "ord_1".to_string(),
                amount: 150.0,
                currency: "MXN".to_string(),
            }),
            card: Scripted::Reply(CardIntent {
                client_secret: "pi_1_secret_abc".to_string(),
                payment_intent_id: "pi_1".to_string(),
            }),
            oxxo: Scripted::Reply(OxxoVoucher {
                reference: "93000012345678".to_string(),
                amount: 150.0,
                expires_at: "2026-10-21T23:59:59Z".to_string(),
                barcode_url: None,
            }),
            status: Scripted::Reply(snapshot("succeeded")),
            latency: Duration::from_millis(50),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|name| **name == call).count()
    }

    async fn record(&self, call: &'static str) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
        tokio::time::sleep(self.latency).await;
    }
}

#[async_trait]
impl PaymentApi for RecordingPaymentApi {
    async fn create_order(&self, _application_id: u64) -> ApiResult<PaymentOrder> {
        self.record("create_order").await;
        self.order.play().await
    }

    async fn create_card_payment(
        &self,
        _application_id: u64,
        _order: &PaymentOrder,
    ) -> ApiResult<CardIntent> {
        self.record("create_card_payment").await;
        self.card.play().await
    }

    async fn create_oxxo_payment(&self, _application_id: u64) -> ApiResult<OxxoVoucher> {
        self.record("create_oxxo_payment").await;
        self.oxxo.play().await
    }

    async fn payment_status(&self, _application_id: u64) -> ApiResult<StatusSnapshot> {
        self.record("payment_status").await;
        self.status.play().await
    }
}

#[derive(Clone)]
pub(crate) struct FakeCardProcessor {
    pub(crate) outcome: Result<ProcessorConfirmation, ProcessorError>,
    pub(crate) latency: Duration,
    secrets: Arc<Mutex<Vec<String>>>,
}

impl FakeCardProcessor {
    pub(crate) fn succeeding() -> Self {
        Self {
            outcome: Ok(ProcessorConfirmation {
                payment_intent_id: "pi_1".to_string(),
                status: StatusKind::Succeeded,
            }),
            latency: Duration::ZERO,
            secrets: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn confirming(status: StatusKind) -> Self {
        Self {
            outcome: Ok(ProcessorConfirmation {
                payment_intent_id: "pi_1".to_string(),
                status,
            }),
            ..Self::succeeding()
        }
    }

    pub(crate) fn failing(code: Option<&str>, message: Option<&str>) -> Self {
        Self {
            outcome: Err(ProcessorError {
                code: code.map(str::to_string),
                message: message.map(str::to_string),
            }),
            ..Self::succeeding()
        }
    }

    pub(crate) fn secrets(&self) -> Vec<String> {
        self.secrets.lock().expect("secrets mutex poisoned").clone()
    }
}

#[async_trait]
impl CardProcessor for FakeCardProcessor {
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        _payment_method: &str,
    ) -> Result<ProcessorConfirmation, ProcessorError> {
        self.secrets
            .lock()
            .expect("secrets mutex poisoned")
            .push(client_secret.to_string());
        tokio::task::yield_now().await;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.outcome.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecoveryEvent {
    Success(StatusSnapshot),
    Failed(String),
    StillProcessing(StatusSnapshot),
}

#[derive(Clone, Default)]
pub(crate) struct RecordingListener {
    events: Arc<Mutex<Vec<RecoveryEvent>>>,
}

impl RecordingListener {
    pub(crate) fn events(&self) -> Vec<RecoveryEvent> {
        self.events.lock().expect("events mutex poisoned").clone()
    }

    fn push(&self, event: RecoveryEvent) {
        self.events.lock().expect("events mutex poisoned").push(event);
    }
}

impl RecoveryListener for RecordingListener {
    fn on_recovery_success(&self, snapshot: &StatusSnapshot) {
        self.push(RecoveryEvent::Success(snapshot.clone()));
    }

    fn on_recovery_failed(&self, message: &str) {
        self.push(RecoveryEvent::Failed(message.to_string()));
    }

    fn on_still_processing(&self, snapshot: &StatusSnapshot) {
        self.push(RecoveryEvent::StillProcessing(snapshot.clone()));
    }
}

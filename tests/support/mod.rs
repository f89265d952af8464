// Scripted stand-in for the Permisos Digitales backend and the payment processor.
#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use url::Url;

pub const PASSWORD: &str = "correcta-123";
pub const SESSION_COOKIE: &str = "sid=abc123";

// Everything the fake backend saw, plus the knobs tests turn before a call.
#[derive(Default)]
pub struct Backend {
    pub csrf_issued: AtomicUsize,
    pub reject_next_csrf: AtomicBool,
    pub seen_csrf: Mutex<Vec<Option<String>>>,
    pub seen_request_ids: Mutex<Vec<String>>,
    pub status_script: Mutex<VecDeque<Value>>,
    pub status_calls: AtomicUsize,
    pub oxxo_calls: AtomicUsize,
    pub logouts: AtomicUsize,
    pub processor_forms: Mutex<Vec<String>>,
    pub processor_reply: Mutex<Option<(u16, Value)>>,
}

impl Backend {
    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = Value>) {
        self.status_script
            .lock()
            .expect("script lock")
            .extend(statuses);
    }

    pub fn seen_csrf(&self) -> Vec<Option<String>> {
        self.seen_csrf.lock().expect("csrf lock").clone()
    }

    pub fn seen_request_ids(&self) -> Vec<String> {
        self.seen_request_ids.lock().expect("request id lock").clone()
    }

    fn record(&self, headers: &HeaderMap) {
        if let Some(id) = header_value(headers, "x-request-id") {
            self.seen_request_ids
                .lock()
                .expect("request id lock")
                .push(id);
        }
    }

    // Returns a 403 CSRF rejection when one was requested for this call.
    fn check_csrf(&self, headers: &HeaderMap) -> Option<Response> {
        self.record(headers);
        self.seen_csrf
            .lock()
            .expect("csrf lock")
            .push(header_value(headers, "x-csrf-token"));
        if self.reject_next_csrf.swap(false, Ordering::SeqCst) {
            return Some(
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({
                        "success": false,
                        "error": "Forbidden",
                        "message": "Token CSRF inválido",
                        "errorCode": "CSRF_INVALID"
                    })),
                )
                    .into_response(),
            );
        }
        None
    }
}

// A running fake with the API root the client should be pointed at.
pub struct TestServer {
    pub backend: Arc<Backend>,
    pub root: String,
}

impl TestServer {
    pub fn api_url(&self) -> Url {
        Url::parse(&format!("{}/api", self.root)).expect("valid api url")
    }
}

// Bind an ephemeral port and serve the fake on the current test runtime.
pub async fn spawn_backend() -> TestServer {
    let backend = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/auth/csrf-token", get(csrf_token))
        .route("/api/auth/login", post(login))
        .route("/api/auth/status", get(status))
        .route("/api/auth/logout", post(logout))
        .route("/api/applications", get(applications))
        .route("/api/applications/{id}/payment/status", get(payment_status))
        .route("/api/applications/{id}/payment/order", post(payment_order))
        .route("/api/applications/{id}/payment/card", post(card_payment))
        .route("/api/applications/{id}/payment/oxxo", post(oxxo_payment))
        .route("/api/queue/status/{id}", get(queue_status))
        .route("/v1/payment_intents/{intent}/confirm", post(confirm_intent))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });

    TestServer {
        backend,
        root: format!("http://{addr}"),
    }
}

// An address that refuses connections: bound once, then released.
pub async fn closed_api_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    drop(listener);
    Url::parse(&format!("http://{addr}/api")).expect("valid api url")
}

pub const TIMEOUT: Duration = Duration::from_secs(5);

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn user_json() -> Value {
    json!({
        "id": 7,
        "email": "ana@example.mx",
        "firstName": "Ana",
        "lastName": "López",
        "accountType": "citizen",
        "emailVerified": true
    })
}

async fn csrf_token(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Json<Value> {
    backend.record(&headers);
    let issued = backend.csrf_issued.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "success": true, "data": { "csrfToken": format!("token-{issued}") } }))
}

async fn login(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = backend.check_csrf(&headers) {
        return rejection;
    }
    if body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Credenciales inválidas" })),
        )
            .into_response();
    }
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
        Json(json!({ "success": true, "message": "Bienvenida", "data": user_json() })),
    )
        .into_response()
}

async fn status(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Json<Value> {
    backend.record(&headers);
    let logged_in = header_value(&headers, "cookie")
        .is_some_and(|cookies| cookies.contains(SESSION_COOKIE));
    if logged_in {
        Json(json!({ "success": true, "data": { "isLoggedIn": true, "user": user_json() } }))
    } else {
        Json(json!({ "success": true, "data": { "isLoggedIn": false, "user": null } }))
    }
}

async fn logout(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Some(rejection) = backend.check_csrf(&headers) {
        return rejection;
    }
    backend.logouts.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "success": true, "message": "Sesión cerrada" })).into_response()
}

// Answers without the `success` flag.
async fn applications() -> Json<Value> {
    Json(json!({ "data": [] }))
}

async fn payment_status(
    State(backend): State<Arc<Backend>>,
    Path(_id): Path<u64>,
) -> Json<Value> {
    backend.status_calls.fetch_add(1, Ordering::SeqCst);
    let next = backend
        .status_script
        .lock()
        .expect("script lock")
        .pop_front()
        .unwrap_or_else(|| json!({ "status": "processing" }));
    Json(json!({ "success": true, "data": next }))
}

async fn queue_status(Path(_id): Path<u64>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": { "status": "completed", "position": 0, "message": "Tu permiso está listo." }
    }))
}

async fn payment_order(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if let Some(rejection) = backend.check_csrf(&headers) {
        return rejection;
    }
    Json(json!({
        "success": true,
        "data": { "orderId": format!("ord_{id}"), "amount": 150.0 }
    }))
    .into_response()
}

async fn card_payment(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = backend.check_csrf(&headers) {
        return rejection;
    }
    if body["orderId"].as_str().is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Falta la orden" })),
        )
            .into_response();
    }
    Json(json!({
        "success": true,
        "data": { "clientSecret": "pi_123_secret_abc", "paymentIntentId": "pi_123" }
    }))
    .into_response()
}

async fn oxxo_payment(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Path(_id): Path<u64>,
) -> Response {
    if let Some(rejection) = backend.check_csrf(&headers) {
        return rejection;
    }
    backend.oxxo_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "data": {
            "reference": "93000012345678",
            "amount": 150.0,
            "expiresAt": "2026-10-21T23:59:59Z",
            "barcodeUrl": "https://example.mx/barcode.png"
        }
    }))
    .into_response()
}

async fn confirm_intent(
    State(backend): State<Arc<Backend>>,
    Path(intent): Path<String>,
    body: String,
) -> Response {
    backend
        .processor_forms
        .lock()
        .expect("form lock")
        .push(body);
    let scripted = backend.processor_reply.lock().expect("reply lock").take();
    match scripted {
        Some((code, reply)) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::PAYMENT_REQUIRED);
            (status, Json(reply)).into_response()
        }
        None => Json(json!({ "id": intent, "status": "succeeded" })).into_response(),
    }
}

// Framework bootstrap for the command-line client.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::errors::{Cancelled, FlowError};
use crate::domain::payment::{OxxoVoucher, PaymentMethod, StatusSnapshot};
use crate::domain::ports::StatusSource;
use crate::domain::result::OperationResult;
use crate::domain::session::Credentials;
use crate::frameworks::config::{self, ConfigError, Settings};
use crate::interface_adapters::clients::{
    ApplicationClient, AuthClient, PaymentClient, ProcessorClient, QueueClient,
};
use crate::interface_adapters::http::ApiHttp;
use crate::interface_adapters::state::WatchAuthStore;
use crate::use_cases::applications::ApplicationService;
use crate::use_cases::auth::AuthSession;
use crate::use_cases::payment_flow::PaymentFlow;
use crate::use_cases::polling::{PaymentStatusSource, QueueStatusSource};
use crate::use_cases::{CancelSignal, PollOutcome, StatusPoller, cancel_pair};

#[derive(Debug, Parser)]
#[command(name = "permisos", about = "Client for the Permisos Digitales API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// List the applications of the logged-in user.
    Applications,
    /// Show the status of one application.
    Status { id: u64 },
    /// Poll the payment status of an application until it settles.
    WatchPayment { id: u64 },
    /// Poll the permit generation queue for an application.
    WatchQueue { id: u64 },
    /// Generate an OXXO cash voucher for an application.
    Voucher { id: u64 },
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to initialize http client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("PERMISOS_EMAIL and PERMISOS_PASSWORD must be set")]
    MissingCredentials,
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("interrupted")]
    Interrupted,
}

impl From<Cancelled> for RunnerError {
    fn from(_: Cancelled) -> Self {
        RunnerError::Interrupted
    }
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run() -> Result<(), RunnerError> {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let settings = config::load()?;
    tracing::debug!(
        api_url = %settings.api_url,
        request_timeout_ms = settings.request_timeout.as_millis(),
        "client configured"
    );

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            cancel.cancel();
        }
    });

    let (Ok(email), Ok(password)) = (
        std::env::var("PERMISOS_EMAIL"),
        std::env::var("PERMISOS_PASSWORD"),
    ) else {
        return Err(RunnerError::MissingCredentials);
    };

    execute(cli.command, &settings, &Credentials { email, password }, &signal).await
}

/// Logs in, runs one command against the configured backend and logs out.
pub async fn execute(
    command: Command,
    settings: &Settings,
    credentials: &Credentials,
    signal: &CancelSignal,
) -> Result<(), RunnerError> {
    let http = Arc::new(ApiHttp::new(&settings.api_url, settings.request_timeout)?);

    let mut session = AuthSession::new(AuthClient::new(http.clone()), WatchAuthStore::new());
    session.timeout = settings.auth_timeout;
    login(&session, credentials, signal).await?;

    let outcome = run_command(command, settings, signal, http).await;

    // The server session is closed whatever the command did.
    match session.logout().await {
        Ok(OperationResult::Success { .. }) => tracing::debug!("logged out"),
        Ok(OperationResult::Failure { message, .. }) => {
            tracing::warn!(%message, "logout failed");
        }
        Err(Cancelled) => tracing::warn!("logout interrupted"),
    }
    outcome
}

async fn run_command(
    command: Command,
    settings: &Settings,
    signal: &CancelSignal,
    http: Arc<ApiHttp>,
) -> Result<(), RunnerError> {
    match command {
        Command::Applications => {
            let applications = ApplicationService::new(ApplicationClient::new(http))
                .list()
                .await?;
            for application in succeeded(applications)? {
                println!(
                    "{:>6}  {:<28}  {} {} {}",
                    application.id,
                    application.status.label(),
                    application.marca,
                    application.linea,
                    application.ano_modelo
                );
            }
        }
        Command::Status { id } => {
            let info = ApplicationService::new(ApplicationClient::new(http))
                .status(id)
                .await?;
            let info = succeeded(info)?;
            println!("{}", info.status.label());
            if let Some(message) = info.status_message {
                println!("{message}");
            }
        }
        Command::WatchPayment { id } => {
            let source = PaymentStatusSource(PaymentClient::new(http));
            watch(StatusPoller::new(source, settings.poll), id, signal).await?;
        }
        Command::WatchQueue { id } => {
            let source = QueueStatusSource(QueueClient::new(http));
            watch(StatusPoller::new(source, settings.poll), id, signal).await?;
        }
        Command::Voucher { id } => {
            let processor = ProcessorClient::new(
                settings.processor_api_url.as_str(),
                settings
                    .processor_publishable_key
                    .clone()
                    .unwrap_or_default(),
                settings.request_timeout,
            )?;
            let flow = PaymentFlow::new(
                PaymentClient::new(http),
                processor,
                id,
                PaymentMethod::Voucher,
            );
            let voucher = tokio::select! {
                voucher = generate_voucher(&flow) => voucher?,
                _ = signal.cancelled() => return Err(RunnerError::Interrupted),
            };
            println!("Referencia: {}", voucher.reference);
            println!("Monto: ${:.2} MXN", voucher.amount);
            println!("Vence: {}", voucher.expires_at);
            if let Some(url) = voucher.barcode_url {
                println!("Código de barras: {url}");
            }
        }
    }
    Ok(())
}

async fn login(
    session: &AuthSession<AuthClient, WatchAuthStore>,
    credentials: &Credentials,
    signal: &CancelSignal,
) -> Result<(), RunnerError> {
    let user = succeeded(session.login(credentials, signal).await?)?;
    tracing::info!(user_id = user.id, name = %user.display_name(), "logged in");
    Ok(())
}

async fn generate_voucher(
    flow: &PaymentFlow<PaymentClient, ProcessorClient>,
) -> Result<OxxoVoucher, RunnerError> {
    let prepared = flow.initialize().await?;
    if let Some(error) = prepared.error {
        return Err(RunnerError::Failed(error));
    }
    succeeded(flow.generate_voucher().await?)
}

// Polls in place so every attempt is printed; Ctrl-C stops the loop.
async fn watch<S>(poller: StatusPoller<S>, id: u64, signal: &CancelSignal) -> Result<(), RunnerError>
where
    S: StatusSource,
{
    let outcome = poller.run(id, signal, print_snapshot).await;

    match outcome {
        PollOutcome::Succeeded(snapshot) => {
            println!("{}", snapshot.display_message());
            Ok(())
        }
        PollOutcome::Failed(snapshot)
        | PollOutcome::Canceled(snapshot)
        | PollOutcome::Unrecognized(snapshot) => Err(RunnerError::Failed(snapshot.display_message())),
        PollOutcome::GaveUp { last, attempts } => {
            tracing::info!(attempts, "stopped polling before a final status");
            println!("{}", last.display_message());
            Ok(())
        }
        PollOutcome::Errored { error, .. } => Err(RunnerError::Failed(error.to_string())),
        PollOutcome::Stopped => Err(RunnerError::Interrupted),
    }
}

fn print_snapshot(attempt: u32, snapshot: &StatusSnapshot) {
    match snapshot.position {
        Some(position) => println!(
            "[{attempt}] {} (posición {position})",
            snapshot.display_message()
        ),
        None => println!("[{attempt}] {}", snapshot.display_message()),
    }
}

fn succeeded<T>(result: OperationResult<T>) -> Result<T, RunnerError> {
    match result {
        OperationResult::Success { data, .. } => Ok(data),
        OperationResult::Failure { message, .. } => Err(RunnerError::Failed(message)),
    }
}

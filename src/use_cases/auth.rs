// Session lifecycle: login, registration, status checks and credential recovery.

use std::future::Future;
use std::time::Duration;

use crate::domain::errors::{Cancelled, ClientError};
use crate::domain::ports::{AuthApi, AuthStateStore};
use crate::domain::result::{ApiReply, OperationResult};
use crate::domain::session::{Credentials, PasswordChange, PasswordReset, Registration, User};
use crate::use_cases::normalize::{into_failure, normalize};
use crate::use_cases::task::{CancelSignal, guarded_call};

pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

pub const LOGIN_TIMEOUT_MESSAGE: &str =
    "La solicitud de inicio de sesión tardó demasiado. Por favor, intenta nuevamente.";
pub const REGISTER_TIMEOUT_MESSAGE: &str =
    "La solicitud de registro tardó demasiado. Por favor, intenta nuevamente.";
const LOGIN_FAILED_MESSAGE: &str = "Error al iniciar sesión. Verifica tus credenciales.";
const REGISTER_FAILED_MESSAGE: &str = "Error al registrar la cuenta. Por favor, intenta nuevamente.";
const MISSING_CREDENTIALS_MESSAGE: &str = "Por favor, ingresa tu correo electrónico y contraseña.";
const MISSING_REGISTRATION_MESSAGE: &str = "Por favor, completa todos los campos obligatorios.";
const INVALID_EMAIL_MESSAGE: &str = "Por favor, ingresa un correo electrónico válido.";
const SHORT_PASSWORD_MESSAGE: &str = "La contraseña debe tener al menos 8 caracteres.";
const STATUS_FAILED_MESSAGE: &str = "No se pudo verificar la sesión.";
const NOT_LOGGED_IN_MESSAGE: &str = "No has iniciado sesión.";
const LOGOUT_FAILED_MESSAGE: &str = "Error al cerrar sesión.";
const FORGOT_FAILED_MESSAGE: &str =
    "No se pudo enviar el correo de recuperación. Por favor, intenta nuevamente.";
const RESET_FAILED_MESSAGE: &str =
    "No se pudo restablecer la contraseña. El enlace puede haber expirado.";
const CHANGE_FAILED_MESSAGE: &str = "No se pudo cambiar la contraseña.";
const VERIFICATION_FAILED_MESSAGE: &str = "No se pudo reenviar el correo de verificación.";
pub const VALIDATION_ERROR_CODE: &str = "VALIDATION_ERROR";

const MIN_PASSWORD_LEN: usize = 8;

/// Auth workflows over an injected API and state store.
pub struct AuthSession<A, S> {
    pub api: A,
    pub store: S,
    pub timeout: Duration,
}

impl<A, S> AuthSession<A, S>
where
    A: AuthApi,
    S: AuthStateStore,
{
    pub fn new(api: A, store: S) -> Self {
        Self {
            api,
            store,
            timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }

    /// Logs in under the client-side deadline. The store is written only on
    /// success, so a timed out attempt never looks authenticated.
    #[tracing::instrument(skip_all)]
    pub async fn login(
        &self,
        credentials: &Credentials,
        signal: &CancelSignal,
    ) -> Result<OperationResult<User>, Cancelled> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Ok(validation_failure(MISSING_CREDENTIALS_MESSAGE));
        }

        let result = self
            .deadline_call(
                self.api.login(credentials),
                signal,
                LOGIN_FAILED_MESSAGE,
                LOGIN_TIMEOUT_MESSAGE,
            )
            .await?;

        if let OperationResult::Success { data: user, .. } = &result {
            tracing::info!(user_id = user.id, "login succeeded");
            self.store.set_authenticated(user.clone());
        }
        Ok(result)
    }

    #[tracing::instrument(skip_all)]
    pub async fn register(
        &self,
        registration: &Registration,
        signal: &CancelSignal,
    ) -> Result<OperationResult<User>, Cancelled> {
        if let Err(message) = validate_registration(registration) {
            return Ok(validation_failure(message));
        }

        let result = self
            .deadline_call(
                self.api.register(registration),
                signal,
                REGISTER_FAILED_MESSAGE,
                REGISTER_TIMEOUT_MESSAGE,
            )
            .await?;

        if let OperationResult::Success { data: user, .. } = &result {
            tracing::info!(user_id = user.id, "registration succeeded");
            self.store.set_authenticated(user.clone());
        }
        Ok(result)
    }

    /// Asks the server who we are. Any failure clears the cached identity.
    #[tracing::instrument(skip_all)]
    pub async fn check_status(&self) -> Result<OperationResult<User>, Cancelled> {
        let result = normalize(self.api.status(), STATUS_FAILED_MESSAGE).await?;

        let result = match result {
            OperationResult::Success { data, message } => match data.user {
                Some(user) if data.is_logged_in => OperationResult::success(user, message),
                _ => OperationResult::failure(None, NOT_LOGGED_IN_MESSAGE, None),
            },
            OperationResult::Failure {
                message,
                error_code,
            } => OperationResult::Failure {
                message,
                error_code,
            },
        };

        match &result {
            OperationResult::Success { data: user, .. } => {
                self.store.set_authenticated(user.clone());
            }
            OperationResult::Failure { .. } => self.store.clear(),
        }
        Ok(result)
    }

    /// Ends the session. The local identity is dropped even when the
    /// server call fails.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self) -> Result<OperationResult<()>, Cancelled> {
        let result = normalize(self.api.logout(), LOGOUT_FAILED_MESSAGE).await;
        self.store.clear();
        if let Ok(OperationResult::Failure { message, .. }) = &result {
            tracing::warn!(%message, "server logout failed; local session cleared");
        }
        result
    }

    pub async fn forgot_password(&self, email: &str) -> Result<OperationResult<()>, Cancelled> {
        if !looks_like_email(email) {
            return Ok(validation_failure(INVALID_EMAIL_MESSAGE));
        }
        normalize(self.api.forgot_password(email.trim()), FORGOT_FAILED_MESSAGE).await
    }

    pub async fn reset_password(
        &self,
        reset: &PasswordReset,
    ) -> Result<OperationResult<()>, Cancelled> {
        if reset.password.chars().count() < MIN_PASSWORD_LEN {
            return Ok(validation_failure(SHORT_PASSWORD_MESSAGE));
        }
        normalize(self.api.reset_password(reset), RESET_FAILED_MESSAGE).await
    }

    pub async fn change_password(
        &self,
        change: &PasswordChange,
    ) -> Result<OperationResult<()>, Cancelled> {
        if change.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Ok(validation_failure(SHORT_PASSWORD_MESSAGE));
        }
        normalize(self.api.change_password(change), CHANGE_FAILED_MESSAGE).await
    }

    pub async fn resend_verification(
        &self,
        email: &str,
    ) -> Result<OperationResult<()>, Cancelled> {
        if !looks_like_email(email) {
            return Ok(validation_failure(INVALID_EMAIL_MESSAGE));
        }
        normalize(
            self.api.resend_verification(email.trim()),
            VERIFICATION_FAILED_MESSAGE,
        )
        .await
    }

    async fn deadline_call<F, T>(
        &self,
        call: F,
        signal: &CancelSignal,
        default_message: &str,
        timeout_message: &str,
    ) -> Result<OperationResult<T>, Cancelled>
    where
        F: Future<Output = Result<ApiReply<T>, ClientError>>,
    {
        match guarded_call(call, Some(self.timeout), signal).await {
            Ok(reply) => Ok(OperationResult::success(reply.data, reply.message)),
            // A deadline miss is reported like any failure, with its own text.
            Err(ClientError::Timeout(limit)) => {
                tracing::warn!(timeout_ms = limit.as_millis(), "auth request exceeded deadline");
                Ok(OperationResult::failure(None, timeout_message, None))
            }
            Err(err) => into_failure(err, default_message),
        }
    }
}

fn validation_failure<T>(message: &str) -> OperationResult<T> {
    OperationResult::failure(None, message, Some(VALIDATION_ERROR_CODE.to_string()))
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !value.contains(' ')
        }
        None => false,
    }
}

fn validate_registration(registration: &Registration) -> Result<(), &'static str> {
    if registration.first_name.trim().is_empty()
        || registration.last_name.trim().is_empty()
        || registration.email.trim().is_empty()
        || registration.password.is_empty()
    {
        return Err(MISSING_REGISTRATION_MESSAGE);
    }
    if !looks_like_email(&registration.email) {
        return Err(INVALID_EMAIL_MESSAGE);
    }
    if registration.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SHORT_PASSWORD_MESSAGE);
    }
    Ok(())
}

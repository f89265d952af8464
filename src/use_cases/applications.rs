// Permit application calls wrapped in the uniform result shape.

use crate::domain::application::{
    Application, ApplicationForm, ApplicationStatusInfo, FieldError, RenewalEligibility,
};
use crate::domain::errors::Cancelled;
use crate::domain::ports::ApplicationApi;
use crate::domain::result::OperationResult;
use crate::use_cases::auth::VALIDATION_ERROR_CODE;
use crate::use_cases::normalize::normalize;

const LIST_FAILED_MESSAGE: &str = "No se pudieron cargar tus solicitudes.";
const GET_FAILED_MESSAGE: &str = "No se pudo cargar la solicitud.";
const CREATE_FAILED_MESSAGE: &str = "No se pudo crear la solicitud. Por favor, intenta nuevamente.";
const STATUS_FAILED_MESSAGE: &str = "No se pudo consultar el estado de la solicitud.";
const RENEWAL_CHECK_FAILED_MESSAGE: &str = "No se pudo verificar si el permiso puede renovarse.";
const RENEW_FAILED_MESSAGE: &str = "No se pudo renovar el permiso. Por favor, intenta nuevamente.";
const INVALID_FORM_MESSAGE: &str = "Por favor, corrige los campos marcados.";

/// Outcome of submitting the permit form: either field errors caught
/// locally or the backend's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Invalid {
        message: &'static str,
        errors: Vec<FieldError>,
    },
    Submitted(OperationResult<Application>),
}

pub struct ApplicationService<A> {
    pub api: A,
}

impl<A> ApplicationService<A>
where
    A: ApplicationApi,
{
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<OperationResult<Vec<Application>>, Cancelled> {
        normalize(self.api.list(), LIST_FAILED_MESSAGE).await
    }

    pub async fn get(&self, application_id: u64) -> Result<OperationResult<Application>, Cancelled> {
        normalize(self.api.get(application_id), GET_FAILED_MESSAGE).await
    }

    /// Validates the form locally and only then submits it.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, form: &ApplicationForm) -> Result<CreateOutcome, Cancelled> {
        if let Err(errors) = form.validate() {
            tracing::debug!(count = errors.len(), "application form rejected locally");
            return Ok(CreateOutcome::Invalid {
                message: INVALID_FORM_MESSAGE,
                errors,
            });
        }
        let result = normalize(self.api.create(form), CREATE_FAILED_MESSAGE).await?;
        if let OperationResult::Success { data, .. } = &result {
            tracing::info!(application_id = data.id, "application created");
        }
        Ok(CreateOutcome::Submitted(result))
    }

    pub async fn status(
        &self,
        application_id: u64,
    ) -> Result<OperationResult<ApplicationStatusInfo>, Cancelled> {
        normalize(self.api.status(application_id), STATUS_FAILED_MESSAGE).await
    }

    pub async fn renewal_eligibility(
        &self,
        application_id: u64,
    ) -> Result<OperationResult<RenewalEligibility>, Cancelled> {
        normalize(
            self.api.renewal_eligibility(application_id),
            RENEWAL_CHECK_FAILED_MESSAGE,
        )
        .await
    }

    pub async fn renew(&self, application_id: u64) -> Result<OperationResult<Application>, Cancelled> {
        normalize(self.api.renew(application_id), RENEW_FAILED_MESSAGE).await
    }
}

impl CreateOutcome {
    pub fn into_result(self) -> OperationResult<Application> {
        match self {
            CreateOutcome::Invalid { message, .. } => OperationResult::failure(
                Some(message.to_string()),
                message,
                Some(VALIDATION_ERROR_CODE.to_string()),
            ),
            CreateOutcome::Submitted(result) => result,
        }
    }
}

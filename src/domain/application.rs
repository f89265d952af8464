use serde::{Deserialize, Serialize};

// Lifecycle status of a permit application as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    AwaitingPayment,
    AwaitingOxxoPayment,
    PaymentProcessing,
    PaymentFailed,
    PaymentReceived,
    GeneratingPermit,
    PermitReady,
    Completed,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

impl ApplicationStatus {
    pub fn needs_payment(self) -> bool {
        matches!(
            self,
            ApplicationStatus::AwaitingPayment
                | ApplicationStatus::AwaitingOxxoPayment
                | ApplicationStatus::PaymentFailed
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::AwaitingPayment => "Pendiente de pago",
            ApplicationStatus::AwaitingOxxoPayment => "Pendiente de pago en OXXO",
            ApplicationStatus::PaymentProcessing => "Procesando pago",
            ApplicationStatus::PaymentFailed => "Pago rechazado",
            ApplicationStatus::PaymentReceived => "Pago recibido",
            ApplicationStatus::GeneratingPermit => "Generando permiso",
            ApplicationStatus::PermitReady => "Permiso listo",
            ApplicationStatus::Completed => "Completado",
            ApplicationStatus::Cancelled => "Cancelado",
            ApplicationStatus::Expired => "Vencido",
            ApplicationStatus::Unknown => "Estado desconocido",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: u64,
    pub status: ApplicationStatus,
    pub nombre_completo: String,
    #[serde(default)]
    pub marca: String,
    #[serde(default)]
    pub linea: String,
    #[serde(default)]
    pub ano_modelo: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatusInfo {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub allowed_actions: Vec<String>,
    #[serde(default)]
    pub status_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalEligibility {
    pub eligible: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub days_until_expiration: Option<i64>,
}

/// Vehicle and owner data captured by the multi-step permit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    pub nombre_completo: String,
    pub curp_rfc: String,
    pub domicilio: String,
    pub marca: String,
    pub linea: String,
    pub color: String,
    pub numero_serie: String,
    pub numero_motor: String,
    pub ano_modelo: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

const EARLIEST_MODEL_YEAR: u32 = 1900;
const LATEST_MODEL_YEAR: u32 = 2100;

impl ApplicationForm {
    /// Field-level checks run before anything is sent to the backend.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let required = [
            ("nombreCompleto", &self.nombre_completo, "El nombre completo es obligatorio."),
            ("curpRfc", &self.curp_rfc, "El CURP o RFC es obligatorio."),
            ("domicilio", &self.domicilio, "El domicilio es obligatorio."),
            ("marca", &self.marca, "La marca es obligatoria."),
            ("linea", &self.linea, "La línea es obligatoria."),
            ("color", &self.color, "El color es obligatorio."),
            ("numeroSerie", &self.numero_serie, "El número de serie es obligatorio."),
            ("numeroMotor", &self.numero_motor, "El número de motor es obligatorio."),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.push(FieldError { field, message });
            }
        }

        let curp_rfc = self.curp_rfc.trim();
        if !curp_rfc.is_empty()
            && !((12..=18).contains(&curp_rfc.len())
                && curp_rfc.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            errors.push(FieldError {
                field: "curpRfc",
                message: "El CURP o RFC no tiene un formato válido.",
            });
        }

        let serie = self.numero_serie.trim();
        if !serie.is_empty()
            && !((5..=50).contains(&serie.len())
                && serie.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            errors.push(FieldError {
                field: "numeroSerie",
                message: "El número de serie debe tener entre 5 y 50 caracteres alfanuméricos.",
            });
        }

        let year_ok = self.ano_modelo.trim().len() == 4
            && self
                .ano_modelo
                .trim()
                .parse::<u32>()
                .is_ok_and(|year| (EARLIEST_MODEL_YEAR..=LATEST_MODEL_YEAR).contains(&year));
        if !year_ok {
            errors.push(FieldError {
                field: "anoModelo",
                message: "El año del modelo debe ser un año válido de 4 dígitos.",
            });
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

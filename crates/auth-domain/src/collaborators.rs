//! Colaboradores externos consumidos por la tubería, como interfaces.
//!
//! La tubería nunca habla HTTP ni arma correos por sí misma: delega en estos
//! traits. Las implementaciones reales (SMTP, endpoints de proveedor, hosts
//! permitidos del deployment) quedan fuera del core; `auth-adapters` provee
//! versiones in-memory / estáticas para tests y demo.

use serde_json::Value;
use uuid::Uuid;

use crate::errors::DomainError;

/// Entrada del endpoint secundario de correos de un proveedor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailEntry {
    pub email: String,
    pub verified: bool,
    pub primary: bool,
}

/// Consulta secundaria de correos verificados (p. ej. la API de correos de
/// GitHub). Timeouts, cabeceras y autenticación son asunto del implementador.
pub trait SecondaryEmailFetcher: Send + Sync {
    fn fetch_verified_emails(&self, backend: &str, access_token: &str) -> Result<Vec<EmailEntry>, DomainError>;
}

/// Despacho de notificaciones: correos templados y actividad de cuenta.
pub trait Notifier: Send + Sync {
    fn send_email(&self, template: &str, recipient: &str, context: &Value);

    fn notify_account_activity(&self, user: Uuid, activity: &str, method: &str, name: &str);
}

/// Validación de redirects post-login contra los orígenes del deployment.
pub trait RedirectChecker: Send + Sync {
    fn is_safe_redirect(&self, url: &str) -> bool;
}

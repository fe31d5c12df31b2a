//! Carga de configuración del deployment desde variables de entorno.
//! Usa convención de claves planas y defaults razonables por clave.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// ¿Se aceptan registros nuevos?
    pub registration_open: bool,
    /// Deployment de demostración: la cuenta demo queda bloqueada.
    pub demo_mode: bool,
    pub demo_username: String,
    /// Ventana de validez de un intento, en segundos.
    pub auth_token_valid: i64,
    /// Formulario de datos de registro (redirect bloqueante de require_email).
    pub registration_url: String,
    /// Página "revisa tu correo" a la que se redirige al suspender.
    pub email_validation_url: String,
    /// Base del endpoint que completa el flujo de cada backend.
    pub complete_url_base: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            registration_open: true,
            demo_mode: false,
            demo_username: "demo".to_string(),
            auth_token_valid: 3600,
            registration_url: "/accounts/register/".to_string(),
            email_validation_url: "/accounts/email-sent/".to_string(),
            complete_url_base: "/accounts/complete".to_string(),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl AuthSettings {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        Self {
            registration_open: env_bool("REGISTRATION_OPEN", defaults.registration_open),
            demo_mode: env_bool("DEMO_SERVER", defaults.demo_mode),
            demo_username: env::var("DEMO_USERNAME").unwrap_or(defaults.demo_username),
            auth_token_valid: env::var("AUTH_TOKEN_VALID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auth_token_valid),
            registration_url: env::var("REGISTRATION_URL").unwrap_or(defaults.registration_url),
            email_validation_url: env::var("EMAIL_VALIDATION_URL").unwrap_or(defaults.email_validation_url),
            complete_url_base: env::var("COMPLETE_URL_BASE").unwrap_or(defaults.complete_url_base),
        }
    }

    /// URL del endpoint que completa el flujo del backend dado.
    pub fn complete_url(&self, backend: &str) -> String {
        format!("{}/{}/", self.complete_url_base.trim_end_matches('/'), backend)
    }
}

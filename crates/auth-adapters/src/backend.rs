//! Configuración estática por backend/proveedor.
//!
//! Las banderas de validación de correo y passwordless son configuración de
//! proceso suministrada a los steps, no parte del `Context` del intento.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub name: String,
    /// El backend exige confirmación de correo por diseño.
    pub requires_email_validation: bool,
    /// El deployment fuerza la confirmación aunque el backend no la exija.
    pub force_email_validation: bool,
    /// Flujos sin contraseña: se revalida el correo también para cuentas
    /// existentes.
    pub passwordless: bool,
    /// El perfil no trae correo pero existe un endpoint secundario de correos.
    pub secondary_emails: bool,
}

impl BackendConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requires_email_validation: false,
            force_email_validation: false,
            passwordless: false,
            secondary_emails: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct BackendRegistry {
    inner: HashMap<String, BackendConfig>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, config: BackendConfig) {
        self.inner.insert(config.name.clone(), config);
    }

    pub fn get(&self, name: &str) -> Option<&BackendConfig> {
        self.inner.get(name)
    }
}

/// Registro con los backends que el deployment trae de fábrica.
pub fn default_backends() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(BackendConfig { secondary_emails: true, ..BackendConfig::named("github") });
    registry.register(BackendConfig {
        requires_email_validation: true,
        ..BackendConfig::named("email")
    });
    registry.register(BackendConfig::named("google-oauth2"));
    registry.register(BackendConfig::named("gitlab"));
    registry.register(BackendConfig::named("bitbucket"));
    registry
}

/// Nombre legible de un backend para notificaciones.
pub fn auth_name(backend: &str) -> String {
    match backend {
        "github" => "GitHub".to_string(),
        "gitlab" => "GitLab".to_string(),
        "google-oauth2" => "Google".to_string(),
        "bitbucket" => "Bitbucket".to_string(),
        "facebook" => "Facebook".to_string(),
        "email" => "E-mail".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_name_maps_known_backends_and_capitalizes_the_rest() {
        assert_eq!(auth_name("github"), "GitHub");
        assert_eq!(auth_name("email"), "E-mail");
        assert_eq!(auth_name("custom"), "Custom");
    }
}

//! Contexto de un intento de autenticación.
//!
//! El `Context` es el estado mutable que el motor enhebra por los steps de un
//! intento. Es serializable: al suspender, el motor lo congela dentro de un
//! `Partial` y lo restaura idéntico al reanudar, posiblemente en otro proceso.
//! Los steps no lo mutan directamente: devuelven un `ContextUpdate` que el
//! motor fusiona (campo presente gana, campo ausente no toca nada).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Campos de perfil reportados por el proveedor. Sólo están presentes los que
/// el proveedor realmente entregó.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Acción de la tubería: activación normal o restablecimiento de contraseña.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    Activation,
    Reset,
}

/// Parámetros gestionados por el motor, sembrados por el step `store_params`.
/// Invariante: una vez fijado `registering_user`, debe coincidir con el
/// usuario autenticado de la sesión por el resto del flujo (`ensure_valid`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowParams {
    pub action: FlowAction,
    pub registering_user: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub attempt_id: Uuid,
    /// Identificador del backend/proveedor que inició el intento.
    pub backend: String,
    /// Id externo del usuario en el proveedor.
    pub uid: String,
    pub details: ProfileDetails,
    /// Cuenta local ya ligada, si existe.
    pub user: Option<Uuid>,
    /// Vínculo social, una vez creado o resuelto.
    pub social: Option<Uuid>,
    pub is_new: bool,
    pub new_association: bool,
    pub params: Option<FlowParams>,
    /// Identidades en proceso de desconexión (vacío en flujos de alta).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<Uuid>,
}

impl Context {
    /// Contexto fresco para un intento de login/registro/conexión.
    pub fn new(backend: &str, uid: &str, details: ProfileDetails) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            backend: backend.to_string(),
            uid: uid.to_string(),
            details,
            user: None,
            social: None,
            is_new: false,
            new_association: false,
            params: None,
            entries: Vec::new(),
        }
    }

    /// Contexto para el flujo de desconexión de identidades.
    pub fn disconnect(backend: &str, user: Uuid, entries: Vec<Uuid>) -> Self {
        let mut ctx = Self::new(backend, "", ProfileDetails::default());
        ctx.user = Some(user);
        ctx.entries = entries;
        ctx
    }

    /// Fusiona la actualización parcial devuelta por un step.
    pub fn apply(&mut self, update: ContextUpdate) {
        if let Some(user) = update.user {
            self.user = Some(user);
        }
        if let Some(social) = update.social {
            self.social = Some(social);
        }
        if let Some(is_new) = update.is_new {
            self.is_new = is_new;
        }
        if let Some(new_association) = update.new_association {
            self.new_association = new_association;
        }
        if let Some(email) = update.email {
            self.details.email = Some(email);
        }
        if let Some(username) = update.username {
            self.details.username = Some(username);
        }
        if let Some(params) = update.params {
            self.params = Some(params);
        }
    }
}

/// Actualización parcial de `Context`. Sólo los campos `Some` se fusionan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextUpdate {
    pub user: Option<Uuid>,
    pub social: Option<Uuid>,
    pub is_new: Option<bool>,
    pub new_association: Option<bool>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub params: Option<FlowParams>,
}

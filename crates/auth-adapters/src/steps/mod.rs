//! Biblioteca de steps de la tubería de autenticación social.
//!
//! Cada step implementa el contrato de `auth_core::Step` con sus propias
//! guardas; el orden total lo fija `default_auth_pipeline`. La reanudación es
//! segura porque `store_params` precede a todo lector de `Context.params` y
//! el step que suspendió vuelve a correr con el código ya verificado.

mod account;
mod disconnect;
mod email;
mod gate;
mod social;

use std::sync::Arc;

use auth_core::PipelineDefinition;

use crate::services::Services;

pub use account::{CleanUsername, CreateUser, PasswordReset, UserFullName, VerifyUsername};
pub use disconnect::{AdjustPrimaryMail, NotifyDisconnect};
pub use email::{send_validation, MailValidation, RequireEmail, RevokeMailCode, StoreEmail};
pub use gate::{CleanupNext, CycleSession, EnsureValid, StoreParams, VerifyOpen};
pub use social::{AssociateUser, NotifyConnect, SocialUser};

/// Usuario con el que arrancó el handshake con el proveedor; `verify_open`
/// exige que la sesión siga perteneciendo a ese usuario.
pub const SESSION_SOCIAL_AUTH_USER: &str = "social_auth_user";
/// Bandera de sesión: este intento es un restablecimiento de contraseña.
pub const SESSION_PASSWORD_RESET: &str = "password_reset";
/// Destino post-login pendiente, saneado por `cleanup_next`.
pub const SESSION_NEXT: &str = "next";
/// Marcador de que ya se despachó el correo de confirmación.
pub const SESSION_EMAIL_SENT: &str = "registration-email-sent";
/// Dirección en espera de confirmación, consumida al validar el código.
pub const SESSION_EMAIL_VALIDATION_ADDRESS: &str = "email_validation_address";

/// Tubería de login/registro/conexión en su orden total declarado.
pub fn default_auth_pipeline(svc: &Arc<Services>) -> PipelineDefinition {
    PipelineDefinition::new(vec![
        Box::new(SocialUser::new(Arc::clone(svc))),
        Box::new(StoreParams::new(Arc::clone(svc))),
        Box::new(VerifyOpen::new(Arc::clone(svc))),
        Box::new(CleanUsername),
        Box::new(RequireEmail::new(Arc::clone(svc))),
        Box::new(MailValidation::new(Arc::clone(svc))),
        Box::new(RevokeMailCode::new(Arc::clone(svc))),
        Box::new(EnsureValid),
        Box::new(VerifyUsername::new(Arc::clone(svc))),
        Box::new(CreateUser::new(Arc::clone(svc))),
        Box::new(AssociateUser::new(Arc::clone(svc))),
        Box::new(UserFullName::new(Arc::clone(svc))),
        Box::new(StoreEmail::new(Arc::clone(svc))),
        Box::new(NotifyConnect::new(Arc::clone(svc))),
        Box::new(PasswordReset::new(Arc::clone(svc))),
        Box::new(CycleSession),
        Box::new(CleanupNext::new(Arc::clone(svc))),
    ])
}

/// Tubería de desconexión. Corre mientras los vínculos todavía existen; el
/// llamador los elimina del registro después de un `Completed`.
pub fn disconnect_pipeline(svc: &Arc<Services>) -> PipelineDefinition {
    PipelineDefinition::new(vec![
        Box::new(AdjustPrimaryMail::new(Arc::clone(svc))),
        Box::new(NotifyDisconnect::new(Arc::clone(svc))),
    ])
}

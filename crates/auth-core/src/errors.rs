//! Errores clasificados de la tubería.
//!
//! Cada variante de negocio lleva el backend que originó el intento; el step
//! donde ocurrió viaja en `Outcome::Aborted`. El motor nunca reinterpreta ni
//! reintenta: el primer error abortó el intento y se entrega tal cual al
//! llamador, que decide mensaje localizado y página destino.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowError {
    #[error("new registrations are disabled")]
    RegistrationClosed { backend: String },
    #[error("authentication for the demo account cannot be changed")]
    DemoAccountLocked { backend: String },
    #[error("session does not belong to the user that started this flow")]
    SessionUserMismatch { backend: String },
    #[error("this username is already taken, please choose another")]
    AuthAlreadyAssociated { backend: String },
    #[error("could not verify the email address")]
    InvalidEmail { backend: String },
    #[error("no email address was supplied")]
    MissingEmail { backend: String },
    #[error("the confirmation link has expired")]
    LinkExpired { backend: String },
    #[error("no pending attempt matches this token")]
    PartialNotFound,
    #[error("internal: {0}")]
    Internal(String),
}

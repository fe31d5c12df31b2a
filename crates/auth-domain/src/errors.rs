//! Errores del dominio (simples por ahora).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("username already taken: {0}")]
    UsernameTaken(String),
    #[error("identity already linked: {0}/{1}")]
    IdentityTaken(String, String),
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    External(String),
}

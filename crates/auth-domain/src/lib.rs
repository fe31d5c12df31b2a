//! auth-domain: cuentas locales, identidades sociales y correos verificados.
//!
//! Este crate define los tipos de dominio que la tubería de autenticación lee
//! y escribe, junto con los contratos de almacenamiento (`AccountStore`,
//! `IdentityStore`, `VerifiedEmailStore`) y los colaboradores externos
//! (notificador, verificación de redirects, consulta secundaria de correos).
//! El core sólo conoce estos traits; las implementaciones in-memory viven al
//! lado de cada contrato para tests y para el binario de demostración.
pub mod account;
pub mod collaborators;
pub mod errors;
pub mod social;
pub mod username;

pub use account::{AccountStore, InMemoryAccountStore, User};
pub use collaborators::{EmailEntry, Notifier, RedirectChecker, SecondaryEmailFetcher};
pub use errors::DomainError;
pub use social::{
    IdentityStore, InMemoryIdentityStore, InMemoryVerifiedEmailStore, SocialIdentity, VerifiedEmail, VerifiedEmailStore,
};
pub use username::slugify_username;

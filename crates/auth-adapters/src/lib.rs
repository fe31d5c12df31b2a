//! auth-adapters: biblioteca de steps y colaboradores concretos.
//!
//! Une el motor de `auth_core` con el dominio de `auth_domain`: los steps de
//! la tubería por defecto, la configuración por backend y del deployment, y
//! las implementaciones in-memory de los colaboradores externos con las que
//! corren los tests y el binario de demostración.
pub mod backend;
pub mod config;
pub mod providers;
pub mod services;
pub mod steps;

pub use backend::{auth_name, default_backends, BackendConfig, BackendRegistry};
pub use config::AuthSettings;
pub use providers::{ActivityRecord, AllowedHostsChecker, MemoryNotifier, SentEmail, StaticEmailFetcher};
pub use services::{MemoryServices, Services};
pub use steps::{default_auth_pipeline, disconnect_pipeline};

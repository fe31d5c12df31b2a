//! Códigos de verificación de correo, de un solo uso.
//!
//! Cada código queda ligado a un correo y al token del checkpoint que lo
//! originó. El ciclo de vida es emitir → reclamar (marca `verified`, una sola
//! vez) → revocar (borrado del registro verificado). Reclamo y revocación son
//! operaciones atómicas del store, nunca leer-y-luego-borrar.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCode {
    pub code: String,
    pub email: String,
    pub partial_token: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Almacenamiento de códigos pendientes.
pub trait CodeStore: Send + Sync {
    /// Emite un código fresco para (correo, token de checkpoint). Los códigos
    /// sin reclamar del mismo par quedan supersedidos (se eliminan).
    fn issue(&self, email: &str, partial_token: &str) -> VerificationCode;

    /// Reclamo atómico: si existe un código sin verificar que coincida con
    /// (código, token), lo marca verificado y devuelve su correo. Un código ya
    /// reclamado no puede reclamarse otra vez.
    fn claim(&self, code: &str, partial_token: &str) -> Option<String>;

    /// ¿Existe un registro verificado para (correo, código)?
    fn check_verified(&self, email: &str, code: &str) -> bool;

    /// Extracción atómica del registro verificado (revocación); `None` si no
    /// existe.
    fn take_verified(&self, email: &str, code: &str) -> Option<VerificationCode>;
}

pub struct InMemoryCodeStore {
    inner: Mutex<Vec<VerificationCode>>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Vec::new()) }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("code store poisoned").len()
    }

    /// Último código emitido para un correo (tests / demo, en lugar de leer
    /// el buzón).
    pub fn latest_for(&self, email: &str) -> Option<VerificationCode> {
        let inner = self.inner.lock().expect("code store poisoned");
        inner.iter().rev().find(|c| c.email == email).cloned()
    }
}

impl Default for InMemoryCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeStore for InMemoryCodeStore {
    fn issue(&self, email: &str, partial_token: &str) -> VerificationCode {
        let mut inner = self.inner.lock().expect("code store poisoned");
        inner.retain(|c| c.verified || c.email != email || c.partial_token != partial_token);
        let fresh = VerificationCode {
            code: Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            partial_token: partial_token.to_string(),
            verified: false,
            created_at: Utc::now(),
        };
        inner.push(fresh.clone());
        fresh
    }

    fn claim(&self, code: &str, partial_token: &str) -> Option<String> {
        let mut inner = self.inner.lock().expect("code store poisoned");
        let found = inner
            .iter_mut()
            .find(|c| !c.verified && c.code == code && c.partial_token == partial_token)?;
        found.verified = true;
        Some(found.email.clone())
    }

    fn check_verified(&self, email: &str, code: &str) -> bool {
        let inner = self.inner.lock().expect("code store poisoned");
        inner.iter().any(|c| c.verified && c.email == email && c.code == code)
    }

    fn take_verified(&self, email: &str, code: &str) -> Option<VerificationCode> {
        let mut inner = self.inner.lock().expect("code store poisoned");
        let at = inner.iter().position(|c| c.verified && c.email == email && c.code == code)?;
        Some(inner.remove(at))
    }
}

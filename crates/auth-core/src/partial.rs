//! Checkpoint durable de una tubería suspendida.
//!
//! Un `Partial` captura el índice del próximo step a correr y la instantánea
//! serializada del `Context`. Es de un solo uso: `take` lo reclama
//! atómicamente, de modo que reanudar dos veces con el mismo token falla la
//! segunda vez. La expiración del flujo no vive aquí sino en
//! `Context.params.expires_at`, chequeada por el step de validez del enlace.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partial {
    /// Token opaco y único del checkpoint.
    pub token: String,
    /// Índice del step que debe correr al reanudar.
    pub next_index: usize,
    /// Instantánea serializada del `Context`.
    pub snapshot: Value,
    pub created_at: DateTime<Utc>,
}

/// Almacenamiento de checkpoints.
pub trait PartialStore: Send + Sync {
    fn put(&self, partial: Partial);

    /// Lectura sin consumir.
    fn peek(&self, token: &str) -> Option<Partial>;

    /// Reclamo atómico de un solo uso: el segundo `take` del mismo token
    /// devuelve `None`.
    fn take(&self, token: &str) -> Option<Partial>;
}

pub struct InMemoryPartialStore {
    inner: Mutex<HashMap<String, Partial>>,
}

impl InMemoryPartialStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("partial store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryPartialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialStore for InMemoryPartialStore {
    fn put(&self, partial: Partial) {
        let mut inner = self.inner.lock().expect("partial store poisoned");
        inner.insert(partial.token.clone(), partial);
    }

    fn peek(&self, token: &str) -> Option<Partial> {
        self.inner.lock().expect("partial store poisoned").get(token).cloned()
    }

    fn take(&self, token: &str) -> Option<Partial> {
        self.inner.lock().expect("partial store poisoned").remove(token)
    }
}

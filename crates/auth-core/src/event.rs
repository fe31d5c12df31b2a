//! Bitácora de eventos por intento.
//!
//! Cada ejecución del motor registra eventos en un `AttemptLog` append-only:
//! arranque, inicio/fin de cada step, suspensión, falla y cierre. La bitácora
//! no participa en la semántica del flujo; es el rastro observable que los
//! tests y el llamador pueden inspeccionar.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FlowError;

/// Tipos de evento emitidos por el motor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowEventKind {
    /// Arranque de un intento (fresco o reanudado desde `start_index`).
    AttemptStarted { backend: String, start_index: usize },
    StepStarted { step_index: usize, step_id: String },
    StepFinished { step_index: usize, step_id: String },
    /// El step suspendió el flujo; el checkpoint quedó persistido.
    StepSuspended { step_index: usize, step_id: String, redirect: String },
    /// El step abortó el intento con un error clasificado.
    StepFailed { step_index: usize, step_id: String, error: FlowError },
    AttemptCompleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    pub seq: u64,
    pub attempt_id: Uuid,
    pub kind: FlowEventKind,
    pub ts: DateTime<Utc>,
}

/// Bitácora append-only de eventos de intento.
pub trait AttemptLog: Send + Sync {
    fn append_kind(&self, attempt_id: Uuid, kind: FlowEventKind) -> FlowEvent;

    /// Eventos de un intento en orden ascendente por `seq`.
    fn list(&self, attempt_id: Uuid) -> Vec<FlowEvent>;
}

pub struct InMemoryAttemptLog {
    inner: Mutex<HashMap<Uuid, Vec<FlowEvent>>>,
}

impl InMemoryAttemptLog {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }
}

impl Default for InMemoryAttemptLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptLog for InMemoryAttemptLog {
    fn append_kind(&self, attempt_id: Uuid, kind: FlowEventKind) -> FlowEvent {
        let mut inner = self.inner.lock().expect("attempt log poisoned");
        let events = inner.entry(attempt_id).or_default();
        let ev = FlowEvent { seq: events.len() as u64, attempt_id, kind, ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, attempt_id: Uuid) -> Vec<FlowEvent> {
        self.inner.lock().expect("attempt log poisoned").get(&attempt_id).cloned().unwrap_or_default()
    }
}

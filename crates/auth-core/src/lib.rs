//! auth-core: motor determinista de tuberías de autenticación social.
//!
//! Expone el contrato de step (`Step`, `StepRun`), el contexto serializable
//! del intento, el scope explícito de la petición, los stores durables que el
//! motor necesita (checkpoints y códigos de verificación) y el motor mismo
//! (`PipelineEngine`) con su bitácora de eventos.
pub mod code;
pub mod engine;
pub mod errors;
pub mod event;
pub mod model;
pub mod partial;
pub mod scope;
pub mod step;

pub use code::{CodeStore, InMemoryCodeStore, VerificationCode};
pub use engine::{Outcome, PipelineEngine, RESUME_STAGE};
pub use errors::FlowError;
pub use event::{AttemptLog, FlowEvent, FlowEventKind, InMemoryAttemptLog};
pub use model::{Context, ContextUpdate, FlowAction, FlowParams, ProfileDetails};
pub use partial::{InMemoryPartialStore, Partial, PartialStore};
pub use scope::{RequestScope, Session};
pub use step::{PipelineDefinition, Step, StepRun};

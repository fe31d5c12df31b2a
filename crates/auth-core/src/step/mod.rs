//! Contrato que debe honrar todo step de la tubería.
//!
//! Un step es una unidad con guardas propias que lee el `Context` y el
//! `RequestScope` y decide exactamente una de tres cosas:
//! - `Continue`: sigue el flujo, opcionalmente con una actualización parcial
//!   que el motor fusiona en el contexto;
//! - `Suspend`: detiene el flujo con un redirect; el motor congela el
//!   contexto en un `Partial` y el MISMO step vuelve a correr al reanudar;
//! - `Abort`: termina el intento con un error clasificado.

mod definition;

pub use definition::{PipelineDefinition, Step, StepRun};

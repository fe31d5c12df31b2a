mod core;

pub use core::{Outcome, PipelineEngine, RESUME_STAGE};

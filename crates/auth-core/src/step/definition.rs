use crate::errors::FlowError;
use crate::model::{Context, ContextUpdate};
use crate::scope::RequestScope;

/// Resultado de ejecutar un step.
pub enum StepRun {
    Continue(ContextUpdate),
    Suspend { redirect: String },
    Abort(FlowError),
}

impl StepRun {
    /// Continuar sin tocar el contexto.
    pub fn done() -> Self {
        StepRun::Continue(ContextUpdate::default())
    }
}

/// Trait que define un step. Las implementaciones deben ser deterministas
/// respecto a contexto + scope + su configuración estática; ningún step puede
/// saltarse por nada que no sea su propia lógica de guarda.
pub trait Step: Send + Sync {
    /// Identificador estable y único dentro de la tubería.
    fn id(&self) -> &'static str;

    /// Ejecuta el step contra el intento en curso.
    fn execute(&self, ctx: &Context, scope: &mut RequestScope) -> StepRun;
}

/// Definición inmutable de una tubería: steps en orden total declarado.
pub struct PipelineDefinition {
    steps: Vec<Box<dyn Step>>,
}

impl PipelineDefinition {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Índice del step con el id dado, si está en la definición.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id() == id)
    }
}

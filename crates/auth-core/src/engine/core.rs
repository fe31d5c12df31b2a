//! Core PipelineEngine implementation
//!
//! El motor recorre los steps de una definición en orden total declarado,
//! fusiona las actualizaciones parciales en el contexto y materializa la
//! suspensión como un checkpoint durable (`Partial`). Reanudar es restaurar
//! la instantánea y continuar en el índice guardado; no hay corrutinas ni
//! hilos de fondo, el "yield" es serializar y devolver un token.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::code::CodeStore;
use crate::errors::FlowError;
use crate::event::{AttemptLog, FlowEvent, FlowEventKind};
use crate::model::Context;
use crate::partial::{Partial, PartialStore};
use crate::scope::RequestScope;
use crate::step::{PipelineDefinition, StepRun};

/// Pseudo-identificador de step para fallas propias de la reanudación, antes
/// de que corra ningún step real.
pub const RESUME_STAGE: &str = "resume";

/// Desenlace de un intento.
#[derive(Debug)]
pub enum Outcome {
    /// La tubería llegó al final; el contexto refleja todas las mutaciones.
    Completed(Box<Context>),
    /// Un step suspendió el flujo; reanudar con el token + código verificado.
    Suspended { partial_token: String, redirect: String },
    /// Un step abortó. Las mutaciones ya aplicadas quedan en pie: no hay
    /// rollback, el llamador debe tratarlas como confirmadas.
    Aborted { step_id: String, error: FlowError },
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// Motor de ejecución de tuberías de autenticación.
///
/// Genérico sobre los stores durables que necesita: checkpoints y códigos de
/// verificación. Los steps reciben sus propios colaboradores por construcción;
/// el motor sólo toca estos dos.
pub struct PipelineEngine<P, C, L>
where
    P: PartialStore,
    C: CodeStore,
    L: AttemptLog,
{
    partials: Arc<P>,
    codes: Arc<C>,
    log: Arc<L>,
}

impl<P, C, L> PipelineEngine<P, C, L>
where
    P: PartialStore,
    C: CodeStore,
    L: AttemptLog,
{
    pub fn new(partials: Arc<P>, codes: Arc<C>, log: Arc<L>) -> Self {
        Self { partials, codes, log }
    }

    /// Eventos registrados para un intento.
    pub fn events(&self, attempt_id: Uuid) -> Vec<FlowEvent> {
        self.log.list(attempt_id)
    }

    /// Corre un intento fresco desde el primer step.
    ///
    /// El token del checkpoint se reserva antes de ejecutar nada, de modo que
    /// un step que emita códigos de verificación pueda etiquetarlos con el
    /// token del `Partial` que el motor escribirá si ese step suspende.
    pub fn run(&self, definition: &PipelineDefinition, ctx: Context, scope: &mut RequestScope) -> Outcome {
        scope.set_partial_token(Uuid::new_v4().simple().to_string());
        self.run_from(definition, ctx, scope, 0)
    }

    /// Reanuda una tubería suspendida a partir de (token, código).
    ///
    /// Orden del protocolo:
    /// 1. localizar el checkpoint (token desconocido o ya consumido →
    ///    `PartialNotFound`);
    /// 2. reclamar atómicamente el código emitido bajo ese token, marcándolo
    ///    verificado (código equivocado → `InvalidEmail`, el checkpoint queda
    ///    en pie para poder presentar el código correcto);
    /// 3. consumir el checkpoint — exactamente un reanudador concurrente gana;
    /// 4. restaurar el contexto e inyectar el código en los datos de la
    ///    petición, y continuar en el índice guardado. El step que suspendió
    ///    vuelve a correr y revalida el código ya verificado.
    pub fn resume(
        &self,
        definition: &PipelineDefinition,
        partial_token: &str,
        verification_code: &str,
        scope: &mut RequestScope,
    ) -> Outcome {
        let Some(partial) = self.partials.peek(partial_token) else {
            return Outcome::Aborted { step_id: RESUME_STAGE.to_string(), error: FlowError::PartialNotFound };
        };

        let ctx: Context = match serde_json::from_value(partial.snapshot.clone()) {
            Ok(ctx) => ctx,
            Err(err) => {
                return Outcome::Aborted {
                    step_id: RESUME_STAGE.to_string(),
                    error: FlowError::Internal(format!("context snapshot: {err}")),
                }
            }
        };

        if self.codes.claim(verification_code, partial_token).is_none() {
            log::warn!("attempt {}: resume with non-matching code", ctx.attempt_id);
            return Outcome::Aborted {
                step_id: RESUME_STAGE.to_string(),
                error: FlowError::InvalidEmail { backend: ctx.backend.clone() },
            };
        }

        if self.partials.take(partial_token).is_none() {
            // Otro reanudador consumió el checkpoint entre peek y take.
            return Outcome::Aborted { step_id: RESUME_STAGE.to_string(), error: FlowError::PartialNotFound };
        }

        scope.set_partial_token(partial_token.to_string());
        scope.set_request_param("verification_code", verification_code);
        self.run_from(definition, ctx, scope, partial.next_index)
    }

    fn run_from(
        &self,
        definition: &PipelineDefinition,
        mut ctx: Context,
        scope: &mut RequestScope,
        start: usize,
    ) -> Outcome {
        let attempt_id = ctx.attempt_id;
        self.log.append_kind(
            attempt_id,
            FlowEventKind::AttemptStarted { backend: ctx.backend.clone(), start_index: start },
        );

        for (step_index, step) in definition.steps().iter().enumerate().skip(start) {
            log::debug!("attempt {attempt_id}: step {step_index} ({})", step.id());
            self.log.append_kind(
                attempt_id,
                FlowEventKind::StepStarted { step_index, step_id: step.id().to_string() },
            );

            match step.execute(&ctx, scope) {
                StepRun::Continue(update) => {
                    ctx.apply(update);
                    self.log.append_kind(
                        attempt_id,
                        FlowEventKind::StepFinished { step_index, step_id: step.id().to_string() },
                    );
                }
                StepRun::Suspend { redirect } => {
                    let Some(token) = scope.partial_token().map(str::to_string) else {
                        return Outcome::Aborted {
                            step_id: step.id().to_string(),
                            error: FlowError::Internal("partial token not allocated".into()),
                        };
                    };
                    let snapshot = match serde_json::to_value(&ctx) {
                        Ok(snapshot) => snapshot,
                        Err(err) => {
                            return Outcome::Aborted {
                                step_id: step.id().to_string(),
                                error: FlowError::Internal(format!("context snapshot: {err}")),
                            }
                        }
                    };
                    self.partials.put(Partial {
                        token: token.clone(),
                        next_index: step_index,
                        snapshot,
                        created_at: Utc::now(),
                    });
                    self.log.append_kind(
                        attempt_id,
                        FlowEventKind::StepSuspended {
                            step_index,
                            step_id: step.id().to_string(),
                            redirect: redirect.clone(),
                        },
                    );
                    log::debug!("attempt {attempt_id}: suspended at {} -> {redirect}", step.id());
                    return Outcome::Suspended { partial_token: token, redirect };
                }
                StepRun::Abort(error) => {
                    self.log.append_kind(
                        attempt_id,
                        FlowEventKind::StepFailed {
                            step_index,
                            step_id: step.id().to_string(),
                            error: error.clone(),
                        },
                    );
                    log::warn!("attempt {attempt_id}: aborted at {}: {error}", step.id());
                    return Outcome::Aborted { step_id: step.id().to_string(), error };
                }
            }
        }

        self.log.append_kind(attempt_id, FlowEventKind::AttemptCompleted);
        Outcome::Completed(Box::new(ctx))
    }
}

//! Resolución y alta del vínculo social.

use std::sync::Arc;

use auth_core::{Context, ContextUpdate, FlowError, RequestScope, Step, StepRun};
use auth_domain::{DomainError, IdentityStore, Notifier};

use crate::backend::auth_name;
use crate::services::Services;

/// Resuelve (backend, uid) contra el registro de identidades.
///
/// Si el vínculo existe y apunta a OTRA cuenta que la ya autenticada, el
/// intento se aborta: conectar una identidad ajena sería una toma de cuenta.
pub struct SocialUser {
    svc: Arc<Services>,
}

impl SocialUser {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for SocialUser {
    fn id(&self) -> &'static str {
        "social_user"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        let mut update = ContextUpdate::default();
        match self.svc.identities.find(&ctx.backend, &ctx.uid) {
            Some(social) => {
                if let Some(current) = ctx.user {
                    if current != social.user {
                        return StepRun::Abort(FlowError::AuthAlreadyAssociated { backend: ctx.backend.clone() });
                    }
                }
                update.user = Some(social.user);
                update.social = Some(social.id);
                update.is_new = Some(false);
                update.new_association = Some(false);
            }
            None => {
                update.is_new = Some(ctx.user.is_none());
            }
        }
        StepRun::Continue(update)
    }
}

/// Crea el vínculo (backend, uid) → cuenta si todavía no existe.
pub struct AssociateUser {
    svc: Arc<Services>,
}

impl AssociateUser {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for AssociateUser {
    fn id(&self) -> &'static str {
        "associate_user"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        if ctx.social.is_some() {
            return StepRun::done();
        }
        let Some(user) = ctx.user else {
            return StepRun::Abort(FlowError::Internal("associate_user requires a bound user".into()));
        };
        if ctx.uid.is_empty() {
            return StepRun::Abort(FlowError::Internal("provider uid missing".into()));
        }
        match self.svc.identities.link(&ctx.backend, &ctx.uid, user) {
            Ok(social) => StepRun::Continue(ContextUpdate {
                social: Some(social.id),
                new_association: Some(true),
                ..Default::default()
            }),
            Err(DomainError::IdentityTaken(_, _)) => {
                StepRun::Abort(FlowError::AuthAlreadyAssociated { backend: ctx.backend.clone() })
            }
            Err(err) => StepRun::Abort(FlowError::Internal(err.to_string())),
        }
    }
}

/// Notifica la conexión de un proveedor nuevo a una cuenta ya existente.
pub struct NotifyConnect {
    svc: Arc<Services>,
}

impl NotifyConnect {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for NotifyConnect {
    fn id(&self) -> &'static str {
        "notify_connect"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        if ctx.new_association && !ctx.is_new {
            if let (Some(user), Some(social_id)) = (ctx.user, ctx.social) {
                let name = self.svc.identities.get(social_id).map(|s| s.uid).unwrap_or_default();
                self.svc.notifier.notify_account_activity(user, "auth-connect", &auth_name(&ctx.backend), &name);
            }
        }
        StepRun::done()
    }
}

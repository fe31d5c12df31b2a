//! Steps del flujo de desconexión de identidades.
//!
//! Corren ANTES de borrar los vínculos: `Context.entries` lista las
//! identidades por desconectar y los steps las excluyen de sus consultas.

use std::sync::Arc;

use auth_core::{Context, FlowError, RequestScope, Step, StepRun};
use auth_domain::{AccountStore, IdentityStore, Notifier, VerifiedEmail, VerifiedEmailStore};

use crate::backend::auth_name;
use crate::services::Services;

/// Reasigna el correo primario si deja de estar respaldado por una identidad.
pub struct AdjustPrimaryMail {
    svc: Arc<Services>,
}

impl AdjustPrimaryMail {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for AdjustPrimaryMail {
    fn id(&self) -> &'static str {
        "adjust_primary_mail"
    }

    fn execute(&self, ctx: &Context, scope: &mut RequestScope) -> StepRun {
        let Some(user_id) = ctx.user else {
            return StepRun::done();
        };
        let Some(user) = self.svc.accounts.get(user_id) else {
            return StepRun::done();
        };

        let mut remaining: Vec<VerifiedEmail> = self
            .svc
            .identities
            .for_user(user_id)
            .into_iter()
            .filter(|social| !ctx.entries.contains(&social.id))
            .filter_map(|social| self.svc.verified_emails.get(social.id))
            .collect();

        if remaining.iter().any(|verified| verified.email == user.email) {
            return StepRun::done();
        }

        // Desempate estable: registro verificado más antiguo, luego por
        // dirección.
        remaining.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        let Some(next_mail) = remaining.first() else {
            return StepRun::done();
        };

        if let Err(err) = self.svc.accounts.set_email(user_id, &next_mail.email) {
            return StepRun::Abort(FlowError::Internal(err.to_string()));
        }
        scope.add_warning(format!(
            "Your email no longer belongs to a verified account, it has been changed to {}.",
            next_mail.email
        ));
        StepRun::done()
    }
}

/// Notifica la desconexión de cada identidad.
pub struct NotifyDisconnect {
    svc: Arc<Services>,
}

impl NotifyDisconnect {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for NotifyDisconnect {
    fn id(&self) -> &'static str {
        "notify_disconnect"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        let Some(user_id) = ctx.user else {
            return StepRun::done();
        };
        for social_id in &ctx.entries {
            if let Some(social) = self.svc.identities.get(*social_id) {
                self.svc.notifier.notify_account_activity(
                    user_id,
                    "auth-disconnect",
                    &auth_name(&ctx.backend),
                    &social.uid,
                );
            }
        }
        StepRun::done()
    }
}

//! Steps sobre la cuenta local: username, alta, nombre visible y reset.

use std::sync::Arc;

use auth_core::{Context, ContextUpdate, FlowAction, FlowError, RequestScope, Step, StepRun};
use auth_domain::{slugify_username, AccountStore, DomainError, IdentityStore, Notifier};

use crate::backend::auth_name;
use crate::services::Services;

/// Normaliza el username propuesto antes de cualquier chequeo de colisión.
///
/// Sin username del proveedor se cae a la parte local del correo; si nada
/// sobrevive a la normalización se genera un identificador.
pub struct CleanUsername;

impl Step for CleanUsername {
    fn id(&self) -> &'static str {
        "clean_username"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        if ctx.user.is_some() {
            return StepRun::done();
        }
        let raw = ctx
            .details
            .username
            .clone()
            .or_else(|| ctx.details.email.as_deref().map(|e| e.split('@').next().unwrap_or_default().to_string()));
        let slug = raw.map(|r| slugify_username(&r)).unwrap_or_default();
        let username = if slug.is_empty() {
            let tail: String = ctx.attempt_id.simple().to_string().chars().take(8).collect();
            format!("user-{tail}")
        } else {
            slug
        };
        StepRun::Continue(ContextUpdate { username: Some(username), ..Default::default() })
    }
}

/// Pre-chequeo de colisión de username, ignorando mayúsculas.
///
/// Es consultivo: la garantía real contra dos registros concurrentes es la
/// unicidad atómica de `AccountStore::create_user`.
pub struct VerifyUsername {
    svc: Arc<Services>,
}

impl VerifyUsername {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for VerifyUsername {
    fn id(&self) -> &'static str {
        "verify_username"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        if ctx.user.is_some() {
            return StepRun::done();
        }
        let Some(username) = ctx.details.username.as_deref() else {
            return StepRun::done();
        };
        if self.svc.accounts.find_by_username_ci(username).is_some() {
            return StepRun::Abort(FlowError::AuthAlreadyAssociated { backend: ctx.backend.clone() });
        }
        StepRun::done()
    }
}

/// Alta de la cuenta nueva a través del store (punto de serialización real).
pub struct CreateUser {
    svc: Arc<Services>,
}

impl CreateUser {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for CreateUser {
    fn id(&self) -> &'static str {
        "create_user"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        if ctx.user.is_some() {
            return StepRun::done();
        }
        let Some(username) = ctx.details.username.as_deref() else {
            return StepRun::Abort(FlowError::Internal("create_user requires a username".into()));
        };
        let email = ctx.details.email.clone().unwrap_or_default();
        match self.svc.accounts.create_user(username, &email) {
            Ok(user) => {
                StepRun::Continue(ContextUpdate { user: Some(user.id), is_new: Some(true), ..Default::default() })
            }
            Err(DomainError::UsernameTaken(_)) => {
                StepRun::Abort(FlowError::AuthAlreadyAssociated { backend: ctx.backend.clone() })
            }
            Err(err) => StepRun::Abort(FlowError::Internal(err.to_string())),
        }
    }
}

/// Deriva el nombre visible desde los datos del proveedor.
///
/// Preferencia: nombre completo explícito; si no, nombre + apellido, tirando
/// el nombre cuando ya viene contenido en el apellido (proveedores que meten
/// todo en "last name"). Se recorta al límite del store y sólo se escribe si
/// cambió y no quedó vacío.
pub struct UserFullName {
    svc: Arc<Services>,
}

impl UserFullName {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for UserFullName {
    fn id(&self) -> &'static str {
        "user_full_name"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        let Some(user_id) = ctx.user else {
            return StepRun::done();
        };
        let details = &ctx.details;

        let mut full_name = details.full_name.clone().unwrap_or_default().trim().to_string();
        if full_name.is_empty() && (details.first_name.is_some() || details.last_name.is_some()) {
            let first = details.first_name.clone().unwrap_or_default();
            let last = details.last_name.clone().unwrap_or_default();
            // Un nombre ya contenido en el apellido no se concatena
            // (proveedores que duplican el nombre completo en ambos campos).
            full_name = if !first.is_empty() && !last.contains(&first) {
                format!("{first} {last}")
            } else if !first.is_empty() {
                first
            } else {
                last
            };
        }

        let limit = self.svc.accounts.first_name_max_length();
        let full_name: String = full_name.trim().chars().take(limit).collect();
        if full_name.is_empty() {
            return StepRun::done();
        }

        if let Some(user) = self.svc.accounts.get(user_id) {
            if user.first_name != full_name {
                if let Err(err) = self.svc.accounts.update_first_name(user_id, &full_name) {
                    return StepRun::Abort(FlowError::Internal(err.to_string()));
                }
            }
        }
        StepRun::done()
    }
}

/// Cierra el flujo de restablecimiento: contraseña inutilizable + aviso.
pub struct PasswordReset {
    svc: Arc<Services>,
}

impl PasswordReset {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for PasswordReset {
    fn id(&self) -> &'static str {
        "password_reset"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        let is_reset = ctx.params.as_ref().map(|p| p.action) == Some(FlowAction::Reset);
        let Some(user_id) = ctx.user else {
            return StepRun::done();
        };
        if !is_reset {
            return StepRun::done();
        }
        if let Err(err) = self.svc.accounts.set_unusable_password(user_id) {
            return StepRun::Abort(FlowError::Internal(err.to_string()));
        }
        let name = ctx
            .social
            .and_then(|id| self.svc.identities.get(id))
            .map(|s| s.uid)
            .unwrap_or_else(|| ctx.uid.clone());
        self.svc.notifier.notify_account_activity(user_id, "reset", &auth_name(&ctx.backend), &name);
        StepRun::done()
    }
}

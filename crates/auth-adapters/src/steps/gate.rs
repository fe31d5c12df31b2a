//! Steps de guarda y siembra del intento.
//!
//! `store_params` debe correr antes que cualquier step que lea
//! `Context.params`; `verify_open` y `ensure_valid` hacen cumplir las
//! invariantes de seguridad del flujo (registro abierto, cuenta demo, enlace
//! vigente, sesión ligada al usuario que inició el intento).

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use auth_core::{Context, ContextUpdate, FlowAction, FlowError, FlowParams, RequestScope, Step, StepRun};
use auth_domain::{AccountStore, RedirectChecker};

use crate::services::Services;
use crate::steps::{SESSION_NEXT, SESSION_PASSWORD_RESET, SESSION_SOCIAL_AUTH_USER};

/// Siembra `params`: acción del flujo, usuario registrante y expiración.
pub struct StoreParams {
    svc: Arc<Services>,
}

impl StoreParams {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for StoreParams {
    fn id(&self) -> &'static str {
        "store_params"
    }

    fn execute(&self, _ctx: &Context, scope: &mut RequestScope) -> StepRun {
        let action = if scope.session_flag(SESSION_PASSWORD_RESET) {
            FlowAction::Reset
        } else {
            FlowAction::Activation
        };
        let params = FlowParams {
            action,
            registering_user: scope.current_user,
            expires_at: Utc::now() + Duration::seconds(self.svc.settings.auth_token_valid),
        };
        StepRun::Continue(ContextUpdate { params: Some(params), ..Default::default() })
    }
}

/// ¿Puede este intento crear o tocar una cuenta?
pub struct VerifyOpen {
    svc: Arc<Services>,
}

impl VerifyOpen {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for VerifyOpen {
    fn id(&self) -> &'static str {
        "verify_open"
    }

    fn execute(&self, ctx: &Context, scope: &mut RequestScope) -> StepRun {
        let settings = &self.svc.settings;

        if ctx.user.is_none() && !settings.registration_open {
            return StepRun::Abort(FlowError::RegistrationClosed { backend: ctx.backend.clone() });
        }

        if settings.demo_mode {
            if let Some(user) = ctx.user.and_then(|id| self.svc.accounts.get(id)) {
                if user.username == settings.demo_username {
                    return StepRun::Abort(FlowError::DemoAccountLocked { backend: ctx.backend.clone() });
                }
            }
        }

        // La sesión debe seguir perteneciendo al usuario que inició el
        // handshake con el proveedor.
        let recorded = scope
            .session
            .get(SESSION_SOCIAL_AUTH_USER)
            .and_then(|v| v.as_str())
            .and_then(|raw| Uuid::parse_str(raw).ok());
        if scope.current_user != recorded {
            return StepRun::Abort(FlowError::SessionUserMismatch { backend: ctx.backend.clone() });
        }

        StepRun::done()
    }
}

/// ¿Sigue vigente el enlace de activación?
pub struct EnsureValid;

impl Step for EnsureValid {
    fn id(&self) -> &'static str {
        "ensure_valid"
    }

    fn execute(&self, ctx: &Context, scope: &mut RequestScope) -> StepRun {
        let Some(params) = &ctx.params else {
            return StepRun::Abort(FlowError::Internal("store_params must run before ensure_valid".into()));
        };

        if params.expires_at < Utc::now() {
            return StepRun::Abort(FlowError::LinkExpired { backend: ctx.backend.clone() });
        }

        // El restablecimiento de contraseña siempre puede continuar.
        if params.action == FlowAction::Reset {
            return StepRun::done();
        }

        if scope.current_user != params.registering_user {
            return StepRun::Abort(FlowError::SessionUserMismatch { backend: ctx.backend.clone() });
        }

        StepRun::done()
    }
}

/// Limpia el destino post-login si no es un redirect seguro.
pub struct CleanupNext {
    svc: Arc<Services>,
}

impl CleanupNext {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for CleanupNext {
    fn id(&self) -> &'static str {
        "cleanup_next"
    }

    fn execute(&self, _ctx: &Context, scope: &mut RequestScope) -> StepRun {
        let next = scope.session.get(SESSION_NEXT).and_then(|v| v.as_str()).map(str::to_string);
        if let Some(url) = next {
            if !self.svc.redirects.is_safe_redirect(&url) {
                scope.session.pop(SESSION_NEXT);
            }
        }
        StepRun::done()
    }
}

/// Rota la clave de sesión conservando el contenido.
pub struct CycleSession;

impl Step for CycleSession {
    fn id(&self) -> &'static str {
        "cycle_session"
    }

    fn execute(&self, _ctx: &Context, scope: &mut RequestScope) -> StepRun {
        scope.session.cycle_key();
        StepRun::done()
    }
}

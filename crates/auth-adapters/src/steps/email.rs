//! Steps de correo: obtención, validación por código y persistencia.

use std::sync::Arc;

use serde_json::Value;

use auth_core::{CodeStore, Context, ContextUpdate, FlowError, RequestScope, Step, StepRun, VerificationCode};
use auth_domain::{AccountStore, EmailEntry, Notifier, SecondaryEmailFetcher, VerifiedEmailStore};

use crate::services::Services;
use crate::steps::{SESSION_EMAIL_SENT, SESSION_EMAIL_VALIDATION_ADDRESS, SESSION_PASSWORD_RESET};

/// Garantiza que el intento tenga un correo utilizable.
///
/// Para backends con endpoint secundario (p. ej. GitHub) consulta los correos
/// verificados y prefiere el primario; si una cuenta ya ligada tiene correo
/// confirmado no hay nada que pedir (el pseudo-backend "email" es la
/// excepción: fuerza revalidación como si fuera un alta nueva); un alta nueva
/// sin correo suspende con un redirect bloqueante al formulario de registro.
pub struct RequireEmail {
    svc: Arc<Services>,
}

impl RequireEmail {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for RequireEmail {
    fn id(&self) -> &'static str {
        "require_email"
    }

    fn execute(&self, ctx: &Context, scope: &mut RequestScope) -> StepRun {
        let svc = &self.svc;
        let Some(backend) = svc.backends.get(&ctx.backend) else {
            return StepRun::Abort(FlowError::Internal(format!("unknown backend {}", ctx.backend)));
        };
        let mut update = ContextUpdate::default();

        if backend.secondary_emails {
            let token = scope.auth_response.get("access_token").and_then(Value::as_str).unwrap_or_default();
            match svc.emails.fetch_verified_emails(&ctx.backend, token) {
                Ok(entries) => {
                    let verified: Vec<&EmailEntry> = entries.iter().filter(|e| e.verified).collect();
                    let picked = verified.iter().find(|e| e.primary).or_else(|| verified.first());
                    if let Some(entry) = picked {
                        update.email = Some(entry.email.clone());
                    }
                }
                Err(err) => {
                    return StepRun::Abort(FlowError::Internal(format!("secondary email lookup failed: {err}")))
                }
            }
        }

        let bound_email =
            ctx.user.and_then(|id| svc.accounts.get(id)).map(|u| u.email).filter(|email| !email.is_empty());
        if bound_email.is_some() {
            if ctx.backend == "email" {
                // Correo entrante por el backend directo: validar siempre.
                update.is_new = Some(true);
            }
            return StepRun::Continue(update);
        }

        let has_email = update.email.is_some() || ctx.details.email.is_some();
        if ctx.is_new && !has_email {
            return StepRun::Suspend { redirect: svc.settings.registration_url.clone() };
        }

        StepRun::Continue(update)
    }
}

/// Arma y despacha el correo de confirmación. Ayudante de efectos invocado
/// por `mail_validation`; no es un step y nunca suspende.
pub fn send_validation(
    svc: &Services,
    scope: &mut RequestScope,
    backend: &str,
    code: &VerificationCode,
    partial_token: Option<&str>,
) {
    // El enlace sólo sirve si hay una sesión durable que lo reciba.
    if scope.session.key().is_none() {
        scope.session.create();
    }
    scope.session.set(SESSION_EMAIL_SENT, Value::Bool(true));

    let template = if scope.pop_session_flag(SESSION_PASSWORD_RESET) { "reset" } else { "activation" };
    let token = partial_token.unwrap_or(&code.partial_token);
    let url = format!(
        "{}?verification_code={}&partial_token={}",
        svc.settings.complete_url(backend),
        code.code,
        token
    );
    svc.notifier.send_email(template, &code.email, &serde_json::json!({ "url": url }));
}

/// Confirmación de correo por código de un solo uso.
///
/// Con `verification_code` en la petición valida contra el store (falla →
/// `InvalidEmail`); sin él, emite un código etiquetado con el token del
/// checkpoint en curso, despacha el correo y suspende hacia la página
/// "revisa tu correo".
pub struct MailValidation {
    svc: Arc<Services>,
}

impl MailValidation {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for MailValidation {
    fn id(&self) -> &'static str {
        "mail_validation"
    }

    fn execute(&self, ctx: &Context, scope: &mut RequestScope) -> StepRun {
        let svc = &self.svc;
        let Some(backend) = svc.backends.get(&ctx.backend) else {
            return StepRun::Abort(FlowError::Internal(format!("unknown backend {}", ctx.backend)));
        };

        let requires_validation = backend.requires_email_validation || backend.force_email_validation;
        let Some(email) = ctx.details.email.clone() else {
            return StepRun::done();
        };
        let do_send_validation = ctx.is_new || backend.passwordless;
        if !(requires_validation && do_send_validation) {
            return StepRun::done();
        }

        match scope.request_param("verification_code").map(str::to_string) {
            Some(code) => {
                // La dirección en espera vive en la sesión; si la petición
                // llegó en otra sesión se usa la del contexto restaurado.
                let address = scope
                    .session
                    .pop(SESSION_EMAIL_VALIDATION_ADDRESS)
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| email.clone());
                if !svc.codes.check_verified(&address, &code) {
                    return StepRun::Abort(FlowError::InvalidEmail { backend: ctx.backend.clone() });
                }
                StepRun::done()
            }
            None => {
                let Some(token) = scope.partial_token().map(str::to_string) else {
                    return StepRun::Abort(FlowError::Internal("partial token not allocated".into()));
                };
                let code = svc.codes.issue(&email, &token);
                send_validation(svc, scope, &ctx.backend, &code, Some(&token));
                scope.session.set(SESSION_EMAIL_VALIDATION_ADDRESS, Value::String(email));
                StepRun::Suspend { redirect: svc.settings.email_validation_url.clone() }
            }
        }
    }
}

/// Borra el código verificado ya gastado para que no pueda reutilizarse.
pub struct RevokeMailCode {
    svc: Arc<Services>,
}

impl RevokeMailCode {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for RevokeMailCode {
    fn id(&self) -> &'static str {
        "revoke_mail_code"
    }

    fn execute(&self, ctx: &Context, scope: &mut RequestScope) -> StepRun {
        if let (Some(email), Some(code)) = (ctx.details.email.as_deref(), scope.request_param("verification_code")) {
            if self.svc.codes.take_verified(email, code).is_some() {
                log::debug!("revoked spent verification code for {email}");
            }
        }
        StepRun::done()
    }
}

/// Persiste el correo verificado de la identidad social ligada.
pub struct StoreEmail {
    svc: Arc<Services>,
}

impl StoreEmail {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

impl Step for StoreEmail {
    fn id(&self) -> &'static str {
        "store_email"
    }

    fn execute(&self, ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        let Some(email) = ctx.details.email.as_deref() else {
            return StepRun::Abort(FlowError::MissingEmail { backend: ctx.backend.clone() });
        };
        let Some(social) = ctx.social else {
            return StepRun::Abort(FlowError::Internal("store_email requires a social identity".into()));
        };
        self.svc.verified_emails.upsert(social, email);
        StepRun::done()
    }
}

//! Implementaciones concretas de los colaboradores externos.
//!
//! Versiones in-memory / estáticas de los traits de `auth_domain`: el
//! notificador acumula lo enviado, el verificador de redirects trabaja sobre
//! una lista de hosts permitidos y la consulta secundaria de correos responde
//! con fixtures por access token. Un deployment real sustituye estas piezas
//! por SMTP y llamadas HTTP reales sin tocar la tubería.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use uuid::Uuid;

use auth_domain::{DomainError, EmailEntry, Notifier, RedirectChecker, SecondaryEmailFetcher};

/// Correo templado enviado por el notificador.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub template: String,
    pub recipient: String,
    pub context: Value,
}

/// Actividad de cuenta registrada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub user: Uuid,
    pub activity: String,
    pub method: String,
    pub name: String,
}

#[derive(Default)]
struct NotifierState {
    emails: Vec<SentEmail>,
    activities: Vec<ActivityRecord>,
}

/// Notificador que acumula en memoria lo que se habría despachado.
pub struct MemoryNotifier {
    inner: Mutex<NotifierState>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self { inner: Mutex::new(NotifierState::default()) }
    }

    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.inner.lock().expect("notifier poisoned").emails.clone()
    }

    pub fn activities(&self) -> Vec<ActivityRecord> {
        self.inner.lock().expect("notifier poisoned").activities.clone()
    }
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for MemoryNotifier {
    fn send_email(&self, template: &str, recipient: &str, context: &Value) {
        log::debug!("queueing {template} mail for {recipient}");
        let mut state = self.inner.lock().expect("notifier poisoned");
        state.emails.push(SentEmail {
            template: template.to_string(),
            recipient: recipient.to_string(),
            context: context.clone(),
        });
    }

    fn notify_account_activity(&self, user: Uuid, activity: &str, method: &str, name: &str) {
        let mut state = self.inner.lock().expect("notifier poisoned");
        state.activities.push(ActivityRecord {
            user,
            activity: activity.to_string(),
            method: method.to_string(),
            name: name.to_string(),
        });
    }
}

/// Validación de redirects contra los hosts del deployment.
///
/// Seguro = ruta relativa al mismo origen, o URL http(s) absoluta hacia un
/// host de la lista. Todo lo demás (esquemas raros, protocol-relative,
/// userinfo incrustado hacia otro host) se rechaza.
pub struct AllowedHostsChecker {
    hosts: Vec<String>,
}

impl AllowedHostsChecker {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(hosts: I) -> Self {
        Self { hosts: hosts.into_iter().map(Into::into).collect() }
    }
}

impl RedirectChecker for AllowedHostsChecker {
    fn is_safe_redirect(&self, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        // Protocol-relative y backslash escapan del origen actual.
        if url.starts_with("//") || url.starts_with("/\\") {
            return false;
        }
        if url.starts_with('/') {
            return true;
        }
        let rest = match url.strip_prefix("https://").or_else(|| url.strip_prefix("http://")) {
            Some(rest) => rest,
            None => return false,
        };
        let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
        // Descarta userinfo y puerto antes de comparar el host.
        let host = authority.rsplit('@').next().unwrap_or("");
        let host = host.split(':').next().unwrap_or("");
        !host.is_empty() && self.hosts.iter().any(|allowed| allowed == host)
    }
}

/// Consulta secundaria de correos respondida desde fixtures por access token.
pub struct StaticEmailFetcher {
    responses: Mutex<HashMap<String, Vec<EmailEntry>>>,
}

impl StaticEmailFetcher {
    pub fn new() -> Self {
        Self { responses: Mutex::new(HashMap::new()) }
    }

    /// Fija la respuesta del endpoint para un access token.
    pub fn set_response(&self, access_token: &str, entries: Vec<EmailEntry>) {
        self.responses.lock().expect("fetcher poisoned").insert(access_token.to_string(), entries);
    }
}

impl Default for StaticEmailFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SecondaryEmailFetcher for StaticEmailFetcher {
    fn fetch_verified_emails(&self, backend: &str, access_token: &str) -> Result<Vec<EmailEntry>, DomainError> {
        let responses = self.responses.lock().expect("fetcher poisoned");
        responses
            .get(access_token)
            .cloned()
            .ok_or_else(|| DomainError::External(format!("{backend}: no emails for supplied token")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_are_safe_but_protocol_relative_are_not() {
        let checker = AllowedHostsChecker::new(["example.com"]);
        assert!(checker.is_safe_redirect("/projects/"));
        assert!(!checker.is_safe_redirect("//evil.com/x"));
        assert!(!checker.is_safe_redirect("/\\evil.com"));
    }

    #[test]
    fn absolute_urls_require_an_allowed_host() {
        let checker = AllowedHostsChecker::new(["example.com"]);
        assert!(checker.is_safe_redirect("https://example.com/next"));
        assert!(checker.is_safe_redirect("https://example.com:443/next"));
        assert!(!checker.is_safe_redirect("https://evil.com/next"));
        assert!(!checker.is_safe_redirect("https://example.com@evil.com/next"));
        assert!(!checker.is_safe_redirect("javascript:alert(1)"));
    }
}

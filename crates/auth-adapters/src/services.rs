//! Colaboradores compartidos por los steps de la tubería.
//!
//! Cada step recibe este paquete por construcción (inyección explícita, nada
//! ambiente): configuración, registro de backends y los stores/colaboradores
//! detrás de sus traits.

use std::sync::Arc;

use auth_core::{CodeStore, InMemoryAttemptLog, InMemoryCodeStore, InMemoryPartialStore, PipelineEngine};
use auth_domain::{
    AccountStore, IdentityStore, InMemoryAccountStore, InMemoryIdentityStore, InMemoryVerifiedEmailStore, Notifier,
    RedirectChecker, SecondaryEmailFetcher, VerifiedEmailStore,
};

use crate::backend::BackendRegistry;
use crate::config::AuthSettings;
use crate::providers::{AllowedHostsChecker, MemoryNotifier, StaticEmailFetcher};

pub struct Services {
    pub settings: AuthSettings,
    pub backends: BackendRegistry,
    pub accounts: Arc<dyn AccountStore>,
    pub identities: Arc<dyn IdentityStore>,
    pub verified_emails: Arc<dyn VerifiedEmailStore>,
    pub codes: Arc<dyn CodeStore>,
    pub notifier: Arc<dyn Notifier>,
    pub redirects: Arc<dyn RedirectChecker>,
    pub emails: Arc<dyn SecondaryEmailFetcher>,
}

/// Juego completo de colaboradores in-memory, con acceso a las piezas
/// concretas. Es el arnés de tests y del binario de demostración.
pub struct MemoryServices {
    pub services: Arc<Services>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub identities: Arc<InMemoryIdentityStore>,
    pub verified_emails: Arc<InMemoryVerifiedEmailStore>,
    pub codes: Arc<InMemoryCodeStore>,
    pub partials: Arc<InMemoryPartialStore>,
    pub notifier: Arc<MemoryNotifier>,
    pub emails: Arc<StaticEmailFetcher>,
    pub log: Arc<InMemoryAttemptLog>,
}

impl MemoryServices {
    pub fn new(settings: AuthSettings, backends: BackendRegistry) -> Self {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let identities = Arc::new(InMemoryIdentityStore::new());
        let verified_emails = Arc::new(InMemoryVerifiedEmailStore::new());
        let codes = Arc::new(InMemoryCodeStore::new());
        let partials = Arc::new(InMemoryPartialStore::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let emails = Arc::new(StaticEmailFetcher::new());
        let log = Arc::new(InMemoryAttemptLog::new());

        let services = Arc::new(Services {
            settings,
            backends,
            accounts: Arc::clone(&accounts) as Arc<dyn AccountStore>,
            identities: Arc::clone(&identities) as Arc<dyn IdentityStore>,
            verified_emails: Arc::clone(&verified_emails) as Arc<dyn VerifiedEmailStore>,
            codes: Arc::clone(&codes) as Arc<dyn CodeStore>,
            notifier: Arc::clone(&notifier) as Arc<dyn Notifier>,
            redirects: Arc::new(AllowedHostsChecker::new(["example.com"])) as Arc<dyn RedirectChecker>,
            emails: Arc::clone(&emails) as Arc<dyn SecondaryEmailFetcher>,
        });

        Self { services, accounts, identities, verified_emails, codes, partials, notifier, emails, log }
    }

    /// Motor cableado contra los stores de este juego.
    pub fn engine(&self) -> PipelineEngine<InMemoryPartialStore, InMemoryCodeStore, InMemoryAttemptLog> {
        PipelineEngine::new(Arc::clone(&self.partials), Arc::clone(&self.codes), Arc::clone(&self.log))
    }
}

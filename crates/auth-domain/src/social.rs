//! Identidades sociales y correos verificados.
//!
//! Una `SocialIdentity` es el vínculo entre una cuenta local y un par
//! (proveedor, id externo). `VerifiedEmail` es el registro durable de un
//! correo confirmado para ese vínculo: único por identidad, se actualiza en
//! el sitio (nunca se duplica) cuando el proveedor reporta otro correo.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Vínculo cuenta local ↔ (proveedor, id externo).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialIdentity {
    pub id: Uuid,
    pub provider: String,
    pub uid: String,
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Contrato del registro de identidades.
///
/// `link` es atómico sobre la unicidad de (proveedor, uid): dos intentos
/// concurrentes de ligar el mismo par resuelven en un `Ok` y un
/// `IdentityTaken`.
pub trait IdentityStore: Send + Sync {
    fn find(&self, provider: &str, uid: &str) -> Option<SocialIdentity>;

    fn get(&self, id: Uuid) -> Option<SocialIdentity>;

    fn for_user(&self, user: Uuid) -> Vec<SocialIdentity>;

    /// Alta atómica del vínculo.
    fn link(&self, provider: &str, uid: &str, user: Uuid) -> Result<SocialIdentity, DomainError>;

    fn unlink(&self, id: Uuid) -> bool;
}

pub struct InMemoryIdentityStore {
    inner: Mutex<HashMap<Uuid, SocialIdentity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn find(&self, provider: &str, uid: &str) -> Option<SocialIdentity> {
        let inner = self.inner.lock().expect("identity store poisoned");
        inner.values().find(|s| s.provider == provider && s.uid == uid).cloned()
    }

    fn get(&self, id: Uuid) -> Option<SocialIdentity> {
        self.inner.lock().expect("identity store poisoned").get(&id).cloned()
    }

    fn for_user(&self, user: Uuid) -> Vec<SocialIdentity> {
        let inner = self.inner.lock().expect("identity store poisoned");
        let mut found: Vec<SocialIdentity> = inner.values().filter(|s| s.user == user).cloned().collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        found
    }

    fn link(&self, provider: &str, uid: &str, user: Uuid) -> Result<SocialIdentity, DomainError> {
        let mut inner = self.inner.lock().expect("identity store poisoned");
        if inner.values().any(|s| s.provider == provider && s.uid == uid) {
            return Err(DomainError::IdentityTaken(provider.to_string(), uid.to_string()));
        }
        let social = SocialIdentity {
            id: Uuid::new_v4(),
            provider: provider.to_string(),
            uid: uid.to_string(),
            user,
            created_at: Utc::now(),
        };
        inner.insert(social.id, social.clone());
        Ok(social)
    }

    fn unlink(&self, id: Uuid) -> bool {
        self.inner.lock().expect("identity store poisoned").remove(&id).is_some()
    }
}

/// Correo confirmado para una identidad social.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedEmail {
    pub social: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Contrato del registro de correos verificados.
pub trait VerifiedEmailStore: Send + Sync {
    /// Inserta o actualiza el registro de la identidad. Al actualizar se
    /// conserva el `created_at` original.
    fn upsert(&self, social: Uuid, email: &str);

    fn get(&self, social: Uuid) -> Option<VerifiedEmail>;
}

pub struct InMemoryVerifiedEmailStore {
    inner: Mutex<HashMap<Uuid, VerifiedEmail>>,
}

impl InMemoryVerifiedEmailStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }
}

impl Default for InMemoryVerifiedEmailStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifiedEmailStore for InMemoryVerifiedEmailStore {
    fn upsert(&self, social: Uuid, email: &str) {
        let mut inner = self.inner.lock().expect("verified email store poisoned");
        match inner.get_mut(&social) {
            Some(existing) => {
                if existing.email != email {
                    existing.email = email.to_string();
                }
            }
            None => {
                inner.insert(
                    social,
                    VerifiedEmail { social, email: email.to_string(), created_at: Utc::now() },
                );
            }
        }
    }

    fn get(&self, social: Uuid) -> Option<VerifiedEmail> {
        self.inner.lock().expect("verified email store poisoned").get(&social).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_rejects_duplicate_pair() {
        let store = InMemoryIdentityStore::new();
        let user = Uuid::new_v4();
        store.link("github", "1234", user).expect("first link");
        let err = store.link("github", "1234", Uuid::new_v4()).unwrap_err();
        assert_eq!(err, DomainError::IdentityTaken("github".into(), "1234".into()));
    }

    #[test]
    fn upsert_updates_in_place_keeping_created_at() {
        let store = InMemoryVerifiedEmailStore::new();
        let social = Uuid::new_v4();
        store.upsert(social, "old@example.com");
        let first = store.get(social).expect("first");
        store.upsert(social, "new@example.com");
        let second = store.get(social).expect("second");
        assert_eq!(second.email, "new@example.com");
        assert_eq!(second.created_at, first.created_at);
    }
}

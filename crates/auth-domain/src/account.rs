//! Cuentas locales y su contrato de almacenamiento.
//!
//! El contrato expone las únicas operaciones que la tubería necesita:
//! búsqueda case-insensitive por username, alta atómica (la unicidad de
//! username se serializa AQUÍ, no en el pre-chequeo de la tubería) y las
//! mutaciones puntuales que los steps aplican sobre una cuenta ya ligada.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Cuenta local mínima vista por la tubería.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub has_usable_password: bool,
    pub created_at: DateTime<Utc>,
}

/// Contrato de almacenamiento de cuentas.
///
/// `create_user` es el punto de serialización real contra registros
/// concurrentes del mismo username (comparación case-insensitive): dos altas
/// simultáneas que sólo difieren en mayúsculas deben resolverse en exactamente
/// un `Ok` y un `UsernameTaken`.
pub trait AccountStore: Send + Sync {
    fn get(&self, id: Uuid) -> Option<User>;

    /// Búsqueda por username ignorando mayúsculas/minúsculas.
    fn find_by_username_ci(&self, username: &str) -> Option<User>;

    /// Alta atómica. Falla con `UsernameTaken` ante colisión case-insensitive.
    fn create_user(&self, username: &str, email: &str) -> Result<User, DomainError>;

    /// Actualiza el nombre visible y marca el registro como modificado para
    /// que la capa llamadora lo persista.
    fn update_first_name(&self, id: Uuid, first_name: &str) -> Result<(), DomainError>;

    fn set_email(&self, id: Uuid, email: &str) -> Result<(), DomainError>;

    /// Deja la contraseña en un estado que no permite autenticación directa.
    fn set_unusable_password(&self, id: Uuid) -> Result<(), DomainError>;

    /// Límite de longitud del campo de nombre, expuesto como dato.
    fn first_name_max_length(&self) -> usize {
        30
    }
}

#[derive(Default)]
struct AccountState {
    users: HashMap<Uuid, User>,
    changed: Vec<Uuid>,
}

/// Implementación in-memory respaldada por un `Mutex`.
///
/// La exclusión mutua dentro de `create_user` cumple el contrato de
/// atomicidad sin locks adicionales en la tubería.
pub struct InMemoryAccountStore {
    inner: Mutex<AccountState>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(AccountState::default()) }
    }

    /// Siembra una cuenta ya existente (tests / demo).
    pub fn insert(&self, user: User) {
        let mut state = self.inner.lock().expect("account store poisoned");
        state.users.insert(user.id, user);
    }

    /// Ids marcados como modificados por `update_first_name`.
    pub fn changed_ids(&self) -> Vec<Uuid> {
        self.inner.lock().expect("account store poisoned").changed.clone()
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get(&self, id: Uuid) -> Option<User> {
        self.inner.lock().expect("account store poisoned").users.get(&id).cloned()
    }

    fn find_by_username_ci(&self, username: &str) -> Option<User> {
        let state = self.inner.lock().expect("account store poisoned");
        let lowered = username.to_lowercase();
        state.users.values().find(|u| u.username.to_lowercase() == lowered).cloned()
    }

    fn create_user(&self, username: &str, email: &str) -> Result<User, DomainError> {
        let mut state = self.inner.lock().expect("account store poisoned");
        let lowered = username.to_lowercase();
        if state.users.values().any(|u| u.username.to_lowercase() == lowered) {
            return Err(DomainError::UsernameTaken(username.to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            has_usable_password: false,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn update_first_name(&self, id: Uuid, first_name: &str) -> Result<(), DomainError> {
        let mut state = self.inner.lock().expect("account store poisoned");
        let user = state.users.get_mut(&id).ok_or(DomainError::NotFound)?;
        user.first_name = first_name.to_string();
        state.changed.push(id);
        Ok(())
    }

    fn set_email(&self, id: Uuid, email: &str) -> Result<(), DomainError> {
        let mut state = self.inner.lock().expect("account store poisoned");
        let user = state.users.get_mut(&id).ok_or(DomainError::NotFound)?;
        user.email = email.to_string();
        Ok(())
    }

    fn set_unusable_password(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.inner.lock().expect("account store poisoned");
        let user = state.users.get_mut(&id).ok_or(DomainError::NotFound)?;
        user.has_usable_password = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn create_user_rejects_case_insensitive_duplicate() {
        let store = InMemoryAccountStore::new();
        store.create_user("Admin", "admin@example.com").expect("first create");
        let err = store.create_user("admin", "other@example.com").unwrap_err();
        assert_eq!(err, DomainError::UsernameTaken("admin".into()));
    }

    #[test]
    fn concurrent_case_variant_registrations_resolve_to_one_winner() {
        let store = Arc::new(InMemoryAccountStore::new());
        let handles: Vec<_> = ["NewUser", "newuser"]
            .into_iter()
            .map(|name| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.create_user(name, "x@example.com"))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().expect("join")).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let taken = results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::UsernameTaken(_))))
            .count();
        assert_eq!((ok, taken), (1, 1));
    }

    #[test]
    fn update_first_name_marks_record_changed() {
        let store = InMemoryAccountStore::new();
        let user = store.create_user("eva", "eva@example.com").expect("create");
        store.update_first_name(user.id, "Eva Luna").expect("update");
        assert_eq!(store.changed_ids(), vec![user.id]);
        assert_eq!(store.get(user.id).expect("get").first_name, "Eva Luna");
    }
}

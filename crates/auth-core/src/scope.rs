//! Estado efímero de la petición y sesión, explícito en vez de ambiente.
//!
//! Todo el estado mutable "global" que la tubería original leía del request y
//! de la sesión viaja aquí como un objeto pasado a cada step: parámetros de
//! la petición entrante, respuesta cruda del proveedor, usuario autenticado
//! de la sesión, espacio clave/valor de sesión con rotación de clave, avisos
//! para el usuario y el token del checkpoint en curso.

use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

/// Espacio de sesión durable: clave de sesión opcional + datos clave/valor.
/// `cycle_key` rota la clave conservando el contenido (mitigación de session
/// fixation tras autenticar).
#[derive(Debug, Default)]
pub struct Session {
    key: Option<String>,
    data: IndexMap<String, Value>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Asegura que exista una clave de sesión.
    pub fn create(&mut self) {
        if self.key.is_none() {
            self.key = Some(Uuid::new_v4().simple().to_string());
        }
    }

    /// Rota la clave de sesión conservando los datos.
    pub fn cycle_key(&mut self) {
        self.key = Some(Uuid::new_v4().simple().to_string());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn pop(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }
}

/// Alcance de una petición entrante: lo que la tubería puede leer o escribir
/// fuera del `Context` serializable.
#[derive(Debug, Default)]
pub struct RequestScope {
    request: IndexMap<String, String>,
    /// Payload crudo devuelto por el proveedor (access_token incluido).
    pub auth_response: Value,
    /// Usuario autenticado de la sesión actual, si lo hay.
    pub current_user: Option<Uuid>,
    pub session: Session,
    warnings: Vec<String>,
    partial_token: Option<String>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parámetro de la petición entrante (query o formulario).
    pub fn request_param(&self, key: &str) -> Option<&str> {
        self.request.get(key).map(String::as_str)
    }

    pub fn set_request_param(&mut self, key: &str, value: &str) {
        self.request.insert(key.to_string(), value.to_string());
    }

    /// Bandera booleana en sesión (ausente cuenta como falso).
    pub fn session_flag(&self, key: &str) -> bool {
        matches!(self.session.get(key), Some(Value::Bool(true)))
    }

    /// Consume una bandera booleana de sesión.
    pub fn pop_session_flag(&mut self, key: &str) -> bool {
        matches!(self.session.pop(key), Some(Value::Bool(true)))
    }

    /// Aviso dirigido al usuario; el llamador decide cómo presentarlo.
    pub fn add_warning(&mut self, text: impl Into<String>) {
        self.warnings.push(text.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Token del checkpoint reservado para este intento. El motor lo asigna
    /// antes de correr el primer step.
    pub fn partial_token(&self) -> Option<&str> {
        self.partial_token.as_deref()
    }

    pub(crate) fn set_partial_token(&mut self, token: String) {
        self.partial_token = Some(token);
    }
}

//! authflow-rust
//!
//! Este crate actúa como fachada del workspace de autenticación social:
//! - `auth_core` aporta el motor de tuberías, el contexto y los checkpoints.
//! - `auth_domain` aporta cuentas, identidades, correos verificados y la
//!   normalización de usernames.
//! - `auth_adapters` aporta la biblioteca de steps y los colaboradores.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub use auth_adapters;
pub use auth_core;
pub use auth_domain;

#[cfg(test)]
mod tests {
    use auth_core::FlowError;
    use auth_domain::slugify_username;

    #[test]
    fn flow_error_messages() {
        let e = FlowError::RegistrationClosed { backend: "github".into() }.to_string();
        assert_eq!(e, "new registrations are disabled");
        let e = FlowError::LinkExpired { backend: "email".into() }.to_string();
        assert_eq!(e, "the confirmation link has expired");
    }

    #[test]
    fn slugify_is_reachable_from_the_facade() {
        assert_eq!(slugify_username("José Ñandú!"), "Jose-Nandu");
    }
}

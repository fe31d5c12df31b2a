//! Conexión de un proveedor nuevo a una cuenta existente.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use auth_adapters::steps::{default_auth_pipeline, SESSION_NEXT, SESSION_SOCIAL_AUTH_USER};
use auth_adapters::{default_backends, AuthSettings, MemoryServices};
use auth_core::{Context, FlowError, Outcome, ProfileDetails, RequestScope};
use auth_domain::{AccountStore, IdentityStore, User};

fn seed_user(ms: &MemoryServices) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        username: "nijel".into(),
        email: "nijel@example.com".into(),
        first_name: String::new(),
        has_usable_password: true,
        created_at: Utc::now(),
    };
    ms.accounts.insert(user.clone());
    user.id
}

fn connect_scope(user: Uuid) -> RequestScope {
    let mut scope = RequestScope::new();
    scope.current_user = Some(user);
    scope.session.create();
    scope.session.set(SESSION_SOCIAL_AUTH_USER, Value::String(user.to_string()));
    scope
}

#[test]
fn linking_a_new_provider_to_an_existing_account_notifies_the_connect() {
    let ms = MemoryServices::new(AuthSettings::default(), default_backends());
    let user = seed_user(&ms);

    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);
    let mut scope = connect_scope(user);
    scope.session.set(SESSION_NEXT, Value::String("https://evil.com/after".into()));
    let old_key = scope.session.key().map(str::to_string);

    let mut ctx = Context::new("gitlab", "gl-77", ProfileDetails { email: Some("nijel@example.com".into()), ..Default::default() });
    ctx.user = Some(user);

    let ctx = match engine.run(&pipeline, ctx, &mut scope) {
        Outcome::Completed(ctx) => ctx,
        other => panic!("expected completion, got {other:?}"),
    };

    assert!(!ctx.is_new);
    assert!(ctx.new_association);
    assert!(ms.identities.find("gitlab", "gl-77").is_some());

    let activities = ms.notifier.activities();
    assert!(activities
        .iter()
        .any(|a| a.user == user && a.activity == "auth-connect" && a.method == "GitLab" && a.name == "gl-77"));

    // La sesión rotó su clave conservando datos, y el destino post-login
    // inseguro fue limpiado.
    assert_ne!(scope.session.key().map(str::to_string), old_key);
    assert!(scope.session.get(SESSION_NEXT).is_none());
    assert_eq!(
        scope.session.get(SESSION_SOCIAL_AUTH_USER).and_then(|v| v.as_str()),
        Some(user.to_string().as_str())
    );
}

#[test]
fn a_safe_post_login_target_survives_the_cleanup() {
    let ms = MemoryServices::new(AuthSettings::default(), default_backends());
    let user = seed_user(&ms);

    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);
    let mut scope = connect_scope(user);
    scope.session.set(SESSION_NEXT, Value::String("/projects/dashboard/".into()));

    let mut ctx = Context::new("gitlab", "gl-77", ProfileDetails { email: Some("nijel@example.com".into()), ..Default::default() });
    ctx.user = Some(user);
    assert!(engine.run(&pipeline, ctx, &mut scope).is_completed());

    assert_eq!(scope.session.get(SESSION_NEXT).and_then(|v| v.as_str()), Some("/projects/dashboard/"));
}

#[test]
fn an_identity_owned_by_someone_else_cannot_be_connected() {
    let ms = MemoryServices::new(AuthSettings::default(), default_backends());
    let owner = seed_user(&ms);
    ms.identities.link("gitlab", "gl-77", owner).expect("seed identity");

    let intruder = User {
        id: Uuid::new_v4(),
        username: "intruder".into(),
        email: "intruder@example.com".into(),
        first_name: String::new(),
        has_usable_password: true,
        created_at: Utc::now(),
    };
    ms.accounts.insert(intruder.clone());

    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);
    let mut scope = connect_scope(intruder.id);
    let mut ctx = Context::new("gitlab", "gl-77", ProfileDetails::default());
    ctx.user = Some(intruder.id);

    match engine.run(&pipeline, ctx, &mut scope) {
        Outcome::Aborted { step_id, error } => {
            assert_eq!(step_id, "social_user");
            assert_eq!(error, FlowError::AuthAlreadyAssociated { backend: "gitlab".into() });
        }
        other => panic!("expected already-associated abort, got {other:?}"),
    }
}

#[test]
fn provider_supplied_names_update_the_visible_name_with_the_store_limit() {
    let ms = MemoryServices::new(AuthSettings::default(), default_backends());
    let user = seed_user(&ms);

    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);
    let mut scope = connect_scope(user);

    // Proveedor que mete el nombre completo en "last name".
    let details = ProfileDetails {
        email: Some("nijel@example.com".into()),
        last_name: Some("Michal Čihař".into()),
        ..Default::default()
    };
    let mut ctx = Context::new("gitlab", "gl-77", details);
    ctx.user = Some(user);
    assert!(engine.run(&pipeline, ctx, &mut scope).is_completed());
    assert_eq!(ms.accounts.get(user).expect("account").first_name, "Michal Čihař");

    // Proveedor que duplica el nombre completo en ambos campos: no se
    // concatena.
    let mut scope = connect_scope(user);
    let details = ProfileDetails {
        email: Some("nijel@example.com".into()),
        first_name: Some("Ada Lovelace".into()),
        last_name: Some("Ada Lovelace".into()),
        ..Default::default()
    };
    let mut ctx = Context::new("gitlab", "gl-77", details);
    ctx.user = Some(user);
    assert!(engine.run(&pipeline, ctx, &mut scope).is_completed());
    assert_eq!(ms.accounts.get(user).expect("account").first_name, "Ada Lovelace");

    // Un nombre más largo que el límite del store se recorta.
    let mut scope = connect_scope(user);
    let details = ProfileDetails {
        email: Some("nijel@example.com".into()),
        full_name: Some("A".repeat(45)),
        ..Default::default()
    };
    let mut ctx = Context::new("gitlab", "gl-77", details);
    ctx.user = Some(user);
    assert!(engine.run(&pipeline, ctx, &mut scope).is_completed());
    assert_eq!(ms.accounts.get(user).expect("account").first_name.chars().count(), 30);
}

//! Flujos completos de registro a través de la tubería por defecto.

use std::sync::Arc;

use auth_adapters::steps::default_auth_pipeline;
use auth_adapters::{default_backends, AuthSettings, MemoryServices};
use auth_core::{Context, FlowError, Outcome, ProfileDetails, RequestScope};
use auth_domain::{AccountStore, EmailEntry, VerifiedEmailStore};

fn harness() -> MemoryServices {
    MemoryServices::new(AuthSettings::default(), default_backends())
}

#[test]
fn github_registration_completes_with_secondary_email_lookup() {
    let ms = harness();
    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);

    // El perfil de GitHub no trae correo; el endpoint secundario sí.
    ms.emails.set_response(
        "gh-token",
        vec![
            EmailEntry { email: "unverified@example.com".into(), verified: false, primary: false },
            EmailEntry { email: "secondary@example.com".into(), verified: true, primary: false },
            EmailEntry { email: "primary@example.com".into(), verified: true, primary: true },
        ],
    );

    let details = ProfileDetails {
        username: Some("octocat".into()),
        full_name: Some("The Octocat".into()),
        ..Default::default()
    };
    let mut scope = RequestScope::new();
    scope.auth_response = serde_json::json!({ "access_token": "gh-token" });

    let outcome = engine.run(&pipeline, Context::new("github", "583231", details), &mut scope);
    let ctx = match outcome {
        Outcome::Completed(ctx) => ctx,
        other => panic!("expected completion without suspension, got {other:?}"),
    };

    // Se eligió el verificado primario, no el primero de la lista.
    assert_eq!(ctx.details.email.as_deref(), Some("primary@example.com"));
    assert!(ctx.is_new);
    assert!(ctx.new_association);

    let user = ms.accounts.find_by_username_ci("octocat").expect("account created");
    assert_eq!(user.email, "primary@example.com");
    assert_eq!(user.first_name, "The Octocat");

    let social = ctx.social.expect("identity linked");
    let verified = ms.verified_emails.get(social).expect("verified email row");
    assert_eq!(verified.email, "primary@example.com");
}

#[test]
fn email_backend_suspends_and_resume_completes_the_registration() {
    let ms = harness();
    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);

    let details = ProfileDetails {
        email: Some("nijel@example.com".into()),
        username: Some("nijel".into()),
        ..Default::default()
    };
    let mut scope = RequestScope::new();
    let outcome = engine.run(&pipeline, Context::new("email", "nijel@example.com", details), &mut scope);

    let token = match outcome {
        Outcome::Suspended { partial_token, redirect } => {
            assert_eq!(redirect, "/accounts/email-sent/");
            partial_token
        }
        other => panic!("expected suspension at mail_validation, got {other:?}"),
    };

    // Quedó un checkpoint, un código emitido bajo su token y un correo con la
    // URL de confirmación.
    assert_eq!(ms.partials.len(), 1);
    let code = ms.codes.latest_for("nijel@example.com").expect("code issued");
    assert_eq!(code.partial_token, token);
    let mails = ms.notifier.sent_emails();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].template, "activation");
    assert_eq!(mails[0].recipient, "nijel@example.com");
    let url = mails[0].context["url"].as_str().expect("url in template context");
    assert!(url.contains(&code.code) && url.contains(&token));

    // Segunda petición, minutos después: (token, código) reanudan el flujo.
    let mut resume_scope = RequestScope::new();
    let ctx = match engine.resume(&pipeline, &token, &code.code, &mut resume_scope) {
        Outcome::Completed(ctx) => ctx,
        other => panic!("expected completion, got {other:?}"),
    };

    let user = ms.accounts.find_by_username_ci("nijel").expect("account created");
    assert_eq!(ctx.user, Some(user.id));
    let verified = ms.verified_emails.get(ctx.social.expect("identity linked")).expect("verified row");
    assert_eq!(verified.email, "nijel@example.com");

    // El código se verificó y luego se revocó; el checkpoint se consumió.
    assert_eq!(ms.codes.len(), 0);
    assert!(ms.partials.is_empty());

    // Reanudar otra vez con el mismo token debe fallar por token desconocido.
    let mut replay = RequestScope::new();
    match engine.resume(&pipeline, &token, &code.code, &mut replay) {
        Outcome::Aborted { error, .. } => assert_eq!(error, FlowError::PartialNotFound),
        other => panic!("expected not-found abort, got {other:?}"),
    }
}

#[test]
fn case_variant_username_collision_is_rejected() {
    let ms = harness();
    ms.accounts.create_user("Nijel", "first@example.com").expect("seed account");

    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);
    let details = ProfileDetails {
        email: Some("second@example.com".into()),
        username: Some("nijel".into()),
        ..Default::default()
    };
    let mut scope = RequestScope::new();
    let outcome = engine.run(&pipeline, Context::new("gitlab", "99", details), &mut scope);

    match outcome {
        Outcome::Aborted { step_id, error } => {
            assert_eq!(step_id, "verify_username");
            assert_eq!(error, FlowError::AuthAlreadyAssociated { backend: "gitlab".into() });
        }
        other => panic!("expected username collision abort, got {other:?}"),
    }
}

#[test]
fn new_user_without_any_email_suspends_towards_the_registration_form() {
    let ms = harness();
    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);

    // gitlab no tiene endpoint secundario y el perfil viene sin correo.
    let details = ProfileDetails { username: Some("someone".into()), ..Default::default() };
    let mut scope = RequestScope::new();
    let outcome = engine.run(&pipeline, Context::new("gitlab", "7", details), &mut scope);

    match outcome {
        Outcome::Suspended { redirect, .. } => assert_eq!(redirect, "/accounts/register/"),
        other => panic!("expected blocking redirect, got {other:?}"),
    }
    // Redirect bloqueante: no hay código de verificación de por medio.
    assert_eq!(ms.codes.len(), 0);
}

#[test]
fn username_falls_back_to_the_email_local_part() {
    let ms = harness();
    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);

    let details = ProfileDetails { email: Some("maria.ruiz@example.com".into()), ..Default::default() };
    let mut scope = RequestScope::new();
    let outcome = engine.run(&pipeline, Context::new("gitlab", "11", details), &mut scope);

    let ctx = match outcome {
        Outcome::Completed(ctx) => ctx,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(ctx.details.username.as_deref(), Some("maria.ruiz"));
    assert!(ms.accounts.find_by_username_ci("maria.ruiz").is_some());
}

use serde_json::Value;

use auth_adapters::steps::{default_auth_pipeline, disconnect_pipeline, SESSION_SOCIAL_AUTH_USER};
use auth_adapters::{default_backends, AuthSettings, MemoryServices};
use auth_core::{Context, Outcome, ProfileDetails, RequestScope};
use auth_domain::{slugify_username, AccountStore, EmailEntry, IdentityStore, VerifiedEmailStore};

/// Registro vía GitHub: el perfil no trae correo, el endpoint secundario sí.
/// El flujo completa sin suspensión.
fn run_github_registration(ms: &MemoryServices) {
    let engine = ms.engine();
    let pipeline = default_auth_pipeline(&ms.services);

    ms.emails.set_response(
        "gh-token",
        vec![
            EmailEntry { email: "secondary@example.com".into(), verified: true, primary: false },
            EmailEntry { email: "octocat@example.com".into(), verified: true, primary: true },
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
        other => panic!("el registro GitHub debió completar: {other:?}"),
    };
    assert_eq!(ctx.details.email.as_deref(), Some("octocat@example.com"));
    let user = ms.accounts.find_by_username_ci("octocat").expect("cuenta creada");
    println!("[github] cuenta {} creada con correo {}", user.username, user.email);
    println!("[github] eventos del intento: {}", engine.events(ctx.attempt_id).len());
    println!("!Validación GitHub: OK (completó sin suspensión, correo del endpoint secundario)");
}

/// Registro por correo directo: suspende a la espera del código, reanuda con
/// (token, código) y termina; el segundo uso del token falla.
fn run_email_validation_cycle(ms: &MemoryServices) {
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
            println!("[email] suspendido hacia {redirect}, token {partial_token}");
            partial_token
        }
        other => panic!("el flujo de correo debió suspender: {other:?}"),
    };

    let mail = &ms.notifier.sent_emails()[0];
    println!("[email] correo '{}' para {} con URL {}", mail.template, mail.recipient, mail.context["url"]);

    // El clic del usuario llega en otra petición, con otra sesión.
    let code = ms.codes.latest_for("nijel@example.com").expect("código emitido");
    let mut resume_scope = RequestScope::new();
    let outcome = engine.resume(&pipeline, &token, &code.code, &mut resume_scope);
    assert!(outcome.is_completed(), "la reanudación debió completar: {outcome:?}");
    assert!(ms.partials.is_empty() && ms.codes.len() == 0);

    let mut replay_scope = RequestScope::new();
    let replay = engine.resume(&pipeline, &token, &code.code, &mut replay_scope);
    assert!(matches!(replay, Outcome::Aborted { .. }), "el token es de un solo uso");
    println!("!Validación correo: OK (suspender → reanudar → completar; token de un solo uso)");
}

/// Desconexión de la identidad que respaldaba el correo primario: el correo
/// se reasigna al verificado restante más antiguo y se avisa al usuario.
fn run_disconnect(ms: &MemoryServices) {
    let engine = ms.engine();
    let user = ms.accounts.find_by_username_ci("octocat").expect("cuenta del demo GitHub");

    let gitlab = ms.identities.link("gitlab", "gl-42", user.id).expect("segunda identidad");
    ms.verified_emails.upsert(gitlab.id, "backup@example.com");
    let github = ms.identities.find("github", "583231").expect("identidad GitHub");

    let pipeline = disconnect_pipeline(&ms.services);
    let mut scope = RequestScope::new();
    scope.current_user = Some(user.id);
    scope.session.set(SESSION_SOCIAL_AUTH_USER, Value::String(user.id.to_string()));

    let outcome = engine.run(&pipeline, Context::disconnect("github", user.id, vec![github.id]), &mut scope);
    assert!(outcome.is_completed(), "la desconexión debió completar: {outcome:?}");
    ms.identities.unlink(github.id);

    let reloaded = ms.accounts.get(user.id).expect("cuenta");
    assert_eq!(reloaded.email, "backup@example.com");
    for warning in scope.warnings() {
        println!("[disconnect] aviso: {warning}");
    }
    println!("!Validación desconexión: OK (correo primario reasignado y notificado)");
}

fn main() {
    // Carga .env si existe antes de leer la configuración del deployment.
    let settings = AuthSettings::from_env();
    let ms = MemoryServices::new(settings, default_backends());

    println!("slugify_username(\"José Ñandú!\") = {:?}", slugify_username("José Ñandú!"));
    println!("slugify_username(\"user name+tag\") = {:?}", slugify_username("user name+tag"));

    run_github_registration(&ms);
    run_email_validation_cycle(&ms);
    run_disconnect(&ms);

    println!("Demo de la tubería de autenticación: OK");
}

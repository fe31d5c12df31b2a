//! Suspensión y reanudación a través del checkpoint durable.
//!
//! Simula el ciclo real: un step de validación de correo emite un código
//! etiquetado con el token del checkpoint, suspende, y la reanudación con
//! (token, código) restaura el contexto y revalida en el mismo step.

use std::sync::Arc;

use auth_core::{
    CodeStore, Context, FlowError, InMemoryAttemptLog, InMemoryCodeStore, InMemoryPartialStore, Outcome,
    PipelineDefinition, PipelineEngine, ProfileDetails, RequestScope, Step, StepRun, RESUME_STAGE,
};

struct EmailGate {
    codes: Arc<InMemoryCodeStore>,
}

impl Step for EmailGate {
    fn id(&self) -> &'static str {
        "email_gate"
    }

    fn execute(&self, ctx: &Context, scope: &mut RequestScope) -> StepRun {
        let email = ctx.details.email.clone().unwrap_or_default();
        match scope.request_param("verification_code") {
            Some(code) => {
                if self.codes.check_verified(&email, code) {
                    StepRun::done()
                } else {
                    StepRun::Abort(FlowError::InvalidEmail { backend: ctx.backend.clone() })
                }
            }
            None => {
                let token = scope.partial_token().expect("token allocated").to_string();
                self.codes.issue(&email, &token);
                StepRun::Suspend { redirect: "/accounts/email-sent/".into() }
            }
        }
    }
}

struct Finish;

impl Step for Finish {
    fn id(&self) -> &'static str {
        "finish"
    }

    fn execute(&self, _ctx: &Context, _scope: &mut RequestScope) -> StepRun {
        StepRun::done()
    }
}

struct Fixture {
    engine: PipelineEngine<InMemoryPartialStore, InMemoryCodeStore, InMemoryAttemptLog>,
    partials: Arc<InMemoryPartialStore>,
    codes: Arc<InMemoryCodeStore>,
    definition: PipelineDefinition,
}

fn fixture() -> Fixture {
    let partials = Arc::new(InMemoryPartialStore::new());
    let codes = Arc::new(InMemoryCodeStore::new());
    let engine = PipelineEngine::new(Arc::clone(&partials), Arc::clone(&codes), Arc::new(InMemoryAttemptLog::new()));
    let definition = PipelineDefinition::new(vec![
        Box::new(EmailGate { codes: Arc::clone(&codes) }),
        Box::new(Finish),
    ]);
    Fixture { engine, partials, codes, definition }
}

fn context() -> Context {
    let details = ProfileDetails { email: Some("nijel@example.com".into()), ..Default::default() };
    Context::new("email", "nijel@example.com", details)
}

#[test]
fn suspend_persists_a_checkpoint_and_resume_completes() {
    let f = fixture();
    let mut scope = RequestScope::new();

    let outcome = f.engine.run(&f.definition, context(), &mut scope);
    let token = match outcome {
        Outcome::Suspended { partial_token, redirect } => {
            assert_eq!(redirect, "/accounts/email-sent/");
            partial_token
        }
        other => panic!("expected suspension, got {other:?}"),
    };
    assert_eq!(f.partials.len(), 1);

    let code = f.codes.latest_for("nijel@example.com").expect("code issued");
    let mut resume_scope = RequestScope::new();
    let outcome = f.engine.resume(&f.definition, &token, &code.code, &mut resume_scope);
    match outcome {
        Outcome::Completed(ctx) => assert_eq!(ctx.details.email.as_deref(), Some("nijel@example.com")),
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(f.partials.is_empty());
}

#[test]
fn a_partial_token_is_single_use() {
    let f = fixture();
    let mut scope = RequestScope::new();

    let Outcome::Suspended { partial_token, .. } = f.engine.run(&f.definition, context(), &mut scope) else {
        panic!("expected suspension");
    };
    let code = f.codes.latest_for("nijel@example.com").expect("code issued");

    let mut first = RequestScope::new();
    assert!(f.engine.resume(&f.definition, &partial_token, &code.code, &mut first).is_completed());

    let mut second = RequestScope::new();
    match f.engine.resume(&f.definition, &partial_token, &code.code, &mut second) {
        Outcome::Aborted { step_id, error } => {
            assert_eq!(step_id, RESUME_STAGE);
            assert_eq!(error, FlowError::PartialNotFound);
        }
        other => panic!("expected not-found abort, got {other:?}"),
    }
}

#[test]
fn wrong_code_leaves_the_checkpoint_in_place() {
    let f = fixture();
    let mut scope = RequestScope::new();

    let Outcome::Suspended { partial_token, .. } = f.engine.run(&f.definition, context(), &mut scope) else {
        panic!("expected suspension");
    };

    let mut bad = RequestScope::new();
    match f.engine.resume(&f.definition, &partial_token, "not-the-code", &mut bad) {
        Outcome::Aborted { error, .. } => {
            assert_eq!(error, FlowError::InvalidEmail { backend: "email".into() });
        }
        other => panic!("expected invalid email, got {other:?}"),
    }
    assert_eq!(f.partials.len(), 1);

    // El código correcto sigue siendo utilizable después del intento fallido.
    let code = f.codes.latest_for("nijel@example.com").expect("code issued");
    let mut good = RequestScope::new();
    assert!(f.engine.resume(&f.definition, &partial_token, &code.code, &mut good).is_completed());
}

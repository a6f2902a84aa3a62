use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use form_spec::{
    AnswerSet, AnswerValue, FillSession, Form, FormSubmission, SessionError, SubmissionPayload,
    SubmissionTransport, SubmitError, TransportError,
};

fn membership_form() -> Form {
    serde_json::from_str(include_str!("../tests/fixtures/membership_form.json"))
        .expect("deserialize")
}

#[derive(Default)]
struct RecordingTransport {
    calls: AtomicUsize,
    payloads: Mutex<Vec<SubmissionPayload>>,
    fail: bool,
}

#[async_trait]
impl SubmissionTransport for RecordingTransport {
    async fn submit(
        &self,
        form_id: &str,
        payload: &SubmissionPayload,
    ) -> Result<FormSubmission, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail {
            return Err(TransportError::Unavailable("backend offline".into()));
        }
        self.payloads.lock().expect("lock").push(payload.clone());
        Ok(FormSubmission::from_payload(
            format!("sub-{call}"),
            form_id,
            "2026-10-19T10:00:00Z",
            payload,
        ))
    }
}

fn filled_session(form: Form) -> FillSession {
    let mut session = FillSession::new(form);
    session.set_answer("name", "Phoebe".into()).expect("name");
    session.set_answer("age", AnswerValue::Number(52.0)).expect("age");
    session.set_answer("baptized", "no".into()).expect("baptized");
    session
}

#[test]
fn unknown_questions_are_refused() {
    let mut session = FillSession::new(membership_form());
    let error = session
        .set_answer("shoe_size", "42".into())
        .expect_err("unknown question");
    assert_eq!(error, SessionError::UnknownQuestion("shoe_size".into()));
    assert!(session.answers().is_empty());
}

#[test]
fn draft_resumes_into_a_new_session() {
    let draft = filled_session(membership_form()).into_answers();
    let bytes = draft.to_cbor().expect("encode");
    let restored = AnswerSet::from_cbor(&bytes).expect("decode");

    let session = FillSession::resume(membership_form(), restored).expect("resume");
    assert_eq!(session.answers(), &draft);
    assert!(session.states().is_included("name"));
}

#[test]
fn resume_checks_form_identity() {
    let draft = AnswerSet::new("other-form");
    let error = FillSession::resume(membership_form(), draft).expect_err("mismatch");
    assert!(matches!(error, SessionError::FormMismatch { .. }));
}

#[test]
fn field_validation_follows_current_states() {
    let mut session = filled_session(membership_form());
    assert!(session.validate_question("baptism_date").expect("known").is_empty());

    session.set_answer("baptized", "yes".into()).expect("baptized");
    let errors = session.validate_question("baptism_date").expect("known");
    assert_eq!(errors.len(), 1);
}

#[tokio::test]
async fn submit_sends_only_included_answers() {
    let mut session = filled_session(membership_form());
    session
        .set_answer("baptism_date", "1999-01-01".into())
        .expect("stale answer");
    let transport = RecordingTransport::default();

    let submission = session.submit(&transport).await.expect("submitted");
    assert_eq!(submission.form_id, "membership");
    assert_eq!(submission.answer("name"), Some(&AnswerValue::from("Phoebe")));
    assert!(submission.answer("baptism_date").is_none());
    assert_eq!(session.submission_count(), 1);
    assert!(!session.is_submitting());

    let payloads = transport.payloads.lock().expect("lock");
    assert!(!payloads[0].responses.contains_key("baptism_date"));
}

#[tokio::test]
async fn invalid_answers_never_reach_transport() {
    let mut session = FillSession::new(membership_form());
    session.set_answer("name", "Phoebe".into()).expect("name");
    let before = session.answers().clone();
    let transport = RecordingTransport::default();

    let error = session.submit(&transport).await.expect_err("rejected");
    let rejected = match error {
        SubmitError::Rejected(rejected) => rejected,
        other => panic!("expected validation rejection, got {other:?}"),
    };
    assert!(!rejected.errors.is_empty());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.answers(), &before);
}

#[tokio::test]
async fn transport_errors_propagate_unchanged() {
    let session = filled_session(membership_form());
    let transport = RecordingTransport {
        fail: true,
        ..Default::default()
    };

    let error = session.submit(&transport).await.expect_err("offline");
    assert!(matches!(
        error,
        SubmitError::Transport(TransportError::Unavailable(ref message))
            if message == "backend offline"
    ));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.submission_count(), 0);
}

#[tokio::test]
async fn concurrent_submit_is_refused() {
    let mut form = membership_form();
    form.settings.allow_multiple_submissions = true;
    let session = filled_session(form);
    let transport = RecordingTransport::default();

    let (first, second) = tokio::join!(session.submit(&transport), session.submit(&transport));
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|outcome| matches!(outcome, Err(SubmitError::InFlight)))
    );
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

    session.submit(&transport).await.expect("flag released");
    assert_eq!(session.submission_count(), 2);
}

#[tokio::test]
async fn settings_gate_submission() {
    let transport = RecordingTransport::default();

    let mut inactive = membership_form();
    inactive.settings.is_active = false;
    let error = filled_session(inactive).submit(&transport).await.expect_err("inactive");
    assert!(matches!(error, SubmitError::FormInactive(_)));

    let mut login = membership_form();
    login.settings.requires_login = true;
    let error = filled_session(login.clone())
        .submit(&transport)
        .await
        .expect_err("login");
    assert!(matches!(error, SubmitError::LoginRequired(_)));
    filled_session(login)
        .with_authenticated(true)
        .submit(&transport)
        .await
        .expect("authenticated");

    let once = filled_session(membership_form());
    once.submit(&transport).await.expect("first");
    let error = once.submit(&transport).await.expect_err("second");
    assert!(matches!(error, SubmitError::AlreadySubmitted(_)));
}

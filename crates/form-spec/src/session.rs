//! One fill-out session: the answers being entered for a form and the
//! single submit call to the persistence collaborator.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::answers::{AnswerSet, ValidationError};
use crate::evaluate::effective_answer;
use crate::resolve::{DerivedStateMap, resolve};
use crate::spec::form::Form;
use crate::submission::{FormSubmission, SubmissionPayload, SubmissionRejected, assemble};
use crate::validate::validate_field;
use crate::value::AnswerValue;

/// Failure reported by a submission transport. Passed to the caller as is.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("submission rejected by backend (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("submission backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Stores an assembled payload and returns the created record.
///
/// Called at most once per submit attempt; retrying is up to the
/// implementation.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    async fn submit(
        &self,
        form_id: &str,
        payload: &SubmissionPayload,
    ) -> Result<FormSubmission, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("question '{0}' does not exist in this form")]
    UnknownQuestion(String),
    #[error("answers belong to form '{found}', expected '{expected}'")]
    FormMismatch { expected: String, found: String },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("form '{0}' is not accepting submissions")]
    FormInactive(String),
    #[error("form '{0}' requires login")]
    LoginRequired(String),
    #[error("form '{0}' was already submitted in this session")]
    AlreadySubmitted(String),
    #[error("a submission for this session is already in flight")]
    InFlight,
    #[error(transparent)]
    Rejected(#[from] SubmissionRejected),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Answers being entered for one form, plus the submit bookkeeping.
#[derive(Debug)]
pub struct FillSession {
    form: Form,
    answers: AnswerSet,
    authenticated: bool,
    submissions: AtomicUsize,
    in_flight: AtomicBool,
}

impl FillSession {
    pub fn new(form: Form) -> Self {
        let answers = AnswerSet::new(form.id.clone());
        Self {
            form,
            answers,
            authenticated: false,
            submissions: AtomicUsize::new(0),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Resumes a session from a saved draft.
    pub fn resume(form: Form, answers: AnswerSet) -> Result<Self, SessionError> {
        if answers.form_id != form.id {
            return Err(SessionError::FormMismatch {
                expected: form.id.clone(),
                found: answers.form_id,
            });
        }
        let mut session = Self::new(form);
        for (question_id, value) in answers.answers {
            session.set_answer(question_id, value)?;
        }
        session.answers.meta = answers.meta;
        Ok(session)
    }

    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    /// Hands the answers back, e.g. to persist them as a draft.
    pub fn into_answers(self) -> AnswerSet {
        self.answers
    }

    /// Stores one answer. Ids the form does not define are refused so the
    /// answers only ever describe this form's questions.
    pub fn set_answer(
        &mut self,
        question_id: impl Into<String>,
        value: AnswerValue,
    ) -> Result<Option<AnswerValue>, SessionError> {
        let question_id = question_id.into();
        if self.form.find_question(&question_id).is_none() {
            return Err(SessionError::UnknownQuestion(question_id));
        }
        Ok(self.answers.set(question_id, value))
    }

    pub fn clear_answer(&mut self, question_id: &str) -> Result<Option<AnswerValue>, SessionError> {
        if self.form.find_question(question_id).is_none() {
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        }
        Ok(self.answers.clear(question_id))
    }

    pub fn states(&self) -> DerivedStateMap {
        resolve(&self.form, &self.answers)
    }

    /// Per-field check for blur/change events.
    pub fn validate_question(
        &self,
        question_id: &str,
    ) -> Result<Vec<ValidationError>, SessionError> {
        let question = self
            .form
            .find_question(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;
        let states = self.states();
        let Some(state) = states.question(question_id) else {
            return Ok(Vec::new());
        };
        let value = effective_answer(question, &self.answers);
        Ok(validate_field(question, state, Some(&value)))
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.load(Ordering::Acquire)
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validates, assembles and sends the answers.
    ///
    /// Only one submit may be in flight per session; a second call made while
    /// the first is pending fails with [`SubmitError::InFlight`]. The answers
    /// are left untouched whatever the outcome.
    pub async fn submit(
        &self,
        transport: &dyn SubmissionTransport,
    ) -> Result<FormSubmission, SubmitError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SubmitError::InFlight)?;

        let settings = &self.form.settings;
        if !settings.is_active {
            return Err(SubmitError::FormInactive(self.form.id.clone()));
        }
        if settings.requires_login && !self.authenticated {
            return Err(SubmitError::LoginRequired(self.form.id.clone()));
        }
        if !settings.allow_multiple_submissions && self.submission_count() > 0 {
            return Err(SubmitError::AlreadySubmitted(self.form.id.clone()));
        }

        let states = self.states();
        let payload = assemble(&self.form, &self.answers, &states).inspect_err(|rejected| {
            debug!(
                form_id = %self.form.id,
                errors = rejected.errors.len(),
                "submission refused by validation"
            );
        })?;

        let submission = transport.submit(&self.form.id, &payload).await?;
        self.submissions.fetch_add(1, Ordering::AcqRel);
        info!(
            form_id = %self.form.id,
            submission_id = %submission.id,
            responses = payload.responses.len(),
            "form submitted"
        );
        Ok(submission)
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

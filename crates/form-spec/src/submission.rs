use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::{AnswerSet, ValidationError};
use crate::evaluate::effective_answer;
use crate::resolve::DerivedStateMap;
use crate::spec::form::Form;
use crate::validate::validate_field;
use crate::value::AnswerValue;

/// Body handed to the submission transport: `{ "responses": { questionId: value } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionPayload {
    pub responses: BTreeMap<String, AnswerValue>,
}

/// Submit refused because included questions failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("submission rejected with {} validation error(s)", .errors.len())]
pub struct SubmissionRejected {
    pub errors: Vec<ValidationError>,
}

/// Builds the payload for the included questions (visible and not skipped).
///
/// Hidden or skipped questions are left out even when the answers still hold
/// a stale value for them. An unanswered included question is sent with its
/// configured default value rather than as empty; only questions without a
/// default get the empty value of their field type. Nothing is built if any
/// included question fails validation.
pub fn assemble(
    form: &Form,
    answers: &AnswerSet,
    states: &DerivedStateMap,
) -> Result<SubmissionPayload, SubmissionRejected> {
    let mut responses = BTreeMap::new();
    let mut errors = Vec::new();

    for question in form.ordered_questions() {
        let Some(state) = states.question(&question.id) else {
            continue;
        };
        if !state.is_included() {
            continue;
        }

        let value = effective_answer(question, answers);
        errors.extend(validate_field(question, state, Some(&value)));
        responses.insert(question.id.clone(), value);
    }

    if errors.is_empty() {
        Ok(SubmissionPayload { responses })
    } else {
        Err(SubmissionRejected { errors })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
}

/// One stored answer of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormAnswer {
    pub id: String,
    pub submission_id: String,
    pub question_id: String,
    pub answer: AnswerValue,
    pub created_at: String,
}

/// Immutable record returned by the transport once a submission is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: String,
    pub form_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    pub status: SubmissionStatus,
    pub submitted_at: String,
    #[serde(default)]
    pub metadata: SubmissionMetadata,
    #[serde(default)]
    pub answers: Vec<FormAnswer>,
}

impl FormSubmission {
    /// Record for a freshly stored payload; answer ids derive from the
    /// submission id.
    pub fn from_payload(
        id: impl Into<String>,
        form_id: impl Into<String>,
        submitted_at: impl Into<String>,
        payload: &SubmissionPayload,
    ) -> Self {
        let id = id.into();
        let submitted_at = submitted_at.into();
        let answers = payload
            .responses
            .iter()
            .map(|(question_id, answer)| FormAnswer {
                id: format!("{id}-{question_id}"),
                submission_id: id.clone(),
                question_id: question_id.clone(),
                answer: answer.clone(),
                created_at: submitted_at.clone(),
            })
            .collect();

        Self {
            id,
            form_id: form_id.into(),
            person_id: None,
            status: SubmissionStatus::Submitted,
            submitted_at,
            metadata: SubmissionMetadata::default(),
            answers,
        }
    }

    pub fn answer(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers
            .iter()
            .find(|answer| answer.question_id == question_id)
            .map(|answer| &answer.answer)
    }
}

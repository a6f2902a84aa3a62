use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};

use crate::value::AnswerValue;

/// Optional metadata paired with an `AnswerSet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// In-progress answers of one fill-out session, keyed by question id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerSet {
    pub form_id: String,
    #[serde(default)]
    pub answers: BTreeMap<String, AnswerValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl AnswerSet {
    /// Creates a fresh empty answer set for a form.
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            answers: BTreeMap::new(),
            meta: None,
        }
    }

    pub fn with_answers(
        form_id: impl Into<String>,
        answers: impl IntoIterator<Item = (String, AnswerValue)>,
    ) -> Self {
        Self {
            form_id: form_id.into(),
            answers: answers.into_iter().collect(),
            meta: None,
        }
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    /// Stores an answer, returning the value it replaced.
    pub fn set(
        &mut self,
        question_id: impl Into<String>,
        value: AnswerValue,
    ) -> Option<AnswerValue> {
        self.answers.insert(question_id.into(), value)
    }

    pub fn clear(&mut self, question_id: &str) -> Option<AnswerValue> {
        self.answers.remove(question_id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Serializes the answer set as canonical CBOR bytes, used for drafts.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }

    /// Restores a draft written by [`AnswerSet::to_cbor`].
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }

    /// Serializes the answer set as indented JSON for debugging.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Categories of field validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    Required,
    Type,
    Range,
    Length,
    Pattern,
}

/// One violated constraint on one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    pub question_id: String,
    pub path: String,
    pub kind: ValidationErrorKind,
    pub message: String,
    pub code: String,
}

/// Whole-form validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<String>,
}

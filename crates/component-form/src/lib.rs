use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use form_spec::{
    AnswerSet, AnswerValue, DerivedStateMap, Form, SubmissionRejected, answers_schema, assemble,
    resolve, validate, validate_field as validate_single_field,
};

const DEFAULT_FORM: &str = include_str!("../../form-spec/tests/fixtures/membership_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse answers: {0}")]
    AnswersParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("question '{0}' does not exist in this form")]
    UnknownQuestion(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_json: Option<String>,
}

fn load_form(config_json: &str) -> Result<Form, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let form_json = config.form_json.as_deref().unwrap_or(DEFAULT_FORM);

    serde_json::from_str(form_json).map_err(ComponentError::ConfigParse)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<Form, ComponentError> {
    let form = load_form(config_json)?;
    if form.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(form)
    }
}

/// Answers arrive as `{ questionId: value }`; `null` means "not answered".
fn parse_answers(form: &Form, answers_json: &str) -> Result<AnswerSet, ComponentError> {
    if answers_json.trim().is_empty() {
        return Ok(AnswerSet::new(form.id.clone()));
    }
    let raw: BTreeMap<String, Option<AnswerValue>> =
        serde_json::from_str(answers_json).map_err(ComponentError::AnswersParse)?;
    Ok(AnswerSet::with_answers(
        form.id.clone(),
        raw.into_iter()
            .filter_map(|(question_id, value)| value.map(|value| (question_id, value))),
    ))
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => {
            debug!(error = %err, "component call failed");
            json!({ "error": err.to_string() }).to_string()
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| encode(&form)))
}

/// Derived states of every section and question for the given answers.
pub fn resolve_states(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let answers = parse_answers(&form, answers_json)?;
        encode(&resolve(&form, &answers))
    }))
}

/// Per-field check the UI runs on blur/change.
pub fn validate_field(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
    question_id: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let question = form
            .find_question(question_id)
            .ok_or_else(|| ComponentError::UnknownQuestion(question_id.to_string()))?;
        let answers = parse_answers(&form, answers_json)?;
        let states = resolve(&form, &answers);
        let errors = match states.question(question_id) {
            Some(state) => {
                let value = form_spec::effective_answer(question, &answers);
                validate_single_field(question, state, Some(&value))
            }
            None => Vec::new(),
        };
        Ok(json!({
            "question_id": question_id,
            "state": encode(&states.question(question_id))?,
            "errors": encode(&errors)?,
        }))
    }))
}

pub fn validate_answers(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let answers = parse_answers(&form, answers_json)?;
        encode(&validate(&form, &answers))
    }))
}

pub fn get_answer_schema(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let answers = parse_answers(&form, answers_json)?;
        let states = resolve(&form, &answers);
        Ok(answers_schema(&form, &states))
    }))
}

fn build_error_response(
    answers: &AnswerSet,
    states: &DerivedStateMap,
    rejected: &SubmissionRejected,
) -> Result<Value, ComponentError> {
    Ok(json!({
        "status": "error",
        "answers": encode(&answers.answers)?,
        "states": encode(states)?,
        "validation": { "errors": encode(&rejected.errors)? },
    }))
}

/// Applies one answer, then reports the new states and whether the form is
/// ready to submit.
pub fn submit_patch(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
    question_id: &str,
    value_json: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        if form.find_question(question_id).is_none() {
            return Err(ComponentError::UnknownQuestion(question_id.to_string()));
        }
        let mut answers = parse_answers(&form, answers_json)?;
        let value: Option<AnswerValue> =
            serde_json::from_str(value_json).map_err(ComponentError::AnswersParse)?;
        match value {
            Some(value) => answers.set(question_id, value),
            None => answers.clear(question_id),
        };

        let states = resolve(&form, &answers);
        let validation = validate(&form, &answers);
        let field_errors = validation
            .errors
            .iter()
            .filter(|error| error.question_id == question_id)
            .cloned()
            .collect::<Vec<_>>();

        let status = if !field_errors.is_empty() {
            "error"
        } else if validation.valid {
            "complete"
        } else {
            "need_input"
        };

        Ok(json!({
            "status": status,
            "answers": encode(&answers.answers)?,
            "states": encode(&states)?,
            "validation": encode(&validation)?,
        }))
    }))
}

/// Validates everything and returns the payload the transport would receive.
pub fn submit_all(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let answers = parse_answers(&form, answers_json)?;
        let states = resolve(&form, &answers);
        match assemble(&form, &answers, &states) {
            Ok(payload) => Ok(json!({
                "status": "complete",
                "payload": encode(&payload)?,
                "states": encode(&states)?,
            })),
            Err(rejected) => build_error_response(&answers, &states, &rejected),
        }
    }))
}

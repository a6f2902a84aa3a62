use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use tracing::warn;

use crate::answers::{AnswerSet, ValidationError, ValidationErrorKind, ValidationResult};
use crate::resolve::{DerivedState, resolve};
use crate::spec::form::Form;
use crate::spec::question::{FieldType, FormQuestion, ValidationRules};
use crate::value::AnswerValue;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));
static TEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()./-]{2,}$").expect("tel regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("url regex"));

const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Validates one answer against a question and its derived state.
///
/// Hidden or skipped questions accept anything. Otherwise the required check
/// runs first; a non-empty value then collects every type, range, length and
/// pattern violation instead of stopping at the first one.
pub fn validate_field(
    question: &FormQuestion,
    state: &DerivedState,
    value: Option<&AnswerValue>,
) -> Vec<ValidationError> {
    if !state.is_included() {
        return Vec::new();
    }

    let value = match value {
        Some(value) if !value.is_empty_for(question.kind) => value,
        _ => {
            if state.required {
                return vec![error(
                    question,
                    ValidationErrorKind::Required,
                    "required",
                    "this field is required".into(),
                )];
            }
            return Vec::new();
        }
    };

    let mut errors = Vec::new();
    if let Some(message) = type_violation(question, value) {
        errors.push(error(question, ValidationErrorKind::Type, "type_mismatch", message));
    }
    if let Some(message) = option_violation(question, value) {
        errors.push(error(question, ValidationErrorKind::Type, "invalid_option", message));
    }
    if let Some(rules) = &question.settings.validation {
        enforce_rules(question, value, rules, &mut errors);
    }
    errors
}

/// Validates every answer of a form against freshly resolved states.
pub fn validate(form: &Form, answers: &AnswerSet) -> ValidationResult {
    let states = resolve(form, answers);
    let mut errors = Vec::new();

    for question in form.ordered_questions() {
        let Some(state) = states.question(&question.id) else {
            continue;
        };
        let value = answers.get(&question.id).or_else(|| question.default_value());
        errors.extend(validate_field(question, state, value));
    }

    let missing_required = errors
        .iter()
        .filter(|error| error.kind == ValidationErrorKind::Required)
        .map(|error| error.question_id.clone())
        .collect::<Vec<_>>();

    let known: BTreeSet<&str> = form.question_ids().collect();
    let unknown_fields = answers
        .answers
        .keys()
        .filter(|key| !known.contains(key.as_str()))
        .cloned()
        .collect::<Vec<_>>();

    ValidationResult {
        valid: errors.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}

fn type_violation(question: &FormQuestion, value: &AnswerValue) -> Option<String> {
    let scalar_text = || value.as_text().map(|text| text.trim().to_string());

    let ok = match question.kind {
        FieldType::Text | FieldType::Textarea | FieldType::Select | FieldType::Radio => {
            !value.is_set()
        }
        FieldType::Number => value.as_number().is_some(),
        FieldType::Email => scalar_text().is_some_and(|text| EMAIL.is_match(&text)),
        FieldType::Tel => scalar_text().is_some_and(|text| TEL.is_match(&text)),
        FieldType::Url => scalar_text().is_some_and(|text| URL.is_match(&text)),
        FieldType::Date => {
            scalar_text().is_some_and(|text| NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_ok())
        }
        FieldType::Time => scalar_text().is_some_and(|text| {
            TIME_FORMATS
                .iter()
                .any(|format| NaiveTime::parse_from_str(&text, format).is_ok())
        }),
        FieldType::Datetime => scalar_text().is_some_and(|text| {
            DATETIME_FORMATS
                .iter()
                .any(|format| NaiveDateTime::parse_from_str(&text, format).is_ok())
        }),
        FieldType::Checkbox => !matches!(value, AnswerValue::Number(_)),
        FieldType::Multiselect => !matches!(value, AnswerValue::Bool(_) | AnswerValue::Number(_)),
    };

    (!ok).then(|| format!("expected a {} value", question.kind.as_str()))
}

fn option_violation(question: &FormQuestion, value: &AnswerValue) -> Option<String> {
    if !question.kind.uses_options() || question.options().is_empty() || question.accepts_other() {
        return None;
    }
    // A lone checkbox answers yes/no rather than picking options.
    if matches!(value, AnswerValue::Bool(_)) && question.kind == FieldType::Checkbox {
        return None;
    }

    let allowed: BTreeSet<String> = question
        .options()
        .iter()
        .filter_map(|option| option.value.as_text())
        .collect();
    let invalid = value
        .as_set()
        .into_iter()
        .filter(|member| !allowed.contains(member))
        .collect::<Vec<_>>();

    (!invalid.is_empty()).then(|| format!("not an available option: {}", invalid.join(", ")))
}

fn enforce_rules(
    question: &FormQuestion,
    value: &AnswerValue,
    rules: &ValidationRules,
    errors: &mut Vec<ValidationError>,
) {
    let message = |fallback: String| rules.error_message.clone().unwrap_or(fallback);

    let measured = if question.kind == FieldType::Number {
        value.as_number()
    } else if question.kind.is_multi_valued() && value.is_set() {
        Some(value.as_set().len() as f64)
    } else {
        None
    };

    if let Some(min) = rules.min
        && let Some(measured) = measured
        && measured < min
    {
        errors.push(error(
            question,
            ValidationErrorKind::Range,
            "min",
            message(format!("value below minimum {min}")),
        ));
    }

    if let Some(max) = rules.max
        && let Some(measured) = measured
        && measured > max
    {
        errors.push(error(
            question,
            ValidationErrorKind::Range,
            "max",
            message(format!("value above maximum {max}")),
        ));
    }

    let text = (!value.is_set()).then(|| value.as_text()).flatten();

    if let Some(min_length) = rules.min_length
        && let Some(text) = &text
        && text.chars().count() < min_length
    {
        errors.push(error(
            question,
            ValidationErrorKind::Length,
            "min_length",
            message(format!("shorter than {min_length} characters")),
        ));
    }

    if let Some(max_length) = rules.max_length
        && let Some(text) = &text
        && text.chars().count() > max_length
    {
        errors.push(error(
            question,
            ValidationErrorKind::Length,
            "max_length",
            message(format!("longer than {max_length} characters")),
        ));
    }

    if let Some(pattern) = &rules.pattern
        && let Some(text) = &text
    {
        match Regex::new(pattern) {
            Ok(regex) if !regex.is_match(text) => errors.push(error(
                question,
                ValidationErrorKind::Pattern,
                "pattern_mismatch",
                message("value does not match pattern".into()),
            )),
            Ok(_) => {}
            Err(err) => warn!(
                question_id = %question.id,
                pattern = %pattern,
                error = %err,
                "ignoring unusable validation pattern"
            ),
        }
    }
}

fn error(
    question: &FormQuestion,
    kind: ValidationErrorKind,
    code: &str,
    message: String,
) -> ValidationError {
    ValidationError {
        question_id: question.id.clone(),
        path: format!("/responses/{}", question.id),
        kind,
        message,
        code: code.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::question::{QuestionOption, QuestionSettings};

    fn question(kind: FieldType, rules: Option<ValidationRules>) -> FormQuestion {
        FormQuestion {
            id: "q".into(),
            section_id: "s".into(),
            kind,
            label: "Q".into(),
            description: None,
            is_required: false,
            order: 0,
            settings: QuestionSettings {
                validation: rules,
                ..Default::default()
            },
            field_mapping: None,
        }
    }

    fn kinds(errors: &[ValidationError]) -> Vec<ValidationErrorKind> {
        errors.iter().map(|error| error.kind).collect()
    }

    #[test]
    fn required_empty_value_reports_required() {
        let q = question(FieldType::Text, None);
        let errors = validate_field(&q, &DerivedState::visible(true), Some(&"".into()));
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::Required]);
        let errors = validate_field(&q, &DerivedState::visible(true), None);
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::Required]);
    }

    #[test]
    fn hidden_or_skipped_fields_accept_anything() {
        let q = question(FieldType::Number, None);
        let mut hidden = DerivedState::visible(true);
        hidden.visible = false;
        assert!(validate_field(&q, &hidden, Some(&"abc".into())).is_empty());

        let mut skipped = DerivedState::visible(true);
        skipped.skipped = true;
        assert!(validate_field(&q, &skipped, None).is_empty());
    }

    #[test]
    fn violations_accumulate() {
        let q = question(
            FieldType::Text,
            Some(ValidationRules {
                max_length: Some(3),
                pattern: Some("^[0-9]+$".into()),
                error_message: Some("Use up to three digits".into()),
                ..Default::default()
            }),
        );
        let errors = validate_field(&q, &DerivedState::visible(false), Some(&"abcd".into()));
        assert_eq!(
            kinds(&errors),
            vec![ValidationErrorKind::Length, ValidationErrorKind::Pattern]
        );
        assert!(errors.iter().all(|error| error.message == "Use up to three digits"));
    }

    #[test]
    fn number_fields_check_type_and_range() {
        let q = question(
            FieldType::Number,
            Some(ValidationRules {
                min: Some(0.0),
                max: Some(120.0),
                ..Default::default()
            }),
        );
        let state = DerivedState::visible(false);
        assert_eq!(
            kinds(&validate_field(&q, &state, Some(&"abc".into()))),
            vec![ValidationErrorKind::Type]
        );
        assert_eq!(
            kinds(&validate_field(&q, &state, Some(&AnswerValue::Number(130.0)))),
            vec![ValidationErrorKind::Range]
        );
        assert!(validate_field(&q, &state, Some(&"42".into())).is_empty());
    }

    #[test]
    fn formatted_text_types_are_checked() {
        let state = DerivedState::visible(false);
        let email = question(FieldType::Email, None);
        assert!(validate_field(&email, &state, Some(&"pastor@example.org".into())).is_empty());
        assert!(!validate_field(&email, &state, Some(&"pastor".into())).is_empty());

        let date = question(FieldType::Date, None);
        assert!(validate_field(&date, &state, Some(&"2024-02-29".into())).is_empty());
        assert!(!validate_field(&date, &state, Some(&"2023-02-29".into())).is_empty());

        let datetime = question(FieldType::Datetime, None);
        assert!(validate_field(&datetime, &state, Some(&"2024-05-01T09:30".into())).is_empty());

        let url = question(FieldType::Url, None);
        assert!(!validate_field(&url, &state, Some(&"not a url".into())).is_empty());
    }

    #[test]
    fn choice_fields_reject_unknown_options() {
        let mut q = question(FieldType::Multiselect, None);
        q.settings.options = Some(vec![
            QuestionOption {
                label: "Choir".into(),
                value: "choir".into(),
                is_other: false,
            },
            QuestionOption {
                label: "Youth".into(),
                value: "youth".into(),
                is_other: false,
            },
        ]);
        let state = DerivedState::visible(false);
        let picked = AnswerValue::Set(vec!["choir".into(), "parking".into()]);
        let errors = validate_field(&q, &state, Some(&picked));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "invalid_option");
    }

    #[test]
    fn unchecked_required_checkbox_is_missing() {
        let q = question(FieldType::Checkbox, None);
        let unchecked = AnswerValue::Bool(false);
        let errors = validate_field(&q, &DerivedState::visible(true), Some(&unchecked));
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::Required]);
    }

    #[test]
    fn unusable_pattern_is_ignored() {
        let q = question(
            FieldType::Text,
            Some(ValidationRules {
                pattern: Some("([".into()),
                ..Default::default()
            }),
        );
        assert!(validate_field(&q, &DerivedState::visible(false), Some(&"x".into())).is_empty());
    }
}

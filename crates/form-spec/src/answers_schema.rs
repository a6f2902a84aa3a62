use serde_json::{Map, Value, json};

use crate::resolve::DerivedStateMap;
use crate::spec::form::Form;
use crate::spec::question::{FieldType, FormQuestion};

/// JSON Schema of the submission payload for the currently included questions.
pub fn generate(form: &Form, states: &DerivedStateMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for question in form.ordered_questions() {
        let Some(state) = states.question(&question.id) else {
            continue;
        };
        if !state.is_included() {
            continue;
        }
        properties.insert(question.id.clone(), question_schema(question));
        if state.required {
            required.push(Value::String(question.id.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": form.title,
        "type": "object",
        "properties": {
            "responses": {
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }
        },
        "required": ["responses"],
    })
}

fn question_schema(question: &FormQuestion) -> Value {
    let mut schema = match question.kind {
        FieldType::Number => json!({ "type": ["number", "string"] }),
        FieldType::Checkbox => json!({
            "oneOf": [
                { "type": "boolean" },
                { "type": "array", "items": option_schema(question), "uniqueItems": true }
            ]
        }),
        FieldType::Multiselect => json!({
            "type": "array",
            "items": option_schema(question),
            "uniqueItems": true,
        }),
        FieldType::Select | FieldType::Radio => option_schema(question),
        _ => json!({ "type": "string" }),
    };

    let Some(object) = schema.as_object_mut() else {
        return schema;
    };
    object.insert("title".into(), Value::String(question.label.clone()));
    if let Some(description) = &question.description {
        object.insert("description".into(), Value::String(description.clone()));
    }
    if let Some(format) = string_format(question.kind) {
        object.insert("format".into(), Value::String(format.into()));
    }
    if let Some(rules) = &question.settings.validation {
        if let Some(pattern) = &rules.pattern {
            object.insert("pattern".into(), Value::String(pattern.clone()));
        }
        if let Some(min_length) = rules.min_length {
            object.insert("minLength".into(), json!(min_length));
        }
        if let Some(max_length) = rules.max_length {
            object.insert("maxLength".into(), json!(max_length));
        }
        if question.kind == FieldType::Number {
            if let Some(min) = rules.min {
                object.insert("minimum".into(), json!(min));
            }
            if let Some(max) = rules.max {
                object.insert("maximum".into(), json!(max));
            }
        }
    }
    if let Some(default) = question.default_value() {
        object.insert("default".into(), json!(default));
    }

    schema
}

fn option_schema(question: &FormQuestion) -> Value {
    if question.options().is_empty() || question.accepts_other() {
        return json!({ "type": "string" });
    }
    let values = question
        .options()
        .iter()
        .filter_map(|option| option.value.as_text())
        .map(Value::String)
        .collect::<Vec<_>>();
    json!({ "type": "string", "enum": values })
}

fn string_format(kind: FieldType) -> Option<&'static str> {
    match kind {
        FieldType::Email => Some("email"),
        FieldType::Url => Some("uri"),
        FieldType::Date => Some("date"),
        FieldType::Time => Some("time"),
        FieldType::Datetime => Some("date-time"),
        _ => None,
    }
}

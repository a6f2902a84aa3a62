use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::condition::ConditionalLogic;
use crate::value::AnswerValue;

/// Supported question field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Email,
    Tel,
    Url,
    Date,
    Time,
    #[serde(rename = "datetime-local", alias = "datetime")]
    Datetime,
    Select,
    Radio,
    Checkbox,
    Multiselect,
}

impl FieldType {
    /// Fields whose answer may be a set of selected option values.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, FieldType::Checkbox | FieldType::Multiselect)
    }

    /// Fields whose answer must be one of the configured options.
    pub fn uses_options(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::Radio | FieldType::Checkbox | FieldType::Multiselect
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Email => "email",
            FieldType::Tel => "tel",
            FieldType::Url => "url",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Datetime => "datetime-local",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Multiselect => "multiselect",
        }
    }
}

/// One selectable option of a choice field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub label: String,
    pub value: AnswerValue,
    #[serde(default)]
    pub is_other: bool,
}

/// Static constraints checked against a non-empty answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<AnswerValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<QuestionOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<ConditionalLogic>,
}

/// Definition of a single question inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormQuestion {
    pub id: String,
    pub section_id: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub settings: QuestionSettings,
    /// Person field this answer is copied into after submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_mapping: Option<String>,
}

impl FormQuestion {
    pub fn default_value(&self) -> Option<&AnswerValue> {
        self.settings.default_value.as_ref()
    }

    pub fn options(&self) -> &[QuestionOption] {
        self.settings.options.as_deref().unwrap_or_default()
    }

    /// Whether one of the options carries the free-text "other" flag, which
    /// lets answers outside the option list through.
    pub fn accepts_other(&self) -> bool {
        self.options().iter().any(|option| option.is_other)
    }
}

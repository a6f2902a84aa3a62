use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::spec::question::FieldType;

/// Closed set of values an answer or a condition operand can hold.
///
/// On the wire this is untagged: a JSON string, number, boolean or array.
/// Array members are kept as text, so `[1, 2]` selects options "1" and "2".
/// `null` never reaches this type; an absent answer is modelled as
/// `Option::None` by the callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Set(
        #[serde(deserialize_with = "set_members")]
        #[schemars(with = "Vec<String>")]
        Vec<String>,
    ),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SetMember {
    Text(String),
    Number(f64),
    Bool(bool),
}

fn set_members<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let members = Vec::<SetMember>::deserialize(deserializer)?;
    Ok(members
        .into_iter()
        .map(|member| match member {
            SetMember::Text(text) => text,
            SetMember::Number(number) => number.to_string(),
            SetMember::Bool(flag) => flag.to_string(),
        })
        .collect())
}

impl AnswerValue {
    /// The value an unanswered field of `kind` stands for.
    pub fn empty_for(kind: FieldType) -> Self {
        if kind.is_multi_valued() {
            AnswerValue::Set(Vec::new())
        } else {
            AnswerValue::Text(String::new())
        }
    }

    /// Whether the value counts as "not filled in" for a field of `kind`.
    ///
    /// An unchecked single checkbox is empty, so a required consent box has
    /// to be ticked.
    pub fn is_empty_for(&self, kind: FieldType) -> bool {
        match self {
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::Set(items) => items.is_empty(),
            AnswerValue::Bool(flag) => !flag && matches!(kind, FieldType::Checkbox),
            AnswerValue::Number(_) => false,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, AnswerValue::Set(_))
    }

    /// Canonical text form of a scalar. Sets have no single text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            AnswerValue::Text(text) => Some(text.clone()),
            AnswerValue::Number(number) => Some(number.to_string()),
            AnswerValue::Bool(flag) => Some(flag.to_string()),
            AnswerValue::Set(_) => None,
        }
    }

    /// Numeric reading of a scalar; fails for booleans, sets and text that
    /// does not parse to a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Number(number) if number.is_finite() => Some(*number),
            AnswerValue::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite()),
            _ => None,
        }
    }

    /// Members of the value viewed as a selection set.
    pub fn as_set(&self) -> Vec<String> {
        match self {
            AnswerValue::Set(items) => items.clone(),
            AnswerValue::Text(text) if text.trim().is_empty() => Vec::new(),
            other => other.as_text().into_iter().collect(),
        }
    }

    /// Text candidates a string operator is tested against: the scalar
    /// itself, or every member of a set.
    pub fn text_candidates(&self) -> Vec<String> {
        match self {
            AnswerValue::Set(items) => items.clone(),
            other => other.as_text().into_iter().collect(),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        AnswerValue::Number(value)
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        AnswerValue::Bool(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::Set(value)
    }
}

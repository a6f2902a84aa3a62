use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::value::AnswerValue;

/// Comparison applied between the source answer and the condition value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    StartsWith,
    EndsWith,
}

/// Effect a matching condition has on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConditionAction {
    Show,
    Hide,
    Enable,
    Disable,
    Require,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Question,
    Section,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Question => "question",
            TargetKind::Section => "section",
        }
    }
}

/// "If `question_id` satisfies `condition_type` against `condition_value`,
/// apply `action` to the target."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormCondition {
    pub id: String,
    pub question_id: String,
    pub condition_type: ConditionOperator,
    /// `null` compares against the source field's empty value.
    #[serde(default)]
    pub condition_value: Option<AnswerValue>,
    pub action: ConditionAction,
    pub target_id: String,
    pub target_type: TargetKind,
}

impl FormCondition {
    pub fn targets(&self, kind: TargetKind, id: &str) -> bool {
        self.target_type == kind && self.target_id == id
    }
}

/// Conditional-logic block attached to a section or question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionalLogic {
    #[serde(default)]
    pub conditions: Vec<FormCondition>,
}

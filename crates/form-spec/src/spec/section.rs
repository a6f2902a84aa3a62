use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::condition::ConditionalLogic;
use crate::spec::question::FormQuestion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionSettings {
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<ConditionalLogic>,
}

fn default_visible() -> bool {
    true
}

impl Default for SectionSettings {
    fn default() -> Self {
        Self {
            is_visible: true,
            conditional_logic: None,
        }
    }
}

/// A titled group of questions. `form_id` points back at the owning form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSection {
    pub id: String,
    pub form_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub settings: SectionSettings,
    #[serde(default)]
    pub questions: Vec<FormQuestion>,
}

impl FormSection {
    /// Questions in display order; equal `order` values fall back to the id.
    pub fn ordered_questions(&self) -> Vec<&FormQuestion> {
        let mut questions: Vec<&FormQuestion> = self.questions.iter().collect();
        questions.sort_by(|left, right| {
            left.order
                .cmp(&right.order)
                .then_with(|| left.id.cmp(&right.id))
        });
        questions
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::condition::FormCondition;
use crate::spec::question::FormQuestion;
use crate::spec::section::FormSection;

/// Publication and submission settings for a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSettings {
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub requires_login: bool,
    #[serde(default)]
    pub allow_multiple_submissions: bool,
    #[serde(default)]
    pub submitter_can_view_responses: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            is_active: true,
            requires_login: false,
            allow_multiple_submissions: false,
            submitter_can_view_responses: false,
            submit_button_text: None,
            success_message: None,
            redirect_url: None,
        }
    }
}

/// Top-level form definition as authored in the builder.
///
/// The definition is read-only for the whole fill-out session; every engine
/// function borrows it immutably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: FormSettings,
    #[serde(default)]
    pub sections: Vec<FormSection>,
    /// Form-level rules, evaluated ahead of the section and question blocks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<FormCondition>,
}

impl Form {
    /// Sections in display order; equal `order` values fall back to the id.
    pub fn ordered_sections(&self) -> Vec<&FormSection> {
        let mut sections: Vec<&FormSection> = self.sections.iter().collect();
        sections.sort_by(|left, right| {
            left.order
                .cmp(&right.order)
                .then_with(|| left.id.cmp(&right.id))
        });
        sections
    }

    /// Every question of the form, sections and questions both in display order.
    pub fn ordered_questions(&self) -> Vec<&FormQuestion> {
        self.ordered_sections()
            .into_iter()
            .flat_map(|section| section.ordered_questions())
            .collect()
    }

    /// Every condition of the form in declaration order.
    ///
    /// Form-level conditions come first. Then, per section in display order,
    /// the section's own block followed by the blocks of its questions in
    /// display order. The resolver's "later rule wins" policy follows this
    /// order.
    pub fn conditions_in_declaration_order(&self) -> Vec<&FormCondition> {
        let mut conditions: Vec<&FormCondition> = self.conditions.iter().collect();
        for section in self.ordered_sections() {
            if let Some(logic) = &section.settings.conditional_logic {
                conditions.extend(logic.conditions.iter());
            }
            for question in section.ordered_questions() {
                if let Some(logic) = &question.settings.conditional_logic {
                    conditions.extend(logic.conditions.iter());
                }
            }
        }
        conditions
    }

    pub fn find_question(&self, id: &str) -> Option<&FormQuestion> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
            .find(|question| question.id == id)
    }

    pub fn find_section(&self, id: &str) -> Option<&FormSection> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// The section that owns the question, by containment.
    pub fn section_of(&self, question_id: &str) -> Option<&FormSection> {
        self.sections.iter().find(|section| {
            section
                .questions
                .iter()
                .any(|question| question.id == question_id)
        })
    }

    pub fn question_ids(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
            .map(|question| question.id.as_str())
    }
}

//! Derivation of visible/enabled/required/skipped states from the rules.
//!
//! Conflict policy: matching conditions are applied in the form's
//! declaration order (see [`Form::conditions_in_declaration_order`]). For a
//! single state dimension the last true condition wins, so a later `hide`
//! overrides an earlier `show`. Different dimensions compose independently.
//! `skip` always forces `required = false`, whatever order `require` and
//! `skip` were declared in. Conditions read committed answers only, never
//! another target's derived state, so rule chains cannot form cycles.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::answers::AnswerSet;
use crate::evaluate::evaluate;
use crate::spec::condition::{ConditionAction, FormCondition, TargetKind};
use crate::spec::form::Form;

/// Computed flags for one section or question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DerivedState {
    pub visible: bool,
    pub enabled: bool,
    pub required: bool,
    pub skipped: bool,
}

impl DerivedState {
    /// State of a plain visible, editable, non-skipped field.
    pub fn visible(required: bool) -> Self {
        Self {
            visible: true,
            enabled: true,
            required,
            skipped: false,
        }
    }

    /// Whether the target takes part in validation and in the submission payload.
    pub fn is_included(&self) -> bool {
        self.visible && !self.skipped
    }

    fn apply(&mut self, action: ConditionAction) {
        match action {
            ConditionAction::Show => self.visible = true,
            ConditionAction::Hide => self.visible = false,
            ConditionAction::Enable => self.enabled = true,
            ConditionAction::Disable => self.enabled = false,
            ConditionAction::Require => self.required = true,
            ConditionAction::Skip => self.skipped = true,
        }
    }

    fn settle(&mut self) {
        if !self.is_included() {
            self.required = false;
        }
    }
}

/// Why a condition had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InertReason {
    MissingTarget,
    MissingSource,
}

impl InertReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InertReason::MissingTarget => "target does not exist in this form",
            InertReason::MissingSource => "source question does not exist in this form",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionDiagnostic {
    pub condition_id: String,
    pub reason: InertReason,
}

/// Derived states for every section and question of a form.
///
/// Question entries are effective states: a hidden, disabled or skipped
/// section is already folded into the states of its questions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DerivedStateMap {
    pub sections: BTreeMap<String, DerivedState>,
    pub questions: BTreeMap<String, DerivedState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ConditionDiagnostic>,
}

impl DerivedStateMap {
    pub fn question(&self, id: &str) -> Option<&DerivedState> {
        self.questions.get(id)
    }

    pub fn section(&self, id: &str) -> Option<&DerivedState> {
        self.sections.get(id)
    }

    pub fn is_included(&self, question_id: &str) -> bool {
        self.question(question_id)
            .is_some_and(|state| state.is_included())
    }
}

/// Resolves the derived state of every section and question for the given
/// answers. Pure and idempotent; run it again after every answer change.
pub fn resolve(form: &Form, answers: &AnswerSet) -> DerivedStateMap {
    let mut map = DerivedStateMap::default();
    let mut live: Vec<(&FormCondition, bool)> = Vec::new();

    for condition in form.conditions_in_declaration_order() {
        let target_exists = match condition.target_type {
            TargetKind::Question => form.find_question(&condition.target_id).is_some(),
            TargetKind::Section => form.find_section(&condition.target_id).is_some(),
        };
        let reason = if !target_exists {
            Some(InertReason::MissingTarget)
        } else if form.find_question(&condition.question_id).is_none() {
            Some(InertReason::MissingSource)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                debug!(
                    form_id = %form.id,
                    condition_id = %condition.id,
                    target_id = %condition.target_id,
                    reason = reason.as_str(),
                    "ignoring inert condition"
                );
                map.diagnostics.push(ConditionDiagnostic {
                    condition_id: condition.id.clone(),
                    reason,
                });
            }
            None => live.push((condition, evaluate(form, condition, answers))),
        }
    }

    for section in form.ordered_sections() {
        let baseline = DerivedState {
            visible: section.settings.is_visible,
            enabled: true,
            required: false,
            skipped: false,
        };
        let state = derive(&live, TargetKind::Section, &section.id, baseline);
        map.sections.insert(section.id.clone(), state);
    }

    for section in form.ordered_sections() {
        let section_state = map
            .sections
            .get(&section.id)
            .copied()
            .unwrap_or(DerivedState::visible(false));

        for question in section.ordered_questions() {
            let own = derive(
                &live,
                TargetKind::Question,
                &question.id,
                DerivedState::visible(question.is_required),
            );
            let mut effective = DerivedState {
                visible: own.visible && section_state.visible,
                enabled: own.enabled && section_state.enabled,
                required: own.required,
                skipped: own.skipped || section_state.skipped,
            };
            effective.settle();
            map.questions.insert(question.id.clone(), effective);
        }
    }

    debug!(
        form_id = %form.id,
        conditions = live.len(),
        inert = map.diagnostics.len(),
        "resolved derived states"
    );

    map
}

fn derive(
    live: &[(&FormCondition, bool)],
    kind: TargetKind,
    id: &str,
    mut state: DerivedState,
) -> DerivedState {
    let matching: Vec<&(&FormCondition, bool)> = live
        .iter()
        .filter(|(condition, _)| condition.targets(kind, id))
        .collect();

    // "Show X when ..." means X is hidden until the rule fires, and likewise
    // for "enable".
    if matching
        .iter()
        .any(|(condition, _)| condition.action == ConditionAction::Show)
    {
        state.visible = false;
    }
    if matching
        .iter()
        .any(|(condition, _)| condition.action == ConditionAction::Enable)
    {
        state.enabled = false;
    }

    for (condition, holds) in matching {
        if *holds {
            state.apply(condition.action);
        }
    }

    state.settle();
    state
}

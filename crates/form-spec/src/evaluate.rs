//! Evaluation of a single condition against the current answers.

use std::collections::BTreeSet;

use crate::answers::AnswerSet;
use crate::spec::condition::{ConditionOperator, FormCondition};
use crate::spec::form::Form;
use crate::spec::question::FormQuestion;
use crate::value::AnswerValue;

/// The value a question stands for right now: its answer, else its default
/// value, else the empty value of its field type.
pub fn effective_answer(question: &FormQuestion, answers: &AnswerSet) -> AnswerValue {
    answers
        .get(&question.id)
        .or_else(|| question.default_value())
        .cloned()
        .unwrap_or_else(|| AnswerValue::empty_for(question.kind))
}

/// Evaluates `condition` against a snapshot of the answers.
///
/// Never fails: operands that cannot be compared make the condition false,
/// and so does a source question the form does not define.
pub fn evaluate(form: &Form, condition: &FormCondition, answers: &AnswerSet) -> bool {
    let Some(question) = form.find_question(&condition.question_id) else {
        return false;
    };
    let answer = effective_answer(question, answers);
    let expected = condition
        .condition_value
        .clone()
        .unwrap_or_else(|| AnswerValue::empty_for(question.kind));
    compare(condition.condition_type, &answer, &expected)
}

/// Applies one operator to an answer and the condition's expected value.
pub fn compare(operator: ConditionOperator, answer: &AnswerValue, expected: &AnswerValue) -> bool {
    match operator {
        ConditionOperator::Equals => values_equal(answer, expected),
        ConditionOperator::NotEquals => !values_equal(answer, expected),
        ConditionOperator::Contains => {
            text_test(answer, expected, |text, needle| text.contains(needle))
        }
        ConditionOperator::StartsWith => {
            text_test(answer, expected, |text, needle| text.starts_with(needle))
        }
        ConditionOperator::EndsWith => {
            text_test(answer, expected, |text, needle| text.ends_with(needle))
        }
        ConditionOperator::GreaterThan => {
            numeric_test(answer, expected, |left, right| left > right)
        }
        ConditionOperator::LessThan => numeric_test(answer, expected, |left, right| left < right),
    }
}

fn values_equal(answer: &AnswerValue, expected: &AnswerValue) -> bool {
    if answer.is_set() || expected.is_set() {
        let left: BTreeSet<String> = answer.as_set().into_iter().collect();
        let right: BTreeSet<String> = expected.as_set().into_iter().collect();
        return left == right;
    }

    // A typed number on either side switches to numeric equality so that
    // 18 and "18.0" agree; two texts compare exactly.
    if (matches!(answer, AnswerValue::Number(_)) || matches!(expected, AnswerValue::Number(_)))
        && let (Some(left), Some(right)) = (answer.as_number(), expected.as_number())
    {
        return left == right;
    }

    answer.as_text() == expected.as_text()
}

fn text_test(
    answer: &AnswerValue,
    expected: &AnswerValue,
    test: impl Fn(&str, &str) -> bool,
) -> bool {
    let Some(needle) = expected.as_text() else {
        return false;
    };
    answer
        .text_candidates()
        .iter()
        .any(|candidate| test(candidate, &needle))
}

fn numeric_test(
    answer: &AnswerValue,
    expected: &AnswerValue,
    test: impl Fn(f64, f64) -> bool,
) -> bool {
    if answer.is_set() || expected.is_set() {
        return false;
    }
    match (answer.as_number(), expected.as_number()) {
        (Some(left), Some(right)) => test(left, right),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(items: &[&str]) -> AnswerValue {
        AnswerValue::Set(items.iter().map(|item| item.to_string()).collect())
    }

    #[test]
    fn equals_is_case_sensitive() {
        assert!(compare(ConditionOperator::Equals, &"Yes".into(), &"Yes".into()));
        assert!(!compare(ConditionOperator::Equals, &"yes".into(), &"Yes".into()));
        assert!(compare(ConditionOperator::NotEquals, &"yes".into(), &"Yes".into()));
    }

    #[test]
    fn equals_normalizes_numbers() {
        assert!(compare(ConditionOperator::Equals, &"18.0".into(), &AnswerValue::Number(18.0)));
        assert!(compare(ConditionOperator::Equals, &AnswerValue::Number(3.0), &"3".into()));
        assert!(!compare(ConditionOperator::Equals, &"007".into(), &"7".into()));
    }

    #[test]
    fn equals_on_sets_is_set_equality() {
        assert!(compare(ConditionOperator::Equals, &set(&["b", "a"]), &set(&["a", "b"])));
        assert!(!compare(ConditionOperator::Equals, &set(&["a"]), &set(&["a", "b"])));
        assert!(compare(ConditionOperator::NotEquals, &set(&["a"]), &set(&["a", "b"])));
        assert!(compare(ConditionOperator::Equals, &set(&["a"]), &"a".into()));
    }

    #[test]
    fn string_operators_match_any_selected_value() {
        let answer = set(&["worship team", "ushers"]);
        assert!(compare(ConditionOperator::Contains, &answer, &"team".into()));
        assert!(compare(ConditionOperator::StartsWith, &answer, &"ush".into()));
        assert!(compare(ConditionOperator::EndsWith, &answer, &"ers".into()));
        assert!(!compare(ConditionOperator::Contains, &set(&[]), &"".into()));
    }

    #[test]
    fn string_operators_coerce_scalars_to_text() {
        assert!(compare(ConditionOperator::StartsWith, &AnswerValue::Number(1234.0), &"12".into()));
        assert!(compare(ConditionOperator::EndsWith, &AnswerValue::Bool(true), &"ue".into()));
        assert!(!compare(ConditionOperator::Contains, &"abc".into(), &set(&["a"])));
    }

    #[test]
    fn numeric_operators_never_fail() {
        assert!(compare(ConditionOperator::GreaterThan, &"21".into(), &"18".into()));
        assert!(compare(ConditionOperator::LessThan, &AnswerValue::Number(3.5), &"4".into()));
        assert!(!compare(ConditionOperator::GreaterThan, &"abc".into(), &"18".into()));
        assert!(!compare(ConditionOperator::GreaterThan, &"21".into(), &"".into()));
        assert!(!compare(ConditionOperator::LessThan, &set(&["1"]), &"4".into()));
        assert!(!compare(ConditionOperator::GreaterThan, &AnswerValue::Bool(true), &"0".into()));
    }

    #[test]
    fn missing_source_question_never_matches() {
        let form: Form = serde_json::from_value(json!({ "id": "f", "title": "F" })).expect("form");
        let condition: FormCondition = serde_json::from_value(json!({
            "id": "c1",
            "questionId": "gone",
            "conditionType": "notEquals",
            "conditionValue": "x",
            "action": "show",
            "targetId": "t",
            "targetType": "question"
        }))
        .expect("condition");
        assert!(!evaluate(&form, &condition, &AnswerSet::new("f")));
    }
}

//! Plan-response normalization.
//!
//! The generation endpoint has been through several backend revisions and
//! the day list arrives in one of three shapes: a bare array, an object
//! with a `days` array, or an object whose values (keyed by arbitrary
//! strings) are the day records. Everything funnels into the one canonical
//! `StudyPlan` here; anything else is a structural error, never a silently
//! empty plan.

use serde::Deserialize;
use serde_json::Value;

use crate::types::{ApiError, FailureKind, PlanDay, PlanOutcome, QuizItem, StudyPlan};

#[derive(Debug, Deserialize)]
struct WireDay {
    #[serde(default, alias = "day")]
    day_number: Option<u32>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "pages")]
    source_pages: Vec<u32>,
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default)]
    theory: Option<String>,
    #[serde(default)]
    practice: Vec<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    quiz: Vec<WireQuiz>,
}

#[derive(Debug, Deserialize)]
struct WireQuiz {
    #[serde(default, alias = "question")]
    q: String,
    #[serde(default, alias = "answer")]
    a: String,
}

impl WireDay {
    fn into_day(self, fallback_number: u32) -> PlanDay {
        PlanDay {
            day_number: self.day_number.unwrap_or(fallback_number),
            title: self.title,
            source_pages: self.source_pages,
            goals: self.goals,
            theory: self.theory,
            practice: self.practice,
            summary: self.summary,
            quiz: self
                .quiz
                .into_iter()
                .filter(|item| !item.q.is_empty())
                .map(|item| QuizItem {
                    question: item.q,
                    answer: item.a,
                })
                .collect(),
        }
    }
}

/// Normalizes a raw generation response.
///
/// The response may nest the plan under a `plan` field or be the plan
/// itself; `plan_text`, `days` and `language` at the top level override the
/// request's values when present.
pub fn normalize_plan(raw: &Value, requested_days: u32, language: &str) -> Result<PlanOutcome, ApiError> {
    let plan_value = raw.get("plan").unwrap_or(raw);
    let plan_text = raw
        .get("plan_text")
        .and_then(Value::as_str)
        .map(str::to_string);
    let requested_days = raw
        .get("days")
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .unwrap_or(requested_days);
    let language = raw
        .get("language")
        .and_then(Value::as_str)
        .unwrap_or(language);

    let entries = day_entries(plan_value)?;
    let mut parsed = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let day: WireDay = serde_json::from_value(entry).map_err(|err| {
            ApiError::new(
                FailureKind::MalformedPlan,
                format!("day entry {index}: {err}"),
            )
        })?;
        parsed.push(day);
    }

    let all_numbered = parsed.iter().all(|day| day.day_number.is_some());
    let mut days: Vec<PlanDay> = parsed
        .into_iter()
        .enumerate()
        .map(|(index, wire)| wire.into_day(index as u32 + 1))
        .collect();
    // Explicit numbering defines the order; a partially numbered list keeps
    // its encounter order instead of guessing.
    if all_numbered {
        days.sort_by_key(|day| day.day_number);
    }

    Ok(PlanOutcome {
        plan: StudyPlan {
            requested_days,
            language: language.to_string(),
            days,
        },
        plan_text,
    })
}

fn day_entries(plan_value: &Value) -> Result<Vec<Value>, ApiError> {
    match plan_value {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => {
            if let Some(days) = map.get("days") {
                return match days {
                    Value::Array(items) => Ok(items.clone()),
                    other => Err(ApiError::new(
                        FailureKind::MalformedPlan,
                        format!("days field is {}", type_name(other)),
                    )),
                };
            }
            if map.is_empty() {
                return Err(ApiError::new(
                    FailureKind::MalformedPlan,
                    "empty plan object",
                ));
            }
            Ok(map.values().cloned().collect())
        }
        other => Err(ApiError::new(
            FailureKind::MalformedPlan,
            format!("plan is {}", type_name(other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_array_is_accepted() {
        let raw = json!([
            { "day": 1, "title": "Intro" },
            { "day": 2, "title": "Basics" }
        ]);
        let outcome = normalize_plan(&raw, 2, "en").expect("normalized");
        assert_eq!(outcome.plan.days.len(), 2);
        assert_eq!(outcome.plan.days[0].day_number, 1);
        assert_eq!(outcome.plan.days[0].title.as_deref(), Some("Intro"));
        assert_eq!(outcome.plan.requested_days, 2);
        assert_eq!(outcome.plan.language, "en");
    }

    #[test]
    fn days_object_shape_is_accepted_and_idempotent() {
        let raw = json!({
            "plan": { "days": [
                { "day_number": 1, "goals": ["read"], "source_pages": [3, 4] },
                { "day_number": 2, "practice": ["exercise"] }
            ]},
            "plan_text": "Day 1\nDay 2\n",
            "days": 2,
            "language": "de"
        });
        let first = normalize_plan(&raw, 5, "en").expect("normalized");
        assert_eq!(first.plan.requested_days, 2);
        assert_eq!(first.plan.language, "de");
        assert_eq!(first.plan_text.as_deref(), Some("Day 1\nDay 2\n"));
        assert_eq!(first.plan.days[0].source_pages, vec![3, 4]);

        // Re-normalizing the already canonical days shape changes nothing.
        let canonical = json!({ "days": [
            { "day": 1, "goals": ["read"], "pages": [3, 4] },
            { "day": 2, "practice": ["exercise"] }
        ]});
        let second = normalize_plan(&canonical, 2, "de").expect("normalized");
        assert_eq!(second.plan.days, first.plan.days);
    }

    #[test]
    fn keyed_object_values_become_an_ordered_sequence() {
        let raw = json!({
            "plan": {
                "0": { "day_number": 1, "title": "Intro" },
                "1": { "day_number": 2, "title": "Basics" }
            }
        });
        let outcome = normalize_plan(&raw, 2, "en").expect("normalized");
        let titles: Vec<_> = outcome
            .plan
            .days
            .iter()
            .map(|day| (day.day_number, day.title.as_deref()))
            .collect();
        assert_eq!(titles, vec![(1, Some("Intro")), (2, Some("Basics"))]);
    }

    #[test]
    fn explicit_numbering_defines_the_order() {
        let raw = json!([
            { "day": 3, "title": "Last" },
            { "day": 1, "title": "First" },
            { "day": 2, "title": "Middle" }
        ]);
        let outcome = normalize_plan(&raw, 3, "en").expect("normalized");
        let numbers: Vec<_> = outcome.plan.days.iter().map(|d| d.day_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(outcome.plan.days[0].title.as_deref(), Some("First"));
    }

    #[test]
    fn unnumbered_days_keep_encounter_order() {
        let raw = json!([
            { "title": "First" },
            { "title": "Second" },
            { "title": "Third" }
        ]);
        let outcome = normalize_plan(&raw, 3, "en").expect("normalized");
        let days: Vec<_> = outcome
            .plan
            .days
            .iter()
            .map(|day| (day.day_number, day.title.as_deref()))
            .collect();
        assert_eq!(
            days,
            vec![(1, Some("First")), (2, Some("Second")), (3, Some("Third"))]
        );
    }

    #[test]
    fn partially_numbered_days_are_not_reordered() {
        let raw = json!([
            { "day": 5, "title": "Explicit" },
            { "title": "Filled" }
        ]);
        let outcome = normalize_plan(&raw, 2, "en").expect("normalized");
        let days: Vec<_> = outcome
            .plan
            .days
            .iter()
            .map(|day| (day.day_number, day.title.as_deref()))
            .collect();
        assert_eq!(days, vec![(5, Some("Explicit")), (2, Some("Filled"))]);
    }

    #[test]
    fn empty_plan_object_is_a_structural_error() {
        let raw = json!({ "plan": {} });
        let err = normalize_plan(&raw, 2, "en").unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedPlan);
    }

    #[test]
    fn scalar_plan_is_a_structural_error() {
        let raw = json!({ "plan": "tomorrow" });
        let err = normalize_plan(&raw, 2, "en").unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedPlan);
    }

    #[test]
    fn scalar_day_entries_are_a_structural_error() {
        let raw = json!({ "plan": [1, 2, 3] });
        let err = normalize_plan(&raw, 3, "en").unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedPlan);
        assert!(err.message.contains("day entry 0"));
    }

    #[test]
    fn empty_day_arrays_are_allowed() {
        for raw in [json!([]), json!({ "days": [] })] {
            let outcome = normalize_plan(&raw, 0, "en").expect("normalized");
            assert!(outcome.plan.days.is_empty());
        }
    }

    #[test]
    fn quiz_fields_accept_both_wire_spellings() {
        let raw = json!([{
            "day": 1,
            "quiz": [
                { "q": "Short?", "a": "Yes" },
                { "question": "Long?", "answer": "Also yes" },
                { "a": "orphaned answer" }
            ]
        }]);
        let outcome = normalize_plan(&raw, 1, "en").expect("normalized");
        let quiz = &outcome.plan.days[0].quiz;
        assert_eq!(quiz.len(), 2);
        assert_eq!(quiz[0].question, "Short?");
        assert_eq!(quiz[1].answer, "Also yes");
    }
}

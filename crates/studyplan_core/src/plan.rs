use std::fmt::Write as _;

/// Document-level findings returned by the analysis step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisSummary {
    pub document_type: String,
    pub level: Option<String>,
    pub topics: Vec<String>,
    pub summary: Option<String>,
    pub recommended_days: Option<u32>,
    pub language: Option<String>,
}

/// One question/answer pair in a day's self-check quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizItem {
    pub question: String,
    pub answer: String,
}

/// One day of a generated plan. `day_number` is unique within the plan and
/// defines display order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanDay {
    pub day_number: u32,
    pub title: Option<String>,
    pub source_pages: Vec<u32>,
    pub goals: Vec<String>,
    pub theory: Option<String>,
    pub practice: Vec<String>,
    pub summary: Option<String>,
    pub quiz: Vec<QuizItem>,
}

/// Canonical study plan: days ordered by `day_number`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudyPlan {
    pub requested_days: u32,
    pub language: String,
    pub days: Vec<PlanDay>,
}

/// Payload of a successful generation: the canonical plan plus the
/// preformatted text the backend may supply alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPlan {
    pub plan: StudyPlan,
    pub plan_text: Option<String>,
}

/// Renders a plan as a plain-text outline.
///
/// Seeds the editable text when the backend sends no preformatted version,
/// so the editor never starts empty after a successful generation.
pub fn render_plan_text(plan: &StudyPlan) -> String {
    let mut out = String::new();
    for day in &plan.days {
        match &day.title {
            Some(title) => {
                let _ = writeln!(out, "Day {}: {}", day.day_number, title);
            }
            None => {
                let _ = writeln!(out, "Day {}", day.day_number);
            }
        }
        if !day.source_pages.is_empty() {
            let pages: Vec<String> = day.source_pages.iter().map(u32::to_string).collect();
            let _ = writeln!(out, "Pages: {}", pages.join(", "));
        }
        if !day.goals.is_empty() {
            out.push_str("Goals:\n");
            for goal in &day.goals {
                let _ = writeln!(out, "  - {goal}");
            }
        }
        if let Some(theory) = &day.theory {
            let _ = writeln!(out, "Theory:\n{theory}");
        }
        if !day.practice.is_empty() {
            out.push_str("Practice:\n");
            for task in &day.practice {
                let _ = writeln!(out, "  - {task}");
            }
        }
        if let Some(summary) = &day.summary {
            let _ = writeln!(out, "Summary: {summary}");
        }
        if !day.quiz.is_empty() {
            out.push_str("Quiz:\n");
            for item in &day.quiz {
                let _ = writeln!(out, "  Q: {}", item.question);
                let _ = writeln!(out, "  A: {}", item.answer);
            }
        }
        out.push('\n');
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use engine_logging::{engine_error, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use studyplan_core::{AnalysisSummary, JobId, PlanDay, QuizItem, SessionSnapshot, StudyPlan};
use studyplan_engine::{ensure_output_dir, AtomicFileWriter};

const SESSION_FILENAME: &str = ".studyplan_session.ron";

// Wire mirrors of the core types; the core itself stays serde-free.

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedQuizItem {
    question: String,
    answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedDay {
    day_number: u32,
    title: Option<String>,
    source_pages: Vec<u32>,
    goals: Vec<String>,
    theory: Option<String>,
    practice: Vec<String>,
    summary: Option<String>,
    quiz: Vec<PersistedQuizItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedAnalysis {
    document_type: String,
    level: Option<String>,
    topics: Vec<String>,
    summary: Option<String>,
    recommended_days: Option<u32>,
    language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    saved_utc: String,
    job: Option<String>,
    analysis: Option<PersistedAnalysis>,
    plan_days: u32,
    plan_language: String,
    days: Vec<PersistedDay>,
    editable_text: String,
    language: String,
}

pub(crate) fn load_session(output_dir: &Path) -> Option<SessionSnapshot> {
    let path = output_dir.join(SESSION_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return None;
        }
        Err(err) => {
            engine_warn!("Failed to read session snapshot from {:?}: {}", path, err);
            return None;
        }
    };

    let session: PersistedSession = match ron::from_str(&content) {
        Ok(session) => session,
        Err(err) => {
            engine_warn!("Failed to parse session snapshot from {:?}: {}", path, err);
            return None;
        }
    };

    engine_info!(
        "Loaded session snapshot from {:?} (saved {})",
        path,
        session.saved_utc
    );
    Some(SessionSnapshot {
        job: session.job.map(JobId::new),
        analysis: session.analysis.map(|analysis| AnalysisSummary {
            document_type: analysis.document_type,
            level: analysis.level,
            topics: analysis.topics,
            summary: analysis.summary,
            recommended_days: analysis.recommended_days,
            language: analysis.language,
        }),
        plan: StudyPlan {
            requested_days: session.plan_days,
            language: session.plan_language,
            days: session.days.into_iter().map(restore_day).collect(),
        },
        editable_text: session.editable_text,
        language: session.language,
    })
}

pub(crate) fn save_session(output_dir: &Path, snapshot: &SessionSnapshot) {
    if let Err(err) = ensure_output_dir(output_dir) {
        engine_error!("Failed to ensure output dir {:?}: {}", output_dir, err);
        return;
    }

    let session = PersistedSession {
        saved_utc: Utc::now().to_rfc3339(),
        job: snapshot.job.as_ref().map(|job| job.as_str().to_string()),
        analysis: snapshot.analysis.as_ref().map(|analysis| PersistedAnalysis {
            document_type: analysis.document_type.clone(),
            level: analysis.level.clone(),
            topics: analysis.topics.clone(),
            summary: analysis.summary.clone(),
            recommended_days: analysis.recommended_days,
            language: analysis.language.clone(),
        }),
        plan_days: snapshot.plan.requested_days,
        plan_language: snapshot.plan.language.clone(),
        days: snapshot.plan.days.iter().map(persist_day).collect(),
        editable_text: snapshot.editable_text.clone(),
        language: snapshot.language.clone(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&session, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize session snapshot: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(output_dir));
    if let Err(err) = writer.write(SESSION_FILENAME, content.as_bytes()) {
        engine_error!(
            "Failed to write session snapshot to {:?}: {}",
            output_dir,
            err
        );
    }
}

fn persist_day(day: &PlanDay) -> PersistedDay {
    PersistedDay {
        day_number: day.day_number,
        title: day.title.clone(),
        source_pages: day.source_pages.clone(),
        goals: day.goals.clone(),
        theory: day.theory.clone(),
        practice: day.practice.clone(),
        summary: day.summary.clone(),
        quiz: day
            .quiz
            .iter()
            .map(|item| PersistedQuizItem {
                question: item.question.clone(),
                answer: item.answer.clone(),
            })
            .collect(),
    }
}

fn restore_day(day: PersistedDay) -> PlanDay {
    PlanDay {
        day_number: day.day_number,
        title: day.title,
        source_pages: day.source_pages,
        goals: day.goals,
        theory: day.theory,
        practice: day.practice,
        summary: day.summary,
        quiz: day
            .quiz
            .into_iter()
            .map(|item| QuizItem {
                question: item.question,
                answer: item.answer,
            })
            .collect(),
    }
}

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use studyplan_core::{
    AnalysisSummary, Effect, GeneratedPlan, JobId, Msg, PlanDay, QuizItem, StudyPlan,
    DOT_TICK_PERIOD, FILL_TICK_PERIOD,
};
use studyplan_engine::{ApiError, EngineConfig, EngineEvent, EngineHandle};

use super::tickers::Ticker;

/// Executes core effects: engine commands go out, engine events come back
/// as messages, and the two progress clocks are switched on and off.
pub struct EffectRunner {
    engine: EngineHandle,
    fill: Ticker,
    dot: Ticker,
}

impl EffectRunner {
    pub fn new(config: EngineConfig, msg_tx: mpsc::Sender<Msg>) -> Result<Self, ApiError> {
        let engine = EngineHandle::new(config)?;
        let fill = Ticker::spawn(FILL_TICK_PERIOD, msg_tx.clone(), || Msg::FillTick);
        let dot = Ticker::spawn(DOT_TICK_PERIOD, msg_tx.clone(), || Msg::DotTick);

        let runner = Self { engine, fill, dot };
        runner.spawn_event_loop(msg_tx);
        Ok(runner)
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Upload { source } => {
                    engine_info!("upload requested for {}", source);
                    self.engine.upload(source);
                }
                Effect::RequestAnalysis { job } => {
                    engine_info!("analysis requested for job {}", job);
                    self.engine.request_analysis(job.as_str());
                }
                Effect::StartPolling { job } => {
                    self.engine.start_polling(job.as_str());
                }
                Effect::StopPolling => {
                    self.engine.stop_polling();
                }
                Effect::Generate {
                    job,
                    days,
                    language,
                } => {
                    engine_info!(
                        "generation requested for job {} ({} days, language {})",
                        job,
                        days,
                        language
                    );
                    self.engine.generate(job.as_str(), days, language);
                }
                Effect::Export { job, text, days } => {
                    engine_info!(
                        "export requested for job {} ({} chars of plan text)",
                        job,
                        text.chars().count()
                    );
                    self.engine.export(job.as_str(), text, days);
                }
                Effect::StartFillTicker => self.fill.start(),
                Effect::StopFillTicker => self.fill.stop(),
                Effect::StartDotTicker => self.dot.start(),
                Effect::StopDotTicker => self.dot.stop(),
            }
        }
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            if let Some(event) = engine.try_recv() {
                match event {
                    EngineEvent::UploadCompleted { result } => {
                        let result = result.map(JobId::new).map_err(|err| {
                            engine_warn!("upload failed: {}", err);
                            err.to_string()
                        });
                        let _ = msg_tx.send(Msg::UploadFinished { result });
                    }
                    EngineEvent::StatusReported { job_id, phase } => {
                        let _ = msg_tx.send(Msg::StatusReported {
                            job: JobId::new(job_id),
                            phase,
                        });
                    }
                    EngineEvent::StatusPollFailed { job_id, error } => {
                        engine_warn!("status probe for job {} failed: {}", job_id, error);
                        let _ = msg_tx.send(Msg::PollFailed {
                            job: JobId::new(job_id),
                        });
                    }
                    EngineEvent::WatchExpired { job_id } => {
                        engine_warn!("gave up watching job {}", job_id);
                        let _ = msg_tx.send(Msg::WatchTimedOut {
                            job: JobId::new(job_id),
                        });
                    }
                    EngineEvent::AnalysisCompleted { job_id, result } => {
                        let result = result.map(map_analysis).map_err(|err| {
                            engine_warn!("analysis of job {} failed: {}", job_id, err);
                            err.to_string()
                        });
                        let _ = msg_tx.send(Msg::AnalysisFinished {
                            job: JobId::new(job_id),
                            result,
                        });
                    }
                    EngineEvent::PlanCompleted { job_id, result } => {
                        let result = result.map(map_generated).map_err(|err| {
                            engine_warn!("generation for job {} failed: {}", job_id, err);
                            err.to_string()
                        });
                        let _ = msg_tx.send(Msg::GenerationFinished {
                            job: JobId::new(job_id),
                            result,
                        });
                    }
                    EngineEvent::ExportCompleted { job_id, result } => {
                        let result = result
                            .map(|path| path.display().to_string())
                            .map_err(|err| {
                                engine_warn!("export for job {} failed: {}", job_id, err);
                                err.to_string()
                            });
                        let _ = msg_tx.send(Msg::ExportFinished {
                            job: JobId::new(job_id),
                            result,
                        });
                    }
                }
            } else {
                thread::sleep(Duration::from_millis(20));
            }
        });
    }
}

// The engine keeps its own wire-facing copies of the plan types; the shell
// converts them into the core vocabulary at this boundary.

fn map_analysis(outcome: studyplan_engine::AnalysisOutcome) -> AnalysisSummary {
    AnalysisSummary {
        document_type: outcome.document_type,
        level: outcome.level,
        topics: outcome.topics,
        summary: outcome.summary,
        recommended_days: outcome.recommended_days,
        language: outcome.language,
    }
}

fn map_generated(outcome: studyplan_engine::PlanOutcome) -> GeneratedPlan {
    GeneratedPlan {
        plan: map_plan(outcome.plan),
        plan_text: outcome.plan_text,
    }
}

fn map_plan(plan: studyplan_engine::StudyPlan) -> StudyPlan {
    StudyPlan {
        requested_days: plan.requested_days,
        language: plan.language,
        days: plan.days.into_iter().map(map_day).collect(),
    }
}

fn map_day(day: studyplan_engine::PlanDay) -> PlanDay {
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

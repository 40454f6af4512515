use crate::phase::Phase;
use crate::state::Step;
use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Completion and poller messages carry the job id they belong to; anything
/// arriving for a job the state no longer tracks, or in a step that cannot
/// accept it, is dropped without effects. That guard is what makes rapid
/// re-uploads safe: the superseded job's stragglers fall through here.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileChosen { source } => {
            if state.step() == Step::Uploading {
                // An upload is already in flight; ignore re-entry.
                return (state, Vec::new());
            }
            state.begin_upload(source.clone());
            vec![
                Effect::StopPolling,
                Effect::StopFillTicker,
                Effect::StopDotTicker,
                Effect::Upload { source },
                Effect::StartFillTicker,
                Effect::StartDotTicker,
            ]
        }
        Msg::UploadFinished { result } => {
            if state.step() != Step::Uploading {
                return (state, Vec::new());
            }
            match result {
                Ok(job) => {
                    state.attach_job(job.clone());
                    vec![
                        Effect::RequestAnalysis { job: job.clone() },
                        Effect::StartPolling { job },
                    ]
                }
                Err(message) => {
                    state.fail(message);
                    vec![Effect::StopFillTicker, Effect::StopDotTicker]
                }
            }
        }
        Msg::StatusReported { job, phase } => {
            if state.step() != Step::Analyzing || state.job() != Some(&job) {
                return (state, Vec::new());
            }
            let reported = Phase::new(phase);
            if reported.is_error() {
                // The analysis response would carry the real message, but the
                // poller usually sees the failure first.
                state.fail("Document analysis failed".to_string());
                stop_all_clocks()
            } else {
                state.apply_status(reported);
                Vec::new()
            }
        }
        Msg::PollFailed { .. } => Vec::new(),
        Msg::WatchTimedOut { job } => {
            if state.step() != Step::Analyzing || state.job() != Some(&job) {
                return (state, Vec::new());
            }
            state.fail("Timed out waiting for analysis".to_string());
            stop_all_clocks()
        }
        Msg::AnalysisFinished { job, result } => {
            if state.step() != Step::Analyzing || state.job() != Some(&job) {
                return (state, Vec::new());
            }
            match result {
                Ok(summary) => state.store_analysis(summary),
                Err(message) => state.fail(message),
            }
            stop_all_clocks()
        }
        Msg::FillTick => {
            if state.step().is_busy() {
                state.fill_tick();
            }
            Vec::new()
        }
        Msg::DotTick => {
            if state.step().is_busy() {
                state.dot_tick();
            }
            Vec::new()
        }
        Msg::LanguageChanged { language } => {
            state.set_language(language);
            Vec::new()
        }
        Msg::DayCountChanged { days } => {
            state.set_day_override(days);
            Vec::new()
        }
        Msg::GenerateClicked => {
            if state.step() != Step::Ready || state.analysis().is_none() {
                return (state, Vec::new());
            }
            let Some(job) = state.job().cloned() else {
                return (state, Vec::new());
            };
            let days = state.effective_day_count();
            let language = state.language().to_string();
            state.begin_generation();
            vec![
                Effect::Generate {
                    job,
                    days,
                    language,
                },
                Effect::StartFillTicker,
                Effect::StartDotTicker,
            ]
        }
        Msg::GenerationFinished { job, result } => {
            if state.step() != Step::Generating || state.job() != Some(&job) {
                return (state, Vec::new());
            }
            match result {
                Ok(generated) => state.store_plan(generated),
                Err(message) => state.fail(message),
            }
            vec![Effect::StopFillTicker, Effect::StopDotTicker]
        }
        Msg::EditorChanged { text } => {
            state.set_editable_text(text);
            Vec::new()
        }
        Msg::ExportClicked => {
            if !state.view().can_export {
                return (state, Vec::new());
            }
            let Some(job) = state.job().cloned() else {
                return (state, Vec::new());
            };
            let days = state
                .plan()
                .map(|plan| plan.requested_days)
                .unwrap_or_else(|| state.effective_day_count());
            let text = state.editable_text().to_string();
            state.begin_export();
            vec![Effect::Export { job, text, days }]
        }
        Msg::ExportFinished { job, result } => {
            if !state.is_exporting() || state.job() != Some(&job) {
                return (state, Vec::new());
            }
            match result {
                Ok(path) => state.finish_export(path),
                Err(message) => state.fail(message),
            }
            Vec::new()
        }
        Msg::SessionRestored { snapshot } => {
            // Only a fresh start may adopt a saved session; a workflow in
            // progress always wins over the snapshot.
            if state.step() != Step::Idle {
                return (state, Vec::new());
            }
            state.restore_snapshot(snapshot);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn stop_all_clocks() -> Vec<Effect> {
    vec![
        Effect::StopPolling,
        Effect::StopFillTicker,
        Effect::StopDotTicker,
    ]
}

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context};
use engine_logging::engine_info;
use studyplan_core::{update, AppState, AppViewModel, Msg, SessionSnapshot, Step};
use studyplan_engine::EngineConfig;

use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::persistence;

const USAGE: &str = "usage: studyplan_app <document> [--days N] [--lang CODE]";

/// Walks one document through upload, analysis, generation and export.
/// Without a document argument, restores the previous session and re-exports
/// its edited plan.
pub fn run_app() -> anyhow::Result<()> {
    logging::initialize(LogDestination::File);

    let options = DriverOptions::parse(std::env::args().skip(1))?;
    let output_dir = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("output");

    let mut config = EngineConfig::default_with_output(output_dir.clone());
    if let Ok(base_url) = std::env::var("STUDYPLAN_API_URL") {
        config.api.base_url = base_url;
    }

    let (msg_tx, msg_rx) = mpsc::channel();
    let runner = EffectRunner::new(config, msg_tx.clone())
        .map_err(|err| anyhow::anyhow!("engine start failed: {err}"))?;
    let mut session = Session::new(runner);

    if let Some(language) = options.language {
        session.apply(Msg::LanguageChanged { language });
    }
    if let Some(days) = options.days {
        session.apply(Msg::DayCountChanged { days });
    }

    match options.source {
        Some(source) => {
            engine_info!("starting a new session for {}", source);
            println!("Uploading {source}");
            session.apply(Msg::FileChosen { source });
        }
        None => match persistence::load_session(&output_dir) {
            Some(snapshot) => {
                println!("Restoring the previous session.");
                session.apply(Msg::SessionRestored { snapshot });
            }
            None => bail!("no document given and no session to restore\n{USAGE}"),
        },
    }

    drive(&mut session, &msg_rx, &output_dir)
}

/// Owns the core state and feeds every requested effect to the runner.
struct Session {
    state: AppState,
    runner: EffectRunner,
}

impl Session {
    fn new(runner: EffectRunner) -> Self {
        Self {
            state: AppState::default(),
            runner,
        }
    }

    /// Applies one message and returns the new view when a render is due.
    fn dispatch(&mut self, msg: Msg) -> Option<AppViewModel> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);
        if self.state.consume_dirty() {
            Some(self.state.view())
        } else {
            None
        }
    }

    /// Dispatch plus the render the driver wants after every message.
    fn apply(&mut self, msg: Msg) {
        if let Some(view) = self.dispatch(msg) {
            render(&view);
        }
    }

    fn view(&self) -> AppViewModel {
        self.state.view()
    }

    fn snapshot(&self) -> Option<SessionSnapshot> {
        self.state.session_snapshot()
    }
}

fn drive(
    session: &mut Session,
    msg_rx: &mpsc::Receiver<Msg>,
    output_dir: &Path,
) -> anyhow::Result<()> {
    let mut generate_sent = false;
    let mut export_sent = false;
    let mut snapshot_saved = false;

    loop {
        match msg_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(msg) => session.apply(msg),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => bail!("message channel closed"),
        }

        let view = session.view();
        if view.step == Step::Error {
            println!();
            bail!(view
                .error
                .unwrap_or_else(|| "the workflow failed".to_string()));
        }

        if !snapshot_saved && view.plan.is_some() {
            if let Some(snapshot) = session.snapshot() {
                persistence::save_session(output_dir, &snapshot);
                snapshot_saved = true;
            }
        }

        if view.can_export && !export_sent {
            export_sent = true;
            println!();
            println!("Exporting the plan as PDF.");
            session.apply(Msg::ExportClicked);
        } else if view.can_generate && !generate_sent && view.plan.is_none() {
            generate_sent = true;
            println!();
            print_analysis(&view);
            println!(
                "Requesting a {}-day study plan (language {}).",
                view.day_count, view.language
            );
            session.apply(Msg::GenerateClicked);
        } else if generate_sent && !export_sent && view.step == Step::Ready && !view.can_export {
            println!();
            bail!("the generated plan came back empty");
        } else if export_sent {
            if let Some(path) = view.last_export {
                println!("Study plan written to {path}");
                return Ok(());
            }
        }
    }
}

fn render(view: &AppViewModel) {
    if view.busy {
        print!("\r[{:>3}%] {:<44}", view.progress.percent, view.progress.label);
        let _ = std::io::stdout().flush();
    }
}

fn print_analysis(view: &AppViewModel) {
    let analysis = match view.analysis.as_ref() {
        Some(analysis) => analysis,
        None => return,
    };
    println!("Document type: {}", analysis.document_type);
    if let Some(level) = &analysis.level {
        println!("Level: {level}");
    }
    if !analysis.topics.is_empty() {
        println!("Topics: {}", analysis.topics.join(", "));
    }
    if let Some(summary) = &analysis.summary {
        println!("Summary: {summary}");
    }
}

struct DriverOptions {
    source: Option<String>,
    days: Option<u32>,
    language: Option<String>,
}

impl DriverOptions {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut options = Self {
            source: None,
            days: None,
            language: None,
        };
        while let Some(arg) = args.next() {
            if arg == "--days" {
                let value = args.next().context("--days needs a value")?;
                options.days = Some(value.parse().context("--days expects a number")?);
            } else if arg == "--lang" {
                options.language = Some(args.next().context("--lang needs a value")?);
            } else if arg.starts_with('-') {
                bail!("unknown flag {arg:?}\n{USAGE}");
            } else if options.source.is_none() {
                options.source = Some(arg);
            } else {
                bail!("unexpected argument {arg:?}\n{USAGE}");
            }
        }
        Ok(options)
    }
}

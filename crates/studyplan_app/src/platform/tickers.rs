use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use studyplan_core::Msg;

/// Repeating clock feeding one message kind into the session loop.
///
/// The thread lives as long as the ticker and only emits while started, so
/// the session can switch a clock on and off without respawning anything.
/// Dropping the ticker shuts the thread down.
pub struct Ticker {
    active: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl Ticker {
    pub fn spawn(period: Duration, msg_tx: mpsc::Sender<Msg>, tick: fn() -> Msg) -> Self {
        let active = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_active = active.clone();
        let thread_shutdown = shutdown.clone();
        thread::spawn(move || loop {
            thread::sleep(period);
            if thread_shutdown.load(Ordering::Relaxed) {
                return;
            }
            if thread_active.load(Ordering::Relaxed) && msg_tx.send(tick()).is_err() {
                return;
            }
        });
        Self { active, shutdown }
    }

    pub fn start(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.active.store(false, Ordering::Relaxed);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

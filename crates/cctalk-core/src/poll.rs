//! Background buffered-event polling
//!
//! Repeats the read-buffered-bill-events transaction on a fixed period
//! and forwards a report to the subscriber only when the device's
//! rolling counter has moved since the previous tick. The session is
//! shared with interactive dispatch through a mutex, so a poll tick and
//! a foreground command can never interleave their bytes on the line.
//!
//! A failed tick is a warning, not the end of the session: the poller
//! notifies the subscriber and tries again on the next period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use crate::events::EventReport;
use crate::protocol::{ProtocolError, Session};

/// Shortest accepted polling period
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(100);

/// Sleep granularity of the poll loop, so `stop()` takes effect promptly
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(25);

/// What a poll tick produced
#[derive(Debug)]
pub enum PollUpdate {
    /// The event counter advanced; a fresh decoded report
    Events(EventReport),
    /// The tick failed; polling continues on the next period
    Warning(String),
}

/// Subscriber callback receiving poll updates on the poller thread
pub type PollSubscriber = Box<dyn Fn(PollUpdate) + Send + 'static>;

/// Timer-driven poller over a shared session
pub struct PollingEngine {
    session: Arc<Mutex<Session>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PollingEngine {
    /// Create a stopped engine over the shared session
    pub fn new(session: Arc<Mutex<Session>>) -> Self {
        Self {
            session,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Whether the poll loop is currently running
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Start polling every `period` (clamped to [`MIN_POLL_PERIOD`]).
    ///
    /// Fails with [`ProtocolError::PollingActive`] if already running.
    pub fn start(
        &mut self,
        period: Duration,
        subscriber: PollSubscriber,
    ) -> Result<(), ProtocolError> {
        if self.is_running() {
            return Err(ProtocolError::PollingActive);
        }
        let period = period.max(MIN_POLL_PERIOD);
        self.stop.store(false, Ordering::SeqCst);
        let stop = Arc::clone(&self.stop);
        let session = Arc::clone(&self.session);
        debug!(period_ms = period.as_millis() as u64, "polling started");
        self.worker = Some(thread::spawn(move || run(session, stop, period, subscriber)));
        Ok(())
    }

    /// Stop polling. Idempotent; an in-flight transaction is left to
    /// finish or time out on its own rather than having its port closed
    /// under it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            debug!("polling stopped");
        }
    }
}

impl Drop for PollingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    session: Arc<Mutex<Session>>,
    stop: Arc<AtomicBool>,
    period: Duration,
    subscriber: PollSubscriber,
) {
    let mut last_counter = None;
    while !stop.load(Ordering::SeqCst) {
        let result = match session.lock() {
            Ok(mut session) => session.read_buffered_events(),
            Err(_) => {
                warn!("session mutex poisoned, stopping poller");
                break;
            }
        };
        tick(result, &mut last_counter, &subscriber);

        let mut remaining = period;
        while !stop.load(Ordering::SeqCst) && remaining > Duration::ZERO {
            let slice = remaining.min(STOP_CHECK_INTERVAL);
            thread::sleep(slice);
            remaining -= slice;
        }
    }
}

/// Diff one tick's outcome against the last seen counter and notify the
/// subscriber accordingly. Identical pair bytes still emit when the
/// counter moved; an unchanged counter emits nothing even if the pairs
/// differ, since the counter is the authoritative change signal.
fn tick(
    result: Result<EventReport, ProtocolError>,
    last_counter: &mut Option<u8>,
    subscriber: &PollSubscriber,
) {
    match result {
        Ok(report) => {
            if *last_counter != Some(report.counter) {
                debug!(counter = report.counter, "event counter advanced");
                *last_counter = Some(report.counter);
                subscriber(PollUpdate::Events(report));
            }
        }
        Err(e) => {
            warn!(error = %e, "poll tick failed");
            subscriber(PollUpdate::Warning(e.to_string()));
        }
    }
}

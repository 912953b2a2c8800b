//! Run sequencer state machine
//!
//! Drives resolved pages through the execution frame one at a time. The
//! sequencer itself never waits: the async driver in [`super::Harness`]
//! feeds it page signals and timer expiries, and it decides what happens
//! next.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::manifest::TestPage;

use super::events::{Event, PageOutcome, Reporter};
use super::frame::{ExecutionFrame, PageHandle, PageSignal, PageToken, SignalEnvelope};

/// Label used when no page is current
const UNKNOWN_PAGE: &str = "unknown";

/// Message reported for pages the reporter declined to run
const SKIPPED_MESSAGE: &str = "skipped";

/// Sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run started yet
    Idle,
    /// A page is loaded and may report
    AwaitingResult,
    /// Between pages
    Advancing,
    /// The window is exhausted
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingResult => write!(f, "awaiting result"),
            Self::Advancing => write!(f, "advancing"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Identifies one arming of the page timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(u64);

/// The single pending page timer
#[derive(Debug, Clone, Copy)]
pub struct PendingTimer {
    pub token: TimerToken,
    pub deadline: Instant,
}

/// Per-page timeout shared between the sequencer and its callers.
///
/// Clones see the same value, so the delay can be changed while a run is in
/// progress. A change applies the next time the timer is armed.
#[derive(Debug, Clone)]
pub struct TimeoutDelay(Arc<AtomicU64>);

impl TimeoutDelay {
    pub fn new(delay: Duration) -> Self {
        Self(Arc::new(AtomicU64::new(Self::nanos(delay))))
    }

    pub fn get(&self) -> Duration {
        Duration::from_nanos(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, delay: Duration) {
        self.0.store(Self::nanos(delay), Ordering::Relaxed);
    }

    fn nanos(delay: Duration) -> u64 {
        u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Drives pages through a frame and reports what happens
pub struct RunSequencer<R, F> {
    files: Vec<TestPage>,
    next_index: usize,
    last_index: usize,
    current: Option<usize>,
    state: RunState,
    /// Token of the current page attempt
    page_seq: u64,
    timer: Option<PendingTimer>,
    timer_seq: u64,
    timeout_delay: TimeoutDelay,
    allow_skip: bool,
    reporter: R,
    frame: F,
    signal_tx: mpsc::UnboundedSender<SignalEnvelope>,
}

impl<R: Reporter, F: ExecutionFrame> RunSequencer<R, F> {
    pub fn new(
        files: Vec<TestPage>,
        reporter: R,
        frame: F,
        allow_skip: bool,
        timeout_delay: Duration,
        signal_tx: mpsc::UnboundedSender<SignalEnvelope>,
    ) -> Self {
        Self {
            files,
            next_index: 0,
            last_index: 0,
            current: None,
            state: RunState::Idle,
            page_seq: 0,
            timer: None,
            timer_seq: 0,
            timeout_delay: TimeoutDelay::new(timeout_delay),
            allow_skip,
            reporter,
            frame,
            signal_tx,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn files(&self) -> &[TestPage] {
        &self.files
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn frame(&self) -> &F {
        &self.frame
    }

    pub fn into_parts(self) -> (R, F) {
        (self.reporter, self.frame)
    }

    pub fn timeout_delay(&self) -> Duration {
        self.timeout_delay.get()
    }

    /// Change the delay used the next time the timer is armed
    pub fn set_timeout_delay(&self, delay: Duration) {
        self.timeout_delay.set(delay);
    }

    /// Shared handle to the timeout delay
    pub fn timeout_handle(&self) -> TimeoutDelay {
        self.timeout_delay.clone()
    }

    /// The pending timer, if a page is waiting on one
    pub fn pending_timer(&self) -> Option<PendingTimer> {
        self.timer
    }

    /// URL of the current page, or `"unknown"`
    pub fn current_url(&self) -> &str {
        self.current
            .and_then(|idx| self.files.get(idx))
            .map(|page| page.url.as_str())
            .unwrap_or(UNKNOWN_PAGE)
    }

    /// Handle for the page currently loaded, if any
    pub fn page_handle(&self) -> Option<PageHandle> {
        (self.state == RunState::AwaitingResult)
            .then(|| PageHandle::new(PageToken(self.page_seq), self.signal_tx.clone()))
    }

    /// Announce every resolved page, then readiness
    pub fn announce(&mut self) {
        tracing::info!(total = self.files.len(), "Pages resolved");
        for (idx, page) in self.files.iter().enumerate() {
            tracing::debug!("{}: {}", idx, page.url);
            self.reporter.report(&Event::AddPage {
                url: page.url.clone(),
            });
        }
        self.reporter.report(&Event::Ready);
    }

    /// End before any page ran because the pages couldn't be resolved
    pub fn abort(&mut self, message: &str) {
        self.cancel_timer();
        self.current = None;
        self.state = RunState::Done;
        self.reporter.report(&Event::FinishedAllTests {
            success: false,
            message: message.to_string(),
        });
    }

    /// Start a run over `count` pages from `offset` (all remaining when
    /// `None` or zero)
    pub fn start(&mut self, offset: usize, count: Option<usize>) {
        self.cancel_timer();
        if self.state == RunState::AwaitingResult {
            self.frame.unload();
        }

        let total = self.files.len();
        let count = count.filter(|&count| count > 0).unwrap_or(total);
        self.next_index = offset.min(total);
        self.last_index = offset.saturating_add(count).min(total);
        self.current = None;
        self.state = RunState::Advancing;

        tracing::info!(
            first = self.next_index,
            end = self.last_index,
            "Starting run"
        );
        self.begin_page();
    }

    /// Load the next page in the window, or finish the run.
    ///
    /// Pages the reporter declines are completed on the spot, without a
    /// timer or a load.
    pub fn begin_page(&mut self) {
        loop {
            if self.next_index >= self.last_index {
                tracing::info!("done");
                self.current = None;
                self.state = RunState::Done;
                self.reporter.report(&Event::FinishedAllTests {
                    success: true,
                    message: String::new(),
                });
                return;
            }

            let index = self.next_index;
            self.next_index += 1;
            self.current = Some(index);
            self.page_seq += 1;

            let url = self.files[index].url.clone();
            tracing::info!(url = %url, "loading");

            if self.reporter.report(&Event::StartPage { url: url.clone() }) {
                self.state = RunState::AwaitingResult;
                let page = PageHandle::new(PageToken(self.page_seq), self.signal_tx.clone());
                self.frame.load(&url, page);
                self.arm_timer();
                return;
            }

            tracing::info!(url = %url, "skipped");
            self.reporter.report(&Event::TestResult {
                message: SKIPPED_MESSAGE.to_string(),
                success: self.allow_skip,
                skipped: true,
            });
            self.reporter.report(&Event::FinishPage {
                url,
                outcome: PageOutcome::Completed,
            });
        }
    }

    /// Forward a result from the current page and restart its timeout
    pub fn report_result(&mut self, success: bool, message: impl Into<String>) {
        if self.state != RunState::AwaitingResult {
            tracing::warn!(state = %self.state, "Ignoring result with no page running");
            return;
        }

        self.cancel_timer();
        let message = message.into();
        if success {
            tracing::info!(url = %self.current_url(), message = %message, "PASS");
        } else {
            tracing::info!(url = %self.current_url(), message = %message, "FAIL");
        }
        self.reporter.report(&Event::TestResult {
            message,
            success,
            skipped: false,
        });
        self.arm_timer();
    }

    /// The current page is done; move on
    pub fn notify_finished(&mut self) {
        if self.state != RunState::AwaitingResult {
            tracing::warn!(state = %self.state, "Ignoring finish with no page running");
            return;
        }

        self.cancel_timer();
        tracing::info!(url = %self.current_url(), "finished");
        self.finish_page(PageOutcome::Completed);
    }

    /// The timer armed as `token` went off.
    ///
    /// Ignored unless `token` is the timer still pending, so a timer that
    /// raced a finish can't advance the run twice.
    pub fn on_timeout(&mut self, token: TimerToken) {
        match self.timer {
            Some(pending) if pending.token == token => {}
            _ => {
                tracing::debug!("Ignoring stale timer");
                return;
            }
        }

        self.cancel_timer();
        tracing::warn!(url = %self.current_url(), "timeout");
        self.finish_page(PageOutcome::TimedOut);
    }

    /// Apply a signal from a page, dropping it if the page's attempt is over
    pub fn handle_signal(&mut self, envelope: SignalEnvelope) {
        if self.state != RunState::AwaitingResult || envelope.token != PageToken(self.page_seq) {
            tracing::debug!(token = envelope.token.0, "Dropping signal from a finished page");
            return;
        }

        match envelope.signal {
            PageSignal::Result { success, message } => self.report_result(success, message),
            PageSignal::Finished => self.notify_finished(),
        }
    }

    fn finish_page(&mut self, outcome: PageOutcome) {
        self.state = RunState::Advancing;
        self.frame.unload();
        self.reporter.report(&Event::FinishPage {
            url: self.current_url().to_string(),
            outcome,
        });
        self.begin_page();
    }

    fn arm_timer(&mut self) {
        debug_assert!(self.timer.is_none(), "timer armed twice");
        self.timer_seq += 1;
        self.timer = Some(PendingTimer {
            token: TimerToken(self.timer_seq),
            deadline: Instant::now() + self.timeout_delay.get(),
        });
    }

    fn cancel_timer(&mut self) {
        self.timer = None;
    }
}

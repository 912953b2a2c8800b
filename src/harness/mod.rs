//! Test harness
//!
//! Resolves a manifest, then runs its pages one at a time through an
//! execution frame. Each page gets a timeout that restarts whenever it
//! reports a result; a page that never finishes is recorded as timed out
//! and the run moves on.

pub mod events;
pub mod frame;
pub mod sequencer;
pub mod summary;

use std::future;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::common::{config::Config, Result};
use crate::manifest::{Resolver, SuiteOptions, TestPage, TextFetcher};

pub use events::{Event, EventKind, PageOutcome, Reporter};
pub use frame::{ExecutionFrame, NullFrame, PageHandle, ProcessFrame};
pub use sequencer::{RunSequencer, RunState, TimeoutDelay, TimerToken};
pub use summary::{PageVerdict, RunSummary};

/// Default per-page timeout
pub const DEFAULT_TIMEOUT_DELAY: Duration = Duration::from_secs(20);

/// Reported when the manifest tree couldn't be fetched
pub const LOAD_FAILURE_MESSAGE: &str = "Unable to load tests. Are you running locally?\n\
You need to serve the suite over HTTP, or point the harness at the\n\
manifest on the local filesystem.\n\n\
Note: An easy way to run from a server:\n\n\
\tcd path_to_tests\n\
\tpython3 -m http.server\n\n\
then run the harness against http://localhost:8000/00_test_list.txt";

/// Options fixed when the harness is created
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub suite: SuiteOptions,
    /// Success value reported for pages the reporter declines
    pub allow_skip: bool,
    pub timeout_delay: Duration,
}

impl HarnessOptions {
    pub fn new(suite: SuiteOptions) -> Self {
        Self {
            suite,
            allow_skip: false,
            timeout_delay: DEFAULT_TIMEOUT_DELAY,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            suite: SuiteOptions::from_config(&config.suite)?,
            allow_skip: config.suite.allow_skip,
            timeout_delay: config.timeouts.page(),
        })
    }
}

/// A loaded suite, ready to run
pub struct Harness<R, F> {
    sequencer: RunSequencer<R, F>,
    signals: mpsc::UnboundedReceiver<frame::SignalEnvelope>,
    ready: bool,
}

impl<R: Reporter, F: ExecutionFrame> Harness<R, F> {
    /// Resolve `root` and announce the pages found.
    ///
    /// A manifest that can't be fetched is reported to `reporter` as
    /// `FINISHED_ALL_TESTS` with `success = false`; the returned harness then
    /// has nothing to run. Malformed manifest syntax is returned as an error
    /// and nothing is reported.
    pub async fn load(
        options: HarnessOptions,
        root: &str,
        fetcher: &dyn TextFetcher,
        reporter: R,
        frame: F,
    ) -> Result<Self> {
        let resolution = Resolver::new(fetcher, &options.suite).resolve(root).await?;

        let (tx, signals) = mpsc::unbounded_channel();
        let pages = if resolution.success {
            resolution.pages
        } else {
            Vec::new()
        };
        let mut sequencer = RunSequencer::new(
            pages,
            reporter,
            frame,
            options.allow_skip,
            options.timeout_delay,
            tx,
        );

        if resolution.success {
            sequencer.announce();
        } else {
            tracing::error!(root, "Unable to load tests");
            sequencer.abort(LOAD_FAILURE_MESSAGE);
        }

        Ok(Self {
            sequencer,
            signals,
            ready: resolution.success,
        })
    }

    /// Whether the manifest loaded
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pages(&self) -> &[TestPage] {
        self.sequencer.files()
    }

    pub fn state(&self) -> RunState {
        self.sequencer.state()
    }

    /// Change the per-page timeout for timers armed from now on
    pub fn set_timeout_delay(&self, delay: Duration) {
        self.sequencer.set_timeout_delay(delay);
    }

    /// Handle for changing the timeout while [`Harness::run_tests`] runs
    pub fn timeout_handle(&self) -> TimeoutDelay {
        self.sequencer.timeout_handle()
    }

    pub fn timeout_delay(&self) -> Duration {
        self.sequencer.timeout_delay()
    }

    /// Page-side handle for the page currently running
    pub fn page_handle(&self) -> Option<PageHandle> {
        self.sequencer.page_handle()
    }

    pub fn reporter(&self) -> &R {
        self.sequencer.reporter()
    }

    pub fn into_reporter(self) -> R {
        self.sequencer.into_parts().0
    }

    /// Run `count` pages starting at `offset` (all remaining when `None` or
    /// zero).
    ///
    /// Returns once `FINISHED_ALL_TESTS` has been reported. Does nothing if
    /// the manifest failed to load.
    pub async fn run_tests(&mut self, offset: usize, count: Option<usize>) {
        if !self.ready {
            tracing::warn!("No tests loaded, nothing to run");
            return;
        }

        self.sequencer.start(offset, count);
        while self.sequencer.state() != RunState::Done {
            let timer = self.sequencer.pending_timer();
            tokio::select! {
                Some(envelope) = self.signals.recv() => {
                    self.sequencer.handle_signal(envelope);
                }
                token = expiry(timer) => {
                    self.sequencer.on_timeout(token);
                }
            }
        }
    }
}

/// Resolves when the pending timer fires; never without one
async fn expiry(timer: Option<sequencer::PendingTimer>) -> TimerToken {
    match timer {
        Some(timer) => {
            tokio::time::sleep_until(timer.deadline).await;
            timer.token
        }
        None => future::pending().await,
    }
}

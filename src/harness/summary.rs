//! Per-page results gathered from the event stream

use serde::Serialize;

use super::events::{Event, PageOutcome};

/// Result message kept for a page skipped without permission
const SKIPPED_MESSAGE: &str = "skipped";

/// One result a page reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub success: bool,
    pub message: String,
}

/// Final verdict for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageVerdict {
    Passed,
    Failed,
    TimedOut,
    /// Declined by the reporter while skips are allowed
    Skipped,
}

/// Everything known about one page attempt
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub results: Vec<ResultRecord>,
    pub verdict: PageVerdict,
}

/// Summary of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Pages announced by the resolver
    pub total: usize,
    pub pages: Vec<PageRecord>,
    /// `FINISHED_ALL_TESTS` success, once seen
    pub finished: Option<bool>,
    /// `FINISHED_ALL_TESTS` message, once seen
    pub message: String,
    #[serde(skip)]
    current: Option<Pending>,
}

#[derive(Debug, Clone)]
struct Pending {
    url: String,
    results: Vec<ResultRecord>,
    skipped: Option<bool>,
}

impl RunSummary {
    /// Fold one event into the summary
    pub fn record(&mut self, event: &Event) {
        match event {
            Event::AddPage { .. } => self.total += 1,
            Event::Ready => {}
            Event::StartPage { url } => {
                self.current = Some(Pending {
                    url: url.clone(),
                    results: Vec::new(),
                    skipped: None,
                });
            }
            Event::TestResult {
                message,
                success,
                skipped,
            } => {
                if let Some(pending) = self.current.as_mut() {
                    if *skipped {
                        pending.skipped = Some(*success);
                    } else {
                        pending.results.push(ResultRecord {
                            success: *success,
                            message: message.clone(),
                        });
                    }
                }
            }
            Event::FinishPage { url, outcome } => {
                let pending = self.current.take().unwrap_or_else(|| Pending {
                    url: url.clone(),
                    results: Vec::new(),
                    skipped: None,
                });
                let mut results = pending.results;
                let verdict = match (outcome, pending.skipped) {
                    (_, Some(true)) => PageVerdict::Skipped,
                    // A skip that wasn't allowed counts against the run
                    (_, Some(false)) => {
                        results.push(ResultRecord {
                            success: false,
                            message: SKIPPED_MESSAGE.to_string(),
                        });
                        PageVerdict::Failed
                    }
                    (PageOutcome::TimedOut, None) => PageVerdict::TimedOut,
                    (PageOutcome::Completed, None) => {
                        if results.iter().all(|r| r.success) {
                            PageVerdict::Passed
                        } else {
                            PageVerdict::Failed
                        }
                    }
                };
                self.pages.push(PageRecord {
                    url: pending.url,
                    results,
                    verdict,
                });
            }
            Event::FinishedAllTests { success, message } => {
                self.finished = Some(*success);
                self.message = message.clone();
            }
        }
    }

    pub fn count(&self, verdict: PageVerdict) -> usize {
        self.pages.iter().filter(|p| p.verdict == verdict).count()
    }

    /// True when the run finished, loaded, and no page failed or timed out
    pub fn all_passed(&self) -> bool {
        self.finished == Some(true)
            && self.count(PageVerdict::Failed) == 0
            && self.count(PageVerdict::TimedOut) == 0
    }
}

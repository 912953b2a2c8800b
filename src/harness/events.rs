//! Lifecycle events delivered to the reporter

use std::fmt;

use serde::Serialize;

/// How a page attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOutcome {
    /// The page signalled it was finished
    Completed,
    /// No finish (or result) arrived before the timeout
    TimedOut,
}

impl PageOutcome {
    /// `Some(true)` for completion, `None` for a timeout
    pub fn success(self) -> Option<bool> {
        match self {
            PageOutcome::Completed => Some(true),
            PageOutcome::TimedOut => None,
        }
    }
}

/// Event kinds, in the order a run produces them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AddPage,
    Ready,
    StartPage,
    TestResult,
    FinishPage,
    FinishedAllTests,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddPage => write!(f, "ADD_PAGE"),
            Self::Ready => write!(f, "READY"),
            Self::StartPage => write!(f, "START_PAGE"),
            Self::TestResult => write!(f, "TEST_RESULT"),
            Self::FinishPage => write!(f, "FINISH_PAGE"),
            Self::FinishedAllTests => write!(f, "FINISHED_ALL_TESTS"),
        }
    }
}

/// A harness lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    /// A page was found while resolving the manifest
    AddPage { url: String },
    /// Every page is known; the run can start
    Ready,
    /// A page is about to load
    StartPage { url: String },
    /// The running page reported a result
    TestResult {
        message: String,
        success: bool,
        skipped: bool,
    },
    /// A page attempt is over
    FinishPage { url: String, outcome: PageOutcome },
    /// The run is over, or the manifest couldn't be loaded
    FinishedAllTests { success: bool, message: String },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::AddPage { .. } => EventKind::AddPage,
            Event::Ready => EventKind::Ready,
            Event::StartPage { .. } => EventKind::StartPage,
            Event::TestResult { .. } => EventKind::TestResult,
            Event::FinishPage { .. } => EventKind::FinishPage,
            Event::FinishedAllTests { .. } => EventKind::FinishedAllTests,
        }
    }
}

/// Receives harness events.
///
/// Only the answer to [`Event::StartPage`] is used: `false` skips the page.
pub trait Reporter {
    fn report(&mut self, event: &Event) -> bool;
}

impl<F> Reporter for F
where
    F: FnMut(&Event) -> bool,
{
    fn report(&mut self, event: &Event) -> bool {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(EventKind::AddPage.to_string(), "ADD_PAGE");
        assert_eq!(EventKind::FinishedAllTests.to_string(), "FINISHED_ALL_TESTS");
        assert_eq!(Event::Ready.kind(), EventKind::Ready);
    }

    #[test]
    fn test_event_json_shape() {
        let event = Event::FinishPage {
            url: "a.html".to_string(),
            outcome: PageOutcome::TimedOut,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "FINISH_PAGE");
        assert_eq!(json["url"], "a.html");
        assert_eq!(json["outcome"], "timed_out");
    }

    #[test]
    fn test_timeout_has_no_success_value() {
        assert_eq!(PageOutcome::Completed.success(), Some(true));
        assert_eq!(PageOutcome::TimedOut.success(), None);
    }

    #[test]
    fn test_closures_are_reporters() {
        let mut seen = Vec::new();
        let mut reporter = |event: &Event| {
            seen.push(event.kind());
            true
        };
        assert!(reporter.report(&Event::Ready));
        assert_eq!(seen, vec![EventKind::Ready]);
    }
}

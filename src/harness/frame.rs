//! Execution frames and the page-side reporting handle
//!
//! A frame is where a page runs. The harness hands it a [`PageHandle`] with
//! each load; the page uses that handle to report results and to say it is
//! finished. Handles are tied to one page attempt, so anything a page sends
//! after its attempt is over is ignored.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::common::{config::PageConfig, Error};

/// Identifies one page attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageToken(pub(crate) u64);

/// Something a running page told the harness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSignal {
    Result { success: bool, message: String },
    Finished,
}

/// A signal tagged with the page attempt it came from
#[derive(Debug)]
pub struct SignalEnvelope {
    pub token: PageToken,
    pub signal: PageSignal,
}

/// Page-side API for one page attempt
#[derive(Debug, Clone)]
pub struct PageHandle {
    token: PageToken,
    tx: mpsc::UnboundedSender<SignalEnvelope>,
}

impl PageHandle {
    pub(crate) fn new(token: PageToken, tx: mpsc::UnboundedSender<SignalEnvelope>) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> PageToken {
        self.token
    }

    /// Report a result; each report also restarts the page timeout
    pub fn report_result(&self, success: bool, message: impl Into<String>) {
        self.send(PageSignal::Result {
            success,
            message: message.into(),
        });
    }

    /// Tell the harness the page is done
    pub fn notify_finished(&self) {
        self.send(PageSignal::Finished);
    }

    fn send(&self, signal: PageSignal) {
        let envelope = SignalEnvelope {
            token: self.token,
            signal,
        };
        if self.tx.send(envelope).is_err() {
            tracing::debug!(token = self.token.0, "Harness gone, dropping page signal");
        }
    }
}

/// The isolated context pages are loaded into
pub trait ExecutionFrame {
    /// Point the frame at `url`. The page reports through `page`.
    fn load(&mut self, url: &str, page: PageHandle);

    /// Tear down whatever the last `load` started
    fn unload(&mut self) {}
}

/// Frame that never runs anything; every page times out
#[derive(Debug, Default)]
pub struct NullFrame {
    loaded: Vec<String>,
}

impl NullFrame {
    /// URLs the frame was pointed at, in order
    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }
}

impl ExecutionFrame for NullFrame {
    fn load(&mut self, url: &str, _page: PageHandle) {
        self.loaded.push(url.to_string());
    }
}

/// Runs each page as a child process.
///
/// The page URL is appended to the configured arguments. The process talks
/// back one line at a time on stdout:
///
/// ```text
/// PASS <message>
/// FAIL <message>
/// FINISHED
/// ```
///
/// Any other output is logged and ignored.
pub struct ProcessFrame {
    command: PathBuf,
    args: Vec<String>,
    child: Option<Child>,
}

impl ProcessFrame {
    pub fn new(command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            child: None,
        }
    }

    /// Build from the `[page]` config section, which must name a command
    pub fn from_config(config: &PageConfig) -> crate::common::Result<Self> {
        let command = config.command.clone().ok_or_else(|| {
            Error::Config("No page runner configured. Set [page].command or pass --page-command".to_string())
        })?;
        Ok(Self::new(command, config.args.clone()))
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    fn spawn(&self, url: &str) -> crate::common::Result<Child> {
        Command::new(&self.command)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::page_launch(&self.command.display().to_string(), e))
    }
}

impl ExecutionFrame for ProcessFrame {
    fn load(&mut self, url: &str, page: PageHandle) {
        self.unload();

        let mut child = match self.spawn(url) {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(url, error = %e, "Could not start page");
                page.report_result(false, e.to_string());
                page.notify_finished();
                return;
            }
        };

        tracing::debug!(url, pid = ?child.id(), "Page runner started");
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_page_output(stdout, page, url.to_string()));
        }
        self.child = Some(child);
    }

    fn unload(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "Page runner already gone");
            }
        }
    }
}

async fn forward_page_output(stdout: ChildStdout, page: PageHandle, url: String) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_page_line(&line) {
                Some(PageSignal::Result { success, message }) => {
                    page.report_result(success, message)
                }
                Some(PageSignal::Finished) => {
                    page.notify_finished();
                    break;
                }
                None => tracing::debug!(url = %url, "page: {}", line),
            },
            Ok(None) => {
                tracing::debug!(url = %url, "Page runner closed stdout");
                break;
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed reading page output");
                break;
            }
        }
    }
}

/// Parse one line of page runner output
pub fn parse_page_line(line: &str) -> Option<PageSignal> {
    let line = line.trim_end();
    let (word, rest) = match line.split_once(' ') {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "PASS" => Some(PageSignal::Result {
            success: true,
            message: rest.to_string(),
        }),
        "FAIL" => Some(PageSignal::Result {
            success: false,
            message: rest.to_string(),
        }),
        "FINISHED" if rest.is_empty() => Some(PageSignal::Finished),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_lines() {
        assert_eq!(
            parse_page_line("PASS all 12 checks ok"),
            Some(PageSignal::Result {
                success: true,
                message: "all 12 checks ok".to_string()
            })
        );
        assert_eq!(
            parse_page_line("FAIL"),
            Some(PageSignal::Result {
                success: false,
                message: String::new()
            })
        );
        assert_eq!(parse_page_line("FINISHED\r"), Some(PageSignal::Finished));
        assert_eq!(parse_page_line("FINISHED early"), None);
        assert_eq!(parse_page_line("console: hello"), None);
    }

    #[tokio::test]
    async fn test_handle_tags_signals_with_token() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = PageHandle::new(PageToken(7), tx);
        handle.report_result(true, "ok");
        handle.notify_finished();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.token, PageToken(7));
        assert!(matches!(first.signal, PageSignal::Result { success: true, .. }));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.signal, PageSignal::Finished);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_frame_forwards_runner_output() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut frame = ProcessFrame::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo \"PASS loaded $0\"; echo noise; echo FINISHED".to_string(),
            ],
        );
        frame.load("page.html", PageHandle::new(PageToken(1), tx));

        let result = rx.recv().await.unwrap();
        assert_eq!(
            result.signal,
            PageSignal::Result {
                success: true,
                message: "loaded page.html".to_string()
            }
        );
        assert_eq!(rx.recv().await.unwrap().signal, PageSignal::Finished);
        frame.unload();
    }

    #[tokio::test]
    async fn test_missing_runner_reports_failure_and_finishes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut frame = ProcessFrame::new("/nonexistent/page-runner", Vec::new());
        frame.load("page.html", PageHandle::new(PageToken(3), tx));

        let result = rx.recv().await.unwrap();
        assert!(matches!(result.signal, PageSignal::Result { success: false, .. }));
        assert_eq!(rx.recv().await.unwrap().signal, PageSignal::Finished);
    }
}

//! Console reporter
//!
//! Prints harness events as they happen and keeps a [`RunSummary`].

use colored::Colorize;

use crate::harness::{Event, PageVerdict, Reporter, RunSummary};

pub struct ConsoleReporter {
    summary: RunSummary,
    skip: Vec<String>,
    json: bool,
}

impl ConsoleReporter {
    pub fn new(skip: Vec<String>, json: bool) -> Self {
        Self {
            summary: RunSummary::default(),
            skip,
            json,
        }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn into_summary(self) -> RunSummary {
        self.summary
    }

    /// Whether a page should run, given the --skip patterns
    fn wants(&self, url: &str) -> bool {
        !self.skip.iter().any(|pattern| url.contains(pattern.as_str()))
    }

    fn print(&self, event: &Event) {
        match event {
            Event::AddPage { .. } | Event::StartPage { .. } => {}
            Event::Ready => {
                println!(
                    "{} {} pages",
                    "Ready:".blue().bold(),
                    self.summary.total.to_string().white().bold()
                );
            }
            Event::TestResult {
                message,
                success,
                skipped,
            } => {
                if *skipped {
                    return;
                }
                if *success {
                    println!("    {} {}", "✓".green(), message.dimmed());
                } else {
                    println!("    {} {}", "✗".red(), message);
                }
            }
            Event::FinishPage { url, .. } => {
                if let Some(page) = self.summary.pages.last() {
                    let label = match page.verdict {
                        PageVerdict::Passed => "PASS".green().bold(),
                        PageVerdict::Failed => "FAIL".red().bold(),
                        PageVerdict::TimedOut => "TIMEOUT".yellow().bold(),
                        PageVerdict::Skipped => "SKIP".dimmed(),
                    };
                    println!("  {} {}", label, url);
                }
            }
            Event::FinishedAllTests { success, message } => {
                if !*success {
                    eprintln!("{}", message.red());
                }
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: &Event) -> bool {
        self.summary.record(event);

        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "Could not encode event"),
            }
        } else {
            self.print(event);
        }

        match event {
            Event::StartPage { url } => self.wants(url),
            _ => true,
        }
    }
}

/// Print the closing summary
pub fn print_summary(summary: &RunSummary) {
    let passed = summary.count(PageVerdict::Passed);
    let failed = summary.count(PageVerdict::Failed);
    let timed_out = summary.count(PageVerdict::TimedOut);
    let skipped = summary.count(PageVerdict::Skipped);

    println!();
    println!(
        "{} {} passed, {} failed, {} timed out, {} skipped ({} pages)",
        "Summary:".blue().bold(),
        passed.to_string().green(),
        failed.to_string().red(),
        timed_out.to_string().yellow(),
        skipped,
        summary.pages.len()
    );

    if summary.all_passed() {
        println!("\n{}\n", "✓ All pages passed".green().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_patterns_decline_start() {
        let mut reporter = ConsoleReporter::new(vec!["slow/".to_string()], true);
        assert!(reporter.report(&Event::StartPage {
            url: "suite/fast/a.html".to_string()
        }));
        assert!(!reporter.report(&Event::StartPage {
            url: "suite/slow/b.html".to_string()
        }));
    }

    #[test]
    fn test_summary_tracks_events() {
        let mut reporter = ConsoleReporter::new(Vec::new(), true);
        reporter.report(&Event::AddPage {
            url: "a.html".to_string(),
        });
        reporter.report(&Event::StartPage {
            url: "a.html".to_string(),
        });
        reporter.report(&Event::FinishPage {
            url: "a.html".to_string(),
            outcome: crate::harness::PageOutcome::Completed,
        });
        assert_eq!(reporter.summary().total, 1);
        assert_eq!(reporter.summary().count(PageVerdict::Passed), 1);
    }
}

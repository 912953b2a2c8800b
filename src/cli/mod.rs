//! CLI command handling
//!
//! Loads configuration, wires the resolver and harness together, and
//! formats output.

mod console;

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::{Commands, SuiteArgs};
use crate::common::{config::Config, paths, Error, Result};
use crate::harness::{Harness, HarnessOptions, PageVerdict, ProcessFrame, RunSummary};
use crate::manifest::{DefaultFetcher, Resolver, SuiteOptions};

pub use console::ConsoleReporter;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::List {
            manifest,
            suite,
            json,
        } => {
            let config = load_config(config_path, &suite)?;
            let fetcher = DefaultFetcher::from_config(&config)?;
            let options = SuiteOptions::from_config(&config.suite)?;

            let resolution = Resolver::new(&fetcher, &options).resolve(&manifest).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            } else {
                for page in &resolution.pages {
                    println!("{}", page.url);
                }
                eprintln!(
                    "{} pages{}",
                    resolution.pages.len(),
                    if resolution.success {
                        String::new()
                    } else {
                        format!(" {}", "(some manifests could not be loaded)".yellow())
                    }
                );
            }

            if resolution.success {
                Ok(())
            } else {
                Err(Error::SuiteUnavailable(manifest))
            }
        }

        Commands::Run {
            manifest,
            suite,
            page_command,
            page_args,
            offset,
            count,
            timeout_ms,
            skip,
            report,
            json,
        } => {
            let mut config = load_config(config_path, &suite)?;
            if let Some(command) = page_command {
                config.page.command = Some(command);
                config.page.args = page_args;
            } else if !page_args.is_empty() {
                config.page.args = page_args;
            }
            if let Some(ms) = timeout_ms {
                config.timeouts.page_ms = ms;
            }

            let fetcher = DefaultFetcher::from_config(&config)?;
            let frame = ProcessFrame::from_config(&config.page)?;
            let options = HarnessOptions::from_config(&config)?;
            tracing::debug!(
                command = %frame.command().display(),
                timeout_ms = config.timeouts.page_ms,
                "Page runner configured"
            );

            let reporter = ConsoleReporter::new(skip, json);
            let mut harness = Harness::load(options, &manifest, &fetcher, reporter, frame).await?;
            if !harness.is_ready() {
                return Err(Error::SuiteUnavailable(manifest));
            }

            harness.run_tests(offset, count).await;
            let summary = harness.into_reporter().into_summary();

            if !json {
                console::print_summary(&summary);
            }
            write_report(&summary, report)?;

            let failed = summary.count(PageVerdict::Failed) + summary.count(PageVerdict::TimedOut);
            if summary.all_passed() {
                Ok(())
            } else {
                Err(Error::RunFailed {
                    failed,
                    total: summary.pages.len(),
                })
            }
        }
    }
}

/// Load the config file (explicit or default) and apply command-line flags
fn load_config(path: Option<&Path>, suite: &SuiteArgs) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    suite.apply(&mut config);
    Ok(config)
}

/// Write the JSON report to `explicit`, or to the reports directory
fn write_report(summary: &RunSummary, explicit: Option<PathBuf>) -> Result<()> {
    let path = match explicit {
        Some(path) => path,
        None => match paths::ensure_reports_dir()? {
            Some(dir) => dir.join("last-run.json"),
            None => {
                tracing::debug!("No data directory, skipping run report");
                return Ok(());
            }
        },
    };

    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, json)?;
    tracing::info!(path = %path.display(), "Wrote run report");
    Ok(())
}

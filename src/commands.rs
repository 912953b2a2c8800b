//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::Config;

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a manifest and print the pages it selects
    #[command(alias = "ls")]
    List {
        /// Root manifest (path or URL), optionally with leading options
        manifest: String,

        #[command(flatten)]
        suite: SuiteArgs,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the pages of a manifest, one at a time
    Run {
        /// Root manifest (path or URL), optionally with leading options
        manifest: String,

        #[command(flatten)]
        suite: SuiteArgs,

        /// Program that runs a single page (overrides [page].command)
        #[arg(long)]
        page_command: Option<PathBuf>,

        /// Argument passed to the page program before the URL
        /// Can be specified multiple times
        #[arg(long = "page-arg", allow_hyphen_values = true)]
        page_args: Vec<String>,

        /// Index of the first page to run
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Number of pages to run (default or 0: all remaining)
        #[arg(long)]
        count: Option<usize>,

        /// Per-page timeout in milliseconds (overrides [timeouts].page_ms)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Skip pages whose URL contains this text
        /// Can be specified multiple times
        #[arg(long)]
        skip: Vec<String>,

        /// Write the JSON run report here instead of the default location
        #[arg(long)]
        report: Option<PathBuf>,

        /// Stream events as JSON lines instead of human-readable output
        #[arg(long)]
        json: bool,
    },
}

/// Suite filtering flags shared by all commands
#[derive(Args, Debug, Default)]
pub struct SuiteArgs {
    /// Target suite version (overrides [suite].version)
    #[arg(long = "suite-version")]
    pub version: Option<String>,

    /// Only keep pages that require at least this version
    #[arg(long)]
    pub min_version: Option<String>,

    /// Leave out pages marked --slow
    #[arg(long)]
    pub fast: bool,

    /// Count pages skipped with --skip as passing
    #[arg(long)]
    pub allow_skip: bool,
}

impl SuiteArgs {
    /// Apply flags on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(version) = &self.version {
            config.suite.version = version.clone();
        }
        if let Some(min_version) = &self.min_version {
            config.suite.min_version = Some(min_version.clone());
        }
        if self.fast {
            config.suite.fast = true;
        }
        if self.allow_skip {
            config.suite.allow_skip = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        let args = SuiteArgs {
            version: Some("2.0.0".to_string()),
            min_version: None,
            fast: true,
            allow_skip: false,
        };
        args.apply(&mut config);

        assert_eq!(config.suite.version, "2.0.0");
        assert!(config.suite.min_version.is_none());
        assert!(config.suite.fast);
        assert!(!config.suite.allow_skip);
    }
}

//! Manifest resolution
//!
//! Turns a tree of `.txt` manifests into the ordered list of test pages to
//! run, applying `--min-version` and `--slow` filtering on the way.

pub mod fetch;
pub mod line;
mod resolver;
pub mod version;

pub use fetch::{DefaultFetcher, FileFetcher, HttpFetcher, TextFetcher};
pub use resolver::{Resolution, Resolver, SuiteOptions, TestPage};
pub use version::Version;

//! Recursive manifest resolution
//!
//! Expands a root manifest into the flat, ordered list of test pages it
//! names. Nested manifests are fetched concurrently; their results are
//! placed by line position, so the final order always follows the
//! manifests regardless of which fetch completes first.

use futures_util::future::{try_join_all, BoxFuture, FutureExt};
use serde::Serialize;

use crate::common::{config::SuiteConfig, Result};

use super::fetch::TextFetcher;
use super::line::{directory_prefix, entry_text, is_manifest, LineOptions, ManifestLine};
use super::version::Version;

/// Suite-wide filtering options
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    /// Target version; pages needing a newer one are left out
    pub version: Version,
    /// When set, keep only pages whose minimum version reaches this
    pub min_version: Option<Version>,
    /// Leave out pages marked slow
    pub fast: bool,
}

impl SuiteOptions {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            min_version: None,
            fast: false,
        }
    }

    pub fn from_config(config: &SuiteConfig) -> Result<Self> {
        Ok(Self {
            version: Version::parse(&config.version)?,
            min_version: config
                .min_version
                .as_deref()
                .map(Version::parse)
                .transpose()?,
            fast: config.fast,
        })
    }

    /// Decide whether a page with the given effective options is kept
    fn includes(&self, scope: &OptionScope) -> bool {
        if self.fast && scope.slow {
            false
        } else if let Some(min) = &self.min_version {
            scope.min_version.at_least(min)
        } else {
            self.version.at_least(&scope.min_version)
        }
    }
}

/// Options inherited from enclosing manifests
#[derive(Debug, Clone)]
struct OptionScope {
    min_version: Version,
    slow: bool,
}

impl OptionScope {
    fn root() -> Self {
        Self {
            min_version: Version::default_min(),
            slow: false,
        }
    }

    /// Scope for a line: its own options override the inherited ones
    fn with_line(mut self, options: &LineOptions) -> Self {
        if let Some(version) = &options.min_version {
            self.min_version = version.clone();
        }
        if options.slow {
            self.slow = true;
        }
        self
    }
}

/// A single resolved test page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestPage {
    pub url: String,
}

impl TestPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Result of resolving a manifest tree
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    /// False when any manifest in the tree failed to load
    pub success: bool,
    /// Pages in manifest order
    pub pages: Vec<TestPage>,
}

/// Outcome of resolving one line, kept in line order
#[derive(Debug)]
enum Node {
    Page(String),
    Excluded,
    /// The manifest couldn't be fetched
    Unavailable,
    Manifest {
        ok: bool,
        children: Vec<Node>,
    },
}

impl Node {
    fn succeeded(&self) -> bool {
        match self {
            Node::Page(_) | Node::Excluded => true,
            Node::Unavailable => false,
            Node::Manifest { ok, .. } => *ok,
        }
    }

    fn flatten_into(self, pages: &mut Vec<TestPage>) {
        match self {
            Node::Page(url) => pages.push(TestPage { url }),
            Node::Manifest { children, .. } => {
                for child in children {
                    child.flatten_into(pages);
                }
            }
            Node::Excluded | Node::Unavailable => {}
        }
    }
}

/// Expands manifests into test pages
pub struct Resolver<'a> {
    fetcher: &'a dyn TextFetcher,
    options: &'a SuiteOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(fetcher: &'a dyn TextFetcher, options: &'a SuiteOptions) -> Self {
        Self { fetcher, options }
    }

    /// Resolve a root manifest (or a single page) into a flat page list.
    ///
    /// The root is parsed as a manifest line of its own, so it may carry
    /// options. Manifests that fail to load make the resolution
    /// unsuccessful; malformed option syntax anywhere in the tree is
    /// returned as an error and stops resolution.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, root: &str) -> Result<Resolution> {
        let node = self
            .resolve_line(root.to_string(), String::new(), root.to_string(), 1, OptionScope::root())
            .await?;

        let success = node.succeeded();
        let mut pages = Vec::new();
        node.flatten_into(&mut pages);

        tracing::info!(success, total = pages.len(), "Resolved manifest");
        Ok(Resolution { success, pages })
    }

    fn resolve_line(
        &self,
        source: String,
        prefix: String,
        text: String,
        line_num: usize,
        scope: OptionScope,
    ) -> BoxFuture<'_, Result<Node>> {
        async move {
            let line = ManifestLine::parse(&text, &source, line_num)?;
            let url = format!("{}{}", prefix, line.path);
            let scope = scope.with_line(&line.options);

            if !is_manifest(&url) {
                if self.options.includes(&scope) {
                    return Ok(Node::Page(url));
                }
                tracing::debug!(
                    url = %url,
                    min_version = %scope.min_version,
                    slow = scope.slow,
                    "Filtered out page"
                );
                return Ok(Node::Excluded);
            }

            let body = match self.fetcher.fetch_text(&url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Manifest unavailable");
                    return Ok(Node::Unavailable);
                }
            };

            let child_prefix = directory_prefix(&url).to_string();
            let children = body
                .lines()
                .enumerate()
                .filter_map(|(idx, raw)| entry_text(raw).map(|entry| (idx + 1, entry)))
                .map(|(num, entry)| {
                    self.resolve_line(
                        url.clone(),
                        child_prefix.clone(),
                        entry.to_string(),
                        num,
                        scope.clone(),
                    )
                })
                .collect::<Vec<_>>();

            let children = try_join_all(children).await?;
            let ok = children.iter().all(Node::succeeded);
            Ok(Node::Manifest { ok, children })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// In-memory manifests with per-URL delays
    #[derive(Default)]
    struct MapFetcher {
        files: HashMap<String, (String, u64)>,
    }

    impl MapFetcher {
        fn with(mut self, url: &str, text: &str) -> Self {
            self.files.insert(url.to_string(), (text.to_string(), 0));
            self
        }

        fn delayed(mut self, url: &str, text: &str, delay_ms: u64) -> Self {
            self.files.insert(url.to_string(), (text.to_string(), delay_ms));
            self
        }
    }

    #[async_trait]
    impl TextFetcher for MapFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            let (text, delay) = self
                .files
                .get(url)
                .cloned()
                .ok_or_else(|| Error::fetch(url, "not found"))?;
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(text)
        }
    }

    fn options(version: &str) -> SuiteOptions {
        SuiteOptions::new(Version::parse(version).unwrap())
    }

    fn urls(resolution: &Resolution) -> Vec<&str> {
        resolution.pages.iter().map(|p| p.url.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_follows_lines_not_fetch_completion() {
        let fetcher = MapFetcher::default()
            .with("root/list.txt", "b/list.txt\na.html\nc/list.txt\n")
            .delayed("root/b/list.txt", "b1.html\nb2.html\n", 50)
            .delayed("root/c/list.txt", "c1.html\n", 1);
        let opts = options("1.0.0");

        let resolution = Resolver::new(&fetcher, &opts)
            .resolve("root/list.txt")
            .await
            .unwrap();

        assert!(resolution.success);
        assert_eq!(
            urls(&resolution),
            vec![
                "root/b/b1.html",
                "root/b/b2.html",
                "root/a.html",
                "root/c/c1.html"
            ]
        );
    }

    #[tokio::test]
    async fn test_comments_and_short_lines_are_skipped() {
        let fetcher = MapFetcher::default().with(
            "list.txt",
            "# header\n; note\n// old.html\n\nab\n  page.html  \n",
        );
        let opts = options("1.0.0");

        let resolution = Resolver::new(&fetcher, &opts).resolve("list.txt").await.unwrap();
        assert_eq!(urls(&resolution), vec!["page.html"]);
    }

    #[tokio::test]
    async fn test_version_filter() {
        let fetcher = MapFetcher::default().with(
            "list.txt",
            "plain.html\n--min-version 2.0 future.html\n--min-version 1.0.0 current.html\n",
        );
        let opts = options("1.0.0");

        let resolution = Resolver::new(&fetcher, &opts).resolve("list.txt").await.unwrap();
        assert_eq!(urls(&resolution), vec!["plain.html", "current.html"]);
    }

    #[tokio::test]
    async fn test_fast_mode_drops_slow_pages() {
        let fetcher = MapFetcher::default()
            .with("list.txt", "--slow big.html\nquick.html\n--slow sub/list.txt\n")
            .with("sub/list.txt", "inherited-slow.html\n");
        let mut opts = options("9.0.0");
        opts.fast = true;

        let resolution = Resolver::new(&fetcher, &opts).resolve("list.txt").await.unwrap();
        assert_eq!(urls(&resolution), vec!["quick.html"]);

        opts.fast = false;
        let resolution = Resolver::new(&fetcher, &opts).resolve("list.txt").await.unwrap();
        assert_eq!(
            urls(&resolution),
            vec!["big.html", "quick.html", "sub/inherited-slow.html"]
        );
    }

    #[tokio::test]
    async fn test_min_version_mode_flips_filter() {
        let fetcher = MapFetcher::default().with(
            "list.txt",
            "old.html\n--min-version 2.0.0 new.html\n--min-version 3.0 newer.html\n",
        );
        let mut opts = options("1.0.0");
        opts.min_version = Some(Version::parse("2.0.0").unwrap());

        let resolution = Resolver::new(&fetcher, &opts).resolve("list.txt").await.unwrap();
        assert_eq!(urls(&resolution), vec!["new.html", "newer.html"]);
    }

    #[tokio::test]
    async fn test_child_min_version_does_not_leak_to_siblings() {
        let fetcher = MapFetcher::default()
            .with(
                "list.txt",
                "--min-version 3.0 later/list.txt\nsibling.html\n",
            )
            .with("later/list.txt", "gated.html\n--min-version 1.0 explicit.html\n");
        let opts = options("2.0.0");

        let resolution = Resolver::new(&fetcher, &opts).resolve("list.txt").await.unwrap();
        // gated.html inherits 3.0; explicit.html overrides it back down.
        assert_eq!(urls(&resolution), vec!["later/explicit.html", "sibling.html"]);
    }

    #[tokio::test]
    async fn test_paths_resolve_against_enclosing_manifest() {
        let fetcher = MapFetcher::default()
            .with("suite/list.txt", "deep/list.txt\ntop.html\n")
            .with("suite/deep/list.txt", "deeper/list.txt\n")
            .with("suite/deep/deeper/list.txt", "leaf.html\n");
        let opts = options("1.0.0");

        let resolution = Resolver::new(&fetcher, &opts)
            .resolve("suite/list.txt")
            .await
            .unwrap();
        assert_eq!(
            urls(&resolution),
            vec!["suite/deep/deeper/leaf.html", "suite/top.html"]
        );
    }

    #[tokio::test]
    async fn test_missing_manifest_fails_but_siblings_complete() {
        let fetcher = MapFetcher::default().with("list.txt", "gone/list.txt\nhere.html\n");
        let opts = options("1.0.0");

        let resolution = Resolver::new(&fetcher, &opts).resolve("list.txt").await.unwrap();
        assert!(!resolution.success);
        assert_eq!(urls(&resolution), vec!["here.html"]);
    }

    #[tokio::test]
    async fn test_bad_option_in_nested_manifest_is_fatal() {
        let fetcher = MapFetcher::default()
            .with("list.txt", "ok.html\nsub/list.txt\n")
            .with("sub/list.txt", "# comment\nfine.html\n-slow broken.html\n");
        let opts = options("1.0.0");

        let err = Resolver::new(&fetcher, &opts)
            .resolve("list.txt")
            .await
            .unwrap_err();
        match err {
            Error::ManifestParse { url, line, .. } => {
                assert_eq!(url, "sub/list.txt");
                assert_eq!(line, 3);
            }
            other => panic!("Expected ManifestParse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_root_may_be_a_single_page() {
        let fetcher = MapFetcher::default();
        let opts = options("1.0.0");

        let resolution = Resolver::new(&fetcher, &opts).resolve("one.html").await.unwrap();
        assert!(resolution.success);
        assert_eq!(urls(&resolution), vec!["one.html"]);

        let resolution = Resolver::new(&fetcher, &opts)
            .resolve("--min-version 5.0 one.html")
            .await
            .unwrap();
        assert!(resolution.success);
        assert!(resolution.pages.is_empty());
    }
}

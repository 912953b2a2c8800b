//! Manifest line parsing
//!
//! A manifest line is `[--min-version <version>] [--slow] <path>`. Option
//! tokens may appear anywhere on the line; every other token belongs to the
//! path and is rejoined with single spaces so file names may contain them.

use crate::common::{Error, Result};

use super::version::Version;

/// Lines with fewer characters than this can't name anything and are skipped
const MIN_LINE_LEN: usize = 5;

/// Suffix marking a nested manifest
const MANIFEST_SUFFIX: &str = ".txt";

/// Options written on a single manifest line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineOptions {
    /// `--min-version <version>`
    pub min_version: Option<Version>,
    /// `--slow`
    pub slow: bool,
}

/// A parsed manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLine {
    pub options: LineOptions,
    /// Path as written, not yet resolved against the manifest directory
    pub path: String,
}

impl ManifestLine {
    /// Parse a line from the manifest at `url`; `line_num` is 1-based
    pub fn parse(text: &str, url: &str, line_num: usize) -> Result<Self> {
        let mut options = LineOptions::default();
        let mut path_tokens = Vec::new();
        let mut tokens = text.split_whitespace();

        while let Some(token) = tokens.next() {
            if !token.starts_with('-') {
                path_tokens.push(token);
                continue;
            }

            let Some(option) = token.strip_prefix("--") else {
                return Err(Error::manifest_parse(url, line_num, token));
            };

            match option {
                "slow" => options.slow = true,
                "min-version" => {
                    let value = tokens.next().ok_or_else(|| {
                        Error::manifest_parse(url, line_num, "--min-version requires a version")
                    })?;
                    let version = Version::parse(value).map_err(|e| {
                        Error::manifest_parse(url, line_num, e.to_string())
                    })?;
                    options.min_version = Some(version);
                }
                _ => {
                    return Err(Error::manifest_parse(
                        url,
                        line_num,
                        format!("unknown option '{}': {}", option, token),
                    ))
                }
            }
        }

        if path_tokens.is_empty() {
            return Err(Error::manifest_parse(url, line_num, "missing path"));
        }

        Ok(Self {
            options,
            path: path_tokens.join(" "),
        })
    }
}

/// Return the trimmed line if it names an entry, or None for comments and
/// lines too short to matter
pub fn entry_text(raw: &str) -> Option<&str> {
    let line = raw.trim();
    let is_comment = line.starts_with('#') || line.starts_with(';') || line.starts_with("//");
    (line.chars().count() >= MIN_LINE_LEN && !is_comment).then_some(line)
}

/// Whether a resolved URL refers to a nested manifest
pub fn is_manifest(url: &str) -> bool {
    url.ends_with(MANIFEST_SUFFIX)
}

/// Directory prefix of a URL, up to and including its last `/`
pub fn directory_prefix(url: &str) -> &str {
    match url.rfind('/') {
        Some(idx) => &url[..=idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        let line = ManifestLine::parse("conformance/basic.html", "list.txt", 1).unwrap();
        assert_eq!(line.path, "conformance/basic.html");
        assert_eq!(line.options, LineOptions::default());
    }

    #[test]
    fn test_options_and_spaced_path() {
        let line =
            ManifestLine::parse("--min-version 2.0.1 --slow my test page.html", "l.txt", 3).unwrap();
        assert_eq!(line.path, "my test page.html");
        assert!(line.options.slow);
        assert_eq!(line.options.min_version, Some(Version::parse("2.0.1").unwrap()));
    }

    #[test]
    fn test_single_dash_is_rejected() {
        let err = ManifestLine::parse("-slow page.html", "suite/list.txt", 4).unwrap_err();
        match err {
            Error::ManifestParse { url, line, .. } => {
                assert_eq!(url, "suite/list.txt");
                assert_eq!(line, 4);
            }
            other => panic!("Expected ManifestParse, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let err = ManifestLine::parse("--fast page.html", "list.txt", 9).unwrap_err();
        assert!(err.to_string().contains("list.txt:9"));
        assert!(err.to_string().contains("unknown option 'fast'"));
    }

    #[test]
    fn test_min_version_needs_valid_argument() {
        assert!(ManifestLine::parse("--min-version", "list.txt", 1).is_err());
        assert!(ManifestLine::parse("--min-version two page.html", "list.txt", 1).is_err());
    }

    #[test]
    fn test_entry_text_skips_comments_and_short_lines() {
        assert_eq!(entry_text("   a.html  "), Some("a.html"));
        assert_eq!(entry_text("# a.html"), None);
        assert_eq!(entry_text("; a.html"), None);
        assert_eq!(entry_text("// a.html"), None);
        assert_eq!(entry_text("a.js"), None);
        assert_eq!(entry_text("é.js"), None);
        assert_eq!(entry_text("éé.js"), Some("éé.js"));
        assert_eq!(entry_text(""), None);
    }

    #[test]
    fn test_directory_prefix() {
        assert_eq!(directory_prefix("suite/more/list.txt"), "suite/more/");
        assert_eq!(directory_prefix("http://host/list.txt"), "http://host/");
        assert_eq!(directory_prefix("list.txt"), "");
        assert!(is_manifest("suite/list.txt"));
        assert!(!is_manifest("suite/page.html"));
    }
}

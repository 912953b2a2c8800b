//! Dotted suite versions
//!
//! Versions look like `1.0.2`, optionally followed by a space and a free-form
//! annotation (`"2.0.0 beta"`). Only the dotted part takes part in
//! comparisons.

use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};

/// Default minimum version for pages that don't declare one
pub const DEFAULT_MIN_VERSION: &str = "1.0";

/// A dotted numeric version such as `1.0.3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    components: Vec<u32>,
}

impl Version {
    /// Parse a version string, ignoring anything after the first space
    pub fn parse(text: &str) -> Result<Self> {
        let dotted = text.trim_start().split(' ').next().unwrap_or_default();
        if dotted.is_empty() {
            return Err(Error::invalid_version(text, "empty version"));
        }

        let components = dotted
            .split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|_| {
                    Error::invalid_version(text, format!("'{}' is not a number", part))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { components })
    }

    /// Minimum version assumed for pages without `--min-version`
    pub fn default_min() -> Self {
        Self {
            components: vec![1, 0],
        }
    }

    pub fn components(&self) -> &[u32] {
        &self.components
    }

    /// Whether `self` satisfies `want`.
    ///
    /// Walks the components of `want`; a component missing from `self`
    /// counts as 0, and the first component of `self` below its
    /// counterpart in `want` fails the check. Components of `self` beyond
    /// the length of `want` are not looked at.
    pub fn at_least(&self, want: &Version) -> bool {
        want.components.iter().enumerate().all(|(i, wanted)| {
            let have = self.components.get(i).copied().unwrap_or(0);
            have >= *wanted
        })
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

/// Compare two version strings with [`Version::at_least`]
pub fn greater_or_equal(have: &str, want: &str) -> Result<bool> {
    Ok(Version::parse(have)?.at_least(&Version::parse(want)?))
}

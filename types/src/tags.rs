//! Tag registry: the indicator character and the directive names a template
//! engine recognizes.
//!
//! The registry is owned by the surrounding engine configuration. Consumers
//! only ask membership questions of it.

use std::collections::BTreeSet;

use serde::Deserialize;

/// Character that introduces a template directive.
pub const DEFAULT_TAG_INDICATOR: char = '#';

/// Block-opening directive names recognized out of the box.
pub const DEFAULT_OPENERS: &[&str] = &[
    "for", "if", "elseif", "else", "while", "export", "extend", "import", "raw",
];

/// Block-closing directive names recognized out of the box.
pub const DEFAULT_CLOSERS: &[&str] = &[
    "endfor",
    "endif",
    "endwhile",
    "endexport",
    "endextend",
    "endraw",
];

/// Indicator plus opener/closer name sets.
///
/// ```toml
/// [tags]
/// indicator = "#"
/// openers = ["for", "if"]
/// closers = ["endfor", "endif"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagRegistry {
    indicator: char,
    openers: BTreeSet<String>,
    closers: BTreeSet<String>,
}

impl TagRegistry {
    /// Registry with the given indicator and no names.
    #[must_use]
    pub fn empty(indicator: char) -> Self {
        Self {
            indicator,
            openers: BTreeSet::new(),
            closers: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_opener(mut self, name: impl Into<String>) -> Self {
        self.openers.insert(name.into());
        self
    }

    #[must_use]
    pub fn with_closer(mut self, name: impl Into<String>) -> Self {
        self.closers.insert(name.into());
        self
    }

    #[must_use]
    pub fn with_openers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.openers.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_closers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.closers.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn indicator(&self) -> char {
        self.indicator
    }

    #[must_use]
    pub fn is_opener(&self, name: &str) -> bool {
        self.openers.contains(name)
    }

    #[must_use]
    pub fn is_closer(&self, name: &str) -> bool {
        self.closers.contains(name)
    }

    /// Whether `name` is any recognized directive.
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.is_opener(name) || self.is_closer(name)
    }

    pub fn openers(&self) -> impl Iterator<Item = &str> {
        self.openers.iter().map(String::as_str)
    }

    pub fn closers(&self) -> impl Iterator<Item = &str> {
        self.closers.iter().map(String::as_str)
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::empty(DEFAULT_TAG_INDICATOR)
            .with_openers(DEFAULT_OPENERS.iter().copied())
            .with_closers(DEFAULT_CLOSERS.iter().copied())
    }
}

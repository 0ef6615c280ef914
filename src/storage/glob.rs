use crate::error::Result;
use globset::{GlobBuilder, GlobMatcher};
use std::fmt;

const WILDCARDS: &[char] = &['*', '?', '[', '{'];

/// A glob pattern split into its literal base and a matcher for what lies below it.
///
/// `*` stays within one level. `**` not followed by `/` (as in `data/**.csv`)
/// reaches any depth, immediate children included. The base is never
/// interpreted, so directory names may contain `{`, `[` and friends.
#[derive(Debug, Clone)]
pub struct GlobQuery {
    base: String,
    relative: String,
    recursive: bool,
    matcher: GlobMatcher,
}

impl GlobQuery {
    /// Query for `relative` below the literal directory `base`
    pub fn new(base: impl Into<String>, relative: &str) -> Result<Self> {
        let glob = GlobBuilder::new(&expand_double_star(relative))
            .literal_separator(true)
            .build()?;

        Ok(Self {
            base: base.into(),
            relative: relative.to_string(),
            recursive: relative.contains("**"),
            matcher: glob.compile_matcher(),
        })
    }

    /// Split a pattern string at the last `/` before its first wildcard
    pub fn parse(pattern: &str) -> Result<Self> {
        let first_wildcard = pattern.find(WILDCARDS).unwrap_or(pattern.len());
        let split = pattern[..first_wildcard].rfind('/').map(|i| i + 1).unwrap_or(0);
        let (base, relative) = pattern.split_at(split);
        Self::new(base, relative)
    }

    /// Literal part of the pattern, up to and including its last `/`
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Match a path given relative to [`GlobQuery::base`]
    pub fn matches_relative(&self, relative: &str) -> bool {
        !relative.is_empty() && !relative.ends_with('/') && self.matcher.is_match(relative)
    }

    /// Match a full path in the same scheme as the pattern
    pub fn matches(&self, path: &str) -> bool {
        path.strip_prefix(self.base.as_str())
            .is_some_and(|relative| self.matches_relative(relative))
    }
}

impl fmt::Display for GlobQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.relative)
    }
}

// `**.csv` -> `**/*.csv`, which globset reads as "any depth, including none"
fn expand_double_star(relative: &str) -> String {
    let mut out = String::with_capacity(relative.len() + 2);
    let mut rest = relative;
    while let Some(idx) = rest.find("**") {
        out.push_str(&rest[..idx]);
        out.push_str("**");
        rest = &rest[idx + 2..];
        if !rest.is_empty() && !rest.starts_with('/') {
            out.push_str("/*");
        }
    }
    out.push_str(rest);
    out
}

//! Resource blocking rules applied to collector tabs

use anyhow::{Result, anyhow};
use regex::Regex;

use crate::utils::constants::DEFAULT_BLOCKED_RESOURCES;

/// Compile a glob pattern (only `*` is special) into an anchored regex
fn compile_glob_pattern(pattern: &str) -> Result<Regex> {
    let regex_pattern = regex::escape(pattern).replace(r"\*", ".*");
    let anchored = format!("^{regex_pattern}$");

    Regex::new(&anchored).map_err(|e| anyhow!("Invalid glob pattern '{pattern}': {e}"))
}

/// URL patterns whose requests are aborted before they leave the browser
#[derive(Debug, Clone, Default)]
pub struct RequestBlockPolicy {
    patterns: Vec<String>,
    compiled: Vec<Regex>,
}

impl RequestBlockPolicy {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let compiled = patterns
            .iter()
            .map(|p| compile_glob_pattern(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns, compiled })
    }

    /// Built-in patterns followed by `extra`
    pub fn with_defaults(extra: &[String]) -> Result<Self> {
        Self::new(
            DEFAULT_BLOCKED_RESOURCES
                .iter()
                .map(|p| (*p).to_string())
                .chain(extra.iter().cloned()),
        )
    }

    #[must_use]
    pub fn is_blocked(&self, url: &str) -> bool {
        self.compiled.iter().any(|re| re.is_match(url))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

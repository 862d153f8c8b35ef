//! Filter decision engine
//!
//! Evaluation order:
//! 1. Allow-all policy → allow
//! 2. Browser-internal schemes and the new tab page → allow
//! 3. Unparseable URL or no hostname → allow
//! 4. Whitelist: block unless an allow tier matches
//! 5. Blacklist: global tier wins, otherwise block on a deny match

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FilterError;
use crate::mode::FilterMode;
use crate::rule::Candidate;
use crate::ruleset::RuleSet;
use crate::Result;

/// Schemes that are never filtered
pub const DEFAULT_EXCLUDED_SCHEMES: &[&str] =
    &["about", "chrome", "chrome-devtools", "chrome-search"];

/// Substrings identifying the browser's new tab page
pub const DEFAULT_NEW_TAB_MARKERS: &[&str] = &["chrome-search://"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    Block,
}

impl Verdict {
    pub fn is_block(&self) -> bool {
        matches!(self, Verdict::Block)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allow => "ALLOW",
            Verdict::Block => "BLOCK",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// URLs that bypass rule matching entirely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeExclusions {
    schemes: Vec<String>,
    new_tab_markers: Vec<String>,
}

impl SchemeExclusions {
    pub fn new<S, M>(schemes: S, new_tab_markers: M) -> Self
    where
        S: IntoIterator<Item = String>,
        M: IntoIterator<Item = String>,
    {
        Self {
            schemes: schemes.into_iter().map(|s| s.to_lowercase()).collect(),
            new_tab_markers: new_tab_markers
                .into_iter()
                .map(|m| m.to_lowercase())
                .collect(),
        }
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        let url = url.trim().to_lowercase();

        if self
            .new_tab_markers
            .iter()
            .any(|marker| url.contains(marker.as_str()))
        {
            return true;
        }

        match url.split_once(':') {
            Some((scheme, _)) => self.schemes.iter().any(|s| s == scheme),
            None => false,
        }
    }
}

impl Default for SchemeExclusions {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXCLUDED_SCHEMES.iter().map(|s| s.to_string()),
            DEFAULT_NEW_TAB_MARKERS.iter().map(|m| m.to_string()),
        )
    }
}

/// Immutable decision engine over one compiled policy
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    rules: RuleSet,
    exclusions: SchemeExclusions,
}

impl FilterEngine {
    pub fn new(rules: RuleSet, exclusions: SchemeExclusions) -> Self {
        Self { rules, exclusions }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn mode(&self) -> FilterMode {
        self.rules.mode()
    }

    /// `true` when the URL must be redirected away
    pub fn should_filter(&self, url: &str) -> bool {
        self.evaluate(url).is_block()
    }

    /// Decide a URL. Never fails; parse problems resolve to `Allow`.
    pub fn evaluate(&self, url: &str) -> Verdict {
        let mode = self.rules.mode();

        if mode == FilterMode::AllowAll {
            tracing::debug!("Filtering should not be applied for allow all");
            return Verdict::Allow;
        }

        if self.exclusions.is_excluded(url) {
            tracing::debug!(url = %url, "URL is always excluded from filtering");
            return Verdict::Allow;
        }

        let host = match host_of(url) {
            Ok(Some(host)) => host,
            Ok(None) => {
                tracing::warn!(url = %url, "URL has no hostname, allowing it");
                return Verdict::Allow;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to evaluate URL, allowing it");
                return Verdict::Allow;
            }
        };

        let candidate = Candidate::new(url, &host);

        let verdict = match mode {
            FilterMode::Whitelist => {
                if self.rules.matches_allow_tier(&candidate) {
                    Verdict::Allow
                } else {
                    Verdict::Block
                }
            }
            FilterMode::Blacklist => {
                if self.rules.matches_global_tier(&candidate) {
                    // Globally allowed sites pass even in a blacklist
                    Verdict::Allow
                } else if !self.rules.matches_allow_tier(&candidate)
                    && self.rules.matches_deny(&candidate)
                {
                    Verdict::Block
                } else {
                    Verdict::Allow
                }
            }
            FilterMode::AllowAll => Verdict::Allow,
        };

        tracing::trace!(url = %url, mode = %mode, verdict = %verdict, "URL evaluated");

        verdict
    }
}

fn host_of(url: &str) -> Result<Option<String>> {
    let parsed = Url::parse(url).map_err(|source| FilterError::UrlParse {
        url: url.to_string(),
        source,
    })?;

    Ok(parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_lowercase))
}

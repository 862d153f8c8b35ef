//! Rule entries and their compiled matchers
//!
//! A rule arrives either as a bare string (`"example.com"`) or as a structured
//! record (`{"identifier": "example.com/quizzes", "ostype": "web-fragment"}`).
//! Plain rules search the URL (and compare hosts when they name one);
//! web-fragment rules are path-aware patterns over the whole URL.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FilterError;
use crate::Result;

/// Tag value selecting the web-fragment matcher
const WEB_FRAGMENT_TAG: &str = "web-fragment";

/// Characters allowed right after a web-fragment path that ended in `/`
const PATH_TERMINATOR: &str = r"(?:[/?#:]|$)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// Host (or raw substring) match
    #[serde(rename = "web")]
    Plain,
    /// Path-aware URL pattern
    WebFragment,
}

impl RuleKind {
    /// Map a raw kind tag. Absent or unrecognized tags fall back to `Plain`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(t) if t.trim().eq_ignore_ascii_case(WEB_FRAGMENT_TAG) => RuleKind::WebFragment,
            _ => RuleKind::Plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Plain => "web",
            RuleKind::WebFragment => WEB_FRAGMENT_TAG,
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw rule as delivered by the policy source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    /// Bare hostname, URL or other identifier
    Bare(String),
    /// Identifier with an optional kind tag
    Structured {
        identifier: String,
        #[serde(default, alias = "ostype", skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
}

impl RuleEntry {
    pub fn plain(identifier: impl Into<String>) -> Self {
        RuleEntry::Bare(identifier.into())
    }

    pub fn web_fragment(identifier: impl Into<String>) -> Self {
        RuleEntry::Structured {
            identifier: identifier.into(),
            kind: Some(WEB_FRAGMENT_TAG.to_string()),
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            RuleEntry::Bare(identifier) => identifier,
            RuleEntry::Structured { identifier, .. } => identifier,
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RuleEntry::Bare(_) => RuleKind::Plain,
            RuleEntry::Structured { kind, .. } => RuleKind::from_tag(kind.as_deref()),
        }
    }
}

impl From<&str> for RuleEntry {
    fn from(identifier: &str) -> Self {
        RuleEntry::plain(identifier)
    }
}

impl From<String> for RuleEntry {
    fn from(identifier: String) -> Self {
        RuleEntry::Bare(identifier)
    }
}

/// A URL prepared once per evaluation and shared by every rule
#[derive(Debug)]
pub(crate) struct Candidate<'a> {
    pub url: &'a str,
    pub url_lower: String,
    pub host: String,
}

impl<'a> Candidate<'a> {
    pub fn new(url: &'a str, host: &str) -> Self {
        Self {
            url,
            url_lower: url.to_lowercase(),
            host: host.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Right-anchored host comparison (`example.com` matches `www.example.com`),
    /// falling back to a URL substring search
    Host(String),
    /// Verbatim substring of the full URL
    Substring(String),
    /// Case-insensitive pattern searched in the full URL
    WebFragment(Regex),
    /// Placeholder for a rule that failed to compile
    Inert,
}

/// A rule ready for matching
#[derive(Debug, Clone)]
pub struct CompiledRule {
    identifier: String,
    kind: RuleKind,
    matcher: Matcher,
}

impl CompiledRule {
    /// Compile a raw entry into a matcher
    pub fn compile(entry: &RuleEntry) -> Result<Self> {
        let identifier = entry.identifier().trim();
        let kind = entry.kind();

        if identifier.is_empty() {
            return Err(FilterError::RuleCompilation {
                identifier: entry.identifier().to_string(),
                reason: "identifier is empty".to_string(),
            });
        }

        let matcher = match kind {
            RuleKind::Plain => {
                let normalized = identifier.to_lowercase();
                if is_hostname(&normalized) {
                    Matcher::Host(normalized)
                } else {
                    Matcher::Substring(normalized)
                }
            }
            RuleKind::WebFragment => Matcher::WebFragment(web_fragment_regex(identifier)?),
        };

        Ok(Self {
            identifier: identifier.to_string(),
            kind,
            matcher,
        })
    }

    /// A rule that keeps its slot in the rule set but never matches
    pub fn inert(entry: &RuleEntry) -> Self {
        Self {
            identifier: entry.identifier().to_string(),
            kind: entry.kind(),
            matcher: Matcher::Inert,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn is_inert(&self) -> bool {
        matches!(self.matcher, Matcher::Inert)
    }

    /// Match against a raw URL. URLs without a host never match.
    pub fn matches_url(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        match parsed.host_str() {
            Some(host) if !host.is_empty() => self.matches(&Candidate::new(url, host)),
            _ => false,
        }
    }

    pub(crate) fn matches(&self, candidate: &Candidate<'_>) -> bool {
        match &self.matcher {
            Matcher::Host(rule_host) => {
                host_matches(&candidate.host, rule_host)
                    || candidate.url_lower.contains(rule_host.as_str())
            }
            Matcher::Substring(needle) => candidate.url_lower.contains(needle.as_str()),
            Matcher::WebFragment(regex) => regex.is_match(candidate.url),
            Matcher::Inert => false,
        }
    }
}

/// `host` equals `rule_host` or is one of its subdomains
fn host_matches(host: &str, rule_host: &str) -> bool {
    host.strip_suffix(rule_host)
        .is_some_and(|prefix| prefix.is_empty() || prefix.ends_with('.'))
}

fn is_hostname(identifier: &str) -> bool {
    !identifier.starts_with('.')
        && !identifier.ends_with('.')
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

fn web_fragment_regex(identifier: &str) -> Result<Regex> {
    let (body, tail) = match identifier.strip_suffix('/') {
        Some(body) => (body, PATH_TERMINATOR),
        None => (identifier, ""),
    };

    if body.is_empty() {
        return Err(FilterError::RuleCompilation {
            identifier: identifier.to_string(),
            reason: "web fragment has no host or path".to_string(),
        });
    }

    let pattern = format!(r"(?:[^.]\.)*{}{}", regex::escape(body), tail);

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| FilterError::RuleCompilation {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })
}

//! Compiled rule tiers
//!
//! A `RuleSet` is built in one go from the four raw lists and never mutated
//! afterwards; a policy change produces a new set.

use crate::mode::FilterMode;
use crate::rule::{Candidate, CompiledRule, RuleEntry};

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// Application rules, always containing the landing page host
    core_allow: Vec<CompiledRule>,
    /// Organization-wide allow rules
    global_allow: Vec<CompiledRule>,
    /// Allow rules of the current plan
    user_allow: Vec<CompiledRule>,
    /// Deny rules of the current plan
    deny: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile the four raw tiers. `redirect_host` is appended to the core tier
    /// so the landing page can never block itself.
    pub fn build(
        core: &[RuleEntry],
        global: &[RuleEntry],
        user: &[RuleEntry],
        deny: &[RuleEntry],
        redirect_host: Option<&str>,
    ) -> Self {
        let mut core_allow = compile_tier("core", core);
        if let Some(host) = redirect_host {
            core_allow.extend(compile_tier("core", &[RuleEntry::plain(host)]));
        }

        let rules = Self {
            core_allow,
            global_allow: compile_tier("global", global),
            user_allow: compile_tier("user", user),
            deny: compile_tier("deny", deny),
        };

        tracing::debug!(
            core = rules.core_allow.len(),
            global = rules.global_allow.len(),
            user = rules.user_allow.len(),
            deny = rules.deny.len(),
            mode = %rules.mode(),
            "Rule set compiled"
        );

        rules
    }

    pub fn mode(&self) -> FilterMode {
        FilterMode::derive(self.user_allow.len(), self.deny.len())
    }

    pub fn core_allow(&self) -> &[CompiledRule] {
        &self.core_allow
    }

    pub fn global_allow(&self) -> &[CompiledRule] {
        &self.global_allow
    }

    pub fn user_allow(&self) -> &[CompiledRule] {
        &self.user_allow
    }

    pub fn deny(&self) -> &[CompiledRule] {
        &self.deny
    }

    pub fn is_empty(&self) -> bool {
        self.core_allow.is_empty()
            && self.global_allow.is_empty()
            && self.user_allow.is_empty()
            && self.deny.is_empty()
    }

    /// Core or global rules match
    pub(crate) fn matches_global_tier(&self, candidate: &Candidate<'_>) -> bool {
        any_match(&self.core_allow, candidate) || any_match(&self.global_allow, candidate)
    }

    /// Any allow rule (core, global or user) matches
    pub(crate) fn matches_allow_tier(&self, candidate: &Candidate<'_>) -> bool {
        self.matches_global_tier(candidate) || any_match(&self.user_allow, candidate)
    }

    pub(crate) fn matches_deny(&self, candidate: &Candidate<'_>) -> bool {
        any_match(&self.deny, candidate)
    }
}

fn any_match(rules: &[CompiledRule], candidate: &Candidate<'_>) -> bool {
    rules.iter().any(|rule| rule.matches(candidate))
}

fn compile_tier(tier: &str, entries: &[RuleEntry]) -> Vec<CompiledRule> {
    entries
        .iter()
        .map(|entry| {
            CompiledRule::compile(entry).unwrap_or_else(|e| {
                tracing::error!(tier, error = %e, "Dropping rule that failed to compile");
                CompiledRule::inert(entry)
            })
        })
        .collect()
}

//! navguard URL filtering
//!
//! Decides whether a navigation is allowed under the active policy:
//! - Core + global allow tier (always wins, includes the landing page host)
//! - User allow tier (presence switches the policy into whitelist mode)
//! - Deny tier (blacklist mode when no user allow rules exist)
//!
//! Rules are compiled once per policy update and matched synchronously.

mod engine;
mod error;
mod mode;
mod rule;
mod ruleset;

pub use engine::{
    FilterEngine, SchemeExclusions, Verdict, DEFAULT_EXCLUDED_SCHEMES, DEFAULT_NEW_TAB_MARKERS,
};
pub use error::FilterError;
pub use mode::FilterMode;
pub use rule::{CompiledRule, RuleEntry, RuleKind};
pub use ruleset::RuleSet;

pub type Result<T> = std::result::Result<T, FilterError>;

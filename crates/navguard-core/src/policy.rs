//! Policy documents
//!
//! A policy is the four raw rule tiers as delivered by the backend.

use serde::{Deserialize, Serialize};
use std::path::Path;

use navguard_filter::{FilterMode, RuleEntry};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDocument {
    /// Application rules
    #[serde(alias = "coreAllow")]
    pub core: Vec<RuleEntry>,
    /// Organization-wide allow rules
    #[serde(alias = "globalAllow")]
    pub global: Vec<RuleEntry>,
    /// Allow rules of the current plan
    #[serde(alias = "userAllow", alias = "allow")]
    pub user: Vec<RuleEntry>,
    /// Deny rules of the current plan
    #[serde(alias = "block")]
    pub deny: Vec<RuleEntry>,
}

impl PolicyDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let policy = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            user = policy.user.len(),
            deny = policy.deny.len(),
            "Loaded policy"
        );
        Ok(policy)
    }

    /// Mode this policy will put the filter in
    pub fn mode(&self) -> FilterMode {
        FilterMode::derive(self.user.len(), self.deny.len())
    }
}

//! Filter mode
//!
//! ```text
//! user allow rules present        -> Whitelist
//! no user allow, deny rules exist -> Blacklist
//! neither                         -> AllowAll
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// No filtering, every URL is allowed
    #[default]
    AllowAll,
    /// Only URLs matching an allow tier are permitted
    Whitelist,
    /// URLs matching the deny tier are blocked unless globally allowed
    Blacklist,
}

impl FilterMode {
    /// Derive the mode from tier sizes
    pub fn derive(user_allow_len: usize, deny_len: usize) -> Self {
        if user_allow_len > 0 {
            FilterMode::Whitelist
        } else if deny_len > 0 {
            FilterMode::Blacklist
        } else {
            FilterMode::AllowAll
        }
    }

    /// Whether navigation events need to be watched in this mode
    pub fn is_restrictive(&self) -> bool {
        !matches!(self, FilterMode::AllowAll)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::AllowAll => "allow",
            FilterMode::Whitelist => "whitelist",
            FilterMode::Blacklist => "blacklist",
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

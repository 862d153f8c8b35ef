//! Host-side data carried by events
//!
//! These are transient views handed over by the browser for a single event;
//! nothing here is persisted.

use serde::{Deserialize, Serialize};

/// Browser-assigned tab identifier
pub type TabId = i32;

/// Tab id the browser uses for navigations outside any tab
pub const INVALID_TAB_ID: TabId = -1;

/// Frame id of a tab's top-level document
pub const TOP_LEVEL_FRAME_ID: i32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub id: TabId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub active: bool,
}

impl TabSnapshot {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            title: String::new(),
            active: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn activated(mut self) -> Self {
        self.active = true;
        self
    }

    /// Title with fallback to the URL
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub focused: bool,
    #[serde(default)]
    pub tabs: Vec<TabSnapshot>,
}

impl WindowSnapshot {
    pub fn active_tab(&self) -> Option<&TabSnapshot> {
        self.tabs.iter().find(|tab| tab.active)
    }
}

/// Payload of navigation committed/completed callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationDetails {
    pub tab_id: TabId,
    pub frame_id: i32,
    pub url: String,
}

impl NavigationDetails {
    pub fn new(tab_id: TabId, frame_id: i32, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            frame_id,
            url: url.into(),
        }
    }

    /// Only top-level navigations of real tabs are user-visible
    pub fn is_user_visible(&self) -> bool {
        self.tab_id != INVALID_TAB_ID && self.frame_id == TOP_LEVEL_FRAME_ID
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

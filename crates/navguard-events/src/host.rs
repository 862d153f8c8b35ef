//! Host browser boundary
//!
//! The host implements [`BrowserHost`] and forwards its callbacks as
//! [`HostEvent`]s to [`crate::SubscriptionBroker::handle_host_event`].

use async_trait::async_trait;

use crate::tab::{ExtensionInfo, NavigationDetails, TabId, TabSnapshot, WindowSnapshot};
use crate::Result;

/// Listener slots the broker registers with the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    ExtensionInstalled,
    ExtensionUninstalled,
    ExtensionEnabled,
    ExtensionDisabled,
    TabCreated,
    TabRemoved,
    NavigationCommitted,
    NavigationCompleted,
}

impl HostEventKind {
    pub const ALL: [HostEventKind; 8] = [
        HostEventKind::ExtensionInstalled,
        HostEventKind::ExtensionUninstalled,
        HostEventKind::ExtensionEnabled,
        HostEventKind::ExtensionDisabled,
        HostEventKind::TabCreated,
        HostEventKind::TabRemoved,
        HostEventKind::NavigationCommitted,
        HostEventKind::NavigationCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HostEventKind::ExtensionInstalled => "extension-installed",
            HostEventKind::ExtensionUninstalled => "extension-uninstalled",
            HostEventKind::ExtensionEnabled => "extension-enabled",
            HostEventKind::ExtensionDisabled => "extension-disabled",
            HostEventKind::TabCreated => "tab-created",
            HostEventKind::TabRemoved => "tab-removed",
            HostEventKind::NavigationCommitted => "navigation-committed",
            HostEventKind::NavigationCompleted => "navigation-completed",
        }
    }
}

impl std::fmt::Display for HostEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw callback payloads from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    ExtensionInstalled(ExtensionInfo),
    ExtensionUninstalled(String),
    ExtensionEnabled(ExtensionInfo),
    ExtensionDisabled(ExtensionInfo),
    TabCreated(TabSnapshot),
    TabRemoved(TabId),
    NavigationCommitted(NavigationDetails),
    NavigationCompleted(NavigationDetails),
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::ExtensionInstalled(_) => HostEventKind::ExtensionInstalled,
            HostEvent::ExtensionUninstalled(_) => HostEventKind::ExtensionUninstalled,
            HostEvent::ExtensionEnabled(_) => HostEventKind::ExtensionEnabled,
            HostEvent::ExtensionDisabled(_) => HostEventKind::ExtensionDisabled,
            HostEvent::TabCreated(_) => HostEventKind::TabCreated,
            HostEvent::TabRemoved(_) => HostEventKind::TabRemoved,
            HostEvent::NavigationCommitted(_) => HostEventKind::NavigationCommitted,
            HostEvent::NavigationCompleted(_) => HostEventKind::NavigationCompleted,
        }
    }
}

/// Browser APIs required by the filter
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Every open tab across all windows
    async fn query_all_tabs(&self) -> Result<Vec<TabSnapshot>>;

    /// A single tab, `None` if it no longer exists
    async fn get_tab(&self, tab_id: TabId) -> Result<Option<TabSnapshot>>;

    /// Navigate a tab to `url`
    async fn update_tab_url(&self, tab_id: TabId, url: &str) -> Result<()>;

    /// The last focused window with its tabs, `None` if there is none
    async fn last_focused_window(&self) -> Result<Option<WindowSnapshot>>;

    /// Start delivering events of `kind`
    fn add_listener(&self, kind: HostEventKind);

    /// Stop delivering events of `kind`
    fn remove_listener(&self, kind: HostEventKind);
}

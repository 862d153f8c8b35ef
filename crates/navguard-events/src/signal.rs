//! Normalized signals published by the broker

use crate::tab::{ExtensionInfo, TabSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserSignal {
    /// The focused tab may have changed (consumed by thumbnailing)
    ActiveTabChanged(TabSnapshot),
    /// A tab was created or navigated and needs re-evaluation
    TabChanged(TabSnapshot),
    /// The focused window could not be resolved; carries the host error if any
    ActiveWindowUnavailable(Option<String>),
    ExtensionInstalled(ExtensionInfo),
    ExtensionUninstalled(String),
    ExtensionActive(ExtensionInfo),
    ExtensionInactive(ExtensionInfo),
}

impl BrowserSignal {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserSignal::ActiveTabChanged(_) => "activeTabChanged",
            BrowserSignal::TabChanged(_) => "tabChange",
            BrowserSignal::ActiveWindowUnavailable(_) => "failActiveWindow",
            BrowserSignal::ExtensionInstalled(_) => "extensionInstalled",
            BrowserSignal::ExtensionUninstalled(_) => "extensionUninstalled",
            BrowserSignal::ExtensionActive(_) => "extensionActive",
            BrowserSignal::ExtensionInactive(_) => "extensionInactive",
        }
    }

    /// The tab carried by tab signals
    pub fn tab(&self) -> Option<&TabSnapshot> {
        match self {
            BrowserSignal::ActiveTabChanged(tab) | BrowserSignal::TabChanged(tab) => Some(tab),
            _ => None,
        }
    }
}

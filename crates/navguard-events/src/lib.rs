//! navguard Browser Events
//!
//! Bridges the host browser's tab, navigation and extension callbacks into a
//! single stream of normalized signals. One host subscription is shared by
//! every consumer through reference counting; a periodic poll of the focused
//! window backs up the event listeners.

mod broker;
mod error;
mod host;
mod signal;
mod tab;

pub use broker::{SubscriptionBroker, SubscriptionGuard, DEFAULT_POLL_INTERVAL};
pub use error::HostError;
pub use host::{BrowserHost, HostEvent, HostEventKind};
pub use signal::BrowserSignal;
pub use tab::{ExtensionInfo, NavigationDetails, TabId, TabSnapshot, WindowSnapshot};

pub type Result<T> = std::result::Result<T, HostError>;

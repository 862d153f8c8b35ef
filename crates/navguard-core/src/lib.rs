//! navguard Core
//!
//! Keeps every open tab compliant with the active navigation policy.
//! The controller owns the compiled policy; the host browser only reports
//! events and executes redirects.

mod bus;
mod config;
mod controller;
mod error;
mod policy;

pub use bus::{MessageBus, Notification, Published};
pub use config::{Config, DEFAULT_REDIRECT_LOCATION};
pub use controller::TabPolicyController;
pub use error::CoreError;
pub use policy::PolicyDocument;

// Re-export the filter and event layers
pub use navguard_events::{
    BrowserHost, BrowserSignal, ExtensionInfo, HostError, HostEvent, HostEventKind,
    NavigationDetails, SubscriptionBroker, SubscriptionGuard, TabId, TabSnapshot, WindowSnapshot,
};
pub use navguard_events::Result as HostResult;
pub use navguard_filter::{
    CompiledRule, FilterEngine, FilterError, FilterMode, RuleEntry, RuleKind, RuleSet,
    SchemeExclusions, Verdict,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging on stderr
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

//! Subscription broker
//!
//! ```text
//! register (0 -> 1)    attach: add host listeners, start window poll
//! register (n -> n+1)  no-op
//! unregister (1 -> 0)  detach: remove host listeners, stop window poll
//! unregister (n -> n-1) no-op
//! ```
//!
//! Host callbacks that arrive after detach are dropped.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::host::{BrowserHost, HostEvent, HostEventKind};
use crate::signal::BrowserSignal;
use crate::tab::{NavigationDetails, TabSnapshot};

/// Interval of the focused-window poll
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const SIGNAL_CAPACITY: usize = 256;

#[derive(Default)]
struct BrokerState {
    ref_count: i64,
    attached: bool,
    poll_task: Option<JoinHandle<()>>,
}

pub struct SubscriptionBroker {
    host: Arc<dyn BrowserHost>,
    state: Mutex<BrokerState>,
    signals: broadcast::Sender<BrowserSignal>,
    poll_interval: Duration,
}

impl SubscriptionBroker {
    pub fn new(host: Arc<dyn BrowserHost>, poll_interval: Duration) -> Arc<Self> {
        let poll_interval = if poll_interval.is_zero() {
            tracing::warn!("Poll interval of zero requested, using the default");
            DEFAULT_POLL_INTERVAL
        } else {
            poll_interval
        };
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);

        Arc::new(Self {
            host,
            state: Mutex::new(BrokerState::default()),
            signals,
            poll_interval,
        })
    }

    /// Receive every signal published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<BrowserSignal> {
        self.signals.subscribe()
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    pub fn ref_count(&self) -> usize {
        self.state.lock().ref_count.max(0) as usize
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Take a reference that is released when the guard drops
    pub fn acquire(self: &Arc<Self>) -> SubscriptionGuard {
        self.register();
        SubscriptionGuard {
            broker: Arc::clone(self),
        }
    }

    pub fn register(self: &Arc<Self>) {
        let mut state = self.state.lock();

        if state.ref_count < 0 {
            tracing::error!(
                count = state.ref_count,
                "Register had to reset the subscription counter"
            );
            state.ref_count = 0;
        }

        if state.ref_count == 0 {
            self.attach(&mut state);
        }

        state.ref_count += 1;
    }

    pub fn unregister(&self) {
        let mut state = self.state.lock();

        state.ref_count -= 1;
        if state.ref_count < 0 {
            tracing::error!("Unregistered past all subscriptions");
            state.ref_count = 0;
        }

        if state.ref_count == 0 {
            self.detach(&mut state);
        }
    }

    fn attach(self: &Arc<Self>, state: &mut BrokerState) {
        if state.attached {
            return;
        }

        tracing::info!("Subscribing to browser events");
        state.attached = true;

        for kind in HostEventKind::ALL {
            self.host.add_listener(kind);
        }

        state.poll_task = self.spawn_poll();
    }

    fn detach(&self, state: &mut BrokerState) {
        if !state.attached {
            return;
        }

        tracing::info!("Unsubscribing from browser events");
        state.attached = false;

        for kind in HostEventKind::ALL {
            self.host.remove_listener(kind);
        }

        if let Some(task) = state.poll_task.take() {
            task.abort();
        }
    }

    fn spawn_poll(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime available, active window poll disabled");
                return None;
            }
        };

        let broker: Weak<Self> = Arc::downgrade(self);
        let period = self.poll_interval;

        Some(runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(broker) = broker.upgrade() else {
                    break;
                };
                broker.poll_active_window().await;
            }
        }))
    }

    /// Entry point for host callbacks
    pub async fn handle_host_event(&self, event: HostEvent) {
        if !self.is_attached() {
            tracing::debug!(kind = %event.kind(), "Dropping host event received while detached");
            return;
        }

        match event {
            HostEvent::ExtensionInstalled(extension) => {
                self.emit(BrowserSignal::ExtensionInstalled(extension.clone()));
                self.emit(BrowserSignal::ExtensionActive(extension));
            }
            HostEvent::ExtensionUninstalled(id) => {
                tracing::debug!(extension_id = %id, "Extension uninstalled");
                self.emit(BrowserSignal::ExtensionUninstalled(id));
            }
            HostEvent::ExtensionEnabled(extension) => {
                self.emit(BrowserSignal::ExtensionActive(extension));
            }
            HostEvent::ExtensionDisabled(extension) => {
                self.emit(BrowserSignal::ExtensionInactive(extension));
            }
            HostEvent::TabCreated(tab) => self.emit_tab(tab),
            HostEvent::TabRemoved(tab_id) => {
                tracing::debug!(tab_id, "Tab removed");
            }
            HostEvent::NavigationCommitted(details) | HostEvent::NavigationCompleted(details) => {
                self.on_navigation(details).await;
            }
        }
    }

    async fn on_navigation(&self, details: NavigationDetails) {
        if !details.is_user_visible() {
            tracing::warn!(
                tab_id = details.tab_id,
                frame_id = details.frame_id,
                "Invalid tab id or frame id"
            );
            return;
        }

        // Navigation payloads are not tabs; fetch the tab for its current state
        match self.host.get_tab(details.tab_id).await {
            Ok(Some(tab)) => {
                if self.is_attached() {
                    self.emit_tab(tab);
                } else {
                    tracing::debug!(tab_id = tab.id, "Dropping tab lookup finished after detach");
                }
            }
            Ok(None) => {
                tracing::debug!(tab_id = details.tab_id, "Navigated tab no longer exists");
            }
            Err(e) => {
                tracing::warn!(tab_id = details.tab_id, error = %e, "Failed to get navigated tab");
            }
        }
    }

    /// Inspect the last focused window and report its active tab
    pub async fn poll_active_window(&self) {
        let window = self.host.last_focused_window().await;

        if !self.is_attached() {
            return;
        }

        match window {
            Ok(Some(window)) if window.focused => match window.active_tab() {
                Some(tab) => self.emit_tab(tab.clone()),
                None => tracing::warn!("Failed to get active tab"),
            },
            Ok(_) => {
                // No focused browser window, e.g. a packaged app has focus
                tracing::debug!("Last focused window is not focused");
                self.emit(BrowserSignal::ActiveWindowUnavailable(None));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to get active window");
                self.emit(BrowserSignal::ActiveWindowUnavailable(Some(e.to_string())));
            }
        }
    }

    fn emit_tab(&self, tab: TabSnapshot) {
        self.emit(BrowserSignal::ActiveTabChanged(tab.clone()));
        self.emit(BrowserSignal::TabChanged(tab));
    }

    fn emit(&self, signal: BrowserSignal) {
        let name = signal.name();
        if self.signals.send(signal).is_err() {
            tracing::trace!(signal = name, "No subscribers for signal");
        }
    }
}

/// Scoped broker reference; unregisters on drop
#[must_use = "dropping the guard releases the subscription"]
pub struct SubscriptionGuard {
    broker: Arc<SubscriptionBroker>,
}

impl SubscriptionGuard {
    pub fn broker(&self) -> &Arc<SubscriptionBroker> {
        &self.broker
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.broker.unregister();
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("ref_count", &self.broker.ref_count())
            .finish()
    }
}

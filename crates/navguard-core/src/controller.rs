//! Tab policy controller
//!
//! Owns the active [`FilterEngine`] and keeps every open tab compliant with it.
//!
//! ```text
//! Detached (allow all)  --filter(whitelist|blacklist)-->  Attached
//! Attached              --filter(allow all)---------->    Detached
//! ```
//!
//! While attached the controller holds one broker subscription and redirects
//! every `TabChanged` tab the engine blocks.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use navguard_events::{
    BrowserHost, BrowserSignal, SubscriptionBroker, SubscriptionGuard, TabSnapshot,
};
use navguard_filter::{FilterEngine, FilterMode, RuleEntry, RuleSet, SchemeExclusions, Verdict};

use crate::bus::{MessageBus, Notification};
use crate::config::Config;
use crate::policy::PolicyDocument;
use crate::Result;

pub struct TabPolicyController {
    host: Arc<dyn BrowserHost>,
    broker: Arc<SubscriptionBroker>,
    bus: MessageBus,
    /// Replaced wholesale on every policy change
    engine: RwLock<Arc<FilterEngine>>,
    /// Held while the mode is restrictive
    subscription: Mutex<Option<SubscriptionGuard>>,
    redirect_location: String,
    redirect_host: String,
    exclusions: SchemeExclusions,
}

impl TabPolicyController {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        broker: Arc<SubscriptionBroker>,
        bus: MessageBus,
        config: &Config,
    ) -> Result<Self> {
        let redirect_host = config.redirect_host()?;
        let exclusions = config.scheme_exclusions();

        // Until the first policy arrives nothing is filtered
        let engine = FilterEngine::new(
            RuleSet::build(&[], &[], &[], &[], Some(&redirect_host)),
            exclusions.clone(),
        );

        Ok(Self {
            host,
            broker,
            bus,
            engine: RwLock::new(Arc::new(engine)),
            subscription: Mutex::new(None),
            redirect_location: config.redirect_location.clone(),
            redirect_host,
            exclusions,
        })
    }

    /// Build the broker and bus from `config` as well
    pub fn from_config(host: Arc<dyn BrowserHost>, config: &Config) -> Result<Arc<Self>> {
        config.validate()?;
        let broker = SubscriptionBroker::new(Arc::clone(&host), config.poll_interval());
        let bus = MessageBus::new(config.bus_capacity);
        Ok(Arc::new(Self::new(host, broker, bus, config)?))
    }

    /// Install a new policy and bring open tabs in line with it
    pub async fn filter(
        &self,
        core: &[RuleEntry],
        global: &[RuleEntry],
        user: &[RuleEntry],
        deny: &[RuleEntry],
    ) -> Result<FilterMode> {
        let rules = RuleSet::build(core, global, user, deny, Some(&self.redirect_host));
        let engine = Arc::new(FilterEngine::new(rules, self.exclusions.clone()));
        let mode = engine.mode();

        *self.engine.write() = engine;

        tracing::info!(
            mode = %mode,
            core = core.len(),
            global = global.len(),
            user = user.len(),
            deny = deny.len(),
            "Filter policy updated"
        );

        if mode.is_restrictive() {
            {
                let mut subscription = self.subscription.lock();
                if subscription.is_none() {
                    *subscription = Some(self.broker.acquire());
                    tracing::debug!("Subscribed to browser events");
                }
            }

            self.sweep_tabs().await?;
        } else {
            let released = self.subscription.lock().take();
            if released.is_some() {
                tracing::debug!("Unsubscribed from browser events");
            }
        }

        Ok(mode)
    }

    pub async fn apply_policy(&self, policy: &PolicyDocument) -> Result<FilterMode> {
        self.filter(&policy.core, &policy.global, &policy.user, &policy.deny)
            .await
    }

    /// Redirect every open tab the current policy blocks
    ///
    /// Returns the number of tabs redirected. A tab that fails to redirect is
    /// logged and skipped.
    pub async fn sweep_tabs(&self) -> Result<usize> {
        if !self.mode().is_restrictive() {
            return Ok(0);
        }

        let tabs = self.host.query_all_tabs().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to query open tabs");
            e
        })?;

        let mut redirected = 0;
        for tab in &tabs {
            // The policy may have been replaced while awaiting the host
            let engine = self.engine();
            if !engine.mode().is_restrictive() {
                tracing::debug!("Policy lifted during sweep, stopping");
                break;
            }
            if engine.should_filter(&tab.url) && self.redirect_tab(tab).await.is_ok() {
                redirected += 1;
            }
        }

        tracing::info!(tabs = tabs.len(), redirected, "Swept open tabs");
        Ok(redirected)
    }

    /// React to one broker signal
    pub async fn handle_signal(&self, signal: &BrowserSignal) -> Result<()> {
        let BrowserSignal::TabChanged(tab) = signal else {
            return Ok(());
        };

        if self.should_filter_website_with_url(&tab.url) {
            self.redirect_tab(tab).await?;
        }
        Ok(())
    }

    /// Report the block and send the tab to the landing page
    pub async fn redirect_tab(&self, tab: &TabSnapshot) -> Result<()> {
        tracing::info!(tab_id = tab.id, url = %tab.url, "Redirecting blocked tab");

        self.bus.publish(Notification::BlockUrl {
            url: tab.url.clone(),
            title: tab.title.clone(),
        });

        self.host
            .update_tab_url(tab.id, &self.redirect_location)
            .await
            .map_err(|e| {
                tracing::warn!(tab_id = tab.id, error = %e, "Failed to redirect tab");
                e.into()
            })
    }

    /// Handle signals until the channel closes
    pub async fn run(self: Arc<Self>, mut signals: broadcast::Receiver<BrowserSignal>) {
        loop {
            match signals.recv().await {
                Ok(signal) => {
                    if let Err(e) = self.handle_signal(&signal).await {
                        tracing::debug!(
                            signal = signal.name(),
                            error = %e,
                            "Signal handling failed"
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Signal receiver lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }

        tracing::debug!("Signal channel closed");
    }

    /// Subscribe to the broker and run on the current runtime
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let signals = self.broker.subscribe();
        tokio::spawn(Arc::clone(self).run(signals))
    }

    /// Snapshot of the active engine
    pub fn engine(&self) -> Arc<FilterEngine> {
        Arc::clone(&self.engine.read())
    }

    pub fn mode(&self) -> FilterMode {
        self.engine().mode()
    }

    pub fn evaluate(&self, url: &str) -> Verdict {
        self.engine().evaluate(url)
    }

    pub fn should_filter_website_with_url(&self, url: &str) -> bool {
        self.engine().should_filter(url)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    pub fn redirect_location(&self) -> &str {
        &self.redirect_location
    }

    pub fn broker(&self) -> &Arc<SubscriptionBroker> {
        &self.broker
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }
}

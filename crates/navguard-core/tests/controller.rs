//! Controller behavior against a recording host

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use navguard_core::{
    BrowserHost, Config, CoreError, FilterMode, HostError, HostEvent, HostEventKind,
    NavigationDetails, Notification, PolicyDocument, RuleEntry, TabId, TabPolicyController,
    TabSnapshot, WindowSnapshot,
};

const LANDING: &str = "https://studentontask.com";

#[derive(Default)]
struct RecordingHost {
    tabs: Mutex<Vec<TabSnapshot>>,
    updates: Mutex<Vec<(TabId, String)>>,
    failing_tabs: Mutex<HashSet<TabId>>,
    fail_query: AtomicBool,
    hold_query: AtomicBool,
    query_entered: Notify,
    release_query: Notify,
    window: Mutex<Option<WindowSnapshot>>,
    window_polls: AtomicUsize,
    added: Mutex<HashMap<HostEventKind, usize>>,
    removed: Mutex<HashMap<HostEventKind, usize>>,
    updated: Notify,
}

impl RecordingHost {
    fn with_tabs(tabs: Vec<TabSnapshot>) -> Arc<Self> {
        let host = Self::default();
        *host.tabs.lock() = tabs;
        Arc::new(host)
    }

    fn redirected_ids(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self.updates.lock().iter().map(|(id, _)| *id).collect();
        ids.sort();
        ids
    }

    fn added(&self, kind: HostEventKind) -> usize {
        self.added.lock().get(&kind).copied().unwrap_or(0)
    }

    fn removed(&self, kind: HostEventKind) -> usize {
        self.removed.lock().get(&kind).copied().unwrap_or(0)
    }
}

#[async_trait]
impl BrowserHost for RecordingHost {
    async fn query_all_tabs(&self) -> navguard_core::HostResult<Vec<TabSnapshot>> {
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(HostError::Unavailable("tabs API not ready".to_string()));
        }
        if self.hold_query.swap(false, Ordering::SeqCst) {
            self.query_entered.notify_one();
            self.release_query.notified().await;
        }
        Ok(self.tabs.lock().clone())
    }

    async fn get_tab(&self, tab_id: TabId) -> navguard_core::HostResult<Option<TabSnapshot>> {
        Ok(self.tabs.lock().iter().find(|t| t.id == tab_id).cloned())
    }

    async fn update_tab_url(&self, tab_id: TabId, url: &str) -> navguard_core::HostResult<()> {
        if self.failing_tabs.lock().contains(&tab_id) {
            return Err(HostError::Rejected {
                operation: "update".to_string(),
                reason: "tab is closing".to_string(),
            });
        }
        self.updates.lock().push((tab_id, url.to_string()));
        self.updated.notify_one();
        Ok(())
    }

    async fn last_focused_window(&self) -> navguard_core::HostResult<Option<WindowSnapshot>> {
        self.window_polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.window.lock().clone())
    }

    fn add_listener(&self, kind: HostEventKind) {
        *self.added.lock().entry(kind).or_default() += 1;
    }

    fn remove_listener(&self, kind: HostEventKind) {
        *self.removed.lock().entry(kind).or_default() += 1;
    }
}

fn open_tabs() -> Vec<TabSnapshot> {
    vec![
        TabSnapshot::new(1, "https://www.google.com/search?q=rust").with_title("Google"),
        TabSnapshot::new(2, "chrome://newtab/"),
        TabSnapshot::new(3, "https://facebook.com/").with_title("Facebook"),
        TabSnapshot::new(4, "https://www.facebook.com/feed"),
        TabSnapshot::new(5, "https://moodle.com/course/12"),
        TabSnapshot::new(6, "https://studentontask.com/blocked"),
    ]
}

fn rules(ids: &[&str]) -> Vec<RuleEntry> {
    ids.iter().map(|id| RuleEntry::plain(*id)).collect()
}

fn controller(host: &Arc<RecordingHost>) -> Arc<TabPolicyController> {
    TabPolicyController::from_config(host.clone(), &Config::default()).unwrap()
}

#[tokio::test]
async fn test_whitelist_sweep_redirects_blocked_tabs_once() {
    let host = RecordingHost::with_tabs(open_tabs());
    let controller = controller(&host);

    let mode = controller
        .filter(&[], &rules(&["moodle.com"]), &rules(&["google.com"]), &[])
        .await
        .unwrap();

    assert_eq!(mode, FilterMode::Whitelist);
    assert_eq!(host.redirected_ids(), vec![3, 4]);
    assert!(host.updates.lock().iter().all(|(_, url)| url == LANDING));
}

#[tokio::test]
async fn test_blacklist_sweep_redirects_denied_tabs() {
    let host = RecordingHost::with_tabs(open_tabs());
    let controller = controller(&host);

    let mode = controller
        .filter(&[], &rules(&["moodle.com"]), &[], &rules(&["facebook.com"]))
        .await
        .unwrap();

    assert_eq!(mode, FilterMode::Blacklist);
    assert_eq!(host.redirected_ids(), vec![3, 4]);
}

#[tokio::test]
async fn test_global_allow_wins_over_deny() {
    let host = RecordingHost::with_tabs(open_tabs());
    let controller = controller(&host);

    controller
        .filter(&[], &rules(&["facebook.com"]), &[], &rules(&["facebook.com"]))
        .await
        .unwrap();

    assert!(host.redirected_ids().is_empty());
}

#[tokio::test]
async fn test_sweep_is_repeatable() {
    let host = RecordingHost::with_tabs(open_tabs());
    let controller = controller(&host);

    controller
        .filter(&[], &[], &rules(&["google.com"]), &[])
        .await
        .unwrap();

    // Tabs in the host still show their old URLs, so a second sweep
    // redirects the same two tabs again
    assert_eq!(controller.sweep_tabs().await.unwrap(), 2);
    assert_eq!(host.updates.lock().len(), 4);
}

#[tokio::test]
async fn test_navigation_redirects_through_broker() {
    let host = RecordingHost::with_tabs(vec![TabSnapshot::new(1, "https://www.google.com")]);
    let controller = controller(&host);
    let runner = controller.spawn();

    controller
        .filter(&[], &[], &rules(&["google.com"]), &[])
        .await
        .unwrap();
    assert!(host.updates.lock().is_empty());

    host.tabs
        .lock()
        .push(TabSnapshot::new(7, "https://www.youtube.com/watch?v=1").with_title("Video"));
    controller
        .broker()
        .handle_host_event(HostEvent::NavigationCommitted(NavigationDetails::new(
            7,
            0,
            "https://www.youtube.com/watch?v=1",
        )))
        .await;

    tokio::time::timeout(Duration::from_secs(5), host.updated.notified())
        .await
        .expect("tab was not redirected");
    assert_eq!(*host.updates.lock(), vec![(7, LANDING.to_string())]);

    runner.abort();
}

#[tokio::test]
async fn test_subframe_navigation_ignored() {
    let host = RecordingHost::with_tabs(vec![TabSnapshot::new(7, "https://ads.example.com")]);
    let controller = controller(&host);
    let runner = controller.spawn();

    controller
        .filter(&[], &[], &rules(&["google.com"]), &[])
        .await
        .unwrap();
    let swept = host.updates.lock().len();

    controller
        .broker()
        .handle_host_event(HostEvent::NavigationCommitted(NavigationDetails::new(
            7,
            2,
            "https://ads.example.com",
        )))
        .await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    assert_eq!(host.updates.lock().len(), swept);
    runner.abort();
}

#[tokio::test]
async fn test_landing_page_never_redirected() {
    let host =
        RecordingHost::with_tabs(vec![TabSnapshot::new(6, "https://studentontask.com/blocked")]);
    let controller = controller(&host);

    controller
        .filter(&[], &[], &rules(&["google.com"]), &rules(&["studentontask.com"]))
        .await
        .unwrap();

    assert!(host.updates.lock().is_empty());
    assert!(!controller.should_filter_website_with_url("https://studentontask.com/"));
}

#[tokio::test]
async fn test_allow_all_detaches_once() {
    let host = RecordingHost::with_tabs(open_tabs());
    let controller = controller(&host);

    controller
        .filter(&[], &[], &rules(&["google.com"]), &[])
        .await
        .unwrap();
    controller
        .filter(&[], &[], &[], &rules(&["facebook.com"]))
        .await
        .unwrap();
    assert_eq!(host.added(HostEventKind::TabCreated), 1);
    assert!(controller.is_subscribed());

    for _ in 0..2 {
        let mode = controller.filter(&[], &[], &[], &[]).await.unwrap();
        assert_eq!(mode, FilterMode::AllowAll);
    }

    assert!(!controller.is_subscribed());
    for kind in HostEventKind::ALL {
        assert_eq!(host.added(kind), 1, "{}", kind);
        assert_eq!(host.removed(kind), 1, "{}", kind);
    }
}

#[tokio::test]
async fn test_events_after_detach_dropped() {
    let host = RecordingHost::with_tabs(Vec::new());
    let controller = controller(&host);
    let runner = controller.spawn();

    controller
        .filter(&[], &[], &rules(&["google.com"]), &[])
        .await
        .unwrap();
    controller.filter(&[], &[], &[], &[]).await.unwrap();

    controller
        .broker()
        .handle_host_event(HostEvent::TabCreated(TabSnapshot::new(8, "https://facebook.com")))
        .await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    assert!(host.updates.lock().is_empty());
    runner.abort();
}

#[tokio::test]
async fn test_block_notification_published() {
    let host = RecordingHost::with_tabs(vec![
        TabSnapshot::new(3, "https://facebook.com/").with_title("Facebook"),
    ]);
    let controller = controller(&host);
    let mut notifications = controller.bus().subscribe();

    controller
        .filter(&[], &[], &[], &rules(&["facebook.com"]))
        .await
        .unwrap();

    let published = notifications.try_recv().unwrap();
    assert_eq!(
        published.notification,
        Notification::BlockUrl {
            url: "https://facebook.com/".to_string(),
            title: "Facebook".to_string(),
        }
    );
    assert_eq!(
        serde_json::to_value(&published.notification).unwrap(),
        serde_json::json!({
            "event": "block_url",
            "url": "https://facebook.com/",
            "title": "Facebook"
        })
    );
}

#[tokio::test]
async fn test_query_failure_keeps_policy() {
    let host = RecordingHost::with_tabs(open_tabs());
    host.fail_query.store(true, Ordering::SeqCst);
    let controller = controller(&host);

    let err = controller
        .filter(&[], &[], &rules(&["google.com"]), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Host(HostError::Unavailable(_))));
    assert_eq!(controller.mode(), FilterMode::Whitelist);
    assert!(controller.is_subscribed());
    assert!(controller.should_filter_website_with_url("https://facebook.com"));
}

#[tokio::test]
async fn test_redirect_failure_continues_sweep() {
    let host = RecordingHost::with_tabs(open_tabs());
    host.failing_tabs.lock().insert(3);
    let controller = controller(&host);

    controller
        .filter(&[], &[], &rules(&["google.com"]), &[])
        .await
        .unwrap();

    assert_eq!(host.redirected_ids(), vec![4]);
    assert_eq!(controller.sweep_tabs().await.unwrap(), 1);
}

#[tokio::test]
async fn test_apply_policy_document() {
    let host = RecordingHost::with_tabs(open_tabs());
    let controller = controller(&host);

    let policy = PolicyDocument::from_json(
        r#"{
            "global": ["moodle.com"],
            "user": [{"identifier": "google.com/search", "ostype": "web-fragment"}]
        }"#,
    )
    .unwrap();

    let mode = controller.apply_policy(&policy).await.unwrap();
    assert_eq!(mode, FilterMode::Whitelist);
    assert_eq!(host.redirected_ids(), vec![3, 4]);
}

#[tokio::test]
async fn test_sweep_stops_when_policy_lifted_mid_query() {
    let host = RecordingHost::with_tabs(open_tabs());
    host.hold_query.store(true, Ordering::SeqCst);
    let controller = controller(&host);

    let pending = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move {
            controller
                .filter(&[], &[], &[], &rules(&["facebook.com"]))
                .await
        }
    });

    // Lift the policy while the sweep is waiting on the tab query
    host.query_entered.notified().await;
    let mode = controller.filter(&[], &[], &[], &[]).await.unwrap();
    assert_eq!(mode, FilterMode::AllowAll);
    host.release_query.notify_one();

    let swept_mode = pending.await.unwrap().unwrap();
    assert_eq!(swept_mode, FilterMode::Blacklist);
    assert_eq!(controller.mode(), FilterMode::AllowAll);
    assert!(!controller.is_subscribed());
    assert!(host.redirected_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_window_poll_redirects_until_detached() {
    let host = RecordingHost::with_tabs(Vec::new());
    *host.window.lock() = Some(WindowSnapshot {
        focused: true,
        tabs: vec![TabSnapshot::new(9, "https://www.facebook.com/feed").activated()],
    });
    let config = Config {
        poll_interval_ms: 50,
        ..Config::default()
    };
    let controller = TabPolicyController::from_config(host.clone(), &config).unwrap();
    let runner = controller.spawn();

    controller
        .filter(&[], &[], &[], &rules(&["facebook"]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(175)).await;

    assert_eq!(host.window_polls.load(Ordering::SeqCst), 3);
    assert_eq!(host.redirected_ids(), vec![9, 9, 9]);

    controller.filter(&[], &[], &[], &[]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(host.window_polls.load(Ordering::SeqCst), 3);
    assert_eq!(host.updates.lock().len(), 3);
    runner.abort();
}

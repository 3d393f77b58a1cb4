//! Shared fixtures: in-memory stores, a manual clock and event builders.
#![allow(dead_code)]

use alert_lifecycle::Services;
use alert_lifecycle::aggregator::LowPriorityBatcher;
use alert_lifecycle::clock::ManualClock;
use alert_lifecycle::config::{AppConfig, LinkConfig, NotifyConfig};
use alert_lifecycle::error::StoreError;
use alert_lifecycle::lifecycle::{Engine, StatusRecorder};
use alert_lifecycle::model::{
    CurrentEvent, EndpointBinding, Event, EventType, Status, Strategy, User,
};
use alert_lifecycle::notify::{Dispatcher, Notifier};
use alert_lifecycle::store::{
    Directory, EventStore, MaskCache, Markers, MemoryMarkerStore, MemoryQueueSink, StrategyCache,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const T0: i64 = 1_700_000_000;

#[derive(Default)]
pub struct FakeEventStore {
    events: Mutex<Vec<(Event, String)>>,
    current: Mutex<HashMap<u64, CurrentEvent>>,
    fail_event_cur: AtomicBool,
    fail_reads: AtomicBool,
}

impl FakeEventStore {
    /// Store an occurrence as the upstream ingester would, with no status yet.
    pub fn insert_event(&self, event: &Event) {
        self.events
            .lock()
            .unwrap()
            .push((event.clone(), String::new()));
    }

    pub fn insert_with_status(&self, event: &Event, status: Status) {
        self.events
            .lock()
            .unwrap()
            .push((event.clone(), status.as_str().to_string()));
    }

    pub fn insert_current(&self, current: CurrentEvent) {
        self.current.lock().unwrap().insert(current.hashid, current);
    }

    pub fn status_of(&self, id: i64) -> Option<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|(e, _)| e.id == id)
            .map(|(_, s)| s.clone())
    }

    pub fn priority_of(&self, id: i64) -> Option<i32> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|(e, _)| e.id == id)
            .map(|(e, _)| e.priority)
    }

    pub fn current(&self, hashid: u64) -> Option<CurrentEvent> {
        self.current.lock().unwrap().get(&hashid).cloned()
    }

    pub fn fail_event_cur_writes(&self, fail: bool) {
        self.fail_event_cur.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn event_cur_unavailable(&self) -> Result<(), StoreError> {
        if self.fail_event_cur.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("event_cur offline".into()));
        }
        Ok(())
    }

    fn reads_unavailable(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FakeEventStore {
    async fn save_event_status(&self, id: i64, status: Status) -> Result<(), StoreError> {
        for (e, s) in self.events.lock().unwrap().iter_mut() {
            if e.id == id {
                *s = status.as_str().to_string();
            }
        }
        Ok(())
    }

    async fn save_event_cur_status(&self, hashid: u64, status: Status) -> Result<(), StoreError> {
        self.event_cur_unavailable()?;
        if let Some(cur) = self.current.lock().unwrap().get_mut(&hashid) {
            cur.status = status.as_str().to_string();
        }
        Ok(())
    }

    async fn update_event_priority(&self, id: i64, level: i32) -> Result<(), StoreError> {
        for (e, _) in self.events.lock().unwrap().iter_mut() {
            if e.id == id {
                e.priority = level;
            }
        }
        Ok(())
    }

    async fn update_event_cur_priority(&self, hashid: u64, level: i32) -> Result<(), StoreError> {
        self.event_cur_unavailable()?;
        if let Some(cur) = self.current.lock().unwrap().get_mut(&hashid) {
            cur.priority = level;
        }
        Ok(())
    }

    async fn event_cur_get(&self, hashid: u64) -> Result<Option<CurrentEvent>, StoreError> {
        self.reads_unavailable()?;
        Ok(self.current(hashid))
    }

    async fn event_count(
        &self,
        hashid: u64,
        start: i64,
        end: i64,
        is_upgrade: bool,
    ) -> Result<u64, StoreError> {
        self.reads_unavailable()?;
        let counted = |s: &str| {
            s == Status::Send.as_str() || (is_upgrade && s == Status::Upgrade.as_str())
        };
        let n = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, s)| {
                e.hashid == hashid
                    && e.is_alert()
                    && e.etime >= start
                    && e.etime < end
                    && counted(s)
            })
            .count();
        Ok(n as u64)
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    pub users: Vec<User>,
    pub teams: HashMap<i64, Vec<i64>>,
    pub bindings: HashMap<String, Vec<String>>,
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn user_ids_by_team_ids(&self, team_ids: &[i64]) -> Result<Vec<i64>, StoreError> {
        Ok(team_ids
            .iter()
            .filter_map(|t| self.teams.get(t))
            .flatten()
            .copied()
            .collect())
    }

    async fn users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn endpoint_bindings(
        &self,
        endpoints: &[String],
    ) -> Result<Vec<EndpointBinding>, StoreError> {
        Ok(endpoints
            .iter()
            .map(|ep| EndpointBinding {
                endpoint: ep.clone(),
                nodes: self.bindings.get(ep).cloned().unwrap_or_default(),
            })
            .collect())
    }
}

pub fn user(id: i64) -> User {
    User {
        id,
        username: format!("user{id}"),
        phone: format!("100{id}"),
        email: format!("user{id}@example.com"),
        im: format!("im-user{id}"),
    }
}

pub fn strategy(id: i64, converge: [i64; 2], recovery_notify: i32) -> Strategy {
    Strategy {
        id,
        name: format!("strategy-{id}"),
        converge,
        recovery_notify,
        callback: String::new(),
    }
}

pub fn alert(id: i64, hashid: u64, etime: i64) -> Event {
    Event {
        id,
        sid: 1,
        sname: "cpu.idle too low".into(),
        endpoint: "host-1".into(),
        endpoint_alias: String::new(),
        priority: 1,
        event_type: EventType::Alert,
        hashid,
        etime,
        value: "cpu.idle: 2".into(),
        info: String::new(),
        detail: r#"[{"metric":"cpu.idle","tags":{"core":"0"}}]"#.into(),
        users: "[1]".into(),
        groups: "[]".into(),
        need_upgrade: 0,
        alert_upgrade: String::new(),
    }
}

pub fn recovery(id: i64, hashid: u64, etime: i64) -> Event {
    Event {
        event_type: EventType::Recovery,
        ..alert(id, hashid, etime)
    }
}

pub fn open_current(hashid: u64) -> CurrentEvent {
    CurrentEvent {
        id: 500 + hashid as i64,
        hashid,
        claimants: "[]".into(),
        ignore_alert: 0,
        priority: 2,
        status: String::new(),
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        listen_addr: "127.0.0.1:0".into(),
        workers: 2,
        queue_capacity: 64,
        cache_sync_secs: 10,
        notify: NotifyConfig::default(),
        links: LinkConfig {
            stra: "http://portal/stra/{}".into(),
            event: "http://portal/event/{}".into(),
            claim: "http://portal/claim/{}".into(),
        },
    }
}

pub struct Harness {
    pub services: Services,
    pub events: Arc<FakeEventStore>,
    pub queues: Arc<MemoryQueueSink>,
    pub masks: Arc<MaskCache>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        let directory = FakeDirectory {
            users: vec![user(1), user(2), user(3)],
            teams: HashMap::from([(10, vec![3])]),
            bindings: HashMap::from([("host-1".to_string(), vec!["corp.web".to_string()])]),
        };
        Self::with_directory(strategies, directory)
    }

    pub fn with_directory(strategies: Vec<Strategy>, directory: FakeDirectory) -> Self {
        let events = Arc::new(FakeEventStore::default());
        let queues = Arc::new(MemoryQueueSink::new());
        let masks = Arc::new(MaskCache::new());
        let clock = ManualClock::new(T0);
        let cache = StrategyCache::new();
        cache.replace_all(strategies);
        let markers = Markers::new(Arc::new(MemoryMarkerStore::new(Arc::new(clock.clone()))));

        let services = Services {
            config: Arc::new(test_config()),
            events: events.clone(),
            markers,
            queues: queues.clone(),
            directory: Arc::new(directory),
            strategies: cache,
            masks: masks.clone(),
            clock: Arc::new(clock.clone()),
        };

        Self {
            services,
            events,
            queues,
            masks,
            clock,
        }
    }

    pub fn recorder(&self) -> StatusRecorder {
        StatusRecorder::new(self.services.events.clone())
    }

    /// Engine wired to a running dispatcher and a batcher that is flushed by hand.
    pub fn engine(&self) -> (Engine, LowPriorityBatcher) {
        let (dispatcher, _task) = Dispatcher::spawn(Notifier::new(&self.services), 64);
        let batcher = LowPriorityBatcher::new(dispatcher.clone(), self.recorder());
        let engine = Engine::new(self.services.clone(), dispatcher, batcher.clone());
        (engine, batcher)
    }

    pub fn queue(&self, channel: &str) -> String {
        format!("{}{}", self.services.config.notify.queue_prefix, channel)
    }

    /// Decoded notify messages of one channel queue, oldest first.
    pub fn messages(&self, channel: &str) -> Vec<serde_json::Value> {
        let mut out: Vec<serde_json::Value> = self
            .queues
            .messages(&self.queue(channel))
            .iter()
            .map(|p| serde_json::from_str(p).expect("queue payload is JSON"))
            .collect();
        out.reverse();
        out
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

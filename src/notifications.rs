//! Match notifications derived from successive live snapshots.
//!
//! The centre keeps the last live snapshot and diffs each new one against it
//! by fixture id. Fallback data is never diffed, so switching to the demo
//! fixtures cannot raise phantom goals.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::capabilities::{
    request_notification_permission, NotificationPermission, NotificationPermissionRequester,
};
use crate::matches::{FetchResult, Match, MatchSnapshot};
use crate::preferences::NotificationSettings;

pub const INBOX_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Goal,
    MatchStart,
    MatchEnd,
}

impl NotificationKind {
    pub fn priority(&self) -> Priority {
        match self {
            NotificationKind::Goal => Priority::High,
            NotificationKind::MatchStart | NotificationKind::MatchEnd => Priority::Medium,
        }
    }

    fn enabled(&self, settings: &NotificationSettings) -> bool {
        match self {
            NotificationKind::Goal => settings.goals,
            NotificationKind::MatchStart => settings.kickoff,
            NotificationKind::MatchEnd => settings.fulltime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A change between two observations of the same fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvent {
    pub kind: NotificationKind,
    pub fixture_id: u64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchNotification {
    pub id: u64,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub fixture_id: u64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

fn scoreline(m: &Match) -> String {
    format!(
        "{} {}-{} {}",
        m.teams.home.name,
        m.goals.home.unwrap_or(0),
        m.goals.away.unwrap_or(0),
        m.teams.away.name
    )
}

/// Compare two observations of one fixture. A goal is reported per side
/// whose count went up.
pub fn detect_match_change(prev: &Match, curr: &Match) -> Vec<MatchEvent> {
    let mut events = Vec::new();
    let event = |kind, title: String| MatchEvent {
        kind,
        fixture_id: curr.id(),
        title,
        body: scoreline(curr),
    };

    if prev.status().is_scheduled() && curr.is_live() {
        events.push(event(
            NotificationKind::MatchStart,
            format!("Kick-off: {}", curr.title()),
        ));
    }

    let prev_home = prev.goals.home.unwrap_or(0);
    let prev_away = prev.goals.away.unwrap_or(0);
    if curr.goals.home.unwrap_or(0) > prev_home {
        events.push(event(
            NotificationKind::Goal,
            format!("Goal for {}", curr.teams.home.name),
        ));
    }
    if curr.goals.away.unwrap_or(0) > prev_away {
        events.push(event(
            NotificationKind::Goal,
            format!("Goal for {}", curr.teams.away.name),
        ));
    }

    if prev.is_live() && curr.status().is_finished() {
        events.push(event(
            NotificationKind::MatchEnd,
            format!("Full time: {}", curr.title()),
        ));
    }
    events
}

/// Diff two snapshots by fixture id. Fixtures missing from either side are
/// skipped.
pub fn diff_snapshots(prev: &MatchSnapshot, curr: &MatchSnapshot) -> Vec<MatchEvent> {
    let previous: HashMap<u64, &Match> = prev.iter().map(|m| (m.id(), m)).collect();
    curr.iter()
        .filter_map(|m| previous.get(&m.id()).map(|p| detect_match_change(p, m)))
        .flatten()
        .collect()
}

/// Where granted notifications end up.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &MatchNotification);
}

/// Writes notifications to the log.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, n: &MatchNotification) {
        info!("[{:?}] {}: {}", n.priority, n.title, n.body);
    }
}

#[derive(Default)]
struct Inner {
    last_live: Option<MatchSnapshot>,
    inbox: VecDeque<MatchNotification>,
    next_id: u64,
}

pub struct NotificationCenter {
    inner: Mutex<Inner>,
    permission: Arc<dyn NotificationPermissionRequester>,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationCenter {
    pub fn new(
        permission: Arc<dyn NotificationPermissionRequester>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        NotificationCenter {
            inner: Mutex::new(Inner::default()),
            permission,
            sink,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed a fetch result. Returns the notifications it raised, newest
    /// last. Delivery happens only when permission is granted; the inbox
    /// records them either way.
    pub async fn observe(
        &self,
        result: &FetchResult,
        settings: &NotificationSettings,
    ) -> Vec<MatchNotification> {
        let FetchResult::Live(snapshot) = result else {
            debug!("Skipping fallback snapshot for notifications");
            return Vec::new();
        };

        let raised: Vec<MatchNotification> = {
            let mut inner = self.inner();
            let events = match inner.last_live.replace(snapshot.clone()) {
                Some(prev) => diff_snapshots(&prev, snapshot),
                None => Vec::new(),
            };
            let now = Utc::now();
            let raised: Vec<MatchNotification> = events
                .into_iter()
                .filter(|e| e.kind.enabled(settings))
                .map(|e| {
                    inner.next_id += 1;
                    MatchNotification {
                        id: inner.next_id,
                        kind: e.kind,
                        priority: e.kind.priority(),
                        fixture_id: e.fixture_id,
                        title: e.title,
                        body: e.body,
                        created_at: now,
                        read: false,
                    }
                })
                .collect();
            for n in &raised {
                inner.inbox.push_front(n.clone());
            }
            inner.inbox.truncate(INBOX_CAPACITY);
            raised
        };

        if raised.is_empty() {
            return raised;
        }
        if request_notification_permission(self.permission.as_ref()).await
            == NotificationPermission::Granted
        {
            for n in &raised {
                self.sink.deliver(n);
            }
        } else {
            debug!(
                "Notification permission not granted, {} kept in inbox only",
                raised.len()
            );
        }
        raised
    }

    /// Inbox contents, newest first.
    pub fn list(&self) -> Vec<MatchNotification> {
        self.inner().inbox.iter().cloned().collect()
    }

    pub fn unread_count(&self) -> usize {
        self.inner().inbox.iter().filter(|n| !n.read).count()
    }

    pub fn mark_read(&self, id: u64) -> bool {
        match self.inner().inbox.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self) {
        for n in self.inner().inbox.iter_mut() {
            n.read = true;
        }
    }

    pub fn remove(&self, id: u64) -> bool {
        let mut inner = self.inner();
        let before = inner.inbox.len();
        inner.inbox.retain(|n| n.id != id);
        inner.inbox.len() != before
    }

    pub fn clear(&self) {
        self.inner().inbox.clear();
    }
}

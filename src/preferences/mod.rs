//! User preferences: favourites, theme, language and notification toggles.
//!
//! Stored as one JSON record under a fixed key, read-merged with defaults and
//! overwritten whole on save. Storage failures never reach callers; they are
//! logged and defaults are served instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::listeners::{ListenerId, Listeners};

pub mod sqlite;

pub use sqlite::SqlitePreferenceStore;

pub const PREFERENCES_KEY: &str = "matchee_preferences";
/// Key written by older releases that kept favourites separately
pub const LEGACY_FAVORITES_KEY: &str = "matchee_favorites";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Key-value persistence capability behind the preferences service.
pub trait PreferenceStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Volatile store, used when the database cannot be opened.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
    Es,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub goals: bool,
    pub cards: bool,
    pub kickoff: bool,
    pub fulltime: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            goals: true,
            cards: true,
            kickoff: true,
            fulltime: true,
        }
    }
}

/// Partial notification toggles; unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationSettingsUpdate {
    pub goals: Option<bool>,
    pub cards: Option<bool>,
    pub kickoff: Option<bool>,
    pub fulltime: Option<bool>,
}

impl NotificationSettings {
    fn merge(mut self, update: &NotificationSettingsUpdate) -> Self {
        if let Some(v) = update.goals {
            self.goals = v;
        }
        if let Some(v) = update.cards {
            self.cards = v;
        }
        if let Some(v) = update.kickoff {
            self.kickoff = v;
        }
        if let Some(v) = update.fulltime {
            self.fulltime = v;
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferences {
    pub favorite_teams: Vec<u64>,
    pub favorite_leagues: Vec<u64>,
    pub theme: Theme,
    pub language: Language,
    pub notifications: NotificationSettings,
}

/// Partial update; only the fields present replace stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub favorite_teams: Option<Vec<u64>>,
    pub favorite_leagues: Option<Vec<u64>>,
    pub theme: Option<Theme>,
    pub language: Option<Language>,
    pub notifications: Option<NotificationSettingsUpdate>,
}

impl UserPreferences {
    fn merge(mut self, update: PreferencesUpdate) -> Self {
        if let Some(teams) = update.favorite_teams {
            self.favorite_teams = teams;
        }
        if let Some(leagues) = update.favorite_leagues {
            self.favorite_leagues = leagues;
        }
        if let Some(theme) = update.theme {
            self.theme = theme;
        }
        if let Some(language) = update.language {
            self.language = language;
        }
        if let Some(notifications) = update.notifications {
            self.notifications = self.notifications.merge(&notifications);
        }
        self
    }
}

/// Preferences service over an injected store, with change subscription.
///
/// Writers are serialised so concurrent partial updates never overwrite each
/// other. Listeners run while the write lock is held and must not mutate
/// preferences themselves.
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
    listeners: Listeners<UserPreferences>,
    writes: Mutex<()>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Preferences {
            store,
            listeners: Listeners::new(),
            writes: Mutex::new(()),
        }
    }

    /// Stored preferences merged over the defaults. Missing, corrupt or
    /// unreadable records yield the defaults.
    pub fn get(&self) -> UserPreferences {
        let raw = match self.store.load(PREFERENCES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return UserPreferences::default(),
            Err(e) => {
                warn!("Failed to read preferences, using defaults: {}", e);
                return UserPreferences::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("Stored preferences are corrupt, using defaults: {}", e);
                UserPreferences::default()
            }
        }
    }

    /// Apply a partial update and save the whole record. Returns the
    /// preferences now in effect.
    pub fn update(&self, update: PreferencesUpdate) -> UserPreferences {
        self.modify(|_| update)
    }

    /// Read, merge and save under the write lock; `change` derives the
    /// update from the preferences read inside it.
    fn modify<F>(&self, change: F) -> UserPreferences
    where
        F: FnOnce(&UserPreferences) -> PreferencesUpdate,
    {
        let _writing = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.get();
        let updated = current.clone().merge(change(&current));
        if updated == current {
            return current;
        }
        self.replace(updated).unwrap_or(current)
    }

    fn replace(&self, prefs: UserPreferences) -> Option<UserPreferences> {
        let raw = match serde_json::to_string(&prefs) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to encode preferences: {}", e);
                return None;
            }
        };
        if let Err(e) = self.store.save(PREFERENCES_KEY, &raw) {
            warn!("Failed to save preferences: {}", e);
            return None;
        }
        debug!("Preferences saved");
        self.listeners.notify(&prefs);
        Some(prefs)
    }

    // ── Favourite teams ──────────────────────────────────────────────────────

    pub fn favorite_teams(&self) -> Vec<u64> {
        self.get().favorite_teams
    }

    pub fn add_favorite_team(&self, team_id: u64) {
        self.modify(|p| {
            let mut teams = p.favorite_teams.clone();
            if !teams.contains(&team_id) {
                teams.push(team_id);
            }
            PreferencesUpdate {
                favorite_teams: Some(teams),
                ..Default::default()
            }
        });
    }

    pub fn remove_favorite_team(&self, team_id: u64) {
        self.modify(|p| {
            let mut teams = p.favorite_teams.clone();
            teams.retain(|id| *id != team_id);
            PreferencesUpdate {
                favorite_teams: Some(teams),
                ..Default::default()
            }
        });
    }

    pub fn is_favorite_team(&self, team_id: u64) -> bool {
        self.favorite_teams().contains(&team_id)
    }

    // ── Favourite leagues ────────────────────────────────────────────────────

    pub fn favorite_leagues(&self) -> Vec<u64> {
        self.get().favorite_leagues
    }

    pub fn add_favorite_league(&self, league_id: u64) {
        self.modify(|p| {
            let mut leagues = p.favorite_leagues.clone();
            if !leagues.contains(&league_id) {
                leagues.push(league_id);
            }
            PreferencesUpdate {
                favorite_leagues: Some(leagues),
                ..Default::default()
            }
        });
    }

    pub fn remove_favorite_league(&self, league_id: u64) {
        self.modify(|p| {
            let mut leagues = p.favorite_leagues.clone();
            leagues.retain(|id| *id != league_id);
            PreferencesUpdate {
                favorite_leagues: Some(leagues),
                ..Default::default()
            }
        });
    }

    pub fn is_favorite_league(&self, league_id: u64) -> bool {
        self.favorite_leagues().contains(&league_id)
    }

    // ── Theme / language / notifications ─────────────────────────────────────

    pub fn theme(&self) -> Theme {
        self.get().theme
    }

    pub fn set_theme(&self, theme: Theme) {
        self.update(PreferencesUpdate {
            theme: Some(theme),
            ..Default::default()
        });
    }

    pub fn language(&self) -> Language {
        self.get().language
    }

    pub fn set_language(&self, language: Language) {
        self.update(PreferencesUpdate {
            language: Some(language),
            ..Default::default()
        });
    }

    pub fn notification_settings(&self) -> NotificationSettings {
        self.get().notifications
    }

    pub fn set_notification_settings(&self, update: NotificationSettingsUpdate) {
        self.update(PreferencesUpdate {
            notifications: Some(update),
            ..Default::default()
        });
    }

    /// Drop everything stored, reverting to defaults.
    pub fn clear_all(&self) {
        let _writing = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
        for key in [PREFERENCES_KEY, LEGACY_FAVORITES_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to clear '{}': {}", key, e);
            }
        }
        self.listeners.notify(&UserPreferences::default());
    }

    // ── Change subscription ──────────────────────────────────────────────────

    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&UserPreferences) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct BrokenStore;

    /// Memory store whose reads take long enough for writers to interleave.
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryPreferenceStore,
    }

    impl PreferenceStore for SlowStore {
        fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
            std::thread::sleep(Duration::from_millis(50));
            self.inner.load(key)
        }
        fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.save(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    impl PreferenceStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disk on fire".into()))
        }
        fn save(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk on fire".into()))
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk on fire".into()))
        }
    }

    fn service() -> (Preferences, Arc<MemoryPreferenceStore>) {
        let store = Arc::new(MemoryPreferenceStore::new());
        (Preferences::new(store.clone()), store)
    }

    #[test]
    fn test_defaults_when_nothing_stored() {
        let (prefs, _) = service();
        let p = prefs.get();
        assert_eq!(p, UserPreferences::default());
        assert_eq!(p.theme, Theme::System);
        assert_eq!(p.language, Language::En);
        assert!(p.notifications.goals && p.notifications.fulltime);
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let (prefs, _) = service();
        prefs.add_favorite_team(33);
        prefs.add_favorite_team(40);

        prefs.update(PreferencesUpdate {
            theme: Some(Theme::Dark),
            ..Default::default()
        });

        let p = prefs.get();
        assert_eq!(p.theme, Theme::Dark);
        assert_eq!(p.favorite_teams, vec![33, 40]);
        assert_eq!(p.language, Language::En);
    }

    #[test]
    fn test_stored_record_is_merged_over_defaults() {
        let (prefs, store) = service();
        store
            .save(PREFERENCES_KEY, r#"{"favoriteLeagues": [39], "theme": "light"}"#)
            .unwrap();
        let p = prefs.get();
        assert_eq!(p.favorite_leagues, vec![39]);
        assert_eq!(p.theme, Theme::Light);
        assert_eq!(p.notifications, NotificationSettings::default());
    }

    #[test]
    fn test_corrupt_record_yields_defaults() {
        let (prefs, store) = service();
        store.save(PREFERENCES_KEY, "{not json").unwrap();
        assert_eq!(prefs.get(), UserPreferences::default());
    }

    #[test]
    fn test_broken_store_is_absorbed() {
        let prefs = Preferences::new(Arc::new(BrokenStore));
        assert_eq!(prefs.get(), UserPreferences::default());
        let p = prefs.update(PreferencesUpdate {
            theme: Some(Theme::Dark),
            ..Default::default()
        });
        assert_eq!(p.theme, Theme::System);
        prefs.clear_all();
    }

    #[test]
    fn test_favourites_are_deduplicated_and_removable() {
        let (prefs, _) = service();
        prefs.add_favorite_team(50);
        prefs.add_favorite_team(50);
        assert_eq!(prefs.favorite_teams(), vec![50]);
        assert!(prefs.is_favorite_team(50));
        prefs.remove_favorite_team(50);
        assert!(!prefs.is_favorite_team(50));

        prefs.add_favorite_league(140);
        assert!(prefs.is_favorite_league(140));
        prefs.remove_favorite_league(140);
        assert!(prefs.favorite_leagues().is_empty());
    }

    #[test]
    fn test_notification_toggles_merge_field_wise() {
        let (prefs, _) = service();
        prefs.set_notification_settings(NotificationSettingsUpdate {
            cards: Some(false),
            ..Default::default()
        });
        let n = prefs.notification_settings();
        assert!(!n.cards);
        assert!(n.goals && n.kickoff && n.fulltime);
    }

    #[test]
    fn test_listeners_fire_on_change_only() {
        let (prefs, _) = service();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let id = prefs.subscribe(move |p| {
            assert_eq!(p.language, Language::Ar);
            c.fetch_add(1, Ordering::SeqCst);
        });

        prefs.set_language(Language::Ar);
        prefs.set_language(Language::Ar);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(prefs.unsubscribe(id));
        prefs.set_language(Language::Es);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_updates_keep_both_changes() {
        let prefs = Preferences::new(Arc::new(SlowStore::default()));
        std::thread::scope(|s| {
            s.spawn(|| prefs.set_theme(Theme::Dark));
            s.spawn(|| {
                prefs.update(PreferencesUpdate {
                    favorite_teams: Some(vec![33]),
                    ..Default::default()
                });
            });
        });
        let p = prefs.get();
        assert_eq!(p.theme, Theme::Dark);
        assert_eq!(p.favorite_teams, vec![33]);
    }

    #[test]
    fn test_concurrent_favourite_adds_are_all_kept() {
        let prefs = Preferences::new(Arc::new(SlowStore::default()));
        std::thread::scope(|s| {
            for id in [1, 2, 3] {
                let prefs = &prefs;
                s.spawn(move || prefs.add_favorite_team(id));
            }
        });
        let mut teams = prefs.favorite_teams();
        teams.sort_unstable();
        assert_eq!(teams, vec![1, 2, 3]);
    }

    #[test]
    fn test_clear_all_reverts_to_defaults() {
        let (prefs, store) = service();
        prefs.set_theme(Theme::Dark);
        store.save(LEGACY_FAVORITES_KEY, "[1]").unwrap();
        prefs.clear_all();
        assert_eq!(prefs.get(), UserPreferences::default());
        assert!(store.load(LEGACY_FAVORITES_KEY).unwrap().is_none());
    }
}

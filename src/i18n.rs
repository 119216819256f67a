use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

use crate::listeners::{ListenerId, Listeners};
use crate::preferences::{Language, Preferences};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub code: Language,
    pub name: &'static str,
}

pub const AVAILABLE_LANGUAGES: [LanguageInfo; 3] = [
    LanguageInfo {
        code: Language::En,
        name: "English",
    },
    LanguageInfo {
        code: Language::Ar,
        name: "العربية",
    },
    LanguageInfo {
        code: Language::Es,
        name: "Español",
    },
];

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
            Language::Es => "es",
        }
    }

    /// BCP 47 tag used for number and date formatting.
    pub fn locale(&self) -> &'static str {
        match self {
            Language::En => "en-US",
            Language::Ar => "ar-SA",
            Language::Es => "es-ES",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Language::Ar => Direction::Rtl,
            _ => Direction::Ltr,
        }
    }

    pub fn uses_24h_clock(&self) -> bool {
        matches!(self, Language::Ar)
    }
}

/// Language context handed to views. It follows the preferences service, so
/// a language saved through any path (including `clear_all`) is picked up
/// and announced to subscribers.
pub struct I18n {
    preferences: Arc<Preferences>,
    state: Arc<LanguageState>,
    subscription: ListenerId,
}

struct LanguageState {
    current: RwLock<Language>,
    listeners: Listeners<Language>,
}

impl LanguageState {
    fn apply(&self, language: Language) {
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            if *current == language {
                return;
            }
            *current = language;
        }
        self.listeners.notify(&language);
    }
}

impl I18n {
    pub fn new(preferences: Arc<Preferences>) -> Self {
        let state = Arc::new(LanguageState {
            current: RwLock::new(preferences.language()),
            listeners: Listeners::new(),
        });
        let follower = Arc::clone(&state);
        let subscription = preferences.subscribe(move |prefs| follower.apply(prefs.language));
        I18n {
            preferences,
            state,
            subscription,
        }
    }

    pub fn language(&self) -> Language {
        *self.state.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist `language`; the cached value and subscribers follow once the
    /// preferences service has saved it.
    pub fn set_language(&self, language: Language) {
        self.preferences.set_language(language);
    }

    pub fn direction(&self) -> Direction {
        self.language().direction()
    }

    pub fn locale(&self) -> &'static str {
        self.language().locale()
    }

    pub fn available_languages(&self) -> &'static [LanguageInfo] {
        &AVAILABLE_LANGUAGES
    }

    /// Kick-off time in the active language's clock convention.
    pub fn format_time<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        if self.language().uses_24h_clock() {
            at.format("%H:%M").to_string()
        } else {
            at.format("%I:%M %p").to_string()
        }
    }

    pub fn on_language_change<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&Language) + Send + Sync + 'static,
    {
        self.state.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.state.listeners.unsubscribe(id)
    }
}

impl Drop for I18n {
    fn drop(&mut self) {
        self.preferences.unsubscribe(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::MemoryPreferenceStore;
    use chrono::Utc;
    use std::sync::Mutex;

    fn i18n() -> (I18n, Arc<Preferences>) {
        let prefs = Arc::new(Preferences::new(Arc::new(MemoryPreferenceStore::new())));
        (I18n::new(prefs.clone()), prefs)
    }

    #[test]
    fn test_starts_from_stored_language() {
        let prefs = Arc::new(Preferences::new(Arc::new(MemoryPreferenceStore::new())));
        prefs.set_language(Language::Es);
        let i18n = I18n::new(prefs);
        assert_eq!(i18n.language(), Language::Es);
        assert_eq!(i18n.locale(), "es-ES");
    }

    #[test]
    fn test_set_language_persists_and_notifies() {
        let (i18n, prefs) = i18n();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let id = i18n.on_language_change(move |lang| s.lock().unwrap().push(*lang));

        i18n.set_language(Language::Ar);
        assert_eq!(prefs.language(), Language::Ar);
        assert_eq!(i18n.direction(), Direction::Rtl);

        assert!(i18n.unsubscribe(id));
        i18n.set_language(Language::En);
        assert_eq!(*seen.lock().unwrap(), vec![Language::Ar]);
        assert_eq!(i18n.direction(), Direction::Ltr);
    }

    #[test]
    fn test_follows_changes_made_through_preferences() {
        let (i18n, prefs) = i18n();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        i18n.on_language_change(move |lang| s.lock().unwrap().push(*lang));

        prefs.set_language(Language::Ar);
        assert_eq!(i18n.language(), Language::Ar);
        assert_eq!(i18n.direction(), Direction::Rtl);

        prefs.set_theme(crate::preferences::Theme::Dark);
        prefs.clear_all();
        assert_eq!(i18n.language(), Language::En);
        assert_eq!(i18n.locale(), "en-US");
        assert_eq!(*seen.lock().unwrap(), vec![Language::Ar, Language::En]);
    }

    #[test]
    fn test_drop_releases_the_preferences_subscription() {
        let (i18n, prefs) = i18n();
        assert_eq!(prefs.listener_count(), 1);
        drop(i18n);
        assert_eq!(prefs.listener_count(), 0);
    }

    #[test]
    fn test_clock_convention_follows_language() {
        let (i18n, _) = i18n();
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 15, 5, 0).unwrap();
        assert_eq!(i18n.format_time(&at), "03:05 PM");
        i18n.set_language(Language::Ar);
        assert_eq!(i18n.format_time(&at), "15:05");
    }

    #[test]
    fn test_available_languages() {
        let (i18n, _) = i18n();
        let codes: Vec<&str> = i18n
            .available_languages()
            .iter()
            .map(|l| l.code.code())
            .collect();
        assert_eq!(codes, vec!["en", "ar", "es"]);
    }
}

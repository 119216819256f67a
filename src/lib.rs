//! Live football match tracker: fixture fetching with a guaranteed fallback,
//! polling refresh, notifications, preferences and a JSON API.

pub mod capabilities;
pub mod config;
pub mod i18n;
pub mod listeners;
pub mod matches;
pub mod notifications;
pub mod preferences;
pub mod refresh;
pub mod server;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use matchee::capabilities::{NoInstallPrompt, NotificationPermissionRequester, PushKeyPermissions};
use matchee::config::Config;
use matchee::i18n::I18n;
use matchee::matches::{ApiFootball, Gateway};
use matchee::notifications::{LogSink, NotificationCenter};
use matchee::preferences::{
    MemoryPreferenceStore, PreferenceStore, Preferences, SqlitePreferenceStore,
};
use matchee::refresh::{RefreshController, RefreshOptions};
use matchee::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Match data
    let provider = ApiFootball::new(
        config.football_api_key.as_deref(),
        Some(&config.football_api_url),
        config.request_timeout(),
    )?;
    if provider.has_api_key() {
        info!("Fetching fixtures from {}", config.football_api_url);
    } else {
        info!("No API key configured, demo fixtures only");
    }
    let gateway = Arc::new(Gateway::new(Arc::new(provider), config.request_timeout()));

    // Preferences (volatile when the database cannot be opened)
    let store: Arc<dyn PreferenceStore> =
        match SqlitePreferenceStore::open(&config.preferences_path) {
            Ok(store) => {
                info!("Preferences database opened: {}", config.preferences_path);
                Arc::new(store)
            }
            Err(e) => {
                warn!(
                    "Cannot open {} ({:#}); preferences will not persist",
                    config.preferences_path, e
                );
                Arc::new(MemoryPreferenceStore::new())
            }
        };
    let preferences = Arc::new(Preferences::new(store));
    let i18n = Arc::new(I18n::new(preferences.clone()));
    info!("Language: {} ({:?})", i18n.locale(), i18n.direction());

    let controller = Arc::new(RefreshController::start(
        gateway,
        RefreshOptions {
            period: config.refresh_period(),
            range: None,
        },
    ));

    // Notifications follow the controller's published snapshots
    let permission: Arc<dyn NotificationPermissionRequester> =
        Arc::new(PushKeyPermissions::new(config.push_key()));
    let notifications = Arc::new(NotificationCenter::new(
        permission.clone(),
        Arc::new(LogSink),
    ));
    {
        let mut rx = controller.subscribe();
        let center = notifications.clone();
        let prefs = preferences.clone();
        tokio::spawn(async move {
            let mut last_seen = None;
            while rx.changed().await.is_ok() {
                let result = rx.borrow_and_update().result.clone();
                let Some(result) = result else {
                    continue;
                };
                let fetched_at = result.snapshot().fetched_at();
                if last_seen == Some(fetched_at) {
                    continue;
                }
                last_seen = Some(fetched_at);
                let raised = center
                    .observe(&result, &prefs.notification_settings())
                    .await;
                if !raised.is_empty() {
                    info!("{} new match notification(s)", raised.len());
                }
            }
        });
    }

    // Start the JSON API
    let state = AppState {
        controller: controller.clone(),
        preferences,
        i18n,
        notifications,
        permission,
        install: Arc::new(NoInstallPrompt),
        vapid_public_key: config.vapid_public_key.clone(),
    };
    let app = server::router(state);
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen_addr))?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run the server (blocks until Ctrl-C)
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    controller.stop();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

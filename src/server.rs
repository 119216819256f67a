use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::capabilities::{
    can_install, request_notification_permission, InstallPrompter,
    NotificationPermissionRequester,
};
use crate::i18n::I18n;
use crate::matches::filters::{
    calendar_month, filter_by_range, filter_live, find_by_fixture_id, parse_day,
    parse_fixture_id, search,
};
use crate::matches::{DataSource, DateRange, FetchResult, InputError, Match, StatusFilter};
use crate::notifications::NotificationCenter;
use crate::preferences::{Preferences, PreferencesUpdate};
use crate::refresh::{RefreshController, RefreshState};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<RefreshController>,
    pub preferences: Arc<Preferences>,
    pub i18n: Arc<I18n>,
    pub notifications: Arc<NotificationCenter>,
    pub permission: Arc<dyn NotificationPermissionRequester>,
    pub install: Arc<dyn InstallPrompter>,
    /// Raw VAPID public key handed to clients subscribing to push
    pub vapid_public_key: Option<String>,
}

impl AppState {
    /// Current refresh state once the first fetch has been applied.
    async fn loaded(&self) -> Result<RefreshState, ApiError> {
        let mut rx = self.controller.subscribe();
        let state = rx
            .wait_for(|s| !s.loading || s.stopped)
            .await
            .map_err(|_| ApiError::unavailable("refresh controller stopped"))?
            .clone();
        if state.stopped {
            return Err(ApiError::unavailable("refresh controller stopped"));
        }
        Ok(state)
    }
}

/// JSON error body: `{ "success": false, "error": ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<InputError> for ApiError {
    fn from(e: InputError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

/// Build the Axum router for the JSON API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/matches", get(matches_handler))
        .route("/api/matches/:id", get(match_handler))
        .route("/api/calendar", get(calendar_handler))
        .route("/api/search", get(search_handler))
        .route("/api/refresh", post(refresh_handler))
        .route(
            "/api/preferences",
            get(preferences_handler).patch(update_preferences_handler),
        )
        .route(
            "/api/notifications",
            get(notifications_handler).delete(clear_notifications_handler),
        )
        .route("/api/notifications/read-all", post(read_all_handler))
        .route("/api/notifications/:id/read", post(read_handler))
        .route("/api/notifications/:id", delete(remove_notification_handler))
        .route("/api/client-config", get(client_config_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchesQuery {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub live: Option<bool>,
    pub status: Option<String>,
}

impl MatchesQuery {
    fn range(&self) -> Result<Option<DateRange>, ApiError> {
        match (&self.date, &self.from, &self.to) {
            (Some(day), _, _) => Ok(Some(DateRange::single_day(parse_day(day)?))),
            (None, Some(from), Some(to)) => Ok(Some(DateRange::parse(from, to)?)),
            (None, None, None) => Ok(None),
            _ => Err(ApiError::bad_request("both 'from' and 'to' are required")),
        }
    }
}

/// GET /api/matches?date=YYYY-MM-DD&live=true&status=all|live|finished
async fn matches_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchesQuery>,
) -> ApiResult {
    let range = query.range()?;
    let status = match &query.status {
        Some(s) => StatusFilter::parse(s)?,
        None => StatusFilter::All,
    };

    let current = state.loaded().await?;
    let result = current
        .result
        .ok_or_else(|| ApiError::unavailable("no data yet"))?;

    // Day bounds narrow the current snapshot, fallback included.
    let offset = state.controller.gateway().offset();
    let mut data: Vec<Match> = match &range {
        Some(range) => filter_by_range(result.snapshot(), range, &offset),
        None => result.snapshot().to_vec(),
    };
    if query.live == Some(true) {
        data = filter_live(&data);
    }
    let data = status.apply(&data);

    Ok(Json(json!({
        "success": true,
        "source": result.source(),
        "data": data,
        "count": data.len(),
        "lastUpdated": current.last_updated,
    })))
}

fn found(source: DataSource, m: &Match) -> Json<Value> {
    Json(json!({ "success": true, "source": source, "data": m }))
}

/// GET /api/matches/:id
async fn match_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    let id = parse_fixture_id(&id)?;

    if let Some(result) = state.controller.state().result {
        if let Some(m) = find_by_fixture_id(result.snapshot(), id) {
            return Ok(found(result.source(), m));
        }
    }

    let result: FetchResult = state.controller.gateway().fetch_fixture(id).await;
    match find_by_fixture_id(result.snapshot(), id) {
        Some(m) => Ok(found(result.source(), m)),
        None => Err(ApiError::not_found(format!("match {} not found", id))),
    }
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: i32,
    pub month: u32,
}

/// GET /api/calendar?year=2024&month=3
async fn calendar_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult {
    let current = state.loaded().await?;
    let offset = state.controller.gateway().offset();
    let today = Utc::now().with_timezone(&offset).date_naive();
    let matches = current
        .result
        .as_ref()
        .map(|r| r.snapshot().to_vec())
        .unwrap_or_default();
    let days = calendar_month(query.year, query.month, &matches, &offset, today)?;
    Ok(Json(json!({ "success": true, "data": days })))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/search?q=madrid
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    if query.q.trim().is_empty() {
        return Err(InputError::EmptySearch.into());
    }
    let current = state.loaded().await?;
    let matches = current
        .result
        .as_ref()
        .map(|r| r.snapshot().to_vec())
        .unwrap_or_default();
    let data = search(&matches, &query.q)?;
    Ok(Json(json!({ "success": true, "data": data, "count": data.len() })))
}

/// POST /api/refresh
async fn refresh_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let applied = state.controller.refresh_now().await;
    let current = state.controller.state();
    Ok(Json(json!({
        "success": true,
        "applied": applied,
        "source": current.result.as_ref().map(FetchResult::source),
        "lastUpdated": current.last_updated,
    })))
}

/// GET /api/preferences
async fn preferences_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    Ok(Json(json!({ "success": true, "data": state.preferences.get() })))
}

/// PATCH /api/preferences
async fn update_preferences_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PreferencesUpdate>,
) -> ApiResult {
    let prefs = state.preferences.update(update);
    Ok(Json(json!({ "success": true, "data": prefs })))
}

/// GET /api/notifications
async fn notifications_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    Ok(Json(json!({
        "success": true,
        "data": state.notifications.list(),
        "unread": state.notifications.unread_count(),
    })))
}

/// POST /api/notifications/:id/read
async fn read_handler(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> ApiResult {
    if !state.notifications.mark_read(id) {
        return Err(ApiError::not_found(format!("notification {} not found", id)));
    }
    Ok(Json(json!({ "success": true })))
}

/// POST /api/notifications/read-all
async fn read_all_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    state.notifications.mark_all_read();
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/notifications/:id
async fn remove_notification_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult {
    if !state.notifications.remove(id) {
        return Err(ApiError::not_found(format!("notification {} not found", id)));
    }
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/notifications
async fn clear_notifications_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    state.notifications.clear();
    Ok(Json(json!({ "success": true })))
}

/// GET /api/client-config
async fn client_config_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let permission = request_notification_permission(state.permission.as_ref()).await;
    Ok(Json(json!({
        "success": true,
        "data": {
            "refreshIntervalSecs": state.controller.period().map(|p| p.as_secs()),
            "push": {
                "permission": permission,
                "vapidPublicKey": state.vapid_public_key,
            },
            "installable": can_install(state.install.as_ref()),
            "language": state.i18n.language(),
            "languages": state.i18n.available_languages(),
            "direction": state.i18n.direction(),
            "locale": state.i18n.locale(),
        }
    })))
}

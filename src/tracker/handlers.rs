use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use time::OffsetDateTime;
use tracing::instrument;

use crate::state::AppState;
use crate::upstream::UpstreamError;

use super::analytics::{self, DayPoint, Summary};
use super::dto::{
    AddFoodRequest, DaySummary, DayView, DeleteDayResponse, HistoryQuery, MetricsQuery,
    MetricsResponse, UpdateDayRequest, WeekQuery,
};
use super::metrics;
use super::model::{parse_date_key, today_local, DayRecord, MealSlot, Mode};
use super::services::{self, DayPatch, HistoryFilter};

// --- routers ---

pub fn day_routes() -> Router<AppState> {
    Router::new()
        .route("/day", get(get_day).patch(update_day))
        .route("/day/foods", post(add_food))
        .route("/day/foods/:meal/:index", delete(remove_food))
        .route("/day/save", post(save_day))
        .route("/day/clear", post(clear_day))
}

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/days", get(list_days))
        .route("/days/:date", get(get_saved_day).delete(delete_day))
        .route("/analytics", get(analytics_summary))
        .route("/analytics/week", get(analytics_week))
        .route("/metrics", get(body_metrics))
        .route("/export", get(export_days))
}

// --- day lifecycle handlers ---

#[instrument(skip(state))]
pub async fn get_day(State(state): State<AppState>) -> Json<DayView> {
    let day = services::current_day(&state.repo(), &state.config, today_local()).await;
    Json(day.into())
}

#[instrument(skip(state, body))]
pub async fn update_day(
    State(state): State<AppState>,
    Json(body): Json<UpdateDayRequest>,
) -> Result<Json<DayView>, (StatusCode, String)> {
    let patch = DayPatch {
        water_cups: body.water_cups,
        steps: body.steps,
        mode: body.mode,
        daily_goal: body.daily_goal,
    };
    let day = services::update_day(
        &state.repo(),
        &state.config,
        today_local(),
        OffsetDateTime::now_utc(),
        patch,
    )
    .await
    .map_err(internal)?;
    Ok(Json(day.into()))
}

#[instrument(skip(state, body))]
pub async fn add_food(
    State(state): State<AppState>,
    Json(body): Json<AddFoodRequest>,
) -> Result<Json<DayView>, (StatusCode, String)> {
    let Some(meal) = MealSlot::parse(&body.meal) else {
        return Err((StatusCode::BAD_REQUEST, "Unknown meal slot".into()));
    };
    if !(body.grams > 0.0) {
        return Err((StatusCode::BAD_REQUEST, "grams must be positive".into()));
    }
    let Some(usda) = state.usda.as_ref() else {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "USDA_API_KEY is not set on the server.".into(),
        ));
    };

    let fdc_id = body.fdc_id.into_string();
    let food = usda.food(&fdc_id).await.map_err(upstream)?;

    let now = OffsetDateTime::now_utc();
    let item = services::food_item_from_detail(&food, body.grams, now);
    let day = services::add_food(&state.repo(), &state.config, today_local(), now, meal, item)
        .await
        .map_err(internal)?;
    Ok(Json(day.into()))
}

#[instrument(skip(state))]
pub async fn remove_food(
    State(state): State<AppState>,
    Path((meal, index)): Path<(String, usize)>,
) -> Result<Json<DayView>, (StatusCode, String)> {
    let Some(meal) = MealSlot::parse(&meal) else {
        return Err((StatusCode::BAD_REQUEST, "Unknown meal slot".into()));
    };
    let removed = services::remove_food(
        &state.repo(),
        &state.config,
        today_local(),
        OffsetDateTime::now_utc(),
        meal,
        index,
    )
    .await
    .map_err(internal)?;
    match removed {
        Some(day) => Ok(Json(day.into())),
        None => Err((StatusCode::NOT_FOUND, "No item at that index".into())),
    }
}

#[instrument(skip(state))]
pub async fn save_day(
    State(state): State<AppState>,
) -> Result<Json<DayRecord>, (StatusCode, String)> {
    let record = services::save_day(
        &state.repo(),
        &state.config,
        today_local(),
        OffsetDateTime::now_utc(),
    )
    .await
    .map_err(internal)?;
    Ok(Json(record))
}

#[instrument(skip(state))]
pub async fn clear_day(
    State(state): State<AppState>,
) -> Result<Json<DayView>, (StatusCode, String)> {
    let day = services::clear_day(&state.repo(), &state.config, today_local())
        .await
        .map_err(internal)?;
    Ok(Json(day.into()))
}

// --- history handlers ---

#[instrument(skip(state))]
pub async fn list_days(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DaySummary>>, (StatusCode, String)> {
    let filter = history_filter(&query)?;
    let days = state.repo().load_days().await;
    let keys = services::filter_keys(&days, &filter, today_local());
    let summaries = keys
        .iter()
        .filter_map(|k| days.get(k))
        .map(DaySummary::from)
        .collect();
    Ok(Json(summaries))
}

#[instrument(skip(state))]
pub async fn get_saved_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DayRecord>, (StatusCode, String)> {
    let days = state.repo().load_days().await;
    match days.get(&date) {
        Some(day) => {
            let mut day = day.clone();
            // Backfill the totals cache so clients never see a day without.
            day.totals = Some(day.effective_totals());
            Ok(Json(day))
        }
        None => Err((StatusCode::NOT_FOUND, "Day not found".into())),
    }
}

#[instrument(skip(state))]
pub async fn delete_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DeleteDayResponse>, (StatusCode, String)> {
    let outcome = services::delete_day(&state.repo(), &date, today_local())
        .await
        .map_err(internal)?;
    if !outcome.deleted {
        return Err((StatusCode::NOT_FOUND, "Day not found".into()));
    }
    Ok(Json(DeleteDayResponse {
        next_selected: outcome.next_selected,
    }))
}

#[instrument(skip(state))]
pub async fn analytics_summary(State(state): State<AppState>) -> Json<Summary> {
    let days = state.repo().load_days().await;
    Json(analytics::summarize(
        &days,
        today_local(),
        state.config.default_goal,
        state.config.step_kcal_burn,
    ))
}

#[instrument(skip(state))]
pub async fn analytics_week(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Vec<DayPoint>>, (StatusCode, String)> {
    let end = match query.end.as_deref() {
        Some(key) => parse_date_key(key)
            .ok_or((StatusCode::BAD_REQUEST, "Invalid end date".to_string()))?,
        None => today_local(),
    };
    let days = state.repo().load_days().await;
    let fallback_goal = days
        .get(&super::model::date_key(end))
        .map(|d| d.goal)
        .filter(|g| *g > 0)
        .unwrap_or(state.config.default_goal);
    Ok(Json(analytics::week_trend(&days, end, fallback_goal)))
}

#[instrument]
pub async fn body_metrics(
    Query(query): Query<MetricsQuery>,
) -> Result<Json<MetricsResponse>, (StatusCode, String)> {
    let mode = match query.mode.as_deref() {
        Some(raw) => {
            Mode::parse(raw).ok_or((StatusCode::BAD_REQUEST, "Unknown mode".to_string()))?
        }
        None => Mode::default(),
    };
    let height_cm = query.height_cm.unwrap_or(0.0);
    let weight_kg = query.weight_kg.unwrap_or(0.0);

    let bmi = metrics::bmi(height_cm, weight_kg);
    let category = bmi.map(metrics::bmi_category);
    Ok(Json(MetricsResponse {
        bmi,
        category,
        suggested_calories: metrics::suggested_calories(weight_kg, mode, category),
        targets: metrics::macro_targets(mode),
    }))
}

#[instrument(skip(state))]
pub async fn export_days(State(state): State<AppState>) -> Json<BTreeMap<String, DayRecord>> {
    Json(state.repo().load_days().await)
}

// --- helpers ---

fn history_filter(query: &HistoryQuery) -> Result<HistoryFilter, (StatusCode, String)> {
    fn parse_bound(
        raw: Option<&str>,
        what: &str,
    ) -> Result<Option<time::Date>, (StatusCode, String)> {
        match raw {
            Some(key) => parse_date_key(key)
                .map(Some)
                .ok_or((StatusCode::BAD_REQUEST, format!("Invalid {what} date"))),
            None => Ok(None),
        }
    }
    let meal = match query.meal.as_deref() {
        Some(raw) => Some(
            MealSlot::parse(raw).ok_or((StatusCode::BAD_REQUEST, "Unknown meal slot".to_string()))?,
        ),
        None => None,
    };
    Ok(HistoryFilter {
        last: query.last,
        from: parse_bound(query.from.as_deref(), "from")?,
        to: parse_bound(query.to.as_deref(), "to")?,
        meal,
        q: query.q.clone(),
    })
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn upstream(err: UpstreamError) -> (StatusCode, String) {
    match &err {
        UpstreamError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
        UpstreamError::Status { status, .. } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            err.to_string(),
        ),
        UpstreamError::BadPayload { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
        UpstreamError::Transport { .. } => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

//! Public gallery feed: succeeded runs with stored images.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Serialize;

use wxcard_core::token::{create_token, DEFAULT_EXPIRY_SECONDS};
use wxcard_core::types::Timestamp;
use wxcard_db::models::run::Run;
use wxcard_db::repositories::RunRepo;

use crate::error::AppResult;
use crate::query::{clamp_page, PageParams};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 50;

/// Gallery view of one run: the display fields plus a signed token for the
/// image proxy when token protection is configured.
#[derive(Debug, Serialize)]
pub struct CardView {
    pub run_id: String,
    pub city: String,
    pub resolved_city_name: Option<String>,
    pub weather_date: Option<NaiveDate>,
    pub weather_condition: Option<String>,
    pub weather_icon: Option<String>,
    pub temp_min: Option<i32>,
    pub temp_max: Option<i32>,
    pub current_temp: Option<i32>,
    pub image_key: Option<String>,
    pub image_token: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct CardsResponse {
    pub cards: Vec<CardView>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn card_view(run: Run, image_secret: Option<&str>) -> CardView {
    let image_token = match (&run.image_key, image_secret) {
        (Some(key), Some(secret)) => Some(create_token(key, secret, DEFAULT_EXPIRY_SECONDS)),
        _ => None,
    };
    CardView {
        run_id: run.run_id,
        city: run.city,
        resolved_city_name: run.resolved_city_name,
        weather_date: run.weather_date,
        weather_condition: run.weather_condition,
        weather_icon: run.weather_icon,
        temp_min: run.temp_min,
        temp_max: run.temp_max,
        current_temp: run.current_temp,
        image_key: run.image_key,
        image_token,
        created_at: run.created_at,
    }
}

/// GET /cards?page=&limit= — newest cards first.
async fn list_cards(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<CardsResponse>> {
    let (page, limit) = clamp_page(&params, DEFAULT_LIMIT, MAX_LIMIT);
    let (rows, total) = RunRepo::list_cards(&state.pool, page, limit).await?;

    let secret = state.config.image_secret.as_deref();
    let cards = rows.into_iter().map(|run| card_view(run, secret)).collect();

    Ok(Json(CardsResponse {
        cards,
        total,
        page,
        limit,
    }))
}

/// Card routes — mounted at `/cards`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_cards))
}

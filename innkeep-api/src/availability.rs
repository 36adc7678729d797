use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use innkeep_catalog::Availability;
use innkeep_core::{BranchId, Price, Room, RoomType, StayDates};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::ApiQuery;
use crate::state::AppState;

const NOT_AVAILABLE_MESSAGE: &str = "Not available, consider changing filters";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub branch_id: i64,
    pub room_type: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl AvailabilityQuery {
    fn parse(&self) -> Result<(BranchId, RoomType, StayDates), AppError> {
        let room_type: RoomType = self.room_type.parse()?;
        let stay = StayDates::new(self.check_in, self.check_out)?;
        Ok((BranchId(self.branch_id), room_type, stay))
    }
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    #[serde(flatten)]
    pub availability: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/availability", get(check_availability))
        .route("/api/rooms/available", get(available_rooms))
        .route("/api/prices", get(list_prices))
}

async fn ping() -> &'static str {
    "pong"
}

/// GET /api/availability
async fn check_availability(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let (branch_id, room_type, stay) = query.parse()?;
    let availability = state.engine.check_availability(branch_id, room_type, &stay).await?;

    Ok(Json(AvailabilityResponse {
        message: (!availability.available).then_some(NOT_AVAILABLE_MESSAGE),
        availability,
    }))
}

/// GET /api/rooms/available
async fn available_rooms(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<Json<Vec<Room>>, AppError> {
    let (branch_id, room_type, stay) = query.parse()?;
    let rooms = state.engine.available_rooms(branch_id, room_type, &stay).await?;
    Ok(Json(rooms))
}

/// GET /api/prices
async fn list_prices(State(state): State<AppState>) -> Result<Json<Vec<Price>>, AppError> {
    Ok(Json(state.engine.prices().await?))
}

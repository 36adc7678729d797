use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use innkeep_core::{BranchId, CustomerDetails, RoomId, RoomType, StayDates};
use innkeep_reservation::{DirectBookingRequest, RoomTarget};
use innkeep_shared::BookingConfirmedEvent;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub customer_name: String,
    pub phone_number: String,
    pub email: String,
    pub branch_id: Option<i64>,
    pub room_type: Option<String>,
    /// Takes precedence over branch and type when present.
    pub room_id: Option<i64>,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub booking_time: Option<NaiveTime>,
}

impl CreateBookingRequest {
    fn into_domain(self) -> Result<DirectBookingRequest, AppError> {
        let target = match (self.room_id, self.branch_id, self.room_type.as_deref()) {
            (Some(room_id), _, _) => RoomTarget::Room(RoomId(room_id)),
            (None, Some(branch_id), Some(room_type)) => RoomTarget::ByType {
                branch_id: BranchId(branch_id),
                room_type: room_type.parse::<RoomType>()?,
            },
            _ => {
                return Err(AppError::BadRequest(
                    "Either roomId or branchId and roomType are required".to_string(),
                ))
            }
        };

        Ok(DirectBookingRequest {
            customer: CustomerDetails::new(self.customer_name, self.phone_number, self.email)?,
            target,
            stay: StayDates::new(self.check_in_date, self.check_out_date)?,
            booking_time: self.booking_time,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreatedResponse {
    pub booking_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/{booking_id}", get(get_booking))
        .route("/api/bookings/{booking_id}/receipt", get(download_receipt))
        .route("/api/bookings/{booking_id}/cancel", post(cancel_booking))
}

/// POST /api/bookings
async fn create_booking(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), AppError> {
    let booking = state.engine.book_direct(req.into_domain()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse { booking_id: booking.booking_ref }),
    ))
}

/// GET /api/bookings/{booking_id}
async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingConfirmedEvent>, AppError> {
    let view = state.engine.view(&booking_id).await?;
    Ok(Json(view.to_event(&state.engine.pricing().config().currency)))
}

/// GET /api/bookings/{booking_id}/receipt
async fn download_receipt(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> Result<Response, AppError> {
    let view = state.engine.view(&booking_id).await?;
    let receipt = state
        .receipts
        .render(&view, &state.hotel_name)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let disposition = format!(
        "attachment; filename=receipt_{}.{}",
        view.booking.booking_ref, receipt.extension
    );
    Ok((
        [
            (header::CONTENT_TYPE, receipt.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        receipt.bytes,
    )
        .into_response())
}

/// POST /api/bookings/{booking_id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.cancel(&booking_id).await?;
    info!(booking_ref = %booking_id, "cancellation accepted");
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use innkeep_catalog::CheckoutTotal;
use innkeep_core::{CustomerDetails, RoomId, StayDates};
use innkeep_reservation::{EventOutcome, PrepareRequest, Quote};
use innkeep_shared::BookingConfirmedEvent;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub customer_name: String,
    pub phone_number: String,
    pub email: String,
    pub room_id: i64,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub booking_time: Option<NaiveTime>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    pub quote: Quote,
    pub amount_due: CheckoutTotal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/sessions", post(create_session))
        .route("/api/payments/sessions/{session_id}/booking", get(session_booking))
        .route("/api/payments/webhook", post(payment_webhook))
}

/// POST /api/payments/sessions
async fn create_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let request = PrepareRequest {
        customer: CustomerDetails::new(req.customer_name, req.phone_number, req.email)?,
        room_id: RoomId(req.room_id),
        stay: StayDates::new(req.check_in_date, req.check_out_date)?,
        booking_time: req.booking_time,
    };

    let started = state.payments.start_checkout(request).await?;
    Ok(Json(CreateSessionResponse {
        session_id: started.session.id,
        checkout_url: started.session.url,
        quote: started.quote,
        amount_due: started.total,
    }))
}

/// GET /api/payments/sessions/{session_id}/booking
async fn session_booking(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<BookingConfirmedEvent>, AppError> {
    let view = state.engine.view_for_session(&session_id).await?;
    Ok(Json(view.to_event(&state.engine.pricing().config().currency)))
}

/// POST /api/payments/webhook
/// Gateway callback; the raw body is needed for signature verification.
async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {} header", SIGNATURE_HEADER)))?;

    let outcome = state
        .payments
        .handle_event(&body, signature, Utc::now().timestamp())
        .await?;

    let booking_id = match outcome {
        EventOutcome::Confirmed(confirmation) => {
            let booking = confirmation.booking();
            info!(
                booking_ref = %booking.booking_ref,
                replay = confirmation.is_replay(),
                "payment webhook processed"
            );
            Some(booking.booking_ref.clone())
        }
        EventOutcome::Ignored { .. } => None,
    };

    Ok(Json(WebhookAck { received: true, booking_id }))
}

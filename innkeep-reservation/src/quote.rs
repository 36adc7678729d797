use chrono::NaiveTime;
use innkeep_core::payment::SessionMetadata;
use innkeep_core::{CustomerDetails, Room, StayDates};
use serde::Serialize;

/// Priced preview of a payment-gated booking. Never stored and has no booking id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub customer: CustomerDetails,
    pub room: Room,
    pub stay: StayDates,
    pub nights: i64,
    pub nightly_rate_minor: i64,
    pub price_minor: i64,
    pub booking_time: NaiveTime,
}

impl Quote {
    /// Fields the gateway must hand back on completion.
    pub fn session_metadata(&self) -> SessionMetadata {
        SessionMetadata {
            customer_name: self.customer.name.clone(),
            phone_number: self.customer.phone.expose().clone(),
            email: self.customer.email.expose().clone(),
            room_id: self.room.id,
            check_in: self.stay.check_in(),
            check_out: self.stay.check_out(),
            booking_time: Some(self.booking_time),
        }
    }

    pub fn product_name(&self) -> String {
        format!("{} room {}", self.room.room_type, self.room.number)
    }
}

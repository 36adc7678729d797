use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pii::Masked;

/// Body POSTed to the outbound booking webhook once a booking is committed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmedEvent {
    pub booking_id: String,
    pub customer_name: String,
    pub email: Masked<String>,
    pub phone_number: Masked<String>,
    pub branch_name: String,
    pub room_number: String,
    pub room_type: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub price: i64,
    pub discount: i64,
    pub currency: String,
    pub status: String,
    pub created_on: NaiveDate,
    pub booking_time: NaiveTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryChannel {
    ReceiptEmail,
    Webhook,
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryChannel::ReceiptEmail => write!(f, "receipt_email"),
            DeliveryChannel::Webhook => write!(f, "webhook"),
        }
    }
}

/// Terminal record for a notification that exhausted its retries.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeliveryFailure {
    pub channel: DeliveryChannel,
    pub booking_ref: String,
    pub attempts: u32,
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
}

use chrono::{NaiveDate, NaiveTime, Timelike};
use innkeep_shared::{BookingConfirmedEvent, Masked};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::inventory::{Branch, BranchId, Room, RoomId};
use crate::{CoreError, CoreResult};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Active,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "ACTIVE",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(BookingStatus::Active),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::Internal(format!("unknown booking status {}", other))),
        }
    }
}

/// Half-open stay interval `[check_in, check_out)`. Always at least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StayDates {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayDates {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> CoreResult<Self> {
        if check_in >= check_out {
            return Err(CoreError::ValidationFailed(
                "Check-out date must be after check-in date".to_string(),
            ));
        }
        Ok(Self { check_in, check_out })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Two stays overlap when they share at least one night.
    pub fn overlaps(&self, other: &StayDates) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub name: String,
    pub phone: Masked<String>,
    pub email: Masked<String>,
}

impl CustomerDetails {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        email: impl Into<String>,
    ) -> CoreResult<Self> {
        let name = name.into().trim().to_string();
        let phone = phone.into().trim().to_string();
        let email = email.into().trim().to_string();

        if name.is_empty() {
            return Err(CoreError::ValidationFailed("Customer name is required".to_string()));
        }
        if phone.is_empty() {
            return Err(CoreError::ValidationFailed("Phone number is required".to_string()));
        }
        if !EMAIL_PATTERN.is_match(&email) {
            return Err(CoreError::ValidationFailed("Invalid email format".to_string()));
        }

        Ok(Self {
            name,
            phone: Masked(phone),
            email: Masked(email),
        })
    }
}

/// A booking that has not been written yet. The public reference is assigned
/// before the write so a retried insert cannot mint a second identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub booking_ref: String,
    pub customer: CustomerDetails,
    pub branch_id: BranchId,
    pub room_id: RoomId,
    pub stay: StayDates,
    pub price_minor: i64,
    pub discount_minor: i64,
    pub created_on: NaiveDate,
    pub booking_time: NaiveTime,
    pub payment_session_id: Option<String>,
}

impl NewBooking {
    pub fn into_booking(self, id: i64) -> Booking {
        Booking {
            id,
            booking_ref: self.booking_ref,
            customer: self.customer,
            branch_id: self.branch_id,
            room_id: self.room_id,
            stay: self.stay,
            price_minor: self.price_minor,
            discount_minor: self.discount_minor,
            created_on: self.created_on,
            booking_time: self.booking_time,
            status: BookingStatus::Active,
            payment_session_id: self.payment_session_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "bookingId")]
    pub booking_ref: String,
    pub customer: CustomerDetails,
    pub branch_id: BranchId,
    pub room_id: RoomId,
    pub stay: StayDates,
    pub price_minor: i64,
    pub discount_minor: i64,
    pub created_on: NaiveDate,
    pub booking_time: NaiveTime,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_session_id: Option<String>,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }
}

/// Booking joined with the room and branch it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingView {
    pub booking: Booking,
    pub room: Room,
    pub branch: Branch,
}

impl BookingView {
    pub fn to_event(&self, currency: &str) -> BookingConfirmedEvent {
        let b = &self.booking;
        BookingConfirmedEvent {
            booking_id: b.booking_ref.clone(),
            customer_name: b.customer.name.clone(),
            email: b.customer.email.clone(),
            phone_number: b.customer.phone.clone(),
            branch_name: self.branch.name.clone(),
            room_number: self.room.number.clone(),
            room_type: self.room.room_type.to_string(),
            check_in: b.stay.check_in(),
            check_out: b.stay.check_out(),
            price: b.price_minor,
            discount: b.discount_minor,
            currency: currency.to_string(),
            status: b.status.to_string(),
            created_on: b.created_on,
            booking_time: b.booking_time,
        }
    }
}

/// Time of day at whole-second precision, as stored on a booking.
pub fn booking_time_of(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_stay_rejects_empty_or_inverted_range() {
        assert!(StayDates::new(date(2024, 1, 3), date(2024, 1, 3)).is_err());
        assert!(StayDates::new(date(2024, 1, 3), date(2024, 1, 1)).is_err());
        assert_eq!(StayDates::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap().nights(), 2);
    }

    #[test]
    fn test_back_to_back_stays_do_not_overlap() {
        let first = StayDates::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap();
        let second = StayDates::new(date(2024, 1, 3), date(2024, 1, 5)).unwrap();
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));

        let inside = StayDates::new(date(2024, 1, 2), date(2024, 1, 3)).unwrap();
        assert!(first.overlaps(&inside));
    }

    #[test]
    fn test_customer_validation() {
        assert!(CustomerDetails::new("Asha", "98765", "asha@example.com").is_ok());
        assert!(CustomerDetails::new("  ", "98765", "asha@example.com").is_err());
        assert!(CustomerDetails::new("Asha", "", "asha@example.com").is_err());
        assert!(CustomerDetails::new("Asha", "98765", "asha@example").is_err());
        assert!(CustomerDetails::new("Asha", "98765", "asha example.com").is_err());
    }

    #[test]
    fn test_booking_time_drops_subseconds() {
        let t = NaiveTime::from_hms_milli_opt(10, 30, 15, 250).unwrap();
        assert_eq!(booking_time_of(t), NaiveTime::from_hms_opt(10, 30, 15).unwrap());
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric_and_matches_shared_nights(
            a_start in 0i64..60, a_len in 1i64..10,
            b_start in 0i64..60, b_len in 1i64..10,
        ) {
            let base = date(2024, 1, 1);
            let a = StayDates::new(base + chrono::Days::new(a_start as u64), base + chrono::Days::new((a_start + a_len) as u64)).unwrap();
            let b = StayDates::new(base + chrono::Days::new(b_start as u64), base + chrono::Days::new((b_start + b_len) as u64)).unwrap();

            let shared_night = (a_start..a_start + a_len).any(|n| n >= b_start && n < b_start + b_len);
            prop_assert_eq!(a.overlaps(&b), shared_night);
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::booking::{Booking, NewBooking, StayDates};
use crate::inventory::{Branch, BranchId, Price, Room, RoomId, RoomType};
use crate::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The room already has an ACTIVE booking overlapping the requested stay.
    #[error("room has an overlapping active booking")]
    Conflict,
    #[error("payment session already has a booking: {0}")]
    DuplicateSession(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => {
                CoreError::Conflict("Room is not available for the selected dates".to_string())
            }
            StoreError::DuplicateSession(session) => {
                CoreError::Conflict(format!("Payment session {} is already confirmed", session))
            }
            StoreError::Backend(msg) => CoreError::Storage(msg),
        }
    }
}

/// Read-mostly branch, room and rate data.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn branch(&self, id: BranchId) -> Result<Option<Branch>, StoreError>;

    async fn room(&self, id: RoomId) -> Result<Option<Room>, StoreError>;

    /// Rooms of one type in a branch, ascending by id.
    async fn rooms_of_type(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
    ) -> Result<Vec<Room>, StoreError>;

    async fn price_for(&self, room_type: RoomType) -> Result<Option<Price>, StoreError>;

    async fn prices(&self) -> Result<Vec<Price>, StoreError>;
}

/// The booking table. Every write that can break the one-active-booking-per-room-night
/// rule goes through [`BookingRepository::insert_if_room_free`].
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// ACTIVE bookings on rooms of `room_type` in the branch overlapping `stay`.
    async fn count_active_overlapping(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> Result<u32, StoreError>;

    async fn room_has_overlap(&self, room_id: RoomId, stay: &StayDates) -> Result<bool, StoreError>;

    /// Rooms of `room_type` in the branch with no overlapping ACTIVE booking, ascending by id.
    async fn free_rooms(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> Result<Vec<Room>, StoreError>;

    /// Persists the booking as ACTIVE only if its room is still free for the stay.
    ///
    /// Returns [`StoreError::Conflict`] when an overlapping ACTIVE booking exists and
    /// [`StoreError::DuplicateSession`] when the payment session id is already taken.
    async fn insert_if_room_free(&self, booking: NewBooking) -> Result<Booking, StoreError>;

    async fn find_by_ref(&self, booking_ref: &str) -> Result<Option<Booking>, StoreError>;

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Booking>, StoreError>;

    /// ACTIVE → CANCELLED. Returns false if no ACTIVE booking has that reference.
    async fn cancel_active(&self, booking_ref: &str) -> Result<bool, StoreError>;

    /// Deletes every booking created strictly before `cutoff`, any status.
    async fn purge_created_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError>;
}

use innkeep_core::{
    BookingRepository, BranchId, CatalogRepository, CoreError, CoreResult, Room, RoomType, StayDates,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    pub total_rooms: u32,
    pub booked_rooms: u32,
}

/// Capacity of a branch/room-type pair against its ACTIVE overlapping bookings.
pub struct AvailabilityChecker {
    catalog: Arc<dyn CatalogRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl AvailabilityChecker {
    pub fn new(catalog: Arc<dyn CatalogRepository>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { catalog, bookings }
    }

    pub async fn check(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> CoreResult<Availability> {
        self.require_branch(branch_id).await?;

        let total_rooms = self.catalog.rooms_of_type(branch_id, room_type).await?.len() as u32;
        let booked_rooms = self
            .bookings
            .count_active_overlapping(branch_id, room_type, stay)
            .await?;

        debug!(
            branch_id = %branch_id,
            room_type = %room_type,
            total_rooms,
            booked_rooms,
            "availability computed"
        );

        Ok(Availability {
            available: booked_rooms < total_rooms,
            total_rooms,
            booked_rooms,
        })
    }

    /// Concrete rooms with no overlapping ACTIVE booking, lowest id first.
    pub async fn available_rooms(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> CoreResult<Vec<Room>> {
        self.require_branch(branch_id).await?;
        Ok(self.bookings.free_rooms(branch_id, room_type, stay).await?)
    }

    async fn require_branch(&self, branch_id: BranchId) -> CoreResult<()> {
        match self.catalog.branch(branch_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::NotFound(format!("Branch {}", branch_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use innkeep_core::{CustomerDetails, NewBooking};
    use innkeep_store::MemoryStore;

    fn stay(from: (i32, u32, u32), to: (i32, u32, u32)) -> StayDates {
        StayDates::new(
            NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
            NaiveDate::from_ymd_opt(to.0, to.1, to.2).unwrap(),
        )
        .unwrap()
    }

    fn booking(reference: &str, room: &Room, stay: StayDates) -> NewBooking {
        NewBooking {
            booking_ref: reference.to_string(),
            customer: CustomerDetails::new("Ravi", "12345", "ravi@example.com").unwrap(),
            branch_id: room.branch_id,
            room_id: room.id,
            stay,
            price_minor: 0,
            discount_minor: 0,
            created_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            booking_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            payment_session_id: None,
        }
    }

    #[tokio::test]
    async fn test_booked_rooms_counts_only_active_overlaps() {
        let store = Arc::new(MemoryStore::new());
        let branch = store.add_branch("Pune", "MH").await;
        let r1 = store.add_room(branch.id, "1", RoomType::Standard).await;
        let r2 = store.add_room(branch.id, "2", RoomType::Standard).await;
        let suite = store.add_room(branch.id, "3", RoomType::Luxury).await;

        let window = stay((2024, 1, 1), (2024, 1, 3));
        store.insert_if_room_free(booking("a", &r1, window)).await.unwrap();
        store.insert_if_room_free(booking("b", &r2, stay((2024, 1, 3), (2024, 1, 4)))).await.unwrap();
        store.insert_if_room_free(booking("c", &suite, window)).await.unwrap();
        store.insert_if_room_free(booking("d", &r2, stay((2023, 12, 30), (2024, 1, 2)))).await.unwrap();
        store.cancel_active("d").await.unwrap();

        let checker = AvailabilityChecker::new(store.clone(), store.clone());
        let result = checker.check(branch.id, RoomType::Standard, &window).await.unwrap();
        assert_eq!(
            result,
            Availability { available: true, total_rooms: 2, booked_rooms: 1 }
        );

        let free = checker.available_rooms(branch.id, RoomType::Standard, &window).await.unwrap();
        assert_eq!(free, vec![r2]);
    }

    #[tokio::test]
    async fn test_type_without_rooms_is_unavailable() {
        let store = Arc::new(MemoryStore::new());
        let branch = store.add_branch("Pune", "MH").await;
        let checker = AvailabilityChecker::new(store.clone(), store.clone());

        let result = checker
            .check(branch.id, RoomType::Deluxe, &stay((2024, 1, 1), (2024, 1, 2)))
            .await
            .unwrap();
        assert!(!result.available);
        assert_eq!(result.total_rooms, 0);
    }

    #[tokio::test]
    async fn test_unknown_branch_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let checker = AvailabilityChecker::new(store.clone(), store.clone());

        let err = checker
            .check(BranchId(42), RoomType::Standard, &stay((2024, 1, 1), (2024, 1, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}

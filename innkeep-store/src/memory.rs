use async_trait::async_trait;
use chrono::NaiveDate;
use innkeep_core::{
    Booking, BookingRepository, BookingStatus, Branch, BranchId, CatalogRepository, NewBooking,
    Price, Room, RoomId, RoomType, StayDates, StoreError,
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct CatalogTables {
    branches: BTreeMap<BranchId, Branch>,
    rooms: BTreeMap<RoomId, Room>,
    prices: BTreeMap<RoomType, Price>,
}

#[derive(Default)]
struct BookingTable {
    next_id: i64,
    rows: BTreeMap<i64, Booking>,
}

/// Process-local store. Each booking write runs check-then-insert under one
/// write lock, so it gives the same guarantees as the Postgres constraints.
#[derive(Default)]
pub struct MemoryStore {
    catalog: RwLock<CatalogTables>,
    bookings: RwLock<BookingTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_branch(&self, name: &str, state: &str) -> Branch {
        let mut catalog = self.catalog.write().await;
        let id = BranchId(catalog.branches.len() as i64 + 1);
        let branch = Branch {
            id,
            name: name.to_string(),
            state: state.to_string(),
        };
        catalog.branches.insert(id, branch.clone());
        branch
    }

    /// Adds a room with an explicit id so callers can address it directly.
    pub async fn add_room_with_id(
        &self,
        id: RoomId,
        branch_id: BranchId,
        number: &str,
        room_type: RoomType,
    ) -> Room {
        let room = Room {
            id,
            number: number.to_string(),
            room_type,
            branch_id,
        };
        self.catalog.write().await.rooms.insert(id, room.clone());
        room
    }

    pub async fn add_room(&self, branch_id: BranchId, number: &str, room_type: RoomType) -> Room {
        let id = {
            let catalog = self.catalog.read().await;
            RoomId(catalog.rooms.keys().next_back().map_or(1, |last| last.0 + 1))
        };
        self.add_room_with_id(id, branch_id, number, room_type).await
    }

    pub async fn set_price(&self, room_type: RoomType, nightly_rate_minor: i64, currency: &str) {
        self.catalog.write().await.prices.insert(
            room_type,
            Price {
                room_type,
                nightly_rate_minor,
                currency: currency.to_string(),
            },
        );
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        self.bookings.read().await.rows.values().cloned().collect()
    }

    async fn rooms_matching(&self, branch_id: BranchId, room_type: RoomType) -> Vec<Room> {
        self.catalog
            .read()
            .await
            .rooms
            .values()
            .filter(|room| room.branch_id == branch_id && room.room_type == room_type)
            .cloned()
            .collect()
    }
}

fn overlapping_active<'a>(
    table: &'a BookingTable,
    room_id: RoomId,
    stay: &'a StayDates,
) -> impl Iterator<Item = &'a Booking> + 'a {
    table
        .rows
        .values()
        .filter(move |b| b.room_id == room_id && b.is_active() && b.stay.overlaps(stay))
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn branch(&self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        Ok(self.catalog.read().await.branches.get(&id).cloned())
    }

    async fn room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.catalog.read().await.rooms.get(&id).cloned())
    }

    async fn rooms_of_type(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
    ) -> Result<Vec<Room>, StoreError> {
        Ok(self.rooms_matching(branch_id, room_type).await)
    }

    async fn price_for(&self, room_type: RoomType) -> Result<Option<Price>, StoreError> {
        Ok(self.catalog.read().await.prices.get(&room_type).cloned())
    }

    async fn prices(&self) -> Result<Vec<Price>, StoreError> {
        let mut prices: Vec<Price> = self.catalog.read().await.prices.values().cloned().collect();
        prices.sort_by_key(|p| p.nightly_rate_minor);
        Ok(prices)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn count_active_overlapping(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> Result<u32, StoreError> {
        let rooms = self.rooms_matching(branch_id, room_type).await;
        let table = self.bookings.read().await;
        let count = rooms
            .iter()
            .map(|room| overlapping_active(&table, room.id, stay).count())
            .sum::<usize>();
        Ok(count as u32)
    }

    async fn room_has_overlap(&self, room_id: RoomId, stay: &StayDates) -> Result<bool, StoreError> {
        let table = self.bookings.read().await;
        let clash = overlapping_active(&table, room_id, stay).next().is_some();
        Ok(clash)
    }

    async fn free_rooms(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> Result<Vec<Room>, StoreError> {
        let rooms = self.rooms_matching(branch_id, room_type).await;
        let table = self.bookings.read().await;
        Ok(rooms
            .into_iter()
            .filter(|room| overlapping_active(&table, room.id, stay).next().is_none())
            .collect())
    }

    async fn insert_if_room_free(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        let mut table = self.bookings.write().await;

        if let Some(session) = booking.payment_session_id.as_deref() {
            if table
                .rows
                .values()
                .any(|b| b.payment_session_id.as_deref() == Some(session))
            {
                return Err(StoreError::DuplicateSession(session.to_string()));
            }
        }
        if overlapping_active(&table, booking.room_id, &booking.stay).next().is_some() {
            return Err(StoreError::Conflict);
        }

        table.next_id += 1;
        let id = table.next_id;
        let stored = booking.into_booking(id);
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_ref(&self, booking_ref: &str) -> Result<Option<Booking>, StoreError> {
        let table = self.bookings.read().await;
        Ok(table.rows.values().find(|b| b.booking_ref == booking_ref).cloned())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Booking>, StoreError> {
        let table = self.bookings.read().await;
        Ok(table
            .rows
            .values()
            .find(|b| b.payment_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn cancel_active(&self, booking_ref: &str) -> Result<bool, StoreError> {
        let mut table = self.bookings.write().await;
        match table
            .rows
            .values_mut()
            .find(|b| b.booking_ref == booking_ref && b.is_active())
        {
            Some(booking) => {
                booking.status = BookingStatus::Cancelled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_created_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let mut table = self.bookings.write().await;
        let before = table.rows.len();
        table.rows.retain(|_, b| b.created_on >= cutoff);
        Ok((before - table.rows.len()) as u64)
    }
}

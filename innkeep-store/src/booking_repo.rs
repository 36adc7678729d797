use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use innkeep_core::{
    Booking, BookingRepository, BookingStatus, BranchId, CustomerDetails, NewBooking, Room, RoomId,
    RoomType, StayDates, StoreError,
};
use innkeep_shared::Masked;
use sqlx::PgPool;
use tracing::debug;

use crate::catalog_repo::RoomRow;
use crate::database::{backend, is_transient, map_write_error};

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One check-then-insert at READ COMMITTED. `None` means the pre-check saw
    /// an overlapping ACTIVE stay; a racing writer that slips past it is
    /// stopped by `bookings_no_active_overlap` (23P01).
    async fn try_insert(&self, booking: &NewBooking) -> Result<Option<BookingRow>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let clash: bool = sqlx::query_scalar(OVERLAP_EXISTS)
            .bind(booking.room_id.0)
            .bind(booking.stay.check_in())
            .bind(booking.stay.check_out())
            .fetch_one(&mut *tx)
            .await?;

        if clash {
            tx.rollback().await?;
            return Ok(None);
        }

        let insert = format!(
            r#"
            INSERT INTO bookings (
                booking_ref, customer_name, phone_number, email, branch_id, room_id,
                check_in, check_out, price_minor, discount_minor, created_on, booking_time,
                status, payment_session_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'ACTIVE', $13)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );

        let row = sqlx::query_as::<_, BookingRow>(&insert)
            .bind(&booking.booking_ref)
            .bind(&booking.customer.name)
            .bind(booking.customer.phone.expose())
            .bind(booking.customer.email.expose())
            .bind(booking.branch_id.0)
            .bind(booking.room_id.0)
            .bind(booking.stay.check_in())
            .bind(booking.stay.check_out())
            .bind(booking.price_minor)
            .bind(booking.discount_minor)
            .bind(booking.created_on)
            .bind(booking.booking_time)
            .bind(booking.payment_session_id.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(row))
    }
}

/// Deadlock or serialization retries before the write is reported as a backend failure.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Uses the same range expression as the exclusion constraint so its gist index applies.
const OVERLAP_EXISTS: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM bookings
        WHERE room_id = $1
          AND status = 'ACTIVE'
          AND daterange(check_in, check_out, '[)') && daterange($2, $3, '[)')
    )
"#;

const BOOKING_COLUMNS: &str = "id, booking_ref, customer_name, phone_number, email, branch_id, \
     room_id, check_in, check_out, price_minor, discount_minor, created_on, booking_time, status, \
     payment_session_id";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    booking_ref: String,
    customer_name: String,
    phone_number: String,
    email: String,
    branch_id: i64,
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
    price_minor: i64,
    discount_minor: i64,
    created_on: NaiveDate,
    booking_time: NaiveTime,
    status: String,
    payment_session_id: Option<String>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let stay = StayDates::new(row.check_in, row.check_out)
            .map_err(|e| StoreError::Backend(format!("booking {}: {}", row.booking_ref, e)))?;
        let status = row
            .status
            .parse::<BookingStatus>()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Booking {
            id: row.id,
            booking_ref: row.booking_ref,
            customer: CustomerDetails {
                name: row.customer_name,
                phone: Masked(row.phone_number),
                email: Masked(row.email),
            },
            branch_id: BranchId(row.branch_id),
            room_id: RoomId(row.room_id),
            stay,
            price_minor: row.price_minor,
            discount_minor: row.discount_minor,
            created_on: row.created_on,
            booking_time: row.booking_time,
            status,
            payment_session_id: row.payment_session_id,
        })
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn count_active_overlapping(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> Result<u32, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM bookings b
            JOIN rooms r ON r.id = b.room_id
            WHERE b.branch_id = $1
              AND r.room_type = $2
              AND b.status = 'ACTIVE'
              AND b.check_in < $4
              AND b.check_out > $3
            "#,
        )
        .bind(branch_id.0)
        .bind(room_type.as_str())
        .bind(stay.check_in())
        .bind(stay.check_out())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn room_has_overlap(&self, room_id: RoomId, stay: &StayDates) -> Result<bool, StoreError> {
        sqlx::query_scalar(OVERLAP_EXISTS)
            .bind(room_id.0)
            .bind(stay.check_in())
            .bind(stay.check_out())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }

    async fn free_rooms(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> Result<Vec<Room>, StoreError> {
        let rows = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT r.id, r.room_number, r.room_type, r.branch_id
            FROM rooms r
            WHERE r.branch_id = $1
              AND r.room_type = $2
              AND NOT EXISTS (
                  SELECT 1 FROM bookings b
                  WHERE b.room_id = r.id
                    AND b.status = 'ACTIVE'
                    AND b.check_in < $4
                    AND b.check_out > $3
              )
            ORDER BY r.id
            "#,
        )
        .bind(branch_id.0)
        .bind(room_type.as_str())
        .bind(stay.check_in())
        .bind(stay.check_out())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Room::try_from).collect()
    }

    async fn insert_if_room_free(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        let session = booking.payment_session_id.as_deref();
        let mut attempt = 1;

        loop {
            match self.try_insert(&booking).await {
                Ok(Some(row)) => return Booking::try_from(row),
                Ok(None) => {
                    debug!(room_id = %booking.room_id, "room already taken for requested stay");
                    return Err(StoreError::Conflict);
                }
                Err(e) if is_transient(&e) && attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(room_id = %booking.room_id, attempt, error = %e, "booking write aborted, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(map_write_error(e, session)),
            }
        }
    }

    async fn find_by_ref(&self, booking_ref: &str) -> Result<Option<Booking>, StoreError> {
        let query = format!("SELECT {} FROM bookings WHERE booking_ref = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&query)
            .bind(booking_ref)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(Booking::try_from).transpose()
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Booking>, StoreError> {
        let query = format!("SELECT {} FROM bookings WHERE payment_session_id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&query)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(Booking::try_from).transpose()
    }

    async fn cancel_active(&self, booking_ref: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'CANCELLED' WHERE booking_ref = $1 AND status = 'ACTIVE'",
        )
        .bind(booking_ref)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected() == 1)
    }

    async fn purge_created_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM bookings WHERE created_on < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected())
    }
}

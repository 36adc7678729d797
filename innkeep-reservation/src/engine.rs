use chrono::{NaiveTime, Utc};
use innkeep_catalog::{Availability, AvailabilityChecker, PricingEngine};
use innkeep_core::booking::booking_time_of;
use innkeep_core::payment::SessionMetadata;
use innkeep_core::{
    Booking, BookingNotifier, BookingRepository, BookingView, BranchId, CatalogRepository,
    CoreError, CoreResult, CustomerDetails, NewBooking, Price, Room, RoomId, RoomType, StayDates,
    StoreError,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::quote::Quote;

/// How many times a type-level booking re-selects a room after losing a race.
const MAX_SELECTION_ROUNDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomTarget {
    /// Lowest-id free room of this type in the branch.
    ByType { branch_id: BranchId, room_type: RoomType },
    /// This exact room; its own branch and type apply.
    Room(RoomId),
}

#[derive(Debug, Clone)]
pub struct DirectBookingRequest {
    pub customer: CustomerDetails,
    pub target: RoomTarget,
    pub stay: StayDates,
    pub booking_time: Option<NaiveTime>,
}

#[derive(Debug, Clone)]
pub struct PrepareRequest {
    pub customer: CustomerDetails,
    pub room_id: RoomId,
    pub stay: StayDates,
    pub booking_time: Option<NaiveTime>,
}

/// Result of a payment confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Created(Booking),
    /// The session was already confirmed; this is the booking it produced.
    Replayed(Booking),
}

impl Confirmation {
    pub fn booking(&self) -> &Booking {
        match self {
            Confirmation::Created(b) | Confirmation::Replayed(b) => b,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Confirmation::Replayed(_))
    }
}

/// Books, confirms and cancels stays.
///
/// The one-active-booking-per-room-night rule is enforced by
/// [`BookingRepository::insert_if_room_free`]; the reads here only pick a
/// candidate and produce a friendly rejection.
pub struct ReservationEngine {
    catalog: Arc<dyn CatalogRepository>,
    bookings: Arc<dyn BookingRepository>,
    availability: AvailabilityChecker,
    pricing: PricingEngine,
    notifier: Arc<dyn BookingNotifier>,
}

impl ReservationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        bookings: Arc<dyn BookingRepository>,
        pricing: PricingEngine,
        notifier: Arc<dyn BookingNotifier>,
    ) -> Self {
        let availability = AvailabilityChecker::new(catalog.clone(), bookings.clone());
        Self {
            catalog,
            bookings,
            availability,
            pricing,
            notifier,
        }
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    pub async fn check_availability(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> CoreResult<Availability> {
        self.availability.check(branch_id, room_type, stay).await
    }

    pub async fn available_rooms(
        &self,
        branch_id: BranchId,
        room_type: RoomType,
        stay: &StayDates,
    ) -> CoreResult<Vec<Room>> {
        self.availability.available_rooms(branch_id, room_type, stay).await
    }

    pub async fn room(&self, room_id: RoomId) -> CoreResult<Room> {
        self.catalog
            .room(room_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Room {}", room_id)))
    }

    pub async fn prices(&self) -> CoreResult<Vec<Price>> {
        self.pricing.prices().await
    }

    pub async fn book_direct(&self, request: DirectBookingRequest) -> CoreResult<Booking> {
        match request.target {
            RoomTarget::Room(room_id) => {
                let room = self.room(room_id).await?;
                if self.bookings.room_has_overlap(room.id, &request.stay).await? {
                    return Err(room_unavailable());
                }
                let price = self.pricing.stay_price(room.room_type, &request.stay).await?;
                let draft = new_booking(&request.customer, &room, request.stay, price, request.booking_time, None);
                let booking = self.bookings.insert_if_room_free(draft).await?;
                Ok(self.committed(booking, room).await)
            }
            RoomTarget::ByType { branch_id, room_type } => {
                let availability = self.availability.check(branch_id, room_type, &request.stay).await?;
                if !availability.available {
                    warn!(
                        branch_id = %branch_id,
                        room_type = %room_type,
                        booked = availability.booked_rooms,
                        total = availability.total_rooms,
                        "direct booking rejected, no capacity"
                    );
                    return Err(CoreError::Conflict(format!(
                        "No {} rooms available for the selected dates",
                        room_type
                    )));
                }
                let price = self.pricing.stay_price(room_type, &request.stay).await?;
                self.claim_lowest_free_room(&request, branch_id, room_type, price).await
            }
        }
    }

    async fn claim_lowest_free_room(
        &self,
        request: &DirectBookingRequest,
        branch_id: BranchId,
        room_type: RoomType,
        price: i64,
    ) -> CoreResult<Booking> {
        let booking_ref = Uuid::new_v4().to_string();

        for round in 1..=MAX_SELECTION_ROUNDS {
            let free = self.bookings.free_rooms(branch_id, room_type, &request.stay).await?;
            let Some(room) = free.into_iter().next() else {
                return Err(room_unavailable());
            };

            let mut draft = new_booking(&request.customer, &room, request.stay, price, request.booking_time, None);
            draft.booking_ref = booking_ref.clone();

            match self.bookings.insert_if_room_free(draft).await {
                Ok(booking) => return Ok(self.committed(booking, room).await),
                Err(StoreError::Conflict) => {
                    debug!(room_id = %room.id, round, "room taken concurrently, reselecting");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(room_unavailable())
    }

    /// Prices a stay on one room without writing anything.
    pub async fn prepare(&self, request: PrepareRequest) -> CoreResult<Quote> {
        let room = self.room(request.room_id).await?;
        if self.bookings.room_has_overlap(room.id, &request.stay).await? {
            return Err(room_unavailable());
        }
        let rate = self.pricing.nightly_rate(room.room_type).await?;
        let price_minor = self.pricing.stay_price(room.room_type, &request.stay).await?;

        debug!(room_id = %room.id, price_minor, "quote prepared");
        Ok(Quote {
            customer: request.customer,
            nights: request.stay.nights(),
            stay: request.stay,
            room,
            nightly_rate_minor: rate.nightly_rate_minor,
            price_minor,
            booking_time: booking_time_of(request.booking_time.unwrap_or_else(|| Utc::now().time())),
        })
    }

    /// Turns a completed payment session into exactly one booking.
    ///
    /// Replays of the same session return the booking already stored for it and
    /// do not notify again. Only the pre-selected room is re-checked.
    pub async fn confirm(
        &self,
        session_id: &str,
        metadata: SessionMetadata,
    ) -> CoreResult<Confirmation> {
        if let Some(existing) = self.bookings.find_by_session(session_id).await? {
            info!(session_id, booking_ref = %existing.booking_ref, "payment session already confirmed");
            return Ok(Confirmation::Replayed(existing));
        }

        let customer = CustomerDetails::new(metadata.customer_name, metadata.phone_number, metadata.email)?;
        let stay = StayDates::new(metadata.check_in, metadata.check_out)?;
        let room = self.room(metadata.room_id).await?;

        if self.bookings.room_has_overlap(room.id, &stay).await? {
            return self.replay_or_conflict(session_id, room.id).await;
        }
        let price = self.pricing.stay_price(room.room_type, &stay).await?;
        let draft = new_booking(
            &customer,
            &room,
            stay,
            price,
            metadata.booking_time,
            Some(session_id.to_string()),
        );

        match self.bookings.insert_if_room_free(draft).await {
            Ok(booking) => Ok(Confirmation::Created(self.committed(booking, room).await)),
            Err(StoreError::DuplicateSession(_)) => {
                let winner = self.bookings.find_by_session(session_id).await?.ok_or_else(|| {
                    CoreError::Internal(format!("session {} reported duplicate but has no booking", session_id))
                })?;
                info!(session_id, booking_ref = %winner.booking_ref, "concurrent confirmation resolved to existing booking");
                Ok(Confirmation::Replayed(winner))
            }
            Err(StoreError::Conflict) => self.replay_or_conflict(session_id, room.id).await,
            Err(e) => Err(e.into()),
        }
    }

    /// A concurrent confirmation of the same session may be what occupies the room.
    async fn replay_or_conflict(&self, session_id: &str, room_id: RoomId) -> CoreResult<Confirmation> {
        if let Some(existing) = self.bookings.find_by_session(session_id).await? {
            info!(session_id, booking_ref = %existing.booking_ref, "concurrent confirmation resolved to existing booking");
            return Ok(Confirmation::Replayed(existing));
        }
        warn!(session_id, room_id = %room_id, "paid session lost its room before confirmation");
        Err(room_unavailable())
    }

    pub async fn cancel(&self, booking_ref: &str) -> CoreResult<()> {
        if self.bookings.cancel_active(booking_ref).await? {
            info!(booking_ref, "booking cancelled");
            Ok(())
        } else {
            Err(CoreError::NotFound(format!("Active booking {}", booking_ref)))
        }
    }

    /// Booking joined with its room and branch.
    pub async fn view(&self, booking_ref: &str) -> CoreResult<BookingView> {
        let booking = self
            .bookings
            .find_by_ref(booking_ref)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_ref)))?;
        self.join(booking).await
    }

    pub async fn view_for_session(&self, session_id: &str) -> CoreResult<BookingView> {
        let booking = self
            .bookings
            .find_by_session(session_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking for session {}", session_id)))?;
        self.join(booking).await
    }

    async fn join(&self, booking: Booking) -> CoreResult<BookingView> {
        let room = self.room(booking.room_id).await?;
        let branch = self
            .catalog
            .branch(booking.branch_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Branch {}", booking.branch_id)))?;
        Ok(BookingView { booking, room, branch })
    }

    /// Post-commit: log, then hand off to the notifier. Never fails the booking.
    async fn committed(&self, booking: Booking, room: Room) -> Booking {
        info!(
            booking_ref = %booking.booking_ref,
            room_id = %booking.room_id,
            check_in = %booking.stay.check_in(),
            check_out = %booking.stay.check_out(),
            "booking created"
        );

        match self.catalog.branch(room.branch_id).await {
            Ok(Some(branch)) => self.notifier.booking_committed(BookingView {
                booking: booking.clone(),
                room,
                branch,
            }),
            Ok(None) => error!(booking_ref = %booking.booking_ref, "branch missing, notifications skipped"),
            Err(e) => error!(booking_ref = %booking.booking_ref, error = %e, "notifications skipped"),
        }
        booking
    }
}

fn room_unavailable() -> CoreError {
    CoreError::Conflict("Room is not available for the selected dates".to_string())
}

fn new_booking(
    customer: &CustomerDetails,
    room: &Room,
    stay: StayDates,
    price_minor: i64,
    booking_time: Option<NaiveTime>,
    payment_session_id: Option<String>,
) -> NewBooking {
    let now = Utc::now();
    NewBooking {
        booking_ref: Uuid::new_v4().to_string(),
        customer: customer.clone(),
        branch_id: room.branch_id,
        room_id: room.id,
        stay,
        price_minor,
        discount_minor: 0,
        created_on: now.date_naive(),
        booking_time: booking_time_of(booking_time.unwrap_or_else(|| now.time())),
        payment_session_id,
    }
}

use crate::booking::BookingView;

/// Post-commit side effects for a booking.
///
/// Called after the booking row is durable. Implementations must return
/// immediately and must not report failure back to the caller.
pub trait BookingNotifier: Send + Sync {
    fn booking_committed(&self, view: BookingView);
}


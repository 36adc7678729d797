pub mod booking;
pub mod inventory;
pub mod notifier;
pub mod payment;
pub mod repository;

pub use booking::{Booking, BookingStatus, BookingView, CustomerDetails, NewBooking, StayDates};
pub use inventory::{Branch, BranchId, Price, Room, RoomId, RoomType};
pub use notifier::BookingNotifier;
pub use repository::{BookingRepository, CatalogRepository, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No nightly rate configured for room type {0}")]
    PriceNotFound(RoomType),
    #[error("{0}")]
    Conflict(String),
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Signature verification failed: {0}")]
    AuthVerificationFailed(String),
    #[error("External dependency failed: {0}")]
    ExternalDependencyFailed(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Internal service error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

pub mod models;
pub mod pii;

pub use models::events::{BookingConfirmedEvent, DeliveryChannel, DeliveryFailure};
pub use pii::Masked;

pub mod engine;
pub mod orchestrator;
pub mod quote;
pub mod retention;

pub use engine::{Confirmation, DirectBookingRequest, PrepareRequest, ReservationEngine, RoomTarget};
pub use orchestrator::{CheckoutStarted, EventOutcome, MockPaymentGateway, PaymentOrchestrator};
pub use quote::Quote;
pub use retention::{RetentionSweeper, SweeperHandle};

pub mod availability;
pub mod pricing;

pub use availability::{Availability, AvailabilityChecker};
pub use pricing::{CheckoutTotal, PricingConfig, PricingEngine};

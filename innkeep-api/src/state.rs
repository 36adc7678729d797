use innkeep_notify::ReceiptRenderer;
use innkeep_reservation::{PaymentOrchestrator, ReservationEngine};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    pub payments: Arc<PaymentOrchestrator>,
    pub receipts: Arc<dyn ReceiptRenderer>,
    pub hotel_name: String,
}

use async_trait::async_trait;
use innkeep_catalog::CheckoutTotal;
use innkeep_core::payment::{
    verify_signature, CheckoutRequest, CheckoutSession, PaymentEvent, PaymentGateway,
    SessionMetadata, CHECKOUT_SESSION_COMPLETED,
};
use innkeep_core::{CoreError, CoreResult};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{Confirmation, PrepareRequest, ReservationEngine};
use crate::quote::Quote;

/// A quote that now has a gateway session waiting for payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStarted {
    pub quote: Quote,
    pub session: CheckoutSession,
    pub total: CheckoutTotal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Confirmed(Confirmation),
    /// Verified but not an event we act on.
    Ignored { event_type: String },
}

/// Couples the reservation engine to a hosted-checkout gateway.
///
/// Nothing is written when a session is opened. The booking is created only
/// from a verified completion event.
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    engine: Arc<ReservationEngine>,
    webhook_secret: String,
    tolerance_secs: i64,
}

impl PaymentOrchestrator {
    /// Fails on a blank webhook secret.
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        engine: Arc<ReservationEngine>,
        webhook_secret: impl Into<String>,
        tolerance_secs: i64,
    ) -> CoreResult<Self> {
        let webhook_secret = webhook_secret.into();
        if webhook_secret.trim().is_empty() {
            return Err(CoreError::ValidationFailed("Webhook secret must not be empty".to_string()));
        }
        Ok(Self {
            gateway,
            engine,
            webhook_secret,
            tolerance_secs,
        })
    }

    pub async fn start_checkout(&self, request: PrepareRequest) -> CoreResult<CheckoutStarted> {
        let quote = self.engine.prepare(request).await?;
        let pricing = self.engine.pricing();
        let total = pricing.checkout_total(quote.price_minor);

        let session = self
            .gateway
            .create_checkout_session(&CheckoutRequest {
                product_name: quote.product_name(),
                amount_minor: total.total_minor,
                currency: pricing.config().currency.clone(),
                metadata: quote.session_metadata(),
            })
            .await?;

        info!(
            session_id = %session.id,
            room_id = %quote.room.id,
            amount_minor = total.total_minor,
            "checkout session opened"
        );
        Ok(CheckoutStarted { quote, session, total })
    }

    /// Verifies and applies one gateway callback.
    ///
    /// `now` is unix seconds, used for the signature tolerance window.
    pub async fn handle_event(
        &self,
        payload: &[u8],
        signature: &str,
        now: i64,
    ) -> CoreResult<EventOutcome> {
        verify_signature(payload, signature, &self.webhook_secret, self.tolerance_secs, now)
            .inspect_err(|e| warn!(error = %e, "payment event signature rejected"))?;

        let event = PaymentEvent::parse(payload)?;
        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            debug!(event_id = %event.id, event_type = %event.event_type, "payment event ignored");
            return Ok(EventOutcome::Ignored { event_type: event.event_type });
        }

        let session = event.data.object;
        let metadata = session
            .metadata
            .as_ref()
            .ok_or_else(|| CoreError::ValidationFailed("Payment session has no metadata".to_string()))
            .and_then(SessionMetadata::from_map)?;

        let confirmation = self.engine.confirm(&session.id, metadata).await?;
        Ok(EventOutcome::Confirmed(confirmation))
    }
}

/// In-process gateway that accepts every session. Used for local runs and tests.
#[derive(Default)]
pub struct MockPaymentGateway {
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> CoreResult<CheckoutSession> {
        let id = format!("cs_mock_{}", Uuid::new_v4().simple());
        self.requests
            .lock()
            .map_err(|_| CoreError::Internal("mock gateway lock poisoned".to_string()))?
            .push(request.clone());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.invalid/{}", id)),
            id,
        })
    }
}

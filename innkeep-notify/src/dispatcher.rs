use chrono::Utc;
use innkeep_core::{BookingNotifier, BookingView};
use innkeep_shared::{DeliveryChannel, DeliveryFailure};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::email::{Attachment, EmailMessage, Mailer};
use crate::receipt::ReceiptRenderer;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::webhook::WebhookPublisher;

/// Terminal handler for deliveries that ran out of retries.
pub trait FailureSink: Send + Sync {
    fn record(&self, failure: DeliveryFailure);
}

pub struct LogFailureSink;

impl FailureSink for LogFailureSink {
    fn record(&self, failure: DeliveryFailure) {
        error!(
            channel = %failure.channel,
            booking_ref = %failure.booking_ref,
            attempts = failure.attempts,
            last_error = %failure.last_error,
            "notification delivery abandoned"
        );
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub hotel_name: String,
    pub email_from: String,
    pub currency: String,
}

struct Channels {
    renderer: Arc<dyn ReceiptRenderer>,
    mailer: Arc<dyn Mailer>,
    webhook: Option<Arc<dyn WebhookPublisher>>,
    sink: Arc<dyn FailureSink>,
    policy: RetryPolicy,
    settings: DispatchSettings,
}

/// Runs the receipt email and the outbound webhook for committed bookings.
///
/// Each channel retries on its own and hands exhausted deliveries to the
/// [`FailureSink`]. Nothing is reported back to the booking path.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channels: Arc<Channels>,
}

impl NotificationDispatcher {
    pub fn new(
        renderer: Arc<dyn ReceiptRenderer>,
        mailer: Arc<dyn Mailer>,
        webhook: Option<Arc<dyn WebhookPublisher>>,
        sink: Arc<dyn FailureSink>,
        policy: RetryPolicy,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            channels: Arc::new(Channels {
                renderer,
                mailer,
                webhook,
                sink,
                policy,
                settings,
            }),
        }
    }

    /// Delivers on both channels and waits for them to finish or give up.
    pub async fn deliver(&self, view: BookingView) {
        tokio::join!(self.deliver_receipt(&view), self.deliver_webhook(&view));
    }

    async fn deliver_receipt(&self, view: &BookingView) {
        let ch = &self.channels;
        let booking_ref = view.booking.booking_ref.clone();

        let receipt = match ch.renderer.render(view, &ch.settings.hotel_name) {
            Ok(receipt) => receipt,
            Err(e) => {
                self.give_up(DeliveryChannel::ReceiptEmail, &booking_ref, 1, e.to_string());
                return;
            }
        };

        let message = EmailMessage {
            from: ch.settings.email_from.clone(),
            to: view.booking.customer.email.clone(),
            subject: format!("Your {} Booking Confirmation", ch.settings.hotel_name),
            html_body: confirmation_body(view),
            attachment: Some(Attachment {
                filename: format!("booking_receipt.{}", receipt.extension),
                content_type: receipt.content_type.to_string(),
                bytes: receipt.bytes,
            }),
        };

        match retry_with_backoff(&ch.policy, || ch.mailer.send(&message)).await {
            Ok(()) => info!(booking_ref = %booking_ref, "receipt email sent"),
            Err(exhausted) => self.give_up(
                DeliveryChannel::ReceiptEmail,
                &booking_ref,
                exhausted.attempts,
                exhausted.last_error.to_string(),
            ),
        }
    }

    async fn deliver_webhook(&self, view: &BookingView) {
        let ch = &self.channels;
        let Some(publisher) = ch.webhook.as_ref() else {
            debug!(booking_ref = %view.booking.booking_ref, "no webhook endpoint configured, skipping");
            return;
        };

        let event = view.to_event(&ch.settings.currency);
        match retry_with_backoff(&ch.policy, || publisher.publish(&event)).await {
            Ok(()) => info!(booking_ref = %event.booking_id, "booking webhook delivered"),
            Err(exhausted) => self.give_up(
                DeliveryChannel::Webhook,
                &event.booking_id,
                exhausted.attempts,
                exhausted.last_error.to_string(),
            ),
        }
    }

    fn give_up(&self, channel: DeliveryChannel, booking_ref: &str, attempts: u32, last_error: String) {
        self.channels.sink.record(DeliveryFailure {
            channel,
            booking_ref: booking_ref.to_string(),
            attempts,
            last_error,
            failed_at: Utc::now(),
        });
    }
}

impl BookingNotifier for NotificationDispatcher {
    fn booking_committed(&self, view: BookingView) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let dispatcher = self.clone();
                handle.spawn(async move { dispatcher.deliver(view).await });
            }
            Err(_) => warn!(
                booking_ref = %view.booking.booking_ref,
                "no async runtime, notifications skipped"
            ),
        }
    }
}

fn confirmation_body(view: &BookingView) -> String {
    let b = &view.booking;
    format!(
        "<h2>Booking Confirmed</h2>\
         <p>Dear {},</p>\
         <p>Thank you for your booking. Your receipt is attached.</p>\
         <ul>\
         <li><b>Booking ID:</b> {}</li>\
         <li><b>Room:</b> {} ({})</li>\
         <li><b>Branch:</b> {}</li>\
         <li><b>Check-in:</b> {}</li>\
         <li><b>Check-out:</b> {}</li>\
         </ul>",
        b.customer.name,
        b.booking_ref,
        view.room.number,
        view.room.room_type,
        view.branch.name,
        b.stay.check_in(),
        b.stay.check_out(),
    )
}

use async_trait::async_trait;
use innkeep_shared::BookingConfirmedEvent;
use std::time::Duration;
use tracing::debug;

use crate::NotifyError;

#[async_trait]
pub trait WebhookPublisher: Send + Sync {
    async fn publish(&self, event: &BookingConfirmedEvent) -> Result<(), NotifyError>;
}

/// POSTs the booking JSON to a configured endpoint. Any non-2xx is a failure.
pub struct HttpWebhookPublisher {
    client: reqwest::Client,
    url: String,
}

impl HttpWebhookPublisher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self { client, url: url.into() })
    }

    /// `None` when no endpoint is configured; the channel is then skipped.
    pub fn from_config(url: Option<&str>, timeout: Duration) -> Result<Option<Self>, NotifyError> {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Self::new(url, timeout).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WebhookPublisher for HttpWebhookPublisher {
    async fn publish(&self, event: &BookingConfirmedEvent) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        debug!(booking_ref = %event.booking_id, "webhook delivered");
        Ok(())
    }
}

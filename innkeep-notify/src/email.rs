use async_trait::async_trait;
use innkeep_shared::Masked;
use tracing::info;

use crate::NotifyError;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: Masked<String>,
    pub subject: String,
    pub html_body: String,
    pub attachment: Option<Attachment>,
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Writes each message to the log instead of a mail server.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            attachment = message.attachment.as_ref().map(|a| a.filename.as_str()),
            "email accepted for delivery"
        );
        Ok(())
    }
}

pub mod dispatcher;
pub mod email;
pub mod receipt;
pub mod retry;
pub mod webhook;

pub use dispatcher::{DispatchSettings, FailureSink, LogFailureSink, NotificationDispatcher};
pub use email::{Attachment, EmailMessage, LogMailer, Mailer};
pub use receipt::{ReceiptRenderer, RenderedReceipt, TextReceiptRenderer};
pub use retry::{retry_with_backoff, RetryExhausted, RetryPolicy};
pub use webhook::{HttpWebhookPublisher, WebhookPublisher};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("endpoint rejected delivery with status {0}")]
    Rejected(u16),
    #[error("receipt rendering failed: {0}")]
    Render(String),
}

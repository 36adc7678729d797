use innkeep_core::BookingView;

use crate::NotifyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReceipt {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
}

/// Turns a booking into a downloadable document.
pub trait ReceiptRenderer: Send + Sync {
    fn render(&self, view: &BookingView, hotel_name: &str) -> Result<RenderedReceipt, NotifyError>;
}

/// Plain-text receipt, one field per line.
pub struct TextReceiptRenderer {
    currency: String,
}

fn money(minor: i64, currency: &str) -> String {
    format!("{} {}.{:02}", currency.to_uppercase(), minor / 100, (minor % 100).abs())
}

impl TextReceiptRenderer {
    pub fn new(currency: impl Into<String>) -> Self {
        Self { currency: currency.into() }
    }

    fn render_text(view: &BookingView, hotel_name: &str, currency: &str) -> String {
        let b = &view.booking;
        let mut out = String::new();
        out.push_str(&format!("{} - Booking Receipt\n", hotel_name));
        out.push_str(&"=".repeat(40));
        out.push('\n');
        out.push_str(&format!("Booking ID:    {}\n", b.booking_ref));
        out.push_str(&format!("Guest:         {}\n", b.customer.name));
        out.push_str(&format!("Email:         {}\n", b.customer.email.expose()));
        out.push_str(&format!("Phone:         {}\n", b.customer.phone.expose()));
        out.push_str(&format!("Branch:        {} ({})\n", view.branch.name, view.branch.state));
        out.push_str(&format!("Room:          {} ({})\n", view.room.number, view.room.room_type));
        out.push_str(&format!("Check-in:      {}\n", b.stay.check_in()));
        out.push_str(&format!("Check-out:     {}\n", b.stay.check_out()));
        out.push_str(&format!("Nights:        {}\n", b.stay.nights()));
        out.push_str(&format!("Price:         {}\n", money(b.price_minor, currency)));
        if b.discount_minor != 0 {
            out.push_str(&format!("Discount:      {}\n", money(b.discount_minor, currency)));
        }
        out.push_str(&format!("Status:        {}\n", b.status));
        out.push_str(&format!("Booked on:     {} {}\n", b.created_on, b.booking_time));
        out
    }
}

impl ReceiptRenderer for TextReceiptRenderer {
    fn render(&self, view: &BookingView, hotel_name: &str) -> Result<RenderedReceipt, NotifyError> {
        Ok(RenderedReceipt {
            bytes: Self::render_text(view, hotel_name, &self.currency).into_bytes(),
            content_type: "text/plain; charset=utf-8",
            extension: "txt",
        })
    }
}

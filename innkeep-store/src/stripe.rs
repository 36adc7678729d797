use async_trait::async_trait;
use innkeep_core::payment::{CheckoutRequest, CheckoutSession, PaymentGateway};
use innkeep_core::{CoreError, CoreResult};
use std::time::Duration;
use tracing::{error, info};

use crate::app_config::PaymentConfig;

/// Hosted checkout sessions through the Stripe REST API.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
    success_url: String,
    cancel_url: String,
}

impl StripeGateway {
    pub fn new(config: &PaymentConfig) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CoreError::Internal(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        })
    }
}

fn checkout_form(request: &CheckoutRequest, success_url: &str, cancel_url: &str) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
        ("customer_email".to_string(), request.metadata.email.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("line_items[0][price_data][currency]".to_string(), request.currency.clone()),
        ("line_items[0][price_data][unit_amount]".to_string(), request.amount_minor.to_string()),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
        ("metadata[productName]".to_string(), request.product_name.clone()),
    ];
    for (key, value) in request.metadata.to_map() {
        form.push((format!("metadata[{}]", key), value));
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> CoreResult<CheckoutSession> {
        let form = checkout_form(request, &self.success_url, &self.cancel_url);

        let resp: serde_json::Value = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| CoreError::ExternalDependencyFailed(format!("payment gateway: {}", e)))?
            .json()
            .await
            .map_err(|e| CoreError::ExternalDependencyFailed(format!("payment gateway: {}", e)))?;

        match resp["id"].as_str() {
            Some(id) => {
                info!(session_id = id, amount = request.amount_minor, "checkout session created");
                Ok(CheckoutSession {
                    id: id.to_string(),
                    url: resp["url"].as_str().map(String::from),
                })
            }
            None => {
                error!("checkout session creation failed: {}", resp["error"]);
                Err(CoreError::ExternalDependencyFailed(
                    "payment gateway rejected checkout session".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use innkeep_core::payment::SessionMetadata;
    use innkeep_core::RoomId;

    #[test]
    fn test_checkout_form_carries_amount_and_metadata() {
        let request = CheckoutRequest {
            product_name: "DELUXE room 204".to_string(),
            amount_minor: 379_000,
            currency: "inr".to_string(),
            metadata: SessionMetadata {
                customer_name: "Asha Rao".to_string(),
                phone_number: "9876543210".to_string(),
                email: "asha@example.com".to_string(),
                room_id: RoomId(7),
                check_in: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                check_out: NaiveDate::from_ymd_opt(2024, 2, 4).unwrap(),
                booking_time: None,
            },
        };

        let form = checkout_form(&request, "https://ok", "https://cancel");
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("379000"));
        assert_eq!(get("metadata[roomId]"), Some("7"));
        assert_eq!(get("metadata[checkOutDate]"), Some("2024-02-04"));
        assert_eq!(get("metadata[bookingTime]"), None);
    }
}

use innkeep_core::{CatalogRepository, CoreError, CoreResult, Price, RoomType, StayDates};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Checkout surcharges applied on top of the room price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Fraction of the base price, e.g. 0.18
    pub tax_rate: f64,

    /// Flat fee per checkout, minor units
    pub service_fee_minor: i64,

    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: 0.18,
            service_fee_minor: 25_000,
            currency: "inr".to_string(),
        }
    }
}

/// Breakdown of the amount requested from the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTotal {
    pub base_minor: i64,
    pub tax_minor: i64,
    pub service_fee_minor: i64,
    pub total_minor: i64,
}

/// Nightly-rate pricing backed by the rate table.
pub struct PricingEngine {
    catalog: Arc<dyn CatalogRepository>,
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(catalog: Arc<dyn CatalogRepository>, config: PricingConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub async fn nightly_rate(&self, room_type: RoomType) -> CoreResult<Price> {
        self.catalog
            .price_for(room_type)
            .await?
            .ok_or(CoreError::PriceNotFound(room_type))
    }

    /// Rate × nights for the stay.
    pub async fn stay_price(&self, room_type: RoomType, stay: &StayDates) -> CoreResult<i64> {
        let rate = self.nightly_rate(room_type).await?;
        rate.nightly_rate_minor
            .checked_mul(stay.nights())
            .ok_or_else(|| CoreError::ValidationFailed("Stay price overflows".to_string()))
    }

    pub fn checkout_total(&self, base_minor: i64) -> CheckoutTotal {
        let tax_minor = (base_minor as f64 * self.config.tax_rate).round() as i64;
        CheckoutTotal {
            base_minor,
            tax_minor,
            service_fee_minor: self.config.service_fee_minor,
            total_minor: base_minor + tax_minor + self.config.service_fee_minor,
        }
    }

    pub async fn prices(&self) -> CoreResult<Vec<Price>> {
        Ok(self.catalog.prices().await?)
    }
}

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::{BTreeMap, HashMap};

use crate::inventory::RoomId;
use crate::{CoreError, CoreResult};

/// Event type the gateway sends once the guest has paid.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

const KEY_CUSTOMER_NAME: &str = "customerName";
const KEY_PHONE: &str = "phoneNumber";
const KEY_EMAIL: &str = "email";
const KEY_ROOM_ID: &str = "roomId";
const KEY_CHECK_IN: &str = "checkInDate";
const KEY_CHECK_OUT: &str = "checkOutDate";
const KEY_BOOKING_TIME: &str = "bookingTime";

/// Booking fields carried through the payment gateway as opaque metadata and
/// replayed verbatim on the completion event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub customer_name: String,
    pub phone_number: String,
    pub email: String,
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub booking_time: Option<NaiveTime>,
}

impl SessionMetadata {
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(KEY_CUSTOMER_NAME.to_string(), self.customer_name.clone());
        map.insert(KEY_PHONE.to_string(), self.phone_number.clone());
        map.insert(KEY_EMAIL.to_string(), self.email.clone());
        map.insert(KEY_ROOM_ID.to_string(), self.room_id.to_string());
        map.insert(KEY_CHECK_IN.to_string(), self.check_in.to_string());
        map.insert(KEY_CHECK_OUT.to_string(), self.check_out.to_string());
        if let Some(time) = self.booking_time {
            map.insert(KEY_BOOKING_TIME.to_string(), time.format("%H:%M:%S").to_string());
        }
        map
    }

    pub fn from_map(map: &HashMap<String, String>) -> CoreResult<Self> {
        let field = |key: &str| {
            map.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CoreError::ValidationFailed(format!("Missing metadata field {}", key)))
        };
        let date = |key: &str| -> CoreResult<NaiveDate> {
            field(key)?
                .parse()
                .map_err(|_| CoreError::ValidationFailed(format!("Invalid date in {}", key)))
        };

        let room_id = field(KEY_ROOM_ID)?
            .parse::<i64>()
            .map(RoomId)
            .map_err(|_| CoreError::ValidationFailed("Invalid roomId".to_string()))?;

        let booking_time = match map.get(KEY_BOOKING_TIME).map(|v| v.trim()) {
            None | Some("") => None,
            Some(raw) => Some(
                NaiveTime::parse_from_str(raw, "%H:%M:%S")
                    .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
                    .map_err(|_| CoreError::ValidationFailed("Invalid bookingTime".to_string()))?,
            ),
        };

        Ok(Self {
            customer_name: field(KEY_CUSTOMER_NAME)?.to_string(),
            phone_number: field(KEY_PHONE)?.to_string(),
            email: field(KEY_EMAIL)?.to_string(),
            room_id,
            check_in: date(KEY_CHECK_IN)?,
            check_out: date(KEY_CHECK_OUT)?,
            booking_time,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub product_name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub metadata: SessionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout session carrying the request metadata.
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> CoreResult<CheckoutSession>;
}

/// Inbound gateway event, reduced to the fields the engine reads.
#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEventData {
    pub object: SessionObject,
}

#[derive(Debug, Deserialize)]
pub struct SessionObject {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl PaymentEvent {
    pub fn parse(payload: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| CoreError::ValidationFailed(format!("Malformed payment event: {}", e)))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid signature header")]
    MalformedHeader,
    #[error("Invalid signature hex")]
    InvalidHex,
    #[error("Signature mismatch")]
    Mismatch,
    #[error("Signature timestamp outside tolerance")]
    Expired,
    #[error("Invalid signing key")]
    InvalidKey,
}

impl From<SignatureError> for CoreError {
    fn from(err: SignatureError) -> Self {
        CoreError::AuthVerificationFailed(err.to_string())
    }
}

fn signature_mac(
    secret: &str,
    timestamp: &str,
    payload: &[u8],
) -> Result<Hmac<Sha256>, SignatureError> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Checks a `t=<unix>,v1=<hex>` header against `payload`.
///
/// The signed message is `"{t}.{payload}"`, HMAC-SHA256 keyed with the shared
/// secret. Any `v1` entry may match. Timestamps further than `tolerance_secs` from
/// `now` are rejected after the MAC check.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    let ts: i64 = timestamp.parse().map_err(|_| SignatureError::MalformedHeader)?;

    let mut matched = false;
    for candidate in signatures {
        let bytes = hex::decode(candidate).map_err(|_| SignatureError::InvalidHex)?;
        if signature_mac(secret, timestamp, payload)?.verify_slice(&bytes).is_ok() {
            matched = true;
            break;
        }
    }
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if (now - ts).abs() > tolerance_secs {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

/// Builds the header a gateway would send for `payload` at `timestamp`.
pub fn signature_header(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, SignatureError> {
    let ts = timestamp.to_string();
    let digest = signature_mac(secret, &ts, payload)?.finalize().into_bytes();
    Ok(format!("t={},v1={}", ts, hex::encode(digest)))
}

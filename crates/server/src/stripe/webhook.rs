//! Stripe webhook verification and event parsing.
//!
//! The `Stripe-Signature` header looks like `t=1700000000,v1=<hex>[,v1=...]`.
//! The signed payload is `"{t}.{raw body}"` under HMAC-SHA256 with the
//! endpoint's signing secret.

use hmac::{Hmac, Mac};
use propscribe_core::{BillingEvent, UserId};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

/// Maximum age (either direction) of a signed timestamp, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// Reasons a webhook request is rejected before any state is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("signature timestamp outside tolerance")]
    TimestampOutOfTolerance,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("malformed event payload: {0}")]
    MalformedPayload(String),
}

/// Verify a webhook signature against the raw request body.
///
/// `now` is the current unix time in seconds.
///
/// # Errors
///
/// Returns an error if the header is malformed, the timestamp is outside
/// [`SIGNATURE_TOLERANCE_SECS`], or no `v1` signature matches.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::MalformedHeader)?;

    // The header is unauthenticated at this point; `abs_diff` cannot overflow.
    if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::TimestampOutOfTolerance);
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::SignatureMismatch)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        tracing::debug!("Stripe signature verified");
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// A parsed event with the provider's event id, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    pub id: String,
    pub event: BillingEvent,
}

/// Parse a verified payload into a [`BillingEvent`].
///
/// Unknown event types, and known types missing the fields needed to act on
/// them, become [`BillingEvent::Ignored`].
///
/// # Errors
///
/// Returns [`WebhookError::MalformedPayload`] if the body is not a Stripe
/// event envelope.
pub fn parse_event(payload: &[u8]) -> Result<ParsedEvent, WebhookError> {
    let raw: RawEvent =
        serde_json::from_slice(payload).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    let object = &raw.data.object;
    let event = match raw.event_type.as_str() {
        "checkout.session.completed" => checkout_completed(object),
        "customer.subscription.updated" => str_field(object, "customer").and_then(|customer| {
            str_field(object, "status").map(|status| BillingEvent::SubscriptionUpdated {
                customer_id: customer.to_owned(),
                provider_status: status.to_owned(),
            })
        }),
        "customer.subscription.deleted" => {
            str_field(object, "customer").map(|customer| BillingEvent::SubscriptionDeleted {
                customer_id: customer.to_owned(),
            })
        }
        other => Some(BillingEvent::Ignored {
            event_type: other.to_owned(),
        }),
    };

    let event = event.unwrap_or_else(|| {
        tracing::warn!(
            event_id = %raw.id,
            event_type = %raw.event_type,
            "Webhook event is missing required fields, acknowledging without changes"
        );
        BillingEvent::Ignored {
            event_type: raw.event_type.clone(),
        }
    });

    Ok(ParsedEvent { id: raw.id, event })
}

fn checkout_completed(object: &serde_json::Value) -> Option<BillingEvent> {
    let user = object
        .get("metadata")
        .and_then(|m| str_field(m, "supabaseUserId"))
        .or_else(|| str_field(object, "client_reference_id"))?;
    let user_id = UserId::parse(user).ok()?;
    let customer_id = str_field(object, "customer")?.to_owned();

    Some(BillingEvent::CheckoutCompleted {
        user_id,
        customer_id,
    })
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

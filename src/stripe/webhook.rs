use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::stripe::{StripeCheckoutSession, StripeInvoice, StripeSubscription};

/// Largest accepted distance, in seconds, between the signed timestamp and now.
pub const SIGNATURE_TOLERANCE: i64 = 300;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("The Stripe-Signature header is malformed.")]
    MalformedHeader,
    #[error("No signature in the header matches the payload.")]
    NoMatch,
    #[error("The signature timestamp is outside the tolerance window.")]
    TimestampOutOfTolerance,
}

/// Hex-encoded HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(payload: &str, timestamp: i64, secret: &str) -> String {
    hex::encode(digest(payload, timestamp, secret))
}

/// Check a `t=<timestamp>,v1=<signature>[,v1=...]` header against `payload`.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader)?,
                )
            }
            Some(("v1", value)) => signatures.push(value),
            Some(_) => {}
            None => return Err(SignatureError::MalformedHeader),
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let expected = digest(payload, timestamp, secret);

    let matched = signatures
        .into_iter()
        .filter_map(|signature| hex::decode(signature).ok())
        .any(|signature| bool::from(signature.as_slice().ct_eq(expected.as_slice())));
    if !matched {
        return Err(SignatureError::NoMatch);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE {
        return Err(SignatureError::TimestampOutOfTolerance);
    }
    Ok(())
}

fn digest(payload: &str, timestamp: i64, secret: &str) -> Vec<u8> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The event payload, decoded for the event types the service reacts to.
#[derive(Debug)]
pub enum EventObject {
    CheckoutSessionCompleted(StripeCheckoutSession),
    SubscriptionCreated(StripeSubscription),
    SubscriptionUpdated(StripeSubscription),
    SubscriptionDeleted(StripeSubscription),
    InvoicePaymentSucceeded(StripeInvoice),
    InvoicePaymentFailed(StripeInvoice),
    Other,
}

impl WebhookEvent {
    pub fn parse(payload: &str) -> Result<WebhookEvent, serde_json::Error> {
        serde_json::from_str(payload)
    }

    pub fn object(&self) -> Result<EventObject, serde_json::Error> {
        let object = self.data.object.clone();
        Ok(match self.kind.as_str() {
            "checkout.session.completed" => {
                EventObject::CheckoutSessionCompleted(serde_json::from_value(object)?)
            }
            "customer.subscription.created" => {
                EventObject::SubscriptionCreated(serde_json::from_value(object)?)
            }
            "customer.subscription.updated" => {
                EventObject::SubscriptionUpdated(serde_json::from_value(object)?)
            }
            "customer.subscription.deleted" => {
                EventObject::SubscriptionDeleted(serde_json::from_value(object)?)
            }
            "invoice.payment_succeeded" => {
                EventObject::InvoicePaymentSucceeded(serde_json::from_value(object)?)
            }
            "invoice.payment_failed" => {
                EventObject::InvoicePaymentFailed(serde_json::from_value(object)?)
            }
            _ => EventObject::Other,
        })
    }
}

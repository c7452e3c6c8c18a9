// handler/webhook.rs
use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{error::HttpError, utils::currency::cents_to_dollars, AppState};

/// Accepted clock skew between the signature timestamp and our clock, to
/// bound replay of captured payloads.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub fn webhook_handler() -> Router {
    Router::new().route("/stripe", post(stripe_webhook))
}

// Stripe Webhook Handler. The raw body is verified against the signature
// header before anything is parsed; a bad signature aborts the whole event
// with no side effect.
pub async fn stripe_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            HttpError::new(
                "Missing or invalid Stripe signature".to_string(),
                StatusCode::BAD_REQUEST,
            )
        })?;

    let webhook_secret: &String = &app_state.env.stripe_webhook_secret;

    if !verify_stripe_signature(&body, signature, webhook_secret) {
        tracing::warn!("Invalid Stripe webhook signature received");
        return Err(HttpError::new(
            "Invalid webhook signature".to_string(),
            StatusCode::UNAUTHORIZED,
        ));
    }

    let event: Value = serde_json::from_str(&body)
        .map_err(|_| HttpError::bad_request("Malformed webhook payload"))?;

    let event_type = event["type"].as_str().ok_or_else(|| {
        HttpError::new(
            "Missing event type in webhook payload".to_string(),
            StatusCode::BAD_REQUEST,
        )
    })?;

    let object = &event["data"]["object"];

    match event_type {
        "payment_intent.succeeded" => {
            process_payment_intent_succeeded(&app_state, object).await?;
        }
        "payment_intent.payment_failed" => {
            process_payment_intent_failed(&app_state, object).await?;
        }
        "transfer.created" => {
            process_transfer_created(&app_state, object).await?;
        }
        "charge.refunded" => {
            process_charge_refunded(&app_state, object).await?;
        }
        "account.updated" => {
            process_account_updated(&app_state, object).await?;
        }
        _ => {
            tracing::info!("Unhandled Stripe webhook event: {}", event_type);
        }
    }

    Ok(Json(serde_json::json!({"received": true})))
}

/// Verify the `t=<ts>,v1=<hmac>` signature header over `"{t}.{payload}"`.
fn verify_stripe_signature(payload: &str, header: &str, secret: &str) -> bool {
    verify_stripe_signature_at(payload, header, secret, Utc::now().timestamp())
}

fn verify_stripe_signature_at(payload: &str, header: &str, secret: &str, now: i64) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = match timestamp {
        Some(timestamp) => timestamp,
        None => return false,
    };

    if signatures.is_empty() {
        return false;
    }

    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    let signed_payload = format!("{}.{}", timestamp, payload);

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());

    let expected_signature = mac.finalize().into_bytes();
    let expected_signature_hex = hex::encode(expected_signature);

    // Compare signatures in constant time to prevent timing attacks
    signatures.iter().any(|signature| {
        ConstantTimeEq::ct_eq(
            signature.as_bytes(),
            expected_signature_hex.as_bytes(),
        )
        .into()
    })
}

fn metadata_uuid(object: &Value, key: &str) -> Option<Uuid> {
    object["metadata"][key]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
}

async fn process_payment_intent_succeeded(
    app_state: &Arc<AppState>,
    object: &Value,
) -> Result<(), HttpError> {
    let intent_id = object["id"]
        .as_str()
        .ok_or_else(|| HttpError::bad_request("Missing payment intent id in webhook data"))?;

    let amount_cents = object["amount_received"]
        .as_i64()
        .or_else(|| object["amount"].as_i64())
        .ok_or_else(|| HttpError::bad_request("Missing amount in webhook data"))?;

    let amount = cents_to_dollars(amount_cents);

    let contract_id = metadata_uuid(object, "contract_id").ok_or_else(|| {
        tracing::warn!("Payment intent {} has no contract correlation", intent_id);
        HttpError::bad_request("Missing contract_id in event metadata")
    })?;

    match metadata_uuid(object, "milestone_id") {
        Some(milestone_id) => {
            app_state
                .escrow_service
                .apply_milestone_payment_succeeded(milestone_id, amount, intent_id)
                .await?;
        }
        None => {
            app_state
                .escrow_service
                .apply_deposit_succeeded(contract_id, amount, intent_id)
                .await?;
        }
    }

    tracing::info!(
        "Processed payment_intent.succeeded {} for contract {}",
        intent_id,
        contract_id
    );

    Ok(())
}

async fn process_payment_intent_failed(
    app_state: &Arc<AppState>,
    object: &Value,
) -> Result<(), HttpError> {
    let intent_id = object["id"]
        .as_str()
        .ok_or_else(|| HttpError::bad_request("Missing payment intent id in webhook data"))?;

    let contract_id = metadata_uuid(object, "contract_id");

    app_state
        .escrow_service
        .apply_payment_failed(intent_id, contract_id)
        .await?;

    Ok(())
}

async fn process_transfer_created(
    app_state: &Arc<AppState>,
    object: &Value,
) -> Result<(), HttpError> {
    let transfer_id = object["id"]
        .as_str()
        .ok_or_else(|| HttpError::bad_request("Missing transfer id in webhook data"))?;

    let milestone_id = metadata_uuid(object, "milestone_id");

    app_state
        .escrow_service
        .apply_transfer_created(transfer_id, milestone_id)
        .await?;

    Ok(())
}

async fn process_charge_refunded(
    app_state: &Arc<AppState>,
    object: &Value,
) -> Result<(), HttpError> {
    let charge_id = object["id"]
        .as_str()
        .ok_or_else(|| HttpError::bad_request("Missing charge id in webhook data"))?;

    let payment_intent_id = object["payment_intent"]
        .as_str()
        .ok_or_else(|| HttpError::bad_request("Missing payment intent in refund data"))?;

    let amount_cents = object["amount_refunded"]
        .as_i64()
        .ok_or_else(|| HttpError::bad_request("Missing refunded amount in webhook data"))?;

    app_state
        .escrow_service
        .apply_charge_refunded(charge_id, payment_intent_id, cents_to_dollars(amount_cents))
        .await?;

    Ok(())
}

async fn process_account_updated(
    app_state: &Arc<AppState>,
    object: &Value,
) -> Result<(), HttpError> {
    let account_id = object["id"]
        .as_str()
        .ok_or_else(|| HttpError::bad_request("Missing account id in webhook data"))?;

    let charges_enabled = object["charges_enabled"].as_bool().unwrap_or(false);
    let payouts_enabled = object["payouts_enabled"].as_bool().unwrap_or(false);

    app_state
        .escrow_service
        .apply_account_updated(account_id, charges_enabled, payouts_enabled)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &str, timestamp: i64, secret: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = r#"{"type":"transfer.created"}"#;
        let header = sign(payload, 1_700_000_000, "whsec_test");
        assert!(verify_stripe_signature_at(
            payload,
            &header,
            "whsec_test",
            1_700_000_000
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = r#"{"type":"transfer.created"}"#;
        let header = sign(payload, 1_700_000_000, "whsec_other");
        assert!(!verify_stripe_signature_at(
            payload,
            &header,
            "whsec_test",
            1_700_000_000
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = r#"{"type":"transfer.created"}"#;
        let header = sign(payload, 1_700_000_000, "whsec_test");
        assert!(!verify_stripe_signature_at(
            r#"{"type":"charge.refunded"}"#,
            &header,
            "whsec_test",
            1_700_000_000
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = r#"{"type":"transfer.created"}"#;
        let header = sign(payload, 1_700_000_000, "whsec_test");
        assert!(!verify_stripe_signature_at(
            payload,
            &header,
            "whsec_test",
            1_700_000_000 + SIGNATURE_TOLERANCE_SECS + 1
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let payload = r#"{}"#;
        assert!(!verify_stripe_signature_at(payload, "", "whsec_test", 0));
        assert!(!verify_stripe_signature_at(payload, "t=notanumber,v1=aa", "whsec_test", 0));
        assert!(!verify_stripe_signature_at(payload, "t=100", "whsec_test", 100));
    }
}

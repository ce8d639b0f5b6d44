//! Keyed-hash fingerprints over ordered callback fields.
//!
//! Every gateway adapter signs outbound request fields and verifies the
//! fingerprint on inbound callbacks with the tenant's shared secret. A
//! mismatch is fatal for that callback and never retried.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use merx_core::{Error, Result};
use sha2::Sha256;

use crate::status::{PaymentState, PaymentStatus};

type HmacSha256 = Hmac<Sha256>;

/// Field order of the callback fingerprint. Order is part of the contract;
/// both sides must agree on it.
pub const CALLBACK_FIELDS: [&str; 3] = ["reference", "transaction_id", "state"];

fn mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| Error::Configuration("invalid fingerprint secret".to_string()))
}

/// HMAC-SHA256 over the given values in order, hex encoded.
pub fn sign(secret: &str, values: &[&str]) -> Result<String> {
    let mut mac = mac(secret)?;
    for value in values {
        mac.update(value.as_bytes());
        mac.update(b"|");
    }
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time verification of a hex fingerprint.
pub fn verify(secret: &str, values: &[&str], fingerprint: &str) -> Result<()> {
    let expected =
        hex::decode(fingerprint).map_err(|_| Error::Verification("malformed fingerprint".to_string()))?;
    let mut mac = mac(secret)?;
    for value in values {
        mac.update(value.as_bytes());
        mac.update(b"|");
    }
    mac.verify_slice(&expected)
        .map_err(|_| Error::Verification("fingerprint mismatch".to_string()))
}

/// Verify a raw callback and convert it into a [`PaymentStatus`].
///
/// Unknown gateway states are rejected explicitly; there is no catch-all
/// branch that collapses to CANCELLED.
pub fn verified_callback_status(
    secret: &str,
    raw: &BTreeMap<String, String>,
) -> Result<PaymentStatus> {
    let field = |name: &str| -> Result<&str> {
        raw.get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::Verification(format!("callback missing field '{name}'")))
    };

    let fingerprint = field("fingerprint")?;
    let reference = field("reference")?;
    let transaction_id = raw.get("transaction_id").map(String::as_str).unwrap_or("");
    let state_raw = field("state")?;

    verify(secret, &[reference, transaction_id, state_raw], fingerprint)?;

    let state = match state_raw {
        "SUCCESS" | "CLEARED" => PaymentState::Cleared,
        "AUTHORIZED" => PaymentState::Authorized,
        "OPEN" | "PENDING" => PaymentState::Open,
        "CANCELLED" | "FAILURE" => PaymentState::Cancelled,
        other => {
            return Err(Error::InvalidArgument(format!(
                "unknown gateway state '{other}'"
            )))
        }
    };

    let mut data = raw.clone();
    data.remove("fingerprint");

    Ok(PaymentStatus {
        reference: reference.to_string(),
        transaction_id: transaction_id.to_string(),
        message: raw.get("message").cloned().unwrap_or_default(),
        state,
        data,
    })
}

//! Opaque pagination cursors
//!
//! A cursor carries the resume key of a scan back to the client without
//! exposing the store's native key representation. Wire format:
//!
//! ```text
//! base64url( {"id":{"S":"m-3"},"rank":{"N":"12"}} )
//! ```
//!
//! Each attribute maps to a one-entry tagged union. This module is the only
//! place that knows the `S`/`N` tag vocabulary; unknown tags are rejected by
//! the closed [`WireScalar`] type.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::kv::{KeyScalar, ResumeKey};

/// Upper bound on accepted token length (bytes of the encoded form)
pub const MAX_TOKEN_LEN: usize = 4096;

/// URL-safe alphabet, emitted without padding, padding tolerated on input
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors produced while decoding a cursor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("token exceeds {max} bytes")]
    TooLong { max: usize },

    #[error("token is not valid base64: {0}")]
    Base64(String),

    #[error("token payload is malformed: {0}")]
    Malformed(String),

    #[error("attribute '{attribute}' carries a non-numeric N value")]
    InvalidNumber { attribute: String },

    #[error("token carries an empty key")]
    EmptyKey,

    #[error("resume key could not be serialized: {0}")]
    Encode(String),
}

/// Tagged scalar as it appears inside a token
#[derive(Debug, Serialize, Deserialize)]
enum WireScalar {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
}

impl From<&KeyScalar> for WireScalar {
    fn from(value: &KeyScalar) -> Self {
        match value {
            KeyScalar::Str(s) => WireScalar::S(s.clone()),
            KeyScalar::Num(n) => WireScalar::N(n.clone()),
        }
    }
}

/// Encode a resume key into an opaque, URL-safe token
pub fn encode(key: &ResumeKey) -> Result<String, CursorError> {
    if key.is_empty() {
        return Err(CursorError::EmptyKey);
    }
    let wire: BTreeMap<&str, WireScalar> = key
        .iter()
        .map(|(name, value)| (name.as_str(), WireScalar::from(value)))
        .collect();
    let json = serde_json::to_vec(&wire).map_err(|e| CursorError::Encode(e.to_string()))?;
    Ok(TOKEN_ENGINE.encode(json))
}

/// Decode a token produced by [`encode`] back into a typed resume key
pub fn decode(token: &str) -> Result<ResumeKey, CursorError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(CursorError::TooLong { max: MAX_TOKEN_LEN });
    }

    let raw = TOKEN_ENGINE
        .decode(token.trim())
        .map_err(|e| CursorError::Base64(e.to_string()))?;

    let wire: BTreeMap<String, WireScalar> =
        serde_json::from_slice(&raw).map_err(|e| CursorError::Malformed(e.to_string()))?;

    if wire.is_empty() {
        return Err(CursorError::EmptyKey);
    }

    wire.into_iter()
        .map(|(name, scalar)| {
            let value = match scalar {
                WireScalar::S(s) => KeyScalar::Str(s),
                WireScalar::N(n) => {
                    if !is_decimal_number(&n) {
                        return Err(CursorError::InvalidNumber { attribute: name });
                    }
                    KeyScalar::Num(n)
                }
            };
            Ok((name, value))
        })
        .collect()
}

/// Accepts the decimal forms a key-value store emits for numbers:
/// optional sign, digits, optional fraction, optional exponent.
fn is_decimal_number(s: &str) -> bool {
    let s = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (mantissa, exponent) = match s.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (s, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };

    let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !digits(int_part) || !frac_part.map_or(true, digits) {
        return false;
    }
    if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
        return false;
    }
    match exponent {
        None => true,
        Some(e) => {
            let e = e.strip_prefix(['-', '+']).unwrap_or(e);
            !e.is_empty() && digits(e)
        }
    }
}

//! Base64 helpers.
//!
//! Tokens use strict standard base64. Hand-edited key and signature files go
//! through [`cleanse_base64`] and [`decode_base64_lenient`], which tolerate
//! stray whitespace, BOMs and missing padding.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::error::CryptoError;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encode bytes as padded standard base64.
#[must_use]
pub fn encode_base64(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// Strict standard base64 decode.
pub fn decode_base64(input: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(input)
        .map_err(|e| CryptoError::invalid_encoding(e.to_string()))
}

/// Standard-alphabet decode that accepts missing padding and non-zero
/// trailing bits.
pub fn decode_base64_lenient(input: &str) -> Result<Vec<u8>, CryptoError> {
    LENIENT
        .decode(input)
        .map_err(|e| CryptoError::invalid_encoding(e.to_string()))
}

/// Drop every byte outside `A-Z a-z 0-9 + / =`.
#[must_use]
pub fn cleanse_base64(raw: &[u8]) -> String {
    raw.iter()
        .filter(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        .map(|&b| b as char)
        .collect()
}

//! Body extraction from Gmail payload trees and base64url decoding.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::model::message::Payload;

/// Standard alphabet, padded input, lenient about non-zero trailing bits.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Decode a base64url string into text.
///
/// Returns an empty string when the input is not valid base64. Bytes that are
/// not UTF-8 are decoded as Windows-1252, which accepts every byte.
pub fn decode_base64url(input: &str) -> String {
    let mut standard = input.replace('-', "+").replace('_', "/");
    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    let bytes = match LENIENT_STANDARD.decode(standard.as_bytes()) {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!(error = %e, "Invalid base64url body");
            return String::new();
        }
    };

    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            decoded.into_owned()
        }
    }
}

/// Return the text of the first node (depth-first, in part order) whose body
/// decodes to non-empty text, or an empty string.
pub fn extract_body(payload: Option<&Payload>) -> String {
    let Some(payload) = payload else {
        return String::new();
    };

    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        if !data.is_empty() {
            let text = decode_base64url(data);
            if !text.is_empty() {
                return text;
            }
        }
    }

    payload
        .parts
        .iter()
        .map(|part| extract_body(Some(part)))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

//! Media locator decoding.
//!
//! JioSaavn does not hand out direct media URLs. Each song carries an
//! `encrypted_media_url` which is a base64 string of DES-ECB ciphertext.
//!
//! # Decoding Scheme
//!
//! - Base64 (standard alphabet) decode to ciphertext
//! - Ciphertext must be a positive multiple of the 8 byte DES block
//! - Every block is decrypted independently with a fixed key
//! - PKCS#5 padding is stripped by trusting the last byte
//! - The 96 kbps tag in the resulting URL is swapped for a better bitrate

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, KeyInit};
use des::Des;
use reqwest::Url;
use tracing::debug;

use crate::error::{Result, SaavnError};
use crate::models::Quality;

/// DES key shared by the provider's web and mobile clients.
///
/// Protocol constant, not an application secret.
pub const LOCATOR_KEY: &[u8; 8] = b"38346591";

/// DES block size in bytes.
pub const DES_BLOCK_SIZE: usize = 8;

/// Bitrate tag present in decoded locators.
pub const LOW_BITRATE_TAG: &str = "_96";

/// Decode a locator into a playable URL at the default (320 kbps) bitrate.
pub fn decode_locator(locator: &str) -> Result<String> {
    decode_locator_with(locator, Quality::default())
}

/// Decode a locator into a playable URL at the given bitrate.
pub fn decode_locator_with(locator: &str, quality: Quality) -> Result<String> {
    let plaintext = decrypt_locator(locator)?;

    let url = String::from_utf8(plaintext)
        .map_err(|e| SaavnError::MalformedLocator(format!("decrypted bytes are not UTF-8: {}", e)))?;

    match Url::parse(&url) {
        Ok(parsed) if parsed.has_host() => {}
        Ok(_) => {
            return Err(SaavnError::MalformedLocator(format!(
                "decoded URL has no host: {}",
                url
            )))
        }
        Err(e) => {
            return Err(SaavnError::MalformedLocator(format!(
                "decoded value is not a URL ({}): {}",
                e, url
            )))
        }
    }

    let upgraded = upgrade_bitrate(&url, quality);
    debug!("Decoded locator to {}", upgraded);
    Ok(upgraded)
}

/// Base64-decode and DES-decrypt a locator, returning the unpadded bytes.
pub fn decrypt_locator(locator: &str) -> Result<Vec<u8>> {
    let mut buffer = STANDARD
        .decode(locator.trim())
        .map_err(|e| SaavnError::MalformedLocator(format!("invalid base64: {}", e)))?;

    if buffer.is_empty() || buffer.len() % DES_BLOCK_SIZE != 0 {
        return Err(SaavnError::MalformedLocator(format!(
            "ciphertext length {} is not a positive multiple of {}",
            buffer.len(),
            DES_BLOCK_SIZE
        )));
    }

    let cipher = Des::new_from_slice(LOCATOR_KEY)
        .map_err(|e| SaavnError::MalformedLocator(format!("invalid DES key: {}", e)))?;

    for block in buffer.chunks_exact_mut(DES_BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }

    strip_padding(buffer)
}

/// Remove PKCS#5 padding by reading the pad length from the last byte.
///
/// The pad bytes themselves are not verified, matching the provider's own
/// clients. A pad length larger than the buffer is rejected.
pub fn strip_padding(mut data: Vec<u8>) -> Result<Vec<u8>> {
    let pad = match data.last() {
        Some(&pad) => pad as usize,
        None => return Err(SaavnError::MalformedLocator("empty plaintext".to_string())),
    };

    if pad > data.len() {
        return Err(SaavnError::MalformedLocator(format!(
            "padding length {} exceeds plaintext length {}",
            pad,
            data.len()
        )));
    }

    data.truncate(data.len() - pad);
    Ok(data)
}

/// Replace the first low-bitrate tag in `url` with the tag for `quality`.
///
/// URLs without the tag are returned unchanged.
pub fn upgrade_bitrate(url: &str, quality: Quality) -> String {
    url.replacen(LOW_BITRATE_TAG, quality.tag(), 1)
}

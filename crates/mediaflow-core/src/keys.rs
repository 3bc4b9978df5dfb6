//! Object key helpers: decoding, extension handling, and identifier generation.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use uuid::Uuid;

/// Alphabet used for short identifiers (no visually ambiguous characters).
const SHORT_ID_ALPHABET: &[u8; 57] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Characters left as-is when form-encoding a key.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b' ');

/// Number of characters needed to render a full 128-bit value in base57.
const SHORT_ID_LEN: usize = 22;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a short, URL-safe unique identifier from a random UUID.
pub fn short_id() -> String {
    encode_short(Uuid::new_v4().as_u128())
}

fn encode_short(mut value: u128) -> String {
    let base = SHORT_ID_ALPHABET.len() as u128;
    let mut out = [SHORT_ID_ALPHABET[0]; SHORT_ID_LEN];
    for slot in out.iter_mut().rev() {
        *slot = SHORT_ID_ALPHABET[(value % base) as usize];
        value /= base;
    }
    out.iter().map(|&b| b as char).collect()
}

/// Decode a form-encoded object key as delivered in upload notifications.
///
/// `+` becomes a space and `%XX` escapes are decoded; invalid UTF-8 is replaced.
pub fn decode_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Form-encode a key the way storage notifications deliver it.
///
/// Inverse of [`decode_key`]: spaces become `+`, other reserved bytes `%XX`.
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ENCODE_SET)
        .to_string()
        .replace(' ', "+")
}

/// Return the extension of the last key segment, including the leading dot.
///
/// Case is preserved. Leading dots of the segment are not treated as an
/// extension separator, so `.env` has no extension.
pub fn split_extension(key: &str) -> &str {
    let name = file_name(key);
    let trimmed = name.trim_start_matches('.');
    match trimmed.rfind('.') {
        Some(idx) => &trimmed[idx..],
        None => "",
    }
}

/// Last `/`-separated segment of a key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Build an `s3://bucket/key` URI.
pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}", bucket, key)
}

/// Normalize an extension for classification: lower-cased, dot-prefixed.
pub fn normalize_extension(extension: &str) -> String {
    let lower = extension.trim().to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Decode HTML-escaped ampersands (`&amp;` -> `&`).
///
/// Category names are stored escaped by the forum's sanitizer, so
/// `Comments &amp; Feedback` must compare equal to `Comments & Feedback`.
/// Only the ampersand entity is decoded; other entities are left as-is.
#[must_use]
pub fn decode_ampersands(name: &str) -> String {
    name.replace("&amp;", "&")
}

/// Whether a stored category name designates the attention-eligible category.
///
/// Exact and case-sensitive after ampersand decoding.
#[must_use]
pub fn is_designated_name(stored_name: &str, designated: &str) -> bool {
    decode_ampersands(stored_name) == designated
}

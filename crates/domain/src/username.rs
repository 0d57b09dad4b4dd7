//! Username transcoding.
//!
//! Usernames exist in two forms: the decoded form people type and the
//! encoded form stored locally and used as the chat-backend login name.
//! The encoded form is `enc.` followed by the lowercase hex of the UTF-8
//! bytes of the lowercased decoded name, which keeps it safe for consumers
//! that are case-insensitive and alphanumeric-only.
//!
//! Both transforms are idempotent:
//! `encode(encode(x)) == encode(x)` and `decode(decode(x)) == decode(x)`.

/// Marker prefix of the encoded form.
pub const ENCODED_PREFIX: &str = "enc.";

/// Encode a username. Already-encoded input is returned unchanged.
pub fn encode(username: &str) -> String {
    if username.starts_with(ENCODED_PREFIX) {
        return username.to_owned();
    }
    format!("{}{}", ENCODED_PREFIX, hex::encode(username.to_lowercase()))
}

/// Decode a username. Plain input is normalized to lowercase; input whose
/// payload is not valid hex-encoded UTF-8 is returned lowercased as-is.
pub fn decode(username: &str) -> String {
    let Some(payload) = username.strip_prefix(ENCODED_PREFIX) else {
        return username.to_lowercase();
    };
    match hex::decode(payload).map(String::from_utf8) {
        // The payload may have been encoded elsewhere from a mixed-case
        // name; normalize so decode always yields the canonical form.
        Ok(Ok(decoded)) => decoded.to_lowercase(),
        _ => username.to_lowercase(),
    }
}

/// Equality normalizing both forms, for comparing a stored (encoded) name
/// against user input in either form.
pub fn matches(a: &str, b: &str) -> bool {
    decode(a) == decode(b)
}

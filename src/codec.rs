//! Path codec for routine file references.
//!
//! Storage paths such as `routine_images/CSE_p3.png` are never sent to the
//! client as-is. Instead they are turned into opaque tokens with [`encode_path`]
//! and turned back with [`decode_token`] when a file is requested.
//!
//! # Not a security boundary
//!
//! The encoding is plain base64. Anyone can reverse it. It only keeps raw
//! storage paths out of casual view in browser developer tools. Safety of file
//! access rests entirely on the containment check in
//! [`RoutineStore::resolve`](crate::files::RoutineStore::resolve).
//!
//! # Token format
//!
//! Tokens are produced with the URL-safe base64 alphabet and padding, so a
//! token can be placed in a path segment as-is. Decoding is lenient and also
//! accepts the standard alphabet and missing padding, so tokens issued in the
//! standard alphabet keep working.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use tracing::debug;

/// Decoder for the standard alphabet that ignores padding.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoder for the URL-safe alphabet that ignores padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode a relative storage path into an opaque token.
///
/// Deterministic: the same path always yields the same token. The token never
/// contains `/` or `+`.
pub fn encode_path(relative_path: &str) -> String {
    URL_SAFE.encode(relative_path.as_bytes())
}

/// Decode a token back into the relative storage path it stands for.
///
/// Returns `None` when the token is not valid base64 in either alphabet, when
/// it decodes to nothing, or when the decoded bytes are not a UTF-8 string
/// free of NUL bytes. Callers treat `None` as an invalid file reference.
pub fn decode_token(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let bytes = match STANDARD_LENIENT.decode(token) {
        Ok(bytes) => bytes,
        Err(_) => match URL_SAFE_LENIENT.decode(token) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "Token is not valid base64");
                return None;
            }
        },
    };

    let path = match String::from_utf8(bytes) {
        Ok(path) => path,
        Err(_) => {
            debug!("Token does not decode to UTF-8");
            return None;
        }
    };

    if path.is_empty() || path.contains('\0') {
        return None;
    }

    Some(path)
}

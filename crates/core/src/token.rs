//! HMAC-SHA256 signed image tokens.
//!
//! Tokens have the form `{expiry}.{hex-hmac}` where `expiry` is a Unix
//! timestamp in seconds and the HMAC covers `"{key}:{expiry}"`. The image
//! proxy hands these out to the gallery and verifies them before serving
//! blob bytes.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime: 24 hours.
pub const DEFAULT_EXPIRY_SECONDS: i64 = 86_400;

/// Create a time-limited signed token for a blob key.
pub fn create_token(key: &str, secret: &str, expiry_seconds: i64) -> String {
    let expiry = chrono::Utc::now().timestamp() + expiry_seconds;
    let sig = sign(key, expiry, secret);
    format!("{expiry}.{sig}")
}

/// Verify a signed token against a blob key.
///
/// Returns `false` for malformed tokens, expired tokens, and signature
/// mismatches alike; callers never learn which check failed.
pub fn verify_token(key: &str, token: &str, secret: &str) -> bool {
    verify_token_at(key, token, secret, chrono::Utc::now().timestamp())
}

fn verify_token_at(key: &str, token: &str, secret: &str, now: i64) -> bool {
    let Some((expiry_str, sig)) = token.split_once('.') else {
        return false;
    };
    let Ok(expiry) = expiry_str.parse::<i64>() else {
        return false;
    };
    if expiry <= 0 || now > expiry {
        return false;
    }

    let expected = sign(key, expiry, secret);
    constant_time_eq(sig, &expected)
}

fn sign(key: &str, expiry: i64, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{key}:{expiry}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison to prevent timing-based attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

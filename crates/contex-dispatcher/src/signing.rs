//! Webhook HMAC signing. Pattern matches `rootsignal-api::auth::sign`:
//! `HmacSha256::new_from_slice` / `mac.update` / `hex::encode`. The signer
//! always operates on the exact bytes being POSTed, never a re-serialization
//! of the payload, so the receiver's verification never has to contend with
//! key-order or whitespace drift.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `X-Contex-Signature` header value: `sha256=<hex HMAC(secret, body)>`.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any size");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

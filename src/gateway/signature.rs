//! Payment signature verification (HMAC-SHA256)

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Checks the signature a client returns after completing a gateway payment.
/// The signed payload is `"<gateway_order_id>|<payment_id>"`, keyed by the
/// merchant secret, hex encoded.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self { Self { secret: secret.into() } }

    pub fn expected(&self, gateway_order_id: &str, payment_id: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
        match self.expected(gateway_order_id, payment_id) {
            Some(expected) => constant_time_eq(&expected, signature),
            None => false,
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() { return false; }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) { res |= x ^ y; }
    res == 0
}

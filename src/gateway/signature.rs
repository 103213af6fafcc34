use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 verifier for checkout callbacks and webhooks.
///
/// Signatures are lowercase hex. A mismatch is an expected outcome, so the
/// `verify_*` methods return `false` rather than an error.
#[derive(Clone)]
pub struct SignatureVerifier {
    checkout: HmacSha256,
    webhook: HmacSha256,
}

impl SignatureVerifier {
    pub fn new(checkout_secret: &str, webhook_secret: &str) -> Result<Self, InvalidLength> {
        Ok(Self {
            checkout: HmacSha256::new_from_slice(checkout_secret.as_bytes())?,
            webhook: HmacSha256::new_from_slice(webhook_secret.as_bytes())?,
        })
    }

    /// Checks the signature the gateway hands the browser over
    /// `"{gateway_order_ref}|{gateway_payment_ref}"`.
    pub fn verify_checkout(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool {
        verify(
            self.checkout.clone(),
            checkout_message(order_ref, payment_ref).as_bytes(),
            signature,
        )
    }

    /// Checks a webhook signature over the exact bytes received on the wire.
    pub fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> bool {
        verify(self.webhook.clone(), raw_body, signature)
    }

    pub fn sign_checkout(&self, order_ref: &str, payment_ref: &str) -> String {
        sign(
            self.checkout.clone(),
            checkout_message(order_ref, payment_ref).as_bytes(),
        )
    }

    pub fn sign_webhook(&self, raw_body: &[u8]) -> String {
        sign(self.webhook.clone(), raw_body)
    }
}

fn checkout_message(order_ref: &str, payment_ref: &str) -> String {
    format!("{order_ref}|{payment_ref}")
}

fn sign(mut mac: HmacSha256, message: &[u8]) -> String {
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

fn verify(mut mac: HmacSha256, message: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    mac.update(message);
    // verify_slice compares in constant time
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("key_secret", "webhook_secret").unwrap()
    }

    #[test]
    fn checkout_signature_matches_reference_hmac() {
        let mut mac = HmacSha256::new_from_slice(b"key_secret").unwrap();
        mac.update(b"order_123|pay_456");
        let reference = hex::encode(mac.finalize().into_bytes());

        assert_eq!(verifier().sign_checkout("order_123", "pay_456"), reference);
        assert!(verifier().verify_checkout("order_123", "pay_456", &reference));
    }

    #[test]
    fn tampered_checkout_signature_fails() {
        let v = verifier();
        let mut signature = v.sign_checkout("order_123", "pay_456");
        signature.replace_range(0..2, if &signature[0..2] == "00" { "11" } else { "00" });
        assert!(!v.verify_checkout("order_123", "pay_456", &signature));
    }

    #[test]
    fn signature_for_other_payment_fails() {
        let v = verifier();
        let signature = v.sign_checkout("order_123", "pay_456");
        assert!(!v.verify_checkout("order_123", "pay_999", &signature));
    }

    #[test]
    fn non_hex_signature_is_rejected_without_error() {
        assert!(!verifier().verify_checkout("order_123", "pay_456", "not-hex!"));
        assert!(!verifier().verify_webhook(b"{}", ""));
    }

    #[test]
    fn webhook_signature_covers_exact_bytes() {
        let v = verifier();
        let body = br#"{"event":"payment.captured"}"#;
        let signature = v.sign_webhook(body);
        assert!(v.verify_webhook(body, &signature));
        // Same JSON, different bytes.
        assert!(!v.verify_webhook(br#"{ "event": "payment.captured" }"#, &signature));
    }

    #[test]
    fn checkout_and_webhook_use_separate_secrets() {
        let v = verifier();
        let body = b"order_123|pay_456";
        let checkout_sig = v.sign_checkout("order_123", "pay_456");
        assert!(!v.verify_webhook(body, &checkout_sig));
    }
}

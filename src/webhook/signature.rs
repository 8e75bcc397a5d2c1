use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify an `X-Hub-Signature-256` header against the raw request body.
///
/// Returns false for an absent header, a header that is not
/// `sha256=<hex>`, any other algorithm tag, or a digest mismatch.
/// The digest comparison is constant time.
pub fn verify(body: &[u8], signature_header: Option<&str>, secret: &str) -> bool {
    let Some(header) = signature_header else {
        return false;
    };
    let Some((algorithm, digest_hex)) = header.trim().split_once('=') else {
        return false;
    };
    if algorithm != "sha256" {
        return false;
    }

    let Ok(digest) = hex::decode(digest_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&digest).is_ok()
}

/// Compute the header value GitHub would send for `body`.
#[cfg(test)]
pub(crate) fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

//! Callback signatures.
//!
//! The framework signs every execution callback with
//! `X-Inngest-Signature: t=<unix seconds>&s=<hex hmac>`, where the HMAC-SHA256
//! covers the raw body followed by the timestamp string.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-inngest-signature";

/// Signatures older than this are treated as replays.
const MAX_AGE_SECS: u64 = 5 * 60;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside the accepted window")]
    Expired,
    #[error("signature does not match")]
    Mismatch,
}

#[derive(Clone)]
pub struct SigningKey(String);

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

impl SigningKey {
    /// Accepts keys with or without the `signkey-<env>-` prefix.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        let key = raw
            .strip_prefix("signkey-")
            .and_then(|rest| rest.split_once('-').map(|(_, key)| key))
            .unwrap_or(raw);
        Self(key.to_owned())
    }

    fn mac(&self, body: &[u8], timestamp: &str) -> Result<HmacSha256, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(self.0.as_bytes()).map_err(|_| SignatureError::Malformed)?;
        mac.update(body);
        mac.update(timestamp.as_bytes());
        Ok(mac)
    }

    /// Header value for `body` signed at `timestamp`.
    pub fn sign(&self, body: &[u8], timestamp: i64) -> Result<String, SignatureError> {
        let t = timestamp.to_string();
        let digest = self.mac(body, &t)?.finalize().into_bytes();
        Ok(format!("t={t}&s={}", hex::encode(digest)))
    }

    /// Check `header` against `body`; `now` is the current unix time.
    pub fn verify(&self, header: Option<&str>, body: &[u8], now: i64) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::Missing)?;
        let (mut t, mut s) = (None, None);
        for pair in header.split('&') {
            match pair.split_once('=') {
                Some(("t", v)) => t = Some(v),
                Some(("s", v)) => s = Some(v),
                _ => {}
            }
        }
        let (t, s) = t.zip(s).ok_or(SignatureError::Malformed)?;
        let timestamp: i64 = t.parse().map_err(|_| SignatureError::Malformed)?;
        if now.abs_diff(timestamp) > MAX_AGE_SECS {
            return Err(SignatureError::Expired);
        }
        let expected = hex::decode(s).map_err(|_| SignatureError::Malformed)?;
        self.mac(body, t)?
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const BODY: &[u8] = br#"{"event":{"name":"clerk/user.created"}}"#;

    #[test]
    fn prefix_is_stripped() {
        let a = SigningKey::new("signkey-prod-abc123");
        let b = SigningKey::new("abc123");
        assert_eq!(a.sign(BODY, 10).unwrap(), b.sign(BODY, 10).unwrap());
    }

    #[test]
    fn round_trip_and_failures() {
        let key = SigningKey::new("signkey-test-deadbeef");
        let now = 1_700_000_000;
        let header = key.sign(BODY, now).unwrap();

        assert_eq!(key.verify(Some(&header), BODY, now + 30), Ok(()));
        assert_eq!(key.verify(None, BODY, now), Err(SignatureError::Missing));
        assert_eq!(key.verify(Some("garbage"), BODY, now), Err(SignatureError::Malformed));
        assert_eq!(key.verify(Some(&header), BODY, now + 301), Err(SignatureError::Expired));
        assert_eq!(
            key.verify(Some(&header), b"{}", now),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            SigningKey::new("other").verify(Some(&header), BODY, now),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn extreme_timestamps_are_expired() {
        let key = SigningKey::new("signkey-test-deadbeef");
        let now = 1_700_000_000;
        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={t}&s=00");
            assert_eq!(key.verify(Some(&header), b"{}", now), Err(SignatureError::Expired));
        }
    }
}

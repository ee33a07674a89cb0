use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use trading::ExchangeError;

/// Request parameters. Kept sorted by key, which is the order the signature
/// is computed over.
pub type Params = BTreeMap<String, String>;

/// API key pair used to sign private requests.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Lowercase hex HMAC-SHA256 of `payload` keyed by the API secret.
    pub fn sign(&self, payload: &str) -> Result<String, ExchangeError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Transport(format!("invalid API secret: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Adds `api_key`, `timestamp` and `sign` to `params`.
    pub fn authorize(&self, mut params: Params, timestamp_ms: i64) -> Result<Params, ExchangeError> {
        params.insert("api_key".to_string(), self.api_key.clone());
        params.insert("timestamp".to_string(), timestamp_ms.to_string());
        let sign = self.sign(&query_string(&params))?;
        params.insert("sign".to_string(), sign);
        Ok(params)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// `k1=v1&k2=v2` in key order. Values are sent as-is.
pub fn query_string(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_matches_reference_vector() {
        let creds = Credentials::new("ignored", "key");
        let sig = creds
            .sign("The quick brown fox jumps over the lazy dog")
            .unwrap();
        assert_eq!(
            sig,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_authorize_signs_sorted_params() {
        let creds = Credentials::new("my-key", "my-secret");
        let mut params = Params::new();
        params.insert("symbol".into(), "BTCUSD".into());
        params.insert("order_id".into(), "abc".into());

        let signed = creds.authorize(params, 1_600_000_000_000).unwrap();

        let expected_payload =
            "api_key=my-key&order_id=abc&symbol=BTCUSD&timestamp=1600000000000";
        assert_eq!(signed["sign"], creds.sign(expected_payload).unwrap());
        assert_eq!(signed["api_key"], "my-key");
        assert_eq!(signed["timestamp"], "1600000000000");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("k", "super-secret");
        assert!(!format!("{:?}", creds).contains("super-secret"));
    }
}

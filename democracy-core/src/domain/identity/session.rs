use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// Freshly issued bearer token. Only the digest is persisted; the plain
/// token is handed to the client once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn generate(ttl: Duration) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self {
            token: URL_SAFE_NO_PAD.encode(bytes),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn digest(&self) -> String {
        hash_session_token(&self.token)
    }
}

/// Hex SHA-256 of a presented token, the key sessions are stored under.
pub fn hash_session_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = SessionToken::generate(Duration::hours(1));
        let b = SessionToken::generate(Duration::hours(1));
        assert_ne!(a.token, b.token);
        assert!(
            a.token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert!(a.expires_at > Utc::now());
    }

    #[test]
    fn digest_is_stable_hex() {
        let hash = hash_session_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

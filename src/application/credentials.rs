use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Keyed password hashing (HMAC-SHA256, hex encoded).
#[derive(Clone)]
pub struct PasswordHasher {
    secret: SecretString,
}

impl PasswordHasher {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    pub fn hash(&self, password: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(password.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison against a stored hash.
    pub fn verify(&self, password: &str, hashed: &str) -> bool {
        let Ok(expected) = hex::decode(hashed) else {
            return false;
        };
        let mut mac = match HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(password.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_keyed_and_verifiable() {
        let hasher = PasswordHasher::new(SecretString::from("secret-a"));
        let other = PasswordHasher::new(SecretString::from("secret-b"));

        let hashed = hasher.hash("hunter2");
        assert_eq!(hashed.len(), 64);
        assert_eq!(hashed, hasher.hash("hunter2"));
        assert_ne!(hashed, other.hash("hunter2"));

        assert!(hasher.verify("hunter2", &hashed));
        assert!(!hasher.verify("hunter3", &hashed));
        assert!(!other.verify("hunter2", &hashed));
        assert!(!hasher.verify("hunter2", "not-hex"));
    }
}

use super::account::Email;
use super::id::TokenId;
use serde::{Deserialize, Serialize};

/// How long an issued or extended token stays valid, in milliseconds.
pub const TOKEN_TTL_MILLIS: i64 = 60 * 60 * 1000;

/// A bearer credential bound to one account and an absolute expiry.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Token {
    pub id: TokenId,
    pub email: Email,
    /// Expiry instant in epoch millis.
    pub expires: i64,
}

impl Token {
    pub fn issue(email: Email, now: i64) -> Self {
        Self {
            id: TokenId::generate(),
            email,
            expires: now + TOKEN_TTL_MILLIS,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires <= now
    }

    /// A token authorizes `email` only when it was issued to it and has not expired.
    pub fn is_valid_for(&self, email: &Email, now: i64) -> bool {
        &self.email == email && !self.is_expired(now)
    }

    /// Pushes the expiry one TTL past `now`; `false` if already expired.
    pub fn extend(&mut self, now: i64) -> bool {
        if self.is_expired(now) {
            return false;
        }
        self.expires = now + TOKEN_TTL_MILLIS;
        true
    }
}

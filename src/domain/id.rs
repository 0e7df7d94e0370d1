use crate::error::ServiceError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of every generated record id (orders and tokens).
pub const ID_LENGTH: usize = 20;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Generates a fresh random id.
            pub fn generate() -> Self {
                Self(random_string(ID_LENGTH))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ServiceError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                let trimmed = value.trim();
                if trimmed.chars().count() == ID_LENGTH {
                    Ok(Self(trimmed.to_string()))
                } else {
                    Err(ServiceError::ValidationError(format!(
                        "{} must be {} characters",
                        $label, ID_LENGTH
                    )))
                }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ServiceError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::try_from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of an order record.
    OrderId,
    "Order id"
);

record_id!(
    /// Identifier of an access token.
    TokenId,
    "Token id"
);

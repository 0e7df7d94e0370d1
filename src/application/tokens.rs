use super::credentials::PasswordHasher;
use super::records::Records;
use crate::domain::account::Email;
use crate::domain::id::TokenId;
use crate::domain::now_millis;
use crate::domain::ports::Authenticator;
use crate::domain::token::Token;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;

/// Issues, extends, revokes and verifies access tokens.
#[derive(Clone)]
pub struct TokenService {
    records: Records,
    hasher: PasswordHasher,
}

impl TokenService {
    pub fn new(records: Records, hasher: PasswordHasher) -> Self {
        Self { records, hasher }
    }

    /// Exchanges valid credentials for a token that expires in one hour.
    pub async fn issue(&self, email: &Email, password: &str) -> Result<Token> {
        let account = self.records.find_account(email).await?.ok_or_else(|| {
            ServiceError::validation("Could not find the specified user")
        })?;

        if !self.hasher.verify(password, &account.hashed_password) {
            return Err(ServiceError::validation(
                "Password did not match the specified user's stored password",
            ));
        }

        let token = Token::issue(account.email, now_millis());
        self.records.insert_token(&token).await?;
        tracing::debug!(email = %token.email, "Token issued");
        Ok(token)
    }

    pub async fn get(&self, id: &TokenId) -> Result<Token> {
        self.records.token(id).await
    }

    /// Resets the expiry of a still-valid token to one hour from now.
    pub async fn extend(&self, id: &TokenId) -> Result<Token> {
        let mut token = self.records.token(id).await?;
        if !token.extend(now_millis()) {
            return Err(ServiceError::validation(
                "The token has already expired and cannot be extended",
            ));
        }
        self.records.save_token(&token).await?;
        Ok(token)
    }

    pub async fn revoke(&self, id: &TokenId) -> Result<()> {
        self.records.delete_token(id).await
    }

    /// Resolves a token to the identity it was issued to, if still valid for it.
    pub async fn identity(&self, id: &TokenId) -> Result<Email> {
        let token = self.records.token(id).await.map_err(|e| match e {
            ServiceError::NotFound(_) | ServiceError::JsonError(_) => ServiceError::Forbidden,
            other => other,
        })?;
        if token.is_valid_for(&token.email, now_millis()) {
            Ok(token.email)
        } else {
            Err(ServiceError::Forbidden)
        }
    }

    /// Fails with `Forbidden` unless `token` authorizes `identity`.
    pub async fn authorize(&self, token: &TokenId, identity: &Email) -> Result<()> {
        if self.verify(token, identity).await {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}

#[async_trait]
impl Authenticator for TokenService {
    async fn verify(&self, token: &TokenId, identity: &Email) -> bool {
        match self.records.token(token).await {
            Ok(token) => token.is_valid_for(identity, now_millis()),
            Err(ServiceError::NotFound(_)) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Token lookup failed");
                false
            }
        }
    }
}

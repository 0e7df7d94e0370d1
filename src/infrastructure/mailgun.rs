//! Mailgun messages API client.

use crate::config::MailgunConfig;
use crate::domain::account::Email;
use crate::domain::ports::Notifier;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

const SUBJECT: &str = "Order Successful";

#[derive(Clone)]
pub struct MailgunNotifier {
    client: reqwest::Client,
    messages_url: String,
    from: String,
    api_key: SecretString,
}

impl MailgunNotifier {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &MailgunConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ServiceError::InternalError(Box::new(e)))?;
        Ok(Self {
            client,
            messages_url: config.messages_url.clone(),
            from: config.from.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn credentials(&self) -> (String, Option<String>) {
        let key = self.api_key.expose_secret();
        match key.split_once(':') {
            Some((user, password)) => (user.to_string(), Some(password.to_string())),
            None => ("api".to_string(), Some(key.to_string())),
        }
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn send(&self, address: &Email, display_name: &str, body: &str) -> Result<()> {
        let name = display_name.trim();
        let text = body.trim();
        if name.is_empty() || text.is_empty() {
            return Err(ServiceError::NotificationError(
                "Given parameters were missing or invalid".to_string(),
            ));
        }

        let form = [
            ("from", self.from.clone()),
            ("to", format!("{name} <{address}>")),
            ("subject", SUBJECT.to_string()),
            ("text", text.to_string()),
        ];
        let (user, password) = self.credentials();

        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(user, password)
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::NotificationError(format!("Request failed: {e}")))?;

        let status = response.status().as_u16();
        if status == 200 || status == 201 {
            Ok(())
        } else {
            Err(ServiceError::NotificationError(format!(
                "Status code returned was {status}"
            )))
        }
    }
}

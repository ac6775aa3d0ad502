//! Credential sources for the login flow.
//!
//! Credentials come from one of several backends (environment variables,
//! `pass` entries, an interactive prompt). Each backend is a key-value store
//! queried for the `email` and `password` keys.
//!
//! # Configuration
//!
//! ```toml
//! [credentials]
//! backend = "pass"
//! path = "web/kream"
//!
//! [credentials.fields]
//! email = "login"
//! ```

mod config;
mod env;
mod pass;
#[cfg(feature = "prompt")]
mod prompt;

pub use config::CredentialConfig;
pub use env::EnvCredentialStore;
pub use pass::{PassConfig, PassCredentialStore};
#[cfg(feature = "prompt")]
pub use prompt::prompt_credentials;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::scrape::ScrapeError;

/// Key under which backends store the account email.
pub const EMAIL_KEY: &str = "email";
/// Key under which backends store the account password.
pub const PASSWORD_KEY: &str = "password";

/// A read-only key-value store for credentials.
///
/// The scraper defines what keys it needs; backend configuration maps those
/// keys to backend-specific locations.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Retrieve a credential by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    /// Returns `Err` if there was an error accessing the backend.
    async fn get(&self, key: &str) -> Result<Option<SecretString>>;

    /// Short backend name for log messages.
    fn describe(&self) -> String;
}

/// Account email and password.
#[derive(Debug)]
pub struct Credentials {
    email: SecretString,
    password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: SecretString::from(email.into()),
            password: SecretString::from(password.into()),
        }
    }

    pub fn from_secrets(email: SecretString, password: SecretString) -> Self {
        Self { email, password }
    }

    /// Fetch both keys from `store`. `None` if either is missing.
    pub async fn load(store: &dyn CredentialStore) -> Result<Option<Self>> {
        let Some(email) = store.get(EMAIL_KEY).await? else {
            return Ok(None);
        };
        let Some(password) = store.get(PASSWORD_KEY).await? else {
            return Ok(None);
        };
        Ok(Some(Self::from_secrets(email, password)))
    }

    pub fn email(&self) -> &str {
        self.email.expose_secret()
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Both values must be non-empty before any browser interaction.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.email().trim().is_empty() || self.password().is_empty() {
            return Err(ScrapeError::Configuration(
                "email or password is empty".to_string(),
            ));
        }
        Ok(())
    }
}

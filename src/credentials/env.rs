//! Environment-variable credential backend.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;

use super::CredentialStore;

/// Reads `<PREFIX><KEY>` variables, e.g. `KREAM_EMAIL` and `KREAM_PASSWORD`.
#[derive(Debug, Clone)]
pub struct EnvCredentialStore {
    prefix: String,
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        Self::new("KREAM_")
    }
}

impl EnvCredentialStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase())
    }
}

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<SecretString>> {
        match std::env::var(self.var_name(key)) {
            Ok(value) if !value.is_empty() => Ok(Some(SecretString::from(value))),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("{}: {e}", self.var_name(key))),
        }
    }

    fn describe(&self) -> String {
        format!("environment ({}*)", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_var_name_uses_prefix() {
        let store = EnvCredentialStore::default();
        assert_eq!(store.var_name("email"), "KREAM_EMAIL");
        assert_eq!(store.var_name("password"), "KREAM_PASSWORD");
    }

    #[tokio::test]
    async fn test_reads_set_variable_and_ignores_empty() -> Result<()> {
        // Unique prefix so parallel tests don't collide.
        let store = EnvCredentialStore::new("KREAM_TRADES_ENV_TEST_");
        std::env::set_var("KREAM_TRADES_ENV_TEST_EMAIL", "me@example.com");
        std::env::set_var("KREAM_TRADES_ENV_TEST_PASSWORD", "");

        let email = store.get("email").await?.expect("email set");
        assert_eq!(email.expose_secret(), "me@example.com");
        assert!(store.get("password").await?.is_none());
        assert!(store.get("missing").await?.is_none());
        Ok(())
    }
}

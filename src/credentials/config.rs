//! Credential backend selection.

use serde::{Deserialize, Serialize};

use super::env::EnvCredentialStore;
use super::pass::{PassConfig, PassCredentialStore};
use super::CredentialStore;

fn default_env_prefix() -> String {
    "KREAM_".to_string()
}

/// Which backend supplies the login credentials.
///
/// # Example
///
/// ```toml
/// [credentials]
/// backend = "pass"
/// path = "web/kream"
///
/// [credentials.fields]
/// email = "login"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum CredentialConfig {
    /// Environment variables `<prefix>EMAIL` / `<prefix>PASSWORD`.
    Env {
        #[serde(default = "default_env_prefix")]
        prefix: String,
    },
    /// Password-store (pass) backend.
    Pass {
        #[serde(flatten)]
        config: PassConfig,
    },
}

impl Default for CredentialConfig {
    fn default() -> Self {
        CredentialConfig::Env {
            prefix: default_env_prefix(),
        }
    }
}

impl CredentialConfig {
    /// Build a credential store from this configuration.
    pub fn build(&self) -> Box<dyn CredentialStore> {
        match self {
            CredentialConfig::Env { prefix } => Box::new(EnvCredentialStore::new(prefix.clone())),
            CredentialConfig::Pass { config } => {
                Box::new(PassCredentialStore::new(config.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[derive(Deserialize)]
    struct Wrapper {
        credentials: CredentialConfig,
    }

    #[test]
    fn test_parse_pass_config() -> Result<()> {
        let wrapper: Wrapper = toml::from_str(
            r#"
[credentials]
backend = "pass"
path = "web/kream"

[credentials.fields]
email = "login"
"#,
        )?;

        match wrapper.credentials {
            CredentialConfig::Pass { config } => {
                assert_eq!(config.path, "web/kream");
                assert_eq!(config.fields.get("email"), Some(&"login".to_string()));
            }
            other => panic!("expected pass backend, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_parse_env_config_with_default_prefix() -> Result<()> {
        let wrapper: Wrapper = toml::from_str("[credentials]\nbackend = \"env\"\n")?;
        match wrapper.credentials {
            CredentialConfig::Env { prefix } => assert_eq!(prefix, "KREAM_"),
            other => panic!("expected env backend, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_build_describes_backend() {
        let store = CredentialConfig::default().build();
        assert_eq!(store.describe(), "environment (KREAM_*)");
    }
}

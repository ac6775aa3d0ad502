//! Password-store (pass) credential backend.
//!
//! The first line of the entry is the password; further lines hold
//! `field-name: value` pairs, one of which carries the login email.

use std::collections::HashMap;
use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::CredentialStore;

/// Configuration for a pass credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassConfig {
    /// The pass entry path (e.g., "web/kream").
    pub path: String,

    /// Mapping from logical key names to field names in the pass entry.
    /// If not specified, the logical key name is used as-is.
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

/// Credential store backed by password-store (pass).
pub struct PassCredentialStore {
    config: PassConfig,
}

impl PassCredentialStore {
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }

    /// Get the field name in the pass entry for a logical key.
    fn field_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.config
            .fields
            .get(key)
            .map(|s| s.as_str())
            .unwrap_or(key)
    }

    fn read_entry(&self) -> Result<PassEntry> {
        let output = Command::new("pass")
            .arg("show")
            .arg(&self.config.path)
            .output()
            .context("Failed to run pass command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("pass command failed: {}", stderr.trim());
        }

        let content = String::from_utf8(output.stdout).context("Invalid UTF-8 in pass output")?;

        Ok(PassEntry::parse(&content))
    }
}

#[async_trait]
impl CredentialStore for PassCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<SecretString>> {
        let field = self.field_name(key);
        let entry = self.read_entry()?;

        Ok(entry.field(field).map(|v| SecretString::from(v.to_string())))
    }

    fn describe(&self) -> String {
        format!("pass ({})", self.config.path)
    }
}

/// Parsed pass entry.
#[derive(Debug, Default)]
struct PassEntry {
    fields: HashMap<String, String>,
}

impl PassEntry {
    fn parse(content: &str) -> Self {
        let mut lines = content.lines();
        let mut fields = HashMap::new();

        // First line is the password.
        if let Some(pw) = lines.next() {
            fields.insert("password".to_string(), pw.to_string());
        }

        for line in lines {
            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                if !value.is_empty() {
                    fields.insert(key.trim().to_lowercase(), value.to_string());
                }
            }
        }

        Self { fields }
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

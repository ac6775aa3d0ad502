use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::credentials::CredentialConfig;
use crate::duration::{deserialize_duration, serialize_duration};

/// Locale-specific text the scraper matches against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Text of the sign-in link and button.
    pub sign_in: String,

    /// Text of the control that opens the trade-history panel.
    pub details: String,

    /// Phrases whose presence confirms the panel is open. Any one suffices.
    pub trade_history: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            sign_in: "로그인".to_string(),
            details: "자세히".to_string(),
            trade_history: vec!["체결 거래".to_string(), "거래 내역".to_string()],
        }
    }
}

/// Structural hints (class names and selectors) for the target pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Class carried by the header sign-in link.
    pub sign_in_link_class: String,

    /// Class carried by the element holding the details label.
    pub details_class: String,

    /// CSS for the email input; combined with `email_placeholder_hint`.
    pub email_input: String,

    /// Substring expected in the email input's placeholder. Empty disables
    /// the placeholder check.
    pub email_placeholder_hint: String,

    /// CSS for the password input.
    pub password_input: String,

    /// XPath for the trade table inside the panel.
    pub row_container: String,

    /// CSS for rows, relative to the container.
    pub row: String,

    /// CSS for text-bearing cells, relative to a row.
    pub cell: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            sign_in_link_class: "top_link".to_string(),
            details_class: "text-lookup".to_string(),
            email_input: "input[type='email']".to_string(),
            email_placeholder_hint: "@".to_string(),
            password_input: "input[type='password']".to_string(),
            row_container: "//div[contains(@class, 'layer')]//table | //div[contains(@role, 'dialog')]//table"
                .to_string(),
            row: "tr".to_string(),
            cell: "td, th, div".to_string(),
        }
    }
}

/// Where the site lives and how it is labelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin every page lives under.
    pub origin: String,

    /// Path of the login page, relative to `origin`.
    pub login_path: String,

    /// Product page used when none is given on the command line.
    pub default_product_url: String,

    pub labels: LabelConfig,

    pub selectors: SelectorConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "https://kream.co.kr".to_string(),
            login_path: "/login".to_string(),
            default_product_url: "https://kream.co.kr/products/83900".to_string(),
            labels: LabelConfig::default(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// Timeouts and settle delays.
///
/// Settle delays cover client-side rendering that exposes no readiness
/// signal; every wait on an observable condition uses `wait_timeout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Upper bound for every block-wait on page state.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub wait_timeout: Duration,

    /// Interval between polls while block-waiting.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub poll_interval: Duration,

    /// Pause after scrolling an element into view, before clicking it.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub click_settle: Duration,

    /// Pause after reaching the login page, before looking up the form.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub login_render_settle: Duration,

    /// Pause after filling the form, before re-reading the field values.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub field_settle: Duration,

    /// Pause after authentication, before looking for the activation control.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub page_settle: Duration,

    /// Pause after activating the panel, before confirming it opened.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub activation_settle: Duration,

    /// Pause before the first look at the panel's rows.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub panel_render_settle: Duration,

    /// Pause after each scroll-to-bottom.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub scroll_settle: Duration,

    /// Wall-clock budget for the scroll loop.
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_duration")]
    pub pagination_budget: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
            click_settle: Duration::from_millis(300),
            login_render_settle: Duration::from_millis(1500),
            field_settle: Duration::from_millis(500),
            page_settle: Duration::from_secs(2),
            activation_settle: Duration::from_millis(500),
            panel_render_settle: Duration::from_millis(1500),
            scroll_settle: Duration::from_secs(1),
            pagination_budget: Duration::from_secs(5 * 60),
        }
    }
}

impl TimingConfig {
    /// Near-zero timings for driving a scripted page.
    pub fn instant() -> Self {
        let tick = Duration::from_millis(1);
        Self {
            wait_timeout: Duration::from_millis(20),
            poll_interval: tick,
            click_settle: Duration::ZERO,
            login_render_settle: Duration::ZERO,
            field_settle: Duration::ZERO,
            page_settle: Duration::ZERO,
            activation_settle: Duration::ZERO,
            panel_render_settle: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            pagination_budget: Duration::from_secs(5),
        }
    }
}

/// Scroll loop bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Maximum scroll-to-bottom rounds before settling for the rows seen so far.
    pub max_iterations: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
        }
    }
}

/// How the login form is submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStrategy {
    /// Press Enter in the password field.
    #[default]
    Enter,
    /// Wait for the sign-in button to be enabled and click it.
    Button,
}

/// Authentication behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub submit: SubmitStrategy,

    /// Abort the run if the login page is still showing after submitting.
    /// When false this is reported as a warning and scraping continues.
    pub require_authenticated: bool,
}

/// Browser launch settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,

    /// Chrome/Chromium executable. Auto-detected when unset.
    pub chrome_path: Option<PathBuf>,

    /// Persistent profile directory. A throwaway profile is used when unset.
    pub profile_dir: Option<PathBuf>,

    /// Extra command-line arguments for the browser.
    pub args: Vec<String>,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output file. `.tsv` selects tab separation, anything else CSV.
    pub output: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("kream_83900.csv"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub timing: TimingConfig,
    pub pagination: PaginationConfig,
    pub auth: AuthConfig,
    pub browser: BrowserSettings,
    pub export: ExportConfig,
    pub credentials: CredentialConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./kream-trades.toml` if it exists in current directory
/// 2. `~/.local/share/kream-trades/kream-trades.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("kream-trades.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("kream-trades").join("kream-trades.toml");
    }

    local_config
}

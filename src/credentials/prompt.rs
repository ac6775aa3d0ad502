//! Interactive credential prompt.

use anyhow::{Context, Result};
use dialoguer::console::Term;
use dialoguer::{theme::ColorfulTheme, Input, Password};

use super::Credentials;

/// Ask for the email and password on the terminal.
///
/// `email` pre-fills the email prompt when one is already known.
pub fn prompt_credentials(email: Option<&str>) -> Result<Credentials> {
    let term = Term::stderr();
    let theme = ColorfulTheme::default();

    let email = match email {
        Some(email) if !email.trim().is_empty() => email.trim().to_string(),
        _ => Input::<String>::with_theme(&theme)
            .with_prompt("KREAM email")
            .interact_text_on(&term)
            .context("Failed to read email")?
            .trim()
            .to_string(),
    };

    let password = Password::with_theme(&theme)
        .with_prompt("KREAM password")
        .interact_on(&term)
        .context("Failed to read password")?;

    Ok(Credentials::new(email, password))
}

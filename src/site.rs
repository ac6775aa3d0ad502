//! Locators and locations derived from the site configuration.

use crate::browser::Locator;
use crate::config::SiteConfig;
use crate::location::NavigationTarget;

/// Everything the scraper needs to know about the target site's pages.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    config: SiteConfig,
    login: NavigationTarget,
}

impl SiteProfile {
    pub fn new(config: SiteConfig) -> Self {
        let login = NavigationTarget::new(format!(
            "{}/{}",
            config.origin.trim_end_matches('/'),
            config.login_path.trim_start_matches('/')
        ));
        Self { config, login }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn login_page(&self) -> &NavigationTarget {
        &self.login
    }

    pub fn default_product(&self) -> NavigationTarget {
        NavigationTarget::new(self.config.default_product_url.clone())
    }

    /// Header link leading to the login page.
    pub fn sign_in_link(&self) -> Locator {
        Locator::xpath(format!(
            "//a[contains(@class, {}) and contains(normalize-space(.), {})]",
            xpath_literal(&self.config.selectors.sign_in_link_class),
            xpath_literal(&self.config.labels.sign_in)
        ))
    }

    pub fn email_input(&self) -> Locator {
        let selectors = &self.config.selectors;
        if selectors.email_placeholder_hint.is_empty() {
            return Locator::css(selectors.email_input.clone());
        }
        Locator::css(format!(
            "{}[placeholder*={}]",
            selectors.email_input,
            css_string(&selectors.email_placeholder_hint)
        ))
    }

    pub fn password_input(&self) -> Locator {
        Locator::css(self.config.selectors.password_input.clone())
    }

    /// Form button carrying the sign-in label.
    pub fn submit_button(&self) -> Locator {
        Locator::xpath(format!(
            "//button[contains(normalize-space(.), {})]",
            xpath_literal(&self.config.labels.sign_in)
        ))
    }

    /// The control that opens the trade-history panel.
    pub fn activation_control(&self) -> Locator {
        Locator::xpath(format!(
            "//*[contains(@class, {}) and contains(normalize-space(.), {})]",
            xpath_literal(&self.config.selectors.details_class),
            xpath_literal(&self.config.labels.details)
        ))
    }

    /// Any element whose own text carries one of the panel headings.
    pub fn panel_heading(&self) -> Locator {
        let phrases: Vec<String> = self
            .config
            .labels
            .trade_history
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| format!("contains(text(), {})", xpath_literal(p)))
            .collect();
        if phrases.is_empty() {
            // Nothing to match; an always-false predicate keeps the locator valid.
            return Locator::xpath("//*[false()]");
        }
        Locator::xpath(format!("//*[{}]", phrases.join(" or ")))
    }

    pub fn row_container(&self) -> Locator {
        Locator::xpath(self.config.selectors.row_container.clone())
    }

    pub fn row_selector(&self) -> &str {
        &self.config.selectors.row
    }

    pub fn cell_selector(&self) -> &str {
        &self.config.selectors.cell
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::new(SiteConfig::default())
    }
}

/// Quote `s` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so text containing both quote kinds is
/// assembled with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    let parts: Vec<String> = s
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Quote `s` as a CSS string.
fn css_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_is_under_origin() {
        let mut config = SiteConfig::default();
        config.origin = "https://kream.co.kr/".to_string();
        let site = SiteProfile::new(config);
        assert_eq!(site.login_page().raw(), "https://kream.co.kr/login");
        assert!(site.login_page().matches("https://kream.co.kr/login?return_url=/"));
    }

    #[test]
    fn xpath_literal_picks_a_safe_quote() {
        assert_eq!(xpath_literal("로그인"), "'로그인'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"a'b"c"#),
            r#"concat('a', "'", 'b"c')"#
        );
    }

    #[test]
    fn default_locators_carry_labels_and_hints() {
        let site = SiteProfile::default();
        assert_eq!(
            site.sign_in_link(),
            Locator::xpath(
                "//a[contains(@class, 'top_link') and contains(normalize-space(.), '로그인')]"
            )
        );
        assert_eq!(
            site.activation_control(),
            Locator::xpath(
                "//*[contains(@class, 'text-lookup') and contains(normalize-space(.), '자세히')]"
            )
        );
        assert_eq!(
            site.panel_heading(),
            Locator::xpath("//*[contains(text(), '체결 거래') or contains(text(), '거래 내역')]")
        );
        assert_eq!(
            site.email_input(),
            Locator::css("input[type='email'][placeholder*=\"@\"]")
        );
    }

    #[test]
    fn empty_placeholder_hint_drops_the_filter() {
        let mut config = SiteConfig::default();
        config.selectors.email_placeholder_hint.clear();
        let site = SiteProfile::new(config);
        assert_eq!(site.email_input(), Locator::css("input[type='email']"));
    }

    #[test]
    fn no_panel_phrases_never_matches() {
        let mut config = SiteConfig::default();
        config.labels.trade_history = vec![" ".to_string()];
        let site = SiteProfile::new(config);
        assert_eq!(site.panel_heading(), Locator::xpath("//*[false()]"));
    }
}

use anyhow::Result;

use super::{settle, wait_until, ScrapeError, SoftFailure, Step, StepContext, StepOutcome};
use crate::browser::BrowserDriver;
use crate::config::TimingConfig;
use crate::site::SiteProfile;

/// Opens the trade-history panel from the product page.
pub struct ModalActivator<'a, D: BrowserDriver> {
    driver: &'a D,
    site: &'a SiteProfile,
    timing: &'a TimingConfig,
}

impl<'a, D: BrowserDriver> ModalActivator<'a, D> {
    pub fn new(driver: &'a D, site: &'a SiteProfile, timing: &'a TimingConfig) -> Self {
        Self {
            driver,
            site,
            timing,
        }
    }

    /// Click the "details" control and wait for a panel heading.
    ///
    /// A missing control is fatal. A heading that never shows up is not:
    /// the rows may still be readable.
    pub async fn activate(&self) -> Result<StepOutcome, ScrapeError> {
        let control = self.wait_for_control().await?;

        self.driver
            .scroll_into_view(&control)
            .await
            .during(Step::ModalActivation)?;
        settle(self.timing.click_settle).await;

        let target = match self.driver.interactive_target(&control).await {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!(error = %e, "No interactive ancestor; clicking control itself");
                control
            }
        };
        click_with_fallback(self.driver, &target)
            .await
            .during(Step::ModalActivation)?;
        settle(self.timing.activation_settle).await;

        let driver = self.driver;
        let heading = &self.site.panel_heading();
        let confirmed = wait_until(self.timing.wait_timeout, self.timing.poll_interval, || async move {
            Ok(driver.find(heading).await?.map(|_| ()))
        })
        .await;

        match confirmed {
            Some(()) => {
                tracing::info!("Trade history panel opened");
                Ok(StepOutcome::Success)
            }
            None => {
                tracing::warn!(
                    locator = %heading,
                    "Trade history heading not found; reading rows anyway"
                );
                Ok(StepOutcome::Soft(SoftFailure::PanelConfirmationTimeout))
            }
        }
    }

    async fn wait_for_control(&self) -> Result<D::Element, ScrapeError> {
        let driver = self.driver;
        let locator = &self.site.activation_control();
        wait_until(self.timing.wait_timeout, self.timing.poll_interval, || async move {
            for candidate in driver.find_all(locator).await? {
                if driver.is_interactable(&candidate).await? {
                    return Ok(Some(candidate));
                }
            }
            Ok(None)
        })
        .await
        .ok_or_else(|| ScrapeError::required(Step::ModalActivation, locator))
    }
}

/// Pointer click, falling back to a DOM click if the pointer click is
/// rejected (element covered, off-screen, animating).
pub(crate) async fn click_with_fallback<D: BrowserDriver>(
    driver: &D,
    element: &D::Element,
) -> Result<()> {
    match driver.pointer_click(element).await {
        Ok(()) => {
            tracing::debug!("Pointer click delivered");
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Pointer click failed; trying DOM click");
            driver.dom_click(element).await?;
            tracing::debug!("DOM click delivered");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{DriverAction, NodeId, ScriptedBrowser};

    /// A label inside a clickable wrapper that reveals the panel heading.
    fn panel_page(browser: &ScriptedBrowser, site: &SiteProfile) -> (NodeId, NodeId) {
        let label = browser.element("자세히");
        let button = browser.element("");
        browser.set_parent(label, button);
        browser.set_interactive(button);
        browser.expose(&site.activation_control(), label);

        let heading = browser.detached_element("체결 거래");
        browser.expose(&site.panel_heading(), heading);
        browser.on_click_attach(button, heading);
        (label, button)
    }

    #[tokio::test]
    async fn clicks_interactive_ancestor_and_confirms_panel() -> Result<(), ScrapeError> {
        let browser = ScriptedBrowser::new("https://kream.co.kr/products/83900");
        let site = SiteProfile::default();
        let timing = TimingConfig::instant();
        let (label, button) = panel_page(&browser, &site);

        let outcome = ModalActivator::new(&browser, &site, &timing).activate().await?;

        assert!(outcome.is_success());
        assert_eq!(
            browser.actions(),
            vec![
                DriverAction::ScrollIntoView(label),
                DriverAction::PointerClick(button),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn rejected_pointer_click_falls_back_to_dom_click() -> Result<(), ScrapeError> {
        let browser = ScriptedBrowser::new("https://kream.co.kr/products/83900");
        let site = SiteProfile::default();
        let timing = TimingConfig::instant();
        let (_, button) = panel_page(&browser, &site);
        browser.fail_pointer_clicks(button);

        let outcome = ModalActivator::new(&browser, &site, &timing).activate().await?;

        assert!(outcome.is_success());
        assert!(browser.actions().contains(&DriverAction::DomClick(button)));
        Ok(())
    }

    #[tokio::test]
    async fn failed_dom_click_after_pointer_click_is_fatal() {
        let browser = ScriptedBrowser::new("https://kream.co.kr/products/83900");
        let site = SiteProfile::default();
        let timing = TimingConfig::instant();
        let (label, button) = panel_page(&browser, &site);
        // The wrapper was dropped from the document; neither click can land.
        let detached = browser.detached_element("");
        browser.set_parent(label, detached);
        browser.set_interactive(detached);

        let err = ModalActivator::new(&browser, &site, &timing)
            .activate()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScrapeError::Browser {
                step: Step::ModalActivation,
                ..
            }
        ));
        let actions = browser.actions();
        assert_eq!(actions, vec![DriverAction::ScrollIntoView(label)]);
        assert!(!actions.contains(&DriverAction::DomClick(detached)));
        assert!(!actions.contains(&DriverAction::PointerClick(button)));
    }

    #[tokio::test]
    async fn missing_control_is_fatal() {
        let browser = ScriptedBrowser::new("https://kream.co.kr/products/83900");
        let site = SiteProfile::default();
        let timing = TimingConfig::instant();

        let err = ModalActivator::new(&browser, &site, &timing)
            .activate()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScrapeError::RequiredElementNotFound {
                step: Step::ModalActivation,
                ..
            }
        ));
        assert!(browser.actions().is_empty());
    }

    #[tokio::test]
    async fn hidden_control_is_not_clicked() {
        let browser = ScriptedBrowser::new("https://kream.co.kr/products/83900");
        let site = SiteProfile::default();
        let timing = TimingConfig::instant();
        let (label, _) = panel_page(&browser, &site);
        browser.set_hidden(label);

        let result = ModalActivator::new(&browser, &site, &timing).activate().await;

        assert!(result.is_err());
        assert!(browser.actions().is_empty());
    }

    #[tokio::test]
    async fn missing_heading_is_soft() -> Result<(), ScrapeError> {
        let browser = ScriptedBrowser::new("https://kream.co.kr/products/83900");
        let site = SiteProfile::default();
        let timing = TimingConfig::instant();
        let label = browser.element("자세히");
        browser.expose(&site.activation_control(), label);

        let outcome = ModalActivator::new(&browser, &site, &timing).activate().await?;

        assert_eq!(outcome, StepOutcome::Soft(SoftFailure::PanelConfirmationTimeout));
        assert!(browser.actions().contains(&DriverAction::PointerClick(label)));
        Ok(())
    }
}

use super::{wait_until, ScrapeError, SoftFailure, StepOutcome};
use crate::browser::BrowserDriver;
use crate::config::TimingConfig;
use crate::location::NavigationTarget;

/// Idempotent navigation.
///
/// Reloading a page the browser is already on can invalidate short-lived
/// server-issued tokens, so a navigation whose normalized target equals the
/// normalized current location is skipped.
pub struct NavigationController<'a, D: BrowserDriver> {
    driver: &'a D,
    timing: &'a TimingConfig,
}

impl<'a, D: BrowserDriver> NavigationController<'a, D> {
    pub fn new(driver: &'a D, timing: &'a TimingConfig) -> Self {
        Self { driver, timing }
    }

    /// Go to `target` unless already there, then wait for the location to
    /// match. A location that never matches is a soft failure.
    pub async fn navigate_if_needed(
        &self,
        target: Option<&NavigationTarget>,
    ) -> Result<StepOutcome, ScrapeError> {
        let Some(target) = target.filter(|t| !t.is_blank()) else {
            return Ok(StepOutcome::Success);
        };

        match self.driver.current_url().await {
            Ok(current) if target.matches(&current) => {
                tracing::debug!(
                    target = target.normalized(),
                    "Already at target; skipping navigation"
                );
                return Ok(StepOutcome::Success);
            }
            Ok(current) => tracing::debug!(from = %current, to = %target, "Navigating"),
            Err(e) => {
                tracing::warn!(
                    target = %target,
                    error = %e,
                    "Could not read current location; navigating anyway"
                );
            }
        }

        if let Err(e) = self.driver.goto(target.raw()).await {
            // The page may still get there; the wait below decides.
            tracing::warn!(target = %target, error = %e, "Navigation request failed");
        }

        if self.wait_for_location(|url| target.matches(url)).await.is_some() {
            return Ok(StepOutcome::Success);
        }

        let location = self.driver.current_url().await.unwrap_or_default();
        tracing::warn!(
            target = %target,
            location = %location,
            timeout_ms = self.timing.wait_timeout.as_millis() as u64,
            "Timed out waiting for navigation; continuing"
        );
        Ok(StepOutcome::Soft(SoftFailure::NavigationTimeout {
            target: target.raw().to_string(),
            location,
        }))
    }

    /// Wait up to the configured timeout for a location accepted by
    /// `accept`, returning it.
    pub async fn wait_for_location<P>(&self, accept: P) -> Option<String>
    where
        P: Fn(&str) -> bool + Sync,
    {
        let driver = self.driver;
        let accept = &accept;
        wait_until(self.timing.wait_timeout, self.timing.poll_interval, || async move {
            let url = driver.current_url().await?;
            Ok(accept(&url).then_some(url))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::ScriptedBrowser;

    #[tokio::test]
    async fn absent_target_is_a_no_op() -> Result<(), ScrapeError> {
        let browser = ScriptedBrowser::new("https://kream.co.kr/");
        let timing = TimingConfig::instant();
        let outcome = NavigationController::new(&browser, &timing)
            .navigate_if_needed(None)
            .await?;
        assert!(outcome.is_success());
        assert!(browser.navigations().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn equal_normalized_location_issues_no_navigation() -> Result<(), ScrapeError> {
        let browser = ScriptedBrowser::new("https://kream.co.kr/products/83900/?tab=1");
        let timing = TimingConfig::instant();
        let target = NavigationTarget::new("https://kream.co.kr/products/83900");
        let outcome = NavigationController::new(&browser, &timing)
            .navigate_if_needed(Some(&target))
            .await?;
        assert!(outcome.is_success());
        assert!(browser.navigations().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn navigates_when_elsewhere() -> Result<(), ScrapeError> {
        let browser = ScriptedBrowser::new("about:blank");
        let timing = TimingConfig::instant();
        let target = NavigationTarget::new("https://kream.co.kr/products/83900");
        let outcome = NavigationController::new(&browser, &timing)
            .navigate_if_needed(Some(&target))
            .await?;
        assert!(outcome.is_success());
        assert_eq!(browser.navigations(), vec!["https://kream.co.kr/products/83900"]);
        Ok(())
    }

    #[tokio::test]
    async fn blank_target_is_a_no_op() -> Result<(), ScrapeError> {
        let browser = ScriptedBrowser::new("https://kream.co.kr/");
        let timing = TimingConfig::instant();
        let target = NavigationTarget::new("");
        let outcome = NavigationController::new(&browser, &timing)
            .navigate_if_needed(Some(&target))
            .await?;
        assert!(outcome.is_success());
        assert!(browser.navigations().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_location_still_navigates() -> Result<(), ScrapeError> {
        let browser = ScriptedBrowser::new("about:blank");
        browser.fail_url_reads(1);
        let timing = TimingConfig::instant();
        let target = NavigationTarget::new("https://kream.co.kr/products/83900");
        let outcome = NavigationController::new(&browser, &timing)
            .navigate_if_needed(Some(&target))
            .await?;
        assert!(outcome.is_success());
        assert_eq!(browser.navigations(), vec!["https://kream.co.kr/products/83900"]);
        Ok(())
    }

    #[tokio::test]
    async fn redirect_elsewhere_is_a_soft_timeout() -> Result<(), ScrapeError> {
        let browser = ScriptedBrowser::new("about:blank");
        browser.redirect("https://kream.co.kr/products/1", "https://kream.co.kr/");
        let timing = TimingConfig::instant();
        let target = NavigationTarget::new("https://kream.co.kr/products/1");
        let outcome = NavigationController::new(&browser, &timing)
            .navigate_if_needed(Some(&target))
            .await?;
        assert_eq!(
            outcome,
            StepOutcome::Soft(SoftFailure::NavigationTimeout {
                target: "https://kream.co.kr/products/1".to_string(),
                location: "https://kream.co.kr/".to_string(),
            })
        );
        Ok(())
    }
}

use std::time::Instant;

use super::{settle, wait_until, ScrapeError, SoftFailure, Step, StepContext, StepOutcome};
use crate::browser::BrowserDriver;
use crate::config::{PaginationConfig, TimingConfig};
use crate::site::SiteProfile;

/// Row handles gathered once the scroll loop stops.
#[derive(Debug)]
pub struct PageCollection<E> {
    /// Rows in document order, read after the loop ended.
    pub rows: Vec<E>,
    /// Scroll rounds performed.
    pub iterations: usize,
    /// `Soft` if the loop was cut off by its budget.
    pub outcome: StepOutcome,
}

/// Scrolls the page until the trade-history row count stops changing.
///
/// Rows are loaded lazily as the page is scrolled. The loop ends at the
/// first scroll that adds no rows, or when either the iteration cap or the
/// wall-clock budget runs out, in which case the rows seen so far are kept.
pub struct PaginationScraper<'a, D: BrowserDriver> {
    driver: &'a D,
    site: &'a SiteProfile,
    timing: &'a TimingConfig,
    limits: &'a PaginationConfig,
}

impl<'a, D: BrowserDriver> PaginationScraper<'a, D> {
    pub fn new(
        driver: &'a D,
        site: &'a SiteProfile,
        timing: &'a TimingConfig,
        limits: &'a PaginationConfig,
    ) -> Self {
        Self {
            driver,
            site,
            timing,
            limits,
        }
    }

    pub async fn collect_all(&self) -> Result<PageCollection<D::Element>, ScrapeError> {
        settle(self.timing.panel_render_settle).await;
        let mut container = self.wait_for_container().await?;

        let started = Instant::now();
        let mut previous: Option<usize> = None;
        let mut iterations = 0;
        let mut outcome = StepOutcome::Success;

        loop {
            let count = self.read_rows(&mut container).await?.len();
            if previous == Some(count) {
                tracing::debug!(rows = count, iterations, "Row count settled");
                break;
            }
            previous = Some(count);

            if iterations >= self.limits.max_iterations
                || started.elapsed() >= self.timing.pagination_budget
            {
                tracing::warn!(
                    rows = count,
                    iterations,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Row count still changing; stopping with rows loaded so far"
                );
                outcome = StepOutcome::Soft(SoftFailure::PaginationBudgetExhausted {
                    iterations,
                    rows: count,
                });
                break;
            }

            tracing::debug!(rows = count, iteration = iterations + 1, "Scrolling for more rows");
            self.driver
                .scroll_to_bottom()
                .await
                .during(Step::Pagination)?;
            settle(self.timing.scroll_settle).await;
            iterations += 1;
        }

        // Rows added by the last scroll may not have been counted yet.
        let rows = self.read_rows(&mut container).await?;
        tracing::info!(rows = rows.len(), scrolls = iterations, "Trade history rows loaded");

        Ok(PageCollection {
            rows,
            iterations,
            outcome,
        })
    }

    async fn wait_for_container(&self) -> Result<D::Element, ScrapeError> {
        let driver = self.driver;
        let locator = &self.site.row_container();
        wait_until(self.timing.wait_timeout, self.timing.poll_interval, || async move {
            driver.find(locator).await
        })
        .await
        .ok_or_else(|| ScrapeError::required(Step::Pagination, locator))
    }

    /// Rows under `container`. A container dropped by a re-render is looked
    /// up again once.
    async fn read_rows(&self, container: &mut D::Element) -> Result<Vec<D::Element>, ScrapeError> {
        match self.driver.find_within(container, self.site.row_selector()).await {
            Ok(rows) => Ok(rows),
            Err(e) => {
                tracing::debug!(error = %e, "Row container went stale; locating it again");
                *container = self.wait_for_container().await?;
                self.driver
                    .find_within(container, self.site.row_selector())
                    .await
                    .during(Step::Pagination)
            }
        }
    }
}

//! The scraping pipeline.
//!
//! `authenticate → re-check product page → open panel → scroll until the
//! row count stops changing → map rows to records`, run strictly in order
//! against one [`BrowserDriver`]. Fatal conditions are [`ScrapeError`]s;
//! conditions the run can survive are [`SoftFailure`]s collected in the
//! [`ScrapeReport`].

mod auth;
mod extract;
mod modal;
mod navigation;
mod pagination;
mod wait;

pub use auth::{AuthReport, AuthState, AuthenticationFlow, Session};
pub use extract::RecordExtractor;
pub use modal::ModalActivator;
pub use navigation::NavigationController;
pub use pagination::{PageCollection, PaginationScraper};
pub use wait::{settle, wait_until};

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::browser::{BrowserDriver, Locator};
use crate::config::{AuthConfig, Config, PaginationConfig, TimingConfig};
use crate::credentials::Credentials;
use crate::export::ExportSink;
use crate::location::NavigationTarget;
use crate::models::ScrapeResult;
use crate::site::SiteProfile;

/// Pipeline stage, used to say where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Navigation,
    Authentication,
    ModalActivation,
    Pagination,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Navigation => "navigation",
            Step::Authentication => "authentication",
            Step::ModalActivation => "trade history activation",
            Step::Pagination => "trade history pagination",
        };
        f.write_str(name)
    }
}

/// Conditions that abort the run.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("required element not found during {step}: {locator}")]
    RequiredElementNotFound { step: Step, locator: Locator },

    #[error("still on the login page after submitting; check credentials or extra verification")]
    AuthenticationFailed,

    #[error("browser error during {step}: {source:#}")]
    Browser {
        step: Step,
        #[source]
        source: anyhow::Error,
    },

    #[error("export failed: {0:#}")]
    Export(#[source] anyhow::Error),
}

impl ScrapeError {
    pub fn required(step: Step, locator: &Locator) -> Self {
        ScrapeError::RequiredElementNotFound {
            step,
            locator: locator.clone(),
        }
    }
}

/// Attach the pipeline step to a driver error.
pub(crate) trait StepContext<T> {
    fn during(self, step: Step) -> Result<T, ScrapeError>;
}

impl<T> StepContext<T> for anyhow::Result<T> {
    fn during(self, step: Step) -> Result<T, ScrapeError> {
        self.map_err(|source| ScrapeError::Browser { step, source })
    }
}

/// Conditions that are reported but do not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftFailure {
    /// The location never matched the navigation target.
    NavigationTimeout { target: String, location: String },
    /// Still on the login page after submitting the form.
    AuthenticationTimeout,
    /// None of the trade-history headings appeared after activation.
    PanelConfirmationTimeout,
    /// The scroll loop hit its iteration or time budget before the row
    /// count settled.
    PaginationBudgetExhausted { iterations: usize, rows: usize },
}

impl fmt::Display for SoftFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftFailure::NavigationTimeout { target, location } => {
                write!(f, "navigation to {target} did not complete (at {location})")
            }
            SoftFailure::AuthenticationTimeout => {
                f.write_str("still on the login page after submitting")
            }
            SoftFailure::PanelConfirmationTimeout => {
                f.write_str("could not confirm that the trade history panel opened")
            }
            SoftFailure::PaginationBudgetExhausted { iterations, rows } => write!(
                f,
                "row count still changing after {iterations} scrolls; keeping {rows} rows"
            ),
        }
    }
}

/// Result of a non-fatal step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum StepOutcome {
    Success,
    Soft(SoftFailure),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }

    /// Move a soft failure, if any, into `warnings`.
    pub fn record(self, warnings: &mut Vec<SoftFailure>) {
        if let StepOutcome::Soft(failure) = self {
            warnings.push(failure);
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub records: ScrapeResult,
    pub authenticated: bool,
    /// Rows present in the panel when extraction ran.
    pub rows_seen: usize,
    /// Scroll rounds performed.
    pub scrolls: usize,
    /// Records written by the export sink, if the run exported.
    pub exported: usize,
    pub warnings: Vec<SoftFailure>,
    /// When the rows were read.
    pub scraped_at: DateTime<Utc>,
}

/// Knobs for the pipeline, usually derived from [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ScrapeSettings {
    pub site: SiteProfile,
    pub timing: TimingConfig,
    pub pagination: PaginationConfig,
    pub auth: AuthConfig,
}

impl ScrapeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            site: SiteProfile::new(config.site.clone()),
            timing: config.timing.clone(),
            pagination: config.pagination.clone(),
            auth: config.auth.clone(),
        }
    }
}

/// Top-level flow over a single page.
pub struct TradeHistoryScraper<'a, D: BrowserDriver> {
    driver: &'a D,
    settings: ScrapeSettings,
}

impl<'a, D: BrowserDriver> TradeHistoryScraper<'a, D> {
    pub fn new(driver: &'a D, settings: ScrapeSettings) -> Self {
        Self { driver, settings }
    }

    pub fn settings(&self) -> &ScrapeSettings {
        &self.settings
    }

    fn navigation(&self) -> NavigationController<'_, D> {
        NavigationController::new(self.driver, &self.settings.timing)
    }

    fn authentication(&self) -> AuthenticationFlow<'_, D> {
        AuthenticationFlow::new(
            self.driver,
            &self.settings.site,
            &self.settings.timing,
            &self.settings.auth,
        )
    }

    /// Sign in and land on `redirect` (the default product page if `None`).
    ///
    /// Fails before touching the browser if the credentials are blank.
    pub async fn login<'c>(
        &self,
        credentials: &'c Credentials,
        redirect: Option<&NavigationTarget>,
    ) -> Result<AuthReport<'c>, ScrapeError> {
        let session = Session::new(credentials)?;
        let report = self.authentication().authenticate(session, redirect).await?;
        if !report.session.is_authenticated() && self.settings.auth.require_authenticated {
            return Err(ScrapeError::AuthenticationFailed);
        }
        Ok(report)
    }

    /// Run the whole pipeline for `product` and return the records.
    ///
    /// `redirect` overrides where to land after signing in; the product page
    /// is used otherwise.
    pub async fn run(
        &self,
        credentials: &Credentials,
        product: &NavigationTarget,
        redirect: Option<&NavigationTarget>,
    ) -> Result<ScrapeReport, ScrapeError> {
        let session = Session::new(credentials)?;
        let mut warnings = Vec::new();
        let nav = self.navigation();

        tracing::info!(product = %product, "Opening product page");
        nav.navigate_if_needed(Some(product))
            .await?
            .record(&mut warnings);

        let auth = self
            .authentication()
            .authenticate(session, redirect.or(Some(product)))
            .await?;
        let authenticated = auth.session.is_authenticated();
        if !authenticated && self.settings.auth.require_authenticated {
            return Err(ScrapeError::AuthenticationFailed);
        }
        warnings.extend(auth.warnings);

        // A post-login redirect elsewhere must not leave us off the product page.
        nav.navigate_if_needed(Some(product))
            .await?
            .record(&mut warnings);
        settle(self.settings.timing.page_settle).await;

        ModalActivator::new(self.driver, &self.settings.site, &self.settings.timing)
            .activate()
            .await?
            .record(&mut warnings);

        let collection = PaginationScraper::new(
            self.driver,
            &self.settings.site,
            &self.settings.timing,
            &self.settings.pagination,
        )
        .collect_all()
        .await?;
        collection.outcome.record(&mut warnings);

        let records = RecordExtractor::new(self.driver, &self.settings.site)
            .extract(&collection.rows)
            .await;

        tracing::info!(
            records = records.len(),
            rows = collection.rows.len(),
            warnings = warnings.len(),
            "Trade history scraped"
        );

        Ok(ScrapeReport {
            records,
            authenticated,
            rows_seen: collection.rows.len(),
            scrolls: collection.iterations,
            exported: 0,
            warnings,
            scraped_at: Utc::now(),
        })
    }

    /// [`run`](Self::run), then hand the records to `sink`.
    ///
    /// Nothing is exported if the run fails.
    pub async fn run_and_export(
        &self,
        credentials: &Credentials,
        product: &NavigationTarget,
        redirect: Option<&NavigationTarget>,
        sink: &dyn ExportSink,
        destination: &Path,
    ) -> Result<ScrapeReport, ScrapeError> {
        let mut report = self.run(credentials, product, redirect).await?;
        report.exported = sink
            .export(&report.records, destination)
            .map_err(ScrapeError::Export)?;
        Ok(report)
    }
}

//! Sign-in state machine.
//!
//! ```text
//! Unauthenticated → LocatingLoginEntry → OnLoginPage → FormFilled → Submitting
//!                                                                     ├→ Authenticated
//!                                                                     └→ StillOnLogin
//! ```
//!
//! The login form is rendered client-side and may reset its fields after
//! they are populated, so values are read back once and the form refilled
//! if needed.

use anyhow::Result;

use super::modal::click_with_fallback;
use super::{
    settle, wait_until, NavigationController, ScrapeError, SoftFailure, Step, StepContext,
};
use crate::browser::BrowserDriver;
use crate::config::{AuthConfig, SubmitStrategy, TimingConfig};
use crate::credentials::Credentials;
use crate::location::NavigationTarget;
use crate::site::SiteProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    LocatingLoginEntry,
    OnLoginPage,
    FormFilled,
    Submitting,
    Authenticated,
    StillOnLogin,
}

/// Authentication progress for one set of credentials.
///
/// Transitions consume the session and return the next one.
#[derive(Debug)]
pub struct Session<'c> {
    credentials: &'c Credentials,
    location: String,
    state: AuthState,
}

impl<'c> Session<'c> {
    /// Start a session. Blank credentials are rejected here, before any
    /// browser interaction.
    pub fn new(credentials: &'c Credentials) -> Result<Self, ScrapeError> {
        credentials.validate()?;
        Ok(Self {
            credentials,
            location: String::new(),
            state: AuthState::Unauthenticated,
        })
    }

    fn advance(self, state: AuthState, location: impl Into<String>) -> Self {
        let location = location.into();
        tracing::debug!(from = ?self.state, to = ?state, location = %location, "Auth transition");
        Self {
            state,
            location,
            ..self
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Location observed at the last transition.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    fn email(&self) -> &'c str {
        self.credentials.email()
    }

    fn password(&self) -> &'c str {
        self.credentials.password()
    }
}

/// Final session plus anything that went softly wrong on the way.
#[derive(Debug)]
pub struct AuthReport<'c> {
    pub session: Session<'c>,
    pub warnings: Vec<SoftFailure>,
}

pub struct AuthenticationFlow<'a, D: BrowserDriver> {
    driver: &'a D,
    site: &'a SiteProfile,
    timing: &'a TimingConfig,
    auth: &'a AuthConfig,
}

impl<'a, D: BrowserDriver> AuthenticationFlow<'a, D> {
    pub fn new(
        driver: &'a D,
        site: &'a SiteProfile,
        timing: &'a TimingConfig,
        auth: &'a AuthConfig,
    ) -> Self {
        Self {
            driver,
            site,
            timing,
            auth,
        }
    }

    fn navigation(&self) -> NavigationController<'a, D> {
        NavigationController::new(self.driver, self.timing)
    }

    async fn location(&self) -> Result<String, ScrapeError> {
        self.driver.current_url().await.during(Step::Authentication)
    }

    /// Drive `session` to `Authenticated` or `StillOnLogin`.
    ///
    /// Once authenticated, navigates (idempotently) to `redirect`, or the
    /// default product page when `None`.
    pub async fn authenticate<'c>(
        &self,
        session: Session<'c>,
        redirect: Option<&NavigationTarget>,
    ) -> Result<AuthReport<'c>, ScrapeError> {
        let mut warnings = Vec::new();
        let login = self.site.login_page();

        let session = session.advance(AuthState::LocatingLoginEntry, self.location().await?);
        self.follow_sign_in_link().await;

        let current = self.location().await?;
        if !login.matches(&current) {
            tracing::debug!(login = %login, "Loading login page directly");
            if let Err(e) = self.driver.goto(login.raw()).await {
                tracing::warn!(error = %e, "Failed to load login page");
            }
        }
        settle(self.timing.login_render_settle).await;

        let current = self.location().await?;
        let session = if !login.matches(&current) {
            // The site sends signed-in users away from the login page.
            tracing::info!(location = %current, "Not on login page; already signed in");
            session.advance(AuthState::Authenticated, current)
        } else {
            let session = session.advance(AuthState::OnLoginPage, current);
            let password_field = self.fill_form(&session).await?;
            let session = session.advance(AuthState::FormFilled, self.location().await?);

            self.submit(&password_field).await?;
            let session = session.advance(AuthState::Submitting, self.location().await?);

            match self.navigation().wait_for_location(|url| !login.matches(url)).await {
                Some(location) => {
                    tracing::info!(location = %location, "Signed in");
                    session.advance(AuthState::Authenticated, location)
                }
                None => {
                    tracing::warn!(
                        "Still on login page after submitting. Check credentials or extra verification."
                    );
                    warnings.push(SoftFailure::AuthenticationTimeout);
                    let location = self.location().await?;
                    session.advance(AuthState::StillOnLogin, location)
                }
            }
        };

        if session.is_authenticated() {
            let target = redirect
                .cloned()
                .unwrap_or_else(|| self.site.default_product());
            self.navigation()
                .navigate_if_needed(Some(&target))
                .await?
                .record(&mut warnings);
        }

        Ok(AuthReport { session, warnings })
    }

    /// Click the header sign-in link if the page has one. Its absence is
    /// normal (already on the login page, or signed in).
    async fn follow_sign_in_link(&self) {
        match self.try_follow_sign_in_link().await {
            Ok(true) => {
                let login = self.site.login_page();
                if self
                    .navigation()
                    .wait_for_location(|url| login.matches(url))
                    .await
                    .is_none()
                {
                    tracing::debug!("Sign-in link did not lead to the login page");
                }
            }
            Ok(false) => tracing::debug!("No sign-in link on page"),
            Err(e) => tracing::debug!(error = %e, "Could not use sign-in link"),
        }
    }

    async fn try_follow_sign_in_link(&self) -> Result<bool> {
        let Some(link) = self.driver.find(&self.site.sign_in_link()).await? else {
            return Ok(false);
        };
        self.driver.scroll_into_view(&link).await?;
        settle(self.timing.click_settle).await;
        self.driver.pointer_click(&link).await?;
        Ok(true)
    }

    async fn locate_form(&self) -> Result<(D::Element, D::Element), ScrapeError> {
        let driver = self.driver;
        let email_locator = &self.site.email_input();
        let password_locator = &self.site.password_input();

        let email = wait_until(self.timing.wait_timeout, self.timing.poll_interval, || async move {
            driver.find(email_locator).await
        })
        .await
        .ok_or_else(|| ScrapeError::required(Step::Authentication, email_locator))?;

        let password = self
            .driver
            .find(password_locator)
            .await
            .during(Step::Authentication)?
            .ok_or_else(|| ScrapeError::required(Step::Authentication, password_locator))?;

        Ok((email, password))
    }

    async fn fill(
        &self,
        email_field: &D::Element,
        password_field: &D::Element,
        session: &Session<'_>,
    ) -> Result<(), ScrapeError> {
        self.driver
            .clear_and_type(email_field, session.email())
            .await
            .during(Step::Authentication)?;
        self.driver
            .clear_and_type(password_field, session.password())
            .await
            .during(Step::Authentication)
    }

    /// Whether the fields still hold what was typed. Unreadable fields
    /// (replaced by a re-render) count as not holding it.
    async fn form_holds(
        &self,
        email_field: &D::Element,
        password_field: &D::Element,
        session: &Session<'_>,
    ) -> bool {
        let email = self.driver.value(email_field).await;
        let password = self.driver.value(password_field).await;
        match (email, password) {
            (Ok(email), Ok(password)) => email == session.email() && !password.is_empty(),
            _ => false,
        }
    }

    /// Fill the form, re-filling once if the page reset it. Returns the
    /// password field to submit from.
    async fn fill_form(&self, session: &Session<'_>) -> Result<D::Element, ScrapeError> {
        let (email_field, password_field) = self.locate_form().await?;
        self.fill(&email_field, &password_field, session).await?;
        settle(self.timing.field_settle).await;

        if self.form_holds(&email_field, &password_field, session).await {
            return Ok(password_field);
        }

        tracing::info!("Login form was reset after filling; filling again");
        let (email_field, password_field) = self.locate_form().await?;
        self.fill(&email_field, &password_field, session).await?;
        Ok(password_field)
    }

    async fn submit(&self, password_field: &D::Element) -> Result<(), ScrapeError> {
        match self.auth.submit {
            SubmitStrategy::Enter => self
                .driver
                .press_enter(password_field)
                .await
                .during(Step::Authentication),
            SubmitStrategy::Button => self.click_submit_button().await,
        }
    }

    /// Wait for the sign-in button to lose its `disabled` attribute, then
    /// click it.
    async fn click_submit_button(&self) -> Result<(), ScrapeError> {
        let driver = self.driver;
        let locator = &self.site.submit_button();

        let button = wait_until(self.timing.wait_timeout, self.timing.poll_interval, || async move {
            let Some(button) = driver.find(locator).await? else {
                return Ok(None);
            };
            let disabled = driver.attribute(&button, "disabled").await?;
            Ok(disabled.is_none().then_some(button))
        })
        .await
        .ok_or_else(|| ScrapeError::required(Step::Authentication, locator))?;

        self.driver
            .scroll_into_view(&button)
            .await
            .during(Step::Authentication)?;
        settle(self.timing.click_settle).await;
        click_with_fallback(self.driver, &button)
            .await
            .during(Step::Authentication)
    }
}

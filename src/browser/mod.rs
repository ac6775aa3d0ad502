//! Browser automation surface.
//!
//! The scraping core only talks to a [`BrowserDriver`]. The real backend
//! drives Chrome over the DevTools protocol ([`chrome`]); [`scripted`] is an
//! in-memory page used to exercise the core without a browser.

#[cfg(feature = "chrome")]
pub mod chrome;
pub mod scripted;

#[cfg(feature = "chrome")]
pub use chrome::{ChromeDriver, ChromeSession};
pub use scripted::{DriverAction, NodeId, ScriptedBrowser};

use std::fmt;

use anyhow::Result;

/// How to find elements in the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Operations the scraper needs from a live page.
///
/// Every call is awaited to completion before the next one starts; waiting
/// for page state is done by the caller, never implicitly by the driver.
#[async_trait::async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Handle to an element in the current document.
    type Element: Clone + Send + Sync;

    /// The current location of the page.
    async fn current_url(&self) -> Result<String>;

    /// Load `url` in the page.
    async fn goto(&self, url: &str) -> Result<()>;

    /// All elements in the document matching `locator`, in document order.
    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>>;

    /// First element matching `locator`, if any.
    async fn find(&self, locator: &Locator) -> Result<Option<Self::Element>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    /// Descendants of `parent` matching a CSS selector, in document order.
    async fn find_within(&self, parent: &Self::Element, css: &str) -> Result<Vec<Self::Element>>;

    /// Rendered text of the element.
    async fn text(&self, element: &Self::Element) -> Result<String>;

    /// Current `value` property of a form control.
    async fn value(&self, element: &Self::Element) -> Result<String>;

    /// Attribute value, or `None` if the attribute is absent.
    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    /// Whether the element is visible and not disabled.
    async fn is_interactable(&self, element: &Self::Element) -> Result<bool>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<()>;

    /// Nearest ancestor (or the element itself) that is a link, a button or
    /// carries an interactive ARIA role. Falls back to `element`.
    async fn interactive_target(&self, element: &Self::Element) -> Result<Self::Element>;

    /// Simulated pointer move-and-click at the element's position.
    async fn pointer_click(&self, element: &Self::Element) -> Result<()>;

    /// Invoke the element's own `click()` behaviour.
    async fn dom_click(&self, element: &Self::Element) -> Result<()>;

    /// Clear a form control and type `text` into it.
    async fn clear_and_type(&self, element: &Self::Element, text: &str) -> Result<()>;

    /// Send the Enter key to the element.
    async fn press_enter(&self, element: &Self::Element) -> Result<()>;

    /// Scroll the window to the bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<()>;
}

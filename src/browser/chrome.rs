//! Chrome backend over the DevTools protocol.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{BrowserDriver, Locator};
use crate::config::BrowserSettings;

/// Temporary attribute used to hand an element found in JS back to CDP.
const TARGET_MARKER: &str = "data-kream-trades-target";

const INTERACTIVE_SELECTOR: &str =
    r#"a, button, [role="button"], [role="link"], [role="tab"], [role="menuitem"]"#;

/// A launched browser plus the page the scraper drives.
pub struct ChromeSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    driver: ChromeDriver,
}

impl ChromeSession {
    /// Launch Chrome/Chromium and open a blank page.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let chrome_path = match &settings.chrome_path {
            Some(path) => path.display().to_string(),
            None => find_chrome().context(
                "Chrome/Chromium not found. Install Chrome or Chromium, or set browser.chrome_path.",
            )?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .viewport(None)
            .arg("--start-maximized")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(profile_dir) = &settings.profile_dir {
            ensure_dir(profile_dir)?;
            builder = builder.user_data_dir(profile_dir);
        }
        for arg in &settings.args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to configure browser: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;
        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open browser page")?;

        tracing::debug!(headless = settings.headless, "Browser launched");

        Ok(Self {
            browser,
            handler_task,
            driver: ChromeDriver::new(page),
        })
    }

    pub fn driver(&self) -> &ChromeDriver {
        &self.driver
    }

    /// Close the browser and stop the protocol handler.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!(error = %e, "Browser close failed");
        }
        self.handler_task.abort();
    }
}

/// [`BrowserDriver`] backed by a single chromiumoxide page.
#[derive(Clone)]
pub struct ChromeDriver {
    page: Page,
}

impl ChromeDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn call_bool(element: &Element, function: &str) -> Result<bool> {
        let ret = element.call_js_fn(function, false).await?;
        Ok(ret
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

#[async_trait::async_trait]
impl BrowserDriver for ChromeDriver {
    type Element = Arc<Element>;

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {url}"))?;
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_elements(selector.as_str()).await?,
            Locator::XPath(expression) => self.page.find_xpaths(expression.as_str()).await?,
        };
        Ok(found.into_iter().map(Arc::new).collect())
    }

    async fn find_within(&self, parent: &Self::Element, css: &str) -> Result<Vec<Self::Element>> {
        let found = parent.find_elements(css).await?;
        Ok(found.into_iter().map(Arc::new).collect())
    }

    async fn text(&self, element: &Self::Element) -> Result<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn value(&self, element: &Self::Element) -> Result<String> {
        let value = element.property("value").await?;
        Ok(value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>> {
        Ok(element.attribute(name).await?)
    }

    async fn is_interactable(&self, element: &Self::Element) -> Result<bool> {
        Self::call_bool(
            element,
            "function() {
                const rect = this.getBoundingClientRect();
                const style = window.getComputedStyle(this);
                return rect.width > 0 && rect.height > 0
                    && style.visibility !== 'hidden' && style.display !== 'none'
                    && !this.disabled;
            }",
        )
        .await
    }

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<()> {
        element
            .call_js_fn("function() { this.scrollIntoView({block: 'center'}); }", false)
            .await?;
        Ok(())
    }

    async fn interactive_target(&self, element: &Self::Element) -> Result<Self::Element> {
        let mark = format!(
            "function() {{ const t = this.closest('{INTERACTIVE_SELECTOR}') || this; t.setAttribute('{TARGET_MARKER}', ''); }}"
        );
        element.call_js_fn(mark, false).await?;

        let marked = self
            .page
            .find_elements(format!("[{TARGET_MARKER}]"))
            .await?;
        self.page
            .evaluate(format!(
                "document.querySelectorAll('[{TARGET_MARKER}]').forEach(e => e.removeAttribute('{TARGET_MARKER}'))"
            ))
            .await?;

        Ok(marked
            .into_iter()
            .next()
            .map(Arc::new)
            .unwrap_or_else(|| element.clone()))
    }

    async fn pointer_click(&self, element: &Self::Element) -> Result<()> {
        element.click().await?;
        Ok(())
    }

    async fn dom_click(&self, element: &Self::Element) -> Result<()> {
        element
            .call_js_fn("function() { this.click(); }", false)
            .await?;
        Ok(())
    }

    async fn clear_and_type(&self, element: &Self::Element, text: &str) -> Result<()> {
        // Go through the native setter so framework-controlled inputs see the change.
        element
            .call_js_fn(
                "function() {
                    const proto = this instanceof HTMLTextAreaElement
                        ? HTMLTextAreaElement.prototype
                        : HTMLInputElement.prototype;
                    Object.getOwnPropertyDescriptor(proto, 'value').set.call(this, '');
                    this.dispatchEvent(new Event('input', { bubbles: true }));
                }",
                false,
            )
            .await?;
        element.focus().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn press_enter(&self, element: &Self::Element) -> Result<()> {
        element.press_key("Enter").await?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight);")
            .await?;
        Ok(())
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create profile dir: {}", dir.display()))
}

/// Find Chrome/Chromium executable.
pub fn find_chrome() -> Option<String> {
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // NixOS
        "/run/current-system/sw/bin/google-chrome",
        "/run/current-system/sw/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Windows
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];

    for candidate in candidates {
        if Path::new(candidate).exists() {
            return Some(candidate.to_string());
        }
    }
    None
}

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use kream_trades::browser::{DriverAction, NodeId, ScriptedBrowser};
use kream_trades::config::TimingConfig;
use kream_trades::credentials::Credentials;
use kream_trades::export::ExportSink;
use kream_trades::models::ScrapeResult;
use kream_trades::scrape::ScrapeSettings;
use kream_trades::site::SiteProfile;

pub const HOME: &str = "https://kream.co.kr/";
pub const PRODUCT: &str = "https://kream.co.kr/products/83900";
pub const LOGIN: &str = "https://kream.co.kr/login";
pub const EMAIL: &str = "buyer@example.com";
pub const PASSWORD: &str = "correct horse";

pub fn credentials() -> Credentials {
    Credentials::new(EMAIL, PASSWORD)
}

/// Default site settings with every wait shortened for tests.
pub fn settings() -> ScrapeSettings {
    ScrapeSettings {
        timing: TimingConfig::instant(),
        ..ScrapeSettings::default()
    }
}

/// A scripted KREAM product page: header sign-in link, login form,
/// "details" control and an (initially empty) trade-history table.
pub struct KreamPage {
    pub browser: ScriptedBrowser,
    pub site: SiteProfile,
    pub sign_in_link: NodeId,
    pub email_field: NodeId,
    pub password_field: NodeId,
    pub submit_button: NodeId,
    pub details_label: NodeId,
    pub details_button: NodeId,
    pub heading: NodeId,
    pub table: NodeId,
}

impl KreamPage {
    pub fn new() -> Self {
        Self::at("about:blank")
    }

    pub fn at(url: &str) -> Self {
        let browser = ScriptedBrowser::new(url);
        let site = SiteProfile::default();

        let sign_in_link = browser.element("로그인");
        browser.set_interactive(sign_in_link);
        browser.on_click_navigate(sign_in_link, LOGIN);
        browser.expose(&site.sign_in_link(), sign_in_link);

        let email_field = browser.element("");
        let password_field = browser.element("");
        let submit_button = browser.element("로그인");
        browser.expose(&site.email_input(), email_field);
        browser.expose(&site.password_input(), password_field);
        browser.expose(&site.submit_button(), submit_button);
        browser.login_form(email_field, password_field, EMAIL, PASSWORD, HOME);
        browser.submit_on_click(submit_button);

        let details_label = browser.element("자세히");
        let details_button = browser.element("");
        browser.set_parent(details_label, details_button);
        browser.set_interactive(details_button);
        browser.expose(&site.activation_control(), details_label);

        let heading = browser.detached_element("체결 거래");
        browser.expose(&site.panel_heading(), heading);
        browser.on_click_attach(details_button, heading);

        let table = browser.detached_element("");
        browser.expose(&site.row_container(), table);
        browser.on_click_attach(details_button, table);

        Self {
            browser,
            site,
            sign_in_link,
            email_field,
            password_field,
            submit_button,
            details_label,
            details_button,
            heading,
            table,
        }
    }

    fn row(&self, cells: &[&str]) -> NodeId {
        let row = self.browser.element("");
        let ids: Vec<NodeId> = cells.iter().map(|c| self.browser.element(c)).collect();
        self.browser.add_children(row, self.site.cell_selector(), &ids);
        row
    }

    /// Rows present as soon as the panel opens.
    pub fn rows(&self, rows: &[&[&str]]) -> Vec<NodeId> {
        let ids: Vec<NodeId> = rows.iter().map(|cells| self.row(cells)).collect();
        self.browser
            .add_children(self.table, self.site.row_selector(), &ids);
        ids
    }

    /// Rows loaded by the next scroll to the bottom.
    pub fn rows_on_scroll(&self, rows: &[&[&str]]) -> Vec<NodeId> {
        let ids: Vec<NodeId> = rows.iter().map(|cells| self.row(cells)).collect();
        self.browser
            .queue_growth(self.table, self.site.row_selector(), &ids);
        ids
    }

    pub fn typed_into(&self, node: NodeId) -> Vec<String> {
        self.browser
            .actions()
            .into_iter()
            .filter_map(|a| match a {
                DriverAction::Typed { node: n, text } if n == node => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, action: &DriverAction) -> usize {
        self.browser
            .actions()
            .iter()
            .filter(|a| *a == action)
            .count()
    }
}

/// Export sink that remembers what it was given.
#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<(usize, String)>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<(usize, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExportSink for RecordingSink {
    fn export(&self, records: &ScrapeResult, destination: &Path) -> Result<usize> {
        self.calls
            .lock()
            .unwrap()
            .push((records.len(), destination.display().to_string()));
        Ok(records.len())
    }
}

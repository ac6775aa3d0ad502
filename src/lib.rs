//! Scrape the trade history of a KREAM product page.
//!
//! [`scrape::TradeHistoryScraper`] signs in, opens the trade-history panel,
//! scrolls until every lazily loaded row is present and maps the rows to
//! [`models::TradeRecord`]s. Browser access goes through
//! [`browser::BrowserDriver`]; writing results goes through
//! [`export::ExportSink`].

pub mod browser;
pub mod config;
pub mod credentials;
pub mod duration;
pub mod export;
pub mod location;
pub mod models;
pub mod scrape;
pub mod site;

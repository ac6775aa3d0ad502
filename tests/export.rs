mod support;

use anyhow::Result;
use kream_trades::export::DelimitedExporter;
use kream_trades::location::NavigationTarget;
use kream_trades::scrape::TradeHistoryScraper;
use support::{credentials, settings, KreamPage, PRODUCT};
use tempfile::TempDir;

#[tokio::test]
async fn scraped_rows_are_written_as_csv() -> Result<()> {
    let dir = TempDir::new()?;
    let output = dir.path().join("kream_83900.csv");
    let page = KreamPage::new();
    page.rows(&[&["260", "128,000", "24/03/01 12:01"]]);
    page.rows_on_scroll(&[&["265", "129,000", "24/03/01 12:07"]]);

    let creds = credentials();
    let report = TradeHistoryScraper::new(&page.browser, settings())
        .run_and_export(
            &creds,
            &NavigationTarget::new(PRODUCT),
            None,
            &DelimitedExporter,
            &output,
        )
        .await?;

    assert_eq!(report.exported, 2);
    let contents = std::fs::read_to_string(&output)?;
    assert_eq!(
        contents,
        "size,price,timestamp\n\
         260,\"128,000\",24/03/01 12:01\n\
         265,\"129,000\",24/03/01 12:07\n"
    );
    Ok(())
}

#[tokio::test]
async fn empty_panel_exports_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let output = dir.path().join("trades.tsv");
    let page = KreamPage::new();

    let creds = credentials();
    let report = TradeHistoryScraper::new(&page.browser, settings())
        .run_and_export(
            &creds,
            &NavigationTarget::new(PRODUCT),
            None,
            &DelimitedExporter,
            &output,
        )
        .await?;

    assert!(report.records.is_empty());
    assert_eq!(report.exported, 0);
    assert!(!output.exists());
    Ok(())
}

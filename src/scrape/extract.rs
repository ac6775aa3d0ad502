use anyhow::Result;

use crate::browser::BrowserDriver;
use crate::models::{ScrapeResult, TradeRecord};
use crate::site::SiteProfile;

/// Number of non-empty cells that make up a record.
const RECORD_CELLS: usize = 3;

/// Maps trade-history rows to [`TradeRecord`]s.
pub struct RecordExtractor<'a, D: BrowserDriver> {
    driver: &'a D,
    site: &'a SiteProfile,
}

impl<'a, D: BrowserDriver> RecordExtractor<'a, D> {
    pub fn new(driver: &'a D, site: &'a SiteProfile) -> Self {
        Self { driver, site }
    }

    /// Records for `rows`, in row order.
    ///
    /// The first three non-empty cells of a row are its size, price and
    /// timestamp. Rows with fewer, or whose cells can't be read, are
    /// skipped.
    pub async fn extract(&self, rows: &[D::Element]) -> ScrapeResult {
        let mut result = ScrapeResult::new();
        for (index, row) in rows.iter().enumerate() {
            match self.row_texts(row).await {
                Ok(texts) => match TradeRecord::from_cells(&texts) {
                    Some(record) => result.push(record),
                    None => tracing::debug!(row = index, cells = texts.len(), "Skipping short row"),
                },
                Err(e) => tracing::debug!(row = index, error = %e, "Skipping unreadable row"),
            }
        }
        if result.len() < rows.len() {
            tracing::info!(
                rows = rows.len(),
                records = result.len(),
                "Some rows did not yield records"
            );
        }
        result
    }

    async fn row_texts(&self, row: &D::Element) -> Result<Vec<String>> {
        let cells = self.driver.find_within(row, self.site.cell_selector()).await?;
        let mut texts = Vec::with_capacity(RECORD_CELLS);
        for cell in &cells {
            let text = self.driver.text(cell).await?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            texts.push(text.to_string());
            if texts.len() == RECORD_CELLS {
                break;
            }
        }
        Ok(texts)
    }
}

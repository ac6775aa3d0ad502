//! Writing scraped records out.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::ScrapeResult;

/// Destination for scraped records.
pub trait ExportSink: Send + Sync {
    /// Write `records` to `destination`, returning how many were written.
    ///
    /// An empty result is not an error; implementations log a warning and
    /// write nothing.
    fn export(&self, records: &ScrapeResult, destination: &Path) -> Result<usize>;
}

/// Delimited text export with a `size,price,timestamp` header.
///
/// The delimiter follows the destination's extension: tab for `.tsv`,
/// comma otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedExporter;

impl DelimitedExporter {
    pub fn delimiter_for(destination: &Path) -> u8 {
        match destination.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        }
    }
}

impl ExportSink for DelimitedExporter {
    fn export(&self, records: &ScrapeResult, destination: &Path) -> Result<usize> {
        if records.is_empty() {
            tracing::warn!(path = %destination.display(), "No records to export");
            return Ok(0);
        }

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(Self::delimiter_for(destination))
            .from_path(destination)
            .with_context(|| format!("Failed to create {}", destination.display()))?;
        for record in records {
            writer
                .serialize(record)
                .context("Failed to write trade record")?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", destination.display()))?;

        tracing::info!(
            path = %destination.display(),
            records = records.len(),
            "Exported trade history"
        );
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeRecord;
    use tempfile::TempDir;

    fn sample() -> ScrapeResult {
        [
            TradeRecord::new("260", "128,000", "24/03/01"),
            TradeRecord::new("270", "131,500", "24/03/02"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    #[test]
    fn writes_header_and_rows_in_order() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.csv");

        let written = DelimitedExporter.export(&sample(), &path)?;

        assert_eq!(written, 2);
        let contents = fs::read_to_string(&path)?;
        assert_eq!(
            contents,
            "size,price,timestamp\n260,\"128,000\",24/03/01\n270,\"131,500\",24/03/02\n"
        );
        Ok(())
    }

    #[test]
    fn tsv_extension_uses_tabs() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("out.TSV");

        DelimitedExporter.export(&sample(), &path)?;

        let contents = fs::read_to_string(&path)?;
        assert!(contents.starts_with("size\tprice\ttimestamp\n260\t128,000\t24/03/01\n"));
        Ok(())
    }

    #[test]
    fn empty_result_writes_nothing() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.csv");

        let written = DelimitedExporter.export(&ScrapeResult::new(), &path)?;

        assert_eq!(written, 0);
        assert!(!path.exists());
        Ok(())
    }
}

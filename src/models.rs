use serde::{Deserialize, Serialize};

/// One row of the trade-history panel.
///
/// All three fields are non-empty; rows that would violate this are never
/// turned into records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    size: String,
    price: String,
    timestamp: String,
}

impl TradeRecord {
    /// Build a record, returning `None` if any field is blank after trimming.
    pub fn new(
        size: impl Into<String>,
        price: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Option<Self> {
        let size = size.into().trim().to_string();
        let price = price.into().trim().to_string();
        let timestamp = timestamp.into().trim().to_string();
        if size.is_empty() || price.is_empty() || timestamp.is_empty() {
            return None;
        }
        Some(Self {
            size,
            price,
            timestamp,
        })
    }

    /// Map the text of a row's cells onto a record.
    ///
    /// Blank cells are ignored; the first three non-blank texts become size,
    /// price and timestamp. Rows with fewer than three (headers, spacers)
    /// produce nothing.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Option<Self> {
        let mut texts = cells
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|t| !t.is_empty());
        let size = texts.next()?;
        let price = texts.next()?;
        let timestamp = texts.next()?;
        Self::new(size, price, timestamp)
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Records in DOM row order at the moment of final extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeResult {
    records: Vec<TradeRecord>,
}

impl ScrapeResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TradeRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TradeRecord> {
        self.records.iter()
    }
}

impl FromIterator<TradeRecord> for ScrapeResult {
    fn from_iter<I: IntoIterator<Item = TradeRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ScrapeResult {
    type Item = &'a TradeRecord;
    type IntoIter = std::slice::Iter<'a, TradeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_row_maps_in_order() {
        let record = TradeRecord::from_cells(&["10", "128,000", "2024-03-01"]).unwrap();
        assert_eq!(record.size(), "10");
        assert_eq!(record.price(), "128,000");
        assert_eq!(record.timestamp(), "2024-03-01");
    }

    #[test]
    fn blank_row_is_dropped() {
        assert_eq!(TradeRecord::from_cells(&["", "", ""]), None);
        assert_eq!(TradeRecord::from_cells(&["  ", "\n", "\t"]), None);
    }

    #[test]
    fn two_field_row_is_dropped() {
        assert_eq!(TradeRecord::from_cells(&["10", "128,000"]), None);
        assert_eq!(TradeRecord::from_cells(&["", "10", "", "128,000"]), None);
    }

    #[test]
    fn blanks_are_skipped_and_extras_ignored() {
        let record =
            TradeRecord::from_cells(&["", " 265 ", "", "99,000원", "24/03/01", "extra"]).unwrap();
        assert_eq!(record, TradeRecord::new("265", "99,000원", "24/03/01").unwrap());
    }

    #[test]
    fn constructor_rejects_blank_fields() {
        assert!(TradeRecord::new("10", " ", "2024-03-01").is_none());
    }
}

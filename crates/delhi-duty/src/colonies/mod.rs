//! Colony-to-rate-category directory.
//!
//! The government publishes the category assignment as a flat listing of
//! colony names. The directory is loaded once at startup, either from the
//! maintained CSV (`colony_name,category`) or from a raw text dump of the
//! notification, and is immutable afterwards.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::valuation::RateCategory;

/// One colony with its notified rate category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyRecord {
    pub name: String,
    pub category: RateCategory,
}

#[derive(Debug, thiserror::Error)]
pub enum ColonyImportError {
    #[error("failed to read colony listing: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid colony CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("colony CSV needs 'colony_name' and 'category' columns")]
    MissingColumns,
    #[error("row {row}: colony '{name}' has category '{category}' outside A-H")]
    BadCategory {
        row: usize,
        name: String,
        category: String,
    },
}

/// Immutable lookup from colony name to rate category.
///
/// Listing order is preserved for display; lookups are case-insensitive.
#[derive(Debug, Default, Clone)]
pub struct ColonyDirectory {
    records: Vec<ColonyRecord>,
    index: HashMap<String, usize>,
}

impl ColonyDirectory {
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, ColonyImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Parse the maintained CSV. Header casing is tolerated (`colony_name` or
    /// `Colony Name`); rows with a category outside A-H fail the import
    /// instead of being skipped.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ColonyImportError> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let name_column = find_column(&headers, &["colony_name", "colony name"]);
        let category_column = find_column(&headers, &["category", "cat."]);
        let (name_column, category_column) = match (name_column, category_column) {
            (Some(name), Some(category)) => (name, category),
            _ => return Err(ColonyImportError::MissingColumns),
        };

        let mut directory = Self::default();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            let name = record.get(name_column).unwrap_or("").trim();
            let raw_category = record.get(category_column).unwrap_or("").trim();
            if name.is_empty() || raw_category.is_empty() {
                continue;
            }

            let category: RateCategory =
                raw_category
                    .parse()
                    .map_err(|_| ColonyImportError::BadCategory {
                        row: row + 2,
                        name: name.to_string(),
                        category: raw_category.to_string(),
                    })?;
            directory.insert(name, category);
        }

        Ok(directory)
    }

    /// Parse a raw text dump of the notification: one colony per line with
    /// the category letter as the last whitespace-separated token. Header and
    /// separator lines are skipped, as are lines whose trailing token is not
    /// a category letter.
    pub fn from_raw_listing(raw: &str) -> Self {
        let mut directory = Self::default();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || is_header_line(line) {
                continue;
            }
            let Some((name, token)) = line.rsplit_once(char::is_whitespace) else {
                continue;
            };
            // Lines whose trailing token is not a single category letter
            // ("Cat.", "CATEGORY", page numbers) are not colony rows.
            if token.len() != 1 {
                continue;
            }
            let Ok(category) = token.parse::<RateCategory>() else {
                continue;
            };
            directory.insert(name.trim(), category);
        }
        directory
    }

    /// Insert preserving first-seen order; duplicate names (case-insensitive)
    /// keep the earlier entry.
    fn insert(&mut self, name: &str, category: RateCategory) {
        let key = name.to_lowercase();
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key, self.records.len());
        self.records.push(ColonyRecord {
            name: name.to_string(),
            category,
        });
    }

    pub fn lookup(&self, name: &str) -> Option<&ColonyRecord> {
        self.index
            .get(&name.trim().to_lowercase())
            .map(|&position| &self.records[position])
    }

    pub fn category_of(&self, name: &str) -> Option<RateCategory> {
        self.lookup(name).map(|record| record.category)
    }

    pub fn records(&self) -> &[ColonyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| candidates.contains(&header.trim().to_lowercase().as_str()))
}

fn is_header_line(line: &str) -> bool {
    line.starts_with('—')
        || line.starts_with('-')
        || (line.contains("Colony Name") || line.contains("COLONY NAME"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_import_reads_both_header_casings() {
        let lower = "colony_name,category\nDefence Colony,A\nLajpat Nagar,C\n";
        let directory = ColonyDirectory::from_csv_reader(lower.as_bytes()).expect("imports");
        assert_eq!(directory.len(), 2);
        assert_eq!(
            directory.category_of("Defence Colony"),
            Some(RateCategory::A)
        );

        let upper = "Colony Name,Category\nRohini,D\n";
        let directory = ColonyDirectory::from_csv_reader(upper.as_bytes()).expect("imports");
        assert_eq!(directory.category_of("rohini"), Some(RateCategory::D));
    }

    #[test]
    fn csv_import_rejects_unknown_categories_instead_of_skipping() {
        let csv = "colony_name,category\nSomewhere,Z\n";
        match ColonyDirectory::from_csv_reader(csv.as_bytes()) {
            Err(ColonyImportError::BadCategory { row, name, category }) => {
                assert_eq!(row, 2);
                assert_eq!(name, "Somewhere");
                assert_eq!(category, "Z");
            }
            other => panic!("expected bad category error, got {other:?}"),
        }
    }

    #[test]
    fn csv_import_requires_the_expected_columns() {
        let csv = "name,tier\nSomewhere,A\n";
        assert!(matches!(
            ColonyDirectory::from_csv_reader(csv.as_bytes()),
            Err(ColonyImportError::MissingColumns)
        ));
    }

    #[test]
    fn duplicate_colonies_keep_the_first_entry() {
        let csv = "colony_name,category\nAali,H\nAALI,G\n";
        let directory = ColonyDirectory::from_csv_reader(csv.as_bytes()).expect("imports");
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.category_of("Aali"), Some(RateCategory::H));
    }

    #[test]
    fn raw_listing_parses_trailing_category_letters() {
        let raw = "Colony Name Cat.\n\
                   — — —\n\
                   Aali    H\n\
                   Lado Sarai Extn  F\n\
                   \n\
                   Not A Colony Row CATEGORY\n";
        let directory = ColonyDirectory::from_raw_listing(raw);
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.category_of("Aali"), Some(RateCategory::H));
        assert_eq!(
            directory.category_of("Lado Sarai Extn"),
            Some(RateCategory::F)
        );
    }

    #[test]
    fn lookup_is_case_and_whitespace_insensitive() {
        let directory =
            ColonyDirectory::from_csv_reader("colony_name,category\nGreen Park,B\n".as_bytes())
                .expect("imports");
        assert_eq!(
            directory.category_of("  green park "),
            Some(RateCategory::B)
        );
        assert_eq!(directory.category_of("green parkway"), None);
    }
}

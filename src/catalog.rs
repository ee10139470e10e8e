use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::warn;

use crate::error::CatalogError;

const EXPECTED_HEADER: &str = "item,price_per_kg";

/// Read-only item-id to unit-price lookup. Loaded once at startup;
/// a load failure is fatal because no sale can be priced without it.
#[derive(Debug, Clone)]
pub struct PriceCatalog {
    prices: HashMap<String, f64>,
}

impl PriceCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, CatalogError> {
        let mut lines = contents.lines().enumerate();

        match lines.next() {
            Some((_, header)) if header.trim() == EXPECTED_HEADER => {}
            _ => {
                return Err(CatalogError::MissingHeader {
                    path: path.to_path_buf(),
                })
            }
        }

        let mut prices = HashMap::new();
        for (idx, line) in lines {
            let row = line.trim();
            if row.is_empty() {
                continue;
            }

            let (item, price_text) = row.split_once(',').ok_or_else(|| {
                CatalogError::MalformedRow {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    row: row.to_string(),
                }
            })?;

            let item = item.trim();
            let price_text = price_text.trim();
            if item.is_empty() || price_text.contains(',') {
                return Err(CatalogError::MalformedRow {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    row: row.to_string(),
                });
            }

            let price: f64 = price_text.parse().map_err(|_| CatalogError::BadPrice {
                path: path.to_path_buf(),
                line: idx + 1,
                value: price_text.to_string(),
            })?;
            if !price.is_finite() || price < 0.0 {
                return Err(CatalogError::BadPrice {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    value: price_text.to_string(),
                });
            }

            // Duplicate ids are last-write-wins, by policy rather than accident.
            if prices.insert(item.to_string(), price).is_some() {
                warn!("price list {}: duplicate entry for '{item}', keeping the later row", path.display());
            }
        }

        Ok(Self { prices })
    }

    /// `None` means the item is unpriced; the orchestration records the
    /// sale at zero charge and raises a price-not-found signal so the
    /// operator can follow up.
    pub fn lookup(&self, item_id: &str) -> Option<f64> {
        self.prices.get(item_id).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

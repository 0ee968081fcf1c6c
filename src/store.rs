//! Durable, range-queryable storage for cached series.
//!
//! Each cache entry is one complete, immutable series addressed by a deterministic key derived
//! from (project, source, canonical field list). Rows are stored sorted ascending on the leading
//! field so that range-bounded reads never scan unrelated data.

use crate::error::DecimatorError;
use crate::models::{DValue, Row};

use std::path::Path;

/// Name of the tree holding per-entry completeness markers. An entry is only visible once its
/// marker is written, so a failed persist never leaves a partial entry behind.
const COMPLETE_TREE: &str = "__complete_entries";

/// Derive the storage key for a series.
///
/// A pure function of its inputs: identical (project, source_id, fields) always address the same
/// entry. The key is order-sensitive on `fields` - permuting the field list addresses a
/// different entry even when the field set is identical.
pub fn derive_key(project: &str, source_id: &str, fields: &[String]) -> String {
    format!("{}__{}__{}", project, source_id, fields.join("_"))
}

/// Storage abstraction for cached series.
///
/// This forms the contract between the pipeline and the backing medium, so the latter is
/// swappable without touching the pipeline logic.
pub trait SeriesStore: Send + Sync {
    /// Returns true iff a complete entry is present for the key.
    fn exists(&self, key: &str) -> Result<bool, DecimatorError>;

    /// Persist a cleansed series under the key.
    ///
    /// Either the full row set becomes visible or nothing does.
    fn persist(&self, key: &str, rows: &[Row]) -> Result<(), DecimatorError>;

    /// Read rows whose leading field lies within the inclusive bounds, or all rows when bounds
    /// are absent. Rows are returned in ascending leading-field order.
    fn query_range(
        &self,
        key: &str,
        bounds: Option<(f64, f64)>,
    ) -> Result<Vec<Row>, DecimatorError>;

    /// Remove the backing storage for a key.
    fn evict(&self, key: &str) -> Result<(), DecimatorError>;
}

/// Series store backed by an embedded sled database.
///
/// One sled tree per cache entry, named by the derived key. Row keys are an order-preserving
/// encoding of the leading field value suffixed with the row ordinal, so duplicate leading
/// values are retained and sled's native key range iteration serves bounded reads.
pub struct SledSeriesStore {
    db: sled::Db,
}

impl SledSeriesStore {
    /// Open (or create) a store rooted at the given directory.
    pub fn open(path: &Path) -> Result<Self, DecimatorError> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// Returns a store backed by temporary files, for tests.
    #[cfg(test)]
    pub fn temporary() -> Self {
        Self {
            db: sled::Config::new()
                .temporary(true)
                .open()
                .expect("failed to open temporary store"),
        }
    }

    fn complete(&self) -> Result<sled::Tree, DecimatorError> {
        Ok(self.db.open_tree(COMPLETE_TREE)?)
    }
}

impl SeriesStore for SledSeriesStore {
    fn exists(&self, key: &str) -> Result<bool, DecimatorError> {
        Ok(self.complete()?.contains_key(key)?)
    }

    fn persist(&self, key: &str, rows: &[Row]) -> Result<(), DecimatorError> {
        let tree = self.db.open_tree(key)?;
        // A previously failed attempt may have left rows behind.
        tree.clear()?;
        match write_rows(&tree, rows) {
            Ok(()) => {
                self.complete()?.insert(key, vec![1])?;
                self.db.flush()?;
                Ok(())
            }
            Err(err) => {
                drop(tree);
                let _ = self.db.drop_tree(key);
                Err(err)
            }
        }
    }

    fn query_range(
        &self,
        key: &str,
        bounds: Option<(f64, f64)>,
    ) -> Result<Vec<Row>, DecimatorError> {
        let tree = self.db.open_tree(key)?;
        let iter = match bounds {
            Some((low, high)) => {
                let start = row_key(low, u64::MIN);
                let end = row_key(high, u64::MAX);
                tree.range(start..=end)
            }
            None => tree.iter(),
        };
        let mut rows = Vec::new();
        for item in iter {
            let (_, value) = item?;
            let row: Row = serde_json::from_slice(&value).map_err(|_| {
                DecimatorError::StorageCorrupt {
                    key: key.to_string(),
                }
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn evict(&self, key: &str) -> Result<(), DecimatorError> {
        self.complete()?.remove(key)?;
        self.db.drop_tree(key)?;
        self.db.flush()?;
        Ok(())
    }
}

fn write_rows(tree: &sled::Tree, rows: &[Row]) -> Result<(), DecimatorError> {
    for (ordinal, row) in rows.iter().enumerate() {
        let encoded = serde_json::to_vec(row)?;
        tree.insert(row_key(leading_value(row), ordinal as u64), encoded)?;
    }
    Ok(())
}

/// The leading field value of a row as an f64, the type the sort key is encoded from.
fn leading_value(row: &Row) -> f64 {
    row.first()
        .and_then(DValue::as_f64)
        .unwrap_or(f64::NEG_INFINITY)
}

/// Build a 16-byte row key: order-preserving leading value followed by the row ordinal.
fn row_key(leading: f64, ordinal: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&encode_ordered(leading));
    key[8..].copy_from_slice(&ordinal.to_be_bytes());
    key
}

/// Encode an f64 so that unsigned byte-wise comparison matches numeric order.
///
/// Negative values have all bits flipped, non-negative values have the sign bit set.
fn encode_ordered(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let bits = if bits & (1 << 63) != 0 {
        !bits
    } else {
        bits | (1 << 63)
    };
    bits.to_be_bytes()
}

//! # Lookup Tables
//!
//! Backing store for the `E_lookup(path)` weight-law primitive: plain
//! two-column text files (whitespace- or comma-separated), first column a
//! strictly increasing station coordinate, second column the value. Lines
//! that are blank or start with `#` are skipped.
//!
//! Tables are cached per path after first load. The cache is owned by the
//! field (not a process-wide singleton) so independent fields in one
//! process never interfere; it is immutable after first write per key -
//! load-once, read-many, never invalidated.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::{FieldError, FieldResult};

/// Parsed two-column interpolation table.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    zs: Vec<f64>,
    values: Vec<f64>,
}

impl LookupTable {
    /// Parse table text. `path` is only used for error locations.
    pub fn parse(path: &str, text: &str) -> FieldResult<Self> {
        let mut zs = Vec::new();
        let mut values = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut cols = line.split(|c: char| c == ',' || c.is_whitespace()).filter(|s| !s.is_empty());
            let malformed = |reason: &str| FieldError::LookupMalformed {
                path: path.to_string(),
                line: line_no + 1,
                reason: reason.to_string(),
            };
            let z: f64 = cols
                .next()
                .ok_or_else(|| malformed("missing z column"))?
                .parse()
                .map_err(|_| malformed("z column is not a number"))?;
            let value: f64 = cols
                .next()
                .ok_or_else(|| malformed("missing value column"))?
                .parse()
                .map_err(|_| malformed("value column is not a number"))?;
            if cols.next().is_some() {
                return Err(malformed("more than two columns"));
            }
            if let Some(&prev) = zs.last() {
                if z <= prev {
                    return Err(malformed("z column must be strictly increasing"));
                }
            }
            zs.push(z);
            values.push(value);
        }

        if zs.is_empty() {
            return Err(FieldError::LookupMalformed {
                path: path.to_string(),
                line: 0,
                reason: "table has no data rows".to_string(),
            });
        }

        Ok(LookupTable { zs, values })
    }

    /// Load a table from disk. A missing file is the hard `LookupMissing`
    /// error carrying the requested path.
    pub fn load(path: &Path) -> FieldResult<Self> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(FieldError::LookupMissing { path: display });
        }
        let text = fs::read_to_string(path).map_err(|e| FieldError::LookupMalformed {
            path: display.clone(),
            line: 0,
            reason: format!("unreadable: {e}"),
        })?;
        LookupTable::parse(&display, &text)
    }

    /// Linearly interpolated value at `z`, clamped to the end rows outside
    /// the tabulated range.
    pub fn sample(&self, z: f64) -> f64 {
        let n = self.zs.len();
        if z <= self.zs[0] {
            return self.values[0];
        }
        if z >= self.zs[n - 1] {
            return self.values[n - 1];
        }
        // partition_point: first index with zs[idx] > z; the row before it
        // starts the bracketing interval
        let hi = self.zs.partition_point(|&zi| zi <= z);
        let lo = hi - 1;
        let t = (z - self.zs[lo]) / (self.zs[hi] - self.zs[lo]);
        self.values[lo] + t * (self.values[hi] - self.values[lo])
    }

    pub fn len(&self) -> usize {
        self.zs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zs.is_empty()
    }
}

/// Per-field, load-once lookup cache keyed by path.
#[derive(Debug, Default)]
pub struct LookupCache {
    tables: Mutex<HashMap<PathBuf, Arc<LookupTable>>>,
}

impl LookupCache {
    pub fn new() -> Self {
        LookupCache::default()
    }

    /// Fetch a table, loading it on first access for its path.
    pub fn fetch(&self, path: &str) -> FieldResult<Arc<LookupTable>> {
        let key = PathBuf::from(path);
        let mut tables = self.tables.lock().expect("lookup cache poisoned");
        if let Some(table) = tables.get(&key) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(LookupTable::load(&key)?);
        tables.insert(key, Arc::clone(&table));
        Ok(table)
    }
}

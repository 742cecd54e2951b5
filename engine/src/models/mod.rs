//! Tabular data models used by the codec and the executor.
//!
//! - [`Table`] - header list plus rows, the CSV-level representation
//! - [`Record`] - one row as column name → value
//! - [`Dataset`] - the in-flight records and active header list of a run
//!
//! Rows may be shorter (or longer) than the header list. Conversions
//! between the two representations tolerate that: missing trailing cells
//! read as empty strings and surplus cells are dropped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One data row keyed by column name.
pub type Record = HashMap<String, String>;

// =============================================================================
// Table
// =============================================================================

/// Header list plus rows of string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Ordered column names. Uniqueness is not enforced.
    pub headers: Vec<String>,
    /// Ordered rows; each row may hold fewer cells than there are headers.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// True when there are neither headers nor rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Position of the first header named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Iterate over every cell of every row.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flat_map(|row| row.iter().map(String::as_str))
    }
}

// =============================================================================
// Record conversions
// =============================================================================

/// Convert a table into one record per row.
///
/// Keys are the headers up to `min(headers.len(), row.len())`.
pub fn to_records(table: &Table) -> Vec<Record> {
    table
        .rows
        .iter()
        .map(|row| {
            table
                .headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.clone(), v.clone()))
                .collect()
        })
        .collect()
}

/// Re-linearize records into a table using `headers` as column order.
///
/// A record missing a header yields an empty cell.
pub fn from_records(records: &[Record], headers: &[String]) -> Table {
    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| record.get(h).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    Table {
        headers: headers.to_vec(),
        rows,
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Records plus the active header list, mutated node by node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn from_table(table: &Table) -> Self {
        Self {
            headers: table.headers.clone(),
            records: to_records(table),
        }
    }

    pub fn to_table(&self) -> Table {
        from_records(&self.records, &self.headers)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append `name` to the header list unless it is already there.
    pub fn ensure_header(&mut self, name: &str) {
        if !self.headers.iter().any(|h| h == name) {
            self.headers.push(name.to_string());
        }
    }
}

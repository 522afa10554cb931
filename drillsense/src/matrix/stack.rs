//! Copper layer stack derived from the job matrix.

use serde::Serialize;

use super::schema::{MatrixRow, Side};

/// Ordered copper layer names, top to bottom, numbered from 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopperStack {
    layers: Vec<String>,
}

impl CopperStack {
    pub fn new(layers: Vec<String>) -> Self {
        Self { layers }
    }

    /// Collect board copper rows in matrix order.
    pub fn from_rows(rows: &[MatrixRow]) -> Self {
        let mut copper: Vec<&MatrixRow> = rows.iter().filter(|r| r.is_copper()).collect();
        copper.sort_by_key(|r| r.row);
        Self {
            layers: copper.into_iter().map(|r| r.name.clone()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.layers
    }

    /// Layer name at a 1-based index. Zero and out-of-range indices yield `None`.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.layers.get(i))
            .map(String::as_str)
    }

    /// 1-based index of a copper layer.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l == name).map(|i| i + 1)
    }

    pub fn top(&self) -> Option<&str> {
        self.layers.first().map(String::as_str)
    }

    pub fn bottom(&self) -> Option<&str> {
        self.layers.last().map(String::as_str)
    }

    pub fn outer(&self, side: Side) -> Option<&str> {
        match side {
            Side::Top => self.top(),
            Side::Bottom => self.bottom(),
        }
    }

    pub fn is_outer(&self, name: &str) -> bool {
        self.top() == Some(name) || self.bottom() == Some(name)
    }
}

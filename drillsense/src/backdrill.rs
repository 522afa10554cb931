//! Backdrill Span Resolver
//!
//! Turns the drill rows of a job matrix into the spans the coupon is built
//! from. A span runs from the copper layer the drill enters on (`drl_start`)
//! to the last copper layer it is allowed to remove (`drl_end`). The layer
//! right past the end, seen from the start side, is the must-not-cut layer.
//!
//! Span ends are read from the row fields directly. Mask, paste and silk
//! identifiers are normalized to the outer copper layer on their side of the
//! board, so a span declared as `smt -> pgp3` resolves the same as
//! `top -> pgp3`.

use serde::Serialize;

use crate::matrix::{CopperStack, MatrixRow, Side};

pub const DEFAULT_BACKDRILL_PREFIX: &str = "bd";

/// One resolved backdrill span
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackdrillSpan {
    pub name: String,
    pub start_cu_num: Option<usize>,
    pub end_cu_num: Option<usize>,
    pub start_cu_name: Option<String>,
    pub end_cu_name: Option<String>,
    pub drl_start: Option<String>,  // Layer the drill-sense pad and label go on
    pub drl_mnc: Option<String>,    // Must-not-cut layer
}

/// Index of the must-not-cut layer for a span from `start` to `end`.
///
/// Drilling moves from `start` toward `end`, so the protected layer is the
/// one just past `end` in that direction.
pub fn must_not_cut_index(start: usize, end: usize) -> Option<usize> {
    if start < end {
        end.checked_add(1)
    } else {
        end.checked_sub(1).filter(|i| *i > 0)
    }
}

/// Resolves backdrill spans against a job matrix.
pub struct SpanResolver<'a> {
    rows: &'a [MatrixRow],
    stack: CopperStack,
    prefix: String,
}

impl<'a> SpanResolver<'a> {
    pub fn new(rows: &'a [MatrixRow]) -> Self {
        Self {
            rows,
            stack: CopperStack::from_rows(rows),
            prefix: DEFAULT_BACKDRILL_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Resolve every qualifying drill row, in matrix order.
    pub fn resolve(&self) -> Vec<BackdrillSpan> {
        let spans: Vec<BackdrillSpan> = self
            .rows
            .iter()
            .filter(|row| row.name.starts_with(&self.prefix) && row.has_span())
            .map(|row| self.resolve_row(row))
            .collect();

        tracing::debug!("Resolved {} backdrill spans: {:?}", spans.len(), spans);
        spans
    }

    fn resolve_row(&self, row: &MatrixRow) -> BackdrillSpan {
        let start_cu_name = self.normalize(&row.drl_start);
        let end_cu_name = self.normalize(&row.drl_end);
        let start_cu_num = start_cu_name.as_deref().and_then(|n| self.stack.index_of(n));
        let end_cu_num = end_cu_name.as_deref().and_then(|n| self.stack.index_of(n));

        let drl_mnc = match (start_cu_num, end_cu_num) {
            (Some(start), Some(end)) => must_not_cut_index(start, end)
                .and_then(|i| self.stack.name_at(i))
                .map(str::to_string),
            _ => None,
        };

        if start_cu_name.is_none() || end_cu_name.is_none() {
            tracing::warn!(
                "Backdrill row {} references unknown layers ({} -> {})",
                row.name,
                row.drl_start,
                row.drl_end
            );
        }

        BackdrillSpan {
            name: row.name.clone(),
            start_cu_num,
            end_cu_num,
            drl_start: start_cu_name.clone(),
            start_cu_name,
            end_cu_name,
            drl_mnc,
        }
    }

    /// Map a span identifier to a copper layer name.
    pub fn normalize(&self, identifier: &str) -> Option<String> {
        if self.stack.index_of(identifier).is_some() {
            return Some(identifier.to_string());
        }

        let row = self.rows.iter().find(|r| r.name == identifier)?;
        if !row.layer_type.is_surface_finish() {
            return None;
        }

        self.side_of(row)
            .and_then(|side| self.stack.outer(side))
            .map(str::to_string)
    }

    /// Side of a non-copper row, from its position relative to the copper rows.
    fn side_of(&self, row: &MatrixRow) -> Option<Side> {
        let first = self.copper_row(self.stack.top()?)?;
        let last = self.copper_row(self.stack.bottom()?)?;
        if row.row < first {
            Some(Side::Top)
        } else if row.row > last {
            Some(Side::Bottom)
        } else {
            None
        }
    }

    fn copper_row(&self, name: &str) -> Option<usize> {
        self.rows
            .iter()
            .find(|r| r.is_copper() && r.name == name)
            .map(|r| r.row)
    }
}

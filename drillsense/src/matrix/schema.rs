//! Board Matrix Schema
//!
//! Data structures for the rows of a CAM job matrix. Each row describes one
//! layer of the job: its name, type, context and polarity. Drill rows also
//! carry the span they cover as `drl_start` / `drl_end` layer names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the job matrix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatrixRow {
    pub row: usize,               // 1-based row number, top of the matrix first
    pub name: String,
    #[serde(default)]
    pub layer_type: LayerType,
    #[serde(default)]
    pub context: LayerContext,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub drl_start: String,        // Empty unless the row is a drill/rout span
    #[serde(default)]
    pub drl_end: String,
}

impl MatrixRow {
    /// Build a board row with no drill span.
    pub fn new(row: usize, name: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            row,
            name: name.into(),
            layer_type,
            context: LayerContext::Board,
            polarity: Polarity::Positive,
            drl_start: String::new(),
            drl_end: String::new(),
        }
    }

    /// Attach a drill span to the row.
    pub fn with_span(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.drl_start = start.into();
        self.drl_end = end.into();
        self
    }

    /// Whether this row is a copper layer of the physical board.
    pub fn is_copper(&self) -> bool {
        self.context == LayerContext::Board && self.layer_type.is_copper()
    }

    pub fn has_span(&self) -> bool {
        !self.drl_start.is_empty() && !self.drl_end.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    #[default]
    Signal,
    PowerGround,
    Mixed,
    SolderMask,
    SolderPaste,
    SilkScreen,
    Drill,
    Rout,
    Document,
    Component,
}

impl LayerType {
    pub fn is_copper(self) -> bool {
        matches!(self, LayerType::Signal | LayerType::PowerGround | LayerType::Mixed)
    }

    /// Mask, paste and silk layers sit on one side of the board and map to
    /// that side's outer copper layer.
    pub fn is_surface_finish(self) -> bool {
        matches!(
            self,
            LayerType::SolderMask | LayerType::SolderPaste | LayerType::SilkScreen
        )
    }

    /// Host matrix keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerType::Signal => "signal",
            LayerType::PowerGround => "power_ground",
            LayerType::Mixed => "mixed",
            LayerType::SolderMask => "solder_mask",
            LayerType::SolderPaste => "solder_paste",
            LayerType::SilkScreen => "silk_screen",
            LayerType::Drill => "drill",
            LayerType::Rout => "rout",
            LayerType::Document => "document",
            LayerType::Component => "component",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let layer_type = match keyword {
            "signal" => LayerType::Signal,
            "power_ground" => LayerType::PowerGround,
            "mixed" => LayerType::Mixed,
            "solder_mask" => LayerType::SolderMask,
            "solder_paste" => LayerType::SolderPaste,
            "silk_screen" => LayerType::SilkScreen,
            "drill" => LayerType::Drill,
            "rout" => LayerType::Rout,
            "document" => LayerType::Document,
            "component" => LayerType::Component,
            _ => return None,
        };
        Some(layer_type)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayerContext {
    #[default]
    Board,
    Misc,
}

impl LayerContext {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerContext::Board => "board",
            LayerContext::Misc => "misc",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "board" => Some(LayerContext::Board),
            "misc" => Some(LayerContext::Misc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    #[default]
    Positive,
    Negative,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "positive" => Some(Polarity::Positive),
            "negative" => Some(Polarity::Negative),
            _ => None,
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Board side of an outer layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Top,
    Bottom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_deserialize_defaults() {
        let row: MatrixRow = serde_json::from_str(r#"{"row": 3, "name": "pgp2"}"#).unwrap();
        assert_eq!(row.layer_type, LayerType::Signal);
        assert_eq!(row.context, LayerContext::Board);
        assert_eq!(row.polarity, Polarity::Positive);
        assert!(!row.has_span());
        assert!(row.is_copper());
    }

    #[test]
    fn test_misc_copper_is_not_board_copper() {
        let mut row = MatrixRow::new(1, "ref_top", LayerType::Signal);
        row.context = LayerContext::Misc;
        assert!(!row.is_copper());
    }

    #[test]
    fn test_keywords_match_serde_names() {
        for layer_type in [LayerType::PowerGround, LayerType::SolderMask, LayerType::SilkScreen] {
            let json = serde_json::to_string(&layer_type).unwrap();
            assert_eq!(json.trim_matches('"'), layer_type.as_str());
            assert_eq!(LayerType::from_keyword(layer_type.as_str()), Some(layer_type));
        }
    }

    #[test]
    fn test_span_requires_both_ends() {
        let row = MatrixRow::new(9, "bd1-2", LayerType::Drill).with_span("top", "");
        assert!(!row.has_span());
    }
}

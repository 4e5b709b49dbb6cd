use crate::content::{Currency, LabelBranding};
use crate::entry::LineItem;
use crate::error::LabelSheetError;
use crate::layout::{LabelGeometry, PageGeometry};
use crate::units::RenderUnit;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sheet setup loadable from JSON. Every field is optional; missing ones take
/// the A4 2×4 defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SheetConfig {
    pub page: PageGeometry,
    pub label: LabelGeometry,
    pub unit: RenderUnit,
    pub dpi: Option<f64>,
    pub branding: LabelBranding,
    pub currency: Currency,
}

fn parse_error(err: serde_json::Error) -> LabelSheetError {
    LabelSheetError::InvalidConfiguration(format!("malformed JSON: {err}"))
}

impl SheetConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, LabelSheetError> {
        serde_json::from_str(raw).map_err(parse_error)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelSheetError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// One print request as submitted by the label form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrintJob {
    pub items: Vec<LineItem>,
    pub leading_blanks: usize,
}

impl PrintJob {
    pub fn from_json_str(raw: &str) -> Result<Self, LabelSheetError> {
        serde_json::from_str(raw).map_err(parse_error)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelSheetError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

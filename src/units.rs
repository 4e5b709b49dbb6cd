use crate::error::LabelSheetError;
use crate::types::MM_PER_INCH;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const INCHES_PER_MM: f64 = 0.0393701;
/// CSS reference pixels per millimeter (96 dpi).
pub const PX_PER_MM: f64 = 3.77953;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderUnit {
    #[default]
    In,
    Px,
}

impl RenderUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderUnit::In => "in",
            RenderUnit::Px => "px",
        }
    }
}

impl FromStr for RenderUnit {
    type Err = LabelSheetError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "in" => Ok(RenderUnit::In),
            "px" => Ok(RenderUnit::Px),
            other => Err(LabelSheetError::InvalidUnit(other.to_string())),
        }
    }
}

impl fmt::Display for RenderUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn factor(unit: RenderUnit, dpi: Option<f64>) -> f64 {
    match (unit, dpi) {
        (RenderUnit::In, _) => INCHES_PER_MM,
        (RenderUnit::Px, Some(dpi)) => dpi / MM_PER_INCH,
        (RenderUnit::Px, None) => PX_PER_MM,
    }
}

/// Converts a physical length to the render unit. `dpi` only affects pixels.
pub fn mm_to_render_unit(value_mm: f64, unit: RenderUnit, dpi: Option<f64>) -> f64 {
    value_mm * factor(unit, dpi)
}

pub fn render_unit_to_mm(value: f64, unit: RenderUnit, dpi: Option<f64>) -> f64 {
    value / factor(unit, dpi)
}

/// String-token entry point for callers holding an unvalidated unit name.
pub fn mm_to_unit_token(value_mm: f64, unit: &str, dpi: Option<f64>) -> Result<f64, LabelSheetError> {
    let unit = unit.parse::<RenderUnit>()?;
    Ok(mm_to_render_unit(value_mm, unit, dpi))
}

/// A validated unit plus optional dpi override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    unit: RenderUnit,
    dpi: Option<f64>,
}

impl UnitConverter {
    pub fn new(unit: RenderUnit, dpi: Option<f64>) -> Result<Self, LabelSheetError> {
        if let Some(dpi) = dpi {
            if !dpi.is_finite() || dpi <= 0.0 {
                return Err(LabelSheetError::InvalidConfiguration(format!(
                    "dpi must be a positive number, got {dpi}"
                )));
            }
        }
        Ok(Self { unit, dpi })
    }

    pub fn unit(&self) -> RenderUnit {
        self.unit
    }

    pub fn dpi(&self) -> Option<f64> {
        self.dpi
    }

    pub fn to_render(&self, value_mm: f64) -> f64 {
        mm_to_render_unit(value_mm, self.unit, self.dpi)
    }

    pub fn to_mm(&self, value: f64) -> f64 {
        render_unit_to_mm(value, self.unit, self.dpi)
    }
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self {
            unit: RenderUnit::In,
            dpi: None,
        }
    }
}

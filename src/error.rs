use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "horizontal"),
            Axis::Vertical => write!(f, "vertical"),
        }
    }
}

#[derive(Debug)]
pub enum LabelSheetError {
    InvalidDateRange {
        packing: NaiveDate,
        expiry: NaiveDate,
    },
    InvalidUnit(String),
    LayoutOverflow {
        axis: Axis,
        overflow_mm: f64,
    },
    InvalidConfiguration(String),
    Pdf(String),
    Io(std::io::Error),
}

impl fmt::Display for LabelSheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelSheetError::InvalidDateRange { packing, expiry } => write!(
                f,
                "expiry date {} is not after packing date {}",
                expiry, packing
            ),
            LabelSheetError::InvalidUnit(unit) => {
                write!(f, "unsupported render unit {:?} (expected \"in\" or \"px\")", unit)
            }
            LabelSheetError::LayoutOverflow { axis, overflow_mm } => write!(
                f,
                "labels overflow the printable area: {} gap is {:.3}mm",
                axis, -overflow_mm
            ),
            LabelSheetError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            LabelSheetError::Pdf(message) => write!(f, "pdf error: {}", message),
            LabelSheetError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for LabelSheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LabelSheetError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LabelSheetError {
    fn from(value: std::io::Error) -> Self {
        LabelSheetError::Io(value)
    }
}

use crate::entry::LabelEntry;
use crate::error::LabelSheetError;

pub const SHEET_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Label(LabelEntry),
    Blank,
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Blank)
    }

    pub fn entry(&self) -> Option<&LabelEntry> {
        match self {
            Cell::Label(entry) => Some(entry),
            Cell::Blank => None,
        }
    }
}

impl From<LabelEntry> for Cell {
    fn from(entry: LabelEntry) -> Self {
        if entry.is_blank() {
            Cell::Blank
        } else {
            Cell::Label(entry)
        }
    }
}

/// One printable page of label cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    /// 1-based position among emitted sheets.
    pub number: usize,
    pub cells: Vec<Cell>,
}

impl Sheet {
    pub fn label_count(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_blank()).count()
    }

    pub fn blank_count(&self) -> usize {
        self.cells.len() - self.label_count()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }

    pub fn labels(&self) -> impl Iterator<Item = &LabelEntry> {
        self.cells.iter().filter_map(Cell::entry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationReport {
    pub entries: usize,
    pub leading_blanks: usize,
    /// Fixed-size chunks before all-blank sheets are dropped.
    pub chunks: usize,
    pub emitted: usize,
    pub dropped_blank: usize,
}

pub fn paginate(
    entries: impl IntoIterator<Item = LabelEntry>,
    leading_blanks: usize,
    capacity: usize,
) -> Result<Vec<Sheet>, LabelSheetError> {
    Ok(paginate_with_report(entries, leading_blanks, capacity)?.0)
}

/// Splits `leading_blanks` blank cells followed by `entries` into sheets of
/// exactly `capacity` cells. The final sheet is padded with blanks and sheets
/// holding no label are not emitted.
pub fn paginate_with_report(
    entries: impl IntoIterator<Item = LabelEntry>,
    leading_blanks: usize,
    capacity: usize,
) -> Result<(Vec<Sheet>, PaginationReport), LabelSheetError> {
    if capacity == 0 {
        return Err(LabelSheetError::InvalidConfiguration(
            "sheet capacity must be at least one cell".to_string(),
        ));
    }
    if leading_blanks >= capacity {
        return Err(LabelSheetError::InvalidConfiguration(format!(
            "leading blanks ({leading_blanks}) must be fewer than the sheet capacity ({capacity})"
        )));
    }

    let mut report = PaginationReport {
        leading_blanks,
        ..PaginationReport::default()
    };
    let mut sheets = Vec::new();
    let mut current: Vec<Cell> = Vec::with_capacity(capacity);
    current.extend(std::iter::repeat_n(Cell::Blank, leading_blanks));

    fn finish(cells: Vec<Cell>, sheets: &mut Vec<Sheet>, report: &mut PaginationReport) {
        report.chunks += 1;
        if cells.iter().all(Cell::is_blank) {
            report.dropped_blank += 1;
            return;
        }
        sheets.push(Sheet {
            number: sheets.len() + 1,
            cells,
        });
    }

    for entry in entries {
        report.entries += 1;
        current.push(Cell::from(entry));
        if current.len() == capacity {
            let full = std::mem::replace(&mut current, Vec::with_capacity(capacity));
            finish(full, &mut sheets, &mut report);
        }
    }
    if !current.is_empty() {
        current.resize(capacity, Cell::Blank);
        finish(current, &mut sheets, &mut report);
    }

    report.emitted = sheets.len();
    Ok((sheets, report))
}

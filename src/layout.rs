use crate::error::{Axis, LabelSheetError};
use crate::paginate::{Cell, Sheet};
use crate::types::Margins;
use crate::units::{RenderUnit, UnitConverter};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Tolerance for gaps that come out marginally negative from float error.
const GAP_EPSILON_MM: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PageGeometryPatch")]
pub struct PageGeometry {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margins: Margins,
}

impl PageGeometry {
    pub fn a4(margins: Margins) -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margins,
        }
    }

    pub fn available_width(&self) -> f64 {
        self.width_mm - self.margins.horizontal()
    }

    pub fn available_height(&self) -> f64 {
        self.height_mm - self.margins.vertical()
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4(Margins::new(12.0, 0.0, 12.0, 0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridShape {
    pub columns: usize,
    pub rows: usize,
}

impl GridShape {
    pub fn capacity(&self) -> usize {
        self.columns * self.rows
    }

    /// Row-major position of cell `index`.
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index % self.columns, index / self.columns)
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self {
            columns: 2,
            rows: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "LabelGeometryPatch")]
pub struct LabelGeometry {
    pub width_mm: f64,
    pub height_mm: f64,
    pub padding: Margins,
    pub grid: GridShape,
}

impl LabelGeometry {
    pub fn content_width(&self) -> f64 {
        self.width_mm - self.padding.horizontal()
    }

    pub fn content_height(&self) -> f64 {
        self.height_mm - self.padding.vertical()
    }
}

impl Default for LabelGeometry {
    fn default() -> Self {
        Self {
            width_mm: 102.0,
            height_mm: 68.0,
            padding: Margins::new(4.0, 3.0, 4.0, 3.0),
            grid: GridShape::default(),
        }
    }
}

/// Margins given field by field; absent edges keep their default.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
struct MarginsPatch {
    top: Option<f64>,
    right: Option<f64>,
    bottom: Option<f64>,
    left: Option<f64>,
}

impl MarginsPatch {
    fn apply(self, base: Margins) -> Margins {
        Margins {
            top: self.top.unwrap_or(base.top),
            right: self.right.unwrap_or(base.right),
            bottom: self.bottom.unwrap_or(base.bottom),
            left: self.left.unwrap_or(base.left),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PageGeometryPatch {
    width_mm: Option<f64>,
    height_mm: Option<f64>,
    margins: MarginsPatch,
}

impl From<PageGeometryPatch> for PageGeometry {
    fn from(patch: PageGeometryPatch) -> Self {
        let base = PageGeometry::default();
        Self {
            width_mm: patch.width_mm.unwrap_or(base.width_mm),
            height_mm: patch.height_mm.unwrap_or(base.height_mm),
            margins: patch.margins.apply(base.margins),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LabelGeometryPatch {
    width_mm: Option<f64>,
    height_mm: Option<f64>,
    padding: MarginsPatch,
    grid: Option<GridShape>,
}

impl From<LabelGeometryPatch> for LabelGeometry {
    fn from(patch: LabelGeometryPatch) -> Self {
        let base = LabelGeometry::default();
        Self {
            width_mm: patch.width_mm.unwrap_or(base.width_mm),
            height_mm: patch.height_mm.unwrap_or(base.height_mm),
            padding: patch.padding.apply(base.padding),
            grid: patch.grid.unwrap_or(base.grid),
        }
    }
}

/// Cell rectangle in millimeters, measured from the page's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Geometry of one sheet cell in render units.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPlacement<'a> {
    pub index: usize,
    pub column: usize,
    pub row: usize,
    /// Offset of the cell's outer edge from the page's top-left corner.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Space after this cell towards the next column/row; zero on the last.
    pub gap_right: f64,
    pub gap_bottom: f64,
    pub padding: Margins,
    pub content_width: f64,
    pub content_height: f64,
    pub cell: &'a Cell,
}

impl CellPlacement<'_> {
    pub fn content_x(&self) -> f64 {
        self.x + self.padding.left
    }

    pub fn content_y(&self) -> f64 {
        self.y + self.padding.top
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout<'a> {
    pub sheet_number: usize,
    pub unit: RenderUnit,
    pub page_width: f64,
    pub page_height: f64,
    pub placements: Vec<CellPlacement<'a>>,
}

/// Validated page/label combination with its inter-label gaps resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    page: PageGeometry,
    label: LabelGeometry,
    gap_x_mm: f64,
    gap_y_mm: f64,
}

impl GridLayout {
    pub fn new(page: &PageGeometry, label: &LabelGeometry) -> Result<Self, LabelSheetError> {
        let grid = label.grid;
        if grid.columns == 0 || grid.rows == 0 {
            return Err(LabelSheetError::InvalidConfiguration(
                "label grid needs at least one column and one row".to_string(),
            ));
        }
        let dims = [page.width_mm, page.height_mm, label.width_mm, label.height_mm];
        if dims.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(LabelSheetError::InvalidConfiguration(
                "page and label dimensions must be positive".to_string(),
            ));
        }
        if !page.margins.is_valid() || !label.padding.is_valid() {
            return Err(LabelSheetError::InvalidConfiguration(
                "margins and padding must be non-negative".to_string(),
            ));
        }
        if label.content_width() < 0.0 || label.content_height() < 0.0 {
            return Err(LabelSheetError::InvalidConfiguration(
                "label padding exceeds the label size".to_string(),
            ));
        }

        let gap_x_mm = distribute_gap(
            page.available_width(),
            label.width_mm,
            grid.columns,
            Axis::Horizontal,
        )?;
        let gap_y_mm = distribute_gap(
            page.available_height(),
            label.height_mm,
            grid.rows,
            Axis::Vertical,
        )?;

        Ok(Self {
            page: *page,
            label: *label,
            gap_x_mm,
            gap_y_mm,
        })
    }

    pub fn page(&self) -> &PageGeometry {
        &self.page
    }

    pub fn label(&self) -> &LabelGeometry {
        &self.label
    }

    pub fn capacity(&self) -> usize {
        self.label.grid.capacity()
    }

    pub fn gap_x_mm(&self) -> f64 {
        self.gap_x_mm
    }

    pub fn gap_y_mm(&self) -> f64 {
        self.gap_y_mm
    }

    pub fn cell_rect_mm(&self, index: usize) -> MmRect {
        let (column, row) = self.label.grid.position(index);
        MmRect {
            x: self.page.margins.left + column as f64 * (self.label.width_mm + self.gap_x_mm),
            y: self.page.margins.top + row as f64 * (self.label.height_mm + self.gap_y_mm),
            width: self.label.width_mm,
            height: self.label.height_mm,
        }
    }

    pub fn place<'a>(
        &self,
        sheet: &'a Sheet,
        converter: &UnitConverter,
    ) -> Result<SheetLayout<'a>, LabelSheetError> {
        let capacity = self.capacity();
        if sheet.cells.len() != capacity {
            return Err(LabelSheetError::InvalidConfiguration(format!(
                "sheet {} has {} cells, grid holds {}",
                sheet.number,
                sheet.cells.len(),
                capacity
            )));
        }

        let grid = self.label.grid;
        let padding = Margins::new(
            converter.to_render(self.label.padding.top),
            converter.to_render(self.label.padding.right),
            converter.to_render(self.label.padding.bottom),
            converter.to_render(self.label.padding.left),
        );
        let placements = sheet
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let (column, row) = grid.position(index);
                let rect = self.cell_rect_mm(index);
                let gap_right = if column + 1 < grid.columns {
                    self.gap_x_mm
                } else {
                    0.0
                };
                let gap_bottom = if row + 1 < grid.rows {
                    self.gap_y_mm
                } else {
                    0.0
                };
                CellPlacement {
                    index,
                    column,
                    row,
                    x: converter.to_render(rect.x),
                    y: converter.to_render(rect.y),
                    width: converter.to_render(rect.width),
                    height: converter.to_render(rect.height),
                    gap_right: converter.to_render(gap_right),
                    gap_bottom: converter.to_render(gap_bottom),
                    padding,
                    content_width: converter.to_render(self.label.content_width()),
                    content_height: converter.to_render(self.label.content_height()),
                    cell,
                }
            })
            .collect();

        Ok(SheetLayout {
            sheet_number: sheet.number,
            unit: converter.unit(),
            page_width: converter.to_render(self.page.width_mm),
            page_height: converter.to_render(self.page.height_mm),
            placements,
        })
    }

    /// Lays out every sheet; sheets are independent so they run in parallel.
    pub fn place_all<'a>(
        &self,
        sheets: &'a [Sheet],
        converter: &UnitConverter,
    ) -> Result<Vec<SheetLayout<'a>>, LabelSheetError> {
        sheets
            .par_iter()
            .map(|sheet| self.place(sheet, converter))
            .collect()
    }
}

/// Even spacing between `count` items of size `item` across `available`.
fn distribute_gap(
    available: f64,
    item: f64,
    count: usize,
    axis: Axis,
) -> Result<f64, LabelSheetError> {
    let free = available - item * count as f64;
    if free < -GAP_EPSILON_MM {
        return Err(LabelSheetError::LayoutOverflow {
            axis,
            overflow_mm: -free,
        });
    }
    if count < 2 {
        return Ok(0.0);
    }
    Ok((free / (count - 1) as f64).max(0.0))
}

pub fn compute_layout<'a>(
    sheet: &'a Sheet,
    page: &PageGeometry,
    label: &LabelGeometry,
    unit: RenderUnit,
) -> Result<Vec<CellPlacement<'a>>, LabelSheetError> {
    let grid = GridLayout::new(page, label)?;
    let converter = UnitConverter::new(unit, None)?;
    Ok(grid.place(sheet, &converter)?.placements)
}

/// Validates the geometry once, before any sheet is touched.
pub fn layout_sheets<'a>(
    sheets: &'a [Sheet],
    page: &PageGeometry,
    label: &LabelGeometry,
    converter: &UnitConverter,
) -> Result<Vec<SheetLayout<'a>>, LabelSheetError> {
    GridLayout::new(page, label)?.place_all(sheets, converter)
}

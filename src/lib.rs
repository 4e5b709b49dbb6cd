mod batch;
mod canvas;
mod config;
mod content;
mod debug;
mod entry;
mod error;
mod layout;
mod metrics;
mod paginate;
mod pdf;
mod render;
mod session;
mod types;
mod units;

pub use batch::{
    BATCH_NUMBER_MAX, BATCH_NUMBER_MIN, BatchNumberSource, BatchRegistry, RandomBatchSource,
    SequenceBatchSource, generate_batch_number,
};
pub use canvas::{Canvas, Command, Document, Page};
pub use config::{PrintJob, SheetConfig};
pub use content::{Currency, DetailRow, LabelBranding, LabelContent};
pub use debug::DebugLogger;
pub use entry::{
    DISPLAY_DATE_FORMAT, LabelEntry, LineItem, Money, expand_line_item, format_display_date,
    validate_date_range,
};
pub use error::{Axis, LabelSheetError};
pub use layout::{
    CellPlacement, GridLayout, GridShape, LabelGeometry, MmRect, PageGeometry, SheetLayout,
    compute_layout, layout_sheets,
};
pub use metrics::{RunMetrics, SheetMetrics};
pub use paginate::{Cell, PaginationReport, SHEET_CAPACITY, Sheet, paginate, paginate_with_report};
pub use pdf::document_to_pdf;
pub use render::{META_SHEET_KEY, RenderOptions, render_sheets};
pub use session::LabelSession;
pub use types::{Color, MM_PER_INCH, Margins, POINTS_PER_INCH, Pt, Rect, Size};
pub use units::{
    INCHES_PER_MM, PX_PER_MM, RenderUnit, UnitConverter, mm_to_render_unit, mm_to_unit_token,
    render_unit_to_mm,
};

use serde_json::json;
use std::path::{Path, PathBuf};

/// Configured label printer: geometry is validated once at build time and
/// every sheet is laid out against it.
pub struct LabelSheets {
    grid: GridLayout,
    converter: UnitConverter,
    branding: LabelBranding,
    currency: Currency,
    debug: Option<DebugLogger>,
}

pub struct LabelSheetsBuilder {
    page: PageGeometry,
    label: LabelGeometry,
    unit: RenderUnit,
    dpi: Option<f64>,
    branding: LabelBranding,
    currency: Currency,
    debug_path: Option<PathBuf>,
}

impl LabelSheets {
    pub fn builder() -> LabelSheetsBuilder {
        LabelSheetsBuilder::new()
    }

    pub fn from_config(config: &SheetConfig) -> Result<Self, LabelSheetError> {
        LabelSheetsBuilder::from_config(config).build()
    }

    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }

    pub fn capacity(&self) -> usize {
        self.grid.capacity()
    }

    pub fn converter(&self) -> &UnitConverter {
        &self.converter
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_ref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }

    /// Splits entries into sheets sized for this grid.
    pub fn paginate(
        &self,
        entries: impl IntoIterator<Item = LabelEntry>,
        leading_blanks: usize,
    ) -> Result<Vec<Sheet>, LabelSheetError> {
        let (sheets, report) = paginate_with_report(entries, leading_blanks, self.capacity())?;
        if let Some(logger) = self.debug.as_ref() {
            logger.log_event(
                "paginate.run",
                json!({
                    "entries": report.entries,
                    "leading_blanks": report.leading_blanks,
                    "chunks": report.chunks,
                    "emitted": report.emitted,
                    "dropped_blank": report.dropped_blank,
                }),
            );
            logger.increment("paginate.sheets", report.emitted as u64);
        }
        Ok(sheets)
    }

    pub fn layout<'a>(&self, sheets: &'a [Sheet]) -> Result<Vec<SheetLayout<'a>>, LabelSheetError> {
        self.grid.place_all(sheets, &self.converter)
    }

    fn check_sheets(&self, sheets: &[Sheet]) -> Result<(), LabelSheetError> {
        let capacity = self.capacity();
        match sheets.iter().find(|sheet| sheet.cells.len() != capacity) {
            Some(sheet) => Err(LabelSheetError::InvalidConfiguration(format!(
                "sheet {} has {} cells, grid holds {}",
                sheet.number,
                sheet.cells.len(),
                capacity
            ))),
            None => Ok(()),
        }
    }

    fn render_with_metrics(&self, sheets: &[Sheet]) -> Result<(Document, RunMetrics), LabelSheetError> {
        self.check_sheets(sheets)?;
        let options = RenderOptions {
            branding: &self.branding,
            currency: &self.currency,
            debug: self.debug.as_ref(),
        };
        Ok(render_sheets(sheets, &self.grid, &options))
    }

    /// Draws sheets as canvas pages, one page per sheet.
    pub fn render_document(&self, sheets: &[Sheet]) -> Result<Document, LabelSheetError> {
        Ok(self.render_with_metrics(sheets)?.0)
    }

    pub fn render_pdf(&self, sheets: &[Sheet]) -> Result<Vec<u8>, LabelSheetError> {
        Ok(self.render_pdf_with_metrics(sheets)?.0)
    }

    pub fn render_pdf_with_metrics(
        &self,
        sheets: &[Sheet],
    ) -> Result<(Vec<u8>, RunMetrics), LabelSheetError> {
        let (document, mut metrics) = self.render_with_metrics(sheets)?;
        let bytes = document_to_pdf(&document, self.debug.as_ref())?;
        metrics.pdf_bytes = bytes.len();
        self.emit_debug_summary("render_pdf");
        Ok((bytes, metrics))
    }

    pub fn write_pdf(
        &self,
        sheets: &[Sheet],
        path: impl AsRef<Path>,
    ) -> Result<RunMetrics, LabelSheetError> {
        let (bytes, metrics) = self.render_pdf_with_metrics(sheets)?;
        std::fs::write(path, bytes)?;
        Ok(metrics)
    }

    /// Assigns batch numbers to a print job and paginates its labels. The
    /// registry is updated even when a later item is rejected.
    pub fn job_sheets(
        &self,
        job: &PrintJob,
        registry: &mut BatchRegistry,
        source: &mut dyn BatchNumberSource,
    ) -> Result<Vec<Sheet>, LabelSheetError> {
        let mut session = LabelSession::with_registry(std::mem::take(registry));
        let entries = submit_all(&mut session, &job.items, source).and_then(|()| session.entries());
        *registry = session.into_registry();
        self.paginate(entries?, job.leading_blanks)
    }

    pub fn render_job(
        &self,
        job: &PrintJob,
        registry: &mut BatchRegistry,
        source: &mut dyn BatchNumberSource,
    ) -> Result<(Vec<u8>, RunMetrics), LabelSheetError> {
        let sheets = self.job_sheets(job, registry, source)?;
        self.render_pdf_with_metrics(&sheets)
    }
}

fn submit_all(
    session: &mut LabelSession,
    items: &[LineItem],
    source: &mut dyn BatchNumberSource,
) -> Result<(), LabelSheetError> {
    for item in items {
        session.submit(item.clone(), source)?;
    }
    Ok(())
}

impl LabelSheetsBuilder {
    pub fn new() -> Self {
        Self {
            page: PageGeometry::default(),
            label: LabelGeometry::default(),
            unit: RenderUnit::default(),
            dpi: None,
            branding: LabelBranding::default(),
            currency: Currency::default(),
            debug_path: None,
        }
    }

    pub fn from_config(config: &SheetConfig) -> Self {
        Self {
            page: config.page,
            label: config.label,
            unit: config.unit,
            dpi: config.dpi,
            branding: config.branding.clone(),
            currency: config.currency.clone(),
            debug_path: None,
        }
    }

    pub fn page_geometry(mut self, page: PageGeometry) -> Self {
        self.page = page;
        self
    }

    pub fn label_geometry(mut self, label: LabelGeometry) -> Self {
        self.label = label;
        self
    }

    pub fn render_unit(mut self, unit: RenderUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Pixel density for `px` output; inches ignore it.
    pub fn dpi(mut self, dpi: f64) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn branding(mut self, branding: LabelBranding) -> Self {
        self.branding = branding;
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<LabelSheets, LabelSheetError> {
        let grid = GridLayout::new(&self.page, &self.label)?;
        let converter = UnitConverter::new(self.unit, self.dpi)?;
        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        if let Some(logger) = debug.as_ref() {
            logger.log_event(
                "layout.grid",
                json!({
                    "columns": self.label.grid.columns,
                    "rows": self.label.grid.rows,
                    "gap_x_mm": grid.gap_x_mm(),
                    "gap_y_mm": grid.gap_y_mm(),
                    "unit": converter.unit().as_str(),
                }),
            );
        }
        Ok(LabelSheets {
            grid,
            converter,
            branding: self.branding,
            currency: self.currency,
            debug,
        })
    }
}

impl Default for LabelSheetsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(tag: &str, ext: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "labelsheet_{tag}_{}_{}.{ext}",
            std::process::id(),
            nanos
        ))
    }

    fn entries(count: usize) -> Vec<LabelEntry> {
        (0..count)
            .map(|i| LabelEntry {
                name: format!("Almonds {i}"),
                batch_number: "55555".to_string(),
                ..LabelEntry::default()
            })
            .collect()
    }

    #[test]
    fn ten_entries_after_three_blanks_make_two_pages() {
        let sheets_engine = LabelSheets::builder().build().expect("build");
        let sheets = sheets_engine.paginate(entries(10), 3).expect("paginate");
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[1].label_count(), 5);

        let (bytes, metrics) = sheets_engine
            .render_pdf_with_metrics(&sheets)
            .expect("render");
        let loaded = lopdf::Document::load_mem(&bytes).expect("reload");
        assert_eq!(loaded.get_pages().len(), 2);
        assert_eq!(metrics.total_labels, 10);
        assert_eq!(metrics.total_blanks, 6);
        assert_eq!(metrics.pdf_bytes, bytes.len());
    }

    #[test]
    fn overflowing_geometry_fails_at_build() {
        let err = LabelSheets::builder()
            .page_geometry(PageGeometry::a4(Margins::new(12.0, 5.0, 12.0, 5.0)))
            .build()
            .err()
            .expect("overflow");
        match err {
            LabelSheetError::LayoutOverflow { axis, overflow_mm } => {
                assert_eq!(axis, Axis::Horizontal);
                assert!((overflow_mm - 4.0).abs() < 1e-9);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn invalid_dpi_is_rejected() {
        let result = LabelSheets::builder()
            .render_unit(RenderUnit::Px)
            .dpi(0.0)
            .build();
        assert!(matches!(
            result,
            Err(LabelSheetError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn leading_blanks_must_leave_room() {
        let engine = LabelSheets::builder().build().expect("build");
        assert!(matches!(
            engine.paginate(entries(1), 8),
            Err(LabelSheetError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn config_drives_layout_units() {
        let config = SheetConfig::from_json_str(r#"{ "unit": "px" }"#).expect("config");
        let engine = LabelSheets::from_config(&config).expect("build");
        let sheets = engine.paginate(entries(1), 0).expect("paginate");
        let layouts = engine.layout(&sheets).expect("layout");
        assert_eq!(layouts.len(), 1);
        let first = &layouts[0].placements[0];
        assert_eq!(layouts[0].unit, RenderUnit::Px);
        assert!((first.width - 102.0 * PX_PER_MM).abs() < 1e-9);
        assert!((first.y - 12.0 * PX_PER_MM).abs() < 1e-9);
    }

    #[test]
    fn foreign_sheets_are_rejected_before_render() {
        let engine = LabelSheets::builder().build().expect("build");
        let sheets = paginate(entries(2), 0, 4).expect("paginate");
        assert!(matches!(
            engine.render_pdf(&sheets),
            Err(LabelSheetError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn print_job_shares_batch_numbers_across_copies_and_runs() {
        let engine = LabelSheets::builder().build().expect("build");
        let job = PrintJob {
            items: vec![
                LineItem::new("Cashews").quantity(3),
                LineItem::new("Raisins").quantity(0),
            ],
            leading_blanks: 0,
        };
        let mut registry = BatchRegistry::new();
        let mut source = SequenceBatchSource::new(vec![12_345, 67_890]);
        let sheets = engine
            .job_sheets(&job, &mut registry, &mut source)
            .expect("sheets");
        let batches: Vec<&str> = sheets[0]
            .labels()
            .map(|entry| entry.batch_number.as_str())
            .collect();
        assert_eq!(batches, vec!["12345", "12345", "12345", "67890"]);

        let again = engine
            .job_sheets(&job, &mut registry, &mut source)
            .expect("second run");
        assert_eq!(again[0].labels().next().map(|e| e.batch_number.as_str()), Some("12345"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn rejected_job_keeps_registry() {
        let engine = LabelSheets::builder().build().expect("build");
        let job = PrintJob {
            items: vec![
                LineItem::new("Cashews"),
                LineItem::new("Dates").dates(
                    NaiveDate::from_ymd_opt(2024, 5, 1),
                    NaiveDate::from_ymd_opt(2024, 4, 1),
                ),
            ],
            leading_blanks: 0,
        };
        let mut registry = BatchRegistry::new();
        let mut source = RandomBatchSource::seeded(7);
        let err = engine
            .render_job(&job, &mut registry, &mut source)
            .expect_err("bad dates");
        assert!(matches!(err, LabelSheetError::InvalidDateRange { .. }));
        assert!(registry.get("Cashews").is_some());
    }

    #[test]
    fn write_pdf_and_debug_log() {
        let pdf_path = temp_path("write", "pdf");
        let log_path = temp_path("write", "jsonl");
        let engine = LabelSheets::builder()
            .branding(LabelBranding {
                shop_name: "Valley Stores".to_string(),
                ..LabelBranding::default()
            })
            .debug_log(&log_path)
            .build()
            .expect("build");
        let sheets = engine.paginate(entries(9), 0).expect("paginate");
        let metrics = engine.write_pdf(&sheets, &pdf_path).expect("write");
        assert_eq!(metrics.sheets.len(), 2);

        let bytes = std::fs::read(&pdf_path).expect("read pdf");
        assert_eq!(bytes.len(), metrics.pdf_bytes);

        let log = std::fs::read_to_string(&log_path).expect("read log");
        let kinds: Vec<String> = log
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|v| v["type"].as_str().map(str::to_string))
            .collect();
        assert_eq!(kinds.first().map(String::as_str), Some("layout.grid"));
        assert!(kinds.iter().any(|k| k == "paginate.run"));
        assert_eq!(kinds.iter().filter(|k| *k == "render.sheet").count(), 2);
        assert!(kinds.iter().any(|k| k == "pdf.winansi.fallback"));
        assert_eq!(kinds.last().map(String::as_str), Some("debug.summary"));

        let _ = std::fs::remove_file(&pdf_path);
        let _ = std::fs::remove_file(&log_path);
    }

    #[test]
    fn identical_input_gives_identical_pdf() {
        let engine = LabelSheets::builder().build().expect("build");
        let sheets = engine.paginate(entries(5), 1).expect("paginate");
        let a = engine.render_pdf(&sheets).expect("a");
        let b = engine.render_pdf(&sheets).expect("b");
        assert_eq!(a, b);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetMetrics {
    pub sheet_number: usize,
    pub label_count: usize,
    pub blank_count: usize,
    pub command_count: usize,
    pub render_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunMetrics {
    pub sheets: Vec<SheetMetrics>,
    pub total_labels: usize,
    pub total_blanks: usize,
    pub total_render_ms: f64,
    pub pdf_bytes: usize,
}

impl RunMetrics {
    pub(crate) fn push(&mut self, sheet: SheetMetrics) {
        self.total_labels += sheet.label_count;
        self.total_blanks += sheet.blank_count;
        self.total_render_ms += sheet.render_ms;
        self.sheets.push(sheet);
    }
}

use crate::canvas::{Canvas, Document};
use crate::content::{Currency, LabelBranding, LabelContent};
use crate::debug::DebugLogger;
use crate::layout::{GridLayout, MmRect};
use crate::metrics::{RunMetrics, SheetMetrics};
use crate::paginate::{Cell, Sheet};
use crate::types::{Color, Pt, Rect, Size};
use serde_json::json;
use std::time::Instant;

pub const META_SHEET_KEY: &str = "__labelsheet_sheet";

const FONT_REGULAR: &str = "Helvetica";
const FONT_BOLD: &str = "Helvetica-Bold";

// Helvetica averages a little over half an em per glyph.
const AVG_GLYPH_EM: f64 = 0.55;

struct Palette {
    cell_border: Color,
    blank_border: Color,
    frame: Color,
    header: Color,
    table: Color,
    table_text: Color,
    image_fill: Color,
    image_border: Color,
    licence: Color,
}

const PALETTE: Palette = Palette {
    cell_border: Color {
        r: 0.933,
        g: 0.933,
        b: 0.933,
    },
    blank_border: Color {
        r: 0.8,
        g: 0.8,
        b: 0.8,
    },
    frame: Color::BLACK,
    header: Color {
        r: 0.102,
        g: 0.137,
        b: 0.494,
    },
    table: Color {
        r: 0.627,
        g: 0.322,
        b: 0.176,
    },
    table_text: Color {
        r: 0.42,
        g: 0.243,
        b: 0.118,
    },
    image_fill: Color {
        r: 0.961,
        g: 0.961,
        b: 0.961,
    },
    image_border: Color {
        r: 0.867,
        g: 0.867,
        b: 0.867,
    },
    licence: Color {
        r: 0.18,
        g: 0.49,
        b: 0.196,
    },
};

/// Options shared by every sheet of one render pass.
pub struct RenderOptions<'a> {
    pub branding: &'a LabelBranding,
    pub currency: &'a Currency,
    pub debug: Option<&'a DebugLogger>,
}

fn rect_from_mm(rect: MmRect) -> Rect {
    Rect {
        x: Pt::from_mm(rect.x),
        y: Pt::from_mm(rect.y),
        width: Pt::from_mm(rect.width),
        height: Pt::from_mm(rect.height),
    }
}

fn inset(rect: Rect, amount: Pt) -> Rect {
    Rect {
        x: rect.x + amount,
        y: rect.y + amount,
        width: (rect.width - amount - amount).max(Pt::ZERO),
        height: (rect.height - amount - amount).max(Pt::ZERO),
    }
}

/// Cuts `text` so its estimated width fits, marking the cut with "...".
fn fit_text(text: &str, width: Pt, size: f64) -> String {
    let glyph = size * AVG_GLYPH_EM;
    if glyph <= 0.0 {
        return String::new();
    }
    let max_chars = (width.to_f64() / glyph).floor().max(0.0) as usize;
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let head: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", head.trim_end())
}

fn draw_blank(canvas: &mut Canvas, cell: Rect) {
    canvas.save_state();
    canvas.set_stroke_color(PALETTE.blank_border);
    canvas.set_line_width(Pt::from_f64(0.75));
    canvas.set_dash(vec![Pt::from_f64(3.0), Pt::from_f64(2.0)], Pt::ZERO);
    canvas.stroke_rect(inset(cell, Pt::from_f64(2.0)));
    canvas.restore_state();
}

fn draw_label(canvas: &mut Canvas, area: Rect, content: &LabelContent) {
    let pad = Pt::from_f64(3.75);
    canvas.save_state();
    canvas.set_stroke_color(PALETTE.frame);
    canvas.set_line_width(Pt::from_f64(0.75));
    canvas.stroke_rect(area);

    let inner = inset(area, pad);
    let mut cursor = inner.y;
    let bottom = inner.y + inner.height;

    if !content.shop_name.is_empty() || !content.shop_address.is_empty() {
        canvas.set_fill_color(PALETTE.header);
        if !content.shop_name.is_empty() {
            canvas.set_font_name(FONT_BOLD);
            canvas.set_font_size(Pt::from_f64(10.5));
            canvas.draw_string(inner.x, cursor, fit_text(&content.shop_name, inner.width, 10.5));
            cursor = cursor + Pt::from_f64(12.6);
        }
        if !content.shop_address.is_empty() {
            canvas.set_font_name(FONT_REGULAR);
            canvas.set_font_size(Pt::from_f64(7.5));
            canvas.draw_string(
                inner.x,
                cursor,
                fit_text(&content.shop_address, inner.width, 7.5),
            );
            cursor = cursor + Pt::from_f64(9.0);
        }
        canvas.set_stroke_color(PALETTE.header);
        canvas.set_line_width(Pt::from_f64(0.75));
        cursor = cursor + Pt::from_f64(1.5);
        canvas.draw_line(inner.x, cursor, inner.x + inner.width, cursor);
        cursor = cursor + Pt::from_f64(3.0);
    }

    let mut body_bottom = bottom;
    if !content.licence.is_empty() {
        let footer_top = bottom - Pt::from_f64(9.0);
        canvas.set_stroke_color(PALETTE.header);
        canvas.set_line_width(Pt::from_f64(0.75));
        canvas.draw_line(inner.x, footer_top, inner.x + inner.width, footer_top);
        canvas.set_fill_color(PALETTE.licence);
        canvas.set_font_name(FONT_BOLD);
        canvas.set_font_size(Pt::from_f64(7.5));
        let label_y = footer_top + Pt::from_f64(1.5);
        canvas.draw_string(inner.x, label_y, "FSSAI");
        canvas.set_fill_color(PALETTE.frame);
        canvas.set_font_size(Pt::from_f64(6.0));
        let licence_x = inner.x + Pt::from_f64(27.0);
        let licence_width = (inner.width - Pt::from_f64(27.0)).max(Pt::ZERO);
        canvas.draw_string(
            licence_x,
            label_y + Pt::from_f64(1.0),
            fit_text(&content.licence, licence_width, 6.0),
        );
        body_bottom = footer_top - Pt::from_f64(2.0);
    }

    let body = Rect {
        x: inner.x,
        y: cursor,
        width: inner.width,
        height: (body_bottom - cursor).max(Pt::ZERO),
    };
    let gap = Pt::from_f64(3.75);
    let image_width = body.width * 0.45;
    let image = Rect {
        width: image_width,
        ..body
    };
    let table = Rect {
        x: body.x + image_width + gap,
        width: (body.width - image_width - gap).max(Pt::ZERO),
        ..body
    };

    canvas.set_fill_color(PALETTE.image_fill);
    canvas.draw_rect(image);
    canvas.set_stroke_color(PALETTE.image_border);
    canvas.set_line_width(Pt::from_f64(0.75));
    canvas.stroke_rect(image);
    canvas.set_fill_color(PALETTE.frame);
    canvas.set_font_name(FONT_BOLD);
    canvas.set_font_size(Pt::from_f64(7.5));
    let name_y = image.y + image.height * 0.5 - Pt::from_f64(3.75);
    canvas.draw_string(
        image.x + Pt::from_f64(3.0),
        name_y,
        fit_text(&content.product_name, image.width - Pt::from_f64(6.0), 7.5),
    );
    if let Some(image_ref) = content.image_ref.as_deref() {
        canvas.set_font_name(FONT_REGULAR);
        canvas.set_font_size(Pt::from_f64(5.0));
        canvas.draw_string(
            image.x + Pt::from_f64(3.0),
            name_y + Pt::from_f64(9.0),
            fit_text(image_ref, image.width - Pt::from_f64(6.0), 5.0),
        );
    }

    draw_detail_table(canvas, table, content);
    canvas.restore_state();
}

fn draw_detail_table(canvas: &mut Canvas, table: Rect, content: &LabelContent) {
    let rows = content.rows.len();
    if rows == 0 {
        return;
    }
    let row_height = Pt::from_f64(table.height.to_f64() / rows as f64);
    let split = table.x + table.width * 0.5;
    let col_width = table.width * 0.5 - Pt::from_f64(4.0);
    let text_size = 6.75;

    canvas.set_stroke_color(PALETTE.table);
    canvas.set_line_width(Pt::from_f64(0.75));
    canvas.stroke_rect(table);
    canvas.draw_line(split, table.y, split, table.y + table.height);
    canvas.set_fill_color(PALETTE.table_text);
    canvas.set_font_size(Pt::from_f64(text_size));

    let mut top = table.y;
    for (idx, row) in content.rows.iter().enumerate() {
        if idx > 0 {
            canvas.draw_line(table.x, top, table.x + table.width, top);
        }
        let text_y = top + (row_height - Pt::from_f64(text_size)) * 0.5;
        canvas.set_font_name(FONT_BOLD);
        canvas.draw_string(
            table.x + Pt::from_f64(2.0),
            text_y,
            fit_text(row.caption, col_width, text_size),
        );
        canvas.set_font_name(FONT_REGULAR);
        canvas.draw_string(
            split + Pt::from_f64(2.0),
            text_y,
            fit_text(&row.value, col_width, text_size),
        );
        top = top + row_height;
    }
}

/// Draws every sheet as one page. Geometry must already be validated, which
/// `GridLayout` guarantees by construction.
pub fn render_sheets(
    sheets: &[Sheet],
    grid: &GridLayout,
    options: &RenderOptions<'_>,
) -> (Document, RunMetrics) {
    let page = grid.page();
    let padding = grid.label().padding;
    let mut canvas = Canvas::new(Size::from_mm(page.width_mm, page.height_mm));
    let mut metrics = RunMetrics::default();

    for sheet in sheets {
        let started = Instant::now();
        canvas.meta(META_SHEET_KEY, sheet.number.to_string());
        for (index, cell) in sheet.cells.iter().enumerate() {
            let rect_mm = grid.cell_rect_mm(index);
            let outer = rect_from_mm(rect_mm);
            canvas.set_stroke_color(PALETTE.cell_border);
            canvas.set_line_width(Pt::from_f64(0.75));
            canvas.stroke_rect(outer);
            match cell {
                Cell::Blank => draw_blank(&mut canvas, outer),
                Cell::Label(entry) => {
                    let area = rect_from_mm(MmRect {
                        x: rect_mm.x + padding.left,
                        y: rect_mm.y + padding.top,
                        width: rect_mm.width - padding.horizontal(),
                        height: rect_mm.height - padding.vertical(),
                    });
                    let content = LabelContent::new(entry, options.branding, options.currency);
                    draw_label(&mut canvas, area, &content);
                }
            }
        }

        let sheet_metrics = SheetMetrics {
            sheet_number: sheet.number,
            label_count: sheet.label_count(),
            blank_count: sheet.blank_count(),
            command_count: canvas.current_command_count(),
            render_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        if let Some(logger) = options.debug {
            logger.log_event(
                "render.sheet",
                json!({
                    "sheet": sheet_metrics.sheet_number,
                    "labels": sheet_metrics.label_count,
                    "blanks": sheet_metrics.blank_count,
                    "commands": sheet_metrics.command_count,
                }),
            );
            logger.increment("render.sheets", 1);
            logger.increment("render.labels", sheet_metrics.label_count as u64);
        }
        metrics.push(sheet_metrics);
        canvas.show_page();
    }

    (canvas.finish(), metrics)
}

use crate::canvas::{Command, Document, Page};
use crate::debug::DebugLogger;
use crate::error::LabelSheetError;
use crate::types::{Color, Pt};
use lopdf::{Dictionary, Object, ObjectId, Stream, dictionary};
use serde_json::json;

const FONT_REGULAR_KEY: &str = "F1";
const FONT_BOLD_KEY: &str = "F2";

fn pdf_error(err: impl std::fmt::Display) -> LabelSheetError {
    LabelSheetError::Pdf(err.to_string())
}

fn font_key(name: &str) -> &'static str {
    if name.ends_with("-Bold") {
        FONT_BOLD_KEY
    } else {
        FONT_REGULAR_KEY
    }
}

fn fmt(value: f32) -> String {
    Pt::from_f64(value as f64).to_pdf_number()
}

fn fmt_pt(value: Pt) -> String {
    value.to_pdf_number()
}

fn color_to_pdf_fill(color: Color) -> String {
    format!("{} {} {} rg\n", fmt(color.r), fmt(color.g), fmt(color.b))
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!("{} {} {} RG\n", fmt(color.r), fmt(color.g), fmt(color.b))
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
    fallbacks: usize,
}

/// Encodes text for a base-14 font as an escaped PDF literal body. Characters
/// outside cp1252 get an ASCII stand-in when one exists, else `?`.
fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    let mut fallbacks = 0usize;
    for ch in input.chars() {
        let fallback = match ch {
            '\u{20B9}' => Some("Rs."),
            '\u{2265}' => Some(">="),
            '\u{2264}' => Some("<="),
            '\u{2212}' => Some("-"),
            _ => None,
        };
        if let Some(text) = fallback {
            out.push_str(text);
            fallbacks += 1;
            continue;
        }

        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => {
                replaced += 1;
                b'?'
            }
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if !(0x20..0x7f).contains(&b) => out.push_str(&format!("\\{b:03o}")),
            b => out.push(b as char),
        }
    }

    WinAnsiEncoded {
        text: out,
        replaced,
        fallbacks,
    }
}

fn truncate_preview(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Content stream for one page. Canvas space is top-left; PDF space is
/// bottom-left, so every y is flipped against the page height.
fn render_page(page: &Page, page_height: Pt, debug: Option<&DebugLogger>) -> String {
    let mut out = String::new();
    let mut font_size = Pt::from_f64(12.0);
    let mut font_name = "Helvetica".to_string();
    let mut saved: Vec<(Pt, String)> = Vec::new();

    for cmd in &page.commands {
        match cmd {
            Command::SaveState => {
                saved.push((font_size, font_name.clone()));
                out.push_str("q\n");
            }
            Command::RestoreState => {
                if let Some((size, name)) = saved.pop() {
                    font_size = size;
                    font_name = name;
                }
                out.push_str("Q\n");
            }
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
            Command::SetStrokeColor(color) => out.push_str(&color_to_pdf_stroke(*color)),
            Command::SetLineWidth(width) => {
                out.push_str(&format!("{} w\n", fmt_pt(*width)));
            }
            Command::SetDash { pattern, phase } => {
                let items = pattern
                    .iter()
                    .map(|v| fmt_pt(*v))
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push_str(&format!("[{items}] {} d\n", fmt_pt(*phase)));
            }
            Command::SetFontName(name) => font_name = name.clone(),
            Command::SetFontSize(size) => font_size = *size,
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::Stroke => out.push_str("S\n"),
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re f\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::StrokeRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re S\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::DrawString { x, y, text } => {
                let encoded = encode_winansi_pdf_string(text);
                if let Some(logger) = debug {
                    if encoded.fallbacks > 0 {
                        logger.log_event(
                            "pdf.winansi.fallback",
                            json!({
                                "font": font_name,
                                "fallbacks": encoded.fallbacks,
                                "sample": truncate_preview(text, 80),
                            }),
                        );
                        logger.increment("pdf.winansi.fallback", encoded.fallbacks as u64);
                    }
                    if encoded.replaced > 0 {
                        logger.log_event(
                            "pdf.winansi.lossy",
                            json!({
                                "font": font_name,
                                "replaced": encoded.replaced,
                                "sample": truncate_preview(text, 80),
                            }),
                        );
                        logger.increment("pdf.winansi.lossy", encoded.replaced as u64);
                    }
                }
                out.push_str("BT\n");
                out.push_str(&format!(
                    "/{} {} Tf\n",
                    font_key(&font_name),
                    fmt_pt(font_size)
                ));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - font_size)
                ));
                out.push_str(&format!("({}) Tj\nET\n", encoded.text));
            }
        }
    }
    out
}

fn font_object(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn media_box(document: &Document) -> Vec<Object> {
    vec![
        0.into(),
        0.into(),
        Object::Real(document.page_size.width.to_f64() as f32),
        Object::Real(document.page_size.height.to_f64() as f32),
    ]
}

/// Serialises a canvas document. Output is byte-for-byte stable for equal
/// input: no timestamps or random identifiers are written.
pub fn document_to_pdf(
    document: &Document,
    debug: Option<&DebugLogger>,
) -> Result<Vec<u8>, LabelSheetError> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font_object("Helvetica"));
    let bold_id = doc.add_object(font_object("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_REGULAR_KEY => regular_id,
            FONT_BOLD_KEY => bold_id,
        },
    });

    let page_height = document.page_size.height;
    let mut kids: Vec<Object> = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let content = render_page(page, page_height, debug);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => media_box(document),
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(pdf_error)?;
    if let Some(logger) = debug {
        logger.log_event(
            "pdf.write",
            json!({ "pages": count, "bytes": out.len() }),
        );
    }
    Ok(out)
}

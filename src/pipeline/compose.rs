//! Report composition: summary page(s) + one page per annotated image → PDF.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────── A4, 10 mm margins ────────────┐
//! │        Blueprint Detection Report         │  Helvetica-Bold 16
//! │ Total Doors: 4                            │  Helvetica 12
//! │ Total Windows: 9                          │
//! │ Comment: …word-wrapped to the margins…    │  only when supplied
//! └───────────────────────────────────────────┘
//! then, per annotated page, the image scaled to the printable width.
//! ```
//!
//! A comment long enough to run past the bottom margin continues on further
//! summary pages; nothing is truncated. The layout is computed separately
//! from PDF serialisation so it can be checked without parsing a PDF.

use crate::error::BlueprintError;
use crate::output::Counts;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};

/// A4 portrait, in PDF points.
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

/// 10 mm.
pub const MARGIN: f32 = 28.35;

const MM: f32 = 2.8346;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 12.0;
const TITLE_LINE: f32 = 10.0 * MM;
const COUNT_LINE: f32 = 8.0 * MM;
const COMMENT_LINE: f32 = 6.0 * MM;
const SECTION_GAP: f32 = 5.0 * MM;

/// Average Helvetica glyph width as a fraction of the font size; used for
/// centring and wrapping.
const AVG_CHAR_WIDTH: f32 = 0.5;
const AVG_BOLD_CHAR_WIDTH: f32 = 0.56;

/// Printable width between the margins.
pub fn printable_width() -> f32 {
    PAGE_WIDTH - 2.0 * MARGIN
}

/// Printable height between the margins.
pub fn printable_height() -> f32 {
    PAGE_HEIGHT - 2.0 * MARGIN
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// One positioned line of text on a summary page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub font: Font,
    pub size: f32,
    pub x: f32,
    pub baseline: f32,
    pub text: String,
}

/// The text of the summary section, before layout.
pub fn summary_lines(counts: &Counts, comment: Option<&str>) -> (Vec<String>, Option<String>) {
    let totals = vec![
        format!("Total Doors: {}", counts.door),
        format!("Total Windows: {}", counts.window),
    ];
    let comment = comment
        .filter(|c| !c.is_empty())
        .map(|c| format!("Comment: {c}"));
    (totals, comment)
}

/// Lay out the summary section into one or more pages of positioned text.
pub fn layout_summary(title: &str, counts: &Counts, comment: Option<&str>) -> Vec<Vec<TextLine>> {
    let (totals, comment) = summary_lines(counts, comment);
    let mut pages = vec![Vec::new()];
    let mut y = PAGE_HEIGHT - MARGIN;

    let title_width = title.chars().count() as f32 * TITLE_SIZE * AVG_BOLD_CHAR_WIDTH;
    pages[0].push(TextLine {
        font: Font::Bold,
        size: TITLE_SIZE,
        x: MARGIN + ((printable_width() - title_width) / 2.0).max(0.0),
        baseline: y - TITLE_SIZE,
        text: title.to_string(),
    });
    y -= TITLE_LINE + SECTION_GAP;

    for line in totals {
        pages[0].push(TextLine {
            font: Font::Regular,
            size: BODY_SIZE,
            x: MARGIN,
            baseline: y - BODY_SIZE,
            text: line,
        });
        y -= COUNT_LINE;
    }
    y -= SECTION_GAP;

    if let Some(comment) = comment {
        let max_chars = (printable_width() / (BODY_SIZE * AVG_CHAR_WIDTH)) as usize;
        for line in wrap_text(&comment, max_chars) {
            if y - COMMENT_LINE < MARGIN {
                pages.push(Vec::new());
                y = PAGE_HEIGHT - MARGIN;
            }
            if let Some(page) = pages.last_mut() {
                page.push(TextLine {
                    font: Font::Regular,
                    size: BODY_SIZE,
                    x: MARGIN,
                    baseline: y - BODY_SIZE,
                    text: line,
                });
            }
            y -= COMMENT_LINE;
        }
    }

    pages
}

/// Greedy word wrap that never drops characters.
///
/// Explicit newlines start a new line; within a paragraph the returned
/// pieces concatenate back to the paragraph exactly (spaces stay at the end
/// of the line they follow). Words longer than `max_chars` are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
        let mut current = String::new();
        let mut current_len = 0usize;

        for token in paragraph.split_inclusive(' ') {
            let visible = token.trim_end_matches(' ').chars().count();
            if current_len > 0 && current_len + visible > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            for ch in token.chars() {
                if current_len >= max_chars && ch != ' ' {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current.push(ch);
                current_len += 1;
            }
        }
        lines.push(current);
    }

    lines
}

/// Target size of an image on the page: printable width, shrunk further
/// if that would overflow the printable height.
pub fn fit_image(width: u32, height: u32) -> (f32, f32) {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let mut scale = printable_width() / w;
    if h * scale > printable_height() {
        scale = printable_height() / h;
    }
    (w * scale, h * scale)
}

/// Encode text for a WinAnsi-encoded standard font. Unmappable characters become `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| win_ansi_byte(c).unwrap_or(b'?')).collect()
}

/// Characters of `text` that the standard fonts cannot show, in order.
pub fn unencodable(text: &str) -> Vec<char> {
    text.chars().filter(|&c| win_ansi_byte(c).is_none()).collect()
}

fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        '\t' => Some(b' '),
        ' '..='~' => Some(c as u8),
        '\u{A0}'..='\u{FF}' => Some(c as u32 as u8),
        '€' => Some(0x80),
        '…' => Some(0x85),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        _ => None,
    }
}

/// Compose the report PDF.
///
/// `pages` are PNG (or any decodable raster) buffers in document order.
/// A buffer that does not decode is fatal for the whole report.
pub fn compose_report(
    title: &str,
    counts: &Counts,
    comment: Option<&str>,
    pages: &[&[u8]],
) -> Result<Vec<u8>, BlueprintError> {
    for (what, text) in [("title", Some(title)), ("comment", comment)] {
        let missing = text.map(unencodable).unwrap_or_default();
        if !missing.is_empty() {
            warn!(
                "Report {what} has {} character(s) outside WinAnsi, shown as '?': {}",
                missing.len(),
                missing.iter().collect::<String>()
            );
        }
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();

    for lines in layout_summary(title, counts, comment) {
        let content = text_content(&lines);
        let resources = dictionary! {
            "Font" => dictionary! {
                Font::Regular.resource_name() => regular,
                Font::Bold.resource_name() => bold,
            },
        };
        kids.push(add_page(&mut doc, pages_id, content, resources)?.into());
    }

    for (idx, buf) in pages.iter().enumerate() {
        let image = image::load_from_memory(buf)
            .map_err(|e| BlueprintError::CompositionError {
                detail: format!("annotated page {} cannot be embedded: {}", idx + 1, e),
            })?
            .to_rgb8();
        let (w, h) = image.dimensions();

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w as i64,
                "Height" => h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            image.into_raw(),
        ));

        let (dw, dh) = fit_image(w, h);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(dw),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(dh),
                        Object::Real(MARGIN),
                        Object::Real(PAGE_HEIGHT - MARGIN - dh),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let resources = dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        };
        kids.push(add_page(&mut doc, pages_id, content, resources)?.into());
        debug!("Embedded page {} ({}x{} px → {:.0}x{:.0} pt)", idx + 1, w, h, dw, dh);
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| BlueprintError::CompositionError {
            detail: format!("cannot serialise PDF: {e}"),
        })?;

    debug!("Composed report: {} pages, {} bytes", count, out.len());
    Ok(out)
}

fn text_content(lines: &[TextLine]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 4);
    for line in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![line.font.resource_name().into(), Object::Real(line.size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(line.x), Object::Real(line.baseline)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(&line.text), StringFormat::Hexadecimal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

fn add_page(
    doc: &mut Document,
    parent: ObjectId,
    content: Content,
    resources: Dictionary,
) -> Result<ObjectId, BlueprintError> {
    let bytes = content
        .encode()
        .map_err(|e| BlueprintError::CompositionError {
            detail: format!("cannot encode page content: {e}"),
        })?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => content_id,
        "Resources" => resources,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_png;
    use image::{Rgb, RgbImage};

    fn png(w: u32, h: u32) -> Vec<u8> {
        encode_png(&RgbImage::from_pixel(w, h, Rgb([200, 200, 200]))).unwrap()
    }

    fn counts(door: usize, window: usize) -> Counts {
        Counts { door, window }
    }

    /// Hex strings shown with `Tj` on one page, decoded to bytes.
    fn shown_text(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
        let raw = doc.get_page_content(page_id).unwrap();
        Content::decode(&raw)
            .unwrap()
            .operations
            .into_iter()
            .filter(|op| op.operator == "Tj")
            .map(|op| op.operands[0].as_str().unwrap().to_vec())
            .collect()
    }

    fn image_width(doc: &Document, page_id: ObjectId) -> i64 {
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        stream.dict.get(b"Width").unwrap().as_i64().unwrap()
    }

    #[test]
    fn one_summary_page_plus_one_per_image() {
        let images = [png(640, 640), png(640, 640), png(640, 640)];
        let refs: Vec<&[u8]> = images.iter().map(|b| b.as_slice()).collect();

        let one = compose_report("T", &counts(1, 2), None, &refs[..1]).unwrap();
        let three = compose_report("T", &counts(1, 2), None, &refs).unwrap();

        assert_eq!(Document::load_mem(&one).unwrap().get_pages().len(), 2);
        assert_eq!(Document::load_mem(&three).unwrap().get_pages().len(), 4);
    }

    #[test]
    fn pages_keep_input_order() {
        let images = [png(640, 640), png(300, 200), png(100, 700)];
        let refs: Vec<&[u8]> = images.iter().map(|b| b.as_slice()).collect();
        let pdf = compose_report("T", &counts(0, 0), None, &refs).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        let widths: Vec<i64> = ids[1..].iter().map(|&id| image_width(&doc, id)).collect();
        assert_eq!(widths, vec![640, 300, 100]);
    }

    #[test]
    fn summary_shows_counts_and_verbatim_comment() {
        let comment = "Check stair (B) windows \\ fire exits — 2nd floor";
        let pdf = compose_report(
            "Blueprint Detection Report",
            &counts(4, 9),
            Some(comment),
            &[png(640, 640).as_slice()],
        )
        .unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let summary = *doc.get_pages().values().next().unwrap();
        let text = shown_text(&doc, summary);

        assert_eq!(text[0], b"Blueprint Detection Report".to_vec());
        assert_eq!(text[1], b"Total Doors: 4".to_vec());
        assert_eq!(text[2], b"Total Windows: 9".to_vec());
        assert_eq!(text[3..].concat(), win_ansi(&format!("Comment: {comment}")));
    }

    #[test]
    fn no_comment_means_no_comment_section() {
        for comment in [None, Some("")] {
            let (_, section) = summary_lines(&counts(0, 0), comment);
            assert!(section.is_none());

            let pages = layout_summary("T", &counts(0, 0), comment);
            assert_eq!(pages.len(), 1);
            assert_eq!(pages[0].len(), 3);
            assert!(pages[0].iter().all(|l| !l.text.starts_with("Comment")));
        }
    }

    #[test]
    fn long_comment_flows_onto_more_summary_pages() {
        let comment = "wall ".repeat(3000);
        let pages = layout_summary("T", &counts(0, 0), Some(&comment));
        assert!(pages.len() > 1);

        let shown: String = pages
            .iter()
            .flatten()
            .skip(3)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(shown, format!("Comment: {comment}"));

        for line in pages.iter().flatten() {
            assert!(line.baseline >= MARGIN - BODY_SIZE, "baseline {}", line.baseline);
        }

        let pdf = compose_report("T", &counts(0, 0), Some(&comment), &[png(10, 10).as_slice()]).unwrap();
        let n = Document::load_mem(&pdf).unwrap().get_pages().len();
        assert_eq!(n, pages.len() + 1);
    }

    #[test]
    fn wrap_keeps_every_character() {
        let text = "a quick brown fox jumps over the extraordinarilylongword dog";
        let lines = wrap_text(text, 10);
        assert_eq!(lines.concat(), text);
        for line in &lines {
            assert!(line.trim_end().chars().count() <= 10, "{line:?}");
        }
    }

    #[test]
    fn wrap_honours_newlines() {
        let lines = wrap_text("first\r\nsecond\n\nthird", 80);
        assert_eq!(lines, vec!["first", "second", "", "third"]);
    }

    #[test]
    fn images_fill_the_printable_width() {
        let (w, h) = fit_image(640, 640);
        assert!((w - printable_width()).abs() < 0.01);
        assert!((h - w).abs() < 0.01);

        let (w, h) = fit_image(100, 1000);
        assert!((h - printable_height()).abs() < 0.01);
        assert!(w < printable_width());
    }

    #[test]
    fn win_ansi_maps_latin1_and_replaces_the_rest() {
        assert_eq!(win_ansi("Ab("), b"Ab(".to_vec());
        assert_eq!(win_ansi("é"), vec![0xE9]);
        assert_eq!(win_ansi("—"), vec![0x97]);
        assert_eq!(win_ansi("门"), b"?".to_vec());
    }

    #[test]
    fn unencodable_lists_replaced_characters() {
        assert_eq!(unencodable("门窗 ✓"), vec!['门', '窗', '✓']);
        assert!(unencodable("Façade – level 2…").is_empty());
    }

    #[test]
    fn corrupt_page_is_a_composition_error() {
        let err = compose_report("T", &counts(0, 0), None, &[b"\x89PNG broken".as_slice()])
            .unwrap_err();
        match err {
            BlueprintError::CompositionError { detail } => assert!(detail.contains("page 1")),
            other => panic!("expected CompositionError, got {other}"),
        }
    }
}

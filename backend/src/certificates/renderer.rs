//! Turns fully substituted document markup into a stored PDF.
//!
//! The markup is line based:
//! - `# text` / `## text`: centered title and subtitle
//! - `- text`: bulleted item
//! - `[img:relative/path.png]`: image resolved against the base path
//! - empty line (or a heading marker with no text): vertical break
//! - anything else: a paragraph
//!
//! Inside a line `***x***`, `**x**` and `*x*` select bold italic, bold and
//! italic. `<b>`, `<strong>`, `<i>`, `<em>` and `<br>` are accepted as well.

use crate::error::{IssuanceError, Result};
use genpdf::elements::{Break, Image as PdfImage, LinearLayout, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Document, Element};
use image::imageops::FilterType;
use image::{load_from_memory, DynamicImage, GenericImageView};
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const PAGE_WIDTH_INCH: f64 = 8.27;
const MARGIN_MM: f64 = 15.0;
const IMAGE_DPI: f64 = 150.0;
/// Largest image edge, in CSS pixels at 96 px per inch.
const MAX_IMAGE_CSS_PX: f64 = 240.0;
const BODY_FONT_SIZE: u8 = 12;
const TITLE_FONT_SIZE: u8 = 24;
const SUBTITLE_FONT_SIZE: u8 = 15;

/// Renders a document into a file and reports where it was stored.
///
/// Implementations are synchronous and report every failure as
/// `IssuanceError::Render`.
pub trait ArtifactRenderer: Send + Sync {
    /// Renders `markup` into `<output>/<file_stem>.<ext>`. Relative resources
    /// referenced by the markup are resolved against `base_path`.
    fn render_to_file(&self, markup: &str, base_path: &Path, file_stem: &str) -> Result<PathBuf>;
}

/// genpdf-backed renderer writing `<certificate_number>.pdf` files.
pub struct PdfRenderer {
    output_dir: PathBuf,
}

impl PdfRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        PdfRenderer {
            output_dir: output_dir.into(),
        }
    }
}

impl ArtifactRenderer for PdfRenderer {
    fn render_to_file(&self, markup: &str, base_path: &Path, file_stem: &str) -> Result<PathBuf> {
        let mut doc = configure_document(base_path, file_stem)?;
        // Keep temporary image files alive until rendering finishes.
        let mut temp_files: Vec<NamedTempFile> = Vec::new();

        let markup = normalize_inline_html(markup);
        for line in markup.lines() {
            let line = line.trim_end();
            if line.is_empty() || line == "#" || line == "##" {
                doc.push(Break::new(1));
            } else if let Some(text) = line.strip_prefix("## ") {
                doc.push(heading(text, SUBTITLE_FONT_SIZE));
            } else if let Some(text) = line.strip_prefix("# ") {
                doc.push(heading(text, TITLE_FONT_SIZE));
            } else if let Some(item) = line.strip_prefix("- ") {
                handle_list_item(&mut doc, item);
            } else if let Some(path) = line.strip_prefix("[img:").and_then(|l| l.strip_suffix(']')) {
                handle_image_line(path, base_path, &mut temp_files, &mut doc)?;
            } else {
                doc.push(styled_paragraph(line));
            }
        }

        fs::create_dir_all(&self.output_dir).map_err(|e| IssuanceError::Render(e.to_string()))?;
        let out_path = self.output_dir.join(format!("{}.pdf", file_stem));
        let mut out_file =
            fs::File::create(&out_path).map_err(|e| IssuanceError::Render(e.to_string()))?;
        doc.render(&mut out_file)?;

        Ok(out_path)
    }
}

/// Load the font family from `<base>/fonts`: Arial when present, LiberationSans otherwise.
fn load_font(base_path: &Path) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>> {
    let fonts_dir = base_path.join("fonts");
    if let Ok(family) = genpdf::fonts::from_files(&fonts_dir, "Arial", None) {
        return Ok(family);
    }
    genpdf::fonts::from_files(&fonts_dir, "LiberationSans", None).map_err(|e| {
        IssuanceError::Render(format!("no usable font in {}: {}", fonts_dir.display(), e))
    })
}

fn configure_document(base_path: &Path, file_stem: &str) -> Result<Document> {
    let font_family = load_font(base_path)?;
    let mut doc = Document::new(font_family);
    doc.set_title(format!("Certificate {}", file_stem));
    doc.set_font_size(BODY_FONT_SIZE);
    doc.set_line_spacing(1.25f64);

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(MARGIN_MM);
    doc.set_page_decorator(decorator);
    Ok(doc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

#[derive(Debug, PartialEq, Eq)]
struct TextSegment {
    text: String,
    style: TextStyle,
}

impl TextSegment {
    fn to_styled(&self) -> StyledString {
        let style = match self.style {
            TextStyle::Regular => Style::new(),
            TextStyle::Bold => Style::new().bold(),
            TextStyle::Italic => Style::new().italic(),
            TextStyle::BoldItalic => Style::new().bold().italic(),
        };
        StyledString::new(self.text.clone(), style)
    }
}

/// Split a line into styled segments. An opening marker without a matching
/// closing marker is kept as literal text.
fn parse_styles(line: &str) -> Vec<TextSegment> {
    const MARKERS: [(&str, TextStyle); 3] = [
        ("***", TextStyle::BoldItalic),
        ("**", TextStyle::Bold),
        ("*", TextStyle::Italic),
    ];

    let mut segments: Vec<TextSegment> = Vec::new();
    let mut plain = String::new();
    let mut rest = line;

    'scan: while !rest.is_empty() {
        if rest.starts_with('*') {
            for (marker, style) in MARKERS {
                if let Some(after) = rest.strip_prefix(marker) {
                    if let Some(end) = after.find(marker).filter(|&end| end > 0) {
                        if !plain.is_empty() {
                            segments.push(TextSegment {
                                text: std::mem::take(&mut plain),
                                style: TextStyle::Regular,
                            });
                        }
                        segments.push(TextSegment {
                            text: after[..end].to_string(),
                            style,
                        });
                        rest = &after[end + marker.len()..];
                        continue 'scan;
                    }
                }
            }
            plain.push('*');
            rest = &rest[1..];
            continue;
        }
        let next = rest.find('*').unwrap_or(rest.len());
        plain.push_str(&rest[..next]);
        rest = &rest[next..];
    }

    if !plain.is_empty() {
        segments.push(TextSegment {
            text: plain,
            style: TextStyle::Regular,
        });
    }
    segments
}

/// Rewrites the few inline HTML tags body templates commonly carry into the
/// markup understood by `parse_styles`.
fn normalize_inline_html(markup: &str) -> String {
    const REPLACEMENTS: [(&str, &str); 12] = [
        ("<br />", "\n"),
        ("<br/>", "\n"),
        ("<br>", "\n"),
        ("<strong>", "**"),
        ("</strong>", "**"),
        ("<b>", "**"),
        ("</b>", "**"),
        ("<em>", "*"),
        ("</em>", "*"),
        ("<i>", "*"),
        ("</i>", "*"),
        ("\r\n", "\n"),
    ];
    REPLACEMENTS
        .iter()
        .fold(markup.to_string(), |acc, (from, to)| acc.replace(from, to))
}

fn push_segments_into_paragraph(p: &mut Paragraph, segments: &[TextSegment]) {
    for seg in segments {
        p.push(seg.to_styled());
    }
}

fn styled_paragraph(line: &str) -> Paragraph {
    let mut p = Paragraph::new("");
    push_segments_into_paragraph(&mut p, &parse_styles(line));
    p
}

fn heading(text: &str, font_size: u8) -> impl Element {
    let mut p = styled_paragraph(text);
    p.set_alignment(Alignment::Center);
    p.styled(Style::new().bold().with_font_size(font_size))
}

fn handle_list_item(doc: &mut Document, item_text: &str) {
    let mut p = Paragraph::new("");
    p.push(StyledString::new("• ", Style::new()));
    push_segments_into_paragraph(&mut p, &parse_styles(item_text));
    let mut layout = LinearLayout::vertical();
    layout.push(p);
    doc.push(layout);
}

/// Embed the image at `base_path/relative`, scaled down to fit the printable
/// width and the maximum image size, flattened onto white.
fn handle_image_line(
    relative: &str,
    base_path: &Path,
    temp_files: &mut Vec<NamedTempFile>,
    doc: &mut Document,
) -> Result<()> {
    let path = base_path.join(relative.trim());
    let bytes = fs::read(&path).map_err(|e| {
        IssuanceError::Render(format!("image {} not readable: {}", path.display(), e))
    })?;

    let margin_in = MARGIN_MM / 25.4_f64;
    let content_target_px = (PAGE_WIDTH_INCH - 2.0 * margin_in) * IMAGE_DPI;
    let max_target_px = MAX_IMAGE_CSS_PX * IMAGE_DPI / 96.0;

    let img = load_from_memory(&bytes)?;
    let (orig_w, orig_h) = img.dimensions();
    let orig_w_f = orig_w as f64;
    let orig_h_f = orig_h as f64;

    let scale = (content_target_px / orig_w_f)
        .min(max_target_px / orig_w_f)
        .min(max_target_px / orig_h_f)
        .min(1.0);

    let resized: DynamicImage = if scale >= 1.0 {
        img
    } else {
        let new_w = (orig_w_f * scale).max(1.0).round() as u32;
        let new_h = (orig_h_f * scale).max(1.0).round() as u32;
        img.resize(new_w, new_h, FilterType::Lanczos3)
    };

    let rgba = resized.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut background = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, &rgba, 0, 0);
    let raw = DynamicImage::ImageRgba8(background).to_rgb8().into_raw();

    let mut tmp = NamedTempFile::new().map_err(|e| IssuanceError::Render(e.to_string()))?;
    {
        let mut encoder = PngEncoder::new(tmp.as_file_mut(), w, h);
        encoder.set_color(PngColorType::Rgb);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&raw)?;
    }

    let mut img_elem = PdfImage::from_path(tmp.path())?;
    img_elem.set_dpi(IMAGE_DPI);
    img_elem.set_alignment(Alignment::Center);
    temp_files.push(tmp);
    doc.push(img_elem);
    Ok(())
}

/// Test double that stores the markup it receives as a text file.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct RecordingRenderer {
        pub output_dir: PathBuf,
        pub documents: Mutex<Vec<String>>,
        /// Stems whose rendering fails.
        pub fail_on: Vec<String>,
    }

    impl RecordingRenderer {
        pub(crate) fn new(output_dir: &Path) -> Self {
            RecordingRenderer {
                output_dir: output_dir.to_path_buf(),
                documents: Mutex::new(Vec::new()),
                fail_on: Vec::new(),
            }
        }

        pub(crate) fn documents(&self) -> Vec<String> {
            self.documents.lock().unwrap().clone()
        }
    }

    impl ArtifactRenderer for RecordingRenderer {
        fn render_to_file(&self, markup: &str, _base: &Path, file_stem: &str) -> Result<PathBuf> {
            if self.fail_on.iter().any(|s| s == file_stem) {
                return Err(IssuanceError::Render(format!("cannot render {}", file_stem)));
            }
            fs::create_dir_all(&self.output_dir).unwrap();
            let path = self.output_dir.join(format!("{}.pdf", file_stem));
            fs::write(&path, markup).unwrap();
            self.documents.lock().unwrap().push(markup.to_string());
            Ok(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, style: TextStyle) -> TextSegment {
        TextSegment {
            text: text.to_string(),
            style,
        }
    }

    #[test]
    fn parses_inline_styles() {
        assert_eq!(
            parse_styles("Awarded to **Asha** for *outstanding* ***work***."),
            vec![
                seg("Awarded to ", TextStyle::Regular),
                seg("Asha", TextStyle::Bold),
                seg(" for ", TextStyle::Regular),
                seg("outstanding", TextStyle::Italic),
                seg(" ", TextStyle::Regular),
                seg("work", TextStyle::BoldItalic),
                seg(".", TextStyle::Regular),
            ]
        );
    }

    #[test]
    fn unmatched_markers_stay_literal() {
        assert_eq!(
            parse_styles("5 * 3 = 15"),
            vec![seg("5 * 3 = 15", TextStyle::Regular)]
        );
        assert_eq!(parse_styles("**"), vec![seg("**", TextStyle::Regular)]);
    }

    #[test]
    fn html_tags_become_markup() {
        assert_eq!(
            normalize_inline_html("<b>Asha</b> of <i>B.Sc</i><br>Semester 5"),
            "**Asha** of *B.Sc*\nSemester 5"
        );
    }

    #[test]
    fn missing_fonts_are_a_render_fault() {
        let base = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let renderer = PdfRenderer::new(out.path());
        let err = renderer
            .render_to_file("# Certificate", base.path(), "ACDT-C-25-001")
            .unwrap_err();
        assert!(matches!(err, IssuanceError::Render(_)));
        assert!(!out.path().join("ACDT-C-25-001.pdf").exists());
    }
}

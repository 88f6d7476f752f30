use crate::error::FolioError;
use crate::model::{BBox, StyleFlags};
use crate::render::{check_page, PageRenderer, RenderedSpan};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::Write;
use std::process::Command;
use tracing::debug;

/// Rendering backend using pdftohtml (from poppler-utils).
///
/// Runs `pdftohtml -xml` once when the document is opened and keeps the
/// parsed spans. The temporary copy of the PDF lives only for the duration
/// of `open`.
pub struct PdftohtmlRenderer {
    pages: Vec<Vec<RenderedSpan>>,
}

impl PdftohtmlRenderer {
    pub fn open(pdf_bytes: &[u8]) -> Result<Self, FolioError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| FolioError::Render(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| FolioError::Render(e.to_string()))?;

        // -zoom 1 keeps coordinates in PDF points.
        let output = Command::new("pdftohtml")
            .args(["-xml", "-i", "-q", "-stdout", "-nodrm", "-fontfullname"])
            .args(["-zoom", "1"])
            .arg(tmpfile.path())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FolioError::PdftohtmlNotFound
                } else {
                    FolioError::Render(format!("pdftohtml failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(FolioError::PdftohtmlFailed { code, stderr });
        }

        let xml = String::from_utf8_lossy(&output.stdout);
        let pages = parse_pdf2xml(&xml)?;
        debug!(pages = pages.len(), "pdftohtml document opened");
        Ok(PdftohtmlRenderer { pages })
    }
}

impl PageRenderer for PdftohtmlRenderer {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_spans(&self, page: usize) -> Result<Vec<RenderedSpan>, FolioError> {
        check_page(page, self.pages.len())?;
        Ok(self.pages[page - 1].clone())
    }

    fn backend_name(&self) -> &str {
        "pdftohtml"
    }
}

#[derive(Debug, Clone)]
struct FontSpec {
    size: f32,
    family: String,
}

/// An open `<text>` element: its box, font and styled segments.
struct TextElement {
    bbox: BBox,
    font_id: String,
    segments: Vec<(String, StyleFlags)>,
}

fn parse_pdf2xml(xml: &str) -> Result<Vec<Vec<RenderedSpan>>, FolioError> {
    let mut reader = Reader::from_str(xml);
    let mut fonts: HashMap<String, FontSpec> = HashMap::new();
    let mut pages: Vec<Vec<RenderedSpan>> = Vec::new();
    let mut current: Option<TextElement> = None;
    let mut bold_depth = 0usize;
    let mut italic_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            FolioError::RenderOutput(format!(
                "pdftohtml xml at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"page" => pages.push(Vec::new()),
                b"fontspec" => insert_fontspec(&e, &mut fonts)?,
                b"text" => {
                    current = Some(TextElement {
                        bbox: text_bbox(&e)?,
                        font_id: attr(&e, "font")?.unwrap_or_default(),
                        segments: Vec::new(),
                    });
                }
                b"b" => bold_depth += 1,
                b"i" => italic_depth += 1,
                _ => {}
            },
            Event::Empty(e) => {
                if e.name().as_ref() == b"fontspec" {
                    insert_fontspec(&e, &mut fonts)?;
                }
            }
            Event::Text(t) => {
                if let Some(el) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| FolioError::RenderOutput(e.to_string()))?;
                    let style = StyleFlags {
                        bold: bold_depth > 0,
                        italic: italic_depth > 0,
                    };
                    el.segments.push((text.into_owned(), style));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"text" => {
                    if let Some(el) = current.take() {
                        let page = pages.last_mut().ok_or_else(|| {
                            FolioError::RenderOutput("<text> outside of <page>".into())
                        })?;
                        page.extend(element_spans(el, &fonts));
                    }
                    bold_depth = 0;
                    italic_depth = 0;
                }
                b"b" => bold_depth = bold_depth.saturating_sub(1),
                b"i" => italic_depth = italic_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(pages)
}

/// Split one `<text>` element into spans, one per style run. Run widths are
/// apportioned by character count.
fn element_spans(el: TextElement, fonts: &HashMap<String, FontSpec>) -> Vec<RenderedSpan> {
    let spec = fonts.get(&el.font_id).cloned().unwrap_or(FontSpec {
        size: el.bbox.height(),
        family: format!("font{}", el.font_id),
    });
    let family_style = style_from_family(&spec.family);

    // Adjacent segments with the same style form one run.
    let mut runs: Vec<(String, StyleFlags)> = Vec::new();
    for (text, style) in el.segments {
        match runs.last_mut() {
            Some((run_text, run_style)) if *run_style == style => run_text.push_str(&text),
            _ => runs.push((text, style)),
        }
    }

    let total_chars: usize = runs.iter().map(|(t, _)| t.chars().count()).sum();
    if total_chars == 0 {
        return Vec::new();
    }
    let per_char = el.bbox.width() / total_chars as f32;

    let mut spans = Vec::new();
    let mut offset = 0usize;
    for (text, tag_style) in runs {
        let n = text.chars().count();
        let x_min = el.bbox.x_min + per_char * offset as f32;
        offset += n;
        if text.trim().is_empty() {
            continue;
        }
        let style = StyleFlags {
            bold: tag_style.bold || family_style.bold,
            italic: tag_style.italic || family_style.italic,
        };
        spans.push(RenderedSpan {
            text,
            font: font_name(&spec.family, family_style, style),
            size: spec.size,
            style,
            bbox: BBox::new(
                x_min,
                el.bbox.y_min,
                x_min + per_char * n as f32,
                el.bbox.y_max,
            ),
        });
    }
    spans
}

fn style_from_family(family: &str) -> StyleFlags {
    let lower = family.to_lowercase();
    StyleFlags {
        bold: lower.contains("bold") || lower.contains("black") || lower.contains("heavy"),
        italic: lower.contains("italic") || lower.contains("oblique"),
    }
}

/// Font key for a run. When markup adds a style the family name does not
/// carry, the style is appended the way PDF base-font names do ("Arial,Bold").
fn font_name(family: &str, family_style: StyleFlags, style: StyleFlags) -> String {
    let extra_bold = style.bold && !family_style.bold;
    let extra_italic = style.italic && !family_style.italic;
    match (extra_bold, extra_italic) {
        (false, false) => family.to_string(),
        (true, false) => format!("{family},Bold"),
        (false, true) => format!("{family},Italic"),
        (true, true) => format!("{family},BoldItalic"),
    }
}

fn insert_fontspec(
    e: &BytesStart<'_>,
    fonts: &mut HashMap<String, FontSpec>,
) -> Result<(), FolioError> {
    let id = attr(e, "id")?
        .ok_or_else(|| FolioError::RenderOutput("<fontspec> without id".into()))?;
    let size = attr_f32(e, "size")?.unwrap_or(0.0);
    let family = attr(e, "family")?.unwrap_or_default();
    fonts.insert(id, FontSpec { size, family });
    Ok(())
}

fn text_bbox(e: &BytesStart<'_>) -> Result<BBox, FolioError> {
    let top = attr_f32(e, "top")?.unwrap_or(0.0);
    let left = attr_f32(e, "left")?.unwrap_or(0.0);
    let width = attr_f32(e, "width")?.unwrap_or(0.0);
    let height = attr_f32(e, "height")?.unwrap_or(0.0);
    Ok(BBox::new(left, top, left + width, top + height))
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, FolioError> {
    for a in e.attributes() {
        let a = a.map_err(|err| FolioError::RenderOutput(err.to_string()))?;
        if a.key.as_ref() == name.as_bytes() {
            let value = a
                .unescape_value()
                .map_err(|err| FolioError::RenderOutput(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn attr_f32(e: &BytesStart<'_>, name: &str) -> Result<Option<f32>, FolioError> {
    match attr(e, name)? {
        Some(v) => v.trim().parse::<f32>().map(Some).map_err(|err| {
            FolioError::RenderOutput(format!("attribute {name}='{v}': {err}"))
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE pdf2xml SYSTEM "pdf2xml.dtd">
<pdf2xml producer="poppler" version="23.02.0">
<page number="1" position="absolute" top="0" left="0" height="792" width="612">
	<fontspec id="0" size="13" family="ABCDEF+Calibri-Bold" color="#000000"/>
	<fontspec id="1" size="9" family="ABCDEF+Calibri" color="#000000"/>
<text top="100" left="50" width="60" height="14" font="0"><b>Goblin</b></text>
<text top="116" left="50" width="150" height="10" font="1"><i>Small humanoid (goblinoid)</i></text>
<text top="130" left="50" width="140" height="10" font="1"><b>Armor Class</b> 15 (leather)</text>
</page>
<page number="2" position="absolute" top="0" left="0" height="792" width="612">
<text top="40" left="50" width="40" height="10" font="1">Tom &amp; Jerry</text>
</page>
</pdf2xml>
"##;

    #[test]
    fn test_parse_pages_and_fonts() {
        let pages = parse_pdf2xml(SAMPLE).unwrap();
        assert_eq!(pages.len(), 2);

        let name = &pages[0][0];
        assert_eq!(name.text, "Goblin");
        assert_eq!(name.size, 13.0);
        assert!(name.style.bold);
        assert_eq!(name.font, "ABCDEF+Calibri-Bold");
        assert_eq!(name.bbox, BBox::new(50.0, 100.0, 110.0, 114.0));

        let kind = &pages[0][1];
        assert!(kind.style.italic);
        assert_eq!(kind.font, "ABCDEF+Calibri,Italic");
    }

    #[test]
    fn test_mixed_style_text_splits_into_runs() {
        let pages = parse_pdf2xml(SAMPLE).unwrap();
        let label = &pages[0][2];
        let value = &pages[0][3];
        assert_eq!(label.text, "Armor Class");
        assert!(label.style.bold);
        assert_eq!(label.font, "ABCDEF+Calibri,Bold");
        assert_eq!(value.text.trim(), "15 (leather)");
        assert!(!value.style.bold);
        assert!(value.bbox.x_min > label.bbox.x_min);
        assert!((value.bbox.x_max - 190.0).abs() < 0.01);
    }

    #[test]
    fn test_entities_unescaped() {
        let pages = parse_pdf2xml(SAMPLE).unwrap();
        assert_eq!(pages[1][0].text, "Tom & Jerry");
    }

    #[test]
    fn test_text_outside_page_is_an_error() {
        let xml = r#"<pdf2xml><text top="1" left="1" width="1" height="1" font="0">x</text></pdf2xml>"#;
        assert!(parse_pdf2xml(xml).is_err());
    }
}

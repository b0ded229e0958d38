//! Multi-format text extraction for uploaded documents.
//!
//! The request handler supplies raw bytes plus the declared media type;
//! this module returns plain UTF-8 text or a tagged [`ExtractError`] whose
//! [`kind`](ExtractError::kind) string is surfaced verbatim in 400 bodies.

use std::io::Read;

use thiserror::Error;

/// Supported MIME types.
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb
/// protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Structured extraction error. Tagged with a stable kind string so the
/// handler can merge it into an error body without string matching.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Your document has {page_count} pages. Max allowed: {max_allowed}.")]
    DocumentTooLong {
        page_count: usize,
        max_allowed: usize,
    },
    #[error("Error reading PDF: {0}")]
    Pdf(String),
    #[error("Error reading DOCX: {0}")]
    Docx(String),
    #[error("Error reading PPTX: {0}")]
    Pptx(String),
    #[error("File is not valid UTF-8 text: {0}")]
    TextDecode(String),
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
}

impl ExtractError {
    /// Machine-readable kind, used as the `error` field of 400 bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::DocumentTooLong { .. } => "document_too_long",
            ExtractError::Pdf(_) => "pdf_extraction_failed",
            ExtractError::Docx(_) => "docx_extraction_failed",
            ExtractError::Pptx(_) => "pptx_extraction_failed",
            ExtractError::TextDecode(_) => "text_decode_failed",
            ExtractError::UnsupportedMediaType(_) => "unsupported_file_type",
        }
    }
}

/// Returns true when `media_type` is one of the four supported MIME types.
pub fn is_supported(media_type: &str) -> bool {
    matches!(media_type, MIME_PDF | MIME_TEXT | MIME_DOCX | MIME_PPTX)
}

/// Extracts plain text from `bytes` according to the declared media type.
///
/// The request handler rejects unsupported media types with a fixed 400
/// before calling this; the `UnsupportedMediaType` arm is a guard for
/// library callers.
pub fn extract_text(
    bytes: &[u8],
    media_type: &str,
    max_pdf_pages: usize,
) -> Result<String, ExtractError> {
    match media_type {
        MIME_PDF => extract_pdf(bytes, max_pdf_pages),
        MIME_TEXT => decode_plain_text(bytes),
        MIME_DOCX => extract_docx(bytes),
        MIME_PPTX => extract_pptx(bytes),
        other => Err(ExtractError::UnsupportedMediaType(other.to_string())),
    }
}

fn decode_plain_text(bytes: &[u8]) -> Result<String, ExtractError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| ExtractError::TextDecode(e.to_string()))
}

/// The page count is checked before any text extraction runs, so an
/// oversized document costs one parse, not a full extraction.
fn extract_pdf(bytes: &[u8], max_pages: usize) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let page_count = doc.get_pages().len();
    if page_count > max_pages {
        return Err(ExtractError::DocumentTooLong {
            page_count,
            max_allowed: max_pages,
        });
    }
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn read_zip_entry(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, String> {
    let entry = archive.by_name(name).map_err(|e| e.to_string())?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| e.to_string())?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        ));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let xml = read_zip_entry(&mut archive, "word/document.xml").map_err(ExtractError::Docx)?;
    collect_paragraph_text(&xml).map_err(ExtractError::Docx)
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Pptx(e.to_string()))?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    let mut slides = Vec::new();
    for name in slide_names {
        let xml = read_zip_entry(&mut archive, &name).map_err(ExtractError::Pptx)?;
        let text = collect_paragraph_text(&xml).map_err(ExtractError::Pptx)?;
        if !text.is_empty() {
            slides.push(text);
        }
    }
    Ok(slides.join("\n"))
}

/// Collects paragraph text from OOXML. Both WordprocessingML (`w:p`/`w:t`)
/// and DrawingML (`a:p`/`a:t`) use the local names `p` and `t`, so one
/// pass serves DOCX bodies and PPTX slides alike. Non-empty paragraphs are
/// joined with newlines; runs within a paragraph are concatenated.
fn collect_paragraph_text(xml: &[u8]) -> Result<String, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text => {
                current.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        paragraphs.push(trimmed.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    let trailing = current.trim();
    if !trailing.is_empty() {
        paragraphs.push(trailing.to_string());
    }
    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal valid PDF with `pages` pages, each carrying a one-line text
    /// content stream. Builds the body first, then an xref table with
    /// correct byte offsets so lopdf and pdf-extract can both parse it.
    fn minimal_pdf(pages: usize) -> Vec<u8> {
        let font_obj = 3 + 2 * pages;
        let mut out = Vec::new();
        let mut offsets = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");

        offsets.push(out.len());
        out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");

        let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
                kids.join(" "),
                pages
            )
            .as_bytes(),
        );

        for i in 0..pages {
            let page_obj = 3 + 2 * i;
            let content_obj = page_obj + 1;
            offsets.push(out.len());
            out.extend_from_slice(
                format!(
                    "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >> endobj\n",
                    page_obj, content_obj, font_obj
                )
                .as_bytes(),
            );
            let stream = format!("BT /F1 12 Tf 100 700 Td (page {} text) Tj ET\n", i + 1);
            offsets.push(out.len());
            out.extend_from_slice(
                format!(
                    "{} 0 obj << /Length {} >> stream\n{}endstream endobj\n",
                    content_obj,
                    stream.len(),
                    stream
                )
                .as_bytes(),
            );
        }

        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
                font_obj
            )
            .as_bytes(),
        );

        let xref_start = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in &offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer << /Size {} /Root 1 0 R >>\nstartxref\n",
                offsets.len() + 1
            )
            .as_bytes(),
        );
        out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    /// Minimal ZIP archive with a single XML entry.
    fn zip_with_entry(name: &str, xml: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip_with_entry("word/document.xml", &xml)
    }

    fn pptx_slide_xml(texts: &[&str]) -> String {
        let shapes: String = texts
            .iter()
            .map(|t| format!("<p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>", t))
            .collect();
        format!(
            "<?xml version=\"1.0\"?><p:sld xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\"><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>",
            shapes
        )
    }

    #[test]
    fn unsupported_media_type_returns_guard_error() {
        let err = extract_text(b"foo", "application/octet-stream", 100).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedMediaType(_)));
        assert_eq!(err.kind(), "unsupported_file_type");
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", MIME_PDF, 100).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
        assert_eq!(err.kind(), "pdf_extraction_failed");
    }

    #[test]
    fn pdf_over_page_limit_is_rejected_with_counts() {
        let pdf = minimal_pdf(3);
        let err = extract_text(&pdf, MIME_PDF, 2).unwrap_err();
        match err {
            ExtractError::DocumentTooLong {
                page_count,
                max_allowed,
            } => {
                assert_eq!(page_count, 3);
                assert_eq!(max_allowed, 2);
            }
            other => panic!("expected DocumentTooLong, got {:?}", other),
        }
    }

    #[test]
    fn document_too_long_message_carries_counts() {
        let err = ExtractError::DocumentTooLong {
            page_count: 120,
            max_allowed: 100,
        };
        assert_eq!(err.kind(), "document_too_long");
        assert!(err.to_string().contains("120"));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn pdf_under_page_limit_is_extracted() {
        let pdf = minimal_pdf(2);
        assert!(extract_text(&pdf, MIME_PDF, 50).is_ok());
    }

    #[test]
    fn plain_text_decodes_utf8() {
        let text = extract_text("héllo wörld".as_bytes(), MIME_TEXT, 100).unwrap();
        assert_eq!(text, "héllo wörld");
    }

    #[test]
    fn plain_text_rejects_invalid_utf8() {
        let err = extract_text(&[0xff, 0xfe, 0x00], MIME_TEXT, 100).unwrap_err();
        assert!(matches!(err, ExtractError::TextDecode(_)));
        assert_eq!(err.kind(), "text_decode_failed");
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_text(b"not a zip", MIME_DOCX, 100).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
        assert_eq!(err.kind(), "docx_extraction_failed");
    }

    #[test]
    fn invalid_zip_returns_error_for_pptx() {
        let err = extract_text(b"not a zip", MIME_PPTX, 100).unwrap_err();
        assert!(matches!(err, ExtractError::Pptx(_)));
        assert_eq!(err.kind(), "pptx_extraction_failed");
    }

    #[test]
    fn docx_paragraphs_joined_with_newlines() {
        let docx = docx_with_paragraphs(&["First paragraph.", "Second paragraph."]);
        let text = extract_text(&docx, MIME_DOCX, 100).unwrap();
        assert_eq!(text, "First paragraph.\nSecond paragraph.");
    }

    #[test]
    fn docx_empty_paragraphs_skipped() {
        let docx = docx_with_paragraphs(&["Start.", "", "End."]);
        let text = extract_text(&docx, MIME_DOCX, 100).unwrap();
        assert_eq!(text, "Start.\nEnd.");
    }

    #[test]
    fn docx_missing_document_xml_is_error() {
        let zipped = zip_with_entry("other.xml", "<x/>");
        let err = extract_text(&zipped, MIME_DOCX, 100).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[test]
    fn pptx_slides_in_numeric_order() {
        // slide10 sorts after slide2 numerically, not lexically
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("ppt/slides/slide10.xml", opts).unwrap();
            zip.write_all(pptx_slide_xml(&["tenth slide"]).as_bytes())
                .unwrap();
            zip.start_file("ppt/slides/slide2.xml", opts).unwrap();
            zip.write_all(pptx_slide_xml(&["second slide"]).as_bytes())
                .unwrap();
            zip.finish().unwrap();
        }
        let text = extract_text(&buf, MIME_PPTX, 100).unwrap();
        assert_eq!(text, "second slide\ntenth slide");
    }

    #[test]
    fn pptx_multiple_shapes_per_slide() {
        let slide = pptx_slide_xml(&["Title shape", "Body shape"]);
        let pptx = zip_with_entry("ppt/slides/slide1.xml", &slide);
        let text = extract_text(&pptx, MIME_PPTX, 100).unwrap();
        assert_eq!(text, "Title shape\nBody shape");
    }

    #[test]
    fn pptx_without_slides_yields_empty_text() {
        let pptx = zip_with_entry("ppt/presentation.xml", "<p:presentation/>");
        let text = extract_text(&pptx, MIME_PPTX, 100).unwrap();
        assert!(text.is_empty());
    }
}

use std::collections::BTreeMap;

use log::debug;
use lopdf::content::Content;

use crate::types::DocumentMetadata;
use crate::OutlineError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// Height used when a page carries no usable MediaBox (US Letter).
pub const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Font information extracted from a page's resource dictionary.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// The resource key used by `Tf` (e.g. `b"F1"`).
    pub key: Vec<u8>,
    /// Base font name from the font dictionary, if present.
    pub base_font: Option<String>,
}

/// A lopdf-independent view of a content-stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

impl PdfValue {
    /// Numeric value of an `Integer` or `Real` operand.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PdfValue::Integer(i) => Some(*i as f32),
            PdfValue::Real(f) => Some(*f),
            _ => None,
        }
    }
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Convert a `lopdf::Object` into a [`PdfValue`]. Stream bodies are dropped;
/// only their dictionaries survive.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(convert_dict(dict)),
        lopdf::Object::Stream(stream) => PdfValue::Dict(convert_dict(&stream.dict)),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

fn convert_dict(dict: &lopdf::Dictionary) -> Vec<(Vec<u8>, PdfValue)> {
    dict.iter()
        .map(|(k, v)| (k.clone(), convert_object(v)))
        .collect()
}

/// Best-effort decoding of a raw PDF string.
///
/// UTF-16BE with a BOM first, then UTF-8, then Latin-1 byte-per-char.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16be(payload);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Decode big-endian UTF-16 code units; a trailing odd byte is ignored.
fn decode_utf16be(bytes: &[u8]) -> String {
    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&code_units)
}

fn name_entry(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// The document operations the line extractor needs.
///
/// Kept as a trait so the content-stream state machine can be driven by a
/// mock in tests.
pub trait PdfBackend {
    /// 1-based page number to [`PageId`], in page order.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Fonts referenced by the page's resources.
    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, OutlineError>;

    /// Decoded content-stream operations of the page.
    fn page_operations(&self, page: PageId) -> Result<Vec<ContentOp>, OutlineError>;

    /// Page height in default user space units.
    fn page_height(&self, page: PageId) -> Option<f32>;

    /// Decode the bytes of a text-showing operand set in `font_key`.
    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// [`PdfBackend`] backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice. Encrypted documents are
    /// rejected.
    pub fn load_bytes(data: &[u8]) -> Result<Self, OutlineError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| OutlineError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(OutlineError::Encrypted);
        }

        debug!("loaded PDF with {} pages", doc.get_pages().len());
        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Read the trailer's Info dictionary. Blank entries are treated as
    /// absent.
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            title: self.info_string(b"Title"),
            author: self.info_string(b"Author"),
            page_count: self.page_count(),
            creator: self.info_string(b"Creator"),
        }
    }

    fn info_dict(&self) -> Option<&lopdf::Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            lopdf::Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            lopdf::Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    fn info_string(&self, key: &[u8]) -> Option<String> {
        let value = match self.info_dict()?.get(key).ok()? {
            lopdf::Object::String(bytes, _) => decode_pdf_string(bytes),
            lopdf::Object::Reference(id) => match self.doc.get_object(*id).ok()? {
                lopdf::Object::String(bytes, _) => decode_pdf_string(bytes),
                _ => return None,
            },
            _ => return None,
        };
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Walk up the page tree to find the MediaBox and return `ury - lly`.
    fn media_box_height(&self, dict: &lopdf::Dictionary) -> Option<f32> {
        if let Ok(obj) = dict.get(b"MediaBox") {
            let nums = self.resolve_numbers(obj)?;
            if nums.len() >= 4 {
                return Some((nums[3] - nums[1]).abs());
            }
        }

        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent = self.doc.get_dictionary(parent_id).ok()?;
        self.media_box_height(parent)
    }

    fn resolve_numbers(&self, obj: &lopdf::Object) -> Option<Vec<f32>> {
        let arr = match obj {
            lopdf::Object::Array(arr) => arr,
            lopdf::Object::Reference(id) => self.doc.get_object(*id).ok()?.as_array().ok()?,
            _ => return None,
        };
        arr.iter()
            .map(|item| {
                let resolved = match item {
                    lopdf::Object::Reference(id) => self.doc.get_object(*id).ok()?,
                    other => other,
                };
                convert_object(resolved).as_number()
            })
            .collect()
    }

    fn font_encoding_name(&self, page: PageId, font_key: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        name_entry(fonts.get(font_key)?, b"Encoding")
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, OutlineError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| OutlineError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts
            .iter()
            .map(|(key, dict)| FontInfo {
                key: key.clone(),
                base_font: name_entry(dict, b"BaseFont"),
            })
            .collect())
    }

    fn page_operations(&self, page: PageId) -> Result<Vec<ContentOp>, OutlineError> {
        let data = self
            .doc
            .get_page_content(page)
            .map_err(|e| OutlineError::Parse(format!("cannot get page content: {}", e)))?;
        let content = Content::decode(&data)
            .map_err(|e| OutlineError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operands: op.operands.iter().map(convert_object).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn page_height(&self, page: PageId) -> Option<f32> {
        let dict = self.doc.get_dictionary(page).ok()?;
        self.media_box_height(dict)
    }

    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String {
        // Identity-H/V fonts use 2-byte codes; try them as UTF-16BE first.
        let identity = self
            .font_encoding_name(page, font_key)
            .is_some_and(|enc| enc.contains("Identity"));
        if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
            let decoded = decode_utf16be(bytes);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }

        decode_pdf_string(bytes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- decode_pdf_string --------------------------------------------------

    #[test]
    fn decode_utf8() {
        assert_eq!(decode_pdf_string("Résumé".as_bytes()), "Résumé");
    }

    #[test]
    fn decode_latin1_fallback() {
        // 0xE9 is U+00E9 in Latin-1 but not valid standalone UTF-8.
        assert_eq!(decode_pdf_string(&[0x63, 0x61, 0x66, 0xE9]), "caf\u{00E9}");
    }

    #[test]
    fn decode_utf16be_with_bom() {
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42]), "AB");
    }

    #[test]
    fn decode_utf16be_odd_trailing_byte() {
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x41, 0x00]), "A");
    }

    #[test]
    fn decode_empty() {
        assert_eq!(decode_pdf_string(&[]), "");
    }

    // -- PdfValue -----------------------------------------------------------

    #[test]
    fn as_number_accepts_integer_and_real() {
        assert_eq!(PdfValue::Integer(42).as_number(), Some(42.0));
        assert_eq!(PdfValue::Real(2.5).as_number(), Some(2.5));
        assert_eq!(PdfValue::Name(b"F1".to_vec()).as_number(), None);
        assert_eq!(PdfValue::Null.as_number(), None);
    }

    #[test]
    fn convert_nested_array_in_dict() {
        let mut dict = lopdf::Dictionary::new();
        dict.set(
            "MediaBox",
            lopdf::Object::Array(vec![
                lopdf::Object::Integer(0),
                lopdf::Object::Real(792.0),
            ]),
        );

        match convert_object(&lopdf::Object::Dictionary(dict)) {
            PdfValue::Dict(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, b"MediaBox");
                assert_eq!(
                    entries[0].1,
                    PdfValue::Array(vec![PdfValue::Integer(0), PdfValue::Real(792.0)])
                );
            }
            other => panic!("expected Dict, got {:?}", other),
        }
    }

    #[test]
    fn convert_string_keeps_raw_bytes() {
        let obj = lopdf::Object::String(b"Intro".to_vec(), lopdf::StringFormat::Literal);
        assert_eq!(convert_object(&obj), PdfValue::Str(b"Intro".to_vec()));
    }

    // -- LopdfBackend -------------------------------------------------------

    #[test]
    fn load_rejects_garbage() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"not a pdf"),
            Err(OutlineError::Parse(_))
        ));
    }
}

//! Text extraction and line assembly.
//!
//! Turns a page's content-stream operators into positioned [`LineRecord`]s,
//! the only shape the outline core consumes.
//!
//! # Pipeline
//!
//! ```text
//! content ops  ->  TextSpan[]  ->  TextLine[]  ->  blocks  ->  LineRecord[]
//!   (per page)      extract         group_spans      group_lines   to_records
//! ```

use log::{debug, warn};

use super::backend::{ContentOp, FontInfo, PageId, PdfBackend, PdfValue, DEFAULT_PAGE_HEIGHT};
use super::cleanup::clean_line_text;
use crate::types::LineRecord;
use crate::OutlineError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single run of text at a specific position on the page.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    /// Left edge in PDF user space (origin bottom-left).
    pub x: f32,
    /// Baseline in PDF user space (origin bottom-left).
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
}

/// Spans sharing (approximately) one baseline, ordered left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub x: f32,
    pub y: f32,
    /// Size of the first (leftmost) span.
    pub font_size: f32,
}

impl TextLine {
    /// Concatenate all span texts with a single space separator.
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Two spans whose baselines differ by at most this are on the same line.
const Y_TOLERANCE: f32 = 1.0;

/// Approximate glyph width as a fraction of the font size; glyph metrics
/// are not read.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Minimum gap (in points) between adjacent spans before we insert a space.
const MIN_WORD_GAP: f32 = 1.5;

/// A vertical gap larger than this multiple of the previous line's size
/// starts a new block.
const BLOCK_GAP_FACTOR: f32 = 1.4;

/// Consecutive lines whose sizes differ by at least this many points go to
/// different blocks.
const BLOCK_SIZE_TOLERANCE: f32 = 0.5;

const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// CJK / spaceless-script helper
// ---------------------------------------------------------------------------

/// Returns `true` if `c` belongs to a script written without inter-word
/// spaces.
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF     // CJK Unified Ideographs
        | 0x3400..=0x4DBF   // Extension A
        | 0x20000..=0x2A6DF // Extension B
        | 0xF900..=0xFAFF   // Compatibility Ideographs
        | 0x3040..=0x30FF   // Hiragana, Katakana
        | 0x31F0..=0x31FF   // Katakana Phonetic Extensions
        | 0xAC00..=0xD7AF   // Hangul Syllables
        | 0x1100..=0x11FF   // Hangul Jamo
        | 0x3130..=0x318F   // Hangul Compatibility Jamo
        | 0x3000..=0x303F   // CJK Symbols and Punctuation
        | 0xFF00..=0xFFEF   // Fullwidth Forms
        | 0x0E00..=0x0EFF   // Thai, Lao
        | 0x0F00..=0x0FFF   // Tibetan
        | 0x1000..=0x109F   // Myanmar
        | 0x1780..=0x17FF   // Khmer
    )
}

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

/// Text state tracked while walking a page's content stream.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource key (`/F1`), not the base font name.
    font_key: Vec<u8>,
    font_name: String,
    /// Font size in text-space units, before matrix scaling.
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    /// Horizontal scaling as a factor (Tz / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5] + self.text_rise
    }

    /// Rendered size: `font_size * sqrt(b^2 + d^2)` of the text matrix.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn char_width(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn estimate_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width()
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Advance past `text` as if it had just been painted.
    fn advance_after_show(&mut self, text: &str) {
        let dx: f32 = text
            .chars()
            .map(|ch| {
                let space = if ch == ' ' { self.word_spacing } else { 0.0 };
                self.char_width() + self.char_spacing + space
            })
            .sum();
        self.advance_x(dx);
    }

    /// Td: translate the line matrix and reset the text matrix to it.
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn set_matrix(&mut self, m: [f32; 6]) {
        self.text_matrix = m;
        self.line_matrix = m;
    }
}

/// Walks one page's operators and collects spans.
struct SpanCollector<'a> {
    backend: &'a dyn PdfBackend,
    page: PageId,
    fonts: Vec<FontInfo>,
    state: TextState,
    spans: Vec<TextSpan>,
}

impl<'a> SpanCollector<'a> {
    fn new(backend: &'a dyn PdfBackend, page: PageId, fonts: Vec<FontInfo>) -> Self {
        Self {
            backend,
            page,
            fonts,
            state: TextState::default(),
            spans: Vec::new(),
        }
    }

    fn apply(&mut self, op: &ContentOp) {
        let operands = op.operands.as_slice();
        let num = |i: usize| operands.get(i).and_then(PdfValue::as_number);

        match op.operator.as_str() {
            "BT" => self.state.set_matrix(IDENTITY_MATRIX),
            // Font state survives ET; some producers rely on it.
            "ET" => {}
            "Tf" => self.set_font(operands),
            "Tm" => {
                let vals: Vec<f32> = operands.iter().filter_map(PdfValue::as_number).collect();
                if let [a, b, c, d, e, f] = vals[..] {
                    self.state.set_matrix([a, b, c, d, e, f]);
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.state.leading = -ty;
                    self.state.translate_line(tx, ty);
                }
            }
            "T*" => self.state.next_line(),
            "TL" => {
                if let Some(v) = num(0) {
                    self.state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = num(0) {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = num(0) {
                    self.state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = num(0) {
                    self.state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = num(0) {
                    self.state.text_rise = v;
                }
            }
            "Tj" => {
                if let Some(s) = operands.first() {
                    self.show_string(s);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = operands.first() {
                    self.show_array(items);
                }
            }
            "'" => {
                self.state.next_line();
                if let Some(s) = operands.first() {
                    self.show_string(s);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(s)) = (num(0), num(1), operands.get(2)) {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                    self.state.next_line();
                    self.show_string(s);
                }
            }
            _ => {}
        }
    }

    fn set_font(&mut self, operands: &[PdfValue]) {
        let (Some(key), Some(size)) = (operands.first(), operands.get(1)) else {
            return;
        };
        let key = match key {
            PdfValue::Name(n) | PdfValue::Str(n) => n.clone(),
            _ => return,
        };
        let name = self
            .fonts
            .iter()
            .find(|f| f.key == key)
            .and_then(|f| f.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());

        self.state.font_key = key;
        self.state.font_name = name;
        self.state.font_size = size.as_number().unwrap_or(0.0);
    }

    fn decode(&self, value: &PdfValue) -> String {
        match value {
            PdfValue::Str(bytes) => self
                .backend
                .decode_text(self.page, &self.state.font_key, bytes),
            _ => String::new(),
        }
    }

    /// Tj, ' and ": one span per string operand.
    fn show_string(&mut self, value: &PdfValue) {
        let text = self.decode(value);
        if text.is_empty() {
            return;
        }
        let (x, y) = (self.state.x(), self.state.y());
        self.push_span(text.clone(), x, y);
        self.state.advance_after_show(&text);
    }

    /// TJ: strings interleaved with kerning adjustments in thousandths of a
    /// text-space unit. Large negative adjustments read as word gaps.
    fn show_array(&mut self, items: &[PdfValue]) {
        let mut buf = String::new();
        let mut span_x = self.state.x();
        let span_y = self.state.y();

        for item in items {
            if let PdfValue::Str(_) = item {
                let fragment = self.decode(item);
                if buf.is_empty() {
                    span_x = self.state.x();
                }
                buf.push_str(&fragment);
                self.state.advance_after_show(&fragment);
            } else if let Some(adj) = item.as_number() {
                let dx = -adj / 1000.0 * self.state.font_size * self.state.horiz_scale;
                if dx > self.state.char_width() * 0.3 && !buf.is_empty() {
                    buf.push(' ');
                }
                self.state.advance_x(dx);
            }
        }

        let text = buf.trim_end();
        if !text.is_empty() {
            self.push_span(text.to_string(), span_x, span_y);
        }
    }

    fn push_span(&mut self, text: String, x: f32, y: f32) {
        let width = self.state.estimate_width(&text);
        self.spans.push(TextSpan {
            text,
            x,
            y,
            width,
            font_size: self.state.effective_font_size(),
            font_name: self.state.font_name.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Public API: span extraction
// ---------------------------------------------------------------------------

/// Walk a page's content stream and return its text spans in paint order.
///
/// Handles the text operators `BT ET Tf Tm Td TD T* TL Tc Tw Tz Ts Tj TJ ' "`;
/// everything else is ignored.
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextSpan>, OutlineError> {
    let ops = backend.page_operations(page_id)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_else(|e| {
        warn!("page {:?}: {}; falling back to raw font keys", page_id, e);
        Vec::new()
    });

    let mut collector = SpanCollector::new(backend, page_id, fonts);
    for op in &ops {
        collector.apply(op);
    }

    Ok(collector.spans)
}

// ---------------------------------------------------------------------------
// Public API: span -> line grouping
// ---------------------------------------------------------------------------

/// Group spans into lines, top of page first.
///
/// Spans whose baselines are within [`Y_TOLERANCE`] of the line's first span
/// share a line. Within a line, spans are ordered left to right and
/// same-font neighbours are merged, with a space where the gap looks like a
/// word break.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();

    for span in spans {
        let same_line = current
            .first()
            .is_some_and(|first| (span.y - first.y).abs() <= Y_TOLERANCE);
        if !same_line && !current.is_empty() {
            lines.push(assemble_line(std::mem::take(&mut current)));
        }
        current.push(span);
    }

    if !current.is_empty() {
        lines.push(assemble_line(current));
    }

    lines
}

fn assemble_line(mut spans: Vec<TextSpan>) -> TextLine {
    spans.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut merged: Vec<TextSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(prev) = merged.last_mut() {
            let gap = span.x - (prev.x + prev.width);
            let same_font = prev.font_name == span.font_name
                && (prev.font_size - span.font_size).abs() < BLOCK_SIZE_TOLERANCE;

            if same_font && gap > -prev.font_size && gap < prev.font_size * 2.0 {
                if gap >= MIN_WORD_GAP && !boundary_is_spaceless(prev, &span) {
                    prev.text.push(' ');
                }
                prev.text.push_str(&span.text);
                prev.width = (span.x + span.width) - prev.x;
                continue;
            }
        }
        merged.push(span);
    }

    let (x, y, font_size) = merged
        .first()
        .map(|s| (s.x, s.y, s.font_size))
        .unwrap_or((0.0, 0.0, 0.0));

    TextLine {
        spans: merged,
        x,
        y,
        font_size,
    }
}

fn boundary_is_spaceless(prev: &TextSpan, next: &TextSpan) -> bool {
    match (prev.text.chars().next_back(), next.text.chars().next()) {
        (Some(l), Some(f)) => is_spaceless_script_char(l) && is_spaceless_script_char(f),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Public API: line -> block grouping
// ---------------------------------------------------------------------------

/// Split top-to-bottom lines into layout blocks.
///
/// A new block starts after a vertical gap wider than [`BLOCK_GAP_FACTOR`]
/// times the previous line's size, or when the font size changes by at
/// least [`BLOCK_SIZE_TOLERANCE`].
pub fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<Vec<TextLine>> {
    let mut blocks: Vec<Vec<TextLine>> = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        let breaks = current.last().is_some_and(|prev| {
            let gap = (prev.y - line.y).abs();
            gap > prev.font_size * BLOCK_GAP_FACTOR
                || (prev.font_size - line.font_size).abs() >= BLOCK_SIZE_TOLERANCE
        });
        if breaks {
            blocks.push(std::mem::take(&mut current));
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Convert a page's blocks into [`LineRecord`]s.
///
/// Offsets are flipped to a top-left origin: `vertical_offset` is the
/// distance from the top of the page to the top of the line. Lines whose
/// text is empty after cleanup are skipped.
pub fn to_line_records(
    page_number: usize,
    page_height: f32,
    blocks: Vec<Vec<TextLine>>,
) -> Vec<LineRecord> {
    let mut records = Vec::new();

    for (block_index, block) in blocks.into_iter().enumerate() {
        for line in block {
            let text = clean_line_text(&line.text());
            if text.is_empty() {
                continue;
            }
            records.push(LineRecord {
                block_index,
                vertical_offset: page_height - (line.y + line.font_size),
                horizontal_offset: line.x,
                font_size: line.font_size,
                text,
                page_number,
            });
        }
    }

    records
}

// ---------------------------------------------------------------------------
// Public API: full pipeline
// ---------------------------------------------------------------------------

/// Extract the line records of every page, in page order.
pub fn extract_line_records(backend: &dyn PdfBackend) -> Result<Vec<LineRecord>, OutlineError> {
    let mut records = Vec::new();

    for (&page_number, &page_id) in &backend.pages() {
        let spans = extract_page_spans(backend, page_id)?;
        let height = backend.page_height(page_id).unwrap_or(DEFAULT_PAGE_HEIGHT);
        let blocks = group_lines_into_blocks(group_spans_into_lines(spans));
        let page_records = to_line_records(page_number as usize, height, blocks);
        debug!("page {}: {} lines", page_number, page_records.len());
        records.extend(page_records);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::fmt;

use serde::{Deserialize, Serialize};

/// One visible line of text, as produced by a [`LineSource`](crate::LineSource).
///
/// Records are never mutated after they are produced; the assembler sorts
/// references to them instead.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    /// Position of the containing layout block on its page. Reading-order
    /// tie-break only.
    pub block_index: usize,
    /// Distance from the top of the page to the top of the line.
    pub vertical_offset: f32,
    /// Distance from the left edge of the page to the start of the line.
    pub horizontal_offset: f32,
    /// Size of the line's first text run.
    pub font_size: f32,
    /// Trimmed line text. Never empty.
    pub text: String,
    /// 1-based page number.
    pub page_number: usize,
}

/// Everything a [`LineSource`](crate::LineSource) hands to the core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedLines {
    pub lines: Vec<LineRecord>,
    pub metadata_title: Option<String>,
}

/// A cluster of font sizes that represents one heading tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeClass {
    /// Largest observed size among the members.
    pub representative_size: f32,
    pub member_count: usize,
}

/// Ordinal heading scale. Declaration order is depth order: `Title` is the
/// shallowest, `H4` the deepest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    Title,
    H1,
    H2,
    H3,
    H4,
}

impl HeadingLevel {
    /// Map a class rank (0 = largest size) to a level. Ranks past the
    /// fourth heading tier all land on `H4`.
    pub fn from_rank(rank: usize) -> Self {
        match rank {
            0 => HeadingLevel::Title,
            1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            3 => HeadingLevel::H3,
            _ => HeadingLevel::H4,
        }
    }

    /// 0 for `Title`, 1..=4 for `H1`..`H4`.
    pub fn depth(&self) -> u8 {
        *self as u8
    }

    pub fn is_title(&self) -> bool {
        matches!(self, HeadingLevel::Title)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeadingLevel::Title => "Title",
            HeadingLevel::H1 => "H1",
            HeadingLevel::H2 => "H2",
            HeadingLevel::H3 => "H3",
            HeadingLevel::H4 => "H4",
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single heading in the flat outline. `level` is never `Title`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    pub level: HeadingLevel,
    pub text: String,
    pub page: usize,
}

/// Result of one extraction: a resolved title and the ordered headings.
///
/// Field order is the JSON key order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Outline {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: usize,
    pub creator: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_from_rank_clamps() {
        assert_eq!(HeadingLevel::from_rank(0), HeadingLevel::Title);
        assert_eq!(HeadingLevel::from_rank(1), HeadingLevel::H1);
        assert_eq!(HeadingLevel::from_rank(3), HeadingLevel::H3);
        assert_eq!(HeadingLevel::from_rank(4), HeadingLevel::H4);
        assert_eq!(HeadingLevel::from_rank(17), HeadingLevel::H4);
    }

    #[test]
    fn test_heading_level_depth_order() {
        assert!(HeadingLevel::Title < HeadingLevel::H1);
        assert!(HeadingLevel::H3 < HeadingLevel::H4);
        assert_eq!(HeadingLevel::Title.depth(), 0);
        assert_eq!(HeadingLevel::H4.depth(), 4);
    }

    #[test]
    fn test_heading_level_display() {
        assert_eq!(format!("{}", HeadingLevel::H2), "H2");
        assert_eq!(HeadingLevel::Title.to_string(), "Title");
    }

    #[test]
    fn test_outline_json_key_order() {
        let outline = Outline {
            title: "Report".to_string(),
            outline: vec![OutlineEntry {
                level: HeadingLevel::H1,
                text: "Introducción".to_string(),
                page: 2,
            }],
        };
        let json = serde_json::to_string(&outline).unwrap();
        assert_eq!(
            json,
            r#"{"title":"Report","outline":[{"level":"H1","text":"Introducción","page":2}]}"#
        );
    }

    #[test]
    fn test_outline_pretty_json_reserializes_identically() {
        let outline = Outline {
            title: "Résumé".to_string(),
            outline: vec![
                OutlineEntry {
                    level: HeadingLevel::H1,
                    text: "One".to_string(),
                    page: 1,
                },
                OutlineEntry {
                    level: HeadingLevel::H4,
                    text: "\"Quoted\" \u{4E2D}".to_string(),
                    page: 9,
                },
            ],
        };
        let first = serde_json::to_string_pretty(&outline).unwrap();
        let parsed: Outline = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string_pretty(&parsed).unwrap();
        assert_eq!(first, second);
        assert!(first.contains('\u{4E2D}'));
    }
}

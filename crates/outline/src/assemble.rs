//! Outline assembly: reading order, nearest-class classification and title
//! resolution.

use std::cmp::Ordering;

use log::{debug, warn};

use crate::hierarchy::LevelMap;
use crate::types::{LineRecord, Outline, OutlineEntry};

/// Title used when neither the document nor its metadata provide one.
pub const UNTITLED: &str = "Untitled";

/// Reading-order comparison: block, then top-to-bottom, then left-to-right.
///
/// The page number is deliberately not part of the key.
pub fn reading_order(a: &LineRecord, b: &LineRecord) -> Ordering {
    a.block_index
        .cmp(&b.block_index)
        .then(a.vertical_offset.total_cmp(&b.vertical_offset))
        .then(a.horizontal_offset.total_cmp(&b.horizontal_offset))
}

/// Classify every line against `levels` and build the [`Outline`].
///
/// The first line in reading order that lands in the Title class becomes the
/// title; any later Title-class line is discarded. All other lines become
/// outline entries. When no line reaches the Title class the title falls
/// back to `metadata_title`, then to the first outline entry, then to
/// [`UNTITLED`].
///
/// An empty `levels` map means no heading tier was detected: the outline is
/// empty and the title comes from the fallback chain.
pub fn assemble(lines: &[LineRecord], levels: &LevelMap, metadata_title: Option<&str>) -> Outline {
    let mut ordered: Vec<&LineRecord> = lines.iter().collect();
    ordered.sort_by(|a, b| reading_order(a, b));

    let mut title: Option<String> = None;
    let mut outline: Vec<OutlineEntry> = Vec::new();
    let mut dropped_titles = 0usize;

    if levels.is_empty() && !lines.is_empty() {
        warn!(
            "no font-size class found across {} lines; emitting an empty outline",
            lines.len()
        );
    }

    for line in ordered {
        let Some(level) = levels.nearest(line.font_size) else {
            continue;
        };

        if level.is_title() {
            if title.is_none() {
                title = Some(line.text.trim().to_string());
            } else {
                dropped_titles += 1;
            }
            continue;
        }

        outline.push(OutlineEntry {
            level,
            text: line.text.trim().to_string(),
            page: line.page_number,
        });
    }

    if dropped_titles > 0 {
        debug!("dropped {} additional title-sized lines", dropped_titles);
    }

    let title = title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title(metadata_title, &outline));

    Outline { title, outline }
}

fn fallback_title(metadata_title: Option<&str>, outline: &[OutlineEntry]) -> String {
    metadata_title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            outline
                .first()
                .map(|e| e.text.as_str())
                .filter(|t| !t.is_empty())
        })
        .unwrap_or(UNTITLED)
        .to_string()
}

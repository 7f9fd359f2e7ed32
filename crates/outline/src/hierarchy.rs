use serde::{Deserialize, Serialize};

use crate::types::{HeadingLevel, SizeClass};

/// One size class together with the level it was ranked into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    pub size: f32,
    pub count: usize,
    pub level: HeadingLevel,
}

/// Immutable mapping from representative size to [`HeadingLevel`].
///
/// Built once from the classifier's output and passed by reference to the
/// assembler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelMap {
    entries: Vec<RankedClass>,
}

impl LevelMap {
    /// Rank `classes` by descending representative size; ties keep their
    /// input order.
    pub fn from_classes(classes: &[SizeClass]) -> Self {
        let mut ordered: Vec<&SizeClass> = classes.iter().collect();
        ordered.sort_by(|a, b| b.representative_size.total_cmp(&a.representative_size));

        let entries = ordered
            .into_iter()
            .enumerate()
            .map(|(rank, class)| RankedClass {
                size: class.representative_size,
                count: class.member_count,
                level: HeadingLevel::from_rank(rank),
            })
            .collect();

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[RankedClass] {
        &self.entries
    }

    /// Level of the class whose representative size is closest to
    /// `font_size`. On equal distance the larger class wins. `None` when the
    /// map is empty.
    pub fn nearest(&self, font_size: f32) -> Option<HeadingLevel> {
        let mut best: Option<(&RankedClass, f32)> = None;
        for entry in &self.entries {
            let distance = (entry.size - font_size).abs();
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((entry, distance)),
            }
        }
        best.map(|(entry, _)| entry.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(size: f32, count: usize) -> SizeClass {
        SizeClass {
            representative_size: size,
            member_count: count,
        }
    }

    #[test]
    fn test_levels_follow_descending_size() {
        let map = LevelMap::from_classes(&[class(10.0, 40), class(24.0, 3), class(16.0, 5)]);
        let levels: Vec<(f32, HeadingLevel)> =
            map.entries().iter().map(|e| (e.size, e.level)).collect();
        assert_eq!(
            levels,
            vec![
                (24.0, HeadingLevel::Title),
                (16.0, HeadingLevel::H1),
                (10.0, HeadingLevel::H2),
            ]
        );
    }

    #[test]
    fn test_levels_clamp_to_h4() {
        let classes: Vec<SizeClass> = (0..8).map(|i| class(30.0 - i as f32 * 2.0, 3)).collect();
        let map = LevelMap::from_classes(&classes);
        let levels: Vec<HeadingLevel> = map.entries().iter().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![
                HeadingLevel::Title,
                HeadingLevel::H1,
                HeadingLevel::H2,
                HeadingLevel::H3,
                HeadingLevel::H4,
                HeadingLevel::H4,
                HeadingLevel::H4,
                HeadingLevel::H4,
            ]
        );
    }

    #[test]
    fn test_larger_class_never_gets_deeper_level() {
        let classes = [
            class(11.0, 3),
            class(28.0, 3),
            class(14.0, 3),
            class(9.0, 3),
            class(20.0, 3),
            class(17.0, 3),
        ];
        let map = LevelMap::from_classes(&classes);
        for a in map.entries() {
            for b in map.entries() {
                if a.size > b.size {
                    assert!(a.level <= b.level);
                    if b.level != HeadingLevel::H4 {
                        assert!(a.level < b.level);
                    }
                }
            }
        }
    }

    #[test]
    fn test_nearest_picks_closest_class() {
        let map = LevelMap::from_classes(&[class(24.0, 3), class(16.0, 3), class(10.0, 3)]);
        assert_eq!(map.nearest(23.0), Some(HeadingLevel::Title));
        assert_eq!(map.nearest(15.2), Some(HeadingLevel::H1));
        assert_eq!(map.nearest(6.0), Some(HeadingLevel::H2));
        assert_eq!(map.nearest(100.0), Some(HeadingLevel::Title));
    }

    #[test]
    fn test_nearest_tie_prefers_larger_class() {
        let map = LevelMap::from_classes(&[class(16.0, 3), class(12.0, 3)]);
        assert_eq!(map.nearest(14.0), Some(HeadingLevel::Title));
    }

    #[test]
    fn test_nearest_on_empty_map() {
        let map = LevelMap::default();
        assert!(map.is_empty());
        assert_eq!(map.nearest(12.0), None);
    }
}

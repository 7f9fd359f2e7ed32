//! Font-size clustering.
//!
//! Observed font sizes are grouped with a one-dimensional DBSCAN: a size is a
//! *core* point when at least `min_samples` sizes (itself included) lie
//! within `eps` of it, clusters are the chains of core points that sit within
//! `eps` of each other, and non-core sizes within `eps` of a core point join
//! that core's cluster. Everything else is noise.
//!
//! In one dimension this needs no spatial index: after sorting, neighbourhood
//! counts come from a two-pointer sweep and clusters are contiguous runs, so
//! the result depends only on the multiset of sizes and never on hash order.

use log::debug;

use crate::types::SizeClass;
use crate::OutlineError;

/// Default neighbourhood radius, in points.
pub const DEFAULT_EPS: f32 = 0.75;

/// Default minimum population for a size class.
pub const DEFAULT_MIN_SAMPLES: usize = 3;

/// Tunables for [`cluster_font_sizes`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Sizes within this distance of each other may share a class.
    pub eps: f32,
    /// A class needs at least this many lines to count as a heading tier.
    pub min_samples: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

impl ClusterParams {
    pub fn new(eps: f32, min_samples: usize) -> Result<Self, OutlineError> {
        let params = Self { eps, min_samples };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), OutlineError> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(OutlineError::InvalidParameters(format!(
                "eps must be a positive number, got {}",
                self.eps
            )));
        }
        if self.min_samples == 0 {
            return Err(OutlineError::InvalidParameters(
                "min_samples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Cluster `sizes` into [`SizeClass`]es sorted by descending representative
/// size.
///
/// Duplicates are meaningful: every occurrence counts towards density.
/// Non-finite and non-positive sizes are ignored.
pub fn cluster_font_sizes(sizes: &[f32], params: &ClusterParams) -> Vec<SizeClass> {
    let mut values: Vec<f32> = sizes
        .iter()
        .copied()
        .filter(|s| s.is_finite() && *s > 0.0)
        .collect();

    let dropped = sizes.len() - values.len();
    if dropped > 0 {
        debug!("ignoring {} unusable font sizes", dropped);
    }
    if values.is_empty() {
        return Vec::new();
    }

    values.sort_by(f32::total_cmp);

    let eps = params.eps;
    let core = core_points(&values, eps, params.min_samples);
    let labels = label_points(&values, &core, eps);

    let mut classes = collect_classes(&values, &labels);
    classes.sort_by(|a, b| b.representative_size.total_cmp(&a.representative_size));

    debug!(
        "clustered {} sizes into {} classes ({} noise)",
        values.len(),
        classes.len(),
        labels.iter().filter(|l| l.is_none()).count()
    );

    classes
}

/// Flag every sorted value whose `eps`-neighbourhood holds at least
/// `min_samples` values.
fn core_points(values: &[f32], eps: f32, min_samples: usize) -> Vec<bool> {
    let n = values.len();
    let mut core = Vec::with_capacity(n);
    let mut lo = 0;
    let mut hi = 0;

    for i in 0..n {
        while values[i] - values[lo] > eps {
            lo += 1;
        }
        while hi < n && values[hi] - values[i] <= eps {
            hi += 1;
        }
        core.push(hi - lo >= min_samples);
    }

    core
}

/// Assign a cluster label to each sorted value, `None` for noise.
///
/// Labels are handed out left to right, so cluster 0 holds the smallest sizes.
fn label_points(values: &[f32], core: &[bool], eps: f32) -> Vec<Option<usize>> {
    let n = values.len();
    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut next_label = 0;
    let mut last_core: Option<usize> = None;

    // Core points: consecutive cores within eps share a label.
    for i in (0..n).filter(|&i| core[i]) {
        labels[i] = match last_core {
            Some(j) if values[i] - values[j] <= eps => labels[j],
            _ => {
                next_label += 1;
                Some(next_label - 1)
            }
        };
        last_core = Some(i);
    }

    // Border points join the closest reachable core, the smaller one on ties.
    let prev_core = nearest_core_before(core);
    let next_core = nearest_core_after(core);
    for i in (0..n).filter(|&i| !core[i]) {
        let left = prev_core[i]
            .map(|j| (j, values[i] - values[j]))
            .filter(|&(_, d)| d <= eps);
        let right = next_core[i]
            .map(|j| (j, values[j] - values[i]))
            .filter(|&(_, d)| d <= eps);

        labels[i] = match (left, right) {
            (Some((l, dl)), Some((r, dr))) => {
                if dr < dl {
                    labels[r]
                } else {
                    labels[l]
                }
            }
            (Some((l, _)), None) => labels[l],
            (None, Some((r, _))) => labels[r],
            (None, None) => None,
        };
    }

    labels
}

fn nearest_core_before(core: &[bool]) -> Vec<Option<usize>> {
    let mut out = Vec::with_capacity(core.len());
    let mut last = None;
    for (i, &is_core) in core.iter().enumerate() {
        out.push(last);
        if is_core {
            last = Some(i);
        }
    }
    out
}

fn nearest_core_after(core: &[bool]) -> Vec<Option<usize>> {
    let mut out = vec![None; core.len()];
    let mut last = None;
    for (i, &is_core) in core.iter().enumerate().rev() {
        out[i] = last;
        if is_core {
            last = Some(i);
        }
    }
    out
}

/// Fold labelled values into classes, indexed by label (discovery order).
fn collect_classes(values: &[f32], labels: &[Option<usize>]) -> Vec<SizeClass> {
    let count = labels.iter().flatten().max().map_or(0, |max| max + 1);
    let mut classes = vec![
        SizeClass {
            representative_size: 0.0,
            member_count: 0,
        };
        count
    ];

    for (&value, label) in values.iter().zip(labels) {
        if let Some(label) = *label {
            let class = &mut classes[label];
            class.representative_size = class.representative_size.max(value);
            class.member_count += 1;
        }
    }

    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(spec: &[(f32, usize)]) -> Vec<f32> {
        spec.iter()
            .flat_map(|&(size, n)| std::iter::repeat(size).take(n))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster_font_sizes(&[], &ClusterParams::default()).is_empty());
    }

    #[test]
    fn test_all_unique_sizes_are_noise() {
        let input = [8.0, 10.0, 12.0, 14.0, 18.0, 24.0];
        assert!(cluster_font_sizes(&input, &ClusterParams::default()).is_empty());
    }

    #[test]
    fn test_single_dense_class() {
        let classes = cluster_font_sizes(&[12.0; 5], &ClusterParams::default());
        assert_eq!(
            classes,
            vec![SizeClass {
                representative_size: 12.0,
                member_count: 5
            }]
        );
    }

    #[test]
    fn test_sorted_descending_by_representative() {
        let input = sizes(&[(10.0, 50), (24.0, 3), (16.0, 4)]);
        let classes = cluster_font_sizes(&input, &ClusterParams::default());
        let reps: Vec<f32> = classes.iter().map(|c| c.representative_size).collect();
        assert_eq!(reps, vec![24.0, 16.0, 10.0]);
        assert_eq!(classes[0].member_count, 3);
        assert_eq!(classes[1].member_count, 4);
        assert_eq!(classes[2].member_count, 50);
    }

    #[test]
    fn test_sparse_size_is_noise() {
        // A single 24pt line cannot form a class on its own.
        let input = sizes(&[(24.0, 1), (16.0, 3), (10.0, 50)]);
        let classes = cluster_font_sizes(&input, &ClusterParams::default());
        let reps: Vec<f32> = classes.iter().map(|c| c.representative_size).collect();
        assert_eq!(reps, vec![16.0, 10.0]);
    }

    #[test]
    fn test_jitter_merges_into_one_class_with_max_representative() {
        let input = [11.96, 12.0, 12.02, 12.0, 11.98];
        let classes = cluster_font_sizes(&input, &ClusterParams::default());
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].representative_size, 12.02);
        assert_eq!(classes[0].member_count, 5);
    }

    #[test]
    fn test_chained_core_points_form_one_class() {
        // Each step is within eps of the next, so density chains them.
        let input = sizes(&[(10.0, 3), (10.5, 3), (11.0, 3), (11.5, 3)]);
        let classes = cluster_font_sizes(&input, &ClusterParams::default());
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].representative_size, 11.5);
        assert_eq!(classes[0].member_count, 12);
    }

    #[test]
    fn test_border_point_joins_cluster() {
        // 12.7 sees the three 12.0s and 13.4, so it is core. 13.4 sees only
        // 12.7 and itself, which makes it a border point of that cluster.
        let input = [12.0, 12.0, 12.0, 12.7, 13.4];
        let classes = cluster_font_sizes(&input, &ClusterParams::default());
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].member_count, 5);
        assert_eq!(classes[0].representative_size, 13.4);
    }

    #[test]
    fn test_border_point_between_clusters_prefers_closer_core() {
        let params = ClusterParams {
            eps: 1.0,
            min_samples: 4,
        };
        // 11.0 reaches the core at 10.0 (distance 1.0) and the core at 11.8
        // (distance 0.8) but has only three neighbours itself.
        let input = [9.1, 9.2, 9.3, 10.0, 11.0, 11.8, 12.5, 12.6, 12.7];
        let classes = cluster_font_sizes(&input, &params);
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].representative_size, 12.7);
        assert_eq!(classes[0].member_count, 5);
        assert_eq!(classes[1].representative_size, 10.0);
        assert_eq!(classes[1].member_count, 4);
    }

    #[test]
    fn test_distinct_sizes_beyond_eps_stay_separate() {
        let input = sizes(&[(12.0, 3), (13.0, 3)]);
        let classes = cluster_font_sizes(&input, &ClusterParams::default());
        assert_eq!(classes.len(), 2);
    }

    #[test]
    fn test_min_samples_one_makes_every_size_a_class() {
        let params = ClusterParams::new(0.1, 1).unwrap();
        let classes = cluster_font_sizes(&[9.0, 14.0, 20.0], &params);
        assert_eq!(classes.len(), 3);
    }

    #[test]
    fn test_ignores_unusable_sizes() {
        let input = [f32::NAN, 0.0, -3.0, 12.0, 12.0, 12.0];
        let classes = cluster_font_sizes(&input, &ClusterParams::default());
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].member_count, 3);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let forward = sizes(&[(10.0, 20), (14.0, 4), (18.0, 3), (14.3, 2)]);
        let mut backward = forward.clone();
        backward.reverse();
        let params = ClusterParams::default();
        assert_eq!(
            cluster_font_sizes(&forward, &params),
            cluster_font_sizes(&backward, &params)
        );
    }

    #[test]
    fn test_params_validation() {
        assert!(ClusterParams::new(0.75, 3).is_ok());
        assert!(ClusterParams::new(0.0, 3).is_err());
        assert!(ClusterParams::new(-1.0, 3).is_err());
        assert!(ClusterParams::new(f32::NAN, 3).is_err());
        assert!(ClusterParams::new(0.75, 0).is_err());
    }
}

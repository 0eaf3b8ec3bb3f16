//! Density-based clustering (DBSCAN) over feature vectors
//!
//! Deterministic by construction: points are visited in input order, cluster
//! ids follow discovery order, and neighbor lists are kept in ascending index
//! order. A border point reachable from two clusters joins the one discovered
//! first.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::error::{Error, Result};
use crate::features::FeatureVector;

/// Cluster assignment of one point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterLabel {
    Noise,
    Cluster(usize),
}

impl ClusterLabel {
    pub fn cluster_id(&self) -> Option<usize> {
        match self {
            Self::Cluster(id) => Some(*id),
            Self::Noise => None,
        }
    }

    pub fn is_noise(&self) -> bool {
        matches!(self, Self::Noise)
    }
}

/// DBSCAN parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Neighborhood radius (Euclidean, inclusive)
    pub eps: f64,
    /// Lower bound on the core-point neighbor count
    pub min_samples_floor: usize,
    /// Fraction of the batch size that the core-point neighbor count must reach
    pub min_samples_ratio: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_samples_floor: 3,
            min_samples_ratio: 0.01,
        }
    }
}

impl ClusterConfig {
    /// `max(floor, ceil(ratio * batch_size))`
    pub fn min_samples(&self, batch_size: usize) -> usize {
        adaptive_min_samples(batch_size, self.min_samples_floor, self.min_samples_ratio)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(Error::Configuration(format!(
                "clustering.eps must be positive, got {}",
                self.eps
            )));
        }
        if self.min_samples_floor == 0 {
            return Err(Error::Configuration(
                "clustering.min_samples_floor must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_samples_ratio) {
            return Err(Error::Configuration(format!(
                "clustering.min_samples_ratio must be within [0, 1], got {}",
                self.min_samples_ratio
            )));
        }
        Ok(())
    }
}

pub fn adaptive_min_samples(batch_size: usize, floor: usize, ratio: f64) -> usize {
    let scaled = (ratio * batch_size as f64).ceil() as usize;
    floor.max(scaled)
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Indices within `eps` of `vectors[i]`, ascending, the point itself included
fn region_query(vectors: &[FeatureVector], i: usize, eps_sq: f64) -> Vec<usize> {
    let p = &vectors[i];
    vectors
        .par_iter()
        .enumerate()
        .filter(|(_, q)| squared_distance(p, q) <= eps_sq)
        .map(|(j, _)| j)
        .collect()
}

/// Whether each point has at least `min_samples` neighbors (itself included)
///
/// Only counts are kept; neighbor lists are rebuilt one at a time while a
/// cluster expands, so memory stays linear in the batch size.
fn core_points(vectors: &[FeatureVector], eps_sq: f64, min_samples: usize) -> Vec<bool> {
    vectors
        .par_iter()
        .map(|p| {
            vectors
                .iter()
                .filter(|q| squared_distance(p, q) <= eps_sq)
                .count()
                >= min_samples
        })
        .collect()
}

/// Label every vector; the neighbor count includes the point itself
pub fn cluster(vectors: &[FeatureVector], eps: f64, min_samples: usize) -> Vec<ClusterLabel> {
    let eps_sq = eps * eps;
    let is_core = core_points(vectors, eps_sq, min_samples);

    let mut labels: Vec<Option<ClusterLabel>> = vec![None; vectors.len()];
    let mut next_id = 0;

    for i in 0..vectors.len() {
        if labels[i].is_some() {
            continue;
        }
        if !is_core[i] {
            labels[i] = Some(ClusterLabel::Noise);
            continue;
        }

        let id = next_id;
        next_id += 1;
        labels[i] = Some(ClusterLabel::Cluster(id));

        // Points are claimed when queued, so each core point is expanded once
        let mut queue = VecDeque::from([i]);
        while let Some(p) = queue.pop_front() {
            for j in region_query(vectors, p, eps_sq) {
                match labels[j] {
                    Some(ClusterLabel::Cluster(_)) => {}
                    // Previously rejected as noise, reachable from a core point: border
                    Some(ClusterLabel::Noise) => labels[j] = Some(ClusterLabel::Cluster(id)),
                    None => {
                        labels[j] = Some(ClusterLabel::Cluster(id));
                        if is_core[j] {
                            queue.push_back(j);
                        }
                    }
                }
            }
        }
    }

    labels
        .into_iter()
        .map(|l| l.unwrap_or(ClusterLabel::Noise))
        .collect()
}

/// Member indices per cluster id, ascending
pub fn group_clusters(labels: &[ClusterLabel]) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        if let Some(id) = label.cluster_id() {
            groups.entry(id).or_default().push(i);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(xs: &[f64]) -> Vec<FeatureVector> {
        xs.iter().map(|x| vec![*x, 0.0]).collect()
    }

    #[test]
    fn test_adaptive_min_samples() {
        assert_eq!(adaptive_min_samples(10, 3, 0.01), 3);
        assert_eq!(adaptive_min_samples(300, 3, 0.01), 3);
        assert_eq!(adaptive_min_samples(301, 3, 0.01), 4);
        assert_eq!(adaptive_min_samples(1000, 3, 0.01), 10);
        assert_eq!(ClusterConfig::default().min_samples(5000), 50);
    }

    #[test]
    fn test_two_groups_and_noise() {
        let vectors = points(&[0.0, 0.1, 0.2, 5.0, 5.1, 5.2, 10.0]);
        let labels = cluster(&vectors, 0.5, 3);
        assert_eq!(
            labels,
            vec![
                ClusterLabel::Cluster(0),
                ClusterLabel::Cluster(0),
                ClusterLabel::Cluster(0),
                ClusterLabel::Cluster(1),
                ClusterLabel::Cluster(1),
                ClusterLabel::Cluster(1),
                ClusterLabel::Noise,
            ]
        );
        let groups = group_clusters(&labels);
        assert_eq!(groups[&0], vec![0, 1, 2]);
        assert_eq!(groups[&1], vec![3, 4, 5]);
    }

    #[test]
    fn test_neighbor_count_includes_self() {
        // Three points, each seeing the other two plus itself
        let labels = cluster(&points(&[0.0, 0.1, 0.2]), 0.5, 3);
        assert!(labels.iter().all(|l| *l == ClusterLabel::Cluster(0)));
        let labels = cluster(&points(&[0.0, 0.1, 0.2]), 0.5, 4);
        assert!(labels.iter().all(|l| l.is_noise()));
    }

    #[test]
    fn test_noise_point_later_claimed_as_border() {
        // Index 0 is visited first and rejected, then reached from the core group
        let vectors = points(&[0.6, 1.0, 1.1, 1.2, 1.25]);
        let labels = cluster(&vectors, 0.45, 4);
        assert_eq!(labels[0], ClusterLabel::Cluster(0));
        assert!(labels.iter().all(|l| *l == ClusterLabel::Cluster(0)));
    }

    #[test]
    fn test_border_point_joins_first_discovered_cluster() {
        // 0.6 is within eps of 0.2 and 1.0 but is not itself a core point
        let a = [0.0, 0.05, 0.1, 0.2];
        let b = [1.0, 1.1, 1.2, 1.25];

        let mut xs: Vec<f64> = a.to_vec();
        xs.push(0.6);
        xs.extend(b);
        let labels = cluster(&points(&xs), 0.45, 4);
        assert_eq!(labels[4], ClusterLabel::Cluster(0));
        assert_eq!(labels[5], ClusterLabel::Cluster(1));

        let mut xs: Vec<f64> = b.to_vec();
        xs.push(0.6);
        xs.extend(a);
        let labels = cluster(&points(&xs), 0.45, 4);
        assert_eq!(labels[4], labels[0]);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let xs: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 * 0.05).collect();
        let vectors = points(&xs);
        let first = cluster(&vectors, 0.12, 3);
        for _ in 0..5 {
            assert_eq!(cluster(&vectors, 0.12, 3), first);
        }
    }

    #[test]
    fn test_region_query_and_core_points() {
        let vectors = points(&[0.0, 0.3, 0.6, 5.0]);
        assert_eq!(region_query(&vectors, 1, 0.25), vec![0, 1, 2]);
        assert_eq!(region_query(&vectors, 3, 0.25), vec![3]);
        assert_eq!(
            core_points(&vectors, 0.25, 3),
            vec![false, true, false, false]
        );
    }

    #[test]
    fn test_single_dense_group_is_one_cluster() {
        // Every point neighbors every other; expansion must still visit each once
        let vectors = points(&[1.0; 2000]);
        let labels = cluster(&vectors, 0.5, 20);
        assert!(labels.iter().all(|l| *l == ClusterLabel::Cluster(0)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClusterConfig {
            eps: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ClusterConfig::default().validate().is_ok());
    }
}

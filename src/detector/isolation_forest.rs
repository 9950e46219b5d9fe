//! Seeded isolation forest.
//!
//! Each tree isolates points by recursive random axis-aligned splits over a
//! subsample. Outliers are isolated in fewer splits, so their average path
//! length is short. Scores follow the usual convention: the decision value
//! is `-s(x) - offset`, where `s` is the normalized anomaly score and
//! `offset` is the `contamination` quantile over the training rows, so a
//! negative decision marks an outlier.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::detector::pattern::{check_point, check_rows, ModelFitError, OutlierModel, OutlierScore};
use crate::indicator::stats::quantile;

pub const MODEL_NAME: &str = "isolation_forest";

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build<R: Rng>(rows: &[Vec<f64>], sample: &[usize], max_depth: usize, rng: &mut R) -> Self {
        let mut nodes = Vec::with_capacity(2 * sample.len());
        grow(&mut nodes, rows, sample, 0, max_depth, rng);
        Self { nodes }
    }

    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = 0;
        let mut depth = 0usize;
        loop {
            match self.nodes[node] {
                Node::Leaf { size } => return depth as f64 + average_path_length(size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[feature] <= threshold { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

fn grow<R: Rng>(
    nodes: &mut Vec<Node>,
    rows: &[Vec<f64>],
    indices: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut R,
) -> usize {
    let id = nodes.len();
    nodes.push(Node::Leaf {
        size: indices.len(),
    });
    if depth >= max_depth || indices.len() <= 1 {
        return id;
    }

    let width = rows[indices[0]].len();
    let candidates: Vec<(usize, f64, f64)> = (0..width)
        .filter_map(|feature| {
            let (lo, hi) = indices.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), &i| (lo.min(rows[i][feature]), hi.max(rows[i][feature])),
            );
            (hi > lo).then_some((feature, lo, hi))
        })
        .collect();
    if candidates.is_empty() {
        return id;
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| rows[i][feature] <= threshold);

    let left = grow(nodes, rows, &left_idx, depth + 1, max_depth, rng);
    let right = grow(nodes, rows, &right_idx, depth + 1, max_depth, rng);
    nodes[id] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    id
}

/// Average unsuccessful-search path length in a binary search tree of `n`
/// points; normalizes isolation depths.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_trees: usize,
    max_samples: usize,
    contamination: f64,
    seed: u64,
    trees: Vec<IsolationTree>,
    sample_size: usize,
    width: usize,
    offset: f64,
}

impl IsolationForest {
    pub fn new(n_trees: usize, max_samples: usize, contamination: f64, seed: u64) -> Self {
        Self {
            n_trees: n_trees.max(1),
            max_samples: max_samples.max(2),
            contamination,
            seed,
            trees: Vec::new(),
            sample_size: 0,
            width: 0,
            offset: 0.0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Normalized anomaly score in (0, 1]; values near 1 are outliers.
    fn anomaly_score(&self, point: &[f64]) -> f64 {
        let mean_depth = self
            .trees
            .iter()
            .map(|tree| tree.path_length(point))
            .sum::<f64>()
            / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_depth / norm)
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(100, 256, 0.1, 42)
    }
}

impl OutlierModel for IsolationForest {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn fit(&mut self, rows: &[Vec<f64>]) -> Result<(), ModelFitError> {
        let width = check_rows(rows, 2)?;
        let varies = (0..width).any(|f| rows.iter().any(|r| r[f] != rows[0][f]));
        if !varies {
            return Err(ModelFitError::DegenerateFeatures);
        }

        let sample_size = self.max_samples.min(rows.len());
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let trees = (0..self.n_trees)
            .map(|_| {
                let sample = index::sample(&mut rng, rows.len(), sample_size).into_vec();
                IsolationTree::build(rows, &sample, max_depth, &mut rng)
            })
            .collect();

        self.trees = trees;
        self.sample_size = sample_size;
        self.width = width;

        let training: Vec<f64> = rows.iter().map(|r| -self.anomaly_score(r)).collect();
        self.offset = quantile(&training, self.contamination).unwrap_or(-0.5);
        Ok(())
    }

    fn score(&self, point: &[f64]) -> Result<OutlierScore, ModelFitError> {
        if !self.is_fitted() {
            return Err(ModelFitError::NotFitted);
        }
        check_point(point, self.width)?;
        let decision = -self.anomaly_score(point) - self.offset;
        Ok(OutlierScore {
            is_outlier: decision < 0.0,
            score: decision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_length_normalizer() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // 2 * (ln 255 + gamma) - 2 * 255 / 256
        let expected = 2.0 * (255f64.ln() + EULER_GAMMA) - 2.0 * 255.0 / 256.0;
        assert!((average_path_length(256) - expected).abs() < 1e-12);
    }

    #[test]
    fn unfitted_forest_refuses_to_score() {
        let forest = IsolationForest::default();
        assert_eq!(forest.score(&[0.0, 0.0]), Err(ModelFitError::NotFitted));
    }
}

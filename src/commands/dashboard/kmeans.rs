//! Lloyd's k-means with k-means++ seeding and several seeded restarts.

use anyhow::{bail, Result};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::config::Config;

#[derive(Copy, Clone, Debug)]
pub struct KMeans {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
}

#[derive(Clone, Debug)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centers: Vec<[f64; 2]>,
    pub inertia: f64,
    pub n_iter: usize,
}

impl KMeans {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            n_clusters: cfg.n_clusters,
            n_init: cfg.n_init.max(1),
            max_iter: cfg.max_iter.max(1),
            tol: cfg.tolerance,
            seed: cfg.seed,
        }
    }

    /// Best of `n_init` runs by inertia; the earliest run wins ties so the
    /// result does not depend on how rayon schedules the runs.
    pub fn fit(&self, points: &[[f64; 2]]) -> Result<KMeansFit> {
        let k = self.n_clusters;
        if k == 0 {
            bail!("n_clusters must be at least 1");
        }
        if points.len() < k {
            bail!("n_samples={} should be >= n_clusters={}", points.len(), k);
        }

        let mut master = StdRng::seed_from_u64(self.seed);
        let seeds: Vec<u64> = (0..self.n_init).map(|_| master.gen::<u64>()).collect();
        let tol = self.tol * mean_variance(points);

        let fits: Vec<KMeansFit> = seeds
            .par_iter()
            .map(|&seed| run_once(points, k, self.max_iter, tol, seed))
            .collect();

        let best = fits
            .into_iter()
            .enumerate()
            .inspect(|(i, f)| debug!("k-means run {}: inertia {:.6} after {} iterations", i, f.inertia, f.n_iter))
            .map(|(_, f)| f)
            .reduce(|best, f| if f.inertia < best.inertia { f } else { best });
        match best {
            Some(fit) => Ok(fit),
            None => bail!("k-means produced no runs"),
        }
    }
}

fn run_once(points: &[[f64; 2]], k: usize, max_iter: usize, tol: f64, seed: u64) -> KMeansFit {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centers = kmeans_plus_plus(points, k, &mut rng);
    let mut labels: Vec<usize> = Vec::new();
    let mut n_iter = 0;

    for iter in 0..max_iter {
        n_iter = iter + 1;
        let mut new_labels = assign(points, &centers);
        let new_centers = update_centers(points, &mut new_labels, k);
        let shift: f64 = centers
            .iter()
            .zip(new_centers.iter())
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        let stable = new_labels == labels;
        labels = new_labels;
        centers = new_centers;
        if stable || shift <= tol {
            break;
        }
    }

    // a tolerance exit can leave labels that are not nearest-center labels;
    // settle them without giving up centers == member means
    for _ in 0..max_iter {
        let mut settled = assign(points, &centers);
        if settled == labels {
            break;
        }
        centers = update_centers(points, &mut settled, k);
        labels = settled;
    }

    let inertia = points
        .iter()
        .zip(labels.iter())
        .map(|(p, &l)| squared_distance(p, &centers[l]))
        .sum();
    KMeansFit { labels, centers, inertia, n_iter }
}

/// D²-weighted seeding.
pub fn kmeans_plus_plus(points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
    let n = points.len();
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.gen_range(0..n)]);

    let mut min_d2: Vec<f64> = points.iter().map(|p| squared_distance(p, &centers[0])).collect();
    while centers.len() < k {
        let total: f64 = min_d2.iter().sum();
        let idx = if total <= 0.0 {
            rng.gen_range(0..n)
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in min_d2.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        };
        let c = points[idx];
        for (d, p) in min_d2.iter_mut().zip(points.iter()) {
            let nd = squared_distance(p, &c);
            if nd < *d {
                *d = nd;
            }
        }
        centers.push(c);
    }
    centers
}

pub fn assign(points: &[[f64; 2]], centers: &[[f64; 2]]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for (i, c) in centers.iter().enumerate() {
                let d = squared_distance(p, c);
                if d < best_d {
                    best_d = d;
                    best = i;
                }
            }
            best
        })
        .collect()
}

/// Means of the assigned points. An empty cluster takes over the point
/// farthest from its current center, so every label in `0..k` stays in use.
pub fn update_centers(points: &[[f64; 2]], labels: &mut [usize], k: usize) -> Vec<[f64; 2]> {
    let mut centers = means(points, labels, k);
    let mut counts = vec![0usize; k];
    for &l in labels.iter() {
        counts[l] += 1;
    }
    let empty: Vec<usize> = (0..k).filter(|&c| counts[c] == 0).collect();
    if empty.is_empty() {
        return centers;
    }

    let mut by_distance: Vec<usize> = (0..points.len()).collect();
    by_distance.sort_by(|&a, &b| {
        let da = squared_distance(&points[a], &centers[labels[a]]);
        let db = squared_distance(&points[b], &centers[labels[b]]);
        db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut donors = by_distance.into_iter();
    for c in empty {
        // never empty a donor cluster
        for i in donors.by_ref() {
            if counts[labels[i]] > 1 {
                counts[labels[i]] -= 1;
                labels[i] = c;
                counts[c] += 1;
                break;
            }
        }
    }
    centers = means(points, labels, k);
    centers
}

fn means(points: &[[f64; 2]], labels: &[usize], k: usize) -> Vec<[f64; 2]> {
    let mut sums = vec![[0.0f64; 2]; k];
    let mut counts = vec![0usize; k];
    for (p, &l) in points.iter().zip(labels.iter()) {
        sums[l][0] += p[0];
        sums[l][1] += p[1];
        counts[l] += 1;
    }
    sums.into_iter()
        .zip(counts)
        .map(|(s, c)| if c > 0 { [s[0] / c as f64, s[1] / c as f64] } else { s })
        .collect()
}

fn mean_variance(points: &[[f64; 2]]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let n = points.len() as f64;
    let mut total = 0.0;
    for axis in 0..2 {
        let mean = points.iter().map(|p| p[axis]).sum::<f64>() / n;
        total += points.iter().map(|p| (p[axis] - mean).powi(2)).sum::<f64>() / n;
    }
    total / 2.0
}

#[inline]
pub fn squared_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(k: usize) -> KMeans {
        KMeans { n_clusters: k, n_init: 10, max_iter: 300, tol: 1e-4, seed: 42 }
    }

    fn blobs() -> Vec<[f64; 2]> {
        vec![
            [0.0, 0.0], [0.1, 0.0], [0.0, 0.1],
            [10.0, 10.0], [10.1, 10.0], [10.0, 10.1],
            [-10.0, 10.0], [-10.1, 10.0], [-10.0, 10.1],
        ]
    }

    #[test]
    fn test_separates_well_spaced_blobs() {
        let fit = model(3).fit(&blobs()).unwrap();
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[0], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_eq!(fit.labels[6], fit.labels[8]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert_ne!(fit.labels[3], fit.labels[6]);
        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = model(3).fit(&blobs()).unwrap();
        let b = model(3).fit(&blobs()).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centers, b.centers);
    }

    #[test]
    fn test_centers_are_member_means() {
        let pts = blobs();
        let fit = model(4).fit(&pts).unwrap();
        for (c, center) in fit.centers.iter().enumerate() {
            let members: Vec<&[f64; 2]> = pts.iter().zip(&fit.labels).filter(|(_, &l)| l == c).map(|(p, _)| p).collect();
            assert!(!members.is_empty());
            let n = members.len() as f64;
            let mx = members.iter().map(|p| p[0]).sum::<f64>() / n;
            let my = members.iter().map(|p| p[1]).sum::<f64>() / n;
            assert!((center[0] - mx).abs() < 1e-9);
            assert!((center[1] - my).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tolerance_exit_still_returns_nearest_labels() {
        let pts: Vec<[f64; 2]> = (0..20).map(|i| [i as f64 + 0.3 * (i % 3) as f64, (i % 4) as f64]).collect();
        for seed in 0..8 {
            let loose = KMeans { n_clusters: 3, n_init: 1, max_iter: 300, tol: 1e9, seed };
            let fit = loose.fit(&pts).unwrap();
            assert_eq!(fit.labels, assign(&pts, &fit.centers), "seed {}", seed);
            assert_eq!(fit.centers, update_centers(&pts, &mut fit.labels.clone(), 3), "seed {}", seed);
        }
    }

    #[test]
    fn test_every_label_used_when_k_exceeds_groups() {
        let pts = vec![[0.0, 0.0], [0.1, 0.0], [0.0, 0.1], [5.0, 5.0], [5.1, 5.0], [5.0, 5.1]];
        let fit = model(5).fit(&pts).unwrap();
        let mut used: Vec<usize> = fit.labels.clone();
        used.sort_unstable();
        used.dedup();
        assert_eq!(used, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_fewer_points_than_clusters_fails() {
        let err = model(5).fit(&[[0.0, 0.0], [1.0, 1.0]]).unwrap_err();
        assert!(err.to_string().contains("n_clusters=5"));
    }

    #[test]
    fn test_update_centers_fills_empty_cluster() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [9.0, 0.0]];
        let mut labels = vec![0, 0, 0];
        let centers = update_centers(&pts, &mut labels, 2);
        assert_eq!(labels, vec![0, 0, 1]);
        assert_eq!(centers[1], [9.0, 0.0]);
        assert_eq!(centers[0], [0.5, 0.0]);
    }
}

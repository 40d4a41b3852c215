use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{EngineDataset, RecordId};
use crate::error::AtlasError;
use crate::rng::SimpleRng;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Features clustered by default: the performance/efficiency axes the
/// dashboard's cluster page uses.
pub const DEFAULT_CLUSTER_FEATURES: &[&str] = &[
    "engine_hp",
    "acceleration_0_100_km_h_s",
    "mixed_fuel_consumption_per_100_km_l",
    "number_of_cylinders",
];

/// Cluster Engine configuration. The seed is part of the public contract:
/// identical seed and input produce bit-for-bit identical output.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub features: Vec<String>,
    pub k: usize,
    pub seed: u64,
    /// Minimum number of complete rows required to attempt clustering.
    pub min_rows: usize,
    pub max_iterations: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            features: DEFAULT_CLUSTER_FEATURES
                .iter()
                .map(|f| f.to_string())
                .collect(),
            k: 4,
            seed: 42,
            min_rows: 4,
            max_iterations: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Where one record landed: 2D principal-component coordinates and the
/// discrete cluster it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterPoint {
    pub coords: [f64; 2],
    pub cluster: usize,
}

/// Per-cluster digest for the summary table: size and the mean of each
/// clustering feature in original units.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub name: String,
    pub size: usize,
    pub feature_means: BTreeMap<String, f64>,
}

/// Full clustering result. The assignment keys are exactly the records that
/// had every selected feature present; everything else was excluded (and
/// still appears in feature and ranking outputs).
#[derive(Debug, Clone, Serialize)]
pub struct ClusterAssignment {
    pub assignments: BTreeMap<RecordId, ClusterPoint>,
    pub cluster_names: Vec<String>,
    pub summaries: Vec<ClusterSummary>,
    pub excluded: usize,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Cluster the dataset on the configured features:
/// standardize (zero mean, unit variance per feature over the included set),
/// project to two principal components, and partition with seeded k-means.
pub fn compute_clusters(
    dataset: &EngineDataset,
    config: &ClusterConfig,
) -> Result<ClusterAssignment, AtlasError> {
    let mut ids: Vec<RecordId> = Vec::new();
    let mut raw: Vec<Vec<f64>> = Vec::new();
    for rec in &dataset.records {
        let row: Option<Vec<f64>> = config.features.iter().map(|f| rec.number(f)).collect();
        if let Some(row) = row {
            ids.push(rec.id);
            raw.push(row);
        }
    }

    let excluded = dataset.len() - ids.len();
    let required = config.min_rows.max(config.k).max(1);
    if raw.len() < required {
        return Err(AtlasError::ClusterInputInsufficient {
            complete: raw.len(),
            excluded,
            required,
        });
    }

    // Standardization is load-bearing: without it the widest-scaled feature
    // owns the distance metric.
    let scaled = standardize(&raw);
    let (labels, centers) = kmeans(&scaled, config.k, config.seed, config.max_iterations);
    let coords = pca_two_components(&scaled);
    let names = name_clusters(&centers, &config.features);

    let assignments: BTreeMap<RecordId, ClusterPoint> = ids
        .iter()
        .zip(labels.iter())
        .zip(coords.iter())
        .map(|((&id, &cluster), &coords)| (id, ClusterPoint { coords, cluster }))
        .collect();

    let summaries = summarize(&raw, &labels, config.k, &config.features, &names);

    Ok(ClusterAssignment {
        assignments,
        cluster_names: names,
        summaries,
        excluded,
    })
}

// ---------------------------------------------------------------------------
// Standardization
// ---------------------------------------------------------------------------

/// z-score each column over the given rows. A zero-variance column maps to
/// all zeros rather than dividing by zero.
fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.len();
    let dim = rows.first().map_or(0, Vec::len);

    let mut means = vec![0.0; dim];
    for row in rows {
        for (j, v) in row.iter().enumerate() {
            means[j] += v;
        }
    }
    for m in &mut means {
        *m /= n as f64;
    }

    let mut stds = vec![0.0; dim];
    for row in rows {
        for (j, v) in row.iter().enumerate() {
            stds[j] += (v - means[j]).powi(2);
        }
    }
    for s in &mut stds {
        *s = (*s / n as f64).sqrt();
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, v)| {
                    if stds[j] > 0.0 {
                        (v - means[j]) / stds[j]
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// k-means
// ---------------------------------------------------------------------------

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Lloyd's algorithm with deterministic seeding: the first centroid is drawn
/// from the seeded PRNG, the rest greedily maximize distance to the chosen
/// set (ties to the lowest row index). Empty clusters are reseeded from the
/// point farthest from its centroid.
fn kmeans(
    data: &[Vec<f64>],
    k: usize,
    seed: u64,
    max_iterations: usize,
) -> (Vec<usize>, Vec<Vec<f64>>) {
    let n = data.len();
    let dim = data[0].len();
    let mut rng = SimpleRng::new(seed);

    let mut centers: Vec<Vec<f64>> = Vec::with_capacity(k);
    centers.push(data[rng.next_index(n)].clone());
    while centers.len() < k {
        let mut best = 0usize;
        let mut best_d = -1.0;
        for (i, point) in data.iter().enumerate() {
            let d = centers
                .iter()
                .map(|c| sq_dist(point, c))
                .fold(f64::INFINITY, f64::min);
            if d > best_d {
                best_d = d;
                best = i;
            }
        }
        centers.push(data[best].clone());
    }

    let assign = |centers: &[Vec<f64>], labels: &mut [usize]| -> bool {
        let mut changed = false;
        for (i, point) in data.iter().enumerate() {
            let mut best = 0usize;
            let mut best_d = f64::INFINITY;
            for (c_idx, center) in centers.iter().enumerate() {
                let d = sq_dist(point, center);
                if d < best_d {
                    best_d = d;
                    best = c_idx;
                }
            }
            if labels[i] != best {
                labels[i] = best;
                changed = true;
            }
        }
        changed
    };

    let mut labels = vec![usize::MAX; n];
    let mut converged = false;
    for iteration in 0..max_iterations {
        if !assign(&centers, &mut labels) {
            log::debug!("k-means converged after {iteration} iterations");
            converged = true;
            break;
        }

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in data.iter().zip(&labels) {
            counts[label] += 1;
            for (j, v) in point.iter().enumerate() {
                sums[label][j] += v;
            }
        }
        for c_idx in 0..k {
            if counts[c_idx] == 0 {
                // Reseed from the point farthest from its current centroid.
                let far = data
                    .iter()
                    .enumerate()
                    .max_by(|(ia, a), (ib, b)| {
                        sq_dist(a, &centers[labels[*ia]])
                            .total_cmp(&sq_dist(b, &centers[labels[*ib]]))
                            .then(ib.cmp(ia))
                    })
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                centers[c_idx] = data[far].clone();
            } else {
                for j in 0..dim {
                    centers[c_idx][j] = sums[c_idx][j] / counts[c_idx] as f64;
                }
            }
        }
    }
    if !converged {
        // Sync labels with the final centers.
        assign(&centers, &mut labels);
    }

    (labels, centers)
}

// ---------------------------------------------------------------------------
// PCA
// ---------------------------------------------------------------------------

const POWER_ITERATIONS: usize = 300;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn subtract_projection(v: &mut [f64], onto: &[f64]) {
    let p = dot(v, onto);
    for (x, o) in v.iter_mut().zip(onto) {
        *x -= p * o;
    }
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter().map(|row| dot(row, v)).collect()
}

fn l2(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Deterministic start vector, orthogonalized against an earlier component
/// when deflating. Falls back to basis vectors when the uniform start is
/// parallel to the earlier component.
fn init_vector(dim: usize, orthogonal_to: Option<&[f64]>) -> Vec<f64> {
    let mut v = vec![1.0 / (dim as f64).sqrt(); dim];
    let Some(onto) = orthogonal_to else {
        return v;
    };
    subtract_projection(&mut v, onto);
    let mut basis = 0;
    while l2(&v) < 1e-8 && basis < dim {
        v = vec![0.0; dim];
        v[basis] = 1.0;
        subtract_projection(&mut v, onto);
        basis += 1;
    }
    let norm = l2(&v);
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Power iteration for the leading eigenvector of a symmetric matrix, with
/// optional deflation via re-orthogonalization. The sign convention (largest
/// magnitude component non-negative) makes repeated runs exactly identical.
fn dominant_eigenvector(matrix: &[Vec<f64>], orthogonal_to: Option<&[f64]>) -> Vec<f64> {
    let mut v = init_vector(matrix.len(), orthogonal_to);
    for _ in 0..POWER_ITERATIONS {
        let mut w = mat_vec(matrix, &v);
        if let Some(onto) = orthogonal_to {
            subtract_projection(&mut w, onto);
        }
        let norm = l2(&w);
        if norm < 1e-12 {
            break;
        }
        for x in &mut w {
            *x /= norm;
        }
        let delta: f64 = v.iter().zip(&w).map(|(a, b)| (a - b).abs()).sum();
        let delta_flipped: f64 = v.iter().zip(&w).map(|(a, b)| (a + b).abs()).sum();
        v = w;
        if delta < 1e-12 || delta_flipped < 1e-12 {
            break;
        }
    }

    let mut max_abs = 0.0;
    let mut max_val = 0.0;
    for &x in &v {
        if x.abs() > max_abs {
            max_abs = x.abs();
            max_val = x;
        }
    }
    if max_val < 0.0 {
        for x in &mut v {
            *x = -*x;
        }
    }
    v
}

/// Project standardized rows onto their two leading principal components.
fn pca_two_components(rows: &[Vec<f64>]) -> Vec<[f64; 2]> {
    let n = rows.len();
    let dim = rows.first().map_or(0, Vec::len);

    // Rows are standardized (mean zero), so the covariance is XᵀX / (n-1).
    let mut cov = vec![vec![0.0; dim]; dim];
    for row in rows {
        for i in 0..dim {
            for j in 0..dim {
                cov[i][j] += row[i] * row[j];
            }
        }
    }
    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
    for row in &mut cov {
        for v in row.iter_mut() {
            *v /= denom;
        }
    }

    let first = dominant_eigenvector(&cov, None);
    let second = dominant_eigenvector(&cov, Some(&first));

    rows.iter()
        .map(|row| [dot(row, &first), dot(row, &second)])
        .collect()
}

// ---------------------------------------------------------------------------
// Cluster naming and summaries
// ---------------------------------------------------------------------------

/// Name each cluster from its centroid position in standardized space:
/// frugal fuel use wins, then raw power, then quick acceleration, then big
/// cylinder counts; everything else is "Balanced".
fn name_clusters(centers: &[Vec<f64>], features: &[String]) -> Vec<String> {
    let index_of = |name: &str| features.iter().position(|f| f == name);
    let hp = index_of("engine_hp");
    let accel = index_of("acceleration_0_100_km_h_s");
    let fuel = index_of("mixed_fuel_consumption_per_100_km_l");
    let cylinders = index_of("number_of_cylinders");

    centers
        .iter()
        .map(|center| {
            let name = if fuel.is_some_and(|i| center[i] < -0.5) {
                "Efficient"
            } else if hp.is_some_and(|i| center[i] > 0.7) {
                "High Power"
            } else if accel.is_some_and(|i| center[i] < -0.3) {
                "Quick Accel"
            } else if cylinders.is_some_and(|i| center[i] > 0.6) {
                "Big Cyl"
            } else {
                "Balanced"
            };
            name.to_string()
        })
        .collect()
}

fn summarize(
    raw: &[Vec<f64>],
    labels: &[usize],
    k: usize,
    features: &[String],
    names: &[String],
) -> Vec<ClusterSummary> {
    (0..k)
        .map(|cluster| {
            let members: Vec<&Vec<f64>> = raw
                .iter()
                .zip(labels)
                .filter(|(_, &l)| l == cluster)
                .map(|(row, _)| row)
                .collect();
            let size = members.len();
            let feature_means = features
                .iter()
                .enumerate()
                .map(|(j, f)| {
                    let mean = if size > 0 {
                        members.iter().map(|row| row[j]).sum::<f64>() / size as f64
                    } else {
                        f64::NAN
                    };
                    (f.clone(), mean)
                })
                .collect();
            ClusterSummary {
                cluster,
                name: names[cluster].clone(),
                size,
                feature_means,
            }
        })
        .collect()
}

//! Spatial clustering of retrieval candidates
//!
//! Groups geotagged retrieval hits into density-based clusters so that
//! several independent matches agreeing on a location can outvote any
//! single match.

use geolens_core::models::{Candidate, Cluster, GeoPoint};

/// Linear degree/kilometer conversion used for the clustering radius.
/// Only locally accurate near the target region's latitude band; kept as
/// documented behavior.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Member candidates retained per cluster in the output
const RETAINED_MEMBERS: usize = 5;

/// Outcome of the clustering phase
#[derive(Debug, Clone)]
pub enum ClusterOutcome {
    /// Fewer than two candidates: returned unchanged, in input order.
    /// No spurious single-point clusters are fabricated.
    PassThrough(Vec<Candidate>),

    /// Dense clusters, sorted descending by `(size, avg_similarity)`.
    /// Noise points were discarded.
    Clusters(Vec<Cluster>),
}

impl ClusterOutcome {
    pub fn clusters(&self) -> &[Cluster] {
        match self {
            ClusterOutcome::Clusters(c) => c,
            ClusterOutcome::PassThrough(_) => &[],
        }
    }
}

/// Cluster candidates by spatial density.
///
/// `radius_km` is converted to angular degrees with the fixed linear
/// approximation; `min_samples` is the minimum neighborhood occupancy.
pub fn cluster_candidates(
    candidates: &[Candidate],
    radius_km: f64,
    min_samples: usize,
) -> ClusterOutcome {
    if candidates.len() < 2 {
        return ClusterOutcome::PassThrough(candidates.to_vec());
    }

    let eps_deg = radius_km / KM_PER_DEGREE;
    let labels = dbscan(candidates, eps_deg, min_samples);

    let cluster_count = labels.iter().copied().max().unwrap_or(0);
    let mut clusters = Vec::new();

    for cluster_id in 1..=cluster_count {
        let members: Vec<&Candidate> = candidates
            .iter()
            .zip(labels.iter())
            .filter(|(_, &label)| label == cluster_id)
            .map(|(c, _)| c)
            .collect();

        clusters.push(aggregate(&members));
    }

    // Size is the primary tie-break, then mean similarity
    clusters.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then(b.avg_similarity.partial_cmp(&a.avg_similarity).unwrap_or(std::cmp::Ordering::Equal))
    });

    ClusterOutcome::Clusters(clusters)
}

/// Build one cluster from its members: similarity-weighted centroid,
/// full-member size and mean similarity, top-N retained members.
fn aggregate(members: &[&Candidate]) -> Cluster {
    let similarity_sum: f64 = members.iter().map(|c| c.similarity as f64).sum();

    // Renormalize weights within the cluster; uniform fallback when all
    // similarities are zero
    let weights: Vec<f64> = if similarity_sum > 0.0 {
        members.iter().map(|c| c.similarity as f64 / similarity_sum).collect()
    } else {
        vec![1.0 / members.len() as f64; members.len()]
    };

    let center_lat: f64 = members.iter().zip(&weights).map(|(c, w)| c.geo.lat * w).sum();
    let center_lon: f64 = members.iter().zip(&weights).map(|(c, w)| c.geo.lon * w).sum();

    let avg_similarity = (similarity_sum / members.len() as f64) as f32;

    let mut retained: Vec<Candidate> = members.iter().map(|&c| c.clone()).collect();
    retained.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    retained.truncate(RETAINED_MEMBERS);

    Cluster {
        center: GeoPoint::new(center_lat, center_lon),
        size: members.len(),
        avg_similarity,
        members: retained,
    }
}

/// DBSCAN over candidate coordinates in angular degrees.
///
/// Returns a label per candidate: 0 is undefined (never left after the
/// pass), -1 is noise, positive labels identify clusters.
fn dbscan(candidates: &[Candidate], eps_deg: f64, min_samples: usize) -> Vec<i32> {
    const UNDEFINED: i32 = 0;
    const NOISE: i32 = -1;

    let n = candidates.len();
    let mut labels = vec![UNDEFINED; n];
    let mut cluster_id: i32 = 0;

    for i in 0..n {
        if labels[i] != UNDEFINED {
            continue;
        }

        let neighbors = range_query(candidates, i, eps_deg);
        if neighbors.len() < min_samples {
            labels[i] = NOISE;
            continue;
        }

        cluster_id += 1;
        labels[i] = cluster_id;

        let mut seed: Vec<usize> = neighbors.into_iter().filter(|&j| j != i).collect();
        let mut cursor = 0;
        while cursor < seed.len() {
            let q = seed[cursor];
            cursor += 1;

            if labels[q] == NOISE {
                labels[q] = cluster_id;
            }
            if labels[q] != UNDEFINED {
                continue;
            }
            labels[q] = cluster_id;

            let q_neighbors = range_query(candidates, q, eps_deg);
            if q_neighbors.len() >= min_samples {
                seed.extend(q_neighbors);
            }
        }
    }

    labels
}

/// Indices of all candidates within eps (Euclidean degrees) of candidate `idx`
fn range_query(candidates: &[Candidate], idx: usize, eps_deg: f64) -> Vec<usize> {
    let origin = candidates[idx].geo;
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            let dlat = c.geo.lat - origin.lat;
            let dlon = c.geo.lon - origin.lon;
            (dlat * dlat + dlon * dlon).sqrt() <= eps_deg
        })
        .map(|(i, _)| i)
        .collect()
}

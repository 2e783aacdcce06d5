//! Seeded k-means++ trainer for the partitioned index quantizer
//!
//! Deterministic: the same corpus and seed always produce the same
//! centroids, so rebuilt indexes are reproducible.

/// Small deterministic PRNG (xorshift64*), enough for centroid seeding
struct SeededRng(u64);

impl SeededRng {
    fn new(seed: u64) -> Self {
        // Zero state would get stuck
        Self(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| ((x - y) as f64).powi(2)).sum()
}

/// Train `k` centroids over `vectors` with k-means++ initialization and
/// Lloyd iterations. Returns fewer than `k` centroids only when the corpus
/// itself has fewer vectors.
pub fn train(vectors: &[Vec<f32>], k: usize, iterations: usize, seed: u64) -> Vec<Vec<f32>> {
    if vectors.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(vectors.len());

    let mut rng = SeededRng::new(seed);
    let mut centroids = init_plus_plus(vectors, k, &mut rng);

    let mut assignments = vec![0usize; vectors.len()];
    for _ in 0..iterations {
        let mut changed = false;
        for (i, v) in vectors.iter().enumerate() {
            let nearest = nearest_centroid(v, &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        // Recompute means; empty partitions keep their previous centroid
        let dim = vectors[0].len();
        let mut sums = vec![vec![0.0f64; dim]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (i, v) in vectors.iter().enumerate() {
            counts[assignments[i]] += 1;
            for (s, &x) in sums[assignments[i]].iter_mut().zip(v.iter()) {
                *s += x as f64;
            }
        }
        for (c, (sum, count)) in centroids.iter_mut().zip(sums.iter().zip(counts.iter())) {
            if *count > 0 {
                for (dst, s) in c.iter_mut().zip(sum.iter()) {
                    *dst = (s / *count as f64) as f32;
                }
            }
        }

        if !changed {
            break;
        }
    }

    centroids
}

/// Index of the centroid nearest to `vector` by Euclidean distance
pub fn nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(vector, c);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Indices of the `n` nearest centroids, closest first
pub fn nearest_centroids(vector: &[f32], centroids: &[Vec<f32>], n: usize) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(vector, c)))
        .collect();
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(n).map(|(i, _)| i).collect()
}

/// k-means++ seeding: first centroid uniform, the rest proportional to
/// squared distance from the nearest chosen centroid.
fn init_plus_plus(vectors: &[Vec<f32>], k: usize, rng: &mut SeededRng) -> Vec<Vec<f32>> {
    let first = (rng.next_u64() as usize) % vectors.len();
    let mut centroids = vec![vectors[first].clone()];

    let mut dists: Vec<f64> =
        vectors.iter().map(|v| squared_distance(v, &centroids[0])).collect();

    while centroids.len() < k {
        let total: f64 = dists.iter().sum();
        let next = if total <= 0.0 {
            // All remaining points coincide with a centroid
            (rng.next_u64() as usize) % vectors.len()
        } else {
            let mut target = rng.next_f64() * total;
            let mut chosen = vectors.len() - 1;
            for (i, d) in dists.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        };

        centroids.push(vectors[next].clone());
        for (d, v) in dists.iter_mut().zip(vectors.iter()) {
            let nd = squared_distance(v, centroids.last().unwrap());
            if nd < *d {
                *d = nd;
            }
        }
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f32>> {
        let mut vectors = Vec::new();
        for i in 0..10 {
            vectors.push(vec![0.0 + i as f32 * 0.01, 0.0]);
            vectors.push(vec![10.0 + i as f32 * 0.01, 10.0]);
        }
        vectors
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let vectors = two_blobs();
        let a = train(&vectors, 2, 10, 42);
        let b = train(&vectors, 2, 10, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_separates_blobs() {
        let vectors = two_blobs();
        let centroids = train(&vectors, 2, 20, 7);
        assert_eq!(centroids.len(), 2);

        // One centroid near each blob
        let near_origin = centroids.iter().any(|c| c[0] < 5.0);
        let near_far = centroids.iter().any(|c| c[0] > 5.0);
        assert!(near_origin && near_far);
    }

    #[test]
    fn test_k_clamped_to_corpus_size() {
        let vectors = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let centroids = train(&vectors, 8, 5, 1);
        assert_eq!(centroids.len(), 2);
    }

    #[test]
    fn test_nearest_centroids_order() {
        let centroids = vec![vec![0.0], vec![5.0], vec![1.0]];
        let order = nearest_centroids(&[0.9], &centroids, 3);
        assert_eq!(order, vec![2, 0, 1]);
    }
}

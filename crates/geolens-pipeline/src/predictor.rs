//! Hybrid location predictor
//!
//! Fuses three independent signals: a whole-image coarse locator, a
//! region-specific retrieval index, and building-footprint snapping. The
//! winning signal is chosen by an explicit ordered rule cascade; any
//! subset of signals may be missing and the pipeline still produces a
//! result (possibly an empty one).

use std::sync::Arc;

use chrono::Duration;
use geolens_core::config::GeoLensConfig;
use geolens_core::models::{
    BestPrediction, Candidate, Cluster, CoarsePrediction, PredictionMethod, PredictionResult,
};
use geolens_geo::BuildingSnapper;
use geolens_index::ImageIndex;
use geolens_models::{CoarseLocator, RegionEmbedder};
use tracing::{debug, info, warn};

use crate::cache::{content_hash, ResultCache};
use crate::cluster::{cluster_candidates, ClusterOutcome};

/// Minimum cluster size for the consensus rule
const STRONG_CLUSTER_SIZE: usize = 3;

/// Minimum mean similarity for the consensus rule (strict)
const STRONG_CLUSTER_SIMILARITY: f32 = 0.7;

/// Minimum coarse confidence for the confident-coarse rule (strict)
const CONFIDENT_COARSE: f64 = 0.6;

/// Confidence added when the point snaps to a building footprint
const SNAP_BONUS: f64 = 0.1;

/// Upper bound on reported confidence
const CONFIDENCE_CAP: f64 = 0.95;

/// Evidence gathered before selection
struct Signals {
    coarse: Option<CoarsePrediction>,
    candidates: Vec<Candidate>,
    clusters: Vec<Cluster>,
}

/// Selection rules, evaluated strictly in declaration order.
/// The first rule producing a prediction wins.
#[derive(Debug, Clone, Copy)]
enum SelectionRule {
    /// Several retrieval matches agree on a tight area with high similarity
    StrongConsensus,
    /// The coarse model is confident on its own
    ConfidentCoarse,
    /// No consensus: fall back to the single best retrieval match
    BestSingleMatch,
    /// Last resort: whatever the coarse model said, however unsure
    WeakCoarseFallback,
}

const CASCADE: [SelectionRule; 4] = [
    SelectionRule::StrongConsensus,
    SelectionRule::ConfidentCoarse,
    SelectionRule::BestSingleMatch,
    SelectionRule::WeakCoarseFallback,
];

impl SelectionRule {
    fn evaluate(&self, signals: &Signals) -> Option<BestPrediction> {
        match self {
            SelectionRule::StrongConsensus => {
                let top = signals.clusters.first()?;
                if top.size >= STRONG_CLUSTER_SIZE && top.avg_similarity > STRONG_CLUSTER_SIMILARITY
                {
                    Some(BestPrediction {
                        point: top.center,
                        method: PredictionMethod::RetrievalCluster,
                        snapped: false,
                        cluster_size: Some(top.size),
                        similarity: Some(top.avg_similarity),
                        coarse_confidence: None,
                    })
                } else {
                    None
                }
            }
            SelectionRule::ConfidentCoarse => {
                let coarse = signals.coarse.as_ref()?;
                if coarse.confidence > CONFIDENT_COARSE {
                    Some(BestPrediction {
                        point: coarse.geo,
                        method: PredictionMethod::Coarse,
                        snapped: false,
                        cluster_size: None,
                        similarity: None,
                        coarse_confidence: Some(coarse.confidence),
                    })
                } else {
                    None
                }
            }
            SelectionRule::BestSingleMatch => {
                let best = signals.candidates.iter().max_by(|a, b| {
                    a.similarity
                        .partial_cmp(&b.similarity)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })?;
                Some(BestPrediction {
                    point: best.geo,
                    method: PredictionMethod::SingleRetrieval,
                    snapped: false,
                    cluster_size: None,
                    similarity: Some(best.similarity),
                    coarse_confidence: None,
                })
            }
            SelectionRule::WeakCoarseFallback => {
                let coarse = signals.coarse.as_ref()?;
                Some(BestPrediction {
                    point: coarse.geo,
                    method: PredictionMethod::CoarseFallback,
                    snapped: false,
                    cluster_size: None,
                    similarity: None,
                    coarse_confidence: Some(coarse.confidence),
                })
            }
        }
    }
}

fn select_best(signals: &Signals) -> Option<BestPrediction> {
    CASCADE.iter().find_map(|rule| rule.evaluate(signals))
}

/// Calibrated confidence for the selected prediction, before the snap bonus
fn base_confidence(best: &BestPrediction) -> f64 {
    match best.method {
        PredictionMethod::RetrievalCluster => {
            let sim = best.similarity.unwrap_or(0.0) as f64;
            (0.5 + sim * 0.4).min(0.9)
        }
        PredictionMethod::Coarse => best.coarse_confidence.unwrap_or(0.0) * 0.8,
        PredictionMethod::SingleRetrieval => best.similarity.unwrap_or(0.0) as f64 * 0.6,
        PredictionMethod::CoarseFallback => 0.3,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Hybrid predictor: composes the signal sources and the selection cascade.
///
/// Every source is optional; construction with none of them yields a
/// predictor that always returns empty results rather than an error.
pub struct HybridPredictor {
    coarse: Option<Arc<dyn CoarseLocator>>,
    embedder: Option<Arc<dyn RegionEmbedder>>,
    index: Option<Arc<ImageIndex>>,
    snapper: Option<Arc<BuildingSnapper>>,
    cache: Option<ResultCache>,
    config: GeoLensConfig,
}

impl HybridPredictor {
    pub fn new(config: GeoLensConfig) -> Self {
        Self {
            coarse: None,
            embedder: None,
            index: None,
            snapper: None,
            cache: None,
            config,
        }
    }

    pub fn with_coarse_locator(mut self, locator: Arc<dyn CoarseLocator>) -> Self {
        self.coarse = Some(locator);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn RegionEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_index(mut self, index: Arc<ImageIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_snapper(mut self, snapper: Arc<BuildingSnapper>) -> Self {
        self.snapper = Some(snapper);
        self
    }

    /// Enable the result cache under the configured directory
    pub fn with_cache(mut self) -> Self {
        let ttl = Duration::hours(self.config.result_ttl_hours);
        self.cache = Some(ResultCache::new(self.config.result_cache_dir(), ttl));
        self
    }

    pub fn config(&self) -> &GeoLensConfig {
        &self.config
    }

    /// Run the full pipeline for one image.
    ///
    /// Never fails: individual signal failures degrade to "no signal",
    /// and total signal loss produces an empty result with confidence 0.
    pub async fn predict(&self, image: &[u8]) -> PredictionResult {
        let key = content_hash(image);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                debug!(key = %key, "returning cached prediction");
                return hit;
            }
        }

        let signals = self.gather_signals(image).await;
        let mut result = self.decide(signals).await;
        result.confidence = round3(result.confidence);

        if let Some(best) = &result.best {
            if !self.config.region.bbox.contains(&best.point) {
                warn!(
                    lat = best.point.lat,
                    lon = best.point.lon,
                    region = %self.config.region.name,
                    "prediction falls outside the target region"
                );
            }
            info!(
                method = %best.method,
                confidence = result.confidence,
                snapped = best.snapped,
                "prediction complete"
            );
        } else {
            info!("no signal available, returning empty prediction");
        }

        if let Some(cache) = &self.cache {
            cache.put(&key, &result);
        }

        result
    }

    async fn gather_signals(&self, image: &[u8]) -> Signals {
        let coarse = match &self.coarse {
            Some(locator) => match locator.predict(image).await {
                Ok(prediction) => Some(prediction),
                Err(e) => {
                    warn!(error = %e, "coarse locator unavailable, continuing without it");
                    None
                }
            },
            None => None,
        };

        let candidates = self.retrieve(image).await;
        let outcome = cluster_candidates(
            &candidates,
            self.config.cluster_radius_km,
            self.config.min_cluster_size,
        );

        let clusters = match outcome {
            ClusterOutcome::Clusters(clusters) => clusters,
            ClusterOutcome::PassThrough(_) => Vec::new(),
        };

        Signals { coarse, candidates, clusters }
    }

    /// Embed the image and query the index. Any missing piece, a zero
    /// embedding, or an empty index yields no candidates.
    async fn retrieve(&self, image: &[u8]) -> Vec<Candidate> {
        let (embedder, index) = match (&self.embedder, &self.index) {
            (Some(e), Some(i)) => (e, i),
            _ => return Vec::new(),
        };

        if !index.is_available() {
            debug!("retrieval index empty, skipping similarity search");
            return Vec::new();
        }

        let embedding = match embedder.embed(image).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "embedder unavailable, skipping retrieval");
                return Vec::new();
            }
        };

        if embedding.is_zero() {
            debug!("zero embedding, skipping retrieval");
            return Vec::new();
        }

        index.search(&embedding, self.config.retrieval_top_k)
    }

    async fn decide(&self, signals: Signals) -> PredictionResult {
        let mut best = match select_best(&signals) {
            Some(best) => best,
            None => {
                return PredictionResult {
                    best: None,
                    confidence: 0.0,
                    clusters: signals.clusters,
                    building_match: None,
                }
            }
        };

        let mut confidence = base_confidence(&best);
        let mut building_match = None;

        if let Some(snapper) = &self.snapper {
            if let Some(matched) = snapper.snap(best.point, self.config.snap_max_distance_m).await {
                debug!(
                    distance_m = matched.distance_m,
                    building = %matched.building_kind,
                    "snapped prediction to building footprint"
                );
                best.point = matched.geo;
                best.snapped = true;
                confidence = (confidence + SNAP_BONUS).min(CONFIDENCE_CAP);
                building_match = Some(matched);
            }
        }

        PredictionResult {
            best: Some(best),
            confidence,
            clusters: signals.clusters,
            building_match,
        }
    }
}

//! End-to-end pipeline scenarios with stubbed model ports

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use geo::{LineString, Polygon};
use geolens_core::config::GeoLensConfig;
use geolens_core::models::{
    CoarseGuess, CoarsePrediction, Embedding, EntryMetadata, GeoPoint, IndexEntry,
    PredictionMethod,
};
use geolens_core::Result;
use geolens_geo::{BuildingSnapper, Footprint, FootprintSource};
use geolens_index::ImageIndex;
use geolens_models::{CoarseLocator, RegionEmbedder};
use geolens_pipeline::HybridPredictor;

struct StubCoarse {
    prediction: CoarsePrediction,
    calls: AtomicUsize,
}

impl StubCoarse {
    fn new(lat: f64, lon: f64, confidence: f64) -> Self {
        let geo = GeoPoint::new(lat, lon);
        Self {
            prediction: CoarsePrediction {
                geo,
                confidence,
                top_k: vec![CoarseGuess { geo, confidence }],
            },
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CoarseLocator for StubCoarse {
    async fn predict(&self, _image: &[u8]) -> Result<CoarsePrediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.prediction.clone())
    }

    fn model_name(&self) -> &str {
        "stub-coarse"
    }
}

struct StubEmbedder {
    embedding: Embedding,
}

#[async_trait]
impl RegionEmbedder for StubEmbedder {
    async fn embed(&self, _image: &[u8]) -> Result<Embedding> {
        Ok(self.embedding.clone())
    }

    fn dimensions(&self) -> usize {
        self.embedding.dimension()
    }

    fn model_name(&self) -> &str {
        "stub-embedder"
    }
}

struct FixtureFootprints {
    footprints: Vec<Footprint>,
}

#[async_trait]
impl FootprintSource for FixtureFootprints {
    async fn fetch_area(&self, _center: GeoPoint, _radius_m: f64) -> Result<Vec<Footprint>> {
        Ok(self.footprints.clone())
    }
}

fn entry(lat: f64, lon: f64, vector: Vec<f32>, id: usize) -> IndexEntry {
    IndexEntry {
        embedding: Embedding::new(vector),
        metadata: EntryMetadata {
            geo: GeoPoint::new(lat, lon),
            source_id: format!("ref-{}", id),
            image_ref: format!("images/ref-{}.jpg", id),
        },
    }
}

fn square(lat: f64, lon: f64, side_deg: f64, osm_id: i64) -> Footprint {
    let half = side_deg / 2.0;
    Footprint {
        polygon: Polygon::new(
            LineString::from(vec![
                (lon - half, lat - half),
                (lon + half, lat - half),
                (lon + half, lat + half),
                (lon - half, lat + half),
                (lon - half, lat - half),
            ]),
            vec![],
        ),
        osm_id,
        kind: "residential".to_string(),
        name: "Casa Azul".to_string(),
        street: "Rua Augusta".to_string(),
        housenumber: "12".to_string(),
    }
}

#[tokio::test]
async fn scenario_no_signal_yields_empty_result() {
    // Embedder returns a zero vector and there is no coarse model: the
    // pipeline ends with nothing, which is a valid outcome
    let index = ImageIndex::build(vec![entry(38.71, -9.14, vec![1.0, 0.0], 1)]).unwrap();
    let predictor = HybridPredictor::new(GeoLensConfig::default())
        .with_embedder(Arc::new(StubEmbedder { embedding: Embedding::new(vec![0.0, 0.0]) }))
        .with_index(Arc::new(index));

    let result = predictor.predict(b"night-sky.jpg").await;
    assert!(result.best.is_none());
    assert_eq!(result.confidence, 0.0);
    assert!(result.clusters.is_empty());
}

#[tokio::test]
async fn scenario_confident_coarse_only() {
    let predictor = HybridPredictor::new(GeoLensConfig::default())
        .with_coarse_locator(Arc::new(StubCoarse::new(39.5, -8.0, 0.9)));

    let result = predictor.predict(b"landscape.jpg").await;
    let best = result.best.expect("a prediction");

    assert_eq!(best.method, PredictionMethod::Coarse);
    assert_eq!(best.point.lat, 39.5);
    assert_eq!(best.coarse_confidence, Some(0.9));
    assert!(!best.snapped);
    // 0.9 * 0.8
    assert_eq!(result.confidence, 0.72);
}

#[tokio::test]
async fn scenario_retrieval_consensus_beats_coarse() {
    // Four reference images in the same street, all scoring 0.8 against
    // the query, form a strong cluster that outranks a confident coarse
    let entries = vec![
        entry(38.7100, -9.1400, vec![0.8, 0.6], 1),
        entry(38.7102, -9.1401, vec![0.8, 0.6], 2),
        entry(38.7104, -9.1399, vec![0.8, 0.6], 3),
        entry(38.7101, -9.1402, vec![0.8, 0.6], 4),
    ];
    let index = ImageIndex::build(entries).unwrap();

    let predictor = HybridPredictor::new(GeoLensConfig::default())
        .with_coarse_locator(Arc::new(StubCoarse::new(41.0, -8.0, 0.95)))
        .with_embedder(Arc::new(StubEmbedder { embedding: Embedding::new(vec![1.0, 0.0]) }))
        .with_index(Arc::new(index));

    let result = predictor.predict(b"street.jpg").await;
    let best = result.best.expect("a prediction");

    assert_eq!(best.method, PredictionMethod::RetrievalCluster);
    assert_eq!(best.cluster_size, Some(4));
    // Centroid stays in the street, nowhere near the coarse guess
    assert!((best.point.lat - 38.7102).abs() < 0.001);
    // min(0.9, 0.5 + 0.8 * 0.4)
    assert_eq!(result.confidence, 0.82);
    assert_eq!(result.clusters.len(), 1);
}

#[tokio::test]
async fn scenario_consensus_with_building_snap() {
    let entries = vec![
        entry(38.7100, -9.1400, vec![0.8, 0.6], 1),
        entry(38.7102, -9.1401, vec![0.8, 0.6], 2),
        entry(38.7104, -9.1399, vec![0.8, 0.6], 3),
        entry(38.7101, -9.1402, vec![0.8, 0.6], 4),
    ];
    let index = ImageIndex::build(entries).unwrap();

    // A ~22 m square sitting right on the cluster centroid
    let source = Arc::new(FixtureFootprints {
        footprints: vec![square(38.7102, -9.1400, 0.0002, 4242)],
    });
    let cache_dir = tempfile::tempdir().unwrap();
    let snapper = BuildingSnapper::new(cache_dir.path(), source, 3763);

    let predictor = HybridPredictor::new(GeoLensConfig::default())
        .with_embedder(Arc::new(StubEmbedder { embedding: Embedding::new(vec![1.0, 0.0]) }))
        .with_index(Arc::new(index))
        .with_snapper(Arc::new(snapper));

    let result = predictor.predict(b"facade.jpg").await;
    let best = result.best.expect("a prediction");

    assert_eq!(best.method, PredictionMethod::RetrievalCluster);
    assert!(best.snapped);
    // 0.82 plus the snap bonus
    assert_eq!(result.confidence, 0.92);

    let matched = result.building_match.expect("a building match");
    assert_eq!(matched.source_id, 4242);
    assert_eq!(matched.building_kind, "residential");
    assert!((best.point.lat - 38.7102).abs() < 0.0005);
}

#[tokio::test]
async fn scenario_single_match_without_consensus() {
    // One reference image scoring 0.5: no cluster possible, the lone
    // match wins with reduced confidence
    let index =
        ImageIndex::build(vec![entry(41.15, -8.61, vec![0.5, 0.866_025_4], 1)]).unwrap();

    let predictor = HybridPredictor::new(GeoLensConfig::default())
        .with_embedder(Arc::new(StubEmbedder { embedding: Embedding::new(vec![1.0, 0.0]) }))
        .with_index(Arc::new(index));

    let result = predictor.predict(b"plaza.jpg").await;
    let best = result.best.expect("a prediction");

    assert_eq!(best.method, PredictionMethod::SingleRetrieval);
    assert_eq!(best.point.lat, 41.15);
    // 0.5 * 0.6
    assert_eq!(result.confidence, 0.3);
    assert!(result.clusters.is_empty());
}

#[tokio::test]
async fn scenario_weak_coarse_is_last_resort() {
    let predictor = HybridPredictor::new(GeoLensConfig::default())
        .with_coarse_locator(Arc::new(StubCoarse::new(39.0, -8.5, 0.4)));

    let result = predictor.predict(b"blurry.jpg").await;
    let best = result.best.expect("a prediction");

    assert_eq!(best.method, PredictionMethod::CoarseFallback);
    assert_eq!(result.confidence, 0.3);
}

#[tokio::test]
async fn scenario_repeat_request_is_served_from_cache() {
    let data_dir = tempfile::tempdir().unwrap();
    let mut config = GeoLensConfig::default();
    config.data_dir = data_dir.path().to_path_buf();

    let coarse = Arc::new(StubCoarse::new(39.5, -8.0, 0.9));
    let predictor = HybridPredictor::new(config)
        .with_coarse_locator(coarse.clone())
        .with_cache();

    let first = predictor.predict(b"repeated.jpg").await;
    let second = predictor.predict(b"repeated.jpg").await;

    assert_eq!(coarse.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.confidence, second.confidence);
    assert_eq!(
        first.best.as_ref().map(|b| b.method),
        second.best.as_ref().map(|b| b.method)
    );

    // A different image is a different key and runs the pipeline again
    predictor.predict(b"another.jpg").await;
    assert_eq!(coarse.calls.load(Ordering::SeqCst), 2);
}

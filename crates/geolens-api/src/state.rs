use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use geolens_core::config::GeoLensConfig;
use geolens_core::GeoLensError;
use geolens_geo::{BuildingSnapper, OverpassClient};
use geolens_index::{persist, ImageIndex};
use geolens_models::{RemoteCoarseLocator, RemoteRegionEmbedder};
use geolens_pipeline::{FeedbackLog, HybridPredictor};

/// Shared application state, fully constructed at startup.
///
/// All signal sources are wired here, exactly once; handlers only ever
/// see the finished predictor. A broken index artifact pair aborts
/// startup, while a completely absent index starts the service in
/// coarse-only mode.
pub struct AppState {
    pub predictor: HybridPredictor,
    pub feedback: FeedbackLog,
    pub started_at: DateTime<Utc>,
    pub index_entries: usize,
    pub index_partitioned: bool,
    pub inference_attached: bool,
}

impl AppState {
    pub fn initialize(config: GeoLensConfig) -> anyhow::Result<Self> {
        let index = Self::load_index(&config)?;
        let (index_entries, index_partitioned) = match &index {
            Some(index) => (index.len(), index.is_partitioned()),
            None => (0, false),
        };

        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let request_timeout = Duration::from_secs(config.request_timeout_secs);

        let overpass = OverpassClient::new(&config.overpass_url, connect_timeout, request_timeout)
            .context("building footprint client")?;
        let snapper = BuildingSnapper::new(
            config.footprint_cache_dir(),
            Arc::new(overpass),
            config.region.planar_epsg,
        );

        let feedback = FeedbackLog::new(config.feedback_path());
        let inference_attached = config.inference_url.is_some();

        let mut predictor = HybridPredictor::new(config.clone())
            .with_snapper(Arc::new(snapper))
            .with_cache();

        if let Some(index) = index {
            predictor = predictor.with_index(Arc::new(index));
        }

        if let Some(base_url) = &config.inference_url {
            let coarse = RemoteCoarseLocator::new(
                base_url,
                "streetclip-coarse",
                config.region.center,
                connect_timeout,
                request_timeout,
            )
            .context("building coarse locator client")?;
            let embedder = RemoteRegionEmbedder::new(
                base_url,
                "portugal-streetclip",
                config.embedding_dim,
                connect_timeout,
                request_timeout,
            )
            .context("building embedder client")?;

            predictor = predictor
                .with_coarse_locator(Arc::new(coarse))
                .with_embedder(Arc::new(embedder));
        } else {
            tracing::warn!(
                "GEOLENS_INFERENCE_URL not set, serving without coarse or retrieval signals"
            );
        }

        Ok(Self {
            predictor,
            feedback,
            started_at: Utc::now(),
            index_entries,
            index_partitioned,
            inference_attached,
        })
    }

    /// Load the index artifact pair. Both files absent means a fresh
    /// deployment with no reference corpus; a half-present or internally
    /// inconsistent pair is a fatal misconfiguration.
    fn load_index(config: &GeoLensConfig) -> anyhow::Result<Option<ImageIndex>> {
        let index_path = config.index_path();
        let metadata_path = config.metadata_path();

        if !index_path.exists() && !metadata_path.exists() {
            tracing::warn!(
                path = %index_path.display(),
                "no retrieval index found, starting without similarity search"
            );
            return Ok(None);
        }

        match persist::load(&index_path, &metadata_path) {
            Ok(index) => {
                tracing::info!(
                    entries = index.len(),
                    partitioned = index.is_partitioned(),
                    "retrieval index loaded"
                );
                Ok(Some(index))
            }
            Err(e @ GeoLensError::IndexArtifactMissing { .. })
            | Err(e @ GeoLensError::IndexMetadataMismatch { .. }) => Err(anyhow::anyhow!(e)
                .context("index artifacts are inconsistent, rebuild with `geolens build`")),
            Err(e) => Err(anyhow::anyhow!(e).context("loading retrieval index")),
        }
    }
}

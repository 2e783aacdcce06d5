//! Pipeline and region configuration
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `GEOLENS_*` environment variables. Invalid environment values are
//! warned about and ignored rather than failing startup.

use crate::error::{GeoLensError, Result};
use crate::models::{BoundingBox, GeoPoint};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// The bounded target region predictions are constrained to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,

    /// Fallback center when no model signal is available
    pub center: GeoPoint,

    /// Accepted predictions must fall inside this box
    pub bbox: BoundingBox,

    /// Locally accurate meter-based CRS for distance computations
    pub planar_epsg: u32,
}

impl RegionConfig {
    /// Mainland Portugal (EPSG:3763, PT-TM06/ETRS89)
    pub fn portugal() -> Self {
        Self {
            name: "portugal".to_string(),
            center: GeoPoint::new(38.7223, -9.1393),
            bbox: BoundingBox::new(36.8, -9.6, 42.2, -6.1),
            planar_epsg: 3763,
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self::portugal()
    }
}

/// Full GeoLens configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLensConfig {
    #[serde(default)]
    pub region: RegionConfig,

    /// Number of nearest neighbors retrieved per query
    pub retrieval_top_k: usize,

    /// Neighborhood radius for candidate clustering, in kilometers
    pub cluster_radius_km: f64,

    /// Minimum members for a dense cluster
    pub min_cluster_size: usize,

    /// Maximum snap distance to a building footprint, in meters
    pub snap_max_distance_m: f64,

    /// Result cache time-to-live, in hours
    pub result_ttl_hours: i64,

    /// Expected embedding dimension
    pub embedding_dim: usize,

    /// Root directory for index artifacts, caches, and the feedback log
    pub data_dir: PathBuf,

    /// Overpass-style footprint service endpoint
    pub overpass_url: String,

    /// Inference sidecar base URL for the coarse locator and region embedder
    pub inference_url: Option<String>,

    /// Connect timeout for external HTTP calls, in seconds
    pub connect_timeout_secs: u64,

    /// Request timeout for external HTTP calls, in seconds
    pub request_timeout_secs: u64,
}

impl Default for GeoLensConfig {
    fn default() -> Self {
        Self {
            region: RegionConfig::portugal(),
            retrieval_top_k: 20,
            cluster_radius_km: 0.5,
            min_cluster_size: 2,
            snap_max_distance_m: 150.0,
            result_ttl_hours: 24,
            embedding_dim: 768,
            data_dir: PathBuf::from("data"),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            inference_url: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
        }
    }
}

impl GeoLensConfig {
    /// Load configuration: defaults, overridden by an optional TOML file,
    /// overridden by environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a TOML file, with defaults for absent keys
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| GeoLensError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeoLensError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        let mut config = Self::default();
        file_config.apply(&mut config);
        Ok(config)
    }

    /// Apply `GEOLENS_*` environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(dir) = env::var("GEOLENS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(url) = env::var("GEOLENS_OVERPASS_URL") {
            self.overpass_url = url;
        }

        if let Ok(url) = env::var("GEOLENS_INFERENCE_URL") {
            self.inference_url = Some(url);
        }

        if let Ok(top_k) = env::var("GEOLENS_RETRIEVAL_TOP_K") {
            match top_k.parse::<usize>() {
                Ok(k) if k > 0 => self.retrieval_top_k = k,
                _ => tracing::warn!(
                    "Invalid GEOLENS_RETRIEVAL_TOP_K value '{}': expected positive integer",
                    top_k
                ),
            }
        }

        if let Ok(dist) = env::var("GEOLENS_SNAP_MAX_DISTANCE_M") {
            match dist.parse::<f64>() {
                Ok(d) if d > 0.0 => self.snap_max_distance_m = d,
                _ => tracing::warn!(
                    "Invalid GEOLENS_SNAP_MAX_DISTANCE_M value '{}': expected positive number",
                    dist
                ),
            }
        }

        if let Ok(ttl) = env::var("GEOLENS_RESULT_TTL_HOURS") {
            match ttl.parse::<i64>() {
                Ok(h) if h > 0 => self.result_ttl_hours = h,
                _ => tracing::warn!(
                    "Invalid GEOLENS_RESULT_TTL_HOURS value '{}': expected positive integer",
                    ttl
                ),
            }
        }
    }

    /// Path of the serialized index structure artifact
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("indexes").join("region.index.json")
    }

    /// Path of the parallel metadata records artifact
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("indexes").join("region.meta.json")
    }

    pub fn footprint_cache_dir(&self) -> PathBuf {
        self.data_dir.join("gis_cache")
    }

    pub fn result_cache_dir(&self) -> PathBuf {
        self.data_dir.join("result_cache")
    }

    pub fn feedback_path(&self) -> PathBuf {
        self.data_dir.join("feedback").join("corrections.jsonl")
    }
}

/// Partial configuration as read from TOML
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    region: Option<RegionConfig>,
    retrieval_top_k: Option<usize>,
    cluster_radius_km: Option<f64>,
    min_cluster_size: Option<usize>,
    snap_max_distance_m: Option<f64>,
    result_ttl_hours: Option<i64>,
    embedding_dim: Option<usize>,
    data_dir: Option<PathBuf>,
    overpass_url: Option<String>,
    inference_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl FileConfig {
    fn apply(self, config: &mut GeoLensConfig) {
        if let Some(region) = self.region {
            config.region = region;
        }
        if let Some(v) = self.retrieval_top_k {
            config.retrieval_top_k = v;
        }
        if let Some(v) = self.cluster_radius_km {
            config.cluster_radius_km = v;
        }
        if let Some(v) = self.min_cluster_size {
            config.min_cluster_size = v;
        }
        if let Some(v) = self.snap_max_distance_m {
            config.snap_max_distance_m = v;
        }
        if let Some(v) = self.result_ttl_hours {
            config.result_ttl_hours = v;
        }
        if let Some(v) = self.embedding_dim {
            config.embedding_dim = v;
        }
        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.overpass_url {
            config.overpass_url = v;
        }
        if let Some(v) = self.inference_url {
            config.inference_url = Some(v);
        }
        if let Some(v) = self.connect_timeout_secs {
            config.connect_timeout_secs = v;
        }
        if let Some(v) = self.request_timeout_secs {
            config.request_timeout_secs = v;
        }
    }
}

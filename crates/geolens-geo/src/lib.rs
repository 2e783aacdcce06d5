//! GeoLens Geo - footprint data, planar projection, and building snapping
//!
//! Distance thresholds are always evaluated in a locally accurate planar
//! (meter-based) CRS for the target region, never in geographic degrees.
//! Footprint centroids are computed in geographic coordinates to avoid
//! reprojection distortion of the shapes.

pub mod footprint;
pub mod overpass;
pub mod projection;
pub mod snapper;

pub use footprint::Footprint;
pub use overpass::OverpassClient;
pub use snapper::{BuildingSnapper, FootprintSource};

//! Building footprint representation and GeoJSON cell cache format

use geo::algorithm::centroid::Centroid;
use geo::Polygon;
use geojson::{Feature, FeatureCollection, GeoJson};
use geolens_core::error::{GeoLensError, Result};
use geolens_core::models::GeoPoint;
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::path::Path;

/// One building footprint in geographic (WGS 84) coordinates
#[derive(Debug, Clone)]
pub struct Footprint {
    pub polygon: Polygon<f64>,
    pub osm_id: i64,
    pub kind: String,
    pub name: String,
    pub street: String,
    pub housenumber: String,
}

impl Footprint {
    /// Centroid in the original geographic projection
    pub fn centroid(&self) -> Option<GeoPoint> {
        self.polygon.centroid().map(|p| GeoPoint::new(p.y(), p.x()))
    }

    /// Best-effort street + number hint, may be empty
    pub fn address_hint(&self) -> String {
        format!("{} {}", self.street, self.housenumber).trim().to_string()
    }

    fn to_feature(&self) -> Feature {
        let mut properties = Map::new();
        properties.insert("osm_id".to_string(), JsonValue::from(self.osm_id));
        properties.insert("building".to_string(), JsonValue::from(self.kind.clone()));
        properties.insert("name".to_string(), JsonValue::from(self.name.clone()));
        properties.insert("addr_street".to_string(), JsonValue::from(self.street.clone()));
        properties.insert("addr_number".to_string(), JsonValue::from(self.housenumber.clone()));

        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.polygon))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }

    fn from_feature(feature: &Feature) -> Option<Self> {
        let geometry = feature.geometry.as_ref()?;
        let polygon = Polygon::<f64>::try_from(geometry.value.clone()).ok()?;

        let get_str = |key: &str| -> String {
            feature
                .properties
                .as_ref()
                .and_then(|p| p.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let osm_id = feature
            .properties
            .as_ref()
            .and_then(|p| p.get("osm_id"))
            .and_then(|v| v.as_i64())
            .unwrap_or_default();

        Some(Self {
            polygon,
            osm_id,
            kind: get_str("building"),
            name: get_str("name"),
            street: get_str("addr_street"),
            housenumber: get_str("addr_number"),
        })
    }
}

/// Serialize footprints as a GeoJSON FeatureCollection string
pub fn to_geojson_string(footprints: &[Footprint]) -> Result<String> {
    let collection = FeatureCollection {
        bbox: None,
        features: footprints.iter().map(Footprint::to_feature).collect(),
        foreign_members: None,
    };
    serde_json::to_string(&GeoJson::FeatureCollection(collection))
        .map_err(|e| GeoLensError::Serialization(e.to_string()))
}

/// Read a cached FeatureCollection file back into footprints.
/// Features that fail to parse are skipped rather than failing the cell.
pub fn read_geojson(path: &Path) -> Result<Vec<Footprint>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content
        .parse()
        .map_err(|e| GeoLensError::Serialization(format!("footprint cache: {}", e)))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(GeoLensError::Serialization(
                "footprint cache: expected FeatureCollection".to_string(),
            ))
        }
    };

    Ok(collection.features.iter().filter_map(Footprint::from_feature).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    pub(crate) fn square_footprint(lat: f64, lon: f64, side_deg: f64, osm_id: i64) -> Footprint {
        Footprint {
            polygon: Polygon::new(
                LineString::from(vec![
                    (lon, lat),
                    (lon + side_deg, lat),
                    (lon + side_deg, lat + side_deg),
                    (lon, lat + side_deg),
                    (lon, lat),
                ]),
                vec![],
            ),
            osm_id,
            kind: "residential".to_string(),
            name: String::new(),
            street: "Rua Augusta".to_string(),
            housenumber: "12".to_string(),
        }
    }

    #[test]
    fn test_centroid_inside_square() {
        let footprint = square_footprint(38.710, -9.140, 0.001, 1);
        let centroid = footprint.centroid().unwrap();
        assert!((centroid.lat - 38.7105).abs() < 1e-6);
        assert!((centroid.lon - (-9.1395)).abs() < 1e-6);
    }

    #[test]
    fn test_address_hint_trims_empty_parts() {
        let mut footprint = square_footprint(38.710, -9.140, 0.001, 1);
        assert_eq!(footprint.address_hint(), "Rua Augusta 12");

        footprint.street = String::new();
        footprint.housenumber = String::new();
        assert_eq!(footprint.address_hint(), "");
    }

    #[test]
    fn test_geojson_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildings_38.710_-9.140_300.geojson");

        let footprints =
            vec![square_footprint(38.710, -9.140, 0.001, 1), square_footprint(38.712, -9.141, 0.001, 2)];
        fs::write(&path, to_geojson_string(&footprints).unwrap()).unwrap();

        let loaded = read_geojson(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].osm_id, 1);
        assert_eq!(loaded[0].street, "Rua Augusta");
        assert_eq!(loaded[1].osm_id, 2);
    }
}

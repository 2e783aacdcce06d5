//! Overpass API client for building footprints
//!
//! The footprint provider is an untrusted, possibly slow external
//! dependency. All failures here are converted to `FootprintFetch` errors
//! that the snapper degrades to "no snap".

use async_trait::async_trait;
use geo::{LineString, Polygon};
use geolens_core::error::{GeoLensError, Result};
use geolens_core::models::GeoPoint;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::footprint::Footprint;
use crate::snapper::FootprintSource;

pub struct OverpassClient {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    nodes: Option<Vec<i64>>,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

impl OverpassClient {
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| GeoLensError::FootprintFetch {
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { endpoint: endpoint.into(), client })
    }

    fn build_query(center: &GeoPoint, radius_m: f64) -> String {
        format!(
            "[out:json][timeout:30];\n\
             (\n\
               way[\"building\"](around:{radius},{lat},{lon});\n\
               relation[\"building\"](around:{radius},{lat},{lon});\n\
             );\n\
             out body;\n\
             >;\n\
             out skel qt;",
            radius = radius_m as i64,
            lat = center.lat,
            lon = center.lon,
        )
    }

    /// Assemble closed ways into polygons using the node coordinate table
    fn parse_response(response: OverpassResponse) -> Vec<Footprint> {
        let mut nodes: HashMap<i64, (f64, f64)> = HashMap::new();
        for element in &response.elements {
            if element.kind == "node" {
                if let (Some(lat), Some(lon)) = (element.lat, element.lon) {
                    nodes.insert(element.id, (lon, lat));
                }
            }
        }

        let mut footprints = Vec::new();
        for element in &response.elements {
            if element.kind != "way" {
                continue;
            }
            let Some(node_ids) = &element.nodes else {
                continue;
            };

            let coords: Vec<(f64, f64)> =
                node_ids.iter().filter_map(|id| nodes.get(id).copied()).collect();

            // A valid ring needs at least 4 points with first == last
            if coords.len() < 4 || coords.first() != coords.last() {
                continue;
            }

            let tag = |key: &str| -> String {
                element
                    .tags
                    .as_ref()
                    .and_then(|t| t.get(key))
                    .cloned()
                    .unwrap_or_default()
            };

            footprints.push(Footprint {
                polygon: Polygon::new(LineString::from(coords), vec![]),
                osm_id: element.id,
                kind: {
                    let k = tag("building");
                    if k.is_empty() { "yes".to_string() } else { k }
                },
                name: tag("name"),
                street: tag("addr:street"),
                housenumber: tag("addr:housenumber"),
            });
        }

        footprints
    }
}

#[async_trait]
impl FootprintSource for OverpassClient {
    async fn fetch_area(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<Footprint>> {
        let query = Self::build_query(&center, radius_m);

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| GeoLensError::FootprintFetch { reason: e.to_string() })?
            .error_for_status()
            .map_err(|e| GeoLensError::FootprintFetch { reason: e.to_string() })?;

        let parsed: OverpassResponse = response
            .json()
            .await
            .map_err(|e| GeoLensError::FootprintFetch { reason: format!("malformed response: {}", e) })?;

        let footprints = Self::parse_response(parsed);
        tracing::debug!(
            lat = center.lat,
            lon = center.lon,
            radius_m = radius_m,
            buildings = footprints.len(),
            "Fetched footprints from Overpass"
        );
        Ok(footprints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, lat: f64, lon: f64) -> OverpassElement {
        OverpassElement { kind: "node".to_string(), id, lat: Some(lat), lon: Some(lon), nodes: None, tags: None }
    }

    #[test]
    fn test_query_mentions_radius_and_center() {
        let query = OverpassClient::build_query(&GeoPoint::new(38.7223, -9.1393), 300.0);
        assert!(query.contains("around:300,38.7223,-9.1393"));
        assert!(query.contains("way[\"building\"]"));
    }

    #[test]
    fn test_parse_closed_way_into_footprint() {
        let mut tags = HashMap::new();
        tags.insert("building".to_string(), "apartments".to_string());
        tags.insert("addr:street".to_string(), "Rua do Ouro".to_string());

        let response = OverpassResponse {
            elements: vec![
                node(1, 38.710, -9.140),
                node(2, 38.710, -9.139),
                node(3, 38.711, -9.139),
                node(4, 38.711, -9.140),
                OverpassElement {
                    kind: "way".to_string(),
                    id: 100,
                    lat: None,
                    lon: None,
                    nodes: Some(vec![1, 2, 3, 4, 1]),
                    tags: Some(tags),
                },
            ],
        };

        let footprints = OverpassClient::parse_response(response);
        assert_eq!(footprints.len(), 1);
        assert_eq!(footprints[0].osm_id, 100);
        assert_eq!(footprints[0].kind, "apartments");
        assert_eq!(footprints[0].street, "Rua do Ouro");
    }

    #[test]
    fn test_open_way_discarded() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 38.710, -9.140),
                node(2, 38.710, -9.139),
                node(3, 38.711, -9.139),
                OverpassElement {
                    kind: "way".to_string(),
                    id: 100,
                    lat: None,
                    lon: None,
                    nodes: Some(vec![1, 2, 3]),
                    tags: None,
                },
            ],
        };

        assert!(OverpassClient::parse_response(response).is_empty());
    }

    #[test]
    fn test_way_with_missing_nodes_discarded() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 38.710, -9.140),
                OverpassElement {
                    kind: "way".to_string(),
                    id: 100,
                    lat: None,
                    lon: None,
                    nodes: Some(vec![1, 2, 3, 4, 1]),
                    tags: None,
                },
            ],
        };

        assert!(OverpassClient::parse_response(response).is_empty());
    }

    #[test]
    fn test_missing_building_tag_defaults_to_yes() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 38.710, -9.140),
                node(2, 38.710, -9.139),
                node(3, 38.711, -9.139),
                node(4, 38.711, -9.140),
                OverpassElement {
                    kind: "way".to_string(),
                    id: 100,
                    lat: None,
                    lon: None,
                    nodes: Some(vec![1, 2, 3, 4, 1]),
                    tags: None,
                },
            ],
        };

        let footprints = OverpassClient::parse_response(response);
        assert_eq!(footprints[0].kind, "yes");
    }
}

//! WGS 84 to regional planar CRS reprojection

use geo::{Coord, LineString, Point, Polygon};
use geolens_core::error::{GeoLensError, Result};
use geolens_core::models::GeoPoint;
use proj::Proj;

/// Build a projection from geographic WGS 84 into the given planar CRS.
/// PROJ handles are cheap to create and are not shared across threads.
pub fn planar_projection(epsg: u32) -> Result<Proj> {
    Proj::new_known_crs("EPSG:4326", &format!("EPSG:{}", epsg), None).map_err(|e| {
        GeoLensError::Projection { epsg, reason: format!("Failed to create projection: {}", e) }
    })
}

/// Project a geographic point into planar coordinates
pub fn project_point(proj: &Proj, point: &GeoPoint, epsg: u32) -> Result<Point<f64>> {
    let (x, y) = proj
        .convert((point.lon, point.lat))
        .map_err(|e| GeoLensError::Projection { epsg, reason: format!("Projection failed: {}", e) })?;
    Ok(Point::new(x, y))
}

/// Project a geographic polygon into planar coordinates
pub fn project_polygon(proj: &Proj, polygon: &Polygon<f64>, epsg: u32) -> Result<Polygon<f64>> {
    let project_ring = |ring: &LineString<f64>| -> Result<LineString<f64>> {
        let coords: Result<Vec<Coord<f64>>> = ring
            .0
            .iter()
            .map(|coord| {
                proj.convert((coord.x, coord.y)).map(|(x, y)| Coord { x, y }).map_err(|e| {
                    GeoLensError::Projection { epsg, reason: format!("Projection failed: {}", e) }
                })
            })
            .collect();
        Ok(LineString::from(coords?))
    };

    let exterior = project_ring(polygon.exterior())?;
    let interiors: Result<Vec<LineString<f64>>> =
        polygon.interiors().iter().map(project_ring).collect();

    Ok(Polygon::new(exterior, interiors?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portugal_projection_is_metric() {
        let proj = planar_projection(3763).unwrap();

        // Two points ~1.1 km apart near Lisbon
        let a = project_point(&proj, &GeoPoint::new(38.7223, -9.1393), 3763).unwrap();
        let b = project_point(&proj, &GeoPoint::new(38.7223, -9.1267), 3763).unwrap();

        let dx = b.x() - a.x();
        let dy = b.y() - a.y();
        let distance = (dx * dx + dy * dy).sqrt();
        assert!((900.0..1300.0).contains(&distance), "distance was {}", distance);
    }

    #[test]
    fn test_unknown_epsg_fails() {
        assert!(planar_projection(999_999).is_err());
    }
}

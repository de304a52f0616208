//! Centroids and areas computed in projected (metric) space.

use commute_burden_geography_models::UtmZone;
use geo::{Area, Centroid, MultiPolygon, Point};

use crate::projection::{project_multipolygon, unproject_point};

const SQ_METRES_PER_SQ_KM: f64 = 1_000_000.0;

/// Centroid of a WGS84 geometry, taken in `zone` and returned in WGS84.
///
/// Returns `None` for empty geometries.
#[must_use]
pub fn projected_centroid(geometry: &MultiPolygon<f64>, zone: UtmZone) -> Option<Point<f64>> {
    if geometry.0.is_empty() {
        return None;
    }
    let centroid = project_multipolygon(geometry, zone).centroid()?;
    let point = unproject_point(centroid, zone);
    (point.x().is_finite() && point.y().is_finite()).then_some(point)
}

/// Planar area of a WGS84 geometry in `zone`, in square kilometres.
#[must_use]
pub fn area_km2(geometry: &MultiPolygon<f64>, zone: UtmZone) -> f64 {
    project_multipolygon(geometry, zone).unsigned_area() / SQ_METRES_PER_SQ_KM
}

#[cfg(test)]
mod tests {
    use geo::{LineString, Polygon};

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (x0, y0),
                (x0 + size, y0),
                (x0 + size, y0 + size),
                (x0, y0 + size),
                (x0, y0),
            ]),
            vec![],
        )])
    }

    fn zone12() -> UtmZone {
        UtmZone::from_epsg(32612).unwrap()
    }

    #[test]
    fn small_equatorial_square_area() {
        let area = area_km2(&square(-111.005, 0.0, 0.01), zone12());
        assert!((area - 1.23).abs() < 0.015, "area={area}");
    }

    #[test]
    fn centroid_of_square_is_near_its_middle() {
        let c = projected_centroid(&square(-112.1, 33.4, 0.1), zone12()).unwrap();
        assert!((c.x() - -112.05).abs() < 1e-3, "x={}", c.x());
        assert!((c.y() - 33.45).abs() < 1e-3, "y={}", c.y());
    }

    #[test]
    fn empty_geometry_has_no_centroid_and_zero_area() {
        let empty = MultiPolygon::<f64>(vec![]);
        assert!(projected_centroid(&empty, zone12()).is_none());
        assert!(area_km2(&empty, zone12()).abs() < f64::EPSILON);
    }
}

//! Transverse Mercator projection between WGS84 and a UTM zone.
//!
//! Snyder's series expansion (USGS Professional Paper 1395), accurate to
//! well under a metre within a zone. Coordinates are `(lon, lat)` in
//! degrees on the geographic side and `(easting, northing)` in metres on
//! the projected side.

#![allow(clippy::many_single_char_names, clippy::suboptimal_flops)]

use commute_burden_geography_models::UtmZone;
use geo::{Coord, MapCoords, MultiPolygon, Point};

/// WGS84 ellipsoid.
pub struct Wgs84;

impl Wgs84 {
    /// Semi-major axis in metres.
    pub const A: f64 = 6_378_137.0;

    /// Flattening.
    pub const F: f64 = 1.0 / 298.257_223_563;

    /// First eccentricity squared.
    pub const E2: f64 = 2.0 * Self::F - Self::F * Self::F;

    /// Second eccentricity squared.
    pub const EP2: f64 = Self::E2 / (1.0 - Self::E2);
}

/// Scale factor on the central meridian.
pub const K0: f64 = 0.9996;

/// False easting applied to every zone.
pub const FALSE_EASTING: f64 = 500_000.0;

/// False northing applied to southern-hemisphere zones.
pub const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

const fn false_northing(zone: UtmZone) -> f64 {
    if zone.south { FALSE_NORTHING_SOUTH } else { 0.0 }
}

/// Meridian arc length from the equator to latitude `phi` (radians).
fn meridian_arc(phi: f64) -> f64 {
    let e2 = Wgs84::E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    Wgs84::A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Projects a WGS84 `(lon, lat)` coordinate into `zone`.
#[must_use]
pub fn to_utm(coord: Coord<f64>, zone: UtmZone) -> Coord<f64> {
    let ep2 = Wgs84::EP2;

    let phi = coord.y.to_radians();
    let lambda = coord.x.to_radians();
    let lambda0 = zone.central_meridian().to_radians();

    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();

    let n = Wgs84::A / (1.0 - Wgs84::E2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = (lambda - lambda0) * cos_phi;
    let m = meridian_arc(phi);

    let x = K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + FALSE_EASTING;

    let y = K0
        * (m + n
            * tan_phi
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0))
        + false_northing(zone);

    Coord { x, y }
}

/// Converts a projected `(easting, northing)` in `zone` back to WGS84.
#[must_use]
pub fn from_utm(coord: Coord<f64>, zone: UtmZone) -> Coord<f64> {
    let a = Wgs84::A;
    let e2 = Wgs84::E2;
    let ep2 = Wgs84::EP2;

    let x = coord.x - FALSE_EASTING;
    let y = coord.y - false_northing(zone);
    let lambda0 = zone.central_meridian().to_radians();

    let m = y / K0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let tan_phi1 = phi1.tan();

    let n1 = a / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
    let t1 = tan_phi1.powi(2);
    let c1 = ep2 * cos_phi1.powi(2);
    let r1 = a * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
    let d = x / (n1 * K0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2)
                    - 252.0 * ep2
                    - 3.0 * c1.powi(2))
                    * d.powi(6)
                    / 720.0);

    let lon = lambda0
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
                * d.powi(5)
                / 120.0)
            / cos_phi1;

    Coord {
        x: lon.to_degrees(),
        y: lat.to_degrees(),
    }
}

/// Projects every vertex of a WGS84 multipolygon into `zone`.
#[must_use]
pub fn project_multipolygon(geometry: &MultiPolygon<f64>, zone: UtmZone) -> MultiPolygon<f64> {
    geometry.map_coords(|c| to_utm(c, zone))
}

/// Converts a projected point back to WGS84.
#[must_use]
pub fn unproject_point(point: Point<f64>, zone: UtmZone) -> Point<f64> {
    Point(from_utm(point.0, zone))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(epsg: u32) -> UtmZone {
        UtmZone::from_epsg(epsg).unwrap()
    }

    #[test]
    fn central_meridian_on_equator_is_false_origin() {
        let p = to_utm(Coord { x: -111.0, y: 0.0 }, zone(32612));
        assert!((p.x - 500_000.0).abs() < 1e-6, "x={}", p.x);
        assert!(p.y.abs() < 1e-6, "y={}", p.y);
    }

    #[test]
    fn phoenix_in_zone_12() {
        let p = to_utm(Coord { x: -112.074, y: 33.448 }, zone(32612));
        assert!((p.x - 400_000.0).abs() < 2_000.0, "x={}", p.x);
        assert!((p.y - 3_702_000.0).abs() < 5_000.0, "y={}", p.y);
    }

    #[test]
    fn southern_zone_adds_false_northing() {
        let p = to_utm(Coord { x: 15.0, y: -10.0 }, zone(32733));
        assert!(p.y > 8_000_000.0 && p.y < FALSE_NORTHING_SOUTH, "y={}", p.y);
    }

    #[test]
    fn forward_then_inverse_returns_input() {
        for (epsg, lon, lat) in [
            (32612, -112.074, 33.448),
            (32616, -90.049, 35.149),
            (32611, -118.243, 34.052),
            (32614, -96.797, 32.777),
            (32740, 55.45, -20.88),
        ] {
            let z = zone(epsg);
            let back = from_utm(to_utm(Coord { x: lon, y: lat }, z), z);
            assert!((back.x - lon).abs() < 5e-6, "lon {lon} -> {}", back.x);
            assert!((back.y - lat).abs() < 5e-6, "lat {lat} -> {}", back.y);
        }
    }

    #[test]
    fn inverse_matches_known_fix() {
        let geo = from_utm(Coord { x: 338_000.0, y: 7_691_000.0 }, zone(32740));
        assert!((geo.x - 55.45).abs() < 0.2, "lon={}", geo.x);
        assert!((geo.y - -20.88).abs() < 0.2, "lat={}", geo.y);
    }
}

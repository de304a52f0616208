//! Response-shape normalization for boundary services.
//!
//! `ArcGIS` endpoints answer in one of two feature shapes depending on
//! the `f=` parameter and server version:
//!
//! * Esri JSON: `{ "attributes": {...}, "geometry": { "rings": [...] } }`
//! * `GeoJSON`: `{ "properties": {...}, "geometry": { "type": ..., "coordinates": ... } }`
//!
//! [`FeatureShape::classify`] tags a raw feature with the shape it has and
//! [`normalize_feature`] turns either into one [`BoundaryFeature`].

use std::collections::BTreeMap;

use commute_burden_geography_models::{BoundaryFeature, fips::zero_pad};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::GeoJson;
use serde_json::{Map, Value};

/// A raw feature tagged with the response shape it arrived in.
#[derive(Debug, Clone, Copy)]
pub enum FeatureShape<'a> {
    /// Esri JSON feature.
    Esri {
        attributes: &'a Map<String, Value>,
        geometry: Option<&'a Value>,
    },
    /// `GeoJSON` feature.
    GeoJson {
        properties: &'a Map<String, Value>,
        geometry: Option<&'a Value>,
    },
}

impl<'a> FeatureShape<'a> {
    /// Tags a raw feature. Returns `None` if it has neither an
    /// `attributes` nor a `properties` object.
    #[must_use]
    pub fn classify(feature: &'a Value) -> Option<Self> {
        let geometry = feature.get("geometry").filter(|g| !g.is_null());

        if let Some(attributes) = feature.get("attributes").and_then(Value::as_object) {
            return Some(Self::Esri {
                attributes,
                geometry,
            });
        }

        feature
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| Self::GeoJson {
                properties,
                geometry,
            })
    }

    /// The attribute map, whichever shape it came in.
    #[must_use]
    pub const fn attributes(&self) -> &'a Map<String, Value> {
        match *self {
            Self::Esri { attributes, .. } => attributes,
            Self::GeoJson { properties, .. } => properties,
        }
    }

    /// Converts the geometry to a WGS84 [`MultiPolygon`].
    ///
    /// Returns `None` for missing, non-areal or malformed geometry.
    #[must_use]
    pub fn multipolygon(&self) -> Option<MultiPolygon<f64>> {
        match *self {
            Self::Esri { geometry, .. } => esri_rings_to_multipolygon(geometry?),
            Self::GeoJson { geometry, .. } => geojson_to_multipolygon(geometry?),
        }
    }
}

/// Reads an identifier attribute as a string. Numeric ids are accepted
/// because some layers type code columns as integers.
fn id_attribute(attributes: &Map<String, Value>, field: &str) -> Option<String> {
    match attributes.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalizes one raw feature into a [`BoundaryFeature`].
///
/// The id is read from `id_field` and zero-padded to `id_width`. Features
/// with no id or no usable polygon geometry yield `None`.
#[must_use]
pub fn normalize_feature(feature: &Value, id_field: &str, id_width: usize) -> Option<BoundaryFeature> {
    let shape = FeatureShape::classify(feature)?;
    let attributes = shape.attributes();
    let id = zero_pad(&id_attribute(attributes, id_field)?, id_width);
    let geometry = shape.multipolygon()?;

    Some(BoundaryFeature {
        id,
        attributes: attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
        geometry,
    })
}

/// Converts a `GeoJSON` geometry object to a [`MultiPolygon`].
#[must_use]
pub fn geojson_to_multipolygon(geometry: &Value) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = serde_json::to_string(geometry).ok()?.parse().ok()?;
    if let GeoJson::Geometry(geom) = geojson {
        let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
        match geo_geom {
            geo::Geometry::MultiPolygon(mp) => Some(mp),
            geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
            _ => None,
        }
    } else {
        None
    }
}

/// Converts Esri JSON geometry (`{ "rings": [...] }`) to a [`MultiPolygon`].
///
/// Esri rings are oriented: clockwise rings are exteriors and
/// counter-clockwise rings are holes of the exterior before them.
#[must_use]
pub fn esri_rings_to_multipolygon(geometry: &Value) -> Option<MultiPolygon<f64>> {
    let rings = geometry.get("rings")?.as_array()?;
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for ring in rings {
        let coords = ring
            .as_array()?
            .iter()
            .map(|pt| {
                let pair = pt.as_array()?;
                Some(Coord {
                    x: pair.first()?.as_f64()?,
                    y: pair.get(1)?.as_f64()?,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        if coords.len() < 4 {
            continue;
        }

        let line = LineString::new(coords);
        let is_hole = signed_ring_area(&line) > 0.0;
        match polygons.last_mut() {
            Some((_, holes)) if is_hole => holes.push(line),
            _ => polygons.push((line, Vec::new())),
        }
    }

    if polygons.is_empty() {
        return None;
    }

    Some(MultiPolygon(
        polygons
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    ))
}

/// Shoelace signed area. Positive for counter-clockwise rings.
fn signed_ring_area(ring: &LineString<f64>) -> f64 {
    ring.lines()
        .map(|l| l.start.x.mul_add(l.end.y, -(l.end.x * l.start.y)))
        .sum::<f64>()
        / 2.0
}

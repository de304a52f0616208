//! Centroid-containment join between tracts, reporting areas and the
//! metro boundary.

use std::collections::{BTreeMap, BTreeSet};

use commute_burden_geography_models::{BoundaryFeature, UtmZone};
use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};

use crate::measure::projected_centroid;

/// A reporting-area polygon stored in the R-tree with its identifier.
struct AreaEntry {
    id: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for AreaEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over reporting-area envelopes for point-in-polygon lookups.
pub struct AreaIndex {
    tree: RTree<AreaEntry>,
}

impl AreaIndex {
    /// Builds the index. Areas with empty geometry are skipped.
    #[must_use]
    pub fn build(areas: &[BoundaryFeature]) -> Self {
        let entries = areas
            .iter()
            .filter_map(|area| {
                let envelope = compute_envelope(&area.geometry)?;
                Some(AreaEntry {
                    id: area.id.clone(),
                    envelope,
                    polygon: area.geometry.clone(),
                })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Looks up the area containing a WGS84 point.
    ///
    /// Reporting areas can overlap; the lexicographically smallest id
    /// wins so the result is stable regardless of index order.
    #[must_use]
    pub fn lookup(&self, point: Point<f64>) -> Option<&str> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.id.as_str())
            .min()
    }
}

/// Tract to reporting-area assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TractMapping {
    /// tract GEOID -> ZCTA
    pub assignments: BTreeMap<String, String>,
    /// Tracts whose centroid fell in no reporting area (or had no
    /// centroid), sorted.
    pub unmapped: Vec<String>,
}

impl TractMapping {
    /// The area a tract was assigned to.
    #[must_use]
    pub fn area_for(&self, tract: &str) -> Option<&str> {
        self.assignments.get(tract).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Keeps the reporting areas whose centroid lies inside the metro
/// boundary. Input order is preserved.
#[must_use]
pub fn filter_areas_in_boundary(
    areas: Vec<BoundaryFeature>,
    boundary: &BoundaryFeature,
    zone: UtmZone,
) -> Vec<BoundaryFeature> {
    let total = areas.len();
    let kept: Vec<_> = areas
        .into_iter()
        .filter(|area| {
            projected_centroid(&area.geometry, zone)
                .is_some_and(|centroid| boundary.geometry.contains(&centroid))
        })
        .collect();

    log::info!(
        "{} of {total} reporting areas have their centroid inside metro {}",
        kept.len(),
        boundary.id
    );
    kept
}

/// Assigns every tract to the reporting area containing its centroid.
///
/// Each tract id is considered once (first occurrence wins), so the
/// mapping is a function from tract to area.
#[must_use]
pub fn map_tracts_to_areas(
    tracts: &[BoundaryFeature],
    areas: &[BoundaryFeature],
    zone: UtmZone,
) -> TractMapping {
    let index = AreaIndex::build(areas);
    let mut seen = BTreeSet::new();
    let mut mapping = TractMapping::default();

    for tract in tracts {
        if !seen.insert(tract.id.as_str()) {
            continue;
        }

        let area = projected_centroid(&tract.geometry, zone)
            .and_then(|centroid| index.lookup(centroid));

        match area {
            Some(area) => {
                mapping
                    .assignments
                    .insert(tract.id.clone(), area.to_string());
            }
            None => mapping.unmapped.push(tract.id.clone()),
        }
    }

    mapping.unmapped.sort();

    log::info!(
        "Mapped {} tracts onto {} reporting areas ({} unmapped)",
        mapping.assignments.len(),
        index.len(),
        mapping.unmapped.len()
    );
    if !mapping.unmapped.is_empty() {
        log::debug!("Unmapped tracts: {}", mapping.unmapped.join(", "));
    }

    mapping
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

//! Static label candidates, built once per dataset load.

use std::collections::BTreeSet;

use formats::{CountryFeature, GeoPoint, Ring};
use foundation::math::precision::{non_negative_finite, stable_total_cmp_f64};
use foundation::math::{LonLat, Vec3, angular_distance_deg};
use tracing::debug;

use super::config::LabelConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    /// Unique key.
    pub name: String,
    pub lon_lat: LonLat,
    /// Unit direction in globe-local space.
    pub anchor: Vec3,
    /// Footprint proxy in cos-corrected square degrees. Always finite and `>= 0`.
    pub extent: f64,
    pub prominence: f64,
    pub always_keep: bool,
}

impl LabelCandidate {
    pub fn new(name: impl Into<String>, lon_lat: LonLat, extent: f64, prominence: f64) -> Self {
        Self {
            name: name.into(),
            lon_lat,
            anchor: lon_lat.to_unit(),
            extent: non_negative_finite(extent),
            prominence: if prominence.is_finite() && prominence > 0.0 {
                prominence
            } else {
                1.0
            },
            always_keep: false,
        }
    }
}

/// Counters describing what the builder dropped.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub features: usize,
    pub malformed: usize,
    pub excluded: usize,
    pub merged: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CandidateBuild {
    /// Sorted by name.
    pub candidates: Vec<LabelCandidate>,
    pub report: BuildReport,
}

/// Turn raw country features into label candidates.
///
/// Malformed features (no name, no finite anchor, no usable ring) are skipped
/// and counted; they never abort the build.
pub fn build_candidates(features: &[CountryFeature], config: &LabelConfig) -> CandidateBuild {
    let mut report = BuildReport {
        features: features.len(),
        ..BuildReport::default()
    };

    let mut raw: Vec<LabelCandidate> = Vec::with_capacity(features.len());
    for feature in features {
        let Some(candidate) = candidate_from_feature(feature, config) else {
            report.malformed += 1;
            continue;
        };
        if config.exclude.contains(&candidate.name) {
            report.excluded += 1;
            continue;
        }
        raw.push(candidate);
    }

    let before = raw.len();
    let mut candidates = dedupe(raw, config.dedupe_tolerance_deg);
    report.merged = before - candidates.len();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(
        features = report.features,
        candidates = candidates.len(),
        malformed = report.malformed,
        excluded = report.excluded,
        merged = report.merged,
        "built label candidates"
    );
    CandidateBuild { candidates, report }
}

fn candidate_from_feature(feature: &CountryFeature, config: &LabelConfig) -> Option<LabelCandidate> {
    let name = feature.name.as_deref()?.trim();
    if name.is_empty() {
        return None;
    }
    let anchor = feature.label_anchor?;
    let lon_lat = LonLat::new(anchor.lon_deg, anchor.lat_deg);
    if !lon_lat.is_valid() {
        return None;
    }
    let extent = feature
        .polygons
        .as_deref()?
        .iter()
        .flatten()
        .filter_map(|ring| ring_extent(ring))
        .reduce(f64::max)?;

    let mut candidate = LabelCandidate::new(name, lon_lat, extent, config.prominence_of(name));
    if config.always_keep.contains(name) {
        candidate.always_keep = true;
        candidate.extent = candidate.extent.max(config.always_keep_extent_floor);
    }
    Some(candidate)
}

/// Bounding-box area of a ring with the longitude span shrunk by `cos(mid latitude)`.
///
/// Rings straddling the antimeridian use the shorter, wrapped longitude span.
/// Returns `None` when the ring has no valid points.
pub fn ring_extent(ring: &Ring) -> Option<f64> {
    let points: Vec<GeoPoint> = ring
        .iter()
        .copied()
        .filter(|p| LonLat::new(p.lon_deg, p.lat_deg).is_valid())
        .collect();
    if points.is_empty() {
        return None;
    }

    let (mut lat_min, mut lat_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in &points {
        lat_min = lat_min.min(p.lat_deg);
        lat_max = lat_max.max(p.lat_deg);
    }
    let mut lon_span = span(points.iter().map(|p| p.lon_deg));
    if lon_span > 180.0 {
        let wrapped = span(
            points
                .iter()
                .map(|p| if p.lon_deg < 0.0 { p.lon_deg + 360.0 } else { p.lon_deg }),
        );
        lon_span = lon_span.min(wrapped);
    }

    let mid_lat = 0.5 * (lat_min + lat_max);
    let extent = lon_span * mid_lat.to_radians().cos() * (lat_max - lat_min);
    Some(non_negative_finite(extent))
}

fn span(values: impl Iterator<Item = f64>) -> f64 {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    hi - lo
}

/// Collapse duplicate names and near-coincident anchors, keeping the larger extent.
///
/// Greedy over candidates in descending extent order (ties by name), so the
/// outcome does not depend on input order.
fn dedupe(mut raw: Vec<LabelCandidate>, tolerance_deg: f64) -> Vec<LabelCandidate> {
    raw.sort_by(|a, b| {
        stable_total_cmp_f64(b.extent, a.extent).then_with(|| a.name.cmp(&b.name))
    });

    let mut kept: Vec<LabelCandidate> = Vec::with_capacity(raw.len());
    let mut names: BTreeSet<String> = BTreeSet::new();
    for candidate in raw {
        if names.contains(&candidate.name) {
            continue;
        }
        let crowded = kept
            .iter()
            .any(|k| angular_distance_deg(k.anchor, candidate.anchor) < tolerance_deg);
        if crowded {
            continue;
        }
        names.insert(candidate.name.clone());
        kept.push(candidate);
    }
    kept
}

//! Per-candidate visibility scoring and culling.

use foundation::math::precision::{finite_or_zero, non_negative_finite};
use foundation::math::{Vec3, smoothstep};
use scene::{CameraState, GlobePose, facing_ratio, ndc_in_view};

use super::candidates::LabelCandidate;
use super::config::ScoringParams;
use super::zoom::ZoomParams;

/// Why a candidate was dropped before collision resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cull {
    BackFace,
    Extent,
    Frustum,
    Hysteresis,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Index into the candidate slice the pass was run over.
    pub index: usize,
    pub score: f64,
    pub font_size: f64,
    pub fade: f64,
    pub extent: f64,
    pub world_position: Vec3,
    pub ndc: [f64; 3],
    /// Shown on the previous tick.
    pub incumbent: bool,
}

/// Everything a scoring pass reads besides the candidate itself.
#[derive(Debug, Copy, Clone)]
pub struct ScoreContext<'a> {
    pub camera: &'a CameraState,
    pub globe: &'a GlobePose,
    pub zoom: &'a ZoomParams,
    pub params: &'a ScoringParams,
}

pub fn score_candidate(
    index: usize,
    candidate: &LabelCandidate,
    incumbent: bool,
    ctx: &ScoreContext<'_>,
) -> Result<ScoredCandidate, Cull> {
    let p = ctx.params;
    let world_position = ctx.globe.anchor_to_world(candidate.anchor, p.surface_lift);
    let normal = ctx.globe.normal_at(candidate.anchor);

    let facing = facing_ratio(world_position, normal, ctx.camera.position);
    if !(facing >= p.facing_cull) {
        return Err(Cull::BackFace);
    }

    let extent = non_negative_finite(candidate.extent);
    if extent < ctx.zoom.min_extent {
        return Err(Cull::Extent);
    }

    let ndc = match ctx.camera.project(world_position) {
        Some(projected) if ndc_in_view(projected.ndc, p.viewport_margin) => projected.ndc,
        _ => return Err(Cull::Frustum),
    };

    let fade = p.min_fade + (1.0 - p.min_fade) * smoothstep(p.facing_cull, p.facing_full, facing);
    let center = center_bias(ndc);
    let extent_norm = extent_norm(extent, p.extent_reference);
    let lat_penalty = latitude_penalty(candidate.lon_lat.lat_deg, p);
    let boost = if incumbent { p.persistence_boost } else { 1.0 };

    let score = finite_or_zero(
        fade * (0.6 + 0.4 * center)
            * (0.8 + 0.6 * extent_norm)
            * lat_penalty
            * candidate.prominence
            * boost,
    );
    if !admits(score, incumbent, p) {
        return Err(Cull::Hysteresis);
    }

    let font_size = ctx.zoom.base_font * (0.85 + 0.35 * extent_norm) * ctx.zoom.font_shrink;
    Ok(ScoredCandidate {
        index,
        score,
        font_size: non_negative_finite(font_size),
        fade,
        extent,
        world_position,
        ndc,
        incumbent,
    })
}

/// Asymmetric visibility thresholds: newcomers must clear `appear`, incumbents only `disappear`.
pub fn admits(score: f64, incumbent: bool, params: &ScoringParams) -> bool {
    let threshold = if incumbent {
        params.disappear_threshold
    } else {
        params.appear_threshold
    };
    score >= threshold
}

/// `1.0` at screen center, falling to `0.0` at the viewport corners.
pub fn center_bias(ndc: [f64; 3]) -> f64 {
    let r = ndc[0].hypot(ndc[1]);
    finite_or_zero(1.0 - r / std::f64::consts::SQRT_2).clamp(0.0, 1.0)
}

/// Log-scaled extent in `[0, 1]`; `reference` maps to `1.0`.
pub fn extent_norm(extent: f64, reference: f64) -> f64 {
    let denom = (1.0 + reference.max(0.0)).ln();
    if denom <= 0.0 {
        return 0.0;
    }
    finite_or_zero((1.0 + non_negative_finite(extent)).ln() / denom).clamp(0.0, 1.0)
}

pub fn latitude_penalty(lat_deg: f64, p: &ScoringParams) -> f64 {
    1.0 - p.polar_penalty * smoothstep(p.polar_start_deg, p.polar_full_deg, lat_deg.abs())
}

use foundation::math::{lerp, smoothstep};

use super::config::{NearFar, ZoomProfile};

/// Layout parameters resolved for one camera distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ZoomParams {
    /// Camera distance from the globe center, in globe radii.
    pub distance: f64,
    /// `0.0` at the near reference distance, `1.0` at the far one.
    pub t: f64,
    pub base_font: f64,
    pub gap_px: f64,
    pub budget: usize,
    pub min_extent: f64,
    pub font_shrink: f64,
    /// World units per globe radius; scales `base_font` and the pixel probe.
    pub world_scale: f64,
}

impl ZoomParams {
    /// Parameters at `distance` globe radii, for a unit globe.
    pub fn at(distance: f64, profile: &ZoomProfile) -> Self {
        let t = smoothstep(profile.near_distance, profile.far_distance, distance);
        let at = |v: NearFar| lerp(v.near, v.far, t);
        let budget = at(profile.budget);
        Self {
            distance,
            t,
            base_font: at(profile.font_size),
            gap_px: at(profile.gap_px),
            budget: if budget.is_finite() { budget.round().max(0.0) as usize } else { 0 },
            min_extent: at(profile.min_extent),
            font_shrink: at(profile.font_shrink),
            world_scale: 1.0,
        }
    }

    /// Parameters for a camera `camera_distance` world units from the center
    /// of a globe of `radius` world units.
    ///
    /// Scaling the camera distance and the radius together yields the same
    /// layout. A non-positive or non-finite radius counts as `1.0`.
    pub fn for_globe(camera_distance: f64, radius: f64, profile: &ZoomProfile) -> Self {
        let radius = if radius.is_finite() && radius > 0.0 {
            radius
        } else {
            1.0
        };
        let mut params = Self::at(camera_distance / radius, profile);
        params.base_font *= radius;
        params.world_scale = radius;
        params
    }
}

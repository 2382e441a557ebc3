use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read label config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("label config JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid label config: {0}")]
    Invalid(String),
}

/// A parameter interpolated between the near and far reference distances.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearFar {
    pub near: f64,
    pub far: f64,
}

impl NearFar {
    pub const fn new(near: f64, far: f64) -> Self {
        Self { near, far }
    }

    pub const fn constant(v: f64) -> Self {
        Self { near: v, far: v }
    }

    fn is_finite(self) -> bool {
        self.near.is_finite() && self.far.is_finite()
    }
}

/// Zoom-dependent layout parameters, keyed to two camera distances (globe radii).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomProfile {
    pub near_distance: f64,
    pub far_distance: f64,
    /// Base text height in world units.
    pub font_size: NearFar,
    /// Minimum spacing between label rectangles, in pixels.
    pub gap_px: NearFar,
    /// Maximum number of simultaneously accepted labels.
    pub budget: NearFar,
    pub min_extent: NearFar,
    pub font_shrink: NearFar,
}

impl Default for ZoomProfile {
    fn default() -> Self {
        Self {
            near_distance: 1.6,
            far_distance: 4.0,
            font_size: NearFar::new(0.010, 0.045),
            gap_px: NearFar::new(8.0, 4.0),
            budget: NearFar::new(70.0, 35.0),
            min_extent: NearFar::new(0.5, 20.0),
            font_shrink: NearFar::new(0.8, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    /// Anchors facing the camera less than this are culled.
    pub facing_cull: f64,
    /// Facing ratio at which the fade term saturates.
    pub facing_full: f64,
    /// Fade at the cull boundary.
    pub min_fade: f64,
    pub appear_threshold: f64,
    pub disappear_threshold: f64,
    pub persistence_boost: f64,
    /// Outward lift applied to anchors, as a fraction of the globe radius.
    pub surface_lift: f64,
    /// NDC slack beyond the unit square before frustum culling.
    pub viewport_margin: f64,
    /// Extent that normalizes to `1.0` on the log scale.
    pub extent_reference: f64,
    pub polar_penalty: f64,
    pub polar_start_deg: f64,
    pub polar_full_deg: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            facing_cull: 0.5,
            facing_full: 0.8,
            min_fade: 0.25,
            appear_threshold: 0.25,
            disappear_threshold: 0.12,
            persistence_boost: 1.25,
            surface_lift: 0.005,
            viewport_margin: 0.1,
            extent_reference: 3000.0,
            polar_penalty: 0.35,
            polar_start_deg: 55.0,
            polar_full_deg: 80.0,
        }
    }
}

/// Text rectangle estimate. An approximation, not font metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Glyph advance as a fraction of the font size.
    pub glyph_width: f64,
    /// Line height as a fraction of the font size.
    pub line_height: f64,
    /// Offset, in globe radii, used to measure pixels per world unit.
    pub scale_probe: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            glyph_width: 0.6,
            line_height: 1.2,
            scale_probe: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerParams {
    /// New labels start at this fraction of their target opacity.
    pub fade_in_fraction: f64,
    /// Per-tick interpolation factor toward the target opacity.
    pub smoothing: f64,
    /// Rejected ticks during which opacity is held.
    pub grace_ticks: u32,
    /// Opacity lost per second once the grace window is over.
    pub decay_per_s: f64,
    /// At or below this opacity an unaccepted label is dropped.
    pub removal_opacity: f64,
    pub max_dt_s: f64,
}

impl Default for StabilizerParams {
    fn default() -> Self {
        Self {
            fade_in_fraction: 0.5,
            smoothing: 0.15,
            grace_ticks: 10,
            decay_per_s: 1.6,
            removal_opacity: 0.02,
            max_dt_s: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionParams {
    pub position_epsilon: f64,
    pub distance_epsilon: f64,
    pub rotation_epsilon_rad: f64,
    /// Idle time after which a still camera triggers a fresh layout.
    pub refresh_interval_s: f64,
    pub max_dt_s: f64,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            position_epsilon: 1e-4,
            distance_epsilon: 1e-4,
            rotation_epsilon_rad: 1e-4,
            refresh_interval_s: 0.5,
            max_dt_s: 0.1,
        }
    }
}

/// Everything tunable about label selection.
///
/// Name sets default to empty; real deployments load them from JSON
/// (see `config/labels.json` at the repository root).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Names that never become candidates.
    pub exclude: BTreeSet<String>,
    /// Names whose extent is raised to `always_keep_extent_floor`.
    pub always_keep: BTreeSet<String>,
    /// Per-name score multipliers; absent names use `1.0`.
    pub prominence: BTreeMap<String, f64>,
    pub always_keep_extent_floor: f64,
    /// Anchors closer than this (degrees) collapse into one candidate.
    pub dedupe_tolerance_deg: f64,
    pub zoom: ZoomProfile,
    pub scoring: ScoringParams,
    pub layout: LayoutParams,
    pub stabilizer: StabilizerParams,
    pub motion: MotionParams,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            exclude: BTreeSet::new(),
            always_keep: BTreeSet::new(),
            prominence: BTreeMap::new(),
            always_keep_extent_floor: 40.0,
            dedupe_tolerance_deg: 1.2,
            zoom: ZoomProfile::default(),
            scoring: ScoringParams::default(),
            layout: LayoutParams::default(),
            stabilizer: StabilizerParams::default(),
            motion: MotionParams::default(),
        }
    }
}

impl LabelConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(payload)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let payload = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&payload)
    }

    pub fn prominence_of(&self, name: &str) -> f64 {
        match self.prominence.get(name) {
            Some(w) if w.is_finite() && *w > 0.0 => *w,
            _ => 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let zoom = &self.zoom;
        if !(zoom.near_distance > 0.0 && zoom.far_distance > zoom.near_distance) {
            return Err(invalid(format!(
                "zoom distances must satisfy 0 < near < far (near={}, far={})",
                zoom.near_distance, zoom.far_distance
            )));
        }
        for (key, v) in [
            ("font_size", zoom.font_size),
            ("gap_px", zoom.gap_px),
            ("budget", zoom.budget),
            ("min_extent", zoom.min_extent),
            ("font_shrink", zoom.font_shrink),
        ] {
            if !v.is_finite() || v.near < 0.0 || v.far < 0.0 {
                return Err(invalid(format!("zoom.{key} must be finite and non-negative")));
            }
        }

        let s = &self.scoring;
        if !(s.appear_threshold > s.disappear_threshold) {
            return Err(invalid(format!(
                "appear_threshold ({}) must exceed disappear_threshold ({})",
                s.appear_threshold, s.disappear_threshold
            )));
        }
        if !(s.facing_full > s.facing_cull) {
            return Err(invalid("facing_full must exceed facing_cull".to_string()));
        }

        let max_min_extent = zoom.min_extent.near.max(zoom.min_extent.far);
        if self.always_keep_extent_floor < max_min_extent {
            return Err(invalid(format!(
                "always_keep_extent_floor ({}) is below the largest min_extent ({max_min_extent})",
                self.always_keep_extent_floor
            )));
        }

        let st = &self.stabilizer;
        if !(0.0..=1.0).contains(&st.smoothing) || !(0.0..=1.0).contains(&st.fade_in_fraction) {
            return Err(invalid(
                "stabilizer smoothing and fade_in_fraction must lie in [0, 1]".to_string(),
            ));
        }
        if !(st.decay_per_s > 0.0) {
            return Err(invalid("stabilizer decay_per_s must be positive".to_string()));
        }
        if !(self.motion.refresh_interval_s > 0.0) {
            return Err(invalid("motion refresh_interval_s must be positive".to_string()));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::Invalid(msg)
}

//! Decides when label layout needs recomputing.

use foundation::math::{Quat, Vec3};
use scene::{CameraState, GlobePose};

use super::config::MotionParams;

#[derive(Debug, Copy, Clone, PartialEq)]
struct Observed {
    position: Vec3,
    distance: f64,
    orientation: Quat,
    globe_rotation: Quat,
    viewport_px: [f64; 2],
}

impl Observed {
    fn new(camera: &CameraState, globe: &GlobePose) -> Self {
        Self {
            position: camera.position,
            distance: camera.distance_from_origin(),
            orientation: camera.orientation,
            globe_rotation: globe.rotation,
            viewport_px: camera.viewport_px,
        }
    }

    fn differs(&self, other: &Self, p: &MotionParams) -> bool {
        self.position.distance(other.position) > p.position_epsilon
            || (self.distance - other.distance).abs() > p.distance_epsilon
            || self.orientation.angle_to(other.orientation) > p.rotation_epsilon_rad
            || self.globe_rotation.angle_to(other.globe_rotation) > p.rotation_epsilon_rad
            || self.viewport_px != other.viewport_px
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GateDecision {
    /// The view changed since the previous observation.
    pub moved: bool,
    /// Layout should be recomputed this tick.
    pub recompute: bool,
}

/// Tracks the last observed view and the idle time since it last changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MotionGate {
    last: Option<Observed>,
    idle_s: f64,
    interacting: bool,
}

impl MotionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &mut self,
        camera: &CameraState,
        globe: &GlobePose,
        dt_s: f64,
        params: &MotionParams,
    ) -> GateDecision {
        let current = Observed::new(camera, globe);
        let moved = match &self.last {
            None => true,
            Some(prev) => current.differs(prev, params),
        };
        self.last = Some(current);

        if moved {
            self.idle_s = 0.0;
            self.interacting = true;
            return GateDecision {
                moved,
                recompute: true,
            };
        }

        self.idle_s += clamp_dt(dt_s, params.max_dt_s);
        let refresh = self.idle_s >= params.refresh_interval_s;
        if refresh {
            self.idle_s = 0.0;
            self.interacting = false;
        }
        GateDecision {
            moved,
            recompute: refresh,
        }
    }

    /// Make the next observation count as movement.
    pub fn force(&mut self) {
        self.last = None;
    }

    pub fn idle_s(&self) -> f64 {
        self.idle_s
    }

    /// The view moved recently and no idle refresh has happened since.
    pub fn is_interacting(&self) -> bool {
        self.interacting
    }
}

pub(crate) fn clamp_dt(dt_s: f64, max_dt_s: f64) -> f64 {
    if dt_s.is_finite() {
        dt_s.clamp(0.0, max_dt_s.max(0.0))
    } else {
        0.0
    }
}

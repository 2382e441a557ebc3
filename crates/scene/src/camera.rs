use foundation::math::{Mat4, Quat, Vec3, lon_lat_to_unit};

/// Perspective lens parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lens {
    pub fov_y_rad: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            fov_y_rad: 45f64.to_radians(),
            near: 0.01,
            far: 100.0,
        }
    }
}

/// A point after the view-projection transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projected {
    /// Normalized device coordinates; `z` is depth in `[0, 1]` when visible.
    pub ndc: [f64; 3],
    /// Clip-space `w` (positive in front of the camera).
    pub w: f64,
}

/// Camera snapshot for one tick.
///
/// Owned by the host and read-only to label layout. `view_projection` uses the
/// z0 clip convention (see [`Mat4::perspective_rh_z0`]).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    /// Camera-to-world rotation (camera looks down its local `-Z`).
    pub orientation: Quat,
    pub view_projection: Mat4,
    pub viewport_px: [f64; 2],
}

impl CameraState {
    pub fn new(position: Vec3, orientation: Quat, view_projection: Mat4, viewport_px: [f64; 2]) -> Self {
        Self {
            position,
            orientation,
            view_projection,
            viewport_px,
        }
    }

    /// Build a camera at `position` looking at `target`.
    ///
    /// Returns `None` for degenerate setups (coincident eye/target, `up` parallel to the
    /// view direction).
    pub fn looking_at(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        lens: Lens,
        viewport_px: [f64; 2],
    ) -> Option<Self> {
        let view = Mat4::look_at_rh(position, target, up)?;
        let forward = (target - position).normalize()?;
        let right = forward.cross(up).normalize()?;
        let true_up = right.cross(forward);
        let orientation = Quat::from_rotation_columns(right, true_up, -forward);

        let aspect = viewport_px[0].max(1.0) / viewport_px[1].max(1.0);
        let proj = Mat4::perspective_rh_z0(lens.fov_y_rad, aspect, lens.near, lens.far);
        Some(Self::new(position, orientation, proj.mul(&view), viewport_px))
    }

    /// Camera hovering over `(lon, lat)` at `distance` from the globe center, looking at it.
    pub fn orbit(
        lon_deg: f64,
        lat_deg: f64,
        distance: f64,
        lens: Lens,
        viewport_px: [f64; 2],
    ) -> Option<Self> {
        let position = lon_lat_to_unit(lon_deg, lat_deg) * distance;
        Self::looking_at(position, Vec3::ZERO, Vec3::Y, lens, viewport_px)
            .or_else(|| Self::looking_at(position, Vec3::ZERO, Vec3::Z, lens, viewport_px))
    }

    pub fn distance_from_origin(&self) -> f64 {
        self.position.length()
    }

    /// Camera up axis in world space.
    pub fn up(&self) -> Vec3 {
        self.orientation.rotate(Vec3::Y)
    }

    /// Project a world-space point. `None` when the point is at or behind the eye plane.
    pub fn project(&self, world: Vec3) -> Option<Projected> {
        let clip = self.view_projection.transform_point(world);
        let w = clip[3];
        if !w.is_finite() || w <= 1e-9 {
            return None;
        }
        let ndc = [clip[0] / w, clip[1] / w, clip[2] / w];
        if !ndc.iter().all(|c| c.is_finite()) {
            return None;
        }
        Some(Projected { ndc, w })
    }

    /// NDC to pixel coordinates (origin top-left, `y` down).
    pub fn ndc_to_px(&self, ndc: [f64; 3]) -> [f64; 2] {
        [
            (ndc[0] * 0.5 + 0.5) * self.viewport_px[0],
            (0.5 - ndc[1] * 0.5) * self.viewport_px[1],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{CameraState, Lens};
    use foundation::math::{Vec3, lon_lat_to_unit};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn orbit_centers_the_sub_camera_point() {
        let cam = CameraState::orbit(30.0, 10.0, 3.0, Lens::default(), [800.0, 600.0])
            .expect("camera");
        assert_close(cam.distance_from_origin(), 3.0, 1e-12);

        let p = cam.project(lon_lat_to_unit(30.0, 10.0)).expect("projected");
        assert_close(p.ndc[0], 0.0, 1e-9);
        assert_close(p.ndc[1], 0.0, 1e-9);
        assert!(p.ndc[2] > 0.0 && p.ndc[2] < 1.0);

        let px = cam.ndc_to_px(p.ndc);
        assert_close(px[0], 400.0, 1e-6);
        assert_close(px[1], 300.0, 1e-6);
    }

    #[test]
    fn orientation_matches_view_direction() {
        let cam = CameraState::orbit(0.0, 0.0, 2.0, Lens::default(), [100.0, 100.0])
            .expect("camera");
        let forward = cam.orientation.rotate(Vec3::new(0.0, 0.0, -1.0));
        assert_close(forward.z, -1.0, 1e-9);
        assert_close(cam.up().y, 1.0, 1e-9);
    }

    #[test]
    fn polar_orbit_uses_fallback_up() {
        let cam = CameraState::orbit(0.0, 90.0, 2.5, Lens::default(), [100.0, 100.0]);
        assert!(cam.is_some());
    }

    #[test]
    fn points_behind_the_camera_do_not_project() {
        let cam = CameraState::orbit(0.0, 0.0, 2.0, Lens::default(), [100.0, 100.0])
            .expect("camera");
        assert!(cam.project(Vec3::new(0.0, 0.0, 5.0)).is_none());
    }
}

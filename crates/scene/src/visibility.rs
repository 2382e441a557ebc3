use foundation::math::Vec3;

/// How squarely a surface point faces the camera.
///
/// `dot(normal, normalize(eye - point))`: `1.0` straight on, `0.0` at the
/// horizon, negative on the far side. Degenerate input reports `-1.0`.
pub fn facing_ratio(point: Vec3, normal: Vec3, eye: Vec3) -> f64 {
    let (Some(n), Some(to_eye)) = (normal.normalize(), (eye - point).normalize()) else {
        return -1.0;
    };
    n.dot(to_eye)
}

/// Clip-space containment test on normalized device coordinates.
///
/// Convention:
/// - depth must lie in `[0, 1]` (z0 clip space)
/// - `x` and `y` may exceed the unit square by `margin` so labels anchored just
///   off-screen can still slide in
pub fn ndc_in_view(ndc: [f64; 3], margin: f64) -> bool {
    let bound = 1.0 + margin.max(0.0);
    (0.0..=1.0).contains(&ndc[2]) && ndc[0].abs() <= bound && ndc[1].abs() <= bound
}

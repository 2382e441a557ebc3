//! Greedy screen-space collision resolution.

use foundation::math::precision::{non_negative_finite, stable_total_cmp_f64};
use scene::CameraState;

use super::candidates::LabelCandidate;
use super::config::LayoutParams;
use super::scoring::ScoredCandidate;
use super::zoom::ZoomParams;

/// Axis-aligned pixel rectangle, origin top-left.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ScreenRect {
    pub fn centered(center: [f64; 2], w: f64, h: f64) -> Self {
        Self {
            x: center[0] - 0.5 * w,
            y: center[1] - 0.5 * h,
            w,
            h,
        }
    }

    /// Edges that merely touch do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AcceptedLabel {
    pub index: usize,
    pub score: f64,
    pub font_size: f64,
    pub fade: f64,
    pub rect: ScreenRect,
    pub incumbent: bool,
}

/// Estimated on-screen footprint of a label, padded by half the gap on each side.
///
/// Width is `chars * font * px_per_unit * glyph_width`; this is a heuristic,
/// not text shaping.
pub fn label_rect(
    name: &str,
    scored: &ScoredCandidate,
    camera: &CameraState,
    gap_px: f64,
    layout: &LayoutParams,
) -> ScreenRect {
    let center = camera.ndc_to_px(scored.ndc);
    let scale = pixels_per_unit(scored, camera, layout.scale_probe);
    let chars = name.chars().count() as f64;
    let font_px = scored.font_size * scale;
    let gap = non_negative_finite(gap_px);
    ScreenRect::centered(
        center,
        non_negative_finite(chars * font_px * layout.glyph_width) + gap,
        non_negative_finite(font_px * layout.line_height) + gap,
    )
}

fn pixels_per_unit(scored: &ScoredCandidate, camera: &CameraState, probe: f64) -> f64 {
    if !(probe > 0.0) {
        return 0.0;
    }
    let offset = scored.world_position + camera.up() * probe;
    let Some(projected) = camera.project(offset) else {
        return 0.0;
    };
    let a = camera.ndc_to_px(scored.ndc);
    let b = camera.ndc_to_px(projected.ndc);
    non_negative_finite((b[0] - a[0]).hypot(b[1] - a[1]) / probe)
}

/// Highest score first, then larger extent, then name.
pub fn placement_order(scored: &mut [ScoredCandidate], candidates: &[LabelCandidate]) {
    scored.sort_by(|a, b| {
        stable_total_cmp_f64(b.score, a.score)
            .then_with(|| stable_total_cmp_f64(b.extent, a.extent))
            .then_with(|| candidates[a.index].name.cmp(&candidates[b.index].name))
    });
}

/// Accept labels greedily in placement order until the zoom budget is spent.
///
/// A newcomer is rejected if it overlaps any label already placed in this pass.
/// Incumbents are placed even when they overlap.
pub fn resolve_collisions(
    mut scored: Vec<ScoredCandidate>,
    candidates: &[LabelCandidate],
    camera: &CameraState,
    zoom: &ZoomParams,
    layout: &LayoutParams,
) -> Vec<AcceptedLabel> {
    placement_order(&mut scored, candidates);
    let layout = &LayoutParams {
        scale_probe: layout.scale_probe * zoom.world_scale,
        ..layout.clone()
    };

    let mut accepted: Vec<AcceptedLabel> = Vec::with_capacity(zoom.budget.min(scored.len()));
    for s in scored {
        if accepted.len() >= zoom.budget {
            break;
        }
        let rect = label_rect(&candidates[s.index].name, &s, camera, zoom.gap_px, layout);
        if !s.incumbent && accepted.iter().any(|a| a.rect.overlaps(&rect)) {
            continue;
        }
        accepted.push(AcceptedLabel {
            index: s.index,
            score: s.score,
            font_size: s.font_size,
            fade: s.fade,
            rect,
            incumbent: s.incumbent,
        });
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::{ScreenRect, label_rect, resolve_collisions};
    use crate::labels::candidates::LabelCandidate;
    use crate::labels::config::{LayoutParams, ZoomProfile};
    use crate::labels::scoring::ScoredCandidate;
    use crate::labels::zoom::ZoomParams;
    use foundation::math::LonLat;
    use scene::{CameraState, Lens};

    fn camera() -> CameraState {
        CameraState::orbit(0.0, 0.0, 2.0, Lens::default(), [1000.0, 1000.0]).expect("camera")
    }

    fn scored(index: usize, score: f64, lon: f64, incumbent: bool, cam: &CameraState) -> ScoredCandidate {
        let world = LonLat::new(lon, 0.0).to_unit() * 1.005;
        let ndc = cam.project(world).expect("visible").ndc;
        ScoredCandidate {
            index,
            score,
            font_size: 0.02,
            fade: 1.0,
            extent: 100.0,
            world_position: world,
            ndc,
            incumbent,
        }
    }

    fn candidates(names: &[&str]) -> Vec<LabelCandidate> {
        names
            .iter()
            .map(|n| LabelCandidate::new(*n, LonLat::new(0.0, 0.0), 100.0, 1.0))
            .collect()
    }

    fn zoom(budget: usize) -> ZoomParams {
        let mut z = ZoomParams::at(2.0, &ZoomProfile::default());
        z.budget = budget;
        z
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = ScreenRect { x: 0.0, y: 0.0, w: 10.0, h: 10.0 };
        let b = ScreenRect { x: 10.0, y: 0.0, w: 10.0, h: 10.0 };
        let c = ScreenRect { x: 9.0, y: 9.0, w: 10.0, h: 10.0 };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn rect_scales_with_name_length_and_is_centered() {
        let cam = camera();
        let s = scored(0, 1.0, 0.0, false, &cam);
        let layout = LayoutParams::default();
        let short = label_rect("Chad", &s, &cam, 0.0, &layout);
        let long = label_rect("Chadchad", &s, &cam, 0.0, &layout);
        assert!(short.w > 0.0 && short.h > 0.0);
        assert!((long.w - 2.0 * short.w).abs() < 1e-9);
        assert!((short.x + 0.5 * short.w - 500.0).abs() < 1e-6);

        let padded = label_rect("Chad", &s, &cam, 8.0, &layout);
        assert!((padded.w - short.w - 8.0).abs() < 1e-9);
        assert!((padded.h - short.h - 8.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_newcomer_is_rejected() {
        let cam = camera();
        let c = candidates(&["Alpha", "Beta", "Gamma"]);
        let scored = vec![
            scored(1, 0.9, 0.1, false, &cam),
            scored(0, 1.0, 0.0, false, &cam),
            scored(2, 0.8, 30.0, false, &cam),
        ];
        let accepted = resolve_collisions(scored, &c, &cam, &zoom(10), &LayoutParams::default());
        let idx: Vec<usize> = accepted.iter().map(|a| a.index).collect();
        assert_eq!(idx, vec![0, 2]);
    }

    #[test]
    fn incumbents_may_overlap_but_newcomers_may_not() {
        let cam = camera();
        let c = candidates(&["Alpha", "Beta", "Gamma"]);
        let scored = vec![
            scored(0, 1.0, 0.0, true, &cam),
            scored(1, 0.9, 0.1, true, &cam),
            scored(2, 0.95, 0.05, false, &cam),
        ];
        let accepted = resolve_collisions(scored, &c, &cam, &zoom(10), &LayoutParams::default());
        let idx: Vec<usize> = accepted.iter().map(|a| a.index).collect();
        assert_eq!(idx, vec![0, 1]);
        assert!(accepted[0].rect.overlaps(&accepted[1].rect));
    }

    #[test]
    fn budget_stops_acceptance() {
        let cam = camera();
        let c = candidates(&["A", "B", "C", "D"]);
        let scored = (0..4)
            .map(|i| scored(i, 1.0 - i as f64 * 0.1, -30.0 + i as f64 * 20.0, false, &cam))
            .collect();
        let accepted = resolve_collisions(scored, &c, &cam, &zoom(2), &LayoutParams::default());
        assert_eq!(accepted.len(), 2);
        assert!(resolve_collisions(Vec::new(), &c, &cam, &zoom(0), &LayoutParams::default()).is_empty());
    }

    #[test]
    fn ties_break_by_extent_then_name() {
        let cam = camera();
        let c = candidates(&["Zeta", "Alpha", "Mu"]);
        let mut a = scored(0, 0.5, 0.0, false, &cam);
        a.extent = 10.0;
        let b = scored(1, 0.5, 0.0, false, &cam);
        let m = scored(2, 0.5, 0.0, false, &cam);
        let accepted = resolve_collisions(vec![a, m, b], &c, &cam, &zoom(1), &LayoutParams::default());
        assert_eq!(accepted[0].index, 1);
        assert_eq!(
            accepted[0].rect,
            label_rect("Alpha", &b, &cam, zoom(1).gap_px, &LayoutParams::default())
        );
    }
}

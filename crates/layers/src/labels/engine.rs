//! Per-tick label pipeline: motion gate, scoring, collision, stabilizer.

use std::collections::BTreeSet;

use formats::CountryFeature;
use runtime::{Frame, Metrics};
use scene::{CameraState, GlobePose};
use tracing::{debug, trace};

use super::candidates::{BuildReport, LabelCandidate, build_candidates};
use super::collision::{AcceptedLabel, resolve_collisions};
use super::config::LabelConfig;
use super::motion::MotionGate;
use super::scoring::{Cull, ScoreContext, score_candidate};
use super::stabilizer::{RenderLabel, VisualStates};
use super::zoom::ZoomParams;

/// What the host supplies every tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TickInput {
    pub camera: CameraState,
    /// Rotation of the globe group; `None` means identity at unit radius.
    pub globe: Option<GlobePose>,
}

impl TickInput {
    pub fn new(camera: CameraState) -> Self {
        Self {
            camera,
            globe: None,
        }
    }

    pub fn with_globe(mut self, globe: GlobePose) -> Self {
        self.globe = Some(globe);
        self
    }
}

/// All cross-tick state. Tied to one candidate list: accepted labels refer to
/// candidates by index.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LabelState {
    pub motion: MotionGate,
    /// Result of the most recent layout pass.
    pub accepted: Vec<AcceptedLabel>,
    pub visuals: VisualStates,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CullCounts {
    pub back_face: usize,
    pub extent: usize,
    pub frustum: usize,
    pub hysteresis: usize,
}

impl CullCounts {
    fn record(&mut self, cull: Cull) {
        match cull {
            Cull::BackFace => self.back_face += 1,
            Cull::Extent => self.extent += 1,
            Cull::Frustum => self.frustum += 1,
            Cull::Hysteresis => self.hysteresis += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.back_face + self.extent + self.frustum + self.hysteresis
    }
}

/// Output of one scoring + collision pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub zoom: ZoomParams,
    /// In acceptance order.
    pub accepted: Vec<AcceptedLabel>,
    pub scored: usize,
    pub culls: CullCounts,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub moved: bool,
    /// The view moved recently and no idle refresh has happened since.
    pub interacting: bool,
    pub recomputed: bool,
    pub accepted: usize,
    pub culls: CullCounts,
    pub created: usize,
    pub removed: usize,
    pub tracked: usize,
    pub rendered: usize,
}

/// Score every candidate and greedily place the survivors.
///
/// `incumbents` are candidate indices shown on the previous tick; they get
/// the persistence boost and the lower hysteresis threshold, and may overlap.
pub fn layout(
    candidates: &[LabelCandidate],
    camera: &CameraState,
    globe: &GlobePose,
    config: &LabelConfig,
    incumbents: &BTreeSet<usize>,
) -> Layout {
    let zoom = ZoomParams::for_globe(camera.distance_from_origin(), globe.radius, &config.zoom);
    let ctx = ScoreContext {
        camera,
        globe,
        zoom: &zoom,
        params: &config.scoring,
    };

    let mut culls = CullCounts::default();
    let mut scored = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        match score_candidate(index, candidate, incumbents.contains(&index), &ctx) {
            Ok(s) => scored.push(s),
            Err(cull) => {
                trace!(name = %candidate.name, ?cull, "label culled");
                culls.record(cull);
            }
        }
    }

    let scored_len = scored.len();
    let accepted = resolve_collisions(scored, candidates, camera, &zoom, &config.layout);
    debug!(
        distance = zoom.distance,
        budget = zoom.budget,
        scored = scored_len,
        accepted = accepted.len(),
        culled = culls.total(),
        "label layout"
    );
    Layout {
        zoom,
        accepted,
        scored: scored_len,
        culls,
    }
}

/// Advance the label state by one tick.
///
/// Pure: the same candidates, input, config, prior state and `dt_s` always
/// produce the same state and render list.
pub fn update(
    candidates: &[LabelCandidate],
    input: &TickInput,
    config: &LabelConfig,
    prior: LabelState,
    dt_s: f64,
) -> (LabelState, Vec<RenderLabel>) {
    let mut state = prior;
    let (render, _) = advance(candidates, input, config, &mut state, dt_s);
    (state, render)
}

fn advance(
    candidates: &[LabelCandidate],
    input: &TickInput,
    config: &LabelConfig,
    state: &mut LabelState,
    dt_s: f64,
) -> (Vec<RenderLabel>, TickReport) {
    let globe = input.globe.unwrap_or_default();
    let gate = state
        .motion
        .observe(&input.camera, &globe, dt_s, &config.motion);

    let mut report = TickReport {
        moved: gate.moved,
        interacting: state.motion.is_interacting(),
        recomputed: gate.recompute,
        ..TickReport::default()
    };
    if gate.recompute {
        let incumbents = shown_candidates(candidates, &state.visuals);
        let pass = layout(candidates, &input.camera, &globe, config, &incumbents);
        report.culls = pass.culls;
        state.accepted = pass.accepted;
    }
    report.accepted = state.accepted.len();

    let step = state
        .visuals
        .step(&state.accepted, candidates, dt_s, &config.stabilizer);
    report.created = step.created;
    report.removed = step.removed;
    report.tracked = state.visuals.len();

    let render = state.visuals.render(&globe, config.scoring.surface_lift);
    report.rendered = render.len();
    (render, report)
}

/// Indices of candidates still on screen, including labels in their grace
/// window or fading out.
fn shown_candidates(candidates: &[LabelCandidate], visuals: &VisualStates) -> BTreeSet<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| visuals.get(&c.name).is_some_and(|v| v.opacity > 0.0))
        .map(|(index, _)| index)
        .collect()
}

/// Stateful handle around [`update`] for hosts driving labels from a frame loop.
#[derive(Debug, Clone)]
pub struct LabelEngine {
    candidates: Vec<LabelCandidate>,
    config: LabelConfig,
    state: LabelState,
    metrics: Metrics,
    last_report: TickReport,
}

impl LabelEngine {
    pub fn new(candidates: Vec<LabelCandidate>, config: LabelConfig) -> Self {
        Self {
            candidates,
            config,
            state: LabelState::default(),
            metrics: Metrics::new(),
            last_report: TickReport::default(),
        }
    }

    /// Build candidates from raw features and wrap them in an engine.
    pub fn from_features(features: &[CountryFeature], config: LabelConfig) -> (Self, BuildReport) {
        let build = build_candidates(features, &config);
        (Self::new(build.candidates, config), build.report)
    }

    pub fn tick(&mut self, frame: &Frame, input: &TickInput) -> Vec<RenderLabel> {
        let (render, report) = advance(
            &self.candidates,
            input,
            &self.config,
            &mut self.state,
            frame.dt_s,
        );

        self.metrics.inc_counter("labels.ticks", 1);
        if report.recomputed {
            self.metrics.inc_counter("labels.recomputes", 1);
            self.metrics
                .record_histogram("labels.accepted", report.accepted as i64);
        }
        self.metrics
            .inc_counter("labels.created", report.created as u64);
        self.metrics
            .inc_counter("labels.removed", report.removed as u64);
        self.metrics
            .set_gauge("labels.tracked", report.tracked as i64);
        if report.created > 0 || report.removed > 0 {
            debug!(
                frame = frame.index,
                created = report.created,
                removed = report.removed,
                tracked = report.tracked,
                "label set changed"
            );
        }

        self.last_report = report;
        render
    }

    /// Force a layout pass on the next tick.
    pub fn request_refresh(&mut self) {
        self.state.motion.force();
    }

    pub fn candidates(&self) -> &[LabelCandidate] {
        &self.candidates
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    pub fn state(&self) -> &LabelState {
        &self.state
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn last_report(&self) -> TickReport {
        self.last_report
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelEngine, LabelState, TickInput, update};
    use crate::labels::candidates::LabelCandidate;
    use crate::labels::config::LabelConfig;
    use foundation::math::LonLat;
    use runtime::Frame;
    use scene::{CameraState, Lens};

    fn camera(lon: f64, distance: f64) -> CameraState {
        CameraState::orbit(lon, 10.0, distance, Lens::default(), [1280.0, 720.0]).expect("camera")
    }

    fn candidates() -> Vec<LabelCandidate> {
        vec![
            LabelCandidate::new("Brazil", LonLat::new(-53.0, -10.0), 1200.0, 1.3),
            LabelCandidate::new("Chad", LonLat::new(18.7, 15.3), 160.0, 1.0),
            LabelCandidate::new("France", LonLat::new(2.5, 46.6), 90.0, 1.4),
            LabelCandidate::new("Nigeria", LonLat::new(8.0, 9.6), 70.0, 1.0),
            LabelCandidate::new("Spain", LonLat::new(-3.6, 40.2), 60.0, 1.0),
        ]
    }

    #[test]
    fn pure_update_matches_engine_tick() {
        let c = candidates();
        let cfg = LabelConfig::default();
        let input = TickInput::new(camera(0.0, 2.2));

        let mut engine = LabelEngine::new(c.clone(), cfg.clone());
        let mut state = LabelState::default();
        let mut frame = Frame::first_at_rate(60.0);
        for _ in 0..30 {
            let from_engine = engine.tick(&frame, &input);
            let (next, from_update) = update(&c, &input, &cfg, state, frame.dt_s);
            state = next;
            assert_eq!(from_engine, from_update);
            frame = frame.next();
        }
        assert_eq!(engine.state(), &state);
    }

    #[test]
    fn metrics_track_ticks_and_recomputes() {
        let mut engine = LabelEngine::new(candidates(), LabelConfig::default());
        let input = TickInput::new(camera(0.0, 2.2));
        let mut frame = Frame::first_at_rate(60.0);
        for _ in 0..10 {
            engine.tick(&frame, &input);
            frame = frame.next();
        }
        let m = engine.metrics();
        assert_eq!(m.counter("labels.ticks"), 10);
        assert_eq!(m.counter("labels.recomputes"), 1);
        assert!(m.counter("labels.created") > 0);
        assert_eq!(m.gauge("labels.tracked"), Some(engine.state().visuals.len() as i64));

        engine.request_refresh();
        engine.tick(&frame, &input);
        assert!(engine.last_report().recomputed);
        assert_eq!(engine.metrics().counter("labels.recomputes"), 2);
    }

    #[test]
    fn stale_accepted_set_keeps_animating() {
        let mut engine = LabelEngine::new(candidates(), LabelConfig::default());
        let input = TickInput::new(camera(0.0, 2.2));
        let frame = Frame::first_at_rate(60.0);
        let first = engine.tick(&frame, &input);
        let second = engine.tick(&frame.next(), &input);
        assert!(!engine.last_report().recomputed);
        assert!(!first.is_empty());
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(a, b)| b.opacity > a.opacity));
    }

    #[test]
    fn interacting_clears_after_idle_refresh() {
        let mut engine = LabelEngine::new(candidates(), LabelConfig::default());
        let input = TickInput::new(camera(0.0, 2.2));
        let mut frame = Frame::new(0, 0.0625);
        engine.tick(&frame, &input);
        assert!(engine.last_report().interacting);

        for _ in 0..7 {
            frame = frame.next();
            engine.tick(&frame, &input);
            assert!(engine.last_report().interacting);
            assert!(!engine.last_report().recomputed);
        }
        engine.tick(&frame.next(), &input);
        let report = engine.last_report();
        assert!(report.recomputed && !report.moved);
        assert!(!report.interacting);
    }

    #[test]
    fn label_in_grace_window_keeps_incumbency() {
        let c = candidates();
        let cfg = LabelConfig::default();
        let front = TickInput::new(camera(0.0, 2.2));
        let mut state = LabelState::default();
        for _ in 0..5 {
            state = update(&c, &front, &cfg, state, 1.0 / 60.0).0;
        }
        let nigeria = c.iter().position(|x| x.name == "Nigeria").expect("nigeria");
        assert!(state.accepted.iter().any(|a| a.index == nigeria));

        // Drop Nigeria from the accepted set without touching its visual state.
        state.accepted.retain(|a| a.index != nigeria);
        let moved = TickInput::new(camera(0.5, 2.2));
        let (state, _) = update(&c, &moved, &cfg, state, 1.0 / 60.0);
        let held = state
            .accepted
            .iter()
            .find(|a| a.index == nigeria)
            .expect("nigeria re-accepted");
        assert!(held.incumbent);
    }

    #[test]
    fn from_features_reports_build() {
        let (engine, report) = LabelEngine::from_features(&[], LabelConfig::default());
        assert!(engine.candidates().is_empty());
        assert_eq!(report.features, 0);
    }
}

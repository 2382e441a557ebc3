//! Per-label opacity state carried across ticks.

use std::collections::{BTreeMap, BTreeSet};

use foundation::math::Vec3;
use scene::GlobePose;

use super::candidates::LabelCandidate;
use super::collision::AcceptedLabel;
use super::config::StabilizerParams;
use super::motion::clamp_dt;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelVisualState {
    pub opacity: f64,
    pub target_opacity: f64,
    pub visible_streak: u32,
    pub invisible_streak: u32,
    /// Last accepted font size; fading labels keep it.
    pub font_size: f64,
    pub anchor: Vec3,
}

/// One label for the renderer to draw this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderLabel {
    pub name: String,
    pub world_position: Vec3,
    pub font_size: f64,
    /// Always in `(0, 1]`.
    pub opacity: f64,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub created: usize,
    pub removed: usize,
}

/// Visual states keyed by candidate name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VisualStates {
    states: BTreeMap<String, LabelVisualState>,
}

impl VisualStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&LabelVisualState> {
        self.states.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabelVisualState)> {
        self.states.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Advance every tracked label one tick against the current accepted set.
    pub fn step(
        &mut self,
        accepted: &[AcceptedLabel],
        candidates: &[LabelCandidate],
        dt_s: f64,
        params: &StabilizerParams,
    ) -> StepReport {
        let mut report = StepReport::default();
        let mut seen: BTreeSet<&str> = BTreeSet::new();

        for label in accepted {
            let Some(candidate) = candidates.get(label.index) else {
                continue;
            };
            if !seen.insert(candidate.name.as_str()) {
                continue;
            }
            let target = label.fade.clamp(0.0, 1.0);
            match self.states.get_mut(&candidate.name) {
                Some(state) => {
                    state.opacity += (target - state.opacity) * params.smoothing;
                    state.target_opacity = target;
                    state.visible_streak = state.visible_streak.saturating_add(1);
                    state.invisible_streak = 0;
                    state.font_size = label.font_size;
                }
                None => {
                    self.states.insert(
                        candidate.name.clone(),
                        LabelVisualState {
                            opacity: target * params.fade_in_fraction,
                            target_opacity: target,
                            visible_streak: 1,
                            invisible_streak: 0,
                            font_size: label.font_size,
                            anchor: candidate.anchor,
                        },
                    );
                    report.created += 1;
                }
            }
        }

        let dt = clamp_dt(dt_s, params.max_dt_s);
        let before = self.states.len();
        self.states.retain(|name, state| {
            if seen.contains(name.as_str()) {
                return true;
            }
            state.visible_streak = 0;
            state.invisible_streak = state.invisible_streak.saturating_add(1);
            if state.invisible_streak > params.grace_ticks {
                state.opacity = (state.opacity - params.decay_per_s * dt).max(0.0);
            }
            state.opacity > params.removal_opacity
        });
        report.removed = before - self.states.len();
        report
    }

    /// Labels with positive opacity, in name order.
    pub fn render(&self, globe: &GlobePose, surface_lift: f64) -> Vec<RenderLabel> {
        self.states
            .iter()
            .filter(|(_, s)| s.opacity > 0.0)
            .map(|(name, s)| RenderLabel {
                name: name.clone(),
                world_position: globe.anchor_to_world(s.anchor, surface_lift),
                font_size: s.font_size,
                opacity: s.opacity.min(1.0),
            })
            .collect()
    }
}

//! Dynamic label declutter for a rotating globe.
//!
//! Candidates are built once per dataset. Every tick the motion gate decides
//! whether to rescore and re-place labels; the stabilizer then animates opacity
//! against the most recent accepted set, fresh or not.

pub mod candidates;
pub mod collision;
pub mod config;
pub mod engine;
pub mod motion;
pub mod scoring;
pub mod stabilizer;
pub mod zoom;

pub use candidates::{BuildReport, CandidateBuild, LabelCandidate, build_candidates};
pub use collision::{AcceptedLabel, ScreenRect};
pub use config::{ConfigError, LabelConfig, NearFar};
pub use engine::{LabelEngine, LabelState, Layout, TickInput, TickReport, layout, update};
pub use motion::{GateDecision, MotionGate};
pub use scoring::{Cull, ScoredCandidate};
pub use stabilizer::{LabelVisualState, RenderLabel, VisualStates};
pub use zoom::ZoomParams;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use formats::{FeatureCache, FileSource};
use foundation::math::{Quat, Vec3, lerp};
use layers::{LabelCandidate, LabelConfig, LabelEngine, RenderLabel, TickInput, build_candidates};
use runtime::Frame;
use scene::{CameraState, GlobePose, Lens};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and replay globe label declutter")]
struct Args {
    /// Label config JSON (exclusions, always-keep names, tuning)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the label candidates built from a GeoJSON dataset
    Candidates {
        /// Country FeatureCollection
        dataset: PathBuf,
    },

    /// Replay a scripted orbit-and-zoom camera path and print the label set
    Replay {
        /// Country FeatureCollection
        dataset: PathBuf,

        #[arg(long, default_value_t = 240)]
        frames: u64,

        #[arg(long, default_value_t = 60.0)]
        fps: f64,

        /// Camera orbit speed around the globe axis
        #[arg(long, default_value_t = 20.0)]
        orbit_deg_per_s: f64,

        /// Globe group spin, applied on top of the camera orbit
        #[arg(long, default_value_t = 0.0)]
        spin_deg_per_s: f64,

        /// Camera latitude
        #[arg(long, default_value_t = 20.0)]
        lat: f64,

        /// Camera distance (globe radii) at the first frame
        #[arg(long, default_value_t = 3.5)]
        start_distance: f64,

        /// Camera distance (globe radii) at the last frame
        #[arg(long, default_value_t = 1.8)]
        end_distance: f64,

        #[arg(long, default_value_t = 1280.0)]
        width: f64,

        #[arg(long, default_value_t = 720.0)]
        height: f64,

        /// Print every Nth frame
        #[arg(long, default_value_t = 30)]
        every: u64,

        /// Emit one JSON object per printed frame
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = real_main(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(args: Args) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    match args.command {
        Command::Candidates { dataset } => cmd_candidates(&dataset, &config),
        Command::Replay {
            dataset,
            frames,
            fps,
            orbit_deg_per_s,
            spin_deg_per_s,
            lat,
            start_distance,
            end_distance,
            width,
            height,
            every,
            json,
        } => {
            let path = ReplayPath {
                frames,
                fps,
                orbit_deg_per_s,
                spin_deg_per_s,
                lat,
                start_distance,
                end_distance,
                viewport_px: [width, height],
            };
            cmd_replay(&dataset, config, &path, every.max(1), json)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<LabelConfig, String> {
    match path {
        Some(p) => {
            let config = LabelConfig::from_path(p).map_err(|e| e.to_string())?;
            info!(path = %p.display(), "loaded label config");
            Ok(config)
        }
        None => Ok(LabelConfig::default()),
    }
}

fn load_candidates(dataset: &Path, config: &LabelConfig) -> Result<Vec<LabelCandidate>, String> {
    let cache = FeatureCache::new(FileSource::new(dataset));
    let collection = cache.get().map_err(|e| e.to_string())?;
    let build = build_candidates(&collection.features, config);
    eprintln!(
        "{} features -> {} candidates ({} malformed, {} excluded, {} merged)",
        build.report.features,
        build.candidates.len(),
        build.report.malformed,
        build.report.excluded,
        build.report.merged
    );
    Ok(build.candidates)
}

#[derive(Debug, Serialize)]
struct CandidateRow<'a> {
    name: &'a str,
    lon: f64,
    lat: f64,
    extent: f64,
    prominence: f64,
    always_keep: bool,
}

fn cmd_candidates(dataset: &Path, config: &LabelConfig) -> Result<(), String> {
    let candidates = load_candidates(dataset, config)?;
    let rows: Vec<CandidateRow<'_>> = candidates
        .iter()
        .map(|c| CandidateRow {
            name: &c.name,
            lon: c.lon_lat.lon_deg,
            lat: c.lon_lat.lat_deg,
            extent: c.extent,
            prominence: c.prominence,
            always_keep: c.always_keep,
        })
        .collect();
    let payload = serde_json::to_string_pretty(&rows).map_err(|e| format!("json: {e}"))?;
    println!("{payload}");
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
struct ReplayPath {
    frames: u64,
    fps: f64,
    orbit_deg_per_s: f64,
    spin_deg_per_s: f64,
    lat: f64,
    start_distance: f64,
    end_distance: f64,
    viewport_px: [f64; 2],
}

impl ReplayPath {
    fn input_at(&self, frame: &Frame) -> Result<TickInput, String> {
        let progress = if self.frames > 1 {
            frame.index as f64 / (self.frames - 1) as f64
        } else {
            0.0
        };
        let distance = lerp(self.start_distance, self.end_distance, progress);
        let lon = wrap_lon(self.orbit_deg_per_s * frame.time_s);
        let camera = CameraState::orbit(lon, self.lat, distance, Lens::default(), self.viewport_px)
            .ok_or_else(|| format!("degenerate camera at frame {}", frame.index))?;

        let spin = (self.spin_deg_per_s * frame.time_s).to_radians();
        Ok(TickInput::new(camera).with_globe(GlobePose::rotated(Quat::from_axis_angle(Vec3::Y, spin))))
    }
}

fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

#[derive(Debug, Serialize)]
struct LabelRow<'a> {
    name: &'a str,
    opacity: f64,
    font_size: f64,
    position: [f64; 3],
}

#[derive(Debug, Serialize)]
struct FrameRow<'a> {
    frame: u64,
    time_s: f64,
    distance: f64,
    recomputed: bool,
    interacting: bool,
    accepted: usize,
    labels: Vec<LabelRow<'a>>,
}

fn cmd_replay(
    dataset: &Path,
    config: LabelConfig,
    path: &ReplayPath,
    every: u64,
    json: bool,
) -> Result<(), String> {
    let candidates = load_candidates(dataset, &config)?;
    let mut engine = LabelEngine::new(candidates, config);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut frame = Frame::first_at_rate(path.fps);
    for _ in 0..path.frames {
        let input = path.input_at(&frame)?;
        let labels = engine.tick(&frame, &input);
        let last = frame.index + 1 == path.frames;
        if frame.index % every == 0 || last {
            let report = engine.last_report();
            let row = FrameRow {
                frame: frame.index,
                time_s: frame.time_s,
                distance: input.camera.distance_from_origin(),
                recomputed: report.recomputed,
                interacting: report.interacting,
                accepted: report.accepted,
                labels: labels.iter().map(label_row).collect(),
            };
            write_frame(&mut out, &row, json)?;
        }
        frame = frame.next();
    }

    eprint!("{}", engine.metrics());
    Ok(())
}

fn label_row(label: &RenderLabel) -> LabelRow<'_> {
    LabelRow {
        name: &label.name,
        opacity: label.opacity,
        font_size: label.font_size,
        position: label.world_position.as_array(),
    }
}

fn write_frame(out: &mut impl Write, row: &FrameRow<'_>, json: bool) -> Result<(), String> {
    let line = if json {
        serde_json::to_string(row).map_err(|e| format!("json: {e}"))?
    } else {
        let names: Vec<String> = row
            .labels
            .iter()
            .map(|l| format!("{}({:.2})", l.name, l.opacity))
            .collect();
        format!(
            "frame {:>5} t={:>6.2}s dist={:.2} {}{} accepted={:<3} {}",
            row.frame,
            row.time_s,
            row.distance,
            if row.recomputed { "R" } else { "-" },
            if row.interacting { "I" } else { "-" },
            row.accepted,
            names.join(" ")
        )
    };
    writeln!(out, "{line}").map_err(|e| format!("write: {e}"))
}

#[cfg(test)]
mod tests {
    use super::{FrameRow, ReplayPath, wrap_lon, write_frame};
    use runtime::Frame;

    fn path() -> ReplayPath {
        ReplayPath {
            frames: 11,
            fps: 10.0,
            orbit_deg_per_s: 90.0,
            spin_deg_per_s: 0.0,
            lat: 0.0,
            start_distance: 4.0,
            end_distance: 2.0,
            viewport_px: [800.0, 600.0],
        }
    }

    #[test]
    fn replay_path_interpolates_distance() {
        let p = path();
        let first = p.input_at(&Frame::new(0, 0.1)).expect("first");
        let last = p.input_at(&Frame::new(10, 0.1)).expect("last");
        assert!((first.camera.distance_from_origin() - 4.0).abs() < 1e-9);
        assert!((last.camera.distance_from_origin() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn longitude_wraps_into_range() {
        assert_eq!(wrap_lon(190.0), -170.0);
        assert_eq!(wrap_lon(-190.0), 170.0);
        assert_eq!(wrap_lon(45.0), 45.0);
    }

    #[test]
    fn frame_rows_carry_gate_flags() {
        let row = FrameRow {
            frame: 3,
            time_s: 0.05,
            distance: 2.5,
            recomputed: true,
            interacting: true,
            accepted: 0,
            labels: Vec::new(),
        };
        let mut text = Vec::new();
        write_frame(&mut text, &row, false).expect("text");
        assert!(String::from_utf8(text).expect("utf8").contains(" RI accepted=0"));

        let mut json = Vec::new();
        write_frame(&mut json, &row, true).expect("json");
        assert!(String::from_utf8(json).expect("utf8").contains("\"interacting\":true"));
    }
}

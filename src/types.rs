use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ─── Pitches ────────────────────────────────────────────────────────────────

/// Scale-degree offset used for helix placement. Timeline records carry raw
/// note numbers; the renderer transposes them before geometry and color.
pub type PitchIndex = i32;

// ─── Geometry ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Distance from the helix axis (the z axis).
    pub fn radial(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

// ─── Color ──────────────────────────────────────────────────────────────────

/// Hue / saturation / brightness, each channel on a 0–100 scale.
/// Matches the HSB(100) color mode the browser page draws with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsb {
    pub h: f32,
    pub s: f32,
    pub b: f32,
}

impl Hsb {
    pub const BLACK: Hsb = Hsb::new(0.0, 0.0, 0.0);
    pub const WHITE: Hsb = Hsb::new(0.0, 0.0, 100.0);

    pub const fn new(h: f32, s: f32, b: f32) -> Self {
        Self { h, s, b }
    }
}

impl fmt::Display for Hsb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsb({:.0},{:.0},{:.0})", self.h, self.s, self.b)
    }
}

// ─── Draw primitives ────────────────────────────────────────────────────────

/// One primitive of a rendered scene. Serializes with an `"op"` tag so the
/// browser page can dispatch on it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        color: Hsb,
    },
    /// Camera motion for the rest of the frame: translate, then rotate
    /// about X, then about Z (radians).
    Transform {
        translate: Vec3,
        rotate_x: f32,
        rotate_z: f32,
    },
    /// Faint ring marking a pitch slot, independent of what is playing.
    Backdrop {
        center: Vec3,
        radius: f32,
        steps: u32,
        fill: Hsb,
        opacity: f32,
    },
    /// Interval line between two sounding pitches.
    Line {
        from: Vec3,
        to: Vec3,
        stroke: Hsb,
        weight: f32,
    },
    /// Filled circle over a sounding pitch, drawn after all lines.
    Highlight {
        center: Vec3,
        radius: f32,
        steps: u32,
        fill: Hsb,
        opacity: f32,
    },
}

// ─── Rendered frame ─────────────────────────────────────────────────────────

/// Complete output of one pass of the frame procedure.
/// Produced by the frame driver, consumed by the WebSocket server and console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFrame {
    /// Monotonic frame counter
    pub frame: u64,
    /// Seconds since the session clock started
    pub wall_time: f64,
    /// Playback-synchronized time used to pick the chord
    pub effective_time: f64,
    /// True once the audio clock has been observed
    pub synced: bool,
    /// Active timeline event index
    pub chord_index: usize,
    /// Raw (untransposed) pitches of the active event
    pub chord: Vec<PitchIndex>,
    pub draw_circles: bool,
    pub commands: Vec<DrawCommand>,
}

impl SceneFrame {
    pub fn count_backdrops(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Backdrop { .. }))
            .count()
    }

    pub fn count_lines(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
            .count()
    }

    pub fn count_highlights(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Highlight { .. }))
            .count()
    }
}

impl fmt::Display for SceneFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<7} wall={:>8.3}s  t={:>8.3}s  {}  chord[{}]={:?}  cmds={}",
            self.frame,
            self.wall_time,
            self.effective_time,
            if self.synced { "SYNC" } else { "FREE" },
            self.chord_index,
            self.chord,
            self.commands.len(),
        )
    }
}

// ─── Input ──────────────────────────────────────────────────────────────────

/// Pointer offset from the viewport center, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pointer {
    pub dx: f32,
    pub dy: f32,
}

/// Discrete input delivered to the frame driver between frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Pointer { dx: f32, dy: f32 },
    /// Flip the backdrop ring grid on/off.
    Toggle,
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic wall clock for the visualization run.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created.
    pub fn now_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

pub const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Name a raw note number, e.g. 60 → "C4".
pub fn note_name(note: PitchIndex) -> String {
    let pc = note.rem_euclid(12);
    let oct = note.div_euclid(12) - 1;
    format!("{}{}", NOTE_NAMES[pc as usize], oct)
}

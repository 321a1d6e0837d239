//! Interval-class coloring for the lines between sounding pitches.

use crate::types::Hsb;

/// Unison / octave: desaturated near-white, kept apart from the hue table.
pub const UNISON_COLOR: Hsb = Hsb::new(0.0, 0.0, 80.0);

const DEFAULT_HUE: f32 = 10.0;

/// Fold a signed pitch difference into an interval class 0..=6.
/// Inversions share a class (m2 and M7 both give 1).
pub fn interval_class(diff: i32) -> u8 {
    // i64 so |i32::MIN| cannot overflow
    let interval = (diff as i64).abs() % 12;
    (6 - (6 - interval).abs()) as u8
}

fn class_hue(class: u8) -> f32 {
    match class {
        1 => 17.0, // m2, M7
        2 => 83.0, // M2, m7
        3 => 33.0, // m3, M6
        4 => 50.0, // M3, m6
        5 => 67.0, // P4, P5
        6 => 0.0,  // tritone
        _ => DEFAULT_HUE,
    }
}

/// Stroke color for the interval `diff` semitones wide.
pub fn color(diff: i32) -> Hsb {
    let class = interval_class(diff);
    if class == 0 {
        UNISON_COLOR
    } else {
        Hsb::new(class_hue(class), 100.0, 100.0)
    }
}

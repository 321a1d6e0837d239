use crate::interval_color::{color, interval_class};
use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

const CLASS_LABELS: [&str; 7] = ["P8", "m2", "M2", "m3", "M3", "P4", "TT"];

/// Headless monitor: redraws a small text panel with the active chord and
/// its intervals at `update_hz`.
pub struct ConsoleDisplay {
    rx: Receiver<SceneFrame>,
    update_hz: u32,
    /// Frames arriving per second from the driver
    source_fps: u32,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<SceneFrame>, update_hz: u32, source_fps: u32) -> Self {
        Self {
            rx,
            update_hz,
            source_fps,
        }
    }

    pub fn run(&self) {
        let skip = if self.update_hz == 0 {
            30
        } else {
            (self.source_fps / self.update_hz).max(1) as u64
        };
        let mut count: u64 = 0;
        let mut stdout = io::stdout();

        for frame in self.rx.iter() {
            count += 1;
            if count % skip != 0 {
                continue;
            }

            // Clear screen and move cursor home
            print!("\x1b[2J\x1b[H");
            print!("{}", render_panel(&frame));
            let _ = stdout.flush();
        }
    }
}

/// Text panel for one frame.
pub fn render_panel(frame: &SceneFrame) -> String {
    let mut out = String::new();
    out.push_str("╔══════════════════════════════════════════════════════════╗\n");
    out.push_str("║  HELIX DYADS — Live Monitor                              ║\n");
    out.push_str("╠══════════════════════════════════════════════════════════╣\n");
    out.push_str(&format!(
        "║  Wall {:>8.2}s   Playback {:>8.2}s   {:<6}            ║\n",
        frame.wall_time,
        frame.effective_time,
        if frame.synced { "SYNC" } else { "wait" },
    ));
    out.push_str(&format!(
        "║  Event #{:<6} Circles: {:<3}  Draw commands: {:<6}      ║\n",
        frame.chord_index,
        if frame.draw_circles { "on" } else { "off" },
        frame.commands.len(),
    ));
    out.push_str("║                                                          ║\n");

    let names: Vec<String> = frame.chord.iter().map(|&n| note_name(n)).collect();
    out.push_str(&format!("║  Chord: {:<48} ║\n", truncate(&names.join(" "), 48)));

    let mut class_counts = [0usize; 7];
    for (j, &a) in frame.chord.iter().enumerate() {
        for &b in &frame.chord[..j] {
            class_counts[interval_class(a.wrapping_sub(b)) as usize] += 1;
        }
    }
    out.push_str("║  Intervals:                                              ║\n");
    for (class, &n) in class_counts.iter().enumerate() {
        if n == 0 {
            continue;
        }
        let c = color(class as i32);
        out.push_str(&format!(
            "║    {:<3} x{:<3} {} {:<34} ║\n",
            CLASS_LABELS[class],
            n,
            c,
            "█".repeat(n.min(30)),
        ));
    }
    out.push_str("╚══════════════════════════════════════════════════════════╝\n");
    out
}

fn truncate(s: &str, max: usize) -> String {
    // by char count so multi-byte names never split
    s.chars().take(max).collect()
}

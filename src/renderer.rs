//! Per-frame scene composition.
//!
//! Commands come out in painter's order: clear, camera transform, backdrop
//! rings, interval lines, then highlight circles so highlights sit on top.

use crate::geometry::HelixGeometry;
use crate::interval_color;
use crate::session::VizSession;
use crate::types::*;

/// Lines and highlights stay hidden until wall time is this far past the
/// sync offset.
pub const START_GUARD_SECS: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub geometry: HelixGeometry,
    /// Backdrop rings are drawn for pitch indices `0..num_pitches`.
    pub num_pitches: i32,
    /// Added to every timeline pitch before placement and coloring.
    pub transpose: i32,
    pub backdrop_radius: f32,
    pub backdrop_opacity: f32,
    pub highlight_radius: f32,
    pub highlight_opacity: f32,
    /// Vertices per ring / highlight polygon.
    pub circle_steps: u32,
    pub line_weight: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            geometry: HelixGeometry::default(),
            num_pitches: 88,
            transpose: -24,
            backdrop_radius: 2.0,
            backdrop_opacity: 30.0,
            highlight_radius: 5.0,
            highlight_opacity: 40.0,
            circle_steps: 5,
            line_weight: 2.0,
        }
    }
}

/// What the renderer needs from outside the session for one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    /// Seconds on the session clock.
    pub wall_time: f64,
    /// Latest playback time from the player, if any has been reported.
    pub reported_time: Option<f64>,
    pub pointer: Pointer,
}

pub struct SceneRenderer {
    config: RenderConfig,
    frame_count: u64,
}

impl SceneRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Cosmetic camera motion: a slow lateral sway plus pointer-driven tilt.
    pub fn camera(wall_time: f64, pointer: Pointer) -> DrawCommand {
        DrawCommand::Transform {
            translate: Vec3::new((10.0 * (wall_time * 2.0).sin()) as f32, 0.0, -100.0),
            rotate_x: -pointer.dy / 80.0,
            rotate_z: pointer.dx / 90.0,
        }
    }

    pub fn render(&mut self, session: &mut VizSession, input: &FrameInput) -> SceneFrame {
        let cfg = self.config;
        let geo = cfg.geometry;
        let mut commands = Vec::new();

        commands.push(DrawCommand::Clear { color: Hsb::BLACK });
        commands.push(Self::camera(input.wall_time, input.pointer));

        if session.draw_circles {
            for i in 0..cfg.num_pitches {
                commands.push(DrawCommand::Backdrop {
                    center: geo.position(i),
                    radius: cfg.backdrop_radius,
                    steps: cfg.circle_steps,
                    fill: Hsb::WHITE,
                    opacity: cfg.backdrop_opacity,
                });
            }
        }

        let offset = session.sync.update(input.wall_time, input.reported_time);
        let effective_time = input.wall_time - offset;
        let chord = session.cursor.advance(effective_time).to_vec();

        if input.wall_time > offset + START_GUARD_SECS {
            let placed: Vec<(i32, Vec3)> = chord
                .iter()
                .map(|&p| {
                    let t = p.saturating_add(cfg.transpose);
                    (t, geo.position(t))
                })
                .collect();

            for (j, &(a, pa)) in placed.iter().enumerate() {
                for &(b, pb) in &placed[..=j] {
                    commands.push(DrawCommand::Line {
                        from: pa,
                        to: pb,
                        stroke: interval_color::color(a.wrapping_sub(b)),
                        weight: cfg.line_weight,
                    });
                }
            }

            for &(_, pos) in &placed {
                commands.push(DrawCommand::Highlight {
                    center: pos,
                    radius: cfg.highlight_radius,
                    steps: cfg.circle_steps,
                    fill: Hsb::WHITE,
                    opacity: cfg.highlight_opacity,
                });
            }
        }

        self.frame_count += 1;
        SceneFrame {
            frame: self.frame_count,
            wall_time: input.wall_time,
            effective_time,
            synced: session.sync.is_synced(),
            chord_index: session.cursor.index(),
            chord,
            draw_circles: session.draw_circles,
            commands,
        }
    }
}

impl Default for SceneRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{Timeline, TimelineEvent};
    use std::sync::Arc;

    fn session() -> VizSession {
        let tl = Timeline::new(vec![
            TimelineEvent::new(0.0, vec![60]),
            TimelineEvent::new(1.0, vec![60, 64]),
            TimelineEvent::new(2.5, vec![67, 67, 73]),
        ])
        .unwrap();
        VizSession::new(Arc::new(tl))
    }

    fn synced_input(wall: f64) -> FrameInput {
        // player reported 0.5s of audio at wall time 0.5 → offset 0
        FrameInput {
            wall_time: wall,
            reported_time: Some(0.5),
            pointer: Pointer::default(),
        }
    }

    #[test]
    fn test_layer_order() {
        let mut s = session();
        let mut r = SceneRenderer::default();
        r.render(&mut s, &synced_input(0.5));
        let f = r.render(&mut s, &synced_input(1.5));
        assert!(matches!(f.commands[0], DrawCommand::Clear { .. }));
        assert!(matches!(f.commands[1], DrawCommand::Transform { .. }));
        let first_line = f
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::Line { .. }))
            .unwrap();
        let last_backdrop = f
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Backdrop { .. }))
            .unwrap();
        let first_highlight = f
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::Highlight { .. }))
            .unwrap();
        let last_line = f
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Line { .. }))
            .unwrap();
        assert!(last_backdrop < first_line);
        assert!(last_line < first_highlight);
    }

    #[test]
    fn test_backdrop_count_follows_toggle() {
        let mut s = session();
        let mut r = SceneRenderer::default();
        let f = r.render(&mut s, &synced_input(0.5));
        assert_eq!(f.count_backdrops(), 88);

        s.toggle_circles();
        let f = r.render(&mut s, &synced_input(1.5));
        assert_eq!(f.count_backdrops(), 0);
        // chord [60, 64]: pairs (0,0) (1,0) (1,1)
        assert_eq!(f.count_lines(), 3);
        assert_eq!(f.count_highlights(), 2);
        assert!(!f.draw_circles);
    }

    #[test]
    fn test_pairwise_lines_include_repeats() {
        let mut s = session();
        let mut r = SceneRenderer::default();
        r.render(&mut s, &synced_input(0.5));
        let f = r.render(&mut s, &synced_input(3.0));
        assert_eq!(f.chord, vec![67, 67, 73]);
        // n(n+1)/2 for n = 3
        assert_eq!(f.count_lines(), 6);
        assert_eq!(f.count_highlights(), 3);
        // the 67–73 tritone is drawn in red
        let has_tritone = f.commands.iter().any(|c| {
            matches!(c, DrawCommand::Line { stroke, .. } if *stroke == Hsb::new(0.0, 100.0, 100.0))
        });
        assert!(has_tritone);
    }

    #[test]
    fn test_line_endpoints_use_transposed_positions() {
        let mut s = session().with_circles(false);
        let mut r = SceneRenderer::default();
        let f = r.render(&mut s, &synced_input(0.5));
        let geo = HelixGeometry::default();
        match &f.commands[2] {
            DrawCommand::Line { from, to, stroke, .. } => {
                assert_eq!(*from, geo.position(60 - 24));
                assert_eq!(*to, geo.position(60 - 24));
                assert_eq!(*stroke, interval_color::UNISON_COLOR);
            }
            other => panic!("expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_unsynced_draws_no_chord() {
        let mut s = session();
        let mut r = SceneRenderer::default();
        for wall in [0.1, 1.0, 5.0] {
            let f = r.render(
                &mut s,
                &FrameInput {
                    wall_time: wall,
                    reported_time: None,
                    pointer: Pointer::default(),
                },
            );
            assert!(!f.synced);
            assert_eq!(f.effective_time, 0.0);
            assert_eq!(f.count_lines(), 0);
            assert_eq!(f.count_highlights(), 0);
            assert_eq!(f.count_backdrops(), 88);
        }
    }

    #[test]
    fn test_sync_offset_drives_chord_choice() {
        let mut s = session();
        let mut r = SceneRenderer::default();
        // audio reports 0.2s when wall is 10.2 → offset 10
        let f = r.render(
            &mut s,
            &FrameInput {
                wall_time: 10.2,
                reported_time: Some(0.2),
                pointer: Pointer::default(),
            },
        );
        assert!(f.synced);
        assert!((f.effective_time - 0.2).abs() < 1e-9);
        assert_eq!(f.chord, vec![60]);

        let f = r.render(
            &mut s,
            &FrameInput {
                wall_time: 11.3,
                reported_time: Some(0.2),
                pointer: Pointer::default(),
            },
        );
        assert_eq!(f.chord, vec![60, 64]);
        assert_eq!(f.chord_index, 1);
    }

    #[test]
    fn test_start_guard_holds_chord_for_first_10ms() {
        let mut s = session().with_circles(false);
        let mut r = SceneRenderer::default();
        let at = |wall: f64| FrameInput {
            wall_time: wall,
            reported_time: Some(0.005),
            pointer: Pointer::default(),
        };

        // locks with offset exactly 0
        let f = r.render(&mut s, &at(0.005));
        assert!(f.synced);
        assert_eq!(f.chord, vec![60]);
        assert_eq!(f.count_lines(), 0);
        assert_eq!(f.count_highlights(), 0);

        // the boundary itself is still inside the guard
        let f = r.render(&mut s, &at(START_GUARD_SECS));
        assert_eq!(f.count_lines(), 0);
        assert_eq!(f.count_highlights(), 0);

        let f = r.render(&mut s, &at(0.02));
        assert_eq!(f.count_lines(), 1);
        assert_eq!(f.count_highlights(), 1);
    }

    #[test]
    fn test_camera_follows_pointer() {
        let cmd = SceneRenderer::camera(0.0, Pointer { dx: 90.0, dy: 80.0 });
        match cmd {
            DrawCommand::Transform { translate, rotate_x, rotate_z } => {
                assert!(translate.x.abs() < 1e-6);
                assert_eq!(translate.z, -100.0);
                assert!((rotate_x + 1.0).abs() < 1e-6);
                assert!((rotate_z - 1.0).abs() < 1e-6);
            }
            other => panic!("expected transform, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_counter_increments() {
        let mut s = session();
        let mut r = SceneRenderer::default();
        assert_eq!(r.render(&mut s, &synced_input(0.5)).frame, 1);
        assert_eq!(r.render(&mut s, &synced_input(0.6)).frame, 2);
    }
}

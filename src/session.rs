use crate::cursor::ChordCursor;
use crate::sync::PlaybackSync;
use crate::timeline::Timeline;
use std::sync::Arc;

/// All mutable visualization state for one run, owned by the frame driver
/// and handed to the renderer each frame.
///
/// Built only from an already-validated `Timeline`, so a failed load never
/// yields a half-initialized session.
#[derive(Debug, Clone)]
pub struct VizSession {
    pub cursor: ChordCursor,
    pub sync: PlaybackSync,
    pub draw_circles: bool,
}

impl VizSession {
    pub fn new(timeline: Arc<Timeline>) -> Self {
        Self {
            cursor: ChordCursor::new(timeline),
            sync: PlaybackSync::new(),
            draw_circles: true,
        }
    }

    pub fn with_circles(mut self, enabled: bool) -> Self {
        self.draw_circles = enabled;
        self
    }

    /// Flip the backdrop grid. Returns the new setting.
    pub fn toggle_circles(&mut self) -> bool {
        self.draw_circles = !self.draw_circles;
        self.draw_circles
    }
}

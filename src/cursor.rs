use crate::timeline::Timeline;
use crate::types::PitchIndex;
use std::sync::Arc;

/// Forward-only position in the timeline.
///
/// `advance` scans ahead from the current index and never rewinds, so a run
/// of non-decreasing times costs O(events) in total. Times before the first
/// event still report event 0: there is no "silence" state, and gaps keep
/// the previous chord sounding.
#[derive(Debug, Clone)]
pub struct ChordCursor {
    timeline: Arc<Timeline>,
    index: usize,
}

impl ChordCursor {
    pub fn new(timeline: Arc<Timeline>) -> Self {
        Self { timeline, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// True once the last event is active; no further advancement possible.
    pub fn is_finished(&self) -> bool {
        self.index + 1 >= self.timeline.len()
    }

    /// Move to the latest event at or before `time` and return its chord.
    pub fn advance(&mut self, time: f64) -> &[PitchIndex] {
        let events = self.timeline.events();
        while self.index + 1 < events.len() && events[self.index + 1].time <= time {
            self.index += 1;
        }
        self.current()
    }

    /// Chord of the active event without moving.
    pub fn current(&self) -> &[PitchIndex] {
        self.timeline
            .get(self.index)
            .map(|e| e.pitches())
            .unwrap_or(&[])
    }
}

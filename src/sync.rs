//! Audio-clock synchronization.
//!
//! The player thread reports playback time into a [`PlaybackTimeSlot`]; the
//! frame driver reads it once at the top of each frame and feeds it to
//! [`PlaybackSync`]. The slot is the only value shared across threads.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Single-slot mailbox holding the most recently reported playback time.
///
/// One writer (the player callback), one reader (the frame driver). Later
/// writes overwrite earlier ones; readers see the latest value and leave it
/// in place. Stored as f64 bits; NaN means nothing reported yet.
#[derive(Clone)]
pub struct PlaybackTimeSlot {
    bits: Arc<AtomicU64>,
}

impl PlaybackTimeSlot {
    pub fn new() -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(f64::NAN.to_bits())),
        }
    }

    pub fn publish(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::Release);
    }

    pub fn latest(&self) -> Option<f64> {
        let v = f64::from_bits(self.bits.load(Ordering::Acquire));
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }
}

impl Default for PlaybackTimeSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncState {
    /// No positive playback time seen yet; offset tracks wall time.
    Unsynced,
    /// Locked: `effective = wall - offset` for the rest of the run.
    Synced { offset: f64 },
}

/// UNSYNCED → SYNCED, once, on the first reported playback time above zero.
#[derive(Debug, Clone)]
pub struct PlaybackSync {
    state: SyncState,
}

impl PlaybackSync {
    pub fn new() -> Self {
        Self {
            state: SyncState::Unsynced,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_synced(&self) -> bool {
        matches!(self.state, SyncState::Synced { .. })
    }

    /// Resolve the time offset for a frame at `wall_time`, given the latest
    /// reported playback time.
    pub fn update(&mut self, wall_time: f64, reported: Option<f64>) -> f64 {
        match self.state {
            SyncState::Synced { offset } => offset,
            SyncState::Unsynced => match reported {
                Some(t) if t > 0.0 => {
                    let offset = wall_time - t;
                    info!(
                        "Audio clock locked: playback {:.3}s at wall {:.3}s (offset {:.3}s)",
                        t, wall_time, offset
                    );
                    self.state = SyncState::Synced { offset };
                    offset
                }
                _ => wall_time,
            },
        }
    }
}

impl Default for PlaybackSync {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_starts_empty() {
        let slot = PlaybackTimeSlot::new();
        assert_eq!(slot.latest(), None);
    }

    #[test]
    fn test_slot_keeps_latest_across_clones() {
        let slot = PlaybackTimeSlot::new();
        let writer = slot.clone();
        writer.publish(0.25);
        writer.publish(0.5);
        assert_eq!(slot.latest(), Some(0.5));
        // read-and-hold
        assert_eq!(slot.latest(), Some(0.5));
    }

    #[test]
    fn test_unsynced_tracks_wall_time() {
        let mut s = PlaybackSync::new();
        assert_eq!(s.update(1.0, None), 1.0);
        assert_eq!(s.update(2.0, Some(0.0)), 2.0);
        assert_eq!(s.update(3.0, Some(-1.0)), 3.0);
        assert!(!s.is_synced());
    }

    #[test]
    fn test_locks_on_first_positive_report() {
        let mut s = PlaybackSync::new();
        s.update(1.0, None);
        let offset = s.update(5.0, Some(0.5));
        assert!((offset - 4.5).abs() < 1e-12);
        assert_eq!(s.state(), SyncState::Synced { offset: 4.5 });
        // later reports never move the origin
        assert_eq!(s.update(9.0, Some(100.0)), 4.5);
        assert_eq!(s.update(10.0, None), 4.5);
    }
}

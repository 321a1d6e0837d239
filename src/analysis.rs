//! Chord statistics over a whole timeline: the largest chord, how many
//! dyads it holds, and the peak count of each interval class in any chord.

use crate::interval_color::interval_class;
use crate::timeline::Timeline;
use std::fmt;

const CLASS_NAMES: [&str; 7] = ["P1/P8", "m2/M7", "M2/m7", "m3/M6", "M3/m6", "P4/P5", "TT"];

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineStats {
    pub events: usize,
    pub duration: f64,
    /// Most pitches sounding at once
    pub max_notes: usize,
    /// Dyads in the largest chord: n(n-1)/2
    pub max_dyads: usize,
    /// Per interval class 0..=6, the most dyads of that class in one chord
    pub max_dyad_counts: [usize; 7],
}

impl TimelineStats {
    pub fn compute(timeline: &Timeline) -> Self {
        let mut max_notes = 0;
        let mut max_dyad_counts = [0usize; 7];

        for ev in timeline.events() {
            let chord = ev.pitches();
            max_notes = max_notes.max(chord.len());

            let mut counts = [0usize; 7];
            for (j, &a) in chord.iter().enumerate() {
                for &b in &chord[..j] {
                    counts[interval_class(a.wrapping_sub(b)) as usize] += 1;
                }
            }
            for (m, c) in max_dyad_counts.iter_mut().zip(counts) {
                *m = (*m).max(c);
            }
        }

        Self {
            events: timeline.len(),
            duration: timeline.duration(),
            max_notes,
            max_dyads: max_notes * max_notes.saturating_sub(1) / 2,
            max_dyad_counts,
        }
    }
}

impl fmt::Display for TimelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Events:             {}", self.events)?;
        writeln!(f, "Last change:        {:.2}s", self.duration)?;
        writeln!(f, "Maximum chord size: {}", self.max_notes)?;
        writeln!(f, "Dyads in max chord: {}", self.max_dyads)?;
        write!(f, "Max occurrences per interval class:")?;
        for (name, count) in CLASS_NAMES.iter().zip(self.max_dyad_counts) {
            write!(f, "\n  {:<6} {}", name, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimelineEvent;

    #[test]
    fn test_sample_stats() {
        let tl = Timeline::new(vec![
            TimelineEvent::new(0.0, vec![60]),
            TimelineEvent::new(1.0, vec![60, 64, 67, 72]),
            TimelineEvent::new(2.5, vec![67, 73]),
        ])
        .unwrap();
        let s = TimelineStats::compute(&tl);
        assert_eq!(s.events, 3);
        assert_eq!(s.max_notes, 4);
        assert_eq!(s.max_dyads, 6);
        // C E G C: 60-64 M3, 60-67 P5, 60-72 P8, 64-67 m3, 64-72 m6, 67-72 P4
        assert_eq!(s.max_dyad_counts, [1, 0, 0, 1, 2, 2, 1]);
    }

    #[test]
    fn test_missing_chords_count_as_empty() {
        let tl = Timeline::new(vec![TimelineEvent {
            time: 0.0,
            active_pitches: None,
        }])
        .unwrap();
        let s = TimelineStats::compute(&tl);
        assert_eq!(s.max_notes, 0);
        assert_eq!(s.max_dyads, 0);
        assert!(s.to_string().contains("Maximum chord size: 0"));
    }
}

//! Chord-change timeline: loading, validation, read-only access.
//!
//! Accepts the keyed-object JSON the MIDI export writes
//! (`{"0": {"Time (s)": 0.0, "Playing": [60, 64]}, "1": …}`) or a plain
//! array of the same records. Validation is all-or-nothing: either a
//! complete `Timeline` comes back or an error does.

use crate::types::PitchIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("timeline has no events")]
    Empty,

    #[error("event {index} at {time}s is not after the previous event at {previous}s")]
    Unsorted {
        index: usize,
        previous: f64,
        time: f64,
    },

    #[error("event {index} has invalid time {time}")]
    InvalidTime { index: usize, time: f64 },

    #[error("timeline keys must run 0..N-1 without gaps; missing key {expected}")]
    MissingIndex { expected: usize },

    #[error("timeline key {0:?} is not an event index")]
    BadKey(String),

    #[error("could not parse timeline JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One chord change. `active_pitches` is `None` when the record carried no
/// pitch data; that frame renders as "nothing sounding".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(rename = "Time (s)", alias = "time")]
    pub time: f64,
    #[serde(
        rename = "Playing",
        alias = "active_pitches",
        alias = "pitches",
        default
    )]
    pub active_pitches: Option<Vec<PitchIndex>>,
}

impl TimelineEvent {
    pub fn new(time: f64, pitches: Vec<PitchIndex>) -> Self {
        Self {
            time,
            active_pitches: Some(pitches),
        }
    }

    /// Pitches sounding from this event on; empty if the record had none.
    pub fn pitches(&self) -> &[PitchIndex] {
        self.active_pitches.as_deref().unwrap_or(&[])
    }
}

/// Immutable, non-empty, strictly time-ascending sequence of events.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
}

impl Timeline {
    /// Validate and take ownership of `events`.
    pub fn new(events: Vec<TimelineEvent>) -> Result<Self, TimelineError> {
        if events.is_empty() {
            return Err(TimelineError::Empty);
        }
        for (index, ev) in events.iter().enumerate() {
            if !ev.time.is_finite() || ev.time < 0.0 {
                return Err(TimelineError::InvalidTime {
                    index,
                    time: ev.time,
                });
            }
            if index > 0 {
                let previous = events[index - 1].time;
                if ev.time <= previous {
                    return Err(TimelineError::Unsorted {
                        index,
                        previous,
                        time: ev.time,
                    });
                }
            }
        }
        Ok(Self { events })
    }

    pub fn from_json_str(json: &str) -> Result<Self, TimelineError> {
        let events = match serde_json::from_str::<Value>(json)? {
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<TimelineEvent>, _>>()?,
            Value::Object(map) => {
                let mut keyed = BTreeMap::new();
                for (key, value) in map {
                    let index: usize = key
                        .trim()
                        .parse()
                        .map_err(|_| TimelineError::BadKey(key.clone()))?;
                    keyed.insert(index, serde_json::from_value::<TimelineEvent>(value)?);
                }
                // BTreeMap iterates in numeric key order; keys must be 0..N-1
                let mut events = Vec::with_capacity(keyed.len());
                for (expected, (index, ev)) in keyed.into_iter().enumerate() {
                    if index != expected {
                        return Err(TimelineError::MissingIndex { expected });
                    }
                    events.push(ev);
                }
                events
            }
            other => {
                return Err(TimelineError::Parse(serde::de::Error::custom(format!(
                    "expected an object or array, found {}",
                    other
                ))))
            }
        };
        Self::new(events)
    }

    pub fn load(path: &Path) -> Result<Self, TimelineError> {
        let text = fs::read_to_string(path).map_err(|source| TimelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// A validated timeline is never empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&TimelineEvent> {
        self.events.get(index)
    }

    /// Time of the last chord change.
    pub fn duration(&self) -> f64 {
        self.events.last().map_or(0.0, |e| e.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_object_numeric_order() {
        let mut json = String::from("{");
        for i in 0..12 {
            if i > 0 {
                json.push(',');
            }
            json += &format!(r#""{}": {{"Time (s)": {}.5, "Playing": [{}]}}"#, i, i, 60 + i);
        }
        json.push('}');
        let tl = Timeline::from_json_str(&json).unwrap();
        assert_eq!(tl.len(), 12);
        // "10" sorts before "2" lexically; numeric order must win
        assert_eq!(tl.events()[2].pitches(), &[62]);
        assert_eq!(tl.events()[10].pitches(), &[70]);
        assert!((tl.duration() - 11.5).abs() < 1e-9);
    }

    #[test]
    fn test_sequence_shape() {
        let json = r#"[{"time": 0, "pitches": [60]}, {"Time (s)": 1.0, "Playing": [60, 64]}]"#;
        let tl = Timeline::from_json_str(json).unwrap();
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.events()[1].pitches(), &[60, 64]);
    }

    #[test]
    fn test_missing_playing_is_empty_chord() {
        let json = r#"{"0": {"Time (s)": 0.0}, "1": {"Time (s)": 1.0, "Playing": null}}"#;
        let tl = Timeline::from_json_str(json).unwrap();
        assert_eq!(tl.events()[0].active_pitches, None);
        assert!(tl.events()[1].pitches().is_empty());
        // all-silent still counts as a non-empty timeline
        assert!(!tl.is_empty());
        assert_eq!(tl.len(), 2);
    }

    #[test]
    fn test_gap_in_keys() {
        let json = r#"{"0": {"Time (s)": 0.0, "Playing": []}, "2": {"Time (s)": 1.0, "Playing": []}}"#;
        let err = Timeline::from_json_str(json).unwrap_err();
        assert!(matches!(err, TimelineError::MissingIndex { expected: 1 }), "got: {}", err);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(Timeline::new(vec![]), Err(TimelineError::Empty)));
        assert!(matches!(Timeline::from_json_str("{}"), Err(TimelineError::Empty)));
        assert!(matches!(Timeline::from_json_str("[]"), Err(TimelineError::Empty)));
    }

    #[test]
    fn test_unsorted_rejected() {
        let events = vec![
            TimelineEvent::new(0.0, vec![60]),
            TimelineEvent::new(2.0, vec![62]),
            TimelineEvent::new(1.0, vec![64]),
        ];
        let err = Timeline::new(events).unwrap_err();
        assert!(matches!(err, TimelineError::Unsorted { index: 2, .. }), "got: {}", err);
    }

    #[test]
    fn test_duplicate_time_rejected() {
        let events = vec![TimelineEvent::new(1.0, vec![60]), TimelineEvent::new(1.0, vec![62])];
        assert!(matches!(Timeline::new(events), Err(TimelineError::Unsorted { .. })));
    }

    #[test]
    fn test_negative_time_rejected() {
        let events = vec![TimelineEvent::new(-0.5, vec![60])];
        assert!(matches!(Timeline::new(events), Err(TimelineError::InvalidTime { index: 0, .. })));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(Timeline::from_json_str("not json"), Err(TimelineError::Parse(_))));
        assert!(matches!(Timeline::from_json_str("42"), Err(TimelineError::Parse(_))));
    }

    #[test]
    fn test_non_numeric_key() {
        let json = r#"{"intro": {"Time (s)": 0.0, "Playing": []}}"#;
        assert!(matches!(Timeline::from_json_str(json), Err(TimelineError::BadKey(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Timeline::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, TimelineError::Io { .. }));
    }
}

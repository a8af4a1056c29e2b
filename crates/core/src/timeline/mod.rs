//! Timeline rendering
//!
//! Sequences events, speech tokens and pauses into time-positioned
//! [`StreamItem`]s. Rendering is pure: no I/O, no clock, no randomness, and
//! it cannot fail.
//!
//! Rules:
//! - Events are emitted at the cursor and push everything after them later.
//! - The pause directly after an event is absorbed (no double gap).
//! - Other pauses advance the cursor but are never emitted.
//! - Items never overlap: `start[i] >= start[i - 1] + duration[i - 1]`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance for floating-point cursor comparisons (seconds)
const OVERLAP_EPSILON: f64 = 1e-9;

/// Input element of a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TimelineItem {
    /// Non-speech audio (laugh, sigh, breath)
    Event {
        event_type: String,
        duration: f64,
        #[serde(default = "full_intensity")]
        intensity: f64,
    },
    /// Speech with a known duration
    Token { text: String, duration: f64 },
    /// Explicit silence
    Pause { duration: f64 },
}

fn full_intensity() -> f64 {
    1.0
}

impl TimelineItem {
    /// Event at full intensity
    pub fn event(event_type: impl Into<String>, duration: f64) -> Self {
        TimelineItem::Event {
            event_type: event_type.into(),
            duration,
            intensity: 1.0,
        }
    }

    pub fn event_with_intensity(event_type: impl Into<String>, duration: f64, intensity: f64) -> Self {
        TimelineItem::Event {
            event_type: event_type.into(),
            duration,
            intensity,
        }
    }

    pub fn token(text: impl Into<String>, duration: f64) -> Self {
        TimelineItem::Token {
            text: text.into(),
            duration,
        }
    }

    pub fn pause(duration: f64) -> Self {
        TimelineItem::Pause { duration }
    }

    pub fn duration(&self) -> f64 {
        match self {
            TimelineItem::Event { duration, .. }
            | TimelineItem::Token { duration, .. }
            | TimelineItem::Pause { duration } => *duration,
        }
    }
}

/// Kind of an emitted stream item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Event,
    Speech,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Event => "event",
            StreamKind::Speech => "speech",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-positioned audio segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamItem {
    pub kind: StreamKind,
    /// Seconds
    pub duration: f64,
    /// Seconds from timeline start
    pub start: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl StreamItem {
    /// End time in seconds
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn is_event(&self) -> bool {
        self.kind == StreamKind::Event
    }

    pub fn is_speech(&self) -> bool {
        self.kind == StreamKind::Speech
    }
}

/// Lazy renderer over a sequence of [`TimelineItem`]s
///
/// Clone before iterating to render the same timeline again.
#[derive(Debug, Clone)]
pub struct TimelineStream<I> {
    items: I,
    cursor: f64,
    pending_event: bool,
}

impl<I> TimelineStream<I> {
    /// Current cursor position in seconds
    pub fn cursor(&self) -> f64 {
        self.cursor
    }
}

impl<I> Iterator for TimelineStream<I>
where
    I: Iterator<Item = TimelineItem>,
{
    type Item = StreamItem;

    fn next(&mut self) -> Option<StreamItem> {
        for item in self.items.by_ref() {
            match item {
                TimelineItem::Event {
                    event_type,
                    duration,
                    intensity,
                } => {
                    let start = self.cursor;
                    self.cursor += duration;
                    self.pending_event = true;
                    return Some(StreamItem {
                        kind: StreamKind::Event,
                        duration,
                        start,
                        event_type: Some(event_type),
                        intensity: Some(intensity),
                        text: None,
                    });
                }
                TimelineItem::Pause { duration } => {
                    if self.pending_event {
                        self.pending_event = false;
                    } else {
                        self.cursor += duration;
                    }
                }
                TimelineItem::Token { text, duration } => {
                    let start = self.cursor;
                    self.cursor += duration;
                    self.pending_event = false;
                    return Some(StreamItem {
                        kind: StreamKind::Speech,
                        duration,
                        start,
                        event_type: None,
                        intensity: None,
                        text: Some(text),
                    });
                }
            }
        }

        None
    }
}

/// Render a timeline into positioned stream items
///
/// ```
/// use soundboard_core::timeline::{stream_timeline, TimelineItem};
///
/// let items: Vec<_> = stream_timeline(vec![
///     TimelineItem::event("laugh", 0.25),
///     TimelineItem::token("hello", 0.40),
/// ])
/// .collect();
///
/// assert_eq!(items.len(), 2);
/// assert_eq!(items[1].start, 0.25);
/// ```
pub fn stream_timeline<I>(items: I) -> TimelineStream<I::IntoIter>
where
    I: IntoIterator<Item = TimelineItem>,
{
    TimelineStream {
        items: items.into_iter(),
        cursor: 0.0,
        pending_event: false,
    }
}

/// Sum of item durations in milliseconds, rounded
pub fn total_duration_ms(items: &[StreamItem]) -> u64 {
    let seconds: f64 = items.iter().map(|item| item.duration).sum();
    (seconds * 1000.0).round().max(0.0) as u64
}

/// An item that starts before the previous one ended
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapError {
    /// Index of the offending item
    pub index: usize,
    pub start: f64,
    /// End of the previous item
    pub previous_end: f64,
}

impl fmt::Display for OverlapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Overlap detected at item {}: {} < {}",
            self.index, self.start, self.previous_end
        )
    }
}

impl std::error::Error for OverlapError {}

/// Check that no item starts before its predecessor ends
pub fn validate_no_overlap(items: &[StreamItem]) -> Result<(), OverlapError> {
    let mut cursor = 0.0;
    for (index, item) in items.iter().enumerate() {
        if item.start + OVERLAP_EPSILON < cursor {
            return Err(OverlapError {
                index,
                start: item.start,
                previous_end: cursor,
            });
        }
        cursor = item.end();
    }
    Ok(())
}

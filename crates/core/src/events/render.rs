//! Splicing event audio into speech
//!
//! Events are inserted as atomic blocks between speech samples; speech after
//! an insertion point is pushed later by exactly the event's length. Events
//! are an optional layer: a missing adapter, no events, a sample rate
//! mismatch, or an unknown event type all leave speech untouched.
//!
//! Insertion points use a proportional mapping of `start_time` onto the
//! speech buffer, not word alignment.

use super::adapter::AudioEventAdapter;
use crate::ducking::DuckingProcessor;
use crate::graph::{ControlGraph, ParalinguisticEvent};
use std::collections::VecDeque;

fn sorted_events(graph: &ControlGraph) -> Vec<ParalinguisticEvent> {
    let mut events = graph.events.clone();
    events.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    events
}

fn events_apply<'a>(
    graph: &ControlGraph,
    adapter: Option<&'a AudioEventAdapter>,
    sample_rate: u32,
) -> Option<&'a AudioEventAdapter> {
    let adapter = adapter?;
    if graph.events.is_empty() {
        return None;
    }
    if adapter.sample_rate() != sample_rate {
        tracing::warn!(
            "Sample rate mismatch: adapter={}, speech={}. Skipping events.",
            adapter.sample_rate(),
            sample_rate
        );
        return None;
    }
    Some(adapter)
}

/// Sample offset at which an event is spliced into `len` samples of speech
fn insertion_offset(start_time: f64, len: usize, sample_rate: u32) -> usize {
    let total_seconds = len as f64 / sample_rate as f64;
    if total_seconds <= 0.0 || start_time <= 0.0 {
        return 0;
    }
    let offset = (start_time / total_seconds * len as f64) as usize;
    offset.min(len)
}

/// Render full speech with every resolvable event spliced in
///
/// Events carrying a ducking envelope shape the speech segment that directly
/// follows them.
pub fn render_timeline_with_events(
    graph: &ControlGraph,
    speech_pcm: Vec<f32>,
    adapter: Option<&AudioEventAdapter>,
    sample_rate: u32,
) -> Vec<f32> {
    let Some(adapter) = events_apply(graph, adapter, sample_rate) else {
        return speech_pcm;
    };

    let len = speech_pcm.len();
    let mut processor = DuckingProcessor::new(sample_rate);
    let mut output: Vec<f32> = Vec::with_capacity(len);
    let mut position = 0usize;
    let mut inserted = 0usize;

    for event in sorted_events(graph) {
        let Some(event_pcm) = adapter.render(&event) else {
            continue;
        };

        let insert = insertion_offset(event.start_time, len, sample_rate).max(position);
        if insert > position {
            let segment = processor.process_speech(speech_pcm[position..insert].to_vec());
            output.extend_from_slice(&segment);
        }

        output.extend_from_slice(&event_pcm);
        processor.set_ducking(event.ducking);
        position = insert;
        inserted += 1;
    }

    if inserted == 0 {
        return speech_pcm;
    }

    if position < len {
        let rest = processor.process_speech(speech_pcm[position..].to_vec());
        output.extend_from_slice(&rest);
    }

    tracing::debug!(
        events = inserted,
        speech_samples = len,
        output_samples = output.len(),
        "rendered timeline with events"
    );
    output
}

/// Streaming splice over speech chunks
///
/// Yields events starting at 0 first, then every speech chunk in order, then
/// the remaining events. Coarser than [`render_timeline_with_events`]: it
/// cannot place events mid-stream without buffering all speech.
pub struct EventStream<'a, I> {
    adapter: Option<&'a AudioEventAdapter>,
    leading: VecDeque<ParalinguisticEvent>,
    speech: I,
    speech_done: bool,
    trailing: VecDeque<ParalinguisticEvent>,
    processor: DuckingProcessor,
}

impl<'a, I> EventStream<'a, I> {
    fn next_event(&mut self, leading: bool) -> Option<Vec<f32>> {
        let adapter = self.adapter?;
        loop {
            let queue = if leading {
                &mut self.leading
            } else {
                &mut self.trailing
            };
            let event = queue.pop_front()?;
            if let Some(pcm) = adapter.render(&event) {
                self.processor.set_ducking(event.ducking);
                return Some(pcm.to_vec());
            }
        }
    }
}

impl<'a, I> Iterator for EventStream<'a, I>
where
    I: Iterator<Item = Vec<f32>>,
{
    type Item = Vec<f32>;

    fn next(&mut self) -> Option<Vec<f32>> {
        if let Some(pcm) = self.next_event(true) {
            return Some(pcm);
        }

        if !self.speech_done {
            match self.speech.next() {
                Some(chunk) => return Some(self.processor.process_speech(chunk)),
                None => self.speech_done = true,
            }
        }

        self.next_event(false)
    }
}

/// Interleave event audio with a stream of speech chunks
pub fn stream_timeline_with_events<'a, I>(
    graph: &ControlGraph,
    speech_chunks: I,
    adapter: Option<&'a AudioEventAdapter>,
    sample_rate: u32,
) -> EventStream<'a, I::IntoIter>
where
    I: IntoIterator<Item = Vec<f32>>,
{
    let adapter = events_apply(graph, adapter, sample_rate);

    let (leading, trailing): (VecDeque<_>, VecDeque<_>) = match adapter {
        Some(_) => sorted_events(graph)
            .into_iter()
            .partition(|event| event.start_time <= 0.0),
        None => (VecDeque::new(), VecDeque::new()),
    };

    EventStream {
        adapter,
        leading,
        speech: speech_chunks.into_iter(),
        speech_done: false,
        trailing,
        processor: DuckingProcessor::new(sample_rate),
    }
}

//! Voice Soundboard Core - timeline synchronization and streaming synthesis
//!
//! Sits between a text compiler and a TTS backend and handles everything
//! time-related:
//!
//! - [`timeline`]: sequence events, tokens and pauses without overlap
//! - [`ducking`]: attenuate speech under paralinguistic events
//! - [`events`]: select, cache and splice pre-recorded event audio
//! - [`streaming`]: word-by-word speculative synthesis with rollback
//!
//! The compiler and backend are injected through the [`engine::Compiler`] and
//! [`engine::TtsBackend`] traits; [`engine::PlainTextCompiler`] and
//! [`engine::MockBackend`] drive the whole pipeline without a model.
//!
//! # Example
//!
//! ```
//! use soundboard_core::timeline::{stream_timeline, total_duration_ms, TimelineItem};
//!
//! let items = vec![
//!     TimelineItem::event("laugh", 0.4),
//!     TimelineItem::pause(0.2),
//!     TimelineItem::token("That's funny", 0.25),
//! ];
//!
//! let rendered: Vec<_> = stream_timeline(items).collect();
//! assert_eq!(rendered.len(), 2);
//! assert_eq!(total_duration_ms(&rendered), 650);
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod ducking;
pub mod engine;
pub mod events;
pub mod graph;
pub mod streaming;
pub mod timeline;

mod error;
pub use error::{Error, Result};

pub use config::{AudioEventsConfig, EngineConfig, SynthesizerConfig};
pub use ducking::{DuckingEnvelope, DuckingProcessor};
pub use engine::{CompileRequest, Compiler, SynthesisError, TtsBackend};
pub use events::AudioEventAdapter;
pub use graph::{ControlGraph, Paralinguistic, ParalinguisticEvent, SpeakerRef, TokenEvent};
pub use streaming::{AudioChunk, IncrementalSynthesizer, StreamBuffer, StreamStats};
pub use timeline::{stream_timeline, StreamItem, TimelineItem};

/// Initialize logging
///
/// Installs a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init() -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Voice Soundboard Core initialized");
    }
    Ok(())
}

//! Pre-recorded paralinguistic event audio
//!
//! - [`manifest`]: catalog of variants per event type, validated against files
//! - [`adapter`]: variant selection and cached decoding
//! - [`render`]: splicing event audio into speech, offline or streamed
//! - [`assets`]: QA checks for recordings

pub mod adapter;
pub mod assets;
pub mod manifest;
pub mod render;

pub use adapter::{AudioEventAdapter, EventPcm};
pub use assets::{
    generate_asset_report, validate_asset, validate_assets_directory, AssetIssue, AssetReport,
    Severity,
};
pub use manifest::{AudioEventManifest, AudioEventSpec, AudioVariant};
pub use render::{render_timeline_with_events, stream_timeline_with_events, EventStream};

//! Motion script encoding and real-time playback.
//!
//! Sparse per-axis action lists are merged into a dense table of fixed-rate
//! frames, stored on disk, and streamed back through a bounded window while a
//! wall clock selects which frame to turn into T-code.
//!
//! # File Format
//!
//! The `.srbs` (OSR script binary) format is a fixed header followed by one
//! fixed-size record per frame, all little-endian:
//!
//! ```text
//! Header (64 bytes):
//!   Frame count: u32
//!   Duration (ms): u32
//!   Interval (ms): u32
//!   Title: 24 bytes, NUL-padded
//!   Version: 8 bytes, NUL-padded
//!   Reserved: 20 bytes
//!
//! Frame records (frame_count * 8 bytes):
//!   Stroke, pitch, roll, twist: i8 each
//!   Extension: 4 bytes (surge: i8, sway: i8, 2 bytes padding)
//! ```
//!
//! A channel value of `-1` means "no command at this frame". A file whose
//! size differs from `64 + frame_count * 8` is never played.

mod clock;
mod command;
mod encoder;
mod format;
mod player;
mod store;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use command::{CommandEncoder, axis_code, protocol_value};
pub use encoder::{
    ActionTimeline, EncodeStats, EncodedScript, TimelineMerger, encode_source_set, normalize,
    quantize,
};
pub use format::{
    Channel, DecodeError, FormatError, FrameRecord, MAX_POSITION, SCRIPT_EXTENSION,
    SCRIPT_VERSION, SENTINEL, ScriptHeader, decode_frames, encode_frames,
};
pub use player::{PlaybackState, ScriptPlayer, Tick};
pub use store::FrameStore;

//! OSR Script - Fixed-rate motion script encoder and T-code player.
//!
//! This crate converts per-axis motion action lists into a compact binary
//! frame table and plays that table back in real time as T-code commands
//! for multi-axis stroker devices.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types and source document loading
//! - `script`: Binary format, timeline merging, windowed storage and playback
//!
//! # Example
//!
//! ```rust,no_run
//! use osr_script::{
//!     schema::PlayerConfig,
//!     script::{Channel, ScriptPlayer, TimelineMerger},
//! };
//!
//! // Merge actions into a 100 ms frame table
//! let mut merger = TimelineMerger::new(100).unwrap();
//! merger.push_action(Channel::Stroke, 0, 0);
//! merger.push_action(Channel::Stroke, 500, 100);
//! merger.merge().save("clip.srbs").unwrap();
//!
//! // Play it back, polling at the frame rate
//! let mut player = ScriptPlayer::open("clip.srbs", &PlayerConfig::default()).unwrap();
//! player.play();
//! while player.advance().is_active() {
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! ```

pub mod schema;
pub mod script;

// Re-export commonly used types
pub use schema::{EncoderConfig, PlayerConfig};
pub use script::{
    Channel, EncodedScript, FrameRecord, ScriptHeader, ScriptPlayer, Tick, TimelineMerger,
};

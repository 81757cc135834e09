//! Windowed frame store for reading a frame table without loading all of it.

use std::io::{self, Read, Seek, SeekFrom};

use super::format::{FrameRecord, ScriptHeader, decode_frames};
use crate::schema::{ConfigError, check_window_length};

/// Serves frame records through a bounded in-memory window.
///
/// A request outside the current window re-anchors the window at the
/// requested frame and refills it with one positioned read. Storage problems
/// never reach the caller: any slot the read could not fill holds
/// [`FrameRecord::EMPTY`].
///
/// Usage:
/// ```ignore
/// let mut store = FrameStore::new(File::open("script.srbs")?, 128)?;
/// let record = store.get(42);
/// ```
pub struct FrameStore<R> {
    reader: R,
    window: Vec<FrameRecord>,
    window_start: Option<u32>,
    /// Pre-allocated read buffer, one window of raw records.
    read_buffer: Vec<u8>,
    reloads: u64,
}

impl<R: Read + Seek> FrameStore<R> {
    /// Create a store over `reader` holding `window_length` frames at a time.
    pub fn new(reader: R, window_length: usize) -> Result<Self, ConfigError> {
        check_window_length(window_length)?;
        let buffer_len = window_length
            .checked_mul(FrameRecord::SIZE)
            .ok_or(ConfigError::InvalidWindowLength)?;
        Ok(Self {
            reader,
            window: vec![FrameRecord::EMPTY; window_length],
            window_start: None,
            read_buffer: vec![0u8; buffer_len],
            reloads: 0,
        })
    }

    /// Number of frames held in memory.
    pub fn window_length(&self) -> usize {
        self.window.len()
    }

    /// First frame of the resident window, `None` before the first load.
    pub fn window_start(&self) -> Option<u32> {
        self.window_start
    }

    pub fn is_loaded(&self) -> bool {
        self.window_start.is_some()
    }

    /// How many times the window has been refilled.
    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    /// Whether `frame_index` is currently resident.
    pub fn contains(&self, frame_index: u32) -> bool {
        match self.window_start {
            Some(start) => {
                frame_index >= start && ((frame_index - start) as usize) < self.window.len()
            }
            None => false,
        }
    }

    /// Record for `frame_index`, refilling the window on a miss.
    pub fn get(&mut self, frame_index: u32) -> FrameRecord {
        if !self.contains(frame_index) {
            self.reload(frame_index);
        }
        match self.window_start {
            Some(start) => self.window[(frame_index - start) as usize],
            None => FrameRecord::EMPTY,
        }
    }

    /// Anchor the window at `start` and refill it from storage.
    pub fn reload(&mut self, start: u32) {
        self.window_start = Some(start);
        self.reloads += 1;

        let offset = ScriptHeader::SIZE as u64 + start as u64 * FrameRecord::SIZE as u64;
        let bytes_read = match self.reader.seek(SeekFrom::Start(offset)) {
            Ok(_) => read_up_to(&mut self.reader, &mut self.read_buffer),
            Err(e) => {
                log::warn!("Seek to byte {} failed: {}", offset, e);
                0
            }
        };

        let decoded = decode_frames(&self.read_buffer[..bytes_read], &mut self.window);
        self.window[decoded..].fill(FrameRecord::EMPTY);

        if decoded < self.window.len() {
            log::debug!(
                "Window at frame {}: {} of {} frames read, rest left empty",
                start,
                decoded,
                self.window.len()
            );
        } else {
            log::debug!("Window at frame {} loaded", start);
        }
    }

    /// Give back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Read until `buf` is full, end of input, or an error. Returns bytes read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Frame read failed after {} bytes: {}", filled, e);
                break;
            }
        }
    }
    filled
}

//! Timeline merger that turns sparse per-axis actions into a frame table.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::format::{
    Channel, FormatError, FrameRecord, MAX_POSITION, SCRIPT_VERSION, SENTINEL, ScriptHeader,
    decode_frames, encode_frames,
};
use crate::schema::{ConfigError, EncoderConfig, SourceDocument, SourceSet, infer_channel};

/// Frame index a timestamp lands on: `ceil(t / interval)`.
#[inline]
pub fn quantize(at_ms: u32, interval_ms: u32) -> u32 {
    at_ms.div_ceil(interval_ms)
}

/// Scale a raw position onto `0..=100`.
pub fn normalize(raw_pos: i64, max_pos: i64) -> i8 {
    if max_pos <= 0 {
        return 0;
    }
    let scaled = (raw_pos as f64 / max_pos as f64 * 100.0).round();
    scaled.clamp(0.0, MAX_POSITION as f64) as i8
}

/// Actions for one channel, kept in the order they were supplied.
#[derive(Debug, Clone, Default)]
pub struct ActionTimeline {
    actions: Vec<(u32, i64)>,
}

impl ActionTimeline {
    pub fn push(&mut self, at_ms: u32, raw_pos: i64) {
        self.actions.push((at_ms, raw_pos));
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// `(timestamp_ms, raw_pos)` pairs in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, i64)> + '_ {
        self.actions.iter().copied()
    }
}

/// Merges per-channel timelines into one fixed-interval frame table.
///
/// Actions are applied in the order they are pushed. When two actions of the
/// same channel quantize to the same frame, the one pushed last wins,
/// whatever their timestamps. Titles follow the same rule.
///
/// Usage:
/// ```
/// use osr_script::script::{Channel, TimelineMerger};
///
/// let mut merger = TimelineMerger::new(100).unwrap();
/// merger.push_action(Channel::Stroke, 0, 0);
/// merger.push_action(Channel::Stroke, 500, 100);
/// let script = merger.merge();
/// assert_eq!(script.header.frame_count, 6);
/// assert_eq!(script.frames[5].stroke, 100);
/// ```
#[derive(Debug, Clone)]
pub struct TimelineMerger {
    interval_ms: u32,
    timelines: [ActionTimeline; 6],
    title: Option<String>,
    max_pos: i64,
    max_time_ms: u32,
}

impl TimelineMerger {
    /// Create a merger producing frames every `interval_ms` milliseconds.
    pub fn new(interval_ms: u32) -> Result<Self, ConfigError> {
        if interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(Self {
            interval_ms,
            timelines: Default::default(),
            title: None,
            max_pos: 0,
            max_time_ms: 0,
        })
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Largest raw position seen on any channel.
    pub fn max_pos(&self) -> i64 {
        self.max_pos
    }

    /// Largest timestamp seen on any channel.
    pub fn max_time_ms(&self) -> u32 {
        self.max_time_ms
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Replace the title; the last call wins.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn timeline(&self, channel: Channel) -> Option<&ActionTimeline> {
        channel.index().map(|i| &self.timelines[i])
    }

    /// Queue one action.
    ///
    /// Returns false if the action was dropped: `Unknown` channel, negative
    /// timestamp, or a timestamp too large for the header.
    pub fn push_action(&mut self, channel: Channel, at_ms: i64, raw_pos: i64) -> bool {
        let Some(slot) = channel.index() else {
            return false;
        };
        let at = match u32::try_from(at_ms) {
            Ok(at) if at < u32::MAX => at,
            _ => {
                log::warn!("Dropping {} action with timestamp {} ms", channel, at_ms);
                return false;
            }
        };

        self.max_time_ms = self.max_time_ms.max(at);
        self.max_pos = self.max_pos.max(raw_pos);
        self.timelines[slot].push(at, raw_pos);
        true
    }

    /// Queue every action of a source document for `channel`.
    ///
    /// `Unknown` sources are skipped entirely, title included. Returns the
    /// number of actions accepted.
    pub fn add_source(&mut self, channel: Channel, doc: &SourceDocument) -> usize {
        if channel == Channel::Unknown {
            return 0;
        }

        let accepted = doc
            .actions
            .iter()
            .filter(|a| self.push_action(channel, a.at, a.pos))
            .count();

        if let Some(title) = doc.title() {
            self.set_title(title);
        }
        log::info!(
            "{}: {} action(s), duration: {:?}, title: {:?}",
            channel,
            accepted,
            doc.duration(),
            doc.title()
        );
        accepted
    }

    /// Number of frames the merged table will hold.
    pub fn frame_count(&self) -> u32 {
        quantize(self.max_time_ms, self.interval_ms) + 1
    }

    /// Produce the header and dense frame table.
    pub fn merge(&self) -> EncodedScript {
        let frame_count = self.frame_count();
        let mut frames = vec![FrameRecord::EMPTY; frame_count as usize];

        for (channel, timeline) in Channel::ALL.iter().zip(self.timelines.iter()) {
            for (at, raw_pos) in timeline.iter() {
                let index = quantize(at, self.interval_ms) as usize;
                frames[index].set(*channel, normalize(raw_pos, self.max_pos));
            }
        }

        let header = ScriptHeader {
            frame_count,
            duration_ms: self.max_time_ms,
            interval_ms: self.interval_ms,
            title: self.title.clone().unwrap_or_default(),
            version: SCRIPT_VERSION.to_string(),
        };
        log::debug!("Merged script: {}", header);

        EncodedScript { header, frames }
    }
}

/// A complete script: header plus frame table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedScript {
    pub header: ScriptHeader,
    pub frames: Vec<FrameRecord>,
}

impl EncodedScript {
    /// Total serialized size in bytes.
    pub fn byte_len(&self) -> u64 {
        ScriptHeader::SIZE as u64 + (self.frames.len() * FrameRecord::SIZE) as u64
    }

    /// Serialize header then frame table.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.header.write_to(w)?;
        w.write_all(&encode_frames(&self.frames))?;
        Ok(())
    }

    /// Create `path` and write the script to it.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<EncodeStats> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;

        Ok(EncodeStats::from_script(self))
    }

    /// Load and validate a whole script.
    pub fn read_from<R: Read + Seek>(r: &mut R) -> Result<Self, FormatError> {
        let file_len = r.seek(SeekFrom::End(0))?;
        r.seek(SeekFrom::Start(0))?;

        let header = ScriptHeader::read_from(r)?;
        header.validate_layout(file_len)?;

        let mut bytes = vec![0u8; header.frame_count as usize * FrameRecord::SIZE];
        r.read_exact(&mut bytes)?;
        let mut frames = vec![FrameRecord::EMPTY; header.frame_count as usize];
        decode_frames(&bytes, &mut frames);

        Ok(Self { header, frames })
    }

    /// Open and validate a script file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let mut file = File::open(path)?;
        Self::read_from(&mut file)
    }
}

/// Statistics from an encoding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeStats {
    /// Frames in the table.
    pub frame_count: u32,
    /// Frames carrying at least one command.
    pub commanded_frames: u32,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Channels with at least one command.
    pub channels: Vec<Channel>,
}

impl EncodeStats {
    pub fn from_script(script: &EncodedScript) -> Self {
        let commanded_frames = script.frames.iter().filter(|f| !f.is_empty()).count() as u32;
        let channels = Channel::ALL
            .iter()
            .copied()
            .filter(|&c| script.frames.iter().any(|f| f.get(c) != SENTINEL))
            .collect();

        Self {
            frame_count: script.header.frame_count,
            commanded_frames,
            total_bytes: script.byte_len(),
            channels,
        }
    }
}

impl std::fmt::Display for EncodeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels: Vec<String> = self.channels.iter().map(|c| c.to_string()).collect();
        write!(
            f,
            "{} frames ({} with commands), {} bytes total, channels: [{}]",
            self.frame_count,
            self.commanded_frames,
            self.total_bytes,
            channels.join(", ")
        )
    }
}

/// Encode a discovered source set into a script file.
///
/// Documents that cannot be read or parsed, and documents whose channel
/// cannot be inferred, are skipped. Failing to create or write the output
/// is an error.
pub fn encode_source_set(
    set: &SourceSet,
    config: &EncoderConfig,
) -> io::Result<(PathBuf, EncodeStats)> {
    let mut merger = TimelineMerger::new(config.interval_ms)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    for path in &set.paths {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let channel = infer_channel(&file_name, &set.base_name);
        if channel == Channel::Unknown {
            log::debug!("Skipping {}: no channel matches", path.display());
            continue;
        }

        match SourceDocument::load(path) {
            Ok(doc) => {
                merger.add_source(channel, &doc);
            }
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    let script = merger.merge();
    let out_path = match &config.output_dir {
        Some(dir) => dir.join(set.output_file_name()),
        None => PathBuf::from(set.output_file_name()),
    };
    let stats = script.save(&out_path)?;
    log::info!("Saved {} ({})", out_path.display(), stats);

    Ok((out_path, stats))
}

//! Real-time script player mapping elapsed time to frame commands.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::clock::{Clock, MonotonicClock};
use super::command::CommandEncoder;
use super::format::{FormatError, ScriptHeader};
use super::store::FrameStore;
use crate::schema::{ConfigError, PlayerConfig, is_playback_interval};

/// Current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Paused,
    Playing,
}

/// Outcome of one poll of the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// A new frame was reached. Empty when the frame commands nothing.
    Command(String),
    /// Still on the last emitted frame.
    Unchanged,
    Paused,
    Stopped,
    /// Ran past the last frame; the player has stopped and rewound.
    Finished,
    /// The script failed validation and cannot be played.
    Invalid,
}

impl Tick {
    /// Text reported for unplayable scripts.
    pub const INVALID_MESSAGE: &'static str = "Invalid script.";

    /// Command text for this tick; empty unless a command or an error is reported.
    pub fn text(&self) -> &str {
        match self {
            Tick::Command(command) => command.as_str(),
            Tick::Invalid => Self::INVALID_MESSAGE,
            _ => "",
        }
    }

    /// State of the player after this tick.
    pub fn state(&self) -> PlaybackState {
        match self {
            Tick::Command(_) | Tick::Unchanged => PlaybackState::Playing,
            Tick::Paused => PlaybackState::Paused,
            Tick::Stopped | Tick::Finished | Tick::Invalid => PlaybackState::Stopped,
        }
    }

    /// Whether the caller should keep polling.
    pub fn is_active(&self) -> bool {
        self.state() != PlaybackState::Stopped
    }
}

/// Plays an encoded script against a clock.
///
/// The player never sleeps. The caller polls [`advance`](Self::advance) at or
/// above the script's frame rate; each poll works out which frame the clock
/// has reached and returns its command once.
///
/// Usage:
/// ```ignore
/// let mut player = ScriptPlayer::open("script.srbs", &PlayerConfig::default())?;
/// player.play();
/// loop {
///     let tick = player.advance();
///     if !tick.is_active() {
///         break;
///     }
///     link.write_all(tick.text().as_bytes())?;
///     std::thread::sleep(Duration::from_millis(player.interval_ms() as u64));
/// }
/// ```
pub struct ScriptPlayer<R, C = MonotonicClock> {
    /// `None` when the script failed validation.
    store: Option<FrameStore<R>>,
    header: ScriptHeader,
    validation_error: Option<FormatError>,
    encoder: CommandEncoder,
    clock: C,
    path: Option<PathBuf>,

    state: PlaybackState,
    interval_ms: u32,
    current_frame_pos: u32,
    start_frame_pos: u32,
    start_time_ms: Option<u64>,
    last_emitted_frame_pos: Option<u32>,
}

impl ScriptPlayer<File, MonotonicClock> {
    /// Open a script file for playback on the system clock.
    ///
    /// A missing or malformed file yields an invalid player rather than an
    /// error; only a bad `config` is rejected.
    pub fn open<P: AsRef<Path>>(path: P, config: &PlayerConfig) -> Result<Self, ConfigError> {
        Self::open_with_clock(path, config, MonotonicClock::new())
    }
}

impl<C: Clock> ScriptPlayer<File, C> {
    /// Open a script file for playback on `clock`.
    pub fn open_with_clock<P: AsRef<Path>>(
        path: P,
        config: &PlayerConfig,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut player = match File::open(path) {
            Ok(file) => Self::from_reader(file, config, clock)?,
            Err(e) => {
                config.validate()?;
                log::warn!("Cannot open {}: {}", path.display(), e);
                Self::invalid(FormatError::Io(e), config, clock)
            }
        };
        player.path = Some(path.to_path_buf());
        Ok(player)
    }
}

impl<R: Read + Seek, C: Clock> ScriptPlayer<R, C> {
    /// Validate the script in `reader` and prepare it for playback.
    pub fn from_reader(mut reader: R, config: &PlayerConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let header = match read_validated_header(&mut reader) {
            Ok(header) => header,
            Err(e) => {
                log::warn!("Script failed validation: {}", e);
                return Ok(Self::invalid(e, config, clock));
            }
        };
        log::info!("Loaded script: {}", header);

        let store = FrameStore::new(reader, config.window_length)?;
        let interval_ms = config.interval_ms.unwrap_or(header.interval_ms);

        Ok(Self {
            store: Some(store),
            header,
            validation_error: None,
            encoder: CommandEncoder::new(config.extra_axes),
            clock,
            path: None,
            state: PlaybackState::Stopped,
            interval_ms,
            current_frame_pos: 0,
            start_frame_pos: 0,
            start_time_ms: None,
            last_emitted_frame_pos: None,
        })
    }

    fn invalid(error: FormatError, config: &PlayerConfig, clock: C) -> Self {
        Self {
            store: None,
            header: ScriptHeader::default(),
            validation_error: Some(error),
            encoder: CommandEncoder::new(config.extra_axes),
            clock,
            path: None,
            state: PlaybackState::Stopped,
            interval_ms: 0,
            current_frame_pos: 0,
            start_frame_pos: 0,
            start_time_ms: None,
            last_emitted_frame_pos: None,
        }
    }

    /// Whether the script passed validation.
    pub fn is_valid(&self) -> bool {
        self.store.is_some()
    }

    /// Why the script failed validation, if it did.
    pub fn validation_error(&self) -> Option<&FormatError> {
        self.validation_error.as_ref()
    }

    pub fn header(&self) -> &ScriptHeader {
        &self.header
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current frame index.
    pub fn position(&self) -> u32 {
        self.current_frame_pos
    }

    /// Milliseconds per frame currently in effect.
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn frame_count(&self) -> u32 {
        self.header.frame_count
    }

    /// The backing frame store, `None` for invalid scripts.
    pub fn store(&self) -> Option<&FrameStore<R>> {
        self.store.as_ref()
    }

    /// Start or resume playback from the current position.
    pub fn play(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        if !store.is_loaded() {
            store.reload(self.current_frame_pos);
        }

        self.state = PlaybackState::Playing;
        self.start_frame_pos = self.current_frame_pos;
        self.start_time_ms = Some(self.clock.now_ms());
        log::debug!(
            "Playing from frame {} at {} ms/frame",
            self.current_frame_pos,
            self.interval_ms
        );
    }

    /// Freeze playback at the current position.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            log::debug!("Paused at frame {}", self.current_frame_pos);
        }
    }

    /// Stop and rewind to the first frame.
    pub fn stop(&mut self) {
        self.current_frame_pos = 0;
        self.start_frame_pos = 0;
        self.start_time_ms = None;
        self.last_emitted_frame_pos = None;
        self.state = PlaybackState::Stopped;
        log::debug!("Stopped");
    }

    /// Jump to `frame`, reloading the window there. The state is unchanged.
    pub fn set_pos(&mut self, frame: u32) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        store.reload(frame);

        self.current_frame_pos = frame;
        self.start_frame_pos = frame;
        self.last_emitted_frame_pos = None;
        if self.state == PlaybackState::Playing {
            self.start_time_ms = Some(self.clock.now_ms());
        }
    }

    /// Jump back to the first frame.
    pub fn rewind(&mut self) {
        self.set_pos(0);
    }

    /// Change the frame interval, restarting the timing reference at the
    /// current frame. Values outside `1..100000` are ignored.
    ///
    /// Returns whether the new interval was accepted.
    pub fn set_interval(&mut self, interval_ms: u32) -> bool {
        if !self.is_valid() {
            return false;
        }
        if !is_playback_interval(interval_ms) {
            log::warn!("Ignoring interval {} ms", interval_ms);
            return false;
        }
        self.interval_ms = interval_ms;
        self.play();
        true
    }

    /// Poll the player.
    ///
    /// While playing, the frame is derived from the time elapsed since the
    /// last play or retime, so irregular polling never drifts.
    pub fn advance(&mut self) -> Tick {
        if !self.is_valid() {
            return Tick::Invalid;
        }
        match self.state {
            PlaybackState::Stopped => return Tick::Stopped,
            PlaybackState::Paused => return Tick::Paused,
            PlaybackState::Playing => {}
        }

        let now = self.clock.now_ms();
        let start = *self.start_time_ms.get_or_insert(now);
        let elapsed_frames = now.saturating_sub(start) / self.interval_ms as u64;
        let frame = elapsed_frames + self.start_frame_pos as u64;

        if frame > self.header.frame_count as u64 {
            log::debug!("Reached end at frame {}", frame);
            self.stop();
            return Tick::Finished;
        }

        let frame = frame as u32;
        self.current_frame_pos = frame;
        if self.last_emitted_frame_pos == Some(frame) {
            return Tick::Unchanged;
        }
        self.last_emitted_frame_pos = Some(frame);

        let record = match self.store.as_mut() {
            Some(store) => store.get(frame),
            None => return Tick::Invalid,
        };
        Tick::Command(self.encoder.encode(&record))
    }
}

/// Read the header and check it against the size of the stream.
fn read_validated_header<R: Read + Seek>(reader: &mut R) -> Result<ScriptHeader, FormatError> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;
    let header = ScriptHeader::read_from(reader)?;
    header.validate_layout(file_len)?;
    Ok(header)
}

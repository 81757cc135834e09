//! Binary format definitions for OSR script (`.srbs`) files.

use std::fmt;
use std::io::{self, Read, Write};

/// File extension used for encoded scripts.
pub const SCRIPT_EXTENSION: &str = "srbs";

/// Version string written by this encoder.
pub const SCRIPT_VERSION: &str = "V1.0";

/// Channel value meaning "no motion command at this frame".
pub const SENTINEL: i8 = -1;

/// Largest normalized channel position.
pub const MAX_POSITION: i8 = 100;

/// Errors from the pure header codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Header truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Structural problems that make a script unplayable.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Invalid header: {0}")]
    Header(#[from] DecodeError),
    #[error("File size mismatch: header implies {expected} bytes, file has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("Header interval must be positive")]
    ZeroInterval,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One controllable motion axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Stroke,
    Pitch,
    Roll,
    Twist,
    Surge,
    Sway,
    /// Unrecognized source; never encoded.
    Unknown,
}

impl Channel {
    /// The six encodable channels, in table order.
    pub const ALL: [Channel; 6] = [
        Channel::Stroke,
        Channel::Pitch,
        Channel::Roll,
        Channel::Twist,
        Channel::Surge,
        Channel::Sway,
    ];

    /// Slot of this channel in per-channel arrays, `None` for `Unknown`.
    pub fn index(self) -> Option<usize> {
        match self {
            Channel::Stroke => Some(0),
            Channel::Pitch => Some(1),
            Channel::Roll => Some(2),
            Channel::Twist => Some(3),
            Channel::Surge => Some(4),
            Channel::Sway => Some(5),
            Channel::Unknown => None,
        }
    }

    /// Whether the channel lives in the record's extension bytes.
    pub fn is_extension(self) -> bool {
        matches!(self, Channel::Surge | Channel::Sway)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Stroke => "stroke",
            Channel::Pitch => "pitch",
            Channel::Roll => "roll",
            Channel::Twist => "twist",
            Channel::Surge => "surge",
            Channel::Sway => "sway",
            Channel::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// File header for OSR script files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptHeader {
    /// Total number of frame records following the header.
    pub frame_count: u32,
    /// Nominal playback duration in milliseconds.
    pub duration_ms: u32,
    /// Nominal milliseconds between frames.
    pub interval_ms: u32,
    /// Script title (at most 23 bytes are stored).
    pub title: String,
    /// Format version string (at most 7 bytes are stored).
    pub version: String,
}

impl ScriptHeader {
    /// Size of header in bytes.
    /// Frame(4) + Duration(4) + Interval(4) + Title(24) + Version(8) + Reserved(20) = 64
    pub const SIZE: usize = 64;

    const TITLE_OFFSET: usize = 12;
    const TITLE_LEN: usize = 24;
    const VERSION_OFFSET: usize = 36;
    const VERSION_LEN: usize = 8;

    /// Encode into the fixed little-endian layout.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.frame_count.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.duration_ms.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.interval_ms.to_le_bytes());
        write_fixed_str(
            &mut bytes[Self::TITLE_OFFSET..Self::TITLE_OFFSET + Self::TITLE_LEN],
            &self.title,
        );
        write_fixed_str(
            &mut bytes[Self::VERSION_OFFSET..Self::VERSION_OFFSET + Self::VERSION_LEN],
            &self.version,
        );
        // Reserved bytes stay zero
        bytes
    }

    /// Decode from the fixed layout. Extra trailing bytes are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < Self::SIZE {
            return Err(DecodeError::Truncated {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }

        let u32_at =
            |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        Ok(Self {
            frame_count: u32_at(0),
            duration_ms: u32_at(4),
            interval_ms: u32_at(8),
            title: read_fixed_str(&bytes[Self::TITLE_OFFSET..Self::TITLE_OFFSET + Self::TITLE_LEN]),
            version: read_fixed_str(
                &bytes[Self::VERSION_OFFSET..Self::VERSION_OFFSET + Self::VERSION_LEN],
            ),
        })
    }

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.encode())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        let mut buf = [0u8; Self::SIZE];
        let mut filled = 0;
        while filled < Self::SIZE {
            match r.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FormatError::Io(e)),
            }
        }
        Ok(Self::decode(&buf[..filled])?)
    }

    /// Total file size implied by `frame_count`.
    pub fn expected_file_len(&self) -> u64 {
        Self::SIZE as u64 + self.frame_count as u64 * FrameRecord::SIZE as u64
    }

    /// Check the header against the actual size of the file it came from.
    pub fn validate_layout(&self, file_len: u64) -> Result<(), FormatError> {
        let expected = self.expected_file_len();
        if expected != file_len {
            return Err(FormatError::SizeMismatch {
                expected,
                actual: file_len,
            });
        }
        if self.interval_ms == 0 {
            return Err(FormatError::ZeroInterval);
        }
        Ok(())
    }
}

impl fmt::Display for ScriptHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame: {}  duration: {}  interval: {}  title: {}  version: {}",
            self.frame_count, self.duration_ms, self.interval_ms, self.title, self.version
        )
    }
}

/// Copy `s` into a NUL-padded field, keeping at least one terminator.
fn write_fixed_str(field: &mut [u8], s: &str) {
    let capacity = field.len().saturating_sub(1);
    let mut end = s.len().min(capacity);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].copy_from_slice(&s.as_bytes()[..end]);
    field[end..].fill(0);
}

/// Read a NUL-padded field without looking past its width.
fn read_fixed_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// One quantized time-slice of every channel.
///
/// The four primary channels are stored directly. The trailing four bytes are
/// an extension block that older writers treat as a reserved `i32` and newer
/// ones as `surge, sway` followed by two padding bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    pub stroke: i8,
    pub pitch: i8,
    pub roll: i8,
    pub twist: i8,
    /// Raw extension bytes.
    pub ext: [u8; 4],
}

impl Default for FrameRecord {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl FrameRecord {
    /// Size of one record in bytes.
    pub const SIZE: usize = 8;

    /// Record with no command on any channel (every byte `0xFF`).
    pub const EMPTY: FrameRecord = FrameRecord {
        stroke: SENTINEL,
        pitch: SENTINEL,
        roll: SENTINEL,
        twist: SENTINEL,
        ext: [0xFF; 4],
    };

    /// Extension block viewed as a reserved little-endian integer.
    pub fn as_reserved(&self) -> i32 {
        i32::from_le_bytes(self.ext)
    }

    /// Extension block viewed as `(surge, sway)`.
    pub fn as_extra_channels(&self) -> (i8, i8) {
        (self.ext[0] as i8, self.ext[1] as i8)
    }

    /// Value of a channel; `Unknown` always reads as sentinel.
    pub fn get(&self, channel: Channel) -> i8 {
        match channel {
            Channel::Stroke => self.stroke,
            Channel::Pitch => self.pitch,
            Channel::Roll => self.roll,
            Channel::Twist => self.twist,
            Channel::Surge => self.ext[0] as i8,
            Channel::Sway => self.ext[1] as i8,
            Channel::Unknown => SENTINEL,
        }
    }

    /// Set a channel value. Padding bytes are left untouched.
    pub fn set(&mut self, channel: Channel, value: i8) {
        match channel {
            Channel::Stroke => self.stroke = value,
            Channel::Pitch => self.pitch = value,
            Channel::Roll => self.roll = value,
            Channel::Twist => self.twist = value,
            Channel::Surge => self.ext[0] = value as u8,
            Channel::Sway => self.ext[1] = value as u8,
            Channel::Unknown => {}
        }
    }

    /// True when no channel carries a command.
    pub fn is_empty(&self) -> bool {
        Channel::ALL.iter().all(|&c| self.get(c) == SENTINEL)
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        [
            self.stroke as u8,
            self.pitch as u8,
            self.roll as u8,
            self.twist as u8,
            self.ext[0],
            self.ext[1],
            self.ext[2],
            self.ext[3],
        ]
    }

    pub fn decode(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            stroke: bytes[0] as i8,
            pitch: bytes[1] as i8,
            roll: bytes[2] as i8,
            twist: bytes[3] as i8,
            ext: [bytes[4], bytes[5], bytes[6], bytes[7]],
        }
    }
}

/// Encode a frame table to bytes.
pub fn encode_frames(frames: &[FrameRecord]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frames.len() * FrameRecord::SIZE);
    for frame in frames {
        bytes.extend_from_slice(&frame.encode());
    }
    bytes
}

/// Decode whole records from `bytes` into `output`.
///
/// Returns the number of records decoded. A trailing partial record is ignored.
pub fn decode_frames(bytes: &[u8], output: &mut [FrameRecord]) -> usize {
    let mut decoded = 0;
    for (chunk, slot) in bytes.chunks_exact(FrameRecord::SIZE).zip(output.iter_mut()) {
        let mut record = [0u8; FrameRecord::SIZE];
        record.copy_from_slice(chunk);
        *slot = FrameRecord::decode(&record);
        decoded += 1;
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_header() -> ScriptHeader {
        ScriptHeader {
            frame_count: 6,
            duration_ms: 500,
            interval_ms: 100,
            title: "Sample".to_string(),
            version: SCRIPT_VERSION.to_string(),
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample_header().encode();
        assert_eq!(bytes.len(), ScriptHeader::SIZE);
        assert_eq!(&bytes[0..4], &6u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &500u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &100u32.to_le_bytes());
        assert_eq!(&bytes[12..18], b"Sample");
        assert_eq!(bytes[18], 0);
        assert_eq!(&bytes[36..40], b"V1.0");
        assert!(bytes[44..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_header_roundtrip() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();

        let decoded = ScriptHeader::read_from(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_truncated() {
        let bytes = sample_header().encode();
        let err = ScriptHeader::decode(&bytes[..40]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                expected: 64,
                actual: 40
            }
        );

        let err = ScriptHeader::read_from(&mut Cursor::new(&bytes[..10])).unwrap_err();
        assert!(matches!(err, FormatError::Header(DecodeError::Truncated { actual: 10, .. })));
    }

    #[test]
    fn test_header_long_title_is_truncated() {
        let header = ScriptHeader {
            title: "A title that is far too long for the field".to_string(),
            version: "V1.0-extended".to_string(),
            ..sample_header()
        };
        let decoded = ScriptHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded.title.len(), 23);
        assert_eq!(decoded.title, "A title that is far too");
        assert_eq!(decoded.version, "V1.0-ex");
    }

    #[test]
    fn test_header_title_truncates_on_char_boundary() {
        let header = ScriptHeader {
            title: "é".repeat(13),
            ..sample_header()
        };
        let decoded = ScriptHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded.title, "é".repeat(11));
    }

    #[test]
    fn test_unterminated_field_stays_in_bounds() {
        let mut bytes = sample_header().encode();
        bytes[12..36].fill(b'x');
        bytes[36..44].fill(b'y');
        let decoded = ScriptHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.title, "x".repeat(24));
        assert_eq!(decoded.version, "y".repeat(8));
    }

    #[test]
    fn test_validate_layout() {
        let header = sample_header();
        assert!(header.validate_layout(64 + 6 * 8).is_ok());
        assert!(matches!(
            header.validate_layout(64 + 5 * 8),
            Err(FormatError::SizeMismatch {
                expected: 112,
                actual: 104
            })
        ));

        let zero = ScriptHeader {
            interval_ms: 0,
            ..sample_header()
        };
        assert!(matches!(
            zero.validate_layout(112),
            Err(FormatError::ZeroInterval)
        ));
    }

    #[test]
    fn test_record_layout() {
        let mut record = FrameRecord::EMPTY;
        record.set(Channel::Stroke, 10);
        record.set(Channel::Pitch, 20);
        record.set(Channel::Roll, 30);
        record.set(Channel::Twist, 40);
        record.set(Channel::Surge, 50);
        record.set(Channel::Sway, 60);

        let bytes = record.encode();
        assert_eq!(bytes, [10, 20, 30, 40, 50, 60, 0xFF, 0xFF]);
        assert_eq!(FrameRecord::decode(&bytes), record);
        assert_eq!(record.as_extra_channels(), (50, 60));
    }

    #[test]
    fn test_extension_views() {
        let record = FrameRecord::decode(&[0, 0, 0, 0, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(record.as_reserved(), 0x1234_5678);
        assert_eq!(record.as_extra_channels(), (0x78, 0x56));

        assert_eq!(FrameRecord::EMPTY.as_reserved(), -1);
        assert_eq!(FrameRecord::EMPTY.as_extra_channels(), (-1, -1));
    }

    #[test]
    fn test_empty_record() {
        assert!(FrameRecord::EMPTY.is_empty());
        assert_eq!(FrameRecord::EMPTY.encode(), [0xFF; 8]);
        assert_eq!(FrameRecord::EMPTY.get(Channel::Unknown), SENTINEL);

        let mut record = FrameRecord::EMPTY;
        record.set(Channel::Unknown, 42);
        assert!(record.is_empty());
        record.set(Channel::Sway, 0);
        assert!(!record.is_empty());
    }

    #[test]
    fn test_decode_frames_ignores_partial_tail() {
        let mut a = FrameRecord::EMPTY;
        a.set(Channel::Stroke, 5);
        let mut bytes = encode_frames(&[a, FrameRecord::EMPTY]);
        bytes.extend_from_slice(&[1, 2, 3]);

        let mut out = [FrameRecord::EMPTY; 4];
        out[2].set(Channel::Roll, 9);
        let n = decode_frames(&bytes, &mut out);
        assert_eq!(n, 2);
        assert_eq!(out[0], a);
        assert_eq!(out[1], FrameRecord::EMPTY);
        assert_eq!(out[2].roll, 9);
    }
}

//! T-code command generation from frame records.

use std::fmt::Write;

use super::format::{Channel, FrameRecord, SENTINEL};

/// Axis code and channel, in emission order.
const AXES: [(&str, Channel); 6] = [
    ("L0", Channel::Stroke),
    ("R2", Channel::Pitch),
    ("R1", Channel::Roll),
    ("R0", Channel::Twist),
    ("L1", Channel::Surge),
    ("L2", Channel::Sway),
];

/// T-code axis identifier for a channel.
pub fn axis_code(channel: Channel) -> Option<&'static str> {
    AXES.iter()
        .find(|(_, c)| *c == channel)
        .map(|(code, _)| *code)
}

/// Protocol value for a stored position: clamped to `0..=99`, scaled by 100.
pub fn protocol_value(position: i8) -> u16 {
    position.clamp(0, 99) as u16 * 100
}

/// Converts frame records into T-code command strings.
#[derive(Debug, Clone, Copy)]
pub struct CommandEncoder {
    extra_axes: bool,
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self { extra_axes: true }
    }
}

impl CommandEncoder {
    /// Create an encoder. With `extra_axes` off, surge and sway are never emitted.
    pub fn new(extra_axes: bool) -> Self {
        Self { extra_axes }
    }

    pub fn extra_axes(&self) -> bool {
        self.extra_axes
    }

    /// Append the command for `record` to `out`.
    pub fn encode_into(&self, record: &FrameRecord, out: &mut String) {
        for (code, channel) in AXES {
            if channel.is_extension() && !self.extra_axes {
                continue;
            }
            let value = record.get(channel);
            if value == SENTINEL {
                continue;
            }
            // Writing to a String cannot fail
            let _ = write!(out, "{}{:04} ", code, protocol_value(value));
        }
    }

    /// Command for `record`; empty when no channel carries a command.
    pub fn encode(&self, record: &FrameRecord) -> String {
        let mut out = String::new();
        self.encode_into(record, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(values: &[(Channel, i8)]) -> FrameRecord {
        let mut r = FrameRecord::EMPTY;
        for &(channel, value) in values {
            r.set(channel, value);
        }
        r
    }

    #[test]
    fn test_single_stroke() {
        let encoder = CommandEncoder::default();
        assert_eq!(encoder.encode(&record(&[(Channel::Stroke, 0)])), "L00000 ");
        assert_eq!(encoder.encode(&record(&[(Channel::Stroke, 42)])), "L04200 ");
    }

    #[test]
    fn test_full_position_clamps_to_9900() {
        let encoder = CommandEncoder::default();
        assert_eq!(encoder.encode(&record(&[(Channel::Stroke, 100)])), "L09900 ");
        assert_eq!(protocol_value(127), 9900);
        assert_eq!(protocol_value(-5), 0);
    }

    #[test]
    fn test_channel_order() {
        let encoder = CommandEncoder::default();
        let r = record(&[
            (Channel::Sway, 6),
            (Channel::Twist, 4),
            (Channel::Surge, 5),
            (Channel::Roll, 3),
            (Channel::Pitch, 2),
            (Channel::Stroke, 1),
        ]);
        assert_eq!(
            encoder.encode(&r),
            "L00100 R20200 R10300 R00400 L10500 L20600 "
        );
    }

    #[test]
    fn test_sentinel_channels_skipped() {
        let encoder = CommandEncoder::default();
        assert_eq!(encoder.encode(&FrameRecord::EMPTY), "");
        assert_eq!(
            encoder.encode(&record(&[(Channel::Roll, 50)])),
            "R15000 "
        );
    }

    #[test]
    fn test_extra_axes_disabled() {
        let encoder = CommandEncoder::new(false);
        assert!(!encoder.extra_axes());
        assert!(CommandEncoder::default().extra_axes());
        let r = record(&[(Channel::Stroke, 10), (Channel::Surge, 20), (Channel::Sway, 30)]);
        assert_eq!(encoder.encode(&r), "L01000 ");
    }

    #[test]
    fn test_encode_into_appends() {
        let encoder = CommandEncoder::default();
        let mut out = String::from(">");
        encoder.encode_into(&record(&[(Channel::Twist, 7)]), &mut out);
        assert_eq!(out, ">R00700 ");
    }

    #[test]
    fn test_axis_codes() {
        assert_eq!(axis_code(Channel::Stroke), Some("L0"));
        assert_eq!(axis_code(Channel::Surge), Some("L1"));
        assert_eq!(axis_code(Channel::Sway), Some("L2"));
        assert_eq!(axis_code(Channel::Twist), Some("R0"));
        assert_eq!(axis_code(Channel::Roll), Some("R1"));
        assert_eq!(axis_code(Channel::Pitch), Some("R2"));
        assert_eq!(axis_code(Channel::Unknown), None);
    }
}

//! Multi-channel EEG frames and their 24-bit wire encoding.
//!
//! The headset notifies one payload per sample: 16 channels, each a
//! big-endian 24-bit two's-complement integer. Bytes past the first 48
//! are ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of channels in one frame.
pub const CHANNEL_COUNT: usize = 16;

/// Bytes per encoded channel reading.
pub const BYTES_PER_CHANNEL: usize = 3;

/// Minimum payload length that decodes into a frame.
pub const FRAME_PAYLOAD_LEN: usize = CHANNEL_COUNT * BYTES_PER_CHANNEL;

/// Smallest value a 24-bit signed reading can hold.
pub const SAMPLE_MIN: i32 = -(1 << 23);

/// Largest value a 24-bit signed reading can hold.
pub const SAMPLE_MAX: i32 = (1 << 23) - 1;

/// Errors produced while turning bytes into a [`Frame`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    PayloadTooShort { expected: usize, actual: usize },

    #[error("channel {channel} value {value} does not fit in 24 bits")]
    ChannelOutOfRange { channel: usize, value: i32 },

    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
}

/// One decoded sample: 16 signed channel readings.
///
/// Immutable once built; every reading is within [`SAMPLE_MIN`, `SAMPLE_MAX`].
/// The default frame is all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct Frame {
    channels: [i32; CHANNEL_COUNT],
}

impl Frame {
    /// Build a frame from raw channel values, rejecting anything outside 24 bits.
    pub fn new(channels: [i32; CHANNEL_COUNT]) -> Result<Self, DecodeError> {
        if let Some((channel, &value)) = channels
            .iter()
            .enumerate()
            .find(|(_, v)| !(SAMPLE_MIN..=SAMPLE_MAX).contains(*v))
        {
            return Err(DecodeError::ChannelOutOfRange { channel, value });
        }
        Ok(Self { channels })
    }

    /// Channel readings in device order.
    pub fn channels(&self) -> &[i32; CHANNEL_COUNT] {
        &self.channels
    }

    /// Channel readings widened to `f64` for model input.
    pub fn to_f64(&self) -> [f64; CHANNEL_COUNT] {
        self.channels.map(f64::from)
    }

    /// Encode back into the 48-byte wire form.
    pub fn to_payload(&self) -> [u8; FRAME_PAYLOAD_LEN] {
        let mut payload = [0u8; FRAME_PAYLOAD_LEN];
        for (chunk, &value) in payload
            .chunks_exact_mut(BYTES_PER_CHANNEL)
            .zip(self.channels.iter())
        {
            chunk.copy_from_slice(&encode_sample(value));
        }
        payload
    }
}

impl TryFrom<Vec<i32>> for Frame {
    type Error = String;

    fn try_from(values: Vec<i32>) -> Result<Self, Self::Error> {
        let channels: [i32; CHANNEL_COUNT] = values
            .try_into()
            .map_err(|v: Vec<i32>| format!("expected {CHANNEL_COUNT} channels, got {}", v.len()))?;
        Frame::new(channels).map_err(|e| e.to_string())
    }
}

impl From<Frame> for Vec<i32> {
    fn from(frame: Frame) -> Self {
        frame.channels.to_vec()
    }
}

/// Decode the first 48 bytes of a notification payload into a frame.
///
/// Shorter payloads are rejected without side effects; the caller drops them.
pub fn decode_frame(payload: &[u8]) -> Result<Frame, DecodeError> {
    if payload.len() < FRAME_PAYLOAD_LEN {
        return Err(DecodeError::PayloadTooShort {
            expected: FRAME_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    let mut channels = [0i32; CHANNEL_COUNT];
    for (slot, bytes) in channels
        .iter_mut()
        .zip(payload[..FRAME_PAYLOAD_LEN].chunks_exact(BYTES_PER_CHANNEL))
    {
        *slot = decode_sample([bytes[0], bytes[1], bytes[2]]);
    }

    // Every 24-bit pattern maps into range, so no re-validation is needed.
    Ok(Frame { channels })
}

/// Sign-extend one big-endian 24-bit reading.
pub fn decode_sample(bytes: [u8; BYTES_PER_CHANNEL]) -> i32 {
    let raw = (i32::from(bytes[0]) << 16) | (i32::from(bytes[1]) << 8) | i32::from(bytes[2]);
    if raw >= 1 << 23 {
        raw - (1 << 24)
    } else {
        raw
    }
}

/// Encode one reading as big-endian 24-bit two's complement.
///
/// Values outside 24 bits are truncated; [`Frame::new`] guards against that.
pub fn encode_sample(value: i32) -> [u8; BYTES_PER_CHANNEL] {
    let [_, hi, mid, lo] = (value & 0x00FF_FFFF).to_be_bytes();
    [hi, mid, lo]
}

/// Parse a hex string (whitespace allowed) into payload bytes.
pub fn parse_hex_payload(hex: &str) -> Result<Vec<u8>, DecodeError> {
    let digits: Vec<char> = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(DecodeError::InvalidHex(format!(
            "odd number of hex digits ({})",
            digits.len()
        )));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let s: String = pair.iter().collect();
            u8::from_str_radix(&s, 16).map_err(|_| DecodeError::InvalidHex(s))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Frame {
        let mut channels = [0i32; CHANNEL_COUNT];
        channels[0] = 100;
        channels[1] = -50;
        channels[15] = SAMPLE_MIN;
        channels[14] = SAMPLE_MAX;
        Frame::new(channels).unwrap()
    }

    #[test]
    fn test_decode_sign_extension() {
        assert_eq!(decode_sample([0x00, 0x00, 0x00]), 0);
        assert_eq!(decode_sample([0x7F, 0xFF, 0xFF]), SAMPLE_MAX);
        assert_eq!(decode_sample([0x80, 0x00, 0x00]), SAMPLE_MIN);
        assert_eq!(decode_sample([0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(decode_sample([0xFF, 0xFF, 0xCE]), -50);
    }

    #[test]
    fn test_sample_boundaries_survive_encoding() {
        for v in [SAMPLE_MIN, SAMPLE_MIN + 1, -1, 0, 1, 100, -50, SAMPLE_MAX - 1, SAMPLE_MAX] {
            assert_eq!(decode_sample(encode_sample(v)), v, "value {v}");
        }
    }

    #[test]
    fn test_decode_payload() {
        let frame = sample_frame();
        let decoded = decode_frame(&frame.to_payload()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.channels()[1], -50);
    }

    #[test]
    fn test_short_payload_rejected() {
        let err = decode_frame(&[0u8; 47]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::PayloadTooShort {
                expected: 48,
                actual: 47
            }
        );
        assert!(decode_frame(&[]).is_err());
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let frame = sample_frame();
        let mut payload = frame.to_payload().to_vec();
        payload.extend_from_slice(&[0xAB; 20]);
        assert_eq!(decode_frame(&payload).unwrap(), frame);
    }

    #[test]
    fn test_out_of_range_channel_rejected() {
        let mut channels = [0i32; CHANNEL_COUNT];
        channels[3] = SAMPLE_MAX + 1;
        assert_eq!(
            Frame::new(channels).unwrap_err(),
            DecodeError::ChannelOutOfRange {
                channel: 3,
                value: SAMPLE_MAX + 1
            }
        );
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(parse_hex_payload("00 ff 7F").unwrap(), vec![0x00, 0xFF, 0x7F]);
        assert!(matches!(parse_hex_payload("abc"), Err(DecodeError::InvalidHex(_))));
        assert!(matches!(parse_hex_payload("zz"), Err(DecodeError::InvalidHex(_))));
    }

    #[test]
    fn test_frame_serializes_as_array() {
        let frame = sample_frame();
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.starts_with("[100,-50,"));
        let back: Frame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
        assert!(serde_json::from_str::<Frame>("[1,2,3]").is_err());
    }
}

//! Binary recordings: back-to-back 48-byte payloads, no header.

use super::{CollectorError, PayloadSource};
use crate::core::frame::{Frame, FRAME_PAYLOAD_LEN};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Replays a recording one record at a time.
///
/// A trailing partial record is delivered as-is so the decoder sees it.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    data: Vec<u8>,
    offset: usize,
}

impl ReplaySource {
    pub fn open(path: &Path) -> Result<Self, CollectorError> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, offset: 0 }
    }

    /// Records still to be delivered, counting a trailing partial one.
    pub fn remaining(&self) -> usize {
        (self.data.len() - self.offset).div_ceil(FRAME_PAYLOAD_LEN)
    }
}

impl PayloadSource for ReplaySource {
    fn next_payload(&mut self) -> Option<Vec<u8>> {
        if self.offset >= self.data.len() {
            return None;
        }
        let end = (self.offset + FRAME_PAYLOAD_LEN).min(self.data.len());
        let record = self.data[self.offset..end].to_vec();
        self.offset = end;
        Some(record)
    }
}

/// Write frames as a recording that [`ReplaySource`] can play back.
///
/// Returns the number of frames written.
pub fn write_recording(
    path: &Path,
    frames: impl IntoIterator<Item = Frame>,
) -> Result<usize, CollectorError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    let mut count = 0;
    for frame in frames {
        writer.write_all(&frame.to_payload())?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{decode_frame, CHANNEL_COUNT};

    #[test]
    fn test_records_and_trailing_fragment() {
        let mut data = Frame::new([7; CHANNEL_COUNT]).unwrap().to_payload().to_vec();
        data.extend_from_slice(&[1, 2, 3]);
        let mut source = ReplaySource::from_bytes(data);
        assert_eq!(source.remaining(), 2);

        let first = source.next_payload().unwrap();
        assert_eq!(decode_frame(&first).unwrap().channels()[0], 7);

        let tail = source.next_payload().unwrap();
        assert_eq!(tail, vec![1, 2, 3]);
        assert!(decode_frame(&tail).is_err());

        assert!(source.next_payload().is_none());
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_write_then_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordings").join("session.bin");

        let frames: Vec<Frame> = (0..5)
            .map(|i| Frame::new([i * 1000 - 2000; CHANNEL_COUNT]).unwrap())
            .collect();
        assert_eq!(write_recording(&path, frames.clone()).unwrap(), 5);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 5 * 48);

        let mut source = ReplaySource::open(&path).unwrap();
        let replayed: Vec<Frame> = std::iter::from_fn(|| source.next_payload())
            .map(|p| decode_frame(&p).unwrap())
            .collect();
        assert_eq!(replayed, frames);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ReplaySource::open(&dir.path().join("nope.bin")),
            Err(CollectorError::Io(_))
        ));
    }
}

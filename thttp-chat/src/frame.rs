//! Length-prefixed framing for THTTP payloads.
//!
//! A frame is `LENGTH_SIZE` ASCII decimal digits followed by exactly that many
//! payload bytes:
//!
//! ```text
//! 00017signin / THTTP/1.1
//! ```
//!
//! Payloads longer than `10^LENGTH_SIZE - 1` bytes are clipped on encode rather
//! than rejected, so every encoded frame is self-delimiting.

use crate::error::FrameError;

/// Digit width used when no configuration overrides it.
pub const DEFAULT_LENGTH_SIZE: usize = 5;

/// Widest prefix we accept; keeps `10^n - 1` inside a `usize` on 32-bit targets.
pub const MAX_LENGTH_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    length_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_LENGTH_SIZE)
    }
}

impl FrameCodec {
    /// Creates a codec with the given prefix width.
    ///
    /// Callers validate the width through [`crate::config::ServerConfig`];
    /// out-of-range values are clamped to `1..=MAX_LENGTH_SIZE`.
    pub fn new(length_size: usize) -> Self {
        Self {
            length_size: length_size.clamp(1, MAX_LENGTH_SIZE),
        }
    }

    pub fn length_size(&self) -> usize {
        self.length_size
    }

    /// Largest payload a single frame can carry.
    pub fn max_payload(&self) -> usize {
        10usize.pow(self.length_size as u32) - 1
    }

    /// Encodes `text` into one frame, silently clipping oversized payloads.
    ///
    /// Clipping backs off to the nearest UTF-8 character boundary so the
    /// payload always decodes as text on the other side.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut end = text.len().min(self.max_payload());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let payload = &text.as_bytes()[..end];

        let mut frame = Vec::with_capacity(self.length_size + payload.len());
        frame.extend_from_slice(format!("{:0width$}", end, width = self.length_size).as_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    /// Lazily cuts a chunk into the payloads of its concatenated frames.
    pub fn split<'a>(&self, chunk: &'a [u8]) -> Frames<'a> {
        Frames {
            chunk,
            pos: 0,
            length_size: self.length_size,
            failed: false,
        }
    }

    /// Collects every payload in `chunk`, failing if any frame is malformed.
    pub fn split_all(&self, chunk: &[u8]) -> Result<Vec<String>, FrameError> {
        self.split(chunk).collect()
    }

    /// Takes every complete frame off the front of `pending`, leaving a
    /// partial trailing frame in place for a later read to finish.
    ///
    /// Fails only when the very first frame is malformed; frames before a
    /// malformed one are returned and the bad bytes stay at the front.
    pub fn drain_complete(&self, pending: &mut Vec<u8>) -> Result<Vec<String>, FrameError> {
        let mut frames = self.split(pending);
        let mut payloads = Vec::new();
        let failure = loop {
            match frames.next() {
                None => break None,
                Some(Ok(payload)) => payloads.push(payload),
                Some(Err(FrameError::MissingLength { .. } | FrameError::Truncated { .. })) => {
                    break None;
                }
                Some(Err(err)) => break Some(err),
            }
        };
        let consumed = frames.pos;
        pending.drain(..consumed);

        match failure {
            Some(err) if payloads.is_empty() => Err(err),
            _ => Ok(payloads),
        }
    }
}

/// Iterator over the payloads of a chunk. Stops after the first error.
#[derive(Debug)]
pub struct Frames<'a> {
    chunk: &'a [u8],
    pos: usize,
    length_size: usize,
    failed: bool,
}

impl Frames<'_> {
    fn next_frame(&mut self) -> Result<String, FrameError> {
        let rest = &self.chunk[self.pos..];
        if rest.len() < self.length_size {
            return Err(FrameError::MissingLength {
                expected: self.length_size,
                available: rest.len(),
            });
        }

        let (prefix, rest) = rest.split_at(self.length_size);
        let length = parse_length(prefix)?;
        if rest.len() < length {
            return Err(FrameError::Truncated {
                expected: length,
                available: rest.len(),
            });
        }

        let payload =
            std::str::from_utf8(&rest[..length]).map_err(|_| FrameError::InvalidUtf8)?;
        self.pos += self.length_size + length;
        Ok(payload.to_string())
    }
}

impl Iterator for Frames<'_> {
    type Item = Result<String, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.chunk.len() {
            return None;
        }
        let frame = self.next_frame();
        self.failed = frame.is_err();
        Some(frame)
    }
}

fn parse_length(prefix: &[u8]) -> Result<usize, FrameError> {
    let invalid = || FrameError::InvalidLength(String::from_utf8_lossy(prefix).into_owned());
    if !prefix.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(prefix)
        .ok()
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_pads_length_prefix() {
        let codec = FrameCodec::new(5);
        assert_eq!(codec.encode("hello"), b"00005hello".to_vec());
        assert_eq!(codec.encode(""), b"00000".to_vec());
    }

    #[test]
    fn encode_clips_oversized_payload() {
        let codec = FrameCodec::new(2);
        let frame = codec.encode(&"x".repeat(150));
        assert_eq!(&frame[..2], b"99");
        assert_eq!(frame.len(), 2 + 99);
    }

    #[test]
    fn encode_clips_on_char_boundary() {
        let codec = FrameCodec::new(1);
        // Nine bytes would land inside the final three-byte character.
        let frame = codec.encode("aaaaaaa€");
        assert_eq!(frame, b"7aaaaaaa".to_vec());
    }

    #[test]
    fn split_reads_concatenated_frames_in_order() {
        let codec = FrameCodec::default();
        let mut chunk = codec.encode("first");
        chunk.extend(codec.encode(""));
        chunk.extend(codec.encode("third one"));

        let payloads = codec.split_all(&chunk).expect("valid chunk");
        assert_eq!(payloads, vec!["first", "", "third one"]);
    }

    #[test]
    fn split_rejects_short_payload() {
        let codec = FrameCodec::new(5);
        let err = codec.split_all(b"00005abc").unwrap_err();
        assert_eq!(
            err,
            FrameError::Truncated {
                expected: 5,
                available: 3
            }
        );
    }

    #[test]
    fn split_rejects_short_prefix() {
        let codec = FrameCodec::new(5);
        let err = codec.split_all(b"00005hello00").unwrap_err();
        assert_eq!(
            err,
            FrameError::MissingLength {
                expected: 5,
                available: 2
            }
        );
    }

    #[test]
    fn split_rejects_non_digit_prefix() {
        let codec = FrameCodec::new(5);
        assert!(matches!(
            codec.split_all(b"+0003abc"),
            Err(FrameError::InvalidLength(_))
        ));
    }

    #[test]
    fn split_stops_after_first_error() {
        let codec = FrameCodec::new(5);
        let mut frames = codec.split(b"00002hi0000x");
        assert_eq!(frames.next(), Some(Ok("hi".to_string())));
        assert!(matches!(frames.next(), Some(Err(_))));
        assert_eq!(frames.next(), None);
    }

    #[test]
    fn drain_complete_finishes_frame_cut_across_reads() {
        let codec = FrameCodec::new(5);
        let mut stream = codec.encode("hello");
        stream.extend(codec.encode("world"));
        stream.extend(codec.encode("again"));

        let mut pending = stream[..8].to_vec();
        assert_eq!(codec.drain_complete(&mut pending), Ok(vec![]));
        assert_eq!(pending, b"00005hel".to_vec());

        pending.extend_from_slice(&stream[8..14]);
        assert_eq!(codec.drain_complete(&mut pending), Ok(vec!["hello".to_string()]));
        assert_eq!(pending, b"0000".to_vec());

        pending.extend_from_slice(&stream[14..]);
        assert_eq!(
            codec.drain_complete(&mut pending),
            Ok(vec!["world".to_string(), "again".to_string()])
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn drain_complete_reports_garbage_after_good_frames() {
        let codec = FrameCodec::new(5);
        let mut pending = codec.encode("ok");
        pending.extend_from_slice(b"abcde");

        assert_eq!(codec.drain_complete(&mut pending), Ok(vec!["ok".to_string()]));
        assert_eq!(pending, b"abcde".to_vec());
        assert!(matches!(
            codec.drain_complete(&mut pending),
            Err(FrameError::InvalidLength(_))
        ));
    }

    #[test]
    fn empty_chunk_has_no_frames() {
        assert_eq!(FrameCodec::default().split(b"").count(), 0);
    }

    proptest! {
        #[test]
        fn split_returns_every_encoded_payload(
            payloads in proptest::collection::vec("[a-z \r\n:]{0,300}", 0..12),
        ) {
            let codec = FrameCodec::new(3);
            let chunk: Vec<u8> = payloads.iter().flat_map(|p| codec.encode(p)).collect();
            let decoded = codec.split_all(&chunk).expect("concatenated frames split cleanly");
            prop_assert_eq!(decoded, payloads);
        }
    }
}

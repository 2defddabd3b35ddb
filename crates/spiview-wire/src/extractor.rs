// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Incremental extraction of mirrored SPI messages.

use thiserror::Error;

/// Marker written before every mirrored payload.
pub const PREFIX: &[u8] = b"Sending SPI message: ";
/// Marker written after every mirrored payload.
pub const SUFFIX: &[u8] = b"SPI message end";
/// Default cap on bytes retained while waiting for a suffix.
pub const DEFAULT_MAX_BUFFER: usize = 64 * 1024;

// Enough trailing bytes to hold a prefix that has not fully arrived yet.
const PARTIAL_PREFIX: usize = PREFIX.len() - 1;

/// The retained buffer grew past its cap without a matching suffix and bytes
/// were dropped to resynchronize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("framing overflow: dropped {dropped} bytes without a message end ({retained} retained)")]
pub struct FramingOverflow {
    /// Bytes discarded by the resync.
    pub dropped: usize,
    /// Bytes still buffered afterwards.
    pub retained: usize,
}

/// Result of one [`FrameExtractor::feed`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Complete payloads, in stream order.
    pub messages: Vec<Vec<u8>>,
    /// Set when this call had to drop bytes.
    pub overflow: Option<FramingOverflow>,
}

/// Running counters for an extractor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FramingStats {
    /// Payloads emitted.
    pub messages: u64,
    /// Log text skipped between messages.
    pub noise_bytes: u64,
    /// Resync events.
    pub overflows: u64,
    /// Bytes dropped by resyncs.
    pub overflow_bytes: u64,
}

/// Stateful extractor: feed it arbitrary chunks, get back whole payloads.
///
/// A payload split across any number of `feed` calls is reassembled; nothing
/// is ever emitted partially. The retained buffer is capped at `max_buffer`
/// bytes. On overflow the oldest unterminated message is abandoned in favor of
/// the newest prefix seen, or, if there is none, everything but a possible
/// partial prefix is dropped.
#[derive(Debug)]
pub struct FrameExtractor {
    buf: Vec<u8>,
    max_buffer: usize,
    stats: FramingStats,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

impl FrameExtractor {
    /// Extractor with [`DEFAULT_MAX_BUFFER`].
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    /// Extractor with a custom cap. The cap never goes below one empty framed
    /// message.
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_buffer: max_buffer.max(PREFIX.len() + SUFFIX.len()),
            stats: FramingStats::default(),
        }
    }

    /// Effective buffer cap.
    pub fn max_buffer(&self) -> usize {
        self.max_buffer
    }

    /// Bytes currently retained.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Counters since construction.
    pub fn stats(&self) -> FramingStats {
        self.stats
    }

    /// Drop everything retained.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Append `chunk` and extract every complete message now available.
    pub fn feed(&mut self, chunk: &[u8]) -> Feed {
        self.buf.extend_from_slice(chunk);
        let mut feed = Feed::default();
        let mut pos = 0;

        loop {
            let Some(start) = find(&self.buf[pos..], PREFIX).map(|i| pos + i) else {
                // No prefix: all but a possible partial prefix is log noise.
                let keep_from = self.buf.len().saturating_sub(PARTIAL_PREFIX).max(pos);
                self.stats.noise_bytes += (keep_from - pos) as u64;
                pos = keep_from;
                break;
            };
            self.stats.noise_bytes += (start - pos) as u64;
            let body = start + PREFIX.len();
            let Some(len) = find(&self.buf[body..], SUFFIX) else {
                pos = start;
                break;
            };
            feed.messages.push(self.buf[body..body + len].to_vec());
            pos = body + len + SUFFIX.len();
        }

        self.buf.drain(..pos);
        self.stats.messages += feed.messages.len() as u64;
        if self.buf.len() > self.max_buffer {
            feed.overflow = Some(self.resync());
        }
        feed
    }

    // Buffer starts with an unterminated prefix here.
    fn resync(&mut self) -> FramingOverflow {
        let len = self.buf.len();
        let latest = self
            .buf
            .get(1..)
            .and_then(|rest| rfind(rest, PREFIX))
            .map(|i| i + 1);
        let cut = match latest {
            Some(at) if len - at <= self.max_buffer => at,
            _ => len.saturating_sub(PARTIAL_PREFIX),
        };
        self.buf.drain(..cut);
        self.stats.overflows += 1;
        self.stats.overflow_bytes += cut as u64;
        FramingOverflow {
            dropped: cut,
            retained: self.buf.len(),
        }
    }
}

/// Wrap `payload` the way the firmware mirrors it.
pub fn frame_message(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREFIX.len() + payload.len() + SUFFIX.len());
    out.extend_from_slice(PREFIX);
    out.extend_from_slice(payload);
    out.extend_from_slice(SUFFIX);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_payload_between_markers() {
        let mut ex = FrameExtractor::new();
        let feed = ex.feed(&frame_message(&[0xF0]));
        assert_eq!(feed.messages, vec![vec![0xF0]]);
        assert!(feed.overflow.is_none());
        assert_eq!(ex.buffered(), 0);
    }

    #[test]
    fn skips_log_text_between_messages() {
        let mut stream = b"SPI: Uploaded model ID 1 with 12 triangles\r\n".to_vec();
        stream.extend(frame_message(&[0xA0, 1]));
        stream.extend_from_slice(b"\r\nboot ok\r\n");
        stream.extend(frame_message(&[0xF1]));
        let mut ex = FrameExtractor::new();
        let feed = ex.feed(&stream);
        assert_eq!(feed.messages, vec![vec![0xA0, 1], vec![0xF1]]);
        assert!(ex.stats().noise_bytes > 0);
    }

    #[test]
    fn unterminated_message_is_retained() {
        let mut ex = FrameExtractor::new();
        let framed = frame_message(&[0xB0, 0x01, 0x02]);
        let split = framed.len() - 3;
        assert!(ex.feed(&framed[..split]).messages.is_empty());
        assert_eq!(ex.buffered(), split);
        assert_eq!(ex.feed(&framed[split..]).messages, vec![vec![0xB0, 0x01, 0x02]]);
    }

    #[test]
    fn prefix_split_mid_marker_is_not_lost() {
        let mut ex = FrameExtractor::new();
        let mut noisy = b"lots of unrelated console output ".to_vec();
        noisy.extend_from_slice(&PREFIX[..7]);
        assert!(ex.feed(&noisy).messages.is_empty());
        assert!(ex.buffered() <= PARTIAL_PREFIX);
        let mut rest = PREFIX[7..].to_vec();
        rest.extend_from_slice(&[0x55]);
        rest.extend_from_slice(SUFFIX);
        assert_eq!(ex.feed(&rest).messages, vec![vec![0x55]]);
    }

    #[test]
    fn empty_payload_is_emitted_as_empty_message() {
        let mut ex = FrameExtractor::new();
        assert_eq!(ex.feed(&frame_message(&[])).messages, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn payload_is_not_unescaped() {
        // A payload containing the prefix text is carried verbatim.
        let mut payload = vec![0x01];
        payload.extend_from_slice(PREFIX);
        let mut ex = FrameExtractor::new();
        assert_eq!(ex.feed(&frame_message(&payload)).messages, vec![payload]);
    }

    #[test]
    fn overflow_resyncs_to_newest_prefix() {
        let mut ex = FrameExtractor::with_max_buffer(128);
        let mut stale = PREFIX.to_vec();
        stale.extend(std::iter::repeat(0xAA).take(100));
        assert!(ex.feed(&stale).overflow.is_none());

        let mut fresh = PREFIX.to_vec();
        fresh.extend_from_slice(&[0xF0]);
        let feed = ex.feed(&fresh);
        let overflow = feed.overflow.expect("overflow");
        assert_eq!(overflow.dropped, stale.len());
        assert_eq!(overflow.retained, fresh.len());
        assert_eq!(ex.stats().overflows, 1);

        assert_eq!(ex.feed(SUFFIX).messages, vec![vec![0xF0]]);
    }

    #[test]
    fn overflow_without_second_prefix_keeps_only_a_tail() {
        let mut ex = FrameExtractor::with_max_buffer(64);
        let mut runaway = PREFIX.to_vec();
        runaway.extend(std::iter::repeat(0x00).take(200));
        let feed = ex.feed(&runaway);
        let overflow = feed.overflow.expect("overflow");
        assert_eq!(overflow.retained, PARTIAL_PREFIX);
        assert_eq!(overflow.dropped + overflow.retained, runaway.len());

        // Stream recovers with the next well-formed message.
        assert_eq!(ex.feed(&frame_message(&[0x55])).messages, vec![vec![0x55]]);
    }

    #[test]
    fn cap_never_drops_below_one_empty_frame() {
        let ex = FrameExtractor::with_max_buffer(0);
        assert_eq!(ex.max_buffer(), PREFIX.len() + SUFFIX.len());
    }
}

use std::ops::Range;

use memchr::memmem;

use crate::config::BoundsPolicy;
use crate::error::DecodeError;

/// A borrowed slice of the input, tagged with its absolute file offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Section<'a> {
    pub offset: usize,
    pub bytes: &'a [u8],
}

impl<'a> Section<'a> {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Absolute range covered by this section.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.bytes.len()
    }

    /// A sub-section, relative to the start of this one.
    ///
    /// The range is clamped to the section.
    pub fn sub(&self, range: Range<usize>) -> Section<'a> {
        let end = range.end.min(self.bytes.len());
        let start = range.start.min(end);
        Section {
            offset: self.offset + start,
            bytes: &self.bytes[start..end],
        }
    }
}

/// Forward reader over a window `[pos, end)` of the input.
///
/// Every offset the cursor hands out is absolute, so callers never do
/// their own arithmetic on relative positions. The window's end can be
/// pulled in with [`truncate`](Self::truncate); nothing past it is visible
/// afterwards.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
        }
    }

    /// Absolute offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute offset one past the last visible byte.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// The unread part of the window.
    pub fn rest(&self) -> Section<'a> {
        self.section(self.pos..self.end)
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, n: usize, what: &'static str) -> Result<Section<'a>, DecodeError> {
        if n > self.remaining() {
            return Err(self.truncated(what, n));
        }
        Ok(self.take_up_to(n))
    }

    /// Consume up to `n` bytes, fewer if the window ends first.
    pub fn take_up_to(&mut self, n: usize) -> Section<'a> {
        let n = n.min(self.remaining());
        let section = self.section(self.pos..self.pos + n);
        self.pos += n;
        section
    }

    pub fn read_u32_le(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        let b = self.take(4, what)?.bytes;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn skip(&mut self, n: usize, what: &'static str) -> Result<(), DecodeError> {
        self.take(n, what).map(|_| ())
    }

    /// The next `n` bytes without consuming them, fewer at the end.
    pub fn peek(&self, n: usize) -> Section<'a> {
        let n = n.min(self.remaining());
        self.section(self.pos..self.pos + n)
    }

    /// Distance from the cursor to the next occurrence of `needle`.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(&self.data[self.pos..self.end], needle)
    }

    /// The last `n` bytes of the window, without consuming them.
    pub fn tail(&self, n: usize, what: &'static str) -> Result<Section<'a>, DecodeError> {
        if n > self.remaining() {
            return Err(self.truncated(what, n));
        }
        Ok(self.section(self.end - n..self.end))
    }

    /// Resolve `window[-start_back..-stop_back]`, two distances back from
    /// the end of the window.
    ///
    /// Under [`BoundsPolicy::Strict`] the range must lie inside the window
    /// and `start_back >= stop_back`. Under [`BoundsPolicy::Permissive`]
    /// the indices are resolved by [`slice_signed`](Self::slice_signed),
    /// so a zero `start_back` means the start of the window.
    pub fn tail_range(
        &self,
        start_back: usize,
        stop_back: usize,
        policy: BoundsPolicy,
        what: &'static str,
    ) -> Result<Section<'a>, DecodeError> {
        match self.checked_tail(start_back, stop_back, policy, what)? {
            Some(section) => Ok(section),
            None => Ok(self.slice_signed(-signed(start_back), -signed(stop_back))),
        }
    }

    /// Resolve `window[len - start_back..len - stop_back]`, where `len` is
    /// the window length.
    ///
    /// Identical to [`tail_range`](Self::tail_range) for ranges inside the
    /// window. Under [`BoundsPolicy::Permissive`] a `start_back` past the
    /// window start gives a negative index, which counts from the end
    /// again.
    pub fn end_range(
        &self,
        start_back: usize,
        stop_back: usize,
        policy: BoundsPolicy,
        what: &'static str,
    ) -> Result<Section<'a>, DecodeError> {
        match self.checked_tail(start_back, stop_back, policy, what)? {
            Some(section) => Ok(section),
            None => {
                let len = signed(self.remaining());
                Ok(self.slice_signed(len - signed(start_back), len - signed(stop_back)))
            }
        }
    }

    /// Slice the window with signed indices relative to its start.
    ///
    /// A negative index counts back from the end of the window; indices
    /// are then clamped to the window and an inverted range is empty.
    ///
    /// ```text
    ///   window len 0x100:  slice_signed(-0x40, -0x10) → 0xC0..0xF0
    ///                      slice_signed(-0, -0x10)    → 0x00..0xF0
    ///                      slice_signed(-0x180, 0x20) → 0x00..0x20
    /// ```
    pub fn slice_signed(&self, start: i64, stop: i64) -> Section<'a> {
        let len = self.remaining();
        let start = wrap_index(start, len);
        let stop = wrap_index(stop, len).max(start);
        self.section(self.pos + start..self.pos + stop)
    }

    /// The in-window range for `[end - start_back, end - stop_back)`, or
    /// `None` when it does not fit and the policy lets the caller clamp.
    fn checked_tail(
        &self,
        start_back: usize,
        stop_back: usize,
        policy: BoundsPolicy,
        what: &'static str,
    ) -> Result<Option<Section<'a>>, DecodeError> {
        if stop_back <= start_back && start_back <= self.remaining() {
            return Ok(Some(self.section(self.end - start_back..self.end - stop_back)));
        }
        if policy == BoundsPolicy::Permissive {
            return Ok(None);
        }
        Err(DecodeError::CorruptContainer {
            offset: self.pos,
            reason: format!(
                "{what} spans {start_back:#x}..{stop_back:#x} back from {:#x}, window holds {:#x} bytes",
                self.end,
                self.remaining()
            ),
        })
    }

    /// Shrink the window to `len` bytes from the cursor.
    ///
    /// Under [`BoundsPolicy::Strict`] a `len` beyond the window is
    /// [`DecodeError::TruncatedInput`]; under [`BoundsPolicy::Permissive`]
    /// the window is left as is.
    pub fn truncate(
        &mut self,
        len: usize,
        policy: BoundsPolicy,
        what: &'static str,
    ) -> Result<(), DecodeError> {
        if len > self.remaining() {
            if policy == BoundsPolicy::Strict {
                return Err(self.truncated(what, len));
            }
            return Ok(());
        }
        self.end = self.pos + len;
        Ok(())
    }

    fn section(&self, range: Range<usize>) -> Section<'a> {
        Section {
            offset: range.start,
            bytes: &self.data[range],
        }
    }

    fn truncated(&self, what: &'static str, needed: usize) -> DecodeError {
        DecodeError::TruncatedInput {
            what,
            offset: self.pos,
            needed,
            available: self.remaining(),
        }
    }
}

fn signed(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Resolve one slice index against a window of `len` bytes.
fn wrap_index(index: i64, len: usize) -> usize {
    let len = signed(len);
    let resolved = if index < 0 { index + len } else { index };
    usize::try_from(resolved.clamp(0, len)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_tracks_absolute_offsets() {
        let data: Vec<u8> = (0..16).collect();
        let mut cursor = Cursor::new(&data);
        cursor.skip(4, "prefix").unwrap();
        let section = cursor.take(4, "word").unwrap();
        assert_eq!(section.offset, 4);
        assert_eq!(section.bytes, &[4, 5, 6, 7]);
        assert_eq!(cursor.position(), 8);
        assert_eq!(cursor.read_u32_le("word").unwrap(), u32::from_le_bytes([8, 9, 10, 11]));
    }

    #[test]
    fn take_past_end_is_truncated() {
        let data = [0u8; 6];
        let mut cursor = Cursor::new(&data);
        cursor.skip(4, "prefix").unwrap();
        assert!(matches!(
            cursor.take(4, "word"),
            Err(DecodeError::TruncatedInput {
                offset: 4,
                needed: 4,
                available: 2,
                ..
            })
        ));
        assert_eq!(cursor.take_up_to(4).len(), 2);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn find_is_relative_to_cursor() {
        let data = b"xxiLO4yyiLO4";
        let mut cursor = Cursor::new(data);
        assert_eq!(cursor.find(b"iLO4"), Some(2));
        cursor.skip(3, "head").unwrap();
        assert_eq!(cursor.find(b"iLO4"), Some(5));
        assert_eq!(cursor.peek(5).bytes, b"LO4yy");
    }

    #[test]
    fn tail_range_resolves_backward_offsets() {
        let data: Vec<u8> = (0..100).collect();
        let mut cursor = Cursor::new(&data);
        cursor.skip(10, "head").unwrap();
        let section = cursor
            .tail_range(30, 10, BoundsPolicy::Strict, "blob")
            .unwrap();
        assert_eq!(section.range(), 70..90);

        let empty = cursor
            .tail_range(10, 10, BoundsPolicy::Strict, "blob")
            .unwrap();
        assert_eq!(empty.range(), 90..90);
    }

    #[test]
    fn tail_range_strict_rejects_outside_window() {
        let data = [0u8; 100];
        let mut cursor = Cursor::new(&data);
        cursor.skip(10, "head").unwrap();
        assert!(matches!(
            cursor.tail_range(200, 10, BoundsPolicy::Strict, "blob"),
            Err(DecodeError::CorruptContainer { .. })
        ));
        assert!(matches!(
            cursor.tail_range(5, 10, BoundsPolicy::Strict, "blob"),
            Err(DecodeError::CorruptContainer { .. })
        ));
    }

    #[test]
    fn tail_range_permissive_uses_signed_indices() {
        let data = [0u8; 100];
        let mut cursor = Cursor::new(&data);
        cursor.skip(10, "head").unwrap();

        let clamped = cursor
            .tail_range(200, 10, BoundsPolicy::Permissive, "blob")
            .unwrap();
        assert_eq!(clamped.range(), 10..90);

        let inverted = cursor
            .tail_range(5, 10, BoundsPolicy::Permissive, "blob")
            .unwrap();
        assert!(inverted.is_empty());

        // -0 is the first byte of the window, not the end.
        let from_start = cursor
            .tail_range(0, 10, BoundsPolicy::Permissive, "blob")
            .unwrap();
        assert_eq!(from_start.range(), 10..90);
    }

    #[test]
    fn end_range_wraps_negative_start() {
        let data = [0u8; 100];
        let mut cursor = Cursor::new(&data);
        cursor.skip(10, "head").unwrap();

        assert_eq!(
            cursor
                .end_range(30, 10, BoundsPolicy::Strict, "blob")
                .unwrap()
                .range(),
            70..90
        );

        // len 90: start 90 - 120 = -30 counts back to 60.
        let wrapped = cursor
            .end_range(120, 10, BoundsPolicy::Permissive, "blob")
            .unwrap();
        assert_eq!(wrapped.range(), 70..90);

        // More than a whole window before the start clamps to it.
        let clamped = cursor
            .end_range(500, 10, BoundsPolicy::Permissive, "blob")
            .unwrap();
        assert_eq!(clamped.range(), 10..90);

        assert!(matches!(
            cursor.end_range(120, 10, BoundsPolicy::Strict, "blob"),
            Err(DecodeError::CorruptContainer { .. })
        ));

        let empty = cursor
            .end_range(0, 0x40, BoundsPolicy::Permissive, "blob")
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn slice_signed_follows_negative_indexing() {
        let data: Vec<u8> = (0..=255).collect();
        let cursor = Cursor::new(&data);
        assert_eq!(cursor.slice_signed(-0x40, -0x10).range(), 0xC0..0xF0);
        assert_eq!(cursor.slice_signed(0, -0x10).range(), 0x00..0xF0);
        assert_eq!(cursor.slice_signed(-0x180, 0x20).range(), 0x00..0x20);
        assert_eq!(cursor.slice_signed(0x20, 0x400).range(), 0x20..0x100);
        assert!(cursor.slice_signed(0x80, 0x40).is_empty());
    }

    #[test]
    fn truncate_limits_the_window() {
        let data = [0xAAu8; 32];
        let mut cursor = Cursor::new(&data);
        cursor.skip(8, "head").unwrap();
        cursor.truncate(8, BoundsPolicy::Strict, "body").unwrap();
        assert_eq!(cursor.end(), 16);
        assert_eq!(cursor.tail(4, "tail").unwrap().offset, 12);

        assert!(cursor.truncate(100, BoundsPolicy::Strict, "body").is_err());
        cursor.truncate(100, BoundsPolicy::Permissive, "body").unwrap();
        assert_eq!(cursor.end(), 16);
    }

    #[test]
    fn sub_section_is_clamped() {
        let data = [1u8, 2, 3, 4];
        let section = Section {
            offset: 0x100,
            bytes: &data,
        };
        assert_eq!(section.sub(1..3).range(), 0x101..0x103);
        assert_eq!(section.sub(2..10).bytes, &[3, 4]);
    }
}

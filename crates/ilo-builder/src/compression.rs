/// Size of the LZSS ring window.
pub const WINDOW_SIZE: usize = 0x1000;

/// Shortest back-reference worth encoding.
pub const MIN_MATCH: usize = 3;

/// Longest back-reference the 4-bit length field can express.
pub const MAX_MATCH: usize = 0x0F + MIN_MATCH;

/// Compress `data` into the LZSS stream used for image payloads.
///
/// Greedy longest-match search over the last 4 KiB of output. Each control
/// byte covers the next eight items, least-significant bit first; a set bit
/// is a literal, a clear bit a two-byte back-reference:
///
/// ```text
///   b0 = pos & 0xFF
///   b1 = (pos >> 4) & 0xF0 | (len - 3)
/// ```
///
/// `pos` is an absolute position in the ring window, which the decoder
/// starts filling at index 0.
///
/// # Example
///
/// ```rust
/// use ilo_builder::compression::compress;
///
/// assert_eq!(compress(b"abcabc"), vec![0x07, b'a', b'b', b'c', 0x00, 0x00]);
/// ```
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 8 + 1);
    let mut i = 0;

    while i < data.len() {
        let control_at = out.len();
        out.push(0);

        for bit in 0..8 {
            if i >= data.len() {
                break;
            }

            let (len, src) = longest_match(data, i);
            if len >= MIN_MATCH {
                let pos = src & (WINDOW_SIZE - 1);
                out.push(low_byte(pos));
                out.push(low_byte((pos >> 4) & 0xF0 | (len - MIN_MATCH)));
                i += len;
            } else {
                out[control_at] |= 1 << bit;
                out.push(data[i]);
                i += 1;
            }
        }
    }

    out
}

/// Encode `data` as literals only, with no back-references.
///
/// Useful for fixtures whose compressed size must be predictable:
/// the output is always `len + ceil(len / 8)` bytes.
pub fn store(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len().div_ceil(8));
    for chunk in data.chunks(8) {
        out.push(0xFF);
        out.extend_from_slice(chunk);
    }
    out
}

fn longest_match(data: &[u8], i: usize) -> (usize, usize) {
    let start = i.saturating_sub(WINDOW_SIZE - 1);
    let max = MAX_MATCH.min(data.len() - i);
    let mut best = (0, 0);

    for j in start..i {
        let mut len = 0;
        while len < max && data[j + len] == data[i + len] {
            len += 1;
        }
        if len > best.0 {
            best = (len, j);
            if len == max {
                break;
            }
        }
    }

    best
}

fn low_byte(value: usize) -> u8 {
    (value & 0xFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_all_literals() {
        assert_eq!(compress(b"ab"), vec![0x03, b'a', b'b']);
    }

    #[test]
    fn repeat_becomes_back_reference() {
        assert_eq!(compress(b"abcabc"), vec![0x07, b'a', b'b', b'c', 0x00, 0x00]);
    }

    #[test]
    fn long_run_uses_overlapping_reference() {
        // One literal, then a single 18-byte reference back to position 0.
        let data = vec![b'x'; 19];
        assert_eq!(compress(&data), vec![0x01, b'x', 0x00, 0x0F]);
    }

    #[test]
    fn repetitive_data_shrinks() {
        let data = "ILO firmware block ".repeat(200);
        let packed = compress(data.as_bytes());
        assert!(packed.len() < data.len() / 4);
    }

    #[test]
    fn store_emits_one_control_byte_per_eight_literals() {
        let packed = store(b"0123456789");
        assert_eq!(packed.len(), 10 + 2);
        assert_eq!(packed[0], 0xFF);
        assert_eq!(&packed[1..9], b"01234567");
        assert_eq!(packed[9], 0xFF);
        assert_eq!(&packed[10..], b"89");
        assert!(store(b"").is_empty());
    }

    #[test]
    fn empty_input_compresses_to_nothing() {
        assert!(compress(b"").is_empty());
    }
}

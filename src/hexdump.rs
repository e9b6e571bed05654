// ABOUTME: Hex dump (A5) — classic 16-bytes-per-line hex + ASCII gutter formatter
// ABOUTME: Pure function over a provided writer; used by the frame log and malformed-message logging

use std::io::{self, Write};

const BYTES_PER_LINE: usize = 16;

/// Write `bytes` to `out` as 16-bytes-per-line hex with an ASCII gutter,
/// e.g.:
///
/// ```text
/// 00000000  de ad be ef 00 01 02 03 04 05 06 07 08 09 0a 0b  |................|
/// ```
///
/// Non-printable bytes render as `.` in the gutter. Pure formatting: no
/// timestamps, no allocation beyond what `write!` needs.
pub fn hex_dump<W: Write>(bytes: &[u8], out: &mut W) -> io::Result<()> {
    for (line_no, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        write!(out, "{:08x}  ", line_no * BYTES_PER_LINE)?;

        for i in 0..BYTES_PER_LINE {
            if i < chunk.len() {
                write!(out, "{:02x} ", chunk[i])?;
            } else {
                write!(out, "   ")?;
            }
            if i == BYTES_PER_LINE / 2 - 1 {
                write!(out, " ")?;
            }
        }

        write!(out, " |")?;
        for &b in chunk {
            let c = if (0x20..0x7f).contains(&b) { b as char } else { '.' };
            write!(out, "{c}")?;
        }
        writeln!(out, "|")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_writes_nothing() {
        let mut out = Vec::new();
        hex_dump(&[], &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn short_line_is_padded_and_gutter_matches() {
        let mut out = Vec::new();
        hex_dump(&[0xDE, 0xAD, 0xBE, 0xEF], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("00000000  de ad be ef"));
        assert!(text.contains("|....|"));
    }

    #[test]
    fn printable_ascii_shows_in_gutter() {
        let mut out = Vec::new();
        hex_dump(b"Hello, world!!!!", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("|Hello, world!!!!|"));
    }

    #[test]
    fn multiple_lines_get_incrementing_offsets() {
        let bytes = vec![0u8; 20];
        let mut out = Vec::new();
        hex_dump(&bytes, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("00000000"));
        assert!(lines.next().unwrap().starts_with("00000010"));
    }
}

//! UTF-8 / UTF-16LE transcoding (spec component 2).

/// Encode `s` as little-endian UTF-16: two bytes per code unit, surrogate
/// pairs for supplementary-plane characters.
pub fn utf8_to_utf16le(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Decode little-endian UTF-16 bytes back to a `String`. `bytes.len()` must
/// be even; an odd length is a structural violation (spec §7), not a stream
/// error.
pub fn utf16le_to_utf8(bytes: &[u8]) -> String {
    assert!(bytes.len() % 2 == 0, "jksn: utf16le length not even");
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_ascii() {
        let s = "hello";
        let utf16 = utf8_to_utf16le(s);
        assert_eq!(utf16le_to_utf8(&utf16), s);
    }

    #[test]
    fn round_trip_supplementary_plane() {
        let s = "a\u{1f600}b";
        let utf16 = utf8_to_utf16le(s);
        // surrogate pair + two single units = 4 units = 8 bytes
        assert_eq!(utf16.len(), 8);
        assert_eq!(utf16le_to_utf8(&utf16), s);
    }

    #[test]
    fn utf16_is_shorter_for_bmp_heavy_text() {
        let s = "\u{4e2d}\u{6587}"; // two CJK characters, 6 bytes of UTF-8
        assert_eq!(s.len(), 6);
        assert_eq!(utf8_to_utf16le(s).len(), 4);
    }
}

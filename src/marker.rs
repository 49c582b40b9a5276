//! JKSN control byte markers. For internal use only.

/// A parsed control byte, split into its type class and low-nibble variant.
///
/// Each variant corresponds to a row (or a slice of a row) of the control
/// byte table: the high nibble selects the class, the low nibble selects an
/// inline value or a length/width selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Null,
    False,
    True,
    LoadJson,

    /// Inline non-negative integer 0..=10.
    IntSmall(u8),
    Int32,
    Int16,
    Int8,
    /// VLQ of the negated magnitude.
    IntVlqNeg,
    /// VLQ of the value itself.
    IntVlq,

    FloatNan,
    Float80,
    Float64,
    Float32,
    FloatNegInf,
    FloatPosInf,

    /// UTF-16LE string, inline length in code units (0..=0x0B).
    Utf16Small(u8),
    Utf16HashRef,
    Utf16Len16,
    Utf16Len8,
    Utf16LenVlq,

    /// UTF-8 string, inline length in bytes (0..=0x0C).
    Utf8Small(u8),
    Utf8Len16,
    Utf8Len8,
    Utf8LenVlq,

    /// Blob, inline length in bytes (0..=0x0B).
    BlobSmall(u8),
    BlobHashRef,
    BlobLen16,
    BlobLen8,
    BlobLenVlq,

    /// Clear both hash tables.
    HashClear,
    /// Prime N values (side effect only); low nibble 1..=0xC is the inline count.
    HashPrimeSmall(u8),
    HashPrimeLen8,
    HashPrimeLen16,
    HashPrimeLenVlq,

    /// Inline array length (0..=0x0C).
    ArraySmall(u8),
    ArrayLen16,
    ArrayLen8,
    ArrayLenVlq,

    /// Inline object length in key/value pairs (0..=0x0C).
    ObjectSmall(u8),
    ObjectLen16,
    ObjectLen8,
    ObjectLenVlq,

    Unspecified,
    /// Row-column swapped array, column count 1..=0x0C.
    SwapSmall(u8),
    SwapLen16,
    SwapLen8,
    SwapLenVlq,

    /// Length-less array terminated by an Unspecified child.
    UnboundedArray,
    /// Single padding byte, skipped.
    Padding,

    /// Delta-encoded integer, inline delta 0..=5.
    DeltaSmall(u8),
    /// Delta-encoded integer, inline negative delta -5..=-1 (stored 0..=4).
    DeltaSmallNeg(u8),
    DeltaInt32,
    DeltaInt16,
    DeltaInt8,
    DeltaVlqNeg,
    DeltaVlq,

    /// Checksum-only: discard `size` trailing bytes and loop.
    ChecksumOnly { size: usize },
    /// Value-then-checksum: decode one value, then discard `size` bytes.
    ChecksumValue { size: usize },
    /// Decode one value, discard it, loop.
    DropValue,
}

/// The `K` sizes used by the checksum-annotated control byte family (§4.1, 0xF0..0xF5).
const CHECKSUM_SIZES: [usize; 6] = [1, 4, 16, 20, 32, 64];

impl Control {
    /// Parse a control byte. Returns `None` for unassigned control bytes.
    pub fn from_u8(b: u8) -> Option<Control> {
        let hi = b & 0xf0;
        let lo = b & 0x0f;
        Some(match (hi, lo) {
            (0x00, 0x00) | (0x00, 0x01) => Control::Null,
            (0x00, 0x02) => Control::False,
            (0x00, 0x03) => Control::True,
            (0x00, 0x0f) => Control::LoadJson,

            (0x10, n) if n <= 0x0a => Control::IntSmall(n),
            (0x10, 0x0b) => Control::Int32,
            (0x10, 0x0c) => Control::Int16,
            (0x10, 0x0d) => Control::Int8,
            (0x10, 0x0e) => Control::IntVlqNeg,
            (0x10, 0x0f) => Control::IntVlq,

            (0x20, 0x00) => Control::FloatNan,
            (0x20, 0x0b) => Control::Float80,
            (0x20, 0x0c) => Control::Float64,
            (0x20, 0x0d) => Control::Float32,
            (0x20, 0x0e) => Control::FloatNegInf,
            (0x20, 0x0f) => Control::FloatPosInf,

            (0x30, n) if n <= 0x0b => Control::Utf16Small(n),
            (0x30, 0x0c) => Control::Utf16HashRef,
            (0x30, 0x0d) => Control::Utf16Len16,
            (0x30, 0x0e) => Control::Utf16Len8,
            (0x30, 0x0f) => Control::Utf16LenVlq,

            (0x40, n) if n <= 0x0c => Control::Utf8Small(n),
            (0x40, 0x0d) => Control::Utf8Len16,
            (0x40, 0x0e) => Control::Utf8Len8,
            (0x40, 0x0f) => Control::Utf8LenVlq,

            (0x50, n) if n <= 0x0b => Control::BlobSmall(n),
            (0x50, 0x0c) => Control::BlobHashRef,
            (0x50, 0x0d) => Control::BlobLen16,
            (0x50, 0x0e) => Control::BlobLen8,
            (0x50, 0x0f) => Control::BlobLenVlq,

            (0x70, 0x00) => Control::HashClear,
            (0x70, n) if (0x01..=0x0c).contains(&n) => Control::HashPrimeSmall(n),
            (0x70, 0x0d) => Control::HashPrimeLen8,
            (0x70, 0x0e) => Control::HashPrimeLen16,
            (0x70, 0x0f) => Control::HashPrimeLenVlq,

            (0x80, n) if n <= 0x0c => Control::ArraySmall(n),
            (0x80, 0x0d) => Control::ArrayLen16,
            (0x80, 0x0e) => Control::ArrayLen8,
            (0x80, 0x0f) => Control::ArrayLenVlq,

            (0x90, n) if n <= 0x0c => Control::ObjectSmall(n),
            (0x90, 0x0d) => Control::ObjectLen16,
            (0x90, 0x0e) => Control::ObjectLen8,
            (0x90, 0x0f) => Control::ObjectLenVlq,

            (0xa0, 0x00) => Control::Unspecified,
            (0xa0, n) if (0x01..=0x0c).contains(&n) => Control::SwapSmall(n),
            (0xa0, 0x0d) => Control::SwapLen16,
            (0xa0, 0x0e) => Control::SwapLen8,
            (0xa0, 0x0f) => Control::SwapLenVlq,

            (0xc0, 0x08) => Control::UnboundedArray,
            (0xc0, 0x0a) => Control::Padding,

            (0xd0, n) if n <= 0x05 => Control::DeltaSmall(n),
            (0xd0, n) if (0x06..=0x0a).contains(&n) => Control::DeltaSmallNeg(n - 0x06),
            (0xd0, 0x0b) => Control::DeltaInt32,
            (0xd0, 0x0c) => Control::DeltaInt16,
            (0xd0, 0x0d) => Control::DeltaInt8,
            (0xd0, 0x0e) => Control::DeltaVlqNeg,
            (0xd0, 0x0f) => Control::DeltaVlq,

            (0xf0, n) if (0x00..=0x05).contains(&n) => Control::ChecksumOnly {
                size: CHECKSUM_SIZES[n as usize],
            },
            (0xf0, n) if (0x08..=0x0d).contains(&n) => Control::ChecksumValue {
                size: CHECKSUM_SIZES[(n - 0x08) as usize],
            },
            (0xf0, 0x0f) => Control::DropValue,

            _ => return None,
        })
    }

    /// Render this control back into its byte form.
    pub fn into_u8(self) -> u8 {
        match self {
            Control::Null => 0x01,
            Control::False => 0x02,
            Control::True => 0x03,
            Control::LoadJson => 0x0f,

            Control::IntSmall(n) => {
                debug_assert!(n <= 10);
                0x10 | n
            }
            Control::Int32 => 0x1b,
            Control::Int16 => 0x1c,
            Control::Int8 => 0x1d,
            Control::IntVlqNeg => 0x1e,
            Control::IntVlq => 0x1f,

            Control::FloatNan => 0x20,
            Control::Float80 => 0x2b,
            Control::Float64 => 0x2c,
            Control::Float32 => 0x2d,
            Control::FloatNegInf => 0x2e,
            Control::FloatPosInf => 0x2f,

            Control::Utf16Small(n) => {
                debug_assert!(n <= 0x0b);
                0x30 | n
            }
            Control::Utf16HashRef => 0x3c,
            Control::Utf16Len16 => 0x3d,
            Control::Utf16Len8 => 0x3e,
            Control::Utf16LenVlq => 0x3f,

            Control::Utf8Small(n) => {
                debug_assert!(n <= 0x0c);
                0x40 | n
            }
            Control::Utf8Len16 => 0x4d,
            Control::Utf8Len8 => 0x4e,
            Control::Utf8LenVlq => 0x4f,

            Control::BlobSmall(n) => {
                debug_assert!(n <= 0x0b);
                0x50 | n
            }
            Control::BlobHashRef => 0x5c,
            Control::BlobLen16 => 0x5d,
            Control::BlobLen8 => 0x5e,
            Control::BlobLenVlq => 0x5f,

            Control::HashClear => 0x70,
            Control::HashPrimeSmall(n) => {
                debug_assert!((1..=0x0c).contains(&n));
                0x70 | n
            }
            Control::HashPrimeLen8 => 0x7d,
            Control::HashPrimeLen16 => 0x7e,
            Control::HashPrimeLenVlq => 0x7f,

            Control::ArraySmall(n) => {
                debug_assert!(n <= 0x0c);
                0x80 | n
            }
            Control::ArrayLen16 => 0x8d,
            Control::ArrayLen8 => 0x8e,
            Control::ArrayLenVlq => 0x8f,

            Control::ObjectSmall(n) => {
                debug_assert!(n <= 0x0c);
                0x90 | n
            }
            Control::ObjectLen16 => 0x9d,
            Control::ObjectLen8 => 0x9e,
            Control::ObjectLenVlq => 0x9f,

            Control::Unspecified => 0xa0,
            Control::SwapSmall(n) => {
                debug_assert!((1..=0x0c).contains(&n));
                0xa0 | n
            }
            Control::SwapLen16 => 0xad,
            Control::SwapLen8 => 0xae,
            Control::SwapLenVlq => 0xaf,

            Control::UnboundedArray => 0xc8,
            Control::Padding => 0xca,

            Control::DeltaSmall(n) => {
                debug_assert!(n <= 5);
                0xd0 | n
            }
            Control::DeltaSmallNeg(n) => {
                debug_assert!(n <= 4);
                0xd0 | (n + 6)
            }
            Control::DeltaInt32 => 0xdb,
            Control::DeltaInt16 => 0xdc,
            Control::DeltaInt8 => 0xdd,
            Control::DeltaVlqNeg => 0xde,
            Control::DeltaVlq => 0xdf,

            Control::ChecksumOnly { size } => {
                let idx = CHECKSUM_SIZES
                    .iter()
                    .position(|&s| s == size)
                    .expect("valid checksum size");
                0xf0 | idx as u8
            }
            Control::ChecksumValue { size } => {
                let idx = CHECKSUM_SIZES
                    .iter()
                    .position(|&s| s == size)
                    .expect("valid checksum size");
                0xf8 | idx as u8
            }
            Control::DropValue => 0xff,
        }
    }
}

impl From<Control> for u8 {
    fn from(val: Control) -> u8 {
        val.into_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_fixed_controls() {
        let samples = [
            Control::Null,
            Control::True,
            Control::False,
            Control::IntSmall(7),
            Control::Int8,
            Control::FloatNan,
            Control::Utf8Small(3),
            Control::BlobHashRef,
            Control::HashClear,
            Control::ArraySmall(2),
            Control::ObjectLenVlq,
            Control::Unspecified,
            Control::SwapSmall(4),
            Control::UnboundedArray,
            Control::Padding,
            Control::DeltaSmall(5),
            Control::DeltaSmallNeg(1),
            Control::ChecksumOnly { size: 32 },
            Control::ChecksumValue { size: 1 },
            Control::DropValue,
        ];
        for c in samples {
            let b = c.into_u8();
            assert_eq!(Control::from_u8(b), Some(c), "byte 0x{:02x}", b);
        }
    }

    #[test]
    fn unassigned_bytes_rejected() {
        assert_eq!(Control::from_u8(0x05), None);
        assert_eq!(Control::from_u8(0x60), None);
        assert_eq!(Control::from_u8(0xb0), None);
        assert_eq!(Control::from_u8(0xc0), None);
        assert_eq!(Control::from_u8(0xfe), None);
    }
}

//! Fixed-width big-endian integers and the unbounded base-128 VLQ used
//! throughout the control byte protocol (spec component 1).

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::error::{Error, Result};

/// Write a signed integer as `width` big-endian bytes (two's complement).
/// `width` must be 1, 2, or 4; any other value is a structural bug, not a
/// stream error (spec §7).
pub fn write_fixed(buf: &mut Vec<u8>, value: &BigInt, width: usize) {
    match width {
        1 => {
            let v = value.to_i8().expect("value fits in i8");
            buf.write_i8(v).unwrap();
        }
        2 => {
            let v = value.to_i16().expect("value fits in i16");
            buf.write_i16::<BigEndian>(v).unwrap();
        }
        4 => {
            let v = value.to_i32().expect("value fits in i32");
            buf.write_i32::<BigEndian>(v).unwrap();
        }
        _ => panic!("jksn: fixed-width integer size not in (1, 2, 4)"),
    }
}

/// Read a `width`-byte big-endian two's-complement signed integer.
pub fn read_fixed(buf: &mut &[u8], width: usize, offset: i64) -> Result<BigInt> {
    let v = match width {
        1 => buf
            .read_i8()
            .map_err(|_| Error::eof(offset))?
            as i64,
        2 => buf
            .read_i16::<BigEndian>()
            .map_err(|_| Error::eof(offset))? as i64,
        4 => buf
            .read_i32::<BigEndian>()
            .map_err(|_| Error::eof(offset))? as i64,
        _ => panic!("jksn: fixed-width integer size not in (1, 2, 4)"),
    };
    Ok(BigInt::from(v))
}

/// Encode a non-negative integer as an unbounded base-128 VLQ: big-endian
/// 7-bit groups, most-significant group first, every group but the last
/// carries the continuation bit `0x80`.
pub fn write_vlq(buf: &mut Vec<u8>, value: &BigUint) {
    if value.is_zero() {
        buf.push(0);
        return;
    }
    let mut groups = Vec::new();
    let mut n = value.clone();
    let mask = BigUint::from(0x7fu32);
    loop {
        let group = (&n & &mask).to_u8().unwrap();
        groups.push(group);
        n >>= 7u32;
        if n.is_zero() {
            break;
        }
    }
    // `groups` is least-significant-first; emit most-significant-first, with
    // the continuation bit on every byte except the last one written here
    // (which is the first, least-significant, group).
    for (i, group) in groups.iter().rev().enumerate() {
        if i + 1 < groups.len() {
            buf.push(group | 0x80);
        } else {
            buf.push(*group);
        }
    }
}

/// Decode an unbounded base-128 VLQ.
pub fn read_vlq(buf: &mut &[u8], offset: i64) -> Result<BigUint> {
    let mut value = BigUint::zero();
    loop {
        let byte = buf.read_u8().map_err(|_| Error::eof(offset))?;
        value = (value << 7u32) | BigUint::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            break;
        }
    }
    Ok(value)
}

/// Minimal number of bytes `write_fixed`/`write_vlq` would emit for `value`
/// at the given `width` (0 meaning VLQ). Used by the size estimator and by
/// the delta-vs-plain comparison in the optimization pass.
pub fn encoded_len(value: &BigInt, width: usize) -> usize {
    match width {
        1 | 2 | 4 => width,
        0 => {
            let mag = value.magnitude();
            if mag.is_zero() {
                1
            } else {
                (mag.bits() as usize).div_ceil(7)
            }
        }
        _ => panic!("jksn: fixed-width integer size not in (1, 2, 4, 0)"),
    }
}

pub fn to_biguint_magnitude(value: &BigInt) -> BigUint {
    let (_, mag) = value.clone().into_parts();
    mag
}

pub fn biguint_to_bigint(value: BigUint, negative: bool) -> BigInt {
    if negative {
        BigInt::from_biguint(Sign::Minus, value)
    } else {
        BigInt::from_biguint(Sign::Plus, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::ToBigInt;

    #[test]
    fn vlq_round_trip_small() {
        for i in 0u32..300 {
            let mut buf = Vec::new();
            write_vlq(&mut buf, &BigUint::from(i));
            let out = read_vlq(&mut &buf[..], 0).unwrap();
            assert_eq!(out, BigUint::from(i));
        }
    }

    #[test]
    fn vlq_round_trip_big() {
        let big = BigUint::from(u64::MAX) * BigUint::from(1000u32);
        let mut buf = Vec::new();
        write_vlq(&mut buf, &big);
        let out = read_vlq(&mut &buf[..], 0).unwrap();
        assert_eq!(out, big);
    }

    #[test]
    fn vlq_single_byte_has_no_continuation() {
        let mut buf = Vec::new();
        write_vlq(&mut buf, &BigUint::from(100u32));
        assert_eq!(buf, vec![100u8]);
    }

    #[test]
    fn fixed_round_trip() {
        for v in [0i64, 1, -1, 127, -128, 32767, -32768, i32::MAX as i64, i32::MIN as i64] {
            for width in [1usize, 2, 4] {
                let value = v.to_bigint().unwrap();
                if encoded_len(&value, width) != width {
                    continue;
                }
                let mut buf = Vec::new();
                write_fixed(&mut buf, &value, width);
                let out = read_fixed(&mut &buf[..], width, 0).unwrap();
                assert_eq!(out, value);
            }
        }
    }
}

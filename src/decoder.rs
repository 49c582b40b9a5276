//! Decoder half of the control-byte protocol (spec component 5).

use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;

use crate::error::{Error, Result};
use crate::hash::djb_hash;
use crate::integer::Integer;
use crate::json;
use crate::marker::Control;
use crate::utf::utf16le_to_utf8;
use crate::value::Value;
use crate::varint;

const MAGIC: &[u8; 3] = b"jk!";

enum LenWidth {
    Len8,
    Len16,
    LenVlq,
}

/// Decodes JKSN bytes back to dynamic [`Value`]s.
///
/// Holds the state the wire format's back-references and delta integers
/// depend on: the last integer decoded, and the two 256-slot hash tables
/// recording string/blob payloads as they're seen.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bytes already consumed before `data`/`pos` start counting — the
    /// length of a stripped `jk!` prefix, or 0 if none was present. Spec
    /// §4.5 defines offsets as counted from the document start with the
    /// magic consumed, so reported offsets must include this.
    magic_len: usize,
    last_int: Option<BigInt>,
    text_hash: Vec<Option<String>>,
    blob_hash: Vec<Option<Vec<u8>>>,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Decoder<'a> {
        let magic_len = if data.starts_with(MAGIC.as_slice()) { MAGIC.len() } else { 0 };
        let data = &data[magic_len..];
        Decoder {
            data,
            pos: 0,
            magic_len,
            last_int: None,
            text_hash: vec![None; 256],
            blob_hash: vec![None; 256],
        }
    }

    fn offset(&self) -> i64 {
        (self.magic_len + self.pos) as i64
    }

    fn read_byte(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or_else(|| Error::eof(self.offset()))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(Error::eof(self.offset()));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_fixed_int(&mut self, width: usize) -> Result<BigInt> {
        let offset = self.offset();
        let mut cursor = &self.data[self.pos..];
        let value = varint::read_fixed(&mut cursor, width, offset)?;
        self.pos = self.data.len() - cursor.len();
        Ok(value)
    }

    fn read_vlq_uint(&mut self) -> Result<BigUint> {
        let offset = self.offset();
        let mut cursor = &self.data[self.pos..];
        let value = varint::read_vlq(&mut cursor, offset)?;
        self.pos = self.data.len() - cursor.len();
        Ok(value)
    }

    fn read_length(&mut self, width: LenWidth) -> Result<usize> {
        match width {
            LenWidth::Len8 => Ok(self.read_byte()? as usize),
            LenWidth::Len16 => {
                let hi = self.read_byte()? as usize;
                let lo = self.read_byte()? as usize;
                Ok((hi << 8) | lo)
            }
            LenWidth::LenVlq => {
                let offset = self.offset();
                let v = self.read_vlq_uint()?;
                v.to_usize()
                    .ok_or_else(|| Error::syntax("length exceeds addressable size", offset))
            }
        }
    }

    /// Decode one value. Loops internally over control bytes that carry no
    /// value of their own (hash-table priming, padding, checksum-only
    /// wrappers) until it reaches one that does.
    pub fn load_value(&mut self) -> Result<Value> {
        loop {
            let start = self.offset();
            let byte = self.read_byte()?;
            let ctrl = Control::from_u8(byte)
                .ok_or_else(|| Error::syntax(format!("unassigned control byte 0x{byte:02x}"), start))?;
            match ctrl {
                Control::HashClear => {
                    self.text_hash.iter_mut().for_each(|s| *s = None);
                    self.blob_hash.iter_mut().for_each(|s| *s = None);
                }
                Control::HashPrimeSmall(n) => self.prime(n as usize)?,
                Control::HashPrimeLen8 => {
                    let n = self.read_byte()? as usize;
                    self.prime(n)?;
                }
                Control::HashPrimeLen16 => {
                    let n = self.read_length(LenWidth::Len16)?;
                    self.prime(n)?;
                }
                Control::HashPrimeLenVlq => {
                    let n = self.read_length(LenWidth::LenVlq)?;
                    self.prime(n)?;
                }
                Control::Padding => {}
                Control::ChecksumOnly { size } => {
                    self.read_bytes(size)?;
                }
                Control::DropValue => {
                    self.load_value()?;
                }
                other => return self.load_control(other, start),
            }
        }
    }

    fn prime(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.load_value()?;
        }
        Ok(())
    }

    fn load_control(&mut self, ctrl: Control, offset: i64) -> Result<Value> {
        match ctrl {
            Control::Null => Ok(Value::Null),
            Control::False => Ok(Value::Bool(false)),
            Control::True => Ok(Value::Bool(true)),
            Control::LoadJson => {
                let inner = self.load_value()?;
                let text = inner
                    .as_str()
                    .ok_or_else(|| Error::syntax("0x0F expects an embedded string value", offset))?;
                json::json_text_to_value(text)
            }

            Control::IntSmall(n) => self.finish_int(BigInt::from(n)),
            Control::Int8 => {
                let n = self.read_fixed_int(1)?;
                self.finish_int(n)
            }
            Control::Int16 => {
                let n = self.read_fixed_int(2)?;
                self.finish_int(n)
            }
            Control::Int32 => {
                let n = self.read_fixed_int(4)?;
                self.finish_int(n)
            }
            Control::IntVlq => {
                let mag = self.read_vlq_uint()?;
                self.finish_int(varint::biguint_to_bigint(mag, false))
            }
            Control::IntVlqNeg => {
                let mag = self.read_vlq_uint()?;
                self.finish_int(varint::biguint_to_bigint(mag, true))
            }

            Control::FloatNan => Ok(Value::F64(f64::NAN)),
            Control::FloatNegInf => Ok(Value::F64(f64::NEG_INFINITY)),
            Control::FloatPosInf => Ok(Value::F64(f64::INFINITY)),
            Control::Float80 => Err(Error::syntax("80-bit floats are not supported", offset)),
            Control::Float64 => {
                let bytes = self.read_bytes(8)?;
                Ok(Value::F64(f64::from_be_bytes(bytes.try_into().unwrap())))
            }
            Control::Float32 => {
                let bytes = self.read_bytes(4)?;
                Ok(Value::F32(f32::from_be_bytes(bytes.try_into().unwrap())))
            }

            Control::Utf16Small(n) => {
                let bytes = self.read_bytes(n as usize * 2)?.to_vec();
                self.finish_string(bytes, true)
            }
            Control::Utf16Len8 => {
                let n = self.read_byte()? as usize;
                let bytes = self.read_bytes(n * 2)?.to_vec();
                self.finish_string(bytes, true)
            }
            Control::Utf16Len16 => {
                let n = self.read_length(LenWidth::Len16)?;
                let bytes = self.read_bytes(n * 2)?.to_vec();
                self.finish_string(bytes, true)
            }
            Control::Utf16LenVlq => {
                let n = self.read_length(LenWidth::LenVlq)?;
                let bytes = self.read_bytes(n * 2)?.to_vec();
                self.finish_string(bytes, true)
            }
            Control::Utf16HashRef => {
                let h = self.read_byte()?;
                self.resolve_text_hash(h, offset)
            }

            Control::Utf8Small(n) => {
                let bytes = self.read_bytes(n as usize)?.to_vec();
                self.finish_string(bytes, false)
            }
            Control::Utf8Len8 => {
                let n = self.read_byte()? as usize;
                let bytes = self.read_bytes(n)?.to_vec();
                self.finish_string(bytes, false)
            }
            Control::Utf8Len16 => {
                let n = self.read_length(LenWidth::Len16)?;
                let bytes = self.read_bytes(n)?.to_vec();
                self.finish_string(bytes, false)
            }
            Control::Utf8LenVlq => {
                let n = self.read_length(LenWidth::LenVlq)?;
                let bytes = self.read_bytes(n)?.to_vec();
                self.finish_string(bytes, false)
            }

            Control::BlobSmall(n) => {
                let bytes = self.read_bytes(n as usize)?.to_vec();
                self.finish_blob(bytes)
            }
            Control::BlobLen8 => {
                let n = self.read_byte()? as usize;
                let bytes = self.read_bytes(n)?.to_vec();
                self.finish_blob(bytes)
            }
            Control::BlobLen16 => {
                let n = self.read_length(LenWidth::Len16)?;
                let bytes = self.read_bytes(n)?.to_vec();
                self.finish_blob(bytes)
            }
            Control::BlobLenVlq => {
                let n = self.read_length(LenWidth::LenVlq)?;
                let bytes = self.read_bytes(n)?.to_vec();
                self.finish_blob(bytes)
            }
            Control::BlobHashRef => {
                let h = self.read_byte()?;
                self.resolve_blob_hash(h, offset)
            }

            Control::ArraySmall(n) => self.load_array(n as usize),
            Control::ArrayLen8 => {
                let n = self.read_byte()? as usize;
                self.load_array(n)
            }
            Control::ArrayLen16 => {
                let n = self.read_length(LenWidth::Len16)?;
                self.load_array(n)
            }
            Control::ArrayLenVlq => {
                let n = self.read_length(LenWidth::LenVlq)?;
                self.load_array(n)
            }

            Control::ObjectSmall(n) => self.load_object(n as usize),
            Control::ObjectLen8 => {
                let n = self.read_byte()? as usize;
                self.load_object(n)
            }
            Control::ObjectLen16 => {
                let n = self.read_length(LenWidth::Len16)?;
                self.load_object(n)
            }
            Control::ObjectLenVlq => {
                let n = self.read_length(LenWidth::LenVlq)?;
                self.load_object(n)
            }

            Control::Unspecified => Ok(Value::Unspecified),
            Control::SwapSmall(n) => self.load_transposed(n as usize),
            Control::SwapLen8 => {
                let n = self.read_byte()? as usize;
                self.load_transposed(n)
            }
            Control::SwapLen16 => {
                let n = self.read_length(LenWidth::Len16)?;
                self.load_transposed(n)
            }
            Control::SwapLenVlq => {
                let n = self.read_length(LenWidth::LenVlq)?;
                self.load_transposed(n)
            }

            Control::UnboundedArray => self.load_unbounded_array(),

            Control::DeltaSmall(n) => self.apply_delta(BigInt::from(n), offset),
            Control::DeltaSmallNeg(n) => self.apply_delta(BigInt::from(n) - BigInt::from(5), offset),
            Control::DeltaInt8 => {
                let d = self.read_fixed_int(1)?;
                self.apply_delta(d, offset)
            }
            Control::DeltaInt16 => {
                let d = self.read_fixed_int(2)?;
                self.apply_delta(d, offset)
            }
            Control::DeltaInt32 => {
                let d = self.read_fixed_int(4)?;
                self.apply_delta(d, offset)
            }
            Control::DeltaVlq => {
                let mag = self.read_vlq_uint()?;
                self.apply_delta(varint::biguint_to_bigint(mag, false), offset)
            }
            Control::DeltaVlqNeg => {
                let mag = self.read_vlq_uint()?;
                self.apply_delta(varint::biguint_to_bigint(mag, true), offset)
            }

            Control::ChecksumValue { size } => {
                let value = self.load_value()?;
                self.read_bytes(size)?;
                Ok(value)
            }

            Control::HashClear
            | Control::HashPrimeSmall(_)
            | Control::HashPrimeLen8
            | Control::HashPrimeLen16
            | Control::HashPrimeLenVlq
            | Control::Padding
            | Control::ChecksumOnly { .. }
            | Control::DropValue => unreachable!("consumed by load_value's loop"),
        }
    }

    fn finish_int(&mut self, n: BigInt) -> Result<Value> {
        self.last_int = Some(n.clone());
        Ok(Value::Int(Integer::from_bigint(n)))
    }

    fn apply_delta(&mut self, delta: BigInt, offset: i64) -> Result<Value> {
        let last = self
            .last_int
            .clone()
            .ok_or_else(|| Error::syntax("delta integer with no prior integer", offset))?;
        self.finish_int(last + delta)
    }

    fn finish_string(&mut self, bytes: Vec<u8>, is_utf16: bool) -> Result<Value> {
        let offset = self.offset();
        let text = if is_utf16 {
            utf16le_to_utf8(&bytes)
        } else {
            String::from_utf8(bytes.clone())
                .map_err(|_| Error::syntax("invalid utf-8 payload", offset))?
        };
        if bytes.len() > 1 {
            let h = djb_hash(&bytes);
            self.text_hash[h as usize] = Some(text.clone());
        }
        Ok(Value::Str(text))
    }

    fn finish_blob(&mut self, bytes: Vec<u8>) -> Result<Value> {
        if bytes.len() > 1 {
            let h = djb_hash(&bytes);
            self.blob_hash[h as usize] = Some(bytes.clone());
        }
        Ok(Value::Blob(bytes))
    }

    fn resolve_text_hash(&mut self, h: u8, offset: i64) -> Result<Value> {
        self.text_hash[h as usize]
            .clone()
            .map(Value::Str)
            .ok_or_else(|| Error::syntax("hash reference requires a non-existing hash", offset))
    }

    fn resolve_blob_hash(&mut self, h: u8, offset: i64) -> Result<Value> {
        self.blob_hash[h as usize]
            .clone()
            .map(Value::Blob)
            .ok_or_else(|| Error::syntax("hash reference requires a non-existing hash", offset))
    }

    fn load_array(&mut self, n: usize) -> Result<Value> {
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(self.load_value()?);
        }
        Ok(Value::Array(items))
    }

    fn load_object(&mut self, n: usize) -> Result<Value> {
        let mut pairs = Vec::with_capacity(n);
        for _ in 0..n {
            let k = self.load_value()?;
            let v = self.load_value()?;
            pairs.push((k, v));
        }
        Ok(Value::Object(pairs))
    }

    fn load_unbounded_array(&mut self) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            let v = self.load_value()?;
            if v.is_unspecified() {
                break;
            }
            items.push(v);
        }
        Ok(Value::Array(items))
    }

    /// Invert `encode_swapped`: read `columns` (key, column-array) pairs and
    /// reconstruct the row-major array of objects, skipping `Unspecified`
    /// cells (spec §4.4).
    fn load_transposed(&mut self, columns: usize) -> Result<Value> {
        let mut keys = Vec::with_capacity(columns);
        let mut column_values: Vec<Vec<Value>> = Vec::with_capacity(columns);
        for _ in 0..columns {
            let offset = self.offset();
            let key = self.load_value()?;
            let column = self.load_value()?;
            let items = match column {
                Value::Array(items) => items,
                _ => return Err(Error::syntax("transposed column is not an array", offset)),
            };
            keys.push(key);
            column_values.push(items);
        }
        let row_count = column_values.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut rows: Vec<Vec<(Value, Value)>> = (0..row_count).map(|_| Vec::new()).collect();
        for (key, column) in keys.into_iter().zip(column_values.into_iter()) {
            for (row_idx, cell) in column.into_iter().enumerate() {
                if !cell.is_unspecified() {
                    rows[row_idx].push((key.clone(), cell));
                }
            }
        }
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }
}

/// Decode one document. The `jk!` prefix is optional on input (spec §6).
pub fn unmarshal(data: &[u8]) -> Result<Value> {
    Decoder::new(data).load_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::marshal;

    fn round_trip(v: &Value) {
        let (bytes, err) = marshal(v);
        assert!(err.is_none());
        let decoded = unmarshal(&bytes).expect("decodes cleanly");
        assert_eq!(&decoded, v);
    }

    #[test]
    fn null_round_trips() {
        assert_eq!(unmarshal(b"jk!\x01").unwrap(), Value::Null);
    }

    #[test]
    fn drop_value_skips_the_next_value() {
        // `01 ff 03` -> true: 0x01 is dropped by the preceding ff, 0x03 returned.
        assert_eq!(unmarshal(&[0xff, 0x01, 0x03]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn hash_reference_resolves_prior_string() {
        let arr = Value::Array(vec![Value::from("repeated text"), Value::from("repeated text")]);
        round_trip(&arr);
    }

    #[test]
    fn integer_array_round_trips_through_deltas() {
        round_trip(&Value::Array(vec![
            Value::from(1i64),
            Value::from(2i64),
            Value::from(3i64),
            Value::from(10i64),
        ]));
    }

    #[test]
    fn object_array_round_trips_whether_or_not_transposed() {
        let row = |a: i64, b: i64| {
            Value::Object(vec![(Value::from("a"), Value::from(a)), (Value::from("b"), Value::from(b))])
        };
        round_trip(&Value::Array(vec![row(1, 2), row(3, 4)]));
    }

    #[test]
    fn unassigned_control_byte_is_a_syntax_error() {
        let err = unmarshal(&[0x05]).unwrap_err();
        assert!(matches!(err, Error::SyntaxError { .. }));
    }

    #[test]
    fn syntax_error_offset_counts_from_past_a_consumed_magic() {
        let without_magic = unmarshal(&[0x05]).unwrap_err();
        let with_magic = unmarshal(b"jk!\x05").unwrap_err();
        match (without_magic, with_magic) {
            (Error::SyntaxError { offset: o1, .. }, Error::SyntaxError { offset: o2, .. }) => {
                assert_eq!(o2, o1 + 3);
            }
            _ => panic!("expected syntax errors"),
        }
    }

    #[test]
    fn hash_ref_to_unset_slot_is_a_syntax_error() {
        let err = unmarshal(&[0x3c, 0x00]).unwrap_err();
        assert!(matches!(err, Error::SyntaxError { .. }));
    }

    #[test]
    fn floats_and_strings_and_blobs_round_trip() {
        round_trip(&Value::F64(3.5));
        round_trip(&Value::F32(1.25));
        round_trip(&Value::from("a\u{1f600}b"));
        round_trip(&Value::Blob(vec![1, 2, 3, 4, 5]));
    }

    #[test]
    fn random_integer_arrays_round_trip() {
        use rand::prelude::*;

        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let len: usize = rng.gen_range(0..20);
            let items: Vec<Value> = (0..len).map(|_| Value::from(rng.gen::<i64>())).collect();
            round_trip(&Value::Array(items));
        }
    }
}

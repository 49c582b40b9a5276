//! Encoder half of the control-byte protocol (spec component 5).

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Signed, ToPrimitive};

use crate::error::Error;
use crate::hash::djb_hash;
use crate::marker::Control;
use crate::proxy::Proxy;
use crate::utf::utf8_to_utf16le;
use crate::value::Value;
use crate::varint;

const MAGIC: &[u8; 3] = b"jk!";

/// Encodes dynamic [`Value`]s to JKSN bytes.
///
/// Holds the per-document mutable state the protocol depends on: the last
/// integer emitted (for delta coding) and the two 256-slot hash tables (for
/// string/blob back-references). All three are reset at the start of every
/// [`Encoder::encode`] call.
pub struct Encoder {
    last_int: Option<BigInt>,
    text_hash: Vec<Option<Vec<u8>>>,
    blob_hash: Vec<Option<Vec<u8>>>,
    first_err: Option<Error>,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new()
    }
}

impl Encoder {
    pub fn new() -> Encoder {
        Encoder {
            last_int: None,
            text_hash: vec![None; 256],
            blob_hash: vec![None; 256],
            first_err: None,
        }
    }

    /// Encode `value` to a full JKSN document (magic prefix included).
    ///
    /// Both sides of the codec latch the first error encountered and carry
    /// on best-effort (spec §7); the latched error, if any, is returned
    /// alongside the bytes produced so far.
    pub fn encode(&mut self, value: &Value) -> (Vec<u8>, Option<Error>) {
        self.last_int = None;
        self.first_err = None;
        self.text_hash = vec![None; 256];
        self.blob_hash = vec![None; 256];
        let mut proxy = self.dump_value(value);
        self.optimize(&mut proxy);
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        proxy.serialize(&mut out);
        (out, self.first_err.take())
    }

    fn dump_value(&mut self, value: &Value) -> Proxy {
        match value {
            Value::Null => Proxy::new(Control::Null.into_u8()),
            Value::Unspecified => Proxy::new(Control::Unspecified.into_u8()),
            Value::Bool(false) => Proxy::new(Control::False.into_u8()),
            Value::Bool(true) => Proxy::new(Control::True.into_u8()),
            Value::Int(n) => dump_int(n.as_bigint()),
            Value::F32(f) => dump_f32(*f),
            Value::F64(f) => dump_f64(*f),
            Value::Str(s) => dump_str(s),
            Value::Blob(b) => dump_blob(b),
            Value::Array(items) => self.dump_array(items),
            Value::Object(pairs) => self.dump_object(pairs),
        }
    }

    fn dump_array(&mut self, items: &[Value]) -> Proxy {
        let straight = self.dump_array_straight(items);
        match self.try_transpose(items) {
            Some(transposed) if transposed.size(3) < straight.size(3) => transposed,
            _ => straight,
        }
    }

    fn dump_array_straight(&mut self, items: &[Value]) -> Proxy {
        let children: Vec<Proxy> = items.iter().map(|v| self.dump_value(v)).collect();
        container_header(
            Control::ArraySmall as fn(u8) -> Control,
            Control::ArrayLen8,
            Control::ArrayLen16,
            Control::ArrayLenVlq,
            items.len(),
            children,
        )
    }

    fn dump_object(&mut self, pairs: &[(Value, Value)]) -> Proxy {
        let mut children = Vec::with_capacity(pairs.len() * 2);
        for (k, v) in pairs {
            children.push(self.dump_value(k));
            children.push(self.dump_value(v));
        }
        container_header(
            Control::ObjectSmall as fn(u8) -> Control,
            Control::ObjectLen8,
            Control::ObjectLen16,
            Control::ObjectLenVlq,
            pairs.len(),
            children,
        )
    }

    /// `test_swap_availability` + `encode_swapped` (spec §4.4): only
    /// qualifies when every element is a non-empty object.
    fn try_transpose(&mut self, items: &[Value]) -> Option<Proxy> {
        if items.is_empty() {
            return None;
        }
        let rows: Vec<&[(Value, Value)]> = items
            .iter()
            .map(|v| match v {
                Value::Object(pairs) if !pairs.is_empty() => Some(pairs.as_slice()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        let mut keys: Vec<Value> = Vec::new();
        for row in &rows {
            for (k, _) in row.iter() {
                if !keys.contains(k) {
                    keys.push(k.clone());
                }
            }
        }

        let mut children = Vec::with_capacity(keys.len() * 2);
        for key in &keys {
            let key_proxy = self.dump_value(key);
            let column: Vec<Value> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.clone())
                        .unwrap_or(Value::Unspecified)
                })
                .collect();
            let column_proxy = self.dump_array_straight(&column);
            children.push(key_proxy);
            children.push(column_proxy);
        }

        Some(container_header(
            Control::SwapSmall as fn(u8) -> Control,
            Control::SwapLen8,
            Control::SwapLen16,
            Control::SwapLenVlq,
            keys.len(),
            children,
        ))
    }

    /// Pre-order rewrite: integer deltas, then string/blob hash references
    /// (spec §4.3). Threaded mutable state (`last_int`, the two hash
    /// tables) makes the traversal order significant.
    fn optimize(&mut self, proxy: &mut Proxy) {
        match proxy.control & 0xf0 {
            0x10 => self.optimize_int(proxy),
            0x30 | 0x40 => self.optimize_text(proxy),
            0x50 => self.optimize_blob(proxy),
            _ => {
                for child in &mut proxy.children {
                    self.optimize(child);
                }
            }
        }
    }

    fn optimize_int(&mut self, proxy: &mut Proxy) {
        let n = proxy
            .origin_int
            .clone()
            .expect("integer-class proxy carries its origin value");
        if let Some(last) = self.last_int.clone() {
            let delta = &n - &last;
            if delta.abs() < n.abs() {
                let candidate = dump_delta(&delta);
                if candidate.own_len() <= proxy.own_len() {
                    *proxy = candidate;
                }
            }
        }
        self.last_int = Some(n);
    }

    fn optimize_text(&mut self, proxy: &mut Proxy) {
        if proxy.payload.len() <= 1 {
            return;
        }
        let h = proxy.hash.unwrap_or_else(|| djb_hash(&proxy.payload));
        if self.text_hash[h as usize].as_deref() == Some(proxy.payload.as_slice()) {
            *proxy = Proxy::with_data(Control::Utf16HashRef.into_u8(), vec![h]);
            return;
        }
        self.text_hash[h as usize] = Some(proxy.payload.clone());
    }

    fn optimize_blob(&mut self, proxy: &mut Proxy) {
        if proxy.payload.len() <= 1 {
            return;
        }
        let h = proxy.hash.unwrap_or_else(|| djb_hash(&proxy.payload));
        if self.blob_hash[h as usize].as_deref() == Some(proxy.payload.as_slice()) {
            *proxy = Proxy::with_data(Control::BlobHashRef.into_u8(), vec![h]);
            return;
        }
        self.blob_hash[h as usize] = Some(proxy.payload.clone());
    }
}

/// Header + children for any of the array/object/swap control families,
/// which all share the same inline/8-bit/16-bit/VLQ length selection.
fn container_header(
    small: fn(u8) -> Control,
    len8: Control,
    len16: Control,
    len_vlq: Control,
    count: usize,
    children: Vec<Proxy>,
) -> Proxy {
    if count <= 0x0c {
        Proxy::with_children(small(count as u8).into_u8(), vec![], children)
    } else if count <= 0xff {
        Proxy::with_children(len8.into_u8(), vec![count as u8], children)
    } else if count <= 0xffff {
        let mut data = Vec::new();
        data.extend_from_slice(&(count as u16).to_be_bytes());
        Proxy::with_children(len16.into_u8(), data, children)
    } else {
        let mut data = Vec::new();
        varint::write_vlq(&mut data, &BigUint::from(count));
        Proxy::with_children(len_vlq.into_u8(), data, children)
    }
}

fn fits_i8(n: &BigInt) -> bool {
    *n >= BigInt::from(i8::MIN) && *n <= BigInt::from(i8::MAX)
}

fn fits_i16(n: &BigInt) -> bool {
    *n >= BigInt::from(i16::MIN) && *n <= BigInt::from(i16::MAX)
}

/// The 32-bit range from spec §4.2, resolving the AND-vs-OR open question
/// (§9) as OR so the branch is reachable: `[-2^31,-2^21] ∪ [2^21,2^31-1]`.
fn fits_i32_extended(n: &BigInt) -> bool {
    let lo1 = BigInt::from(i32::MIN);
    let hi1 = -(BigInt::from(1i64) << 21u32);
    let lo2 = BigInt::from(1i64) << 21u32;
    let hi2 = BigInt::from(i32::MAX);
    (*n >= lo1 && *n <= hi1) || (*n >= lo2 && *n <= hi2)
}

fn dump_int(n: &BigInt) -> Proxy {
    let mut p = dump_int_magnitude(n, Control::Int8, Control::Int16, Control::Int32, Control::IntVlq, Control::IntVlqNeg, Some((0, 10, Control::IntSmall as fn(u8) -> Control)));
    p.origin_int = Some(n.clone());
    p
}

fn dump_delta(delta: &BigInt) -> Proxy {
    if let Some(v) = delta.to_i64() {
        if (0..=5).contains(&v) {
            return Proxy::new(Control::DeltaSmall(v as u8).into_u8());
        }
        if (-5..=-1).contains(&v) {
            return Proxy::new(Control::DeltaSmallNeg((v + 5) as u8).into_u8());
        }
    }
    dump_int_magnitude(
        delta,
        Control::DeltaInt8,
        Control::DeltaInt16,
        Control::DeltaInt32,
        Control::DeltaVlq,
        Control::DeltaVlqNeg,
        None,
    )
}

/// Shared width-selection logic for plain and delta integers: try 1/2/4
/// byte two's complement, falling back to a sign-tagged VLQ of the
/// magnitude. `inline` additionally offers a zero-length encoding for a
/// small non-negative range, used only by plain integers.
#[allow(clippy::too_many_arguments)]
fn dump_int_magnitude(
    n: &BigInt,
    c8: Control,
    c16: Control,
    c32: Control,
    c_vlq: Control,
    c_vlq_neg: Control,
    inline: Option<(i64, i64, fn(u8) -> Control)>,
) -> Proxy {
    if let Some((lo, hi, make)) = inline {
        if let Some(v) = n.to_i64() {
            if v >= lo && v <= hi {
                return Proxy::new(make(v as u8).into_u8());
            }
        }
    }
    if fits_i8(n) {
        let mut payload = Vec::new();
        varint::write_fixed(&mut payload, n, 1);
        return Proxy::with_payload(c8.into_u8(), vec![], payload);
    }
    if fits_i16(n) {
        let mut payload = Vec::new();
        varint::write_fixed(&mut payload, n, 2);
        return Proxy::with_payload(c16.into_u8(), vec![], payload);
    }
    if fits_i32_extended(n) {
        let mut payload = Vec::new();
        varint::write_fixed(&mut payload, n, 4);
        return Proxy::with_payload(c32.into_u8(), vec![], payload);
    }
    let mag = varint::to_biguint_magnitude(n);
    let mut payload = Vec::new();
    varint::write_vlq(&mut payload, &mag);
    let control = if n.sign() == Sign::Minus { c_vlq_neg } else { c_vlq };
    Proxy::with_payload(control.into_u8(), vec![], payload)
}

fn dump_f32(f: f32) -> Proxy {
    if f.is_nan() {
        Proxy::new(Control::FloatNan.into_u8())
    } else if f == f32::INFINITY {
        Proxy::new(Control::FloatPosInf.into_u8())
    } else if f == f32::NEG_INFINITY {
        Proxy::new(Control::FloatNegInf.into_u8())
    } else {
        Proxy::with_payload(Control::Float32.into_u8(), vec![], f.to_be_bytes().to_vec())
    }
}

fn dump_f64(f: f64) -> Proxy {
    if f.is_nan() {
        Proxy::new(Control::FloatNan.into_u8())
    } else if f == f64::INFINITY {
        Proxy::new(Control::FloatPosInf.into_u8())
    } else if f == f64::NEG_INFINITY {
        Proxy::new(Control::FloatNegInf.into_u8())
    } else {
        Proxy::with_payload(Control::Float64.into_u8(), vec![], f.to_be_bytes().to_vec())
    }
}

fn dump_str(s: &str) -> Proxy {
    let utf8 = s.as_bytes();
    let utf16 = utf8_to_utf16le(s);
    let mut p = if utf16.len() < utf8.len() {
        dump_length_prefixed(utf16.len() / 2, utf16, 0x0b, Control::Utf16Small as fn(u8) -> Control, Control::Utf16Len8, Control::Utf16Len16, Control::Utf16LenVlq)
    } else {
        dump_length_prefixed(utf8.len(), utf8.to_vec(), 0x0c, Control::Utf8Small as fn(u8) -> Control, Control::Utf8Len8, Control::Utf8Len16, Control::Utf8LenVlq)
    };
    p.hash = Some(djb_hash(&p.payload));
    p
}

fn dump_blob(b: &[u8]) -> Proxy {
    let mut p = dump_length_prefixed(b.len(), b.to_vec(), 0x0b, Control::BlobSmall as fn(u8) -> Control, Control::BlobLen8, Control::BlobLen16, Control::BlobLenVlq);
    p.hash = Some(djb_hash(&p.payload));
    p
}

#[allow(clippy::too_many_arguments)]
fn dump_length_prefixed(
    length: usize,
    payload: Vec<u8>,
    inline_max: u8,
    small: fn(u8) -> Control,
    len8: Control,
    len16: Control,
    len_vlq: Control,
) -> Proxy {
    if length <= inline_max as usize {
        Proxy::with_payload(small(length as u8).into_u8(), vec![], payload)
    } else if length <= 0xff {
        Proxy::with_payload(len8.into_u8(), vec![length as u8], payload)
    } else if length <= 0xffff {
        let mut data = Vec::new();
        data.extend_from_slice(&(length as u16).to_be_bytes());
        Proxy::with_payload(len16.into_u8(), data, payload)
    } else {
        let mut data = Vec::new();
        varint::write_vlq(&mut data, &BigUint::from(length));
        Proxy::with_payload(len_vlq.into_u8(), data, payload)
    }
}

/// Convenience entry point: a throwaway `Encoder` producing one document.
pub fn marshal(value: &Value) -> (Vec<u8>, Option<Error>) {
    Encoder::new().encode(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Integer;

    fn enc(v: &Value) -> Vec<u8> {
        let (bytes, err) = marshal(v);
        assert!(err.is_none(), "unexpected encode error: {:?}", err);
        bytes
    }

    #[test]
    fn null_and_booleans() {
        assert_eq!(enc(&Value::Null), b"jk!\x01");
        assert_eq!(enc(&Value::Bool(true)), b"jk!\x03");
        assert_eq!(enc(&Value::Bool(false)), b"jk!\x02");
    }

    #[test]
    fn short_utf8_string() {
        assert_eq!(enc(&Value::from("hello")), b"jk!\x45hello");
    }

    #[test]
    fn small_int_array_uses_deltas() {
        let arr = Value::Array(vec![
            Value::from(1i64),
            Value::from(2i64),
            Value::from(3i64),
            Value::from(10i64),
        ]);
        let out = enc(&arr);
        assert_eq!(&out[..4], b"jk!\x84");
        // first element always inline, later ones may be rewritten to deltas
        assert_eq!(out[4], 0x11);
    }

    #[test]
    fn object_array_may_transpose() {
        let row = |a: i64, b: i64| {
            Value::Object(vec![(Value::from("a"), Value::from(a)), (Value::from("b"), Value::from(b))])
        };
        let arr = Value::Array(vec![row(1, 2), row(3, 4)]);
        let out = enc(&arr);
        // whichever form wins, it must be well-formed JKSN starting past the magic
        assert!(out.len() > 4);
    }

    #[test]
    fn beyond_i128_uses_vlq() {
        let huge = Integer::from_bigint(BigInt::from(1) << 200u32);
        let out = enc(&Value::Int(huge));
        assert_eq!(out[3], Control::IntVlq.into_u8());
    }

    #[test]
    fn reused_encoder_does_not_leak_hash_state_across_documents() {
        let mut encoder = Encoder::new();
        let first = Value::from("repeatme");
        let (first_bytes, first_err) = encoder.encode(&first);
        assert!(first_err.is_none());
        assert_eq!(crate::decoder::unmarshal(&first_bytes).unwrap(), first);

        // Second document reuses the same string; a leaked hash table would
        // rewrite it to a back-reference the fresh decoder of document two
        // has no way to resolve, since each document decodes independently.
        let second = Value::from("repeatme");
        let (second_bytes, second_err) = encoder.encode(&second);
        assert!(second_err.is_none());
        assert_eq!(crate::decoder::unmarshal(&second_bytes).unwrap(), second);
    }
}

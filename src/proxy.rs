//! The intermediate proxy tree and its recursive size estimator (spec
//! component 4). A `Proxy` mirrors one wire-format value: a control byte,
//! its inline `data` (length/width fields), its `payload` (the encoded
//! scalar bytes), and any children. Serializing a proxy recursively is
//! exactly concatenating `control ‖ data ‖ payload ‖ children...`.

use num_bigint::BigInt;

#[derive(Clone, Debug)]
pub(crate) struct Proxy {
    pub control: u8,
    pub data: Vec<u8>,
    pub payload: Vec<u8>,
    pub children: Vec<Proxy>,
    /// DJB hash of `payload`, precomputed for string/blob proxies so the
    /// optimization pass doesn't need to recompute it.
    pub hash: Option<u8>,
    /// The original integer this proxy encodes, kept alongside the encoded
    /// bytes so the optimizer can compute deltas without decoding them back.
    pub origin_int: Option<BigInt>,
}

impl Proxy {
    pub fn new(control: u8) -> Proxy {
        Proxy {
            control,
            data: Vec::new(),
            payload: Vec::new(),
            children: Vec::new(),
            hash: None,
            origin_int: None,
        }
    }

    pub fn with_data(control: u8, data: Vec<u8>) -> Proxy {
        Proxy {
            control,
            data,
            payload: Vec::new(),
            children: Vec::new(),
            hash: None,
            origin_int: None,
        }
    }

    pub fn with_payload(control: u8, data: Vec<u8>, payload: Vec<u8>) -> Proxy {
        Proxy {
            control,
            data,
            payload,
            children: Vec::new(),
            hash: None,
            origin_int: None,
        }
    }

    pub fn with_children(control: u8, data: Vec<u8>, children: Vec<Proxy>) -> Proxy {
        Proxy {
            control,
            data,
            payload: Vec::new(),
            children,
            hash: None,
            origin_int: None,
        }
    }

    /// Length of this node's own encoded content, excluding the control
    /// byte and excluding children — what the optimizer compares to decide
    /// whether a rewrite is actually smaller.
    pub fn own_len(&self) -> usize {
        self.data.len() + self.payload.len()
    }

    /// Serialize this proxy and, recursively, its children onto `out`.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.push(self.control);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.payload);
        for child in &self.children {
            child.serialize(out);
        }
    }

    /// Sum of encoded bytes down to `depth` levels of recursion. `depth ==
    /// 0` recurses without bound; `depth == 1` counts this node only,
    /// excluding children entirely.
    pub fn size(&self, depth: usize) -> usize {
        let mut result = 1 + self.data.len() + self.payload.len();
        if depth == 0 {
            for child in &self.children {
                result += child.size(0);
            }
        } else if depth != 1 {
            for child in &self.children {
                result += child.size(depth - 1);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_concatenates_header_then_children() {
        let mut leaf = Proxy::with_payload(0x41, vec![], b"a".to_vec());
        leaf.hash = Some(0);
        let root = Proxy::with_children(0x81, vec![], vec![leaf]);
        let mut out = Vec::new();
        root.serialize(&mut out);
        assert_eq!(out, vec![0x81, 0x41, b'a']);
    }

    #[test]
    fn size_stops_at_depth_one() {
        let grandchild = Proxy::with_payload(0x41, vec![], b"xx".to_vec());
        let child = Proxy::with_children(0x81, vec![], vec![grandchild]);
        let root = Proxy::with_children(0x81, vec![], vec![child]);
        // depth 1: just the root header (1 byte)
        assert_eq!(root.size(1), 1);
        // depth 2: root + immediate child header, no grandchild
        assert_eq!(root.size(2), 1 + 1);
        // depth 0: fully recursive
        assert_eq!(root.size(0), 1 + 1 + (1 + 2));
    }
}

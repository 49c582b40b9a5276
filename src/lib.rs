//! JKSN is a compact binary serialization format for JSON-like dynamic
//! values: control-byte dispatch, integer delta compression, string/blob
//! hash back-references, and size-driven row/column transposition of
//! record-shaped arrays.
//!
//! ```
//! use jksn::{Value, marshal, unmarshal};
//!
//! let value = Value::Array(vec![Value::from(1i64), Value::from("hi")]);
//! let (bytes, err) = marshal(&value);
//! assert!(err.is_none());
//! assert_eq!(unmarshal(&bytes).unwrap(), value);
//! ```

#![allow(dead_code)]

extern crate byteorder;
extern crate num_bigint;
extern crate num_integer;
extern crate num_traits;
extern crate serde;
extern crate serde_json;

#[cfg(test)]
extern crate rand;

mod decoder;
mod encoder;
mod error;
mod hash;
mod integer;
mod json;
mod marker;
mod proxy;
mod utf;
mod value;
mod varint;

pub use crate::decoder::{unmarshal, Decoder};
pub use crate::encoder::{marshal, Encoder};
pub use crate::error::{Error, Result};
pub use crate::integer::Integer;
pub use crate::json::{json_text_to_value, value_to_json_text};
pub use crate::value::Value;

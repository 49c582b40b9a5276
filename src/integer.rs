use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::ops;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// An arbitrary-precision signed integer, as required by the dynamic value
/// model (spec §3): JKSN integers are not bounded to machine word sizes.
///
/// A `Value::Int` holds one of these. Construct from any Rust integer type
/// via `From`, or directly from a `BigInt` for values that don't fit in one.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Integer(BigInt);

impl Integer {
    /// Wrap an already-computed `BigInt`.
    pub fn from_bigint(n: BigInt) -> Integer {
        Integer(n)
    }

    /// Access the underlying arbitrary-precision integer.
    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn into_bigint(self) -> BigInt {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == num_bigint::Sign::Minus
    }

    /// Returns the integer as `i64` if it fits, else `None`.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    /// Returns the integer as `u64` if it fits, else `None`.
    pub fn as_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    /// Returns the integer as `f64`, lossily for magnitudes beyond its
    /// precision.
    pub fn as_f64(&self) -> Option<f64> {
        self.0.to_f64()
    }
}

impl ops::Add<&Integer> for &Integer {
    type Output = Integer;
    fn add(self, rhs: &Integer) -> Integer {
        Integer(&self.0 + &rhs.0)
    }
}

impl ops::Sub<&Integer> for &Integer {
    type Output = Integer;
    fn sub(self, rhs: &Integer) -> Integer {
        Integer(&self.0 - &rhs.0)
    }
}

impl ops::Neg for &Integer {
    type Output = Integer;
    fn neg(self) -> Integer {
        Integer(-&self.0)
    }
}

impl Debug for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(&self.0, fmt)
    }
}

impl Display for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.0, fmt)
    }
}

impl PartialEq<i64> for Integer {
    fn eq(&self, other: &i64) -> bool {
        self.0 == BigInt::from(*other)
    }
}

impl PartialOrd<i64> for Integer {
    fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
        self.0.partial_cmp(&BigInt::from(*other))
    }
}

macro_rules! impl_from_int {
    ($t: ty) => {
        impl From<$t> for Integer {
            fn from(n: $t) -> Self {
                Integer(BigInt::from(n))
            }
        }
    };
}

impl_from_int!(u8);
impl_from_int!(u16);
impl_from_int!(u32);
impl_from_int!(u64);
impl_from_int!(u128);
impl_from_int!(usize);
impl_from_int!(i8);
impl_from_int!(i16);
impl_from_int!(i32);
impl_from_int!(i64);
impl_from_int!(i128);
impl_from_int!(isize);

impl From<BigInt> for Integer {
    fn from(n: BigInt) -> Self {
        Integer(n)
    }
}

use serde::{
    de::{Deserialize, Deserializer},
    ser::{Serialize, Serializer},
};

impl Serialize for Integer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(v) = self.0.to_i64() {
            serializer.serialize_i64(v)
        } else if let Some(v) = self.0.to_u64() {
            serializer.serialize_u64(v)
        } else {
            // Beyond 64 bits: JSON has no native arbitrary-precision integer,
            // so fall back to its decimal text form (same compromise
            // serde_json itself makes for `arbitrary_precision` numbers).
            serializer.serialize_str(&self.0.to_string())
        }
    }
}

impl<'de> Deserialize<'de> for Integer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IntVisitor;
        impl<'de> serde::de::Visitor<'de> for IntVisitor {
            type Value = Integer;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "an integer")
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Integer::from(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Integer::from(v))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse::<BigInt>()
                    .map(Integer)
                    .map_err(|_| E::custom("invalid integer literal"))
            }
        }

        deserializer.deserialize_any(IntVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub() {
        let x = Integer::from(10i64);
        let y = Integer::from(3i64);
        assert_eq!(&x + &y, Integer::from(13i64));
        assert_eq!(&x - &y, Integer::from(7i64));
        assert_eq!(-&x, Integer::from(-10i64));
    }

    #[test]
    fn beyond_i128_round_trips() {
        let huge = Integer::from_bigint(BigInt::from(1) << 200u32);
        assert_eq!(huge.as_i64(), None);
        assert!(huge.as_bigint().bits() > 128);
    }

    #[test]
    fn ordering() {
        assert!(Integer::from(-1i64) < Integer::from(0i64));
        assert!(Integer::from(0i64) < Integer::from(1i64));
    }
}

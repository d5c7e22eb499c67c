#![warn(missing_docs)]

//! Identifier space of the ring.
//!
//! Vnode ids and object keys share the 160 bits of a SHA-1 digest. A [Did] wraps them as an
//! element of Z/(2^160): `+`, `-` and unary `-` wrap around, so walking the ring never overflows.
//!
//! Raw comparison of two ids says nothing about the circle. Every interval test below is written
//! with the clockwise distance from the left bound, and [BiasId] orders ids as seen from a given
//! vnode.

use std::ops::Add;
use std::ops::Neg;
use std::ops::Sub;
use std::str::FromStr;

use ethereum_types::H160;
use num_bigint::BigUint;
use serde::Deserialize;
use serde::Serialize;
use sha1::Digest;
use sha1::Sha1;

use crate::consts::KEY_BITS;
use crate::error::Error;
use crate::error::Result;

/// A point of the ring, serialized as `0x`-prefixed hex.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize, Hash)]
pub struct Did(H160);

/// 2^160.
fn modulus() -> BigUint {
    BigUint::from(1u8) << KEY_BITS
}

impl Did {
    /// SHA-1 of the UTF-8 bytes of a vnode or resource name.
    pub fn from_name(name: &str) -> Did {
        let digest = Sha1::digest(name.as_bytes());
        Self(H160::from_slice(&digest))
    }

    /// Origin of the ring.
    pub fn zero() -> Did {
        Self(H160::zero())
    }

    /// `2^k`, the offset of finger `k`. Wraps to zero for `k == 160`.
    pub fn pow2(k: usize) -> Did {
        Did::from(BigUint::from(1u8) << k)
    }

    /// How far `other` is, walking clockwise from `self`.
    pub fn distance(&self, other: Did) -> Did {
        other - *self
    }

    /// `self` in `(a, b)`. With `a == b` that is every id but `a`.
    pub fn is_between(&self, a: Did, b: Did) -> bool {
        let pos = a.distance(*self);
        let span = a.distance(b);
        pos != Did::zero() && (span == Did::zero() || pos < span)
    }

    /// `self` in `(a, b]`. With `a == b` that is the whole ring.
    pub fn is_between_right_closed(&self, a: Did, b: Did) -> bool {
        let span = a.distance(b);
        span == Did::zero() || (*self != a && a.distance(*self) <= span)
    }

    /// `self` as seen from `origin`.
    pub fn bias(&self, origin: Self) -> BiasId {
        BiasId::new(origin, *self)
    }

    fn to_biguint(self) -> BigUint {
        BigUint::from_bytes_be(self.0.as_bytes())
    }
}

/// A [Did] measured from an origin. Ids with the same origin order by clockwise distance to it.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct BiasId {
    origin: Did,
    /// Clockwise distance from `origin`.
    offset: Did,
}

impl BiasId {
    /// Measure `did` from `origin`.
    pub fn new(origin: Did, did: Did) -> BiasId {
        BiasId {
            origin,
            offset: origin.distance(did),
        }
    }

    /// The id this was built from.
    pub fn to_did(self) -> Did {
        self.origin + self.offset
    }

    /// Clockwise distance from the origin.
    pub fn pos(&self) -> Did {
        self.offset
    }
}

impl Ord for BiasId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // an id measured from elsewhere is brought back to our origin first
        let theirs = self.origin.distance(other.to_did());
        self.offset.cmp(&theirs)
    }
}

impl PartialOrd for BiasId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<BiasId> for Did {
    fn from(id: BiasId) -> Did {
        id.to_did()
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        H160::from_str(s)
            .map(Self)
            .map_err(|_| Error::BadHexDid(s.to_string()))
    }
}

impl From<H160> for Did {
    fn from(raw: H160) -> Self {
        Self(raw)
    }
}

impl From<u32> for Did {
    fn from(n: u32) -> Did {
        Did::from(BigUint::from(n))
    }
}

impl From<BigUint> for Did {
    fn from(n: BigUint) -> Self {
        let bytes = (n % modulus()).to_bytes_be();
        let mut buf = [0u8; 20];
        buf[20 - bytes.len()..].copy_from_slice(&bytes);
        Self(H160(buf))
    }
}

impl From<Did> for BigUint {
    fn from(did: Did) -> BigUint {
        did.to_biguint()
    }
}

impl Neg for Did {
    type Output = Self;
    fn neg(self) -> Self {
        Did::from(modulus() - self.to_biguint())
    }
}

impl Add for Did {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Did::from(self.to_biguint() + rhs.to_biguint())
    }
}

impl Sub for Did {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Did::from(self.to_biguint() + modulus() - rhs.to_biguint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Did {
        Did::from_str(s).unwrap()
    }

    #[test]
    fn test_ring_arithmetic() {
        let top = hex("0xffffffffffffffffffffffffffffffffffffffff");
        let one = Did::from(1u32);
        assert_eq!(top + one, Did::zero());
        assert_eq!(Did::zero() - one, top);
        assert_eq!(-one, top);
        assert_eq!(-Did::zero(), Did::zero());
        assert_eq!(Did::pow2(0), one);
        assert_eq!(Did::pow2(160), Did::zero());
        assert_eq!(Did::pow2(159) + Did::pow2(159), Did::zero());

        let a = Did::from_name("A");
        assert_eq!(a - a, Did::zero());
        assert_eq!(-(-a), a);
    }

    #[test]
    fn test_name_is_sha1() {
        assert_eq!(
            Did::from_name("foo").to_string(),
            "0x0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33"
        );
        assert_ne!(Did::from_name("A"), Did::from_name("B"));
    }

    #[test]
    fn test_intervals() {
        let (ten, fifteen, twenty) = (Did::from(10u32), Did::from(15u32), Did::from(20u32));

        assert!(fifteen.is_between(ten, twenty));
        assert!(!ten.is_between(ten, twenty));
        assert!(!twenty.is_between(ten, twenty));
        assert!(twenty.is_between_right_closed(ten, twenty));
        assert!(!ten.is_between_right_closed(ten, twenty));

        // (20, 10) wraps through zero
        assert!(!fifteen.is_between(twenty, ten));
        assert!(Did::zero().is_between(twenty, ten));
        assert!(Did::from(25u32).is_between(twenty, ten));
        assert!(ten.is_between_right_closed(twenty, ten));

        assert!(fifteen.is_between(ten, ten));
        assert!(!ten.is_between(ten, ten));
        assert!(ten.is_between_right_closed(ten, ten));
    }

    #[test]
    fn test_bias_order() {
        let origin = Did::from(15u32);
        let (ten, twenty) = (Did::from(10u32), Did::from(20u32));
        // from 15, 20 is five steps away and 10 almost a full turn
        assert!(twenty.bias(origin) < ten.bias(origin));
        assert_eq!(twenty.bias(origin).pos(), Did::from(5u32));
        assert_eq!(Did::from(ten.bias(origin)), ten);
        // different origins are compared from the left hand side
        assert!(twenty.bias(origin) < ten.bias(Did::zero()));
    }

    #[test]
    fn test_hex_forms() {
        assert!(Did::from_str("0x11E807fcc88dD319270493fB2e822e388Fe36ab").is_err());
        assert_eq!(
            hex("11E807fcc88dD319270493fB2e822e388Fe36ab0"),
            hex("0x11E807fcc88dD319270493fB2e822e388Fe36ab0")
        );
        let did = hex("0x11E807fcc88dD319270493fB2e822e388Fe36ab0");
        let json = serde_json::to_string(&did).unwrap();
        assert_eq!(json, "\"0x11e807fcc88dd319270493fb2e822e388fe36ab0\"");
        assert_eq!(serde_json::from_str::<Did>(&json).unwrap(), did);
    }
}

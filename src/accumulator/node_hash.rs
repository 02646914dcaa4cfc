//! Hash types used throughout the accumulator. [AccumulatorHash] is the
//! contract a digest has to fulfill to live in the forest: it knows how to
//! combine two child hashes into a parent and how to represent the reserved
//! "empty" value we write over fully deleted subtrees. [BitcoinNodeHash] is
//! the implementation used by Bitcoin nodes, combining children with
//! sha512-256.
//!
//! # Examples
//! Building from a str
//! ```
//! use std::str::FromStr;
//!
//! use pollard::accumulator::node_hash::BitcoinNodeHash;
//! let hash = BitcoinNodeHash::from_str(
//!     "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d",
//! )
//! .unwrap();
//! assert_eq!(
//!     hash.to_string().as_str(),
//!     "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d"
//! );
//! ```
//! Computing a parent hash (i.e. the hash of two child nodes concatenated)
//! ```
//! use std::str::FromStr;
//!
//! use pollard::accumulator::node_hash::AccumulatorHash;
//! use pollard::accumulator::node_hash::BitcoinNodeHash;
//! let left = BitcoinNodeHash::new([0; 32]);
//! let right = BitcoinNodeHash::new([1; 32]);
//! let parent = BitcoinNodeHash::parent_hash(&left, &right);
//! let expected_parent = BitcoinNodeHash::from_str(
//!     "34e33ca0c40b7bd33d28932ca9e35170def7309a3bf91ecda5e1ceb067548a12",
//! )
//! .unwrap();
//! assert_eq!(parent, expected_parent);
//! ```
use std::convert::TryFrom;
use std::fmt::Debug;
use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;

use bitcoin_hashes::hex;
use bitcoin_hashes::sha256;
use bitcoin_hashes::sha512_256;
use bitcoin_hashes::Hash;
use bitcoin_hashes::HashEngine;
#[cfg(feature = "with-serde")]
use serde::Deserialize;
#[cfg(feature = "with-serde")]
use serde::Serialize;

/// A shortened leaf hash, used as the key of the leaf lookup map.
///
/// Half of a collision-resistant digest is still plenty to tell leaves apart,
/// and halving the key keeps the map smaller. Mini hashes only ever index,
/// they never flow into any hash computation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub struct MiniHash([u8; 16]);

impl Debug for MiniHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 16]> for MiniHash {
    fn from(inner: [u8; 16]) -> Self {
        MiniHash(inner)
    }
}

/// The contract between the accumulator and the digest type it stores.
///
/// Implementations must make `parent_hash` deterministic and collision
/// resistant, and must reserve one value as [AccumulatorHash::empty], which
/// the forest writes over roots of fully deleted trees. [AccumulatorHash::mini]
/// returns the first half of the digest, used to key the leaf lookup map.
pub trait AccumulatorHash:
    Copy + Clone + Ord + Debug + Display + std::hash::Hash + Default + 'static
{
    /// Whether this is the reserved empty value.
    fn is_empty(&self) -> bool;
    /// The reserved empty value.
    fn empty() -> Self;
    /// The merkle parent of the two passed in nodes.
    fn parent_hash(left: &Self, right: &Self) -> Self;
    /// The first half of this digest.
    fn mini(&self) -> MiniHash;
}

/// A 32-byte node hash combining children with sha512-256, as Bitcoin nodes do.
///
/// # Example
/// ```
/// use pollard::accumulator::node_hash::BitcoinNodeHash;
/// let hash = BitcoinNodeHash::new([0; 32]);
/// assert_eq!(
///     hash.to_string().as_str(),
///     "0000000000000000000000000000000000000000000000000000000000000000"
/// );
/// ```
#[derive(Eq, PartialEq, Copy, Clone, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub enum BitcoinNodeHash {
    /// The reserved empty value, written over roots of fully deleted trees.
    #[default]
    Empty,
    /// An actual digest.
    Some([u8; 32]),
}

impl Deref for BitcoinNodeHash {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        match self {
            BitcoinNodeHash::Some(ref inner) => inner,
            BitcoinNodeHash::Empty => &[0; 32],
        }
    }
}

impl Display for BitcoinNodeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BitcoinNodeHash::Empty => write!(f, "empty"),
            BitcoinNodeHash::Some(ref inner) => {
                for byte in inner.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl Debug for BitcoinNodeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BitcoinNodeHash::Empty => write!(f, "empty"),
            BitcoinNodeHash::Some(_) => {
                for byte in self.deref().iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<[u8; 32]> for BitcoinNodeHash {
    fn from(hash: [u8; 32]) -> Self {
        BitcoinNodeHash::Some(hash)
    }
}

impl From<&[u8; 32]> for BitcoinNodeHash {
    fn from(hash: &[u8; 32]) -> Self {
        BitcoinNodeHash::Some(*hash)
    }
}

impl From<sha256::Hash> for BitcoinNodeHash {
    fn from(hash: sha256::Hash) -> Self {
        BitcoinNodeHash::Some(hash.to_byte_array())
    }
}

impl From<sha512_256::Hash> for BitcoinNodeHash {
    fn from(hash: sha512_256::Hash) -> Self {
        BitcoinNodeHash::Some(hash.to_byte_array())
    }
}

impl TryFrom<&str> for BitcoinNodeHash {
    type Error = hex::HexToArrayError;

    fn try_from(hash: &str) -> Result<Self, Self::Error> {
        // The all-zero digest parses to the empty hash, so deleted roots can
        // be spelled out in test vectors.
        if hash == "0000000000000000000000000000000000000000000000000000000000000000" {
            return Ok(BitcoinNodeHash::Empty);
        }

        let inner = hex::FromHex::from_hex(hash)?;
        Ok(BitcoinNodeHash::Some(inner))
    }
}

impl FromStr for BitcoinNodeHash {
    type Err = hex::HexToArrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BitcoinNodeHash::try_from(s)
    }
}

impl BitcoinNodeHash {
    /// Creates a new hash from a 32 byte array.
    pub fn new(inner: [u8; 32]) -> Self {
        BitcoinNodeHash::Some(inner)
    }
}

impl AccumulatorHash for BitcoinNodeHash {
    fn is_empty(&self) -> bool {
        matches!(self, BitcoinNodeHash::Empty)
    }

    /// The reserved empty value, used for roots whose whole tree was deleted.
    /// # Example
    /// ```
    /// use pollard::accumulator::node_hash::AccumulatorHash;
    /// use pollard::accumulator::node_hash::BitcoinNodeHash;
    /// let hash = BitcoinNodeHash::empty();
    /// assert!(hash.is_empty());
    /// ```
    fn empty() -> Self {
        BitcoinNodeHash::Empty
    }

    /// The merkle parent of the two passed in nodes.
    fn parent_hash(left: &Self, right: &Self) -> Self {
        let mut engine = sha512_256::Hash::engine();
        engine.input(&**left);
        engine.input(&**right);
        sha512_256::Hash::from_engine(engine).into()
    }

    fn mini(&self) -> MiniHash {
        let mut inner = [0; 16];
        inner.copy_from_slice(&self.deref()[..16]);
        MiniHash(inner)
    }
}

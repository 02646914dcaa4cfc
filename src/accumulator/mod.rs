//! The accumulator core: the forest data structures, the proofs that tie them
//! together and the arithmetic mapping positions to nodes. The structures are
//! compatible with each other, so a [pollard::Pollard] run by an archive node
//! can serve proofs that a [stump::Stump] held by a light client verifies and
//! applies, and both arrive at the same roots.
//!
//! If you only need to verify membership and track the set's roots, use
//! [stump::Stump]. If you need to generate proofs, or undo a block of changes,
//! use [pollard::Pollard].
use std::fmt::Debug;
use std::fmt::Display;

use self::node_hash::AccumulatorHash;

pub mod node_hash;
pub mod pollard;
pub mod proof;
pub mod stump;

mod node;
pub(super) mod util;

/// Things that can go wrong while operating on the accumulator.
///
/// All operations validate before they commit, so getting an error back means
/// the accumulator is exactly as it was before the call — with the exception
/// of [AccumulatorError::Corruption], which means an internal invariant broke
/// and the instance shouldn't be trusted anymore.
pub enum AccumulatorError<Hash: AccumulatorHash> {
    /// We don't have a leaf with this hash in the forest.
    ///
    /// Either it was never added, it was deleted, or it wasn't marked for
    /// remembering and got pruned away.
    NodeNotFound(Hash),

    /// This position doesn't exist in the forest, or the branch leading to it
    /// was pruned.
    PositionNotFound(u64),

    /// A deletion target's hash doesn't match the leaf stored at that position.
    HashMismatch {
        position: u64,
        expected: Hash,
        got: Hash,
    },

    /// The same position shows up twice in a set of targets.
    DuplicateTarget(u64),

    /// The proof doesn't hold up: wrong shape, or the roots it computes aren't
    /// the roots we have.
    InvalidProof(&'static str),

    /// An internal invariant was violated. This is a bug; the accumulator
    /// state can no longer be relied on.
    Corruption(&'static str),
}

impl<Hash: AccumulatorHash> PartialEq for AccumulatorError<Hash> {
    fn eq(&self, other: &Self) -> bool {
        use AccumulatorError::*;
        match (self, other) {
            (NodeNotFound(a), NodeNotFound(b)) => a == b,
            (PositionNotFound(a), PositionNotFound(b)) => a == b,
            (DuplicateTarget(a), DuplicateTarget(b)) => a == b,
            (InvalidProof(a), InvalidProof(b)) => a == b,
            (Corruption(a), Corruption(b)) => a == b,
            (
                HashMismatch {
                    position: p1,
                    expected: e1,
                    got: g1,
                },
                HashMismatch {
                    position: p2,
                    expected: e2,
                    got: g2,
                },
            ) => p1 == p2 && e1 == e2 && g1 == g2,
            _ => false,
        }
    }
}

impl<Hash: AccumulatorHash> Eq for AccumulatorError<Hash> {}

impl<Hash: AccumulatorHash> Debug for AccumulatorError<Hash> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(hash) => write!(f, "leaf {hash} not found in the forest"),
            Self::PositionNotFound(pos) => write!(f, "position {pos} not found in the forest"),
            Self::HashMismatch {
                position,
                expected,
                got,
            } => write!(
                f,
                "hash mismatch at position {position}: expected {expected}, got {got}"
            ),
            Self::DuplicateTarget(pos) => write!(f, "duplicate target {pos}"),
            Self::InvalidProof(why) => write!(f, "invalid proof: {why}"),
            Self::Corruption(why) => write!(f, "accumulator corruption: {why}"),
        }
    }
}

impl<Hash: AccumulatorHash> Display for AccumulatorError<Hash> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

//! A proof is a collection of targets and hashes. Each target is the position
//! of a leaf being proven; the hashes are all the siblings along the targets'
//! paths to their roots that can't be computed from the targets themselves.
//!
//! Assuming a tree with leaf values [0, 1, 2, 3, 4, 5, 6, 7], we have:
//!```!
//! 14
//! |-----------------\
//! 12                13
//! |---------\       |--------\
//! 08        09      10       11
//! |----\    |----\  |----\   |----\
//! 00   01   02  03  04   05  06   07
//! ```
//! If we are proving `00` (i.e. 00 is our target), then we need 01, 09 and
//! 13's hashes: hashing 00 with 01 gives 08, 08 with 09 gives 12, and 12 with
//! 13 gives the root 14. Note that 08, 12 and 14 are computed on the way and
//! are never part of the proof.
use super::node_hash::AccumulatorHash;
use super::util;
use super::AccumulatorError;
#[cfg(feature = "with-serde")]
use serde::Deserialize;
#[cfg(feature = "with-serde")]
use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub struct Proof<Hash> {
    /// The positions of the leaves being proven. `targets[i]` is the position
    /// whose leaf hash the caller supplies as `del_hashes[i]` at verification
    /// time; the order is whatever the caller asked for, verification sorts
    /// the pairs itself.
    pub targets: Vec<u64>,
    /// The sibling hashes needed to recompute every targeted tree's root,
    /// ordered by ascending position.
    pub hashes: Vec<Hash>,
}

impl<Hash: AccumulatorHash> Proof<Hash> {
    /// Creates a proof from a vector of targets and sibling hashes.
    pub fn new(targets: Vec<u64>, hashes: Vec<Hash>) -> Self {
        Proof { targets, hashes }
    }

    /// Checks this proof against a set of roots.
    ///
    /// `del_hashes[i]` must be the leaf hash at `self.targets[i]`, and `roots`
    /// the accumulator's current roots, tallest tree first. Errors if the
    /// proof is malformed or the recomputed roots don't all show up in
    /// `roots`.
    pub fn verify(
        &self,
        del_hashes: &[Hash],
        roots: &[Hash],
        num_leaves: u64,
    ) -> Result<(), AccumulatorError<Hash>> {
        let computed = self.calculate_roots(del_hashes, num_leaves)?;

        // Shorter trees yield their roots first, so walk `roots` from the
        // shortest side. Trees without targets simply don't get matched
        // against.
        let mut matched = 0;
        for root in roots.iter().rev() {
            if matched < computed.len() && *root == computed[matched] {
                matched += 1;
            }
        }

        if matched != computed.len() {
            return Err(AccumulatorError::InvalidProof(
                "computed roots don't match the accumulator",
            ));
        }

        Ok(())
    }

    /// Computes the root of every targeted tree, bottom-up.
    ///
    /// Pairs each target with its hash, then walks the rows: two siblings both
    /// present hash together, a lone node hashes with the next proof hash, and
    /// whatever reaches a root position is collected. Roots come out shortest
    /// tree first. Feeding the empty hash for a target computes the roots as
    /// they'd look *after* deleting it: an empty child doesn't hash, it lets
    /// its sibling take the parent's place.
    pub(super) fn calculate_roots(
        &self,
        del_hashes: &[Hash],
        num_leaves: u64,
    ) -> Result<Vec<Hash>, AccumulatorError<Hash>> {
        if self.targets.len() != del_hashes.len() {
            return Err(AccumulatorError::InvalidProof(
                "each target needs exactly one leaf hash",
            ));
        }

        let total_rows = util::tree_rows(num_leaves);

        // Nodes must be sorted for finding siblings during hashing.
        let mut nodes: Vec<(u64, Hash)> = self
            .targets
            .iter()
            .copied()
            .zip(del_hashes.iter().copied())
            .collect();
        nodes.sort_unstable_by_key(|(pos, _)| *pos);

        for pair in nodes.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(AccumulatorError::DuplicateTarget(pair[0].0));
            }
        }
        for (pos, _) in nodes.iter() {
            if util::detect_offset(*pos, num_leaves).is_none() {
                return Err(AccumulatorError::PositionNotFound(*pos));
            }
        }

        let sorted_targets: Vec<u64> = nodes.iter().map(|(pos, _)| *pos).collect();
        let needed = util::get_proof_positions(&sorted_targets, num_leaves, total_rows).len();
        if needed != self.hashes.len() {
            return Err(AccumulatorError::InvalidProof(
                "wrong number of proof hashes",
            ));
        }

        let mut calculated_root_hashes = Vec::with_capacity(util::num_roots(num_leaves));
        let mut hashes_iter = self.hashes.iter();

        for row in 0..=total_rows {
            // Only nodes on the current row; parents pushed below surface on
            // the next iteration.
            let mut row_nodes = nodes
                .clone()
                .into_iter()
                .filter(|(pos, _)| util::detect_row(*pos, total_rows) == row)
                .peekable();

            while let Some((pos, hash)) = row_nodes.next() {
                if util::is_root_position(pos, num_leaves, total_rows) {
                    calculated_root_hashes.push(hash);
                    continue;
                }

                let parent_pos = util::parent(pos, total_rows);

                // Is the next node our sibling? Then we hash together and no
                // proof hash is spent.
                if let Some((next_pos, next_hash)) = row_nodes.peek().copied() {
                    if util::is_right_sibling(pos, next_pos) {
                        Self::sorted_push(&mut nodes, (parent_pos, Self::combine(hash, next_hash)));

                        // We consumed two nodes; peek doesn't advance the
                        // iterator, so skip one more here.
                        row_nodes.next();
                        continue;
                    }
                }

                let proof_hash = *hashes_iter
                    .next()
                    .ok_or(AccumulatorError::InvalidProof("proof too short"))?;

                let parent_hash = if util::is_left_niece(pos) {
                    Self::combine(hash, proof_hash)
                } else {
                    Self::combine(proof_hash, hash)
                };
                Self::sorted_push(&mut nodes, (parent_pos, parent_hash));
            }
        }

        Ok(calculated_root_hashes)
    }

    /// The parent of two children, with the deletion rule: an empty child
    /// means "gone", so the sibling is promoted instead of hashed.
    fn combine(left: Hash, right: Hash) -> Hash {
        if left.is_empty() {
            return right;
        }
        if right.is_empty() {
            return left;
        }
        Hash::parent_hash(&left, &right)
    }

    fn sorted_push(nodes: &mut Vec<(u64, Hash)>, to_add: (u64, Hash)) {
        let idx = nodes
            .binary_search_by_key(&to_add.0, |(pos, _)| *pos)
            .unwrap_or_else(|idx| idx);
        nodes.insert(idx, to_add);
    }
}

//! The Pollard is the accumulator's full data structure: a forest of perfect
//! binary merkle trees over the set's elements, kept partially (or, in full
//! mode, completely) in memory so it can generate proofs, apply batches of
//! additions and deletions, and undo the most recent batch.
//!
//! Nodes hold their hash, a reference to their **aunt** (not parent!) and
//! their nieces (not children!), in the layout the node module describes in
//! detail. Every node is
//! owned by exactly one ancestor, with the roots owned by the Pollard itself,
//! so dropping a node drops its whole subtree and nothing can leak: upward
//! links are all [std::rc::Weak]. Because of the [std::rc::Rc]/[std::cell::RefCell]
//! plumbing a Pollard is not Sync; wrap it in a mutex if it has to be shared,
//! all methods expect exclusive access for writes.
//!
//! Positions and nodes are two addressings of the same forest: positions are
//! implicit, derived from the leaf count, while nodes are actual allocations.
//! `get_node` goes from a position to a node by walking niece links down from
//! a root; `calculate_position` goes the other way, walking up to the root
//! and reading the path back off the slots it passed through. Both directions
//! live here so they can't drift apart.
use std::collections::HashMap;
use std::fmt::Debug;
use std::fmt::Display;
use std::rc::Rc;
use std::rc::Weak;

use super::node::PolNode;
use super::node_hash::AccumulatorHash;
use super::node_hash::MiniHash;
use super::proof::Proof;
use super::util::detect_offset;
use super::util::detwin;
use super::util::get_proof_positions;
use super::util::is_left_niece;
use super::util::is_root_position;
use super::util::left_child;
use super::util::max_position_at_row;
use super::util::num_roots;
use super::util::parent;
use super::util::right_child;
use super::util::root_position;
use super::util::root_row;
use super::util::tree_rows;
use super::AccumulatorError;

/// A new element for the accumulator.
#[derive(Clone, Copy, Debug)]
pub struct Leaf<Hash> {
    /// The hash committed to the accumulator.
    pub hash: Hash,
    /// Whether the forest should keep this leaf's branch around so its
    /// inclusion proof stays serveable. Ignored (always on) in full mode.
    pub remember: bool,
}

pub struct Pollard<Hash: AccumulatorHash> {
    /// The roots of the forest, tallest tree first. There's exactly one root
    /// per set bit of `num_leaves`; a tree whose every leaf was deleted keeps
    /// its slot with the empty hash as a sentinel.
    roots: Vec<Rc<PolNode<Hash>>>,
    /// How many leaves were ever added. Deletions don't decrement this: the
    /// whole shape of the forest is a function of it, so positions stay
    /// meaningful across deletions.
    num_leaves: u64,
    /// How many of those leaves are deleted.
    num_dels: u64,
    /// Leaf lookup: first half of a leaf's hash to its node. Only leaves
    /// added with `remember` (or everything, in full mode) are here, and
    /// entries leave the map the moment their leaf leaves the forest.
    node_map: HashMap<MiniHash, Weak<PolNode<Hash>>>,
    /// The rows of the empty roots the most recent batch of additions wrote
    /// over, in the order they went. An addition moving over a dead tree
    /// leaves no trace in the node structure, so undoing one needs this
    /// journal to re-seat the sentinels.
    wrote_over_rows: Vec<u8>,
    /// Authority mode: keep every node, remember every leaf. A full pollard
    /// can serve a proof for anything still in the set.
    full: bool,
}

impl<Hash: AccumulatorHash> PartialEq for Pollard<Hash> {
    fn eq(&self, other: &Self) -> bool {
        self.num_leaves == other.num_leaves
            && self.roots.len() == other.roots.len()
            && self
                .roots
                .iter()
                .zip(other.roots.iter())
                .all(|(a, b)| a.hash() == b.hash())
    }
}

impl<Hash: AccumulatorHash> Eq for Pollard<Hash> {}

impl<Hash: AccumulatorHash> Debug for Pollard<Hash> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.string())
    }
}

impl<Hash: AccumulatorHash> Display for Pollard<Hash> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.string())
    }
}

// Public API.

impl<Hash: AccumulatorHash> Pollard<Hash> {
    /// Creates an empty accumulator. With `full` set it runs in authority
    /// mode: every node is retained regardless of the leaves' remember flags,
    /// so proofs can be served for arbitrary elements.
    pub fn new(full: bool) -> Self {
        Pollard {
            roots: Vec::new(),
            num_leaves: 0,
            num_dels: 0,
            node_map: HashMap::new(),
            wrote_over_rows: Vec::new(),
            full,
        }
    }

    /// How many leaves were ever added.
    pub fn leaves(&self) -> u64 {
        self.num_leaves
    }

    /// How many of them were deleted.
    pub fn dels(&self) -> u64 {
        self.num_dels
    }

    /// The hash of every root, tallest tree first. Fully deleted trees show
    /// up as the empty hash.
    pub fn roots(&self) -> Vec<Hash> {
        self.roots.iter().map(|root| root.hash()).collect()
    }

    /// The one write operation: applies a batch of deletions and then a batch
    /// of additions. `del_hashes[i]` must be the leaf at `del_targets[i]`
    /// (positions come from a [Pollard::prove] call against the current
    /// state). Everything is validated up front; on error the accumulator is
    /// unchanged.
    pub fn modify(
        &mut self,
        adds: &[Leaf<Hash>],
        del_hashes: &[Hash],
        del_targets: &[u64],
    ) -> Result<(), AccumulatorError<Hash>> {
        if del_hashes.len() != del_targets.len() {
            return Err(AccumulatorError::InvalidProof(
                "each deletion target needs exactly one leaf hash",
            ));
        }

        let mut dels = del_targets.to_vec();
        dels.sort_unstable();
        for pair in dels.windows(2) {
            if pair[0] == pair[1] {
                return Err(AccumulatorError::DuplicateTarget(pair[0]));
            }
        }

        self.verify_dels(del_hashes, del_targets)?;

        // Validation is done, commit. The write-over journal describes the
        // previous batch up to here; from now on it describes this one.
        self.wrote_over_rows.clear();

        for hash in del_hashes {
            self.node_map.remove(&hash.mini());
        }
        self.remove(dels)?;
        self.num_dels += del_targets.len() as u64;

        self.add(adds);
        Ok(())
    }

    /// Builds an inclusion proof for the given leaf hashes. The returned
    /// targets are in request order, so `hashes[i]` is the leaf at
    /// `proof.targets[i]`; the proof hashes ascend by position.
    pub fn prove(&self, hashes: &[Hash]) -> Result<Proof<Hash>, AccumulatorError<Hash>> {
        if hashes.is_empty() {
            return Ok(Proof::default());
        }

        let mut targets = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let node = self
                .node_map
                .get(&hash.mini())
                .and_then(Weak::upgrade)
                .ok_or(AccumulatorError::NodeNotFound(*hash))?;
            targets.push(self.calculate_position(&node)?);
        }

        let mut sorted_targets = targets.clone();
        sorted_targets.sort_unstable();

        let total_rows = tree_rows(self.num_leaves);
        let mut proof_hashes = Vec::new();
        for pos in get_proof_positions(&sorted_targets, self.num_leaves, total_rows) {
            let (node, _) = self
                .get_node(pos)?
                .ok_or(AccumulatorError::PositionNotFound(pos))?;
            proof_hashes.push(node.hash());
        }

        Ok(Proof::new(targets, proof_hashes))
    }

    /// Checks an inclusion proof against the current roots.
    pub fn verify(
        &self,
        del_hashes: &[Hash],
        proof: &Proof<Hash>,
    ) -> Result<(), AccumulatorError<Hash>> {
        proof.verify(del_hashes, &self.roots(), self.num_leaves)
    }

    /// Reverses the most recent [Pollard::modify]. `num_adds` is how many
    /// leaves that modify added; `prev_targets` and `prev_del_hashes` are the
    /// targets and leaf hashes it deleted, exactly as they were passed in
    /// (the deleted subtrees aren't kept around, so the caller has to hand
    /// the hashes back to rebuild them).
    pub fn undo(
        &mut self,
        num_adds: u64,
        prev_targets: &[u64],
        prev_del_hashes: &[Hash],
    ) -> Result<(), AccumulatorError<Hash>> {
        if prev_targets.len() != prev_del_hashes.len() {
            return Err(AccumulatorError::InvalidProof(
                "each deletion target needs exactly one leaf hash",
            ));
        }
        if num_adds > self.num_leaves {
            return Err(AccumulatorError::InvalidProof(
                "undoing more additions than the accumulator has leaves",
            ));
        }

        for _ in 0..num_adds {
            self.undo_single_add()?;
        }
        self.undo_empty_roots()?;
        self.undo_dels(prev_targets, prev_del_hashes)?;

        self.num_dels = self
            .num_dels
            .checked_sub(prev_targets.len() as u64)
            .ok_or(AccumulatorError::Corruption(
                "undoing more deletions than were ever made",
            ))?;

        Ok(())
    }
}

// Position <-> node plumbing.

impl<Hash: AccumulatorHash> Pollard<Hash> {
    /// Fetches the node at a position, along with its sibling. Returns
    /// Ok(None) for a position that's inside the forest but whose branch was
    /// pruned. For a root, the node is its own sibling.
    fn get_node(
        &self,
        pos: u64,
    ) -> Result<Option<(Rc<PolNode<Hash>>, Rc<PolNode<Hash>>)>, AccumulatorError<Hash>> {
        let (tree, branch_len, bits) = detect_offset(pos, self.num_leaves)
            .ok_or(AccumulatorError::PositionNotFound(pos))?;
        let root = self
            .roots
            .get(tree as usize)
            .ok_or(AccumulatorError::Corruption(
                "fewer roots than the forest shape requires",
            ))?;

        let mut node = root.clone();
        let mut sibling = root.clone();

        // Walk down one row per bit. A node's children are stored in its
        // sibling's niece slots, which is why the descent reads the slots of
        // `sibling` and the bits are inverted.
        for row in (0..branch_len).rev() {
            let (next, next_sibling) = if (bits >> row) & 1 == 1 {
                (sibling.left_niece(), sibling.right_niece())
            } else {
                (sibling.right_niece(), sibling.left_niece())
            };

            match (next, next_sibling) {
                (Some(next), Some(next_sibling)) => {
                    node = next;
                    sibling = next_sibling;
                }
                _ => return Ok(None),
            }
        }

        Ok(Some((node, sibling)))
    }

    /// Returns the position a node currently occupies by walking up to its
    /// root, remembering which side of each parent it hangs off, and
    /// replaying that path downward from the root's position.
    fn calculate_position(
        &self,
        node: &Rc<PolNode<Hash>>,
    ) -> Result<u64, AccumulatorError<Hash>> {
        // 0 bit for a left child, 1 for a right child, deepest step first.
        let mut left_right_indicator = 0_u64;
        let mut rows_to_top = 0;

        let mut current = node.clone();
        while let Some(parent) = current.parent() {
            let (left, _) = parent.children().ok_or(AccumulatorError::Corruption(
                "a node's parent has no children",
            ))?;

            left_right_indicator <<= 1;
            if !left.is_same(&current) {
                left_right_indicator |= 1;
            }

            rows_to_top += 1;
            current = parent;
        }

        let tree = self
            .roots
            .iter()
            .position(|root| root.is_same(&current))
            .ok_or(AccumulatorError::Corruption(
                "node is not attached to any root",
            ))?;
        let row = root_row(self.num_leaves, tree as u8).ok_or(AccumulatorError::Corruption(
            "more roots than set bits in the leaf count",
        ))?;

        let total_rows = tree_rows(self.num_leaves);
        let mut pos = root_position(self.num_leaves, row, total_rows);
        for _ in 0..rows_to_top {
            // The last bit pushed is the step right below the root, so the
            // indicator is consumed from the low end going down.
            if left_right_indicator & 1 == 0 {
                pos = left_child(pos, total_rows);
            } else {
                pos = right_child(pos, total_rows);
            }
            left_right_indicator >>= 1;
        }

        Ok(pos)
    }
}

// Addition.

impl<Hash: AccumulatorHash> Pollard<Hash> {
    fn add(&mut self, adds: &[Leaf<Hash>]) {
        for add in adds {
            self.add_single(*add);
        }
    }

    fn add_single(&mut self, add: Leaf<Hash>) {
        let remember = self.full || add.remember;
        let mut node = PolNode::new(add.hash, remember);
        if remember {
            self.node_map.insert(add.hash.mini(), Rc::downgrade(&node));
        }

        // Two trees of the same height always merge, and heights follow the
        // bits of the leaf count: keep merging while there's a root on the
        // row. An empty root just gets written over, the new tree moves up a
        // row without hashing.
        let mut row = 0;
        while (self.num_leaves >> row) & 1 == 1 {
            let root = self
                .roots
                .pop()
                .expect("every set bit of num_leaves has a root");

            if root.hash().is_empty() {
                self.wrote_over_rows.push(row);
                row += 1;
                continue;
            }

            node = self.join_subtrees(root, node);
            if !self.full {
                node.maybe_prune();
            }
            row += 1;
        }

        self.roots.push(node);
        self.num_leaves += 1;
    }

    /// Merges two roots into one: the new parent stores both as its own
    /// children, and the two swap custody of each other's children as they
    /// stop being roots themselves.
    fn join_subtrees(
        &self,
        left: Rc<PolNode<Hash>>,
        right: Rc<PolNode<Hash>>,
    ) -> Rc<PolNode<Hash>> {
        let parent = PolNode::new(
            Hash::parent_hash(&left.hash(), &right.hash()),
            self.full,
        );
        PolNode::swap_nieces(&left, &right);
        PolNode::set_nieces(&parent, Some(left), Some(right));
        parent
    }
}

// Deletion.

impl<Hash: AccumulatorHash> Pollard<Hash> {
    /// Checks every target against the forest before anything is touched.
    fn verify_dels(
        &self,
        del_hashes: &[Hash],
        del_targets: &[u64],
    ) -> Result<(), AccumulatorError<Hash>> {
        for (target, hash) in del_targets.iter().zip(del_hashes.iter()) {
            let (node, _) = self
                .get_node(*target)?
                .ok_or(AccumulatorError::PositionNotFound(*target))?;

            if node.hash() != *hash {
                return Err(AccumulatorError::HashMismatch {
                    position: *target,
                    expected: *hash,
                    got: node.hash(),
                });
            }
        }

        Ok(())
    }

    /// Deletes the sorted targets. Two targeted siblings collapse into a
    /// deletion of their whole parent subtree, so after detwinning each
    /// remaining target either empties a root or promotes its sibling.
    fn remove(&mut self, dels: Vec<u64>) -> Result<(), AccumulatorError<Hash>> {
        let total_rows = tree_rows(self.num_leaves);
        let dels = detwin(dels, total_rows);

        for del in dels {
            if is_root_position(del, self.num_leaves, total_rows) {
                self.delete_root(del)?;
            } else {
                self.delete_single(del)?;
            }
        }

        Ok(())
    }

    /// The whole tree is going away; its slot stays behind holding the empty
    /// hash so the forest keeps its shape.
    fn delete_root(&mut self, del: u64) -> Result<(), AccumulatorError<Hash>> {
        let (tree, _, _) =
            detect_offset(del, self.num_leaves).ok_or(AccumulatorError::PositionNotFound(del))?;
        let root = self
            .roots
            .get_mut(tree as usize)
            .ok_or(AccumulatorError::Corruption(
                "fewer roots than the forest shape requires",
            ))?;

        *root = PolNode::new(Hash::empty(), self.full);
        Ok(())
    }

    /// Deletes one position by promoting its sibling into the parent's place.
    /// The deleted node's subtree goes away with it; the promoted sibling
    /// keeps its own subtree, which moves up a row as a block.
    fn delete_single(&mut self, del: u64) -> Result<(), AccumulatorError<Hash>> {
        let (del_node, from_node) = self
            .get_node(del)?
            .ok_or(AccumulatorError::PositionNotFound(del))?;

        let total_rows = tree_rows(self.num_leaves);
        let parent_pos = parent(del, total_rows);

        // If the parent is a root, the sibling simply becomes the new root,
        // taking back custody of its own children.
        if is_root_position(parent_pos, self.num_leaves, total_rows) {
            let (tree, _, _) = detect_offset(parent_pos, self.num_leaves)
                .ok_or(AccumulatorError::PositionNotFound(parent_pos))?;

            from_node.set_aunt(None);
            let (left, right) = del_node.take_nieces();
            PolNode::set_nieces(&from_node, left, right);

            *self
                .roots
                .get_mut(tree as usize)
                .ok_or(AccumulatorError::Corruption(
                    "fewer roots than the forest shape requires",
                ))? = from_node;
            return Ok(());
        }

        let aunt = del_node
            .aunt()
            .ok_or(AccumulatorError::Corruption("non-root node has no aunt"))?;
        let parent_node = del_node.parent().ok_or(AccumulatorError::Corruption(
            "non-root node has no parent",
        ))?;
        let grand_aunt = parent_node.aunt().ok_or(AccumulatorError::Corruption(
            "non-root parent has no aunt",
        ))?;

        // The promoted node steps into the parent's slot and takes over the
        // parent's nieces (its new sibling's children); the aunt inherits the
        // promoted node's children from the deleted node's slots. Whatever
        // hung below the deleted node is dropped along with the old parent.
        if !PolNode::replace_niece(&grand_aunt, &parent_node, from_node.clone()) {
            return Err(AccumulatorError::Corruption(
                "parent is not a niece of its own aunt",
            ));
        }

        let (left, right) = parent_node.take_nieces();
        PolNode::set_nieces(&from_node, left, right);

        let (left, right) = del_node.take_nieces();
        PolNode::set_nieces(&aunt, left, right);

        if !self.full {
            from_node.maybe_prune();
            aunt.maybe_prune();
        }

        from_node.recompute_hashes();
        Ok(())
    }
}

// Undo.

impl<Hash: AccumulatorHash> Pollard<Hash> {
    /// Unwinds the most recent addition: the rightmost root is the tree that
    /// addition finished in, so splitting it back apart top-down re-exposes
    /// the roots it merged, until the added leaf itself pops out and is
    /// dropped.
    fn undo_single_add(&mut self) -> Result<(), AccumulatorError<Hash>> {
        let mut node = self
            .roots
            .pop()
            .ok_or(AccumulatorError::Corruption("no root left to un-add"))?;

        loop {
            let (left, right) = match (node.left_niece(), node.right_niece()) {
                (Some(left), Some(right)) => (left, right),
                _ => break,
            };

            // Un-merge: both children become roots again and take back their
            // own children; only the right one keeps unwinding, it's the
            // merge chain the addition rode up on.
            PolNode::swap_nieces(&left, &right);
            left.set_aunt(None);
            right.set_aunt(None);

            self.roots.push(left);
            node = right;
        }

        self.node_map.remove(&node.hash().mini());
        self.num_leaves -= 1;
        Ok(())
    }

    /// Additions write over empty roots, and un-adding can't bring those
    /// back: the merge chain has no node where an empty root was skipped.
    /// They're re-seated here from the write-over journal, tallest first so
    /// each lands at its final slot.
    fn undo_empty_roots(&mut self) -> Result<(), AccumulatorError<Hash>> {
        while let Some(row) = self.wrote_over_rows.pop() {
            // This root's slot comes after every taller tree's.
            let tree = (self.num_leaves >> (row + 1)).count_ones() as usize;
            if tree > self.roots.len() {
                return Err(AccumulatorError::Corruption(
                    "write-over journal doesn't match the forest shape",
                ));
            }
            self.roots
                .insert(tree, PolNode::new(Hash::empty(), self.full));
        }

        if self.roots.len() != num_roots(self.num_leaves) {
            return Err(AccumulatorError::Corruption(
                "roots are missing after an undo",
            ));
        }

        Ok(())
    }

    /// Puts the deleted leaves back. The detwinned subtrees are rebuilt from
    /// the caller's (target, hash) pairs, then spliced back in reverse order
    /// of their deletion, top row first, re-hashing each affected branch.
    fn undo_dels(
        &mut self,
        targets: &[u64],
        hashes: &[Hash],
    ) -> Result<(), AccumulatorError<Hash>> {
        let total_rows = tree_rows(self.num_leaves);

        let mut leaves = Vec::with_capacity(targets.len());
        let mut pairs: Vec<(u64, Rc<PolNode<Hash>>)> = targets
            .iter()
            .zip(hashes.iter())
            .map(|(pos, hash)| {
                let node = PolNode::new(*hash, self.full);
                leaves.push(node.clone());
                (*pos, node)
            })
            .collect();
        pairs.sort_by_key(|(pos, _)| *pos);

        // Mirror of detwinning: siblings that died together come back as one
        // rebuilt subtree at their parent's position.
        let mut n = 0;
        while n + 1 < pairs.len() {
            let (pos, next) = (pairs[n].0, pairs[n + 1].0);
            if pos | 1 == next {
                let (_, left) = pairs.remove(n);
                let (_, right) = pairs.remove(n);
                let parent_pos = parent(pos, total_rows);
                let joined = self.join_subtrees(left, right);

                let idx = pairs
                    .binary_search_by_key(&parent_pos, |(pos, _)| *pos)
                    .unwrap_or_else(|idx| idx);
                pairs.insert(idx, (parent_pos, joined));
            } else {
                n += 1;
            }
        }

        for (pos, node) in pairs.into_iter().rev() {
            if is_root_position(pos, self.num_leaves, total_rows) {
                let (tree, _, _) = detect_offset(pos, self.num_leaves)
                    .ok_or(AccumulatorError::PositionNotFound(pos))?;
                *self
                    .roots
                    .get_mut(tree as usize)
                    .ok_or(AccumulatorError::Corruption(
                        "fewer roots than the forest shape requires",
                    ))? = node;
            } else {
                self.undo_single_del(pos, node)?;
            }
        }

        for leaf in leaves {
            if leaf.remember {
                self.node_map
                    .insert(leaf.hash().mini(), Rc::downgrade(&leaf));
            }
        }

        Ok(())
    }

    /// Reverses one sibling promotion: the node currently sitting at the
    /// deleted position's parent steps back down beside the restored node,
    /// under a freshly rebuilt parent.
    fn undo_single_del(
        &mut self,
        pos: u64,
        node: Rc<PolNode<Hash>>,
    ) -> Result<(), AccumulatorError<Hash>> {
        let total_rows = tree_rows(self.num_leaves);
        let parent_pos = parent(pos, total_rows);

        // The deletion made the sibling a root; un-making it is just the
        // regular merge again.
        if is_root_position(parent_pos, self.num_leaves, total_rows) {
            let (tree, _, _) = detect_offset(parent_pos, self.num_leaves)
                .ok_or(AccumulatorError::PositionNotFound(parent_pos))?;
            let sibling = self
                .roots
                .get(tree as usize)
                .cloned()
                .ok_or(AccumulatorError::Corruption(
                    "fewer roots than the forest shape requires",
                ))?;

            let (left, right) = if is_left_niece(pos) {
                (node, sibling)
            } else {
                (sibling, node)
            };
            self.roots[tree as usize] = self.join_subtrees(left, right);
            return Ok(());
        }

        let (sibling, _) = self
            .get_node(parent_pos)?
            .ok_or(AccumulatorError::PositionNotFound(parent_pos))?;
        let grand_aunt = sibling.aunt().ok_or(AccumulatorError::Corruption(
            "non-root node has no aunt",
        ))?;
        let aunt = sibling.sibling().ok_or(AccumulatorError::Corruption(
            "non-root node has no sibling",
        ))?;

        let (left, right) = if is_left_niece(pos) {
            (node.clone(), sibling.clone())
        } else {
            (sibling.clone(), node.clone())
        };
        let new_parent = PolNode::new(
            Hash::parent_hash(&left.hash(), &right.hash()),
            self.full,
        );

        // Take everything that has to move before any slot is overwritten:
        // the demoted node's nieces go to the new parent, its children's
        // slots go back under the restored node, and the restored node's own
        // children slide into the demoted node's slots.
        let (aunts_left, aunts_right) = sibling.take_nieces();
        let (siblings_left, siblings_right) = aunt.take_nieces();
        let (nodes_left, nodes_right) = node.take_nieces();

        if !PolNode::replace_niece(&grand_aunt, &sibling, new_parent.clone()) {
            return Err(AccumulatorError::Corruption(
                "node is not a niece of its own aunt",
            ));
        }
        PolNode::set_nieces(&new_parent, aunts_left, aunts_right);
        PolNode::set_nieces(&node, siblings_left, siblings_right);
        PolNode::set_nieces(&sibling, nodes_left, nodes_right);
        PolNode::set_nieces(&aunt, Some(left), Some(right));

        new_parent.recompute_hashes();
        Ok(())
    }
}

// Pretty printing, mostly for test failure output.

impl<Hash: AccumulatorHash> Pollard<Hash> {
    /// Renders the forest as an indented outline: each root on its own line,
    /// descendants below it, one indent level per row descended. Forests too
    /// tall to be readable that way fall back to listing the roots.
    fn string(&self) -> String {
        if self.num_leaves == 0 {
            return "empty".to_owned();
        }

        let total_rows = tree_rows(self.num_leaves);
        let mut out = String::new();

        for tree in 0..self.roots.len() {
            let row = match root_row(self.num_leaves, tree as u8) {
                Some(row) => row,
                None => break,
            };
            let pos = root_position(self.num_leaves, row, total_rows);

            if total_rows > 6 {
                out.push_str(&format!("{pos}: {}\n", self.roots[tree].hash()));
            } else {
                self.write_subtree(&mut out, pos, row, 0, total_rows);
            }
        }

        out
    }

    fn write_subtree(&self, out: &mut String, pos: u64, row: u8, depth: usize, total_rows: u8) {
        let populated = max_position_at_row(row, total_rows, self.num_leaves)
            .map_or(false, |max| pos <= max);
        if !populated {
            return;
        }
        let hash = match self.get_node(pos) {
            Ok(Some((node, _))) => node.hash().to_string(),
            _ => return,
        };

        for _ in 0..depth {
            out.push_str("  ");
        }
        let short = &hash[..hash.len().min(8)];
        out.push_str(&format!("{pos}: {short}\n"));

        if row > 0 {
            self.write_subtree(out, left_child(pos, total_rows), row - 1, depth + 1, total_rows);
            self.write_subtree(out, right_child(pos, total_rows), row - 1, depth + 1, total_rows);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use rand::rngs::StdRng;
    use rand::Rng;
    use rand::SeedableRng;

    use super::*;
    use crate::accumulator::node_hash::BitcoinNodeHash;
    use crate::accumulator::stump::Stump;
    use crate::accumulator::util::hash_from_u8;
    use crate::accumulator::util::max_position_at_row;
    use crate::accumulator::util::start_position_at_row;

    fn parent_of(left: &BitcoinNodeHash, right: &BitcoinNodeHash) -> BitcoinNodeHash {
        BitcoinNodeHash::parent_hash(left, right)
    }

    /// A hash that's just its first byte, like the handmade vectors use.
    fn raw_hash(value: u8) -> BitcoinNodeHash {
        let mut bytes = [0u8; 32];
        bytes[0] = value;
        BitcoinNodeHash::new(bytes)
    }

    fn leaves_from_hashes(hashes: &[BitcoinNodeHash]) -> Vec<Leaf<BitcoinNodeHash>> {
        hashes
            .iter()
            .map(|hash| Leaf {
                hash: *hash,
                remember: true,
            })
            .collect()
    }

    /// Walks the whole forest recomputing every parent from its children and
    /// comparing with what the nodes actually hold.
    fn check_hashes(p: &Pollard<BitcoinNodeHash>) {
        fn check_pair(
            node: &Rc<PolNode<BitcoinNodeHash>>,
            sibling: &Rc<PolNode<BitcoinNodeHash>>,
        ) {
            // node's nieces are sibling's children; if they're present the
            // tree below is perfect, so sibling's hash is computable.
            if let (Some(left), Some(right)) = (node.left_niece(), node.right_niece()) {
                let calculated = BitcoinNodeHash::parent_hash(&left.hash(), &right.hash());
                assert_eq!(
                    sibling.hash(),
                    calculated,
                    "stored hash doesn't match its children"
                );
                check_pair(&left, &right);
            }
            if let (Some(left), Some(right)) = (sibling.left_niece(), sibling.right_niece()) {
                let calculated = BitcoinNodeHash::parent_hash(&left.hash(), &right.hash());
                assert_eq!(
                    node.hash(),
                    calculated,
                    "stored hash doesn't match its children"
                );
                check_pair(&left, &right);
            }
        }

        for root in p.roots.iter() {
            if let (Some(left), Some(right)) = (root.left_niece(), root.right_niece()) {
                let calculated = BitcoinNodeHash::parent_hash(&left.hash(), &right.hash());
                assert_eq!(root.hash(), calculated, "root hash doesn't match its children");
                check_pair(&left, &right);
            }
        }
    }

    /// Every map entry must round-trip: node -> position -> same node.
    fn pos_map_sanity(p: &Pollard<BitcoinNodeHash>) {
        for (mini, node) in p.node_map.iter() {
            let node = node
                .upgrade()
                .unwrap_or_else(|| panic!("map entry {mini:?} points at a dropped node"));

            let pos = p.calculate_position(&node).expect("mapped node has a position");
            let (fetched, _) = p
                .get_node(pos)
                .expect("mapped position resolves")
                .expect("mapped position is not pruned");

            assert_eq!(
                fetched.hash(),
                node.hash(),
                "calculated position {pos} reads back a different node"
            );
        }
    }

    /// Sweeps every legal position and checks the opposite round-trip:
    /// position -> node -> same position.
    fn position_sanity(p: &Pollard<BitcoinNodeHash>) {
        let total_rows = tree_rows(p.num_leaves);
        for row in 0..total_rows {
            let mut pos = start_position_at_row(row, total_rows);
            let max = max_position_at_row(row, total_rows, p.num_leaves).unwrap();
            while pos <= max {
                if let Some((node, _)) = p.get_node(pos).unwrap() {
                    let got = p.calculate_position(&node).unwrap();
                    assert_eq!(got, pos, "node at {pos} thinks it's at {got}");
                }
                pos += 1;
            }
        }
    }

    fn map_size_sanity(p: &Pollard<BitcoinNodeHash>) {
        assert_eq!(
            p.node_map.len() as u64,
            p.num_leaves - p.num_dels,
            "leaf map out of sync with the live leaf count"
        );
    }

    #[test]
    fn test_add_fifteen() {
        let hashes: Vec<_> = (0..15).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();

        let expected = [
            "b151a956139bb821d4effa34ea95c17560e0135d1e4661fc23cedc3af49dac42",
            "9c053db406c1a077112189469a3aca0573d3481bef09fa3d2eda3304d7d44be8",
            "55d0a0ef8f5c25a9da266b36c0c5f4b31008ece82df2512c8966bddcc27a66a0",
            "4d7b3ef7300acf70c892d8327db8272f54434adbc61a4e130a563cb59a0d0f47",
        ]
        .iter()
        .map(|hash| BitcoinNodeHash::from_str(hash).unwrap())
        .collect::<Vec<_>>();

        assert_eq!(p.roots(), expected);
        assert_eq!(p.leaves(), 15);
        assert_eq!(p.roots.len(), num_roots(15));
        map_size_sanity(&p);
        check_hashes(&p);
        position_sanity(&p);
    }

    #[test]
    fn test_forest_shape_follows_leaf_count() {
        // Eight leaves plus two more: 10 = 0b1010, so one tree of height 3
        // and one of height 1.
        let hashes: Vec<_> = (0..8).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();
        assert_eq!(p.roots.len(), 1);

        let more: Vec<_> = (8..10).map(hash_from_u8).collect();
        p.modify(&leaves_from_hashes(&more), &[], &[]).unwrap();

        assert_eq!(p.leaves(), 10);
        assert_eq!(p.roots.len(), 2);
        assert_eq!(p.roots()[1], parent_of(&more[0], &more[1]));
        check_hashes(&p);
        position_sanity(&p);
    }

    #[test]
    fn test_single_add() {
        let mut p = Pollard::new(true);
        let hash = hash_from_u8(0);
        p.modify(&leaves_from_hashes(&[hash]), &[], &[]).unwrap();

        assert_eq!(p.roots(), vec![hash]);
        assert_eq!(p.leaves(), 1);
    }

    #[test]
    fn test_modify_noop() {
        let mut p = Pollard::<BitcoinNodeHash>::new(true);
        p.modify(&[], &[], &[]).unwrap();
        assert_eq!(p.leaves(), 0);
        assert!(p.roots().is_empty());

        let hashes: Vec<_> = (0..6).map(hash_from_u8).collect();
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();
        let roots = p.roots();
        p.modify(&[], &[], &[]).unwrap();
        assert_eq!(p.roots(), roots);
    }

    #[test]
    fn test_delete_to_sentinel() {
        let mut p = Pollard::new(true);
        let hash = hash_from_u8(0);
        p.modify(&leaves_from_hashes(&[hash]), &[], &[]).unwrap();

        let proof = p.prove(&[hash]).unwrap();
        p.modify(&[], &[hash], &proof.targets).unwrap();

        assert_eq!(p.roots(), vec![BitcoinNodeHash::empty()]);
        assert_eq!(p.dels(), 1);
        assert_eq!(p.leaves(), 1);
        map_size_sanity(&p);
    }

    #[test]
    fn test_delete_roots_child() {
        // 02
        // |---\
        // 00  01
        // Deleting 01 promotes 00 to the root.
        let hashes: Vec<_> = (0..2).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();

        p.modify(&[], &[hashes[1]], &[1]).unwrap();
        assert_eq!(p.roots(), vec![hashes[0]]);
        map_size_sanity(&p);
    }

    #[test]
    fn test_add_over_sentinel() {
        let hashes: Vec<_> = (0..2).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();
        p.modify(&[], &hashes, &[0, 1]).unwrap();
        assert_eq!(p.roots(), vec![BitcoinNodeHash::empty()]);

        let fresh: Vec<_> = (2..4).map(hash_from_u8).collect();
        p.modify(&leaves_from_hashes(&fresh), &[], &[]).unwrap();

        // The pair moved up over the dead tree's slot without hashing with it.
        assert_eq!(p.roots(), vec![parent_of(&fresh[0], &fresh[1])]);
        assert_eq!(p.leaves(), 4);
        check_hashes(&p);
        pos_map_sanity(&p);
    }

    #[test]
    fn test_prove_and_verify() {
        let hashes: Vec<_> = (0..8).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();

        let del_hashes = [hashes[2], hashes[1], hashes[4], hashes[6]];
        let proof = p.prove(&del_hashes).unwrap();

        let expected = Proof::new(
            vec![2, 1, 4, 6],
            vec![hashes[0], hashes[3], hashes[5], hashes[7]],
        );
        assert_eq!(proof, expected);

        p.verify(&del_hashes, &proof).unwrap();
    }

    #[test]
    fn test_prove_unknown_hash() {
        let hashes: Vec<_> = (0..8).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();

        let stranger = hash_from_u8(100);
        assert_eq!(
            p.prove(&[stranger]),
            Err(AccumulatorError::NodeNotFound(stranger))
        );
    }

    #[test]
    fn test_verify_rejects_bit_flip() {
        let hashes: Vec<_> = (0..8).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();

        let del_hashes = [hashes[3], hashes[5]];
        let mut proof = p.prove(&del_hashes).unwrap();
        p.verify(&del_hashes, &proof).unwrap();

        let mut bytes = *proof.hashes[0];
        bytes[31] ^= 1;
        proof.hashes[0] = BitcoinNodeHash::new(bytes);
        assert!(p.verify(&del_hashes, &proof).is_err());
    }

    #[test]
    fn test_duplicate_targets_rejected() {
        let hashes: Vec<_> = (0..8).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();
        let roots = p.roots();

        let result = p.modify(&[], &[hashes[0], hashes[0]], &[0, 0]);
        assert_eq!(result, Err(AccumulatorError::DuplicateTarget(0)));
        assert_eq!(p.roots(), roots);
        map_size_sanity(&p);
    }

    #[test]
    fn test_hash_mismatch_rejected() {
        let hashes: Vec<_> = (0..8).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();
        let roots = p.roots();

        // Right position, wrong hash: nothing may change.
        let result = p.modify(&[], &[hashes[5]], &[0]);
        assert!(matches!(
            result,
            Err(AccumulatorError::HashMismatch { position: 0, .. })
        ));
        assert_eq!(p.roots(), roots);
        map_size_sanity(&p);
    }

    #[test]
    fn test_partial_mode_remembers_selectively() {
        let hashes: Vec<_> = (0..8).map(hash_from_u8).collect();
        let leaves: Vec<_> = hashes
            .iter()
            .enumerate()
            .map(|(i, hash)| Leaf {
                hash: *hash,
                remember: i == 3,
            })
            .collect();

        let mut p = Pollard::new(false);
        p.modify(&leaves, &[], &[]).unwrap();

        assert_eq!(p.node_map.len(), 1);
        assert!(p.node_map.len() as u64 <= p.num_leaves - p.num_dels);

        let proof = p.prove(&[hashes[3]]).unwrap();
        p.verify(&[hashes[3]], &proof).unwrap();

        assert_eq!(
            p.prove(&[hashes[0]]),
            Err(AccumulatorError::NodeNotFound(hashes[0]))
        );
    }

    #[test]
    fn test_undo() {
        struct Case {
            start_leaves: u8,
            dels: Vec<u8>,
            adds: Vec<u8>,
        }
        let cases = [
            Case {
                start_leaves: 6,
                dels: vec![6, 4, 2, 1, 3],
                adds: vec![7, 8],
            },
            Case {
                start_leaves: 8,
                dels: vec![5, 6],
                adds: vec![],
            },
            Case {
                start_leaves: 8,
                dels: vec![4, 5],
                adds: vec![],
            },
            Case {
                start_leaves: 8,
                dels: vec![],
                adds: vec![9, 10],
            },
            Case {
                start_leaves: 8,
                dels: vec![4, 5],
                adds: vec![9, 10],
            },
            Case {
                start_leaves: 8,
                dels: vec![2, 3, 7],
                adds: vec![9, 10],
            },
            Case {
                start_leaves: 7,
                dels: vec![5, 6],
                adds: vec![8, 9],
            },
            Case {
                start_leaves: 12,
                dels: vec![],
                adds: vec![14, 15, 16, 17],
            },
            // A whole tree dies and an addition writes over its slot.
            Case {
                start_leaves: 2,
                dels: vec![1, 2],
                adds: vec![3],
            },
            // Everything dies, then new leaves move in over the sentinels.
            Case {
                start_leaves: 3,
                dels: vec![1, 2, 3],
                adds: vec![4, 5],
            },
        ];

        for case in cases {
            let mut p = Pollard::new(true);

            // Leaves are numbered from one so none of them is the all-zero
            // hash.
            let start: Vec<_> = (1..=case.start_leaves).map(raw_hash).collect();
            p.modify(&leaves_from_hashes(&start), &[], &[]).unwrap();

            let del_hashes: Vec<_> = case.dels.iter().map(|i| raw_hash(*i)).collect();
            let adds: Vec<_> =
                leaves_from_hashes(&case.adds.iter().map(|i| raw_hash(*i)).collect::<Vec<_>>());

            let before_roots = p.roots();
            let before_map: HashMap<_, _> = p
                .node_map
                .iter()
                .map(|(mini, node)| (*mini, node.upgrade().unwrap().hash()))
                .collect();

            let proof = p.prove(&del_hashes).unwrap();
            p.verify(&del_hashes, &proof).unwrap();

            p.modify(&adds, &del_hashes, &proof.targets).unwrap();
            check_hashes(&p);
            map_size_sanity(&p);
            pos_map_sanity(&p);

            p.undo(adds.len() as u64, &proof.targets, &del_hashes)
                .unwrap();
            check_hashes(&p);
            map_size_sanity(&p);
            pos_map_sanity(&p);
            position_sanity(&p);

            assert_eq!(p.roots(), before_roots, "undo didn't restore the roots");

            assert_eq!(p.node_map.len(), before_map.len());
            for (mini, hash) in before_map {
                let node = p
                    .node_map
                    .get(&mini)
                    .and_then(Weak::upgrade)
                    .unwrap_or_else(|| panic!("hash {mini:?} missing after undo"));
                assert_eq!(node.hash(), hash);
            }
        }
    }

    /// Spits out "blocks" of additions and deletions: every leaf gets a
    /// random time to live, and the chain deletes it when its time is up.
    /// `back_one` rewinds the most recent block.
    struct SimChain {
        ttl_slices: Vec<Vec<BitcoinNodeHash>>,
        block_height: i32,
        leaf_counter: u64,
        duration_mask: u32,
        lookahead: i32,
        rng: StdRng,
    }

    impl SimChain {
        fn new(duration_mask: u32, seed: u64) -> SimChain {
            SimChain {
                ttl_slices: vec![Vec::new(); duration_mask as usize + 1],
                block_height: -1,
                leaf_counter: 0,
                duration_mask,
                lookahead: 0,
                rng: StdRng::seed_from_u64(seed),
            }
        }

        fn next_block(
            &mut self,
            mut num_adds: u32,
        ) -> (Vec<Leaf<BitcoinNodeHash>>, Vec<u32>, Vec<BitcoinNodeHash>) {
            self.block_height += 1;
            if self.block_height == 0 && num_adds == 0 {
                num_adds = 1;
            }

            let del_hashes = self.ttl_slices.remove(0);
            self.ttl_slices.push(Vec::new());

            let mut adds = Vec::with_capacity(num_adds as usize);
            let mut durations = Vec::with_capacity(num_adds as usize);
            for _ in 0..num_adds {
                let mut bytes = [0u8; 32];
                bytes[0] = self.leaf_counter as u8;
                bytes[1] = (self.leaf_counter >> 8) as u8;
                bytes[2] = (self.leaf_counter >> 16) as u8;
                bytes[3] = 0xff;
                bytes[4] = (self.leaf_counter >> 24) as u8;
                bytes[5] = (self.leaf_counter >> 32) as u8;
                let hash = BitcoinNodeHash::new(bytes);

                let mut duration = self.rng.gen::<u32>() & self.duration_mask;

                // The first block's leaves live forever, so the forest never
                // empties out completely.
                if self.block_height == 0 {
                    duration = 0;
                }

                let remember = duration != 0 && (duration as i32) < self.lookahead;
                adds.push(Leaf { hash, remember });

                if duration != 0 {
                    self.ttl_slices[duration as usize - 1].push(hash);
                }
                durations.push(duration);
                self.leaf_counter += 1;
            }

            (adds, durations, del_hashes)
        }

        fn back_one(
            &mut self,
            leaves: &[Leaf<BitcoinNodeHash>],
            durations: &[u32],
            dels: &[BitcoinNodeHash],
        ) {
            // Push the deleted hashes back in on the left, trim the rightmost.
            self.ttl_slices.pop();
            self.ttl_slices.insert(0, dels.to_vec());

            for (i, _) in leaves.iter().enumerate() {
                if durations[i] == 0 {
                    continue;
                }
                self.ttl_slices[durations[i] as usize].pop();
            }

            self.block_height -= 1;
        }
    }

    #[test]
    fn test_rand_undo() {
        let mut p = Pollard::new(true);
        let mut sc = SimChain::new(0x07, 0);
        let num_adds = 5;

        for b in 0..=1000 {
            let (adds, durations, del_hashes) = sc.next_block(num_adds);

            let proof = p.prove(&del_hashes).unwrap();
            p.verify(&del_hashes, &proof).unwrap();

            let before_roots = p.roots();
            let before_map: HashMap<_, _> = p
                .node_map
                .iter()
                .map(|(mini, node)| (*mini, node.upgrade().unwrap().hash()))
                .collect();
            let before_leaves = p.num_leaves;

            p.modify(&adds, &del_hashes, &proof.targets).unwrap();
            assert_eq!(p.num_leaves - adds.len() as u64, before_leaves);

            if b % 3 == 0 {
                p.undo(adds.len() as u64, &proof.targets, &del_hashes)
                    .unwrap();
                sc.back_one(&adds, &durations, &del_hashes);

                assert_eq!(
                    p.roots(),
                    before_roots,
                    "undo didn't restore the roots at block {b}"
                );
                assert_eq!(p.node_map.len(), before_map.len());
                for (mini, hash) in before_map {
                    let node = p
                        .node_map
                        .get(&mini)
                        .and_then(Weak::upgrade)
                        .unwrap_or_else(|| panic!("hash {mini:?} missing after undo"));
                    assert_eq!(node.hash(), hash);
                }
            }

            if b % 500 == 0 {
                check_hashes(&p);
            }
            map_size_sanity(&p);
            pos_map_sanity(&p);
        }
    }

    #[test]
    fn test_modify_chain() {
        let mut sc = SimChain::new(0x07, 0x07);
        let mut p = Pollard::new(true);

        for b in 0..=100 {
            let (adds, _, del_hashes) = sc.next_block(3);

            let proof = p.prove(&del_hashes).unwrap();
            p.verify(&del_hashes, &proof).unwrap();

            for target in proof.targets.iter() {
                let node = p.get_node(*target).unwrap();
                assert!(node.is_some(), "couldn't read target {target} at block {b}");
            }

            p.modify(&adds, &del_hashes, &proof.targets).unwrap();

            if b % 10 == 0 {
                check_hashes(&p);
            }
            map_size_sanity(&p);
            pos_map_sanity(&p);
            position_sanity(&p);
        }
    }

    /// Generates leaves to add and then picks some of those to delete.
    /// The leaves are just the next counter values encoded into hashes, so
    /// they never collide across calls when `current_leaves` is kept up to
    /// date.
    fn get_adds_and_dels(
        rng: &mut StdRng,
        current_leaves: u32,
        add_count: u32,
        del_count: u32,
    ) -> (
        Vec<Leaf<BitcoinNodeHash>>,
        Vec<BitcoinNodeHash>,
        Vec<u64>,
    ) {
        if add_count == 0 {
            return (Vec::new(), Vec::new(), Vec::new());
        }

        let leaves: Vec<Leaf<BitcoinNodeHash>> = (0..add_count)
            .map(|i| {
                let mut bytes = [0u8; 32];
                bytes[..4].copy_from_slice(&(i + current_leaves).to_le_bytes());
                // An all-zero leaf can't go into the accumulator.
                bytes[31] = 0xff;
                Leaf {
                    hash: BitcoinNodeHash::new(bytes),
                    remember: true,
                }
            })
            .collect();

        let mut picked = Vec::new();
        while (picked.len() as u32) < del_count {
            let idx = rng.gen_range(0..add_count) as u64;
            if !picked.contains(&idx) {
                picked.push(idx);
            }
        }

        let del_hashes = picked
            .iter()
            .map(|idx| leaves[*idx as usize].hash)
            .collect();
        (leaves, del_hashes, picked)
    }

    #[test]
    fn test_modify_random() {
        for seed in 0..32u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let start_leaves = rng.gen_range(1..=32u32);
            let modify_adds = rng.gen_range(0..8u32);
            let del_count = rng.gen_range(0..=start_leaves);

            let mut p = Pollard::new(true);
            let (leaves, del_hashes, del_targets) =
                get_adds_and_dels(&mut rng, 0, start_leaves, del_count);
            p.modify(&leaves, &[], &[]).unwrap();

            let (modify_leaves, _, _) =
                get_adds_and_dels(&mut rng, p.num_leaves as u32, modify_adds, 0);
            p.modify(&modify_leaves, &del_hashes, &del_targets)
                .unwrap();

            check_hashes(&p);
            map_size_sanity(&p);
            pos_map_sanity(&p);
            position_sanity(&p);
        }
    }

    #[test]
    fn test_stump_parity() {
        // A full pollard and a roots-only stump fed the same blocks must
        // agree at every step.
        let mut p = Pollard::new(true);
        let mut s = Stump::new();
        let mut sc = SimChain::new(0x07, 3);

        for _ in 0..=150 {
            let (adds, _, del_hashes) = sc.next_block(4);

            let proof = p.prove(&del_hashes).unwrap();
            s.verify(&del_hashes, &proof).unwrap();

            let add_hashes: Vec<_> = adds.iter().map(|leaf| leaf.hash).collect();
            s = s.modify(&add_hashes, &del_hashes, &proof).unwrap();
            p.modify(&adds, &del_hashes, &proof.targets).unwrap();

            assert_eq!(s.roots, p.roots());
            assert_eq!(s.leaves, p.leaves());
        }
    }

    #[test]
    fn test_display_smoke() {
        let hashes: Vec<_> = (0..6).map(hash_from_u8).collect();
        let mut p = Pollard::new(true);
        p.modify(&leaves_from_hashes(&hashes), &[], &[]).unwrap();

        // Six leaves: the taller tree's root at 12 leads, its leaves sit two
        // indent levels down, and the two-leaf tree's root at 10 follows.
        let rendered = p.to_string();
        assert!(rendered.starts_with("12: "));
        assert!(rendered.contains("\n    0: "));
        assert!(rendered.contains("\n10: "));
    }
}

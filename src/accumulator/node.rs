//! The forest node. Nodes are kept in memory holding their hash, a reference
//! to their **aunt** (not parent!) and their nieces (not children!). In a
//! merkle proof we only need the sibling of each node on the path up, and the
//! parent is always computed on the fly, so there's no point keeping a link to
//! it; the aunt, on the other hand, is exactly where a node's own children are
//! stored, so the niece layout lets a proof walk from a leaf to its root
//! touching only nodes it actually needs.
//!
//! Every node is owned by exactly one other node through the niece links, with
//! roots owned by the accumulator itself. Roots are the base case of the
//! layout: a root has no sibling, so it stores its own children in its niece
//! slots, and a child of a root has the root itself as its aunt. Upward links
//! are [Weak] so the links can't cycle, and they are rebuilt whenever slots
//! move, never traversed for ownership.
//!
//! The one invariant all the slot plumbing below maintains: **a node's aunt is
//! always the node whose niece slots store it**. Each setter that moves an
//! [Rc] into a slot re-points the moved node's aunt at the slot's owner.
use std::cell::Cell;
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;
use std::rc::Weak;

use super::node_hash::AccumulatorHash;

/// A node in the forest.
pub(super) struct PolNode<Hash: AccumulatorHash> {
    /// Whether this node must survive pruning.
    ///
    /// For leaves the caller decides; interior nodes are kept while anything
    /// below them is. An accumulator running in full mode marks everything.
    pub(super) remember: bool,
    /// The hash at this node's position. Lives in a [Cell] because deletions
    /// below a node change it in place.
    hash: Cell<Hash>,
    /// This node's aunt: the sibling of its parent, which is also the node
    /// storing this node in its niece slots. None for roots; the parent
    /// itself for children of a root.
    aunt: RefCell<Option<Weak<Self>>>,
    /// The left child of this node's sibling (own left child for roots).
    left_niece: RefCell<Option<Rc<Self>>>,
    /// The right child of this node's sibling (own right child for roots).
    right_niece: RefCell<Option<Rc<Self>>>,
}

impl<Hash: AccumulatorHash> Debug for PolNode<Hash> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hash().to_string())
    }
}

impl<Hash: AccumulatorHash> PolNode<Hash> {
    /// Creates a new unattached node.
    pub fn new(hash: Hash, remember: bool) -> Rc<Self> {
        Rc::new(PolNode {
            remember,
            hash: Cell::new(hash),
            aunt: RefCell::new(None),
            left_niece: RefCell::new(None),
            right_niece: RefCell::new(None),
        })
    }

    pub fn hash(&self) -> Hash {
        self.hash.get()
    }

    pub fn set_hash(&self, hash: Hash) {
        self.hash.set(hash);
    }

    pub fn aunt(&self) -> Option<Rc<Self>> {
        self.aunt.borrow().as_ref()?.upgrade()
    }

    pub fn set_aunt(&self, aunt: Option<Weak<Self>>) {
        *self.aunt.borrow_mut() = aunt;
    }

    pub fn left_niece(&self) -> Option<Rc<Self>> {
        self.left_niece.borrow().clone()
    }

    pub fn right_niece(&self) -> Option<Rc<Self>> {
        self.right_niece.borrow().clone()
    }

    /// Whether `other` is this very node.
    pub fn is_same(&self, other: &Rc<Self>) -> bool {
        std::ptr::eq(Rc::as_ptr(other), self)
    }

    /// Empties this node's niece slots without re-linking anyone, handing the
    /// contents to the caller.
    pub fn take_nieces(&self) -> (Option<Rc<Self>>, Option<Rc<Self>>) {
        (
            self.left_niece.borrow_mut().take(),
            self.right_niece.borrow_mut().take(),
        )
    }

    /// Fills `this`'s niece slots and points the moved nodes' aunts back at
    /// `this`.
    pub fn set_nieces(this: &Rc<Self>, left: Option<Rc<Self>>, right: Option<Rc<Self>>) {
        *this.left_niece.borrow_mut() = left;
        *this.right_niece.borrow_mut() = right;
        Self::adopt_nieces(this);
    }

    /// Swaps the niece slots of two nodes and fixes up the aunts on both
    /// sides. Merging two trees (or splitting a merged one back apart) is
    /// exactly this: siblings exchange custody of each other's children.
    pub fn swap_nieces(a: &Rc<Self>, b: &Rc<Self>) {
        std::mem::swap(
            &mut *a.left_niece.borrow_mut(),
            &mut *b.left_niece.borrow_mut(),
        );
        std::mem::swap(
            &mut *a.right_niece.borrow_mut(),
            &mut *b.right_niece.borrow_mut(),
        );
        Self::adopt_nieces(a);
        Self::adopt_nieces(b);
    }

    /// Replaces the slot currently holding `old` with `new`. Returns false if
    /// neither slot holds `old`.
    pub fn replace_niece(this: &Rc<Self>, old: &Self, new: Rc<Self>) -> bool {
        new.set_aunt(Some(Rc::downgrade(this)));
        {
            let mut left = this.left_niece.borrow_mut();
            if left.as_deref().map_or(false, |l| old.is_same_ref(l)) {
                *left = Some(new);
                return true;
            }
        }
        let mut right = this.right_niece.borrow_mut();
        if right.as_deref().map_or(false, |r| old.is_same_ref(r)) {
            *right = Some(new);
            return true;
        }
        false
    }

    fn is_same_ref(&self, other: &Self) -> bool {
        std::ptr::eq(other, self)
    }

    fn adopt_nieces(this: &Rc<Self>) {
        for niece in [this.left_niece(), this.right_niece()].into_iter().flatten() {
            niece.set_aunt(Some(Rc::downgrade(this)));
        }
    }

    /// Returns this node's sibling, None for roots (and for siblings pruned
    /// away).
    pub fn sibling(&self) -> Option<Rc<Self>> {
        let aunt = self.aunt()?;
        let left = aunt.left_niece();
        if left.as_deref().map_or(false, |l| std::ptr::eq(l, self)) {
            aunt.right_niece()
        } else {
            left
        }
    }

    /// Returns this node's parent. If the parent is a root, the aunt link
    /// already points at it; otherwise the parent is the aunt's sibling.
    pub fn parent(&self) -> Option<Rc<Self>> {
        let aunt = self.aunt()?;
        if aunt.aunt().is_none() {
            return Some(aunt);
        }
        aunt.sibling()
    }

    /// Returns this node's own children, wherever they are stored: in its own
    /// slots if it's a root, in its sibling's otherwise.
    pub fn children(&self) -> Option<(Rc<Self>, Rc<Self>)> {
        if self.aunt().is_none() {
            return Some((self.left_niece()?, self.right_niece()?));
        }
        let sibling = self.sibling()?;
        Some((sibling.left_niece()?, sibling.right_niece()?))
    }

    /// Recomputes this node's hash from its children and walks up re-hashing
    /// every ancestor. Nodes whose children were pruned are left alone, their
    /// subtrees didn't change.
    pub fn recompute_hashes(&self) {
        if let Some((left, right)) = self.children() {
            self.hash.set(Hash::parent_hash(&left.hash(), &right.hash()));
        }
        if let Some(parent) = self.parent() {
            parent.recompute_hashes();
        }
    }

    /// Whether anything reachable through this node's slots still needs to be
    /// kept around.
    pub fn should_remember(&self) -> bool {
        if self.remember {
            return true;
        }
        self.left_niece()
            .map_or(false, |niece| niece.should_remember())
            || self
                .right_niece()
                .map_or(false, |niece| niece.should_remember())
    }

    /// Drops this node's niece slots.
    pub fn prune(&self) {
        self.left_niece.replace(None);
        self.right_niece.replace(None);
    }

    /// Drops the niece slots unless something below them is remembered.
    pub fn maybe_prune(&self) {
        let keep = [self.left_niece(), self.right_niece()]
            .into_iter()
            .flatten()
            .any(|niece| niece.should_remember());
        if !keep {
            self.prune();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::PolNode;
    use crate::accumulator::node_hash::AccumulatorHash;
    use crate::accumulator::node_hash::BitcoinNodeHash;
    use crate::accumulator::util::hash_from_u8;

    /// Builds the two-leaf tree by hand:
    /// 02
    /// |---\
    /// 00  01
    fn two_leaf_tree() -> (
        Rc<PolNode<BitcoinNodeHash>>,
        Rc<PolNode<BitcoinNodeHash>>,
        Rc<PolNode<BitcoinNodeHash>>,
    ) {
        let leaf0 = PolNode::new(hash_from_u8(0), true);
        let leaf1 = PolNode::new(hash_from_u8(1), true);
        let root = PolNode::new(
            BitcoinNodeHash::parent_hash(&leaf0.hash(), &leaf1.hash()),
            true,
        );
        PolNode::set_nieces(&root, Some(leaf0.clone()), Some(leaf1.clone()));
        (root, leaf0, leaf1)
    }

    #[test]
    fn test_relations() {
        let (root, leaf0, leaf1) = two_leaf_tree();

        // A child of a root has the root as its aunt, the root as its parent
        // and the other child as its sibling.
        assert!(root.is_same(&leaf0.aunt().unwrap()));
        assert!(root.is_same(&leaf0.parent().unwrap()));
        assert!(leaf1.is_same(&leaf0.sibling().unwrap()));
        assert!(leaf0.is_same(&leaf1.sibling().unwrap()));
        assert!(root.aunt().is_none());
        assert!(root.parent().is_none());

        let (left, right) = root.children().unwrap();
        assert!(leaf0.is_same(&left));
        assert!(leaf1.is_same(&right));
    }

    #[test]
    fn test_recompute_hashes() {
        let (root, leaf0, _) = two_leaf_tree();

        leaf0.set_hash(hash_from_u8(7));
        leaf0.recompute_hashes();

        let expected = BitcoinNodeHash::parent_hash(&hash_from_u8(7), &hash_from_u8(1));
        assert_eq!(root.hash(), expected);
    }

    #[test]
    fn test_should_remember_and_prune() {
        let (root, _, _) = two_leaf_tree();
        assert!(root.should_remember());

        // Nothing below asks to be kept: the whole pair goes.
        let forgettable_l = PolNode::new(hash_from_u8(2), false);
        let forgettable_r = PolNode::new(hash_from_u8(3), false);
        let parent = PolNode::new(
            BitcoinNodeHash::parent_hash(&forgettable_l.hash(), &forgettable_r.hash()),
            false,
        );
        PolNode::set_nieces(&parent, Some(forgettable_l), Some(forgettable_r));
        parent.maybe_prune();
        assert!(parent.left_niece().is_none());
        assert!(parent.right_niece().is_none());
    }
}

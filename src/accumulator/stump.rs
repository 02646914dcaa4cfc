//! A lightweight accumulator holding nothing but the roots and the leaf
//! count. A [Stump] can't generate proofs, but it can verify them and apply
//! batches of additions and deletions, so a verify-only client can track the
//! set's state trustlessly while someone running a
//! [super::pollard::Pollard] serves the proofs.
use super::node_hash::AccumulatorHash;
use super::proof::Proof;
use super::AccumulatorError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stump<Hash> {
    /// How many leaves were ever added; deletions don't decrement it.
    pub leaves: u64,
    /// The forest's roots, tallest tree first. A root whose whole tree was
    /// deleted stays in place as the empty hash.
    pub roots: Vec<Hash>,
}

impl<Hash: AccumulatorHash> Stump<Hash> {
    /// Creates an empty Stump.
    /// # Example
    /// ```
    /// use pollard::accumulator::node_hash::BitcoinNodeHash;
    /// use pollard::accumulator::stump::Stump;
    /// let s = Stump::<BitcoinNodeHash>::new();
    /// assert_eq!(s.leaves, 0);
    /// ```
    pub fn new() -> Self {
        Stump {
            leaves: 0,
            roots: Vec::new(),
        }
    }

    /// Checks a proof against the current roots.
    pub fn verify(
        &self,
        del_hashes: &[Hash],
        proof: &Proof<Hash>,
    ) -> Result<(), AccumulatorError<Hash>> {
        proof.verify(del_hashes, &self.roots, self.leaves)
    }

    /// The one write operation. Order matters, so additions and deletions come
    /// in together: deletions are verified and applied against the current
    /// state first, then the new leaves are appended. Returns the new state,
    /// leaving `self` untouched for the caller to keep as an undo snapshot.
    ///
    /// # Example
    /// ```
    /// use std::str::FromStr;
    ///
    /// use pollard::accumulator::node_hash::BitcoinNodeHash;
    /// use pollard::accumulator::proof::Proof;
    /// use pollard::accumulator::stump::Stump;
    ///
    /// let s = Stump::new();
    /// let utxos = vec![BitcoinNodeHash::from_str(
    ///     "b151a956139bb821d4effa34ea95c17560e0135d1e4661fc23cedc3af49dac42",
    /// )
    /// .unwrap()];
    /// let s = s.modify(&utxos, &[], &Proof::default()).unwrap();
    /// assert_eq!(s.roots, utxos);
    /// ```
    pub fn modify(
        &self,
        adds: &[Hash],
        del_hashes: &[Hash],
        proof: &Proof<Hash>,
    ) -> Result<Self, AccumulatorError<Hash>> {
        let roots = self.remove(del_hashes, proof)?;
        let roots = Stump::add(roots, adds, self.leaves);

        Ok(Stump {
            leaves: self.leaves + adds.len() as u64,
            roots,
        })
    }

    /// Rewinds to an older state. The caller keeps the pre-modify Stump
    /// around (it's cheap, just the roots) and hands it back in case of a
    /// reorg.
    /// # Example
    /// ```
    /// use pollard::accumulator::node_hash::BitcoinNodeHash;
    /// use pollard::accumulator::proof::Proof;
    /// use pollard::accumulator::stump::Stump;
    ///
    /// let old = Stump::<BitcoinNodeHash>::new();
    /// let mut new = old.clone();
    ///
    /// // A reorg happened, roll back.
    /// new.undo(old);
    /// ```
    pub fn undo(&mut self, old_state: Stump<Hash>) {
        self.leaves = old_state.leaves;
        self.roots = old_state.roots;
    }

    /// Verifies the deletions and computes the roots with the targets
    /// removed. Each affected root is found by recomputing it from the proof
    /// with the real leaf hashes, then replaced with the value the same walk
    /// produces once those leaves are empty.
    fn remove(
        &self,
        del_hashes: &[Hash],
        proof: &Proof<Hash>,
    ) -> Result<Vec<Hash>, AccumulatorError<Hash>> {
        if del_hashes.is_empty() {
            return Ok(self.roots.clone());
        }

        let current = proof.calculate_roots(del_hashes, self.leaves)?;

        let empty = vec![Hash::empty(); del_hashes.len()];
        let replacement = proof.calculate_roots(&empty, self.leaves)?;

        let mut roots = self.roots.clone();
        let mut matched = 0;
        for root in roots.iter_mut().rev() {
            if matched < current.len() && *root == current[matched] {
                *root = replacement[matched];
                matched += 1;
            }
        }

        if matched != current.len() {
            return Err(AccumulatorError::InvalidProof(
                "computed roots don't match the accumulator",
            ));
        }

        Ok(roots)
    }

    /// Appends new leaves. Whenever two trees end up with the same height the
    /// rightmost two roots merge, which is what the bit-scan over the leaf
    /// count does: every set bit is an occupied height. An empty root gets
    /// written over: the leaf being added just moves up a row instead of
    /// hashing with it.
    fn add(mut roots: Vec<Hash>, adds: &[Hash], mut leaves: u64) -> Vec<Hash> {
        for add in adds {
            let mut to_add = *add;
            let mut row = 0;

            while (leaves >> row) & 1 == 1 {
                let root = roots.pop().expect("every set bit of leaves has a root");
                if !root.is_empty() {
                    to_add = Hash::parent_hash(&root, &to_add);
                }
                row += 1;
            }

            roots.push(to_add);
            leaves += 1;
        }

        roots
    }
}

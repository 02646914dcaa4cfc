//! Position arithmetic for the virtual forest. Positions are `u64`s laid out
//! row-major over a full forest of `tree_rows(num_leaves)` rows: row 0 holds
//! the leaves, each row above holds the parents of the row below, and the
//! roots sit in the rightmost populated column of each row. Everything about
//! the forest's shape is a function of `num_leaves` alone, so these functions
//! take it (or the row count derived from it) instead of touching any nodes.
use std::collections::BTreeSet;

/// Returns the number of rows given n leaves.
pub fn tree_rows(n: u64) -> u8 {
    if n == 0 {
        return 0;
    }
    (64 - (n - 1).leading_zeros()) as u8
}

/// Finds the current row of a node, given the position and the total forest rows.
pub fn detect_row(pos: u64, forest_rows: u8) -> u8 {
    let mut marker: u64 = 1 << forest_rows;
    let mut row: u8 = 0;

    while pos & marker != 0 {
        marker >>= 1;
        row += 1;
    }

    row
}

/// Returns the parent position of the passed in child.
pub fn parent(pos: u64, forest_rows: u8) -> u64 {
    (pos >> 1) | (1 << forest_rows)
}

/// Climbs `rise` rows from `pos`. Returns None if that would leave the forest.
pub fn parent_many(pos: u64, rise: u8, forest_rows: u8) -> Option<u64> {
    if rise == 0 {
        return Some(pos);
    }
    if rise > forest_rows {
        return None;
    }
    let mask = (2_u64 << forest_rows) - 1;
    Some((pos >> rise | (mask << (forest_rows - (rise - 1)) as u64)) & mask)
}

/// Returns the position of the left child of `pos`.
pub fn left_child(pos: u64, forest_rows: u8) -> u64 {
    let mask = (2_u64 << forest_rows) - 1;
    (pos << 1) & mask
}

/// Returns the position of the right child of `pos`.
pub fn right_child(pos: u64, forest_rows: u8) -> u64 {
    left_child(pos, forest_rows) + 1
}

/// Whether `pos` sits in a left (even) slot under its parent.
pub fn is_left_niece(pos: u64) -> bool {
    pos & 1 == 0
}

/// Returns whether `next` is `pos`'s right sibling.
pub fn is_right_sibling(pos: u64, next: u64) -> bool {
    pos | 1 == next
}

/// How many roots the forest has: one per set bit of the leaf count.
pub fn num_roots(num_leaves: u64) -> usize {
    num_leaves.count_ones() as usize
}

/// Returns the position of the root at a given row. Only meaningful if the
/// row actually has a root, i.e. the leaf count has that bit set.
pub fn root_position(num_leaves: u64, row: u8, forest_rows: u8) -> u64 {
    let mask = (2_u64 << forest_rows) - 1;
    let before = num_leaves & (mask << (row + 1));

    let shifted = (before >> row) | (mask << (forest_rows + 1 - row));
    shifted & mask
}

/// Checks if the given position is a root, given the number of leaves and the
/// entire rows of the forest.
pub fn is_root_position(pos: u64, num_leaves: u64, forest_rows: u8) -> bool {
    let row = detect_row(pos, forest_rows);

    let root_present = num_leaves & (1 << row) != 0;
    let root_pos = root_position(num_leaves, row, forest_rows);

    root_present && root_pos == pos
}

/// The row of the nth root, counting from the tallest tree.
///
/// Roots live where the leaf count has a set bit; index 0 is the most
/// significant one. Returns None when there aren't that many roots.
pub fn root_row(num_leaves: u64, tree_index: u8) -> Option<u8> {
    let mut seen = 0;
    for row in (0..64).rev() {
        if (num_leaves >> row) & 1 == 1 {
            if seen == tree_index {
                return Some(row);
            }
            seen += 1;
        }
    }
    None
}

/// Returns the smallest position the forest can have on the requested row.
pub fn start_position_at_row(row: u8, forest_rows: u8) -> u64 {
    // 2 << forest_rows is 2 more than the max position. To get the offset for
    // a given row, subtract (2 << `row complement of forest_rows`) from it.
    (2u64 << forest_rows) - (2u64 << (forest_rows - row))
}

/// Returns the biggest position the forest can have on the requested row for
/// the given number of leaves. None if the climb leaves the forest.
pub fn max_position_at_row(row: u8, forest_rows: u8, num_leaves: u64) -> Option<u64> {
    parent_many(num_leaves, row, forest_rows).map(|pos| pos.saturating_sub(1))
}

/// Locates the tree holding `pos`: returns (how many bigger trees come before
/// it, how many rows to descend from that tree's root, and the inverted path
/// bits for the descent). None if the position isn't in the forest.
pub fn detect_offset(pos: u64, num_leaves: u64) -> Option<(u8, u8, u64)> {
    let mut tr = tree_rows(num_leaves);
    let nr = detect_row(pos, tr);

    let mut bigger_trees: u8 = 0;
    let mut marker = pos;

    // Walk the trees from tallest to shortest, subtracting everything each
    // tree covers from the position until it fits in the current tree.
    while (marker << nr) & ((2_u64 << tr) - 1) >= (1 << tr) & num_leaves {
        let tree_size = (1 << tr) & num_leaves;
        if tree_size != 0 {
            marker -= tree_size;
            bigger_trees += 1;
        }

        if tr == 0 {
            return None;
        }
        tr -= 1;
    }

    if nr > tr {
        return None;
    }

    Some((bigger_trees, tr - nr, !marker))
}

/// The members of one row, in ascending order. Rows occupy contiguous
/// position ranges, so this is a range query on the set.
fn on_row(positions: &BTreeSet<u64>, row: u8, forest_rows: u8) -> Vec<u64> {
    let start = start_position_at_row(row, forest_rows);
    let end = start + (1_u64 << (forest_rows - row));
    positions.range(start..end).copied().collect()
}

/// Collapses a set of deletions: two targeted siblings become a single
/// deletion of their parent on the row above. The result is the minimal set
/// of positions whose whole subtrees go away.
pub fn detwin(dels: Vec<u64>, forest_rows: u8) -> Vec<u64> {
    let mut survivors: BTreeSet<u64> = dels.into_iter().collect();

    // A collapse lands one row up, so one pass from the bottom settles
    // everything, cascades included. Only the left slot starts a collapse;
    // its sibling is gone from the set by the time the sweep reaches it.
    for row in 0..forest_rows {
        for pos in on_row(&survivors, row, forest_rows) {
            if pos & 1 != 0 {
                continue;
            }
            if survivors.contains(&(pos ^ 1)) {
                survivors.remove(&pos);
                survivors.remove(&(pos ^ 1));
                survivors.insert(parent(pos, forest_rows));
            }
        }
    }

    survivors.into_iter().collect()
}

/// Returns which positions must have their hashes in a proof for the given
/// targets: every sibling along the targets' paths to their roots that can't
/// be computed from the targets themselves. Positions come out ascending,
/// which is also the order verification consumes the hashes in.
pub fn get_proof_positions(targets: &[u64], num_leaves: u64, forest_rows: u8) -> Vec<u64> {
    let mut needed = Vec::new();

    // Everything whose hash will be known by the time its row is reached:
    // the targets themselves, plus the parents computed on the way up.
    let mut computable: BTreeSet<u64> = targets.iter().copied().collect();

    for row in 0..forest_rows {
        for pos in on_row(&computable, row, forest_rows) {
            if !computable.remove(&pos) {
                // Already consumed as an earlier position's sibling.
                continue;
            }
            if is_root_position(pos, num_leaves, forest_rows) {
                continue;
            }

            // A computable sibling pairs up for free; anything else has to
            // come with the proof.
            if !computable.remove(&(pos ^ 1)) {
                needed.push(pos ^ 1);
            }
            computable.insert(parent(pos, forest_rows));
        }
    }

    needed
}

#[cfg(test)]
pub fn hash_from_u8(value: u8) -> super::node_hash::BitcoinNodeHash {
    use bitcoin_hashes::sha256;
    use bitcoin_hashes::Hash;
    use bitcoin_hashes::HashEngine;

    let mut engine = sha256::Hash::engine();
    engine.input(&[value]);

    sha256::Hash::from_engine(engine).into()
}

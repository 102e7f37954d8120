//! Merkle tree over a transaction list, flattened in level order.
//!
//! Layout:
//! - index 0 is the root; node `j` has children `2j + 1` and `2j + 2`;
//! - leaves occupy the tail in transaction order;
//! - a level of odd width is padded by duplicating its last node, and the
//!   duplicate's subtree is duplicated along with it, so every level below the
//!   root is exactly twice as wide as the one above.

use crate::crypto::{hash_pair, Seal};
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;

/// Flattened Merkle tree; `tx_seal[0]` is the root.
pub type TxSeal = Vec<Seal>;

/// One level of the tree before flattening.
struct Level {
    nodes: Vec<Seal>,
    padded: bool,
}

impl Level {
    fn padded(mut nodes: Vec<Seal>) -> Self {
        let padded = nodes.len() % 2 == 1;
        if padded {
            let last = nodes[nodes.len() - 1].clone();
            nodes.push(last);
        }
        Level { nodes, padded }
    }

    /// Index of the node whose children back `index` (a padding node reuses its twin's).
    fn origin(&self, index: usize) -> usize {
        if self.padded && index == self.nodes.len() - 1 {
            index - 1
        } else {
            index
        }
    }
}

pub fn leaf_seals(tx_list: &[Transaction]) -> Result<Vec<Seal>> {
    tx_list.iter().map(Transaction::calculate_seal).collect()
}

/// Builds the flattened tree from leaf hashes.
pub fn build_tree(leaves: Vec<Seal>) -> Result<TxSeal> {
    if leaves.is_empty() {
        return Err(ChainError::EmptyTransactionList);
    }

    let mut levels = vec![Level::padded(leaves)];
    loop {
        let parents: Vec<Seal> = levels[levels.len() - 1]
            .nodes
            .chunks_exact(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();

        if parents.len() == 1 {
            levels.push(Level { nodes: parents, padded: false });
            break;
        }
        levels.push(Level::padded(parents));
    }

    Ok(flatten(&levels))
}

fn flatten(levels: &[Level]) -> TxSeal {
    let depth = levels.len() - 1;
    let mut tree = Vec::with_capacity((1usize << (depth + 1)) - 1);

    // Positions in each compact level backing the current heap row.
    let mut sources = vec![0usize];
    for (height, level) in levels.iter().enumerate().rev() {
        tree.extend(sources.iter().map(|&i| level.nodes[i].clone()));
        if height == 0 {
            break;
        }
        sources = sources
            .iter()
            .flat_map(|&i| {
                let origin = level.origin(i);
                [2 * origin, 2 * origin + 1]
            })
            .collect();
    }

    tree
}

pub fn root(tx_seal: &[Seal]) -> Option<&Seal> {
    tx_seal.first()
}

/// Verifies that `leaf` is committed to by `tree`, climbing from its position to the root.
///
/// With duplicate leaves the highest matching position is used.
pub fn verify_leaf(tree: &[Seal], leaf: &Seal) -> bool {
    let first_leaf = tree.len() / 2;
    let Some(mut index) = tree
        .iter()
        .enumerate()
        .skip(first_leaf)
        .filter(|(_, node)| *node == leaf)
        .map(|(i, _)| i)
        .last()
    else {
        return false;
    };

    while index > 0 {
        let (left, right) = if index % 2 == 0 {
            (index - 1, index)
        } else {
            (index, index + 1)
        };
        if right >= tree.len() {
            return false;
        }

        let parent = (index - 1) / 2;
        if hash_pair(&tree[left], &tree[right]) != tree[parent] {
            return false;
        }
        index = parent;
    }

    true
}

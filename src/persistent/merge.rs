//! Union of two tries under a duplicate policy.

use super::duplicates::{MergeDuplicates, Winner};
use super::node::{Branch, Resolution, TrieNode, empty_kids};
use crate::error::MapError;
use crate::value::{Key, Value};

/// The operand an incoming binding was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Merges two subtrees rooted at the same level.
///
/// Walks the smaller (or non-branch) side into the other one. Returns
/// `left` itself if the merge changes nothing.
pub(crate) fn merge(
    left: &TrieNode,
    right: &TrieNode,
    level: u32,
    policy: MergeDuplicates,
) -> Result<TrieNode, MapError> {
    if left.ptr_eq(right) && policy.is_idempotent() {
        return Ok(left.clone());
    }
    match (left, right) {
        (_, TrieNode::Empty) => Ok(left.clone()),
        (TrieNode::Empty, _) => Ok(right.clone()),
        (TrieNode::Branch(lefts), TrieNode::Branch(rights)) => {
            merge_branches(left, lefts, right, rights, level, policy)
        }
        (TrieNode::Branch(_), _) => fold_into(left, right, Side::Right, level, policy),
        (_, TrieNode::Branch(_)) => fold_into(right, left, Side::Left, level, policy),
        _ if right.size() > left.size() => fold_into(right, left, Side::Left, level, policy),
        _ => fold_into(left, right, Side::Right, level, policy),
    }
}

fn merge_branches(
    left: &TrieNode,
    lefts: &Branch,
    right: &TrieNode,
    rights: &Branch,
    level: u32,
    policy: MergeDuplicates,
) -> Result<TrieNode, MapError> {
    let mut kids = empty_kids();
    let mut same_as_left = true;
    let mut same_as_right = true;
    for (index, kid) in kids.iter_mut().enumerate() {
        let merged = merge(&lefts.kids[index], &rights.kids[index], level + 1, policy)?;
        same_as_left &= merged.ptr_eq(&lefts.kids[index]);
        same_as_right &= merged.ptr_eq(&rights.kids[index]);
        *kid = merged;
    }
    if same_as_left {
        Ok(left.clone())
    } else if same_as_right {
        Ok(right.clone())
    } else {
        Ok(TrieNode::branch(kids))
    }
}

/// Inserts every binding of `source` into `target`.
fn fold_into(
    target: &TrieNode,
    source: &TrieNode,
    side: Side,
    level: u32,
    policy: MergeDuplicates,
) -> Result<TrieNode, MapError> {
    match source {
        TrieNode::Empty => Ok(target.clone()),
        TrieNode::Leaf(leaf) => insert(target, leaf.hash, &leaf.key, &leaf.value, side, level, policy),
        TrieNode::List(list) => list.entries.iter().try_fold(target.clone(), |node, (key, value)| {
            insert(&node, list.hash, key, value, side, level, policy)
        }),
        TrieNode::Branch(branch) => branch.kids.iter().try_fold(target.clone(), |node, kid| {
            fold_into(&node, kid, side, level, policy)
        }),
    }
}

fn insert(
    target: &TrieNode,
    hash: u32,
    key: &Key,
    value: &Value,
    side: Side,
    level: u32,
    policy: MergeDuplicates,
) -> Result<TrieNode, MapError> {
    let (node, _) = target.upsert::<MapError, _>(
        hash,
        key.clone(),
        value.clone(),
        level,
        &mut |existing_key: &Key, existing: &Value, key: Key, value: Value| {
            let (left_key, left, right) = match side {
                Side::Left => (&key, &value, existing),
                Side::Right => (existing_key, existing, &value),
            };
            Ok(match policy.resolve(left_key, left, right)? {
                Winner::Either => Resolution::Keep,
                Winner::Left if side == Side::Right => Resolution::Keep,
                Winner::Right if side == Side::Left => Resolution::Keep,
                Winner::Left | Winner::Right => Resolution::Replace(key, value),
                Winner::Combined(combined) => Resolution::Replace(left_key.clone(), combined),
            })
        },
    )?;
    Ok(node)
}

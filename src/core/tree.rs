//! Identifier-addressed tree helpers
//!
//! Every lookup walks the live tree. Nothing here caches positions, so the
//! results stay valid across wholesale rebuilds.

use std::collections::HashSet;

use tracing::warn;

use super::{Block, BlockId};

/// Where a block sits: its parent (`None` for roots) and its index among
/// the parent's children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLocation {
    pub parent: Option<BlockId>,
    pub index: usize,
}

pub fn find<'a>(blocks: &'a [Block], id: &BlockId) -> Option<&'a Block> {
    for block in blocks {
        if &block.id == id {
            return Some(block);
        }
        if let Some(found) = find(&block.children, id) {
            return Some(found);
        }
    }
    None
}

pub fn find_mut<'a>(blocks: &'a mut [Block], id: &BlockId) -> Option<&'a mut Block> {
    for block in blocks.iter_mut() {
        if &block.id == id {
            return Some(block);
        }
        if let Some(found) = find_mut(&mut block.children, id) {
            return Some(found);
        }
    }
    None
}

pub fn locate(blocks: &[Block], id: &BlockId) -> Option<BlockLocation> {
    locate_in(blocks, None, id)
}

fn locate_in(blocks: &[Block], parent: Option<&BlockId>, id: &BlockId) -> Option<BlockLocation> {
    for (index, block) in blocks.iter().enumerate() {
        if &block.id == id {
            return Some(BlockLocation {
                parent: parent.cloned(),
                index,
            });
        }
        if let Some(location) = locate_in(&block.children, Some(&block.id), id) {
            return Some(location);
        }
    }
    None
}

/// The sibling list a block lives in: the roots, or a parent's children.
pub fn siblings_mut<'a>(
    blocks: &'a mut Vec<Block>,
    parent: Option<&BlockId>,
) -> Option<&'a mut Vec<Block>> {
    match parent {
        None => Some(blocks),
        Some(parent_id) => find_mut(blocks, parent_id).map(|b| &mut b.children),
    }
}

/// Detach a block with its subtree.
pub fn remove(blocks: &mut Vec<Block>, id: &BlockId) -> Option<Block> {
    if let Some(pos) = blocks.iter().position(|b| &b.id == id) {
        let mut removed = blocks.remove(pos);
        removed.parent = None;
        return Some(removed);
    }
    for block in blocks.iter_mut() {
        if let Some(removed) = remove(&mut block.children, id) {
            return Some(removed);
        }
    }
    None
}

/// Ids from the root down to `id`, inclusive.
pub fn path_to(blocks: &[Block], id: &BlockId) -> Option<Vec<BlockId>> {
    for block in blocks {
        if &block.id == id {
            return Some(vec![block.id.clone()]);
        }
        if let Some(mut path) = path_to(&block.children, id) {
            path.insert(0, block.id.clone());
            return Some(path);
        }
    }
    None
}

/// True when `ancestor` is a strict ancestor of `descendant`.
pub fn is_ancestor(blocks: &[Block], ancestor: &BlockId, descendant: &BlockId) -> bool {
    path_to(blocks, descendant)
        .map(|path| path[..path.len() - 1].contains(ancestor))
        .unwrap_or(false)
}

/// Depth-first pre-order walk
pub fn walk<'a>(blocks: &'a [Block], visit: &mut impl FnMut(&'a Block)) {
    for block in blocks {
        visit(block);
        walk(&block.children, visit);
    }
}

pub fn walk_mut(blocks: &mut [Block], visit: &mut impl FnMut(&mut Block)) {
    for block in blocks.iter_mut() {
        visit(block);
        walk_mut(&mut block.children, visit);
    }
}

/// All ids in document order.
pub fn document_order(blocks: &[Block]) -> Vec<BlockId> {
    let mut ids = Vec::new();
    walk(blocks, &mut |b| ids.push(b.id.clone()));
    ids
}

/// Ids of a block and its descendants.
pub fn subtree_ids(block: &Block) -> Vec<BlockId> {
    let mut ids = vec![block.id.clone()];
    walk(&block.children, &mut |b| ids.push(b.id.clone()));
    ids
}

pub fn count(blocks: &[Block]) -> usize {
    let mut n = 0;
    walk(blocks, &mut |_| n += 1);
    n
}

/// Point every child's parent link at its container.
pub fn reattach_parents(blocks: &mut [Block], parent: Option<&BlockId>) {
    for block in blocks.iter_mut() {
        block.parent = parent.cloned();
        let id = block.id.clone();
        reattach_parents(&mut block.children, Some(&id));
    }
}

/// Give later duplicates of an id a fresh one. Returns how many changed.
pub fn repair_duplicate_ids(blocks: &mut [Block]) -> usize {
    let mut seen = HashSet::new();
    let mut repaired = 0;
    walk_mut(blocks, &mut |block| {
        if !seen.insert(block.id.clone()) {
            let fresh = BlockId::new();
            warn!(duplicate = %block.id, replacement = %fresh, "duplicate block id on load");
            block.id = fresh.clone();
            seen.insert(fresh);
            repaired += 1;
        }
    });
    if repaired > 0 {
        reattach_parents(blocks, None);
    }
    repaired
}

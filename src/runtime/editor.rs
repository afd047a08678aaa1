//! Mutation engine
//!
//! `Editor` owns one document: the root block sequence, its history, the
//! reference fetch table and an outbox of events for the rendering surface.
//! Every structural change validates first and splices second, then goes
//! through `emit_change`, which marks the document dirty, records history
//! and refreshes pinned copies in the shared `ReferenceIndex`.
//!
//! Nothing here caches tree positions. Blocks are always located by id,
//! so operations stay valid across wholesale rebuilds (load, undo, redo).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::categories::layout::columns::{
    new_column, new_layout, normalize_column_layouts, rebalance_widths, COLUMN, COLUMNS,
};
use crate::categories::reference::locator::resolve_path;
use crate::categories::reference::Locator;
use crate::config::EditorConfig;
use crate::core::parameter::find_field;
use crate::core::tree;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockData, BlockError, BlockId, BlockLocation,
    BlockRegistry, KeyInput, KeyOutcome, RegistryError, TreeRole,
};

use super::history::{HistoryManager, TYPING};
use super::reference::{ReferenceIndex, ReferenceRequest, ReferenceResolver, ReferenceResponse, ReferenceState};
use super::timer::{Clock, SystemClock, Timer};
use super::validation::TreeValidator;

// ── Events ──────────────────────────────────────────────────────────────────

/// Change notification passed through `emit_change`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    pub record_history: bool,
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<BlockId>,
}

/// Outbox entry for the rendering surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EditorEvent {
    RenderAll,
    #[serde(rename_all = "camelCase")]
    Render { block_id: BlockId },
    #[serde(rename_all = "camelCase")]
    Focus { block_id: BlockId },
    Changed(ChangeNotification),
    FetchReference(ReferenceRequest),
    #[serde(rename_all = "camelCase")]
    ReferenceUpdated { block_id: BlockId },
    #[serde(rename_all = "camelCase")]
    CommandMenuRequested { block_id: BlockId },
}

/// Where dropped blocks land relative to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DropPosition {
    Before,
    After,
    /// As the last children of the target
    InsideLast,
    /// In a column left of the target
    Left,
    /// In a column right of the target
    Right,
}

/// Outcome of `load_page`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Blocks in the built tree, nested ones included
    pub loaded: usize,
    /// Records dropped for an unknown type
    pub skipped: usize,
    /// Duplicate ids replaced with fresh ones
    pub repaired_ids: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),

    #[error("Structure violation: {0}")]
    StructureViolation(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Serialized root sequence used as a history entry.
fn snapshot(blocks: &[Block]) -> Result<String, serde_json::Error> {
    let data: Vec<BlockData> = blocks.iter().map(Block::to_data).collect();
    serde_json::to_string(&data)
}

// ── Editor ──────────────────────────────────────────────────────────────────

pub struct Editor {
    path: Option<String>,
    blocks: Vec<Block>,
    registry: BlockRegistry,
    history: HistoryManager,
    references: ReferenceResolver,
    index: ReferenceIndex,
    config: EditorConfig,
    clock: Arc<dyn Clock>,
    events: Vec<EditorEvent>,
    dirty: bool,
}

impl Editor {
    pub fn new(registry: BlockRegistry, config: EditorConfig) -> Self {
        Self {
            path: None,
            blocks: Vec::new(),
            registry,
            history: HistoryManager::new(config.history_capacity, config.typing_debounce_ms),
            references: ReferenceResolver::new(config.reference_timeout_ms),
            index: ReferenceIndex::new(),
            config,
            clock: Arc::new(SystemClock::new()),
            events: Vec::new(),
            dirty: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share a process-wide reference index with other editors.
    pub fn with_reference_index(mut self, index: ReferenceIndex) -> Self {
        self.index = index;
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn reference_index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn find_block(&self, id: &BlockId) -> Option<&Block> {
        tree::find(&self.blocks, id)
    }

    pub fn find_block_instance_and_parent(&self, id: &BlockId) -> Option<BlockLocation> {
        tree::locate(&self.blocks, id)
    }

    /// Take every queued event.
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current document, drafts included, without touching the tree.
    pub fn serialize_document(&self) -> Vec<BlockData> {
        self.blocks.iter().map(Block::to_data).collect()
    }

    // ── Loading ─────────────────────────────────────────────────────────

    /// Replace the document with `data`.
    ///
    /// Unknown types are skipped, duplicate ids repaired and every quote
    /// starts fetching. History restarts; its baseline is captured on the
    /// next `tick` or mutation.
    pub fn load_page(&mut self, path: Option<&str>, data: &[BlockData]) -> LoadReport {
        let timer = Timer::now();

        let (mut blocks, skipped) = self.registry.build_tree(data);
        let repaired_ids = tree::repair_duplicate_ids(&mut blocks);
        self.blocks = blocks;
        self.path = path.map(str::to_string);
        self.check_tree("load");

        self.history.record_initial_state();
        self.references.clear();
        for (block_id, locator) in self.virtual_blocks() {
            self.request_reference_for(&block_id, locator);
        }
        self.sync_reference_index();

        self.events.push(EditorEvent::RenderAll);
        self.dirty = false;

        let report = LoadReport {
            loaded: tree::count(&self.blocks),
            skipped,
            repaired_ids,
        };
        info!(
            path = ?self.path,
            blocks = report.loaded,
            skipped,
            repaired_ids,
            elapsed_ms = timer.elapsed_ms(),
            "page loaded"
        );
        report
    }

    /// Load another document, dropping this one's history and outbox.
    pub fn switch_document(&mut self, path: &str, data: &[BlockData]) -> LoadReport {
        self.history.clear();
        self.events.clear();
        self.load_page(Some(path), data)
    }

    // ── Structural edits ────────────────────────────────────────────────

    /// Insert a new block right after `reference`, or at the top of the
    /// document when there is none. The type defaults to the reference's
    /// follow-up template, else the configured default type.
    pub fn insert_new_block_after(
        &mut self,
        reference: Option<&BlockId>,
        block_type: Option<&str>,
    ) -> Result<BlockId, EditorError> {
        let (data, location) = match reference {
            Some(ref_id) => {
                let block = self.require(ref_id)?;
                let location = self.require_location(ref_id)?;
                let data = match block_type {
                    Some(t) => BlockData::new(t),
                    None => block.variant().next_block_template(block),
                };
                (
                    data,
                    BlockLocation {
                        parent: location.parent,
                        index: location.index + 1,
                    },
                )
            }
            None => (
                BlockData::new(block_type.unwrap_or(self.config.default_block_type.as_str())),
                BlockLocation {
                    parent: None,
                    index: 0,
                },
            ),
        };

        self.check_insertable(&location)?;
        self.prepare_mutation()?;
        self.insert_at(data, location)
    }

    fn insert_at(&mut self, mut data: BlockData, location: BlockLocation) -> Result<BlockId, EditorError> {
        self.check_insertable(&location)?;

        data.id = None;
        let mut block = self
            .registry
            .create_block_instance(&data)
            .ok_or_else(|| EditorError::UnknownBlockType(data.block_type.clone()))?;
        let id = block.id().clone();
        let locator = (block.role() == TreeRole::Virtual)
            .then(|| block.variant().reference_locator(&block));

        let siblings = tree::siblings_mut(&mut self.blocks, location.parent.as_ref())
            .ok_or_else(|| EditorError::BlockNotFound(location.parent.clone().unwrap_or_default()))?;
        block.parent = location.parent.clone();
        let index = location.index.min(siblings.len());
        siblings.insert(index, block);

        if let Some(locator) = locator {
            self.request_reference_for(&id, locator);
        }

        self.events.push(EditorEvent::Render { block_id: id.clone() });
        self.events.push(EditorEvent::Focus { block_id: id.clone() });
        self.emit_change(true, "insert-block", Some(&id))?;
        Ok(id)
    }

    /// Delete a block with its subtree. Returns the removed record.
    ///
    /// Rows of a table and the cells inside them are refused; the table's
    /// own actions keep its grid rectangular.
    pub fn delete_block(&mut self, id: &BlockId) -> Result<BlockData, EditorError> {
        let location = self.require_location(id)?;
        self.check_detachable(id, &location)?;

        self.prepare_mutation()?;
        let removed = self
            .detach(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        self.clean_up_structure();

        let parent = location.parent.filter(|p| tree::find(&self.blocks, p).is_some());
        match &parent {
            Some(parent_id) => self.events.push(EditorEvent::Render {
                block_id: parent_id.clone(),
            }),
            None => self.events.push(EditorEvent::RenderAll),
        }
        self.emit_change(true, "delete-block", parent.as_ref())?;
        Ok(removed.to_data())
    }

    /// Delete every listed block that still exists, as one history entry.
    ///
    /// Returns how many were deleted. Missing ids and table parts are
    /// skipped.
    pub fn delete_multiple_blocks(&mut self, ids: &[BlockId]) -> Result<usize, EditorError> {
        self.prepare_mutation()?;

        let mut deleted = 0;
        for id in ids {
            let location = match tree::locate(&self.blocks, id) {
                Some(location) => location,
                None => continue,
            };
            if let Err(e) = self.check_detachable(id, &location) {
                debug!(block = %id, error = %e, "skipping block in batch delete");
                continue;
            }
            if self.detach(id).is_some() {
                deleted += 1;
            }
        }

        if deleted == 0 {
            return Ok(0);
        }

        self.clean_up_structure();
        self.events.push(EditorEvent::RenderAll);
        self.emit_change(true, "batch-delete", None)?;
        Ok(deleted)
    }

    /// Move blocks next to, into, or beside `target`.
    ///
    /// Everything is validated before the tree is touched. Blocks nested
    /// inside another moved block travel with it, and the rest keep their
    /// document order.
    pub fn move_blocks(
        &mut self,
        ids: &[BlockId],
        target: &BlockId,
        position: DropPosition,
    ) -> Result<(), EditorError> {
        if ids.is_empty() {
            return Ok(());
        }
        let target_block = self.require(target)?;
        let target_location = self.require_location(target)?;

        let mut moving: Vec<BlockId> = Vec::new();
        for id in ids {
            let location = self.require_location(id)?;
            if id == target || tree::is_ancestor(&self.blocks, id, target) {
                return Err(EditorError::InvalidMove(format!(
                    "cannot drop '{}' onto itself or its own subtree",
                    id
                )));
            }
            self.check_detachable(id, &location)?;
            if !moving.contains(id) {
                moving.push(id.clone());
            }
        }
        let selected: HashSet<BlockId> = moving.iter().cloned().collect();
        moving.retain(|id| {
            tree::path_to(&self.blocks, id)
                .map(|path| !path[..path.len() - 1].iter().any(|a| selected.contains(a)))
                .unwrap_or(false)
        });
        let order = tree::document_order(&self.blocks);
        moving.sort_by_key(|id| order.iter().position(|o| o == id));

        // Prepare the landing spot before detaching anything.
        let anchor_column = if target_block.block_type() == COLUMN {
            Some(target.clone())
        } else {
            target_location
                .parent
                .as_ref()
                .and_then(|p| tree::find(&self.blocks, p))
                .filter(|p| p.block_type() == COLUMN)
                .map(|p| p.id().clone())
        };

        let layout_id = match (&anchor_column, position) {
            (Some(column_id), DropPosition::Left | DropPosition::Right) => {
                Some(self.layout_of_column(column_id)?)
            }
            _ => None,
        };

        let mut shell = None;
        match position {
            DropPosition::Before | DropPosition::After => {
                self.check_accepts_siblings(&target_location)?;
            }
            DropPosition::InsideLast => {
                if !target_block.variant().accepts_dropped_children() {
                    return Err(EditorError::InvalidMove(format!(
                        "'{}' does not accept dropped blocks",
                        target_block.block_type()
                    )));
                }
            }
            DropPosition::Left | DropPosition::Right => match &anchor_column {
                Some(_) => shell = Some(new_column(&self.registry, Vec::new())?),
                None => {
                    self.check_accepts_siblings(&target_location)?;
                    shell = Some(new_layout(&self.registry, Vec::new(), Vec::new())?);
                }
            },
        }

        self.prepare_mutation()?;

        let mut moved = Vec::with_capacity(moving.len());
        for id in &moving {
            if let Some(block) = tree::remove(&mut self.blocks, id) {
                moved.push(block);
            }
        }

        match (position, shell) {
            (DropPosition::InsideLast, _) => {
                let target_block = tree::find_mut(&mut self.blocks, target)
                    .ok_or_else(|| EditorError::BlockNotFound(target.clone()))?;
                target_block.children_mut().extend(moved);
            }
            (DropPosition::Left | DropPosition::Right, Some(mut shell)) => match (anchor_column, layout_id) {
                (Some(column_id), Some(layout_id)) => {
                    for block in moved {
                        shell.push_child(block);
                    }
                    let column_location = self.require_location(&column_id)?;
                    let layout = tree::find_mut(&mut self.blocks, &layout_id)
                        .ok_or_else(|| EditorError::BlockNotFound(layout_id.clone()))?;
                    let index = if position == DropPosition::Left {
                        column_location.index
                    } else {
                        column_location.index + 1
                    };
                    layout.children_mut().insert(index, shell);
                    rebalance_widths(layout);
                }
                _ => {
                    let location = self.require_location(target)?;
                    let siblings = tree::siblings_mut(&mut self.blocks, location.parent.as_ref())
                        .ok_or_else(|| EditorError::BlockNotFound(target.clone()))?;
                    let target_block = siblings.remove(location.index);
                    let (left, right) = if position == DropPosition::Left {
                        (moved, vec![target_block])
                    } else {
                        (vec![target_block], moved)
                    };
                    let columns = shell.children_mut();
                    for block in left {
                        columns[0].push_child(block);
                    }
                    for block in right {
                        columns[1].push_child(block);
                    }
                    siblings.insert(location.index, shell);
                }
            },
            _ => {
                let location = self.require_location(target)?;
                let siblings = tree::siblings_mut(&mut self.blocks, location.parent.as_ref())
                    .ok_or_else(|| EditorError::BlockNotFound(target.clone()))?;
                let index = if position == DropPosition::Before {
                    location.index
                } else {
                    location.index + 1
                };
                siblings.splice(index..index, moved);
            }
        }

        self.clean_up_structure();
        tree::reattach_parents(&mut self.blocks, None);

        self.events.push(EditorEvent::RenderAll);
        let origin = tree::find(&self.blocks, target).map(|b| b.id().clone());
        self.emit_change(true, "drag-drop-reorder", origin.as_ref())
    }

    // ── Content edits ───────────────────────────────────────────────────

    /// Text typed into a block by the surface. Held as a draft until the
    /// next reconcile; recorded as coalescing `typing`.
    pub fn report_input(&mut self, id: &BlockId, text: &str) -> Result<(), EditorError> {
        self.settle_baseline()?;
        let block = tree::find_mut(&mut self.blocks, id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        block.set_draft(text);
        self.emit_change(true, TYPING, Some(id))
    }

    pub fn update_content(&mut self, id: &BlockId, content: &str) -> Result<(), EditorError> {
        self.require(id)?;
        self.prepare_mutation()?;
        if let Some(block) = tree::find_mut(&mut self.blocks, id) {
            block.set_content(content);
        }
        self.events.push(EditorEvent::Render { block_id: id.clone() });
        self.emit_change(true, "update-content", Some(id))
    }

    /// Set one property. Keys in the block's schema are type-checked, and
    /// keys the variant keeps consistent through its own actions are
    /// refused.
    pub fn set_property(
        &mut self,
        id: &BlockId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), EditorError> {
        let block = self.require(id)?;
        if block.variant().managed_properties().contains(&key) {
            return Err(BlockError::InvalidProperty(format!(
                "'{}' of '{}' is changed through its actions",
                key,
                block.block_type()
            ))
            .into());
        }
        let schema = block.properties_schema();
        if let Some(field) = find_field(&schema, key) {
            field.check(&value).map_err(BlockError::InvalidProperty)?;
        }
        let locator_before = block.variant().reference_locator(block);

        self.prepare_mutation()?;
        if let Some(block) = tree::find_mut(&mut self.blocks, id) {
            block.set_property(key, value);
        }
        self.refresh_reference(id, locator_before);
        self.events.push(EditorEvent::Render { block_id: id.clone() });
        self.emit_change(true, "property-change", Some(id))
    }

    /// Remove every schema property the block carries. Variant state
    /// outside the schema (`checked`, `number`, ...) is kept.
    pub fn reset_properties(&mut self, id: &BlockId) -> Result<usize, EditorError> {
        let block = self.require(id)?;
        let keys: Vec<String> = block
            .properties_schema()
            .into_iter()
            .map(|field| field.key)
            .filter(|key| block.property(key).is_some())
            .collect();
        if keys.is_empty() {
            return Ok(0);
        }
        let locator_before = block.variant().reference_locator(block);

        self.prepare_mutation()?;
        if let Some(block) = tree::find_mut(&mut self.blocks, id) {
            for key in &keys {
                block.remove_property(key);
            }
        }
        self.refresh_reference(id, locator_before);
        self.events.push(EditorEvent::Render { block_id: id.clone() });
        self.emit_change(true, "reset-props", Some(id))?;
        Ok(keys.len())
    }

    // ── Variant behaviour ───────────────────────────────────────────────

    pub fn handle_key_input(&mut self, id: &BlockId, key: KeyInput) -> Result<KeyOutcome, EditorError> {
        let block = self.require(id)?;
        let outcome = block.variant().handle_key_input(block, &key);

        match &outcome {
            KeyOutcome::InsertAfter(template) => {
                let location = self.require_location(id)?;
                self.check_insertable(&location)?;
                self.prepare_mutation()?;
                if let Some(block) = tree::find_mut(&mut self.blocks, id) {
                    block.reconcile();
                }
                self.insert_at(
                    template.clone(),
                    BlockLocation {
                        parent: location.parent,
                        index: location.index + 1,
                    },
                )?;
            }
            KeyOutcome::DeleteSelf => {
                let focus = self.focus_target_for_delete(id);
                self.delete_block(id)?;
                if let Some(target) = focus.filter(|t| tree::find(&self.blocks, t).is_some()) {
                    self.events.push(EditorEvent::Focus { block_id: target });
                }
            }
            KeyOutcome::OpenCommandMenu => {
                self.events.push(EditorEvent::CommandMenuRequested { block_id: id.clone() });
            }
            KeyOutcome::SoftBreak | KeyOutcome::Ignored => {}
        }

        Ok(outcome)
    }

    /// Run a toolbar or inline action on a block.
    ///
    /// A refused action leaves the tree as it was and notifies nobody.
    pub fn handle_action(&mut self, id: &BlockId, action: &ActionRequest) -> Result<ActionOutcome, EditorError> {
        let block = self.require(id)?;
        let variant = block.variant().clone();
        let locator_before = variant.reference_locator(block);

        self.prepare_mutation()?;
        let registry = self.registry.clone();
        let block = tree::find_mut(&mut self.blocks, id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        block.reconcile();
        let outcome = variant.handle_action(block, action, &registry)?;
        tree::reattach_parents(block.children_mut(), Some(id));

        match &outcome {
            ActionOutcome::Changed { action_type } => {
                self.refresh_reference(id, locator_before);
                self.events.push(EditorEvent::Render { block_id: id.clone() });
                self.emit_change(true, action_type, Some(id))?;
            }
            ActionOutcome::Refused => {
                debug!(block = %id, action = %action.id, "action refused");
            }
            ActionOutcome::Delegated => {}
        }
        Ok(outcome)
    }

    // ── Notifications ───────────────────────────────────────────────────

    /// Single chokepoint for document changes.
    ///
    /// Marks the document dirty, records history when asked (and not
    /// restoring), refreshes pinned copies of `origin` and its ancestors
    /// and queues a `Changed` event.
    pub fn emit_change(
        &mut self,
        record_history: bool,
        action_type: &str,
        origin: Option<&BlockId>,
    ) -> Result<(), EditorError> {
        self.dirty = true;

        if record_history {
            let now = self.clock.now_ms();
            self.history.record(action_type, now, || snapshot(&self.blocks))?;
        }

        if let Some(origin) = origin {
            self.bubble_to_index(origin);
        }

        self.events.push(EditorEvent::Changed(ChangeNotification {
            record_history,
            action_type: action_type.to_string(),
            origin: origin.cloned(),
        }));
        Ok(())
    }

    fn bubble_to_index(&self, origin: &BlockId) {
        let path = match &self.path {
            Some(path) if self.index.has_references_for(path) => path,
            _ => return,
        };
        for id in tree::path_to(&self.blocks, origin).unwrap_or_default() {
            if let Some(block) = tree::find(&self.blocks, &id) {
                self.index.handle_block_update(path, &block.to_data());
            }
        }
    }

    // ── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.settle_baseline()?;
        self.flush_history()?;
        let snapshot = match self.history.undo() {
            Some(snapshot) => snapshot.to_string(),
            None => return Ok(false),
        };
        self.restore(&snapshot, "undo")?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        self.flush_history()?;
        let snapshot = match self.history.redo() {
            Some(snapshot) => snapshot.to_string(),
            None => return Ok(false),
        };
        self.restore(&snapshot, "redo")?;
        Ok(true)
    }

    /// Apply a pending typing overwrite now.
    pub fn flush_history(&mut self) -> Result<bool, EditorError> {
        Ok(self.history.flush(|| snapshot(&self.blocks))?)
    }

    fn restore(&mut self, snapshot: &str, action_type: &str) -> Result<(), EditorError> {
        let data: Vec<BlockData> = serde_json::from_str(snapshot)?;
        self.history.begin_restore();
        let result = self.rebuild(&data, action_type);
        self.history.end_restore();
        result
    }

    fn rebuild(&mut self, data: &[BlockData], action_type: &str) -> Result<(), EditorError> {
        let (blocks, skipped) = self.registry.build_tree(data);
        if skipped > 0 {
            warn!(skipped, action_type, "snapshot held unknown block types");
        }
        self.blocks = blocks;
        tree::reattach_parents(&mut self.blocks, None);
        self.check_tree(action_type);

        let live: HashSet<BlockId> = tree::document_order(&self.blocks).into_iter().collect();
        self.references.retain_blocks(&live);
        for (block_id, locator) in self.virtual_blocks() {
            let current = self.references.locator(&block_id);
            if !self.references.is_tracked(&block_id) || current != locator.as_ref() {
                self.request_reference_for(&block_id, locator);
            }
        }
        self.sync_reference_index();

        self.events.push(EditorEvent::RenderAll);
        self.emit_change(false, action_type, None)
    }

    // ── Scheduling ──────────────────────────────────────────────────────

    /// Cooperative scheduling point: captures a deferred baseline, fires a
    /// due typing debounce and times out stale reference fetches.
    pub fn tick(&mut self) -> Result<(), EditorError> {
        let now = self.clock.now_ms();
        self.settle_baseline()?;
        self.history.poll(now, || snapshot(&self.blocks))?;
        for block_id in self.references.expire(now) {
            self.events.push(EditorEvent::ReferenceUpdated { block_id });
        }
        Ok(())
    }

    fn settle_baseline(&mut self) -> Result<bool, EditorError> {
        Ok(self.history.settle_baseline(|| snapshot(&self.blocks))?)
    }

    /// Settle the baseline and fold pending typing into its entry, so the
    /// next snapshot stands on its own.
    fn prepare_mutation(&mut self) -> Result<(), EditorError> {
        self.settle_baseline()?;
        self.flush_history()?;
        Ok(())
    }

    // ── Saving ──────────────────────────────────────────────────────────

    /// Reconcile every draft and return the document.
    pub fn blocks_for_saving(&mut self) -> Vec<BlockData> {
        self.blocks.iter_mut().map(Block::data).collect()
    }

    /// Flush pending history, reconcile drafts and mark the document clean.
    pub fn save(&mut self) -> Result<Vec<BlockData>, EditorError> {
        self.flush_history()?;
        let data = self.blocks_for_saving();
        self.dirty = false;
        info!(path = ?self.path, blocks = tree::count(&self.blocks), "page saved");
        Ok(data)
    }

    // ── Focus ───────────────────────────────────────────────────────────

    pub fn focus_block(&mut self, id: &BlockId) -> Result<(), EditorError> {
        self.require(id)?;
        self.events.push(EditorEvent::Focus { block_id: id.clone() });
        Ok(())
    }

    /// Block to focus once `id` is deleted: its previous sibling, else its
    /// parent.
    pub fn focus_target_for_delete(&self, id: &BlockId) -> Option<BlockId> {
        let location = tree::locate(&self.blocks, id)?;
        if location.index > 0 {
            let siblings = match &location.parent {
                Some(parent) => tree::find(&self.blocks, parent)?.children(),
                None => self.blocks.as_slice(),
            };
            return siblings.get(location.index - 1).map(|b| b.id().clone());
        }
        location.parent
    }

    // ── References ──────────────────────────────────────────────────────

    /// Start (or restart) the fetch for a virtual block.
    pub fn request_reference(&mut self, id: &BlockId) -> Result<Option<ReferenceRequest>, EditorError> {
        let block = self.require(id)?;
        if block.role() != TreeRole::Virtual {
            return Err(EditorError::StructureViolation(format!(
                "'{}' does not resolve references",
                block.block_type()
            )));
        }
        let locator = block.variant().reference_locator(block);
        Ok(self.request_reference_for(id, locator))
    }

    /// Apply a host response. Stale responses are dropped.
    pub fn resolve_reference(&mut self, response: ReferenceResponse) -> bool {
        let block_id = response.block_id.clone();
        if self.references.complete(response).is_none() {
            return false;
        }
        self.events.push(EditorEvent::ReferenceUpdated { block_id });
        true
    }

    pub fn reference_state(&self, id: &BlockId) -> Option<&ReferenceState> {
        self.references.state(id)
    }

    pub fn pending_reference_requests(&self) -> Vec<ReferenceRequest> {
        self.references.pending_requests()
    }

    /// File path a locator points at, against the workspace root.
    pub fn resolve_locator_path(&self, locator: &Locator) -> PathBuf {
        locator.resolve(self.config.workspace_root.as_deref())
    }

    /// Refetch every quote showing content from `path`. Returns how many
    /// fetches started.
    pub fn on_page_saved(&mut self, path: &str) -> usize {
        let saved = resolve_path(path, self.config.workspace_root.as_deref());
        let stale: Vec<(BlockId, Locator)> = self
            .virtual_blocks()
            .into_iter()
            .filter_map(|(id, locator)| {
                locator
                    .filter(|l| self.resolve_locator_path(l) == saved)
                    .map(|l| (id, l))
            })
            .collect();

        for (block_id, locator) in &stale {
            self.request_reference_for(block_id, Some(locator.clone()));
        }
        if !stale.is_empty() {
            debug!(path, refreshed = stale.len(), "quotes refreshed after save");
        }
        stale.len()
    }

    fn request_reference_for(&mut self, block_id: &BlockId, locator: Option<Locator>) -> Option<ReferenceRequest> {
        match locator {
            Some(locator) => {
                let request = self.references.begin(block_id, locator, self.clock.now_ms());
                self.events.push(EditorEvent::FetchReference(request.clone()));
                Some(request)
            }
            None => {
                self.references.mark_unset(block_id);
                None
            }
        }
    }

    /// Refetch a virtual block whose locator an edit changed. The new
    /// request supersedes any fetch still in flight.
    fn refresh_reference(&mut self, id: &BlockId, locator_before: Option<Locator>) {
        let (is_virtual, locator_after) = match tree::find(&self.blocks, id) {
            Some(block) => (
                block.role() == TreeRole::Virtual,
                block.variant().reference_locator(block),
            ),
            None => return,
        };
        if is_virtual && locator_before != locator_after {
            self.request_reference_for(id, locator_after);
        }
    }

    fn virtual_blocks(&self) -> Vec<(BlockId, Option<Locator>)> {
        let mut found = Vec::new();
        tree::walk(&self.blocks, &mut |block| {
            if block.role() == TreeRole::Virtual {
                found.push((block.id().clone(), block.variant().reference_locator(block)));
            }
        });
        found
    }

    fn sync_reference_index(&self) {
        if let Some(path) = &self.path {
            self.index.handle_history_change(path, &self.serialize_document());
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn require(&self, id: &BlockId) -> Result<&Block, EditorError> {
        tree::find(&self.blocks, id).ok_or_else(|| EditorError::BlockNotFound(id.clone()))
    }

    fn require_location(&self, id: &BlockId) -> Result<BlockLocation, EditorError> {
        tree::locate(&self.blocks, id).ok_or_else(|| EditorError::BlockNotFound(id.clone()))
    }

    /// Rows and cells are only removed by their table. Blocks inside a
    /// cell detach like any other.
    fn check_detachable(&self, id: &BlockId, location: &BlockLocation) -> Result<(), EditorError> {
        let parent = match &location.parent {
            Some(parent_id) => self.require(parent_id)?,
            None => return Ok(()),
        };
        if parent.role() == TreeRole::Table {
            warn!(block = %id, parent = %parent.id(), "refusing to detach part of a table grid");
            return Err(EditorError::StructureViolation(format!(
                "'{}' is part of a table grid",
                id
            )));
        }
        Ok(())
    }

    /// The `columns` block a column sits in.
    fn layout_of_column(&self, column_id: &BlockId) -> Result<BlockId, EditorError> {
        let location = self.require_location(column_id)?;
        location
            .parent
            .filter(|p| {
                tree::find(&self.blocks, p).map(|b| b.block_type() == COLUMNS).unwrap_or(false)
            })
            .ok_or_else(|| {
                EditorError::InvalidMove(format!("column '{}' is outside a layout", column_id))
            })
    }

    fn check_insertable(&self, location: &BlockLocation) -> Result<(), EditorError> {
        if let Some(parent_id) = &location.parent {
            let parent = self.require(parent_id)?;
            if !parent.variant().accepts_free_children() {
                return Err(EditorError::StructureViolation(format!(
                    "'{}' does not accept new children",
                    parent.block_type()
                )));
            }
        }
        Ok(())
    }

    fn check_accepts_siblings(&self, location: &BlockLocation) -> Result<(), EditorError> {
        if let Some(parent_id) = &location.parent {
            let parent = self.require(parent_id)?;
            if !parent.variant().accepts_free_children() {
                return Err(EditorError::InvalidMove(format!(
                    "'{}' does not accept dropped blocks",
                    parent.block_type()
                )));
            }
        }
        Ok(())
    }

    /// Remove a subtree and release what it held outside the tree.
    fn detach(&mut self, id: &BlockId) -> Option<Block> {
        let mut removed = tree::remove(&mut self.blocks, id)?;
        removed.reconcile();
        for sub_id in tree::subtree_ids(&removed) {
            self.references.forget(&sub_id);
            if let Some(path) = &self.path {
                self.index.handle_block_deletion(path, &sub_id);
            }
        }
        Some(removed)
    }

    fn clean_up_structure(&mut self) {
        if normalize_column_layouts(&mut self.blocks) {
            tree::reattach_parents(&mut self.blocks, None);
        }
    }

    fn check_tree(&self, context: &str) {
        let result = TreeValidator::validate(&self.blocks);
        for error in &result.errors {
            warn!(context, block = ?error.block_id, "{}", error.message);
        }
        for warning in &result.warnings {
            debug!(context, block = ?warning.block_id, "{}", warning.message);
        }
    }
}

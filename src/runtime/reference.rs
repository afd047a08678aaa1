//! Reference resolution for virtual blocks
//!
//! Three pieces:
//!
//! - `ReferenceResolver`: per-editor table of fetches, keyed by the block
//!   that issued them. Every fetch gets a fresh request id; a response is
//!   applied only if it matches the block's current request, so superseded,
//!   cancelled and late responses are dropped. Fetches past their deadline
//!   turn into `ReferenceState::TimedOut`.
//! - `ContentSource` / `ReferenceDriver`: async seam through which a host
//!   actually loads referenced content, bounded by `tokio::time::timeout`.
//! - `ReferenceIndex`: process-scoped registry of blocks pinned from other
//!   documents, shared between editors and reconciled whenever a document
//!   is reloaded or restored from history.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::categories::reference::Locator;
use crate::core::{BlockData, BlockId};

use super::editor::Editor;

// ── Wire types ──────────────────────────────────────────────────────────────

/// Fetch request sent to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRequest {
    pub request_id: u64,
    pub block_id: BlockId,
    pub locator: Locator,
}

/// Host reply, correlated by `block_id` and `request_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceResponse {
    pub request_id: u64,
    pub block_id: BlockId,
    pub result: FetchResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchResult {
    Found(Vec<BlockData>),
    Failed(String),
    TimedOut,
}

/// Display state of a virtual block
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceState {
    /// No locator set
    Unset,
    Loading,
    Loaded(Vec<BlockData>),
    /// The locator resolved to nothing
    Empty,
    /// The host could not find or read the target
    NotFound(String),
    TimedOut,
}

impl ReferenceState {
    /// Message shown in place of content, for the failure states.
    pub fn message(&self) -> Option<String> {
        match self {
            ReferenceState::Empty => Some("Referenced content could not be found".into()),
            ReferenceState::NotFound(e) => Some(format!("Failed to load reference: {}", e)),
            ReferenceState::TimedOut => Some("Loading the reference timed out".into()),
            _ => None,
        }
    }
}

// ── Resolver ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct ReferenceEntry {
    locator: Option<Locator>,
    request_id: Option<u64>,
    deadline_ms: Option<u64>,
    state: ReferenceState,
}

pub struct ReferenceResolver {
    entries: HashMap<BlockId, ReferenceEntry>,
    next_request_id: u64,
    timeout_ms: u64,
}

impl ReferenceResolver {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            next_request_id: 1,
            timeout_ms,
        }
    }

    /// Start a fetch, superseding any in flight for the same block.
    pub fn begin(&mut self, block_id: &BlockId, locator: Locator, now_ms: u64) -> ReferenceRequest {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        self.entries.insert(
            block_id.clone(),
            ReferenceEntry {
                locator: Some(locator.clone()),
                request_id: Some(request_id),
                deadline_ms: Some(now_ms.saturating_add(self.timeout_ms)),
                state: ReferenceState::Loading,
            },
        );

        ReferenceRequest {
            request_id,
            block_id: block_id.clone(),
            locator,
        }
    }

    /// Record that a block has no locator.
    pub fn mark_unset(&mut self, block_id: &BlockId) {
        self.entries.insert(
            block_id.clone(),
            ReferenceEntry {
                locator: None,
                request_id: None,
                deadline_ms: None,
                state: ReferenceState::Unset,
            },
        );
    }

    /// Apply a response. Returns the new state, or `None` when the
    /// response is stale and was dropped.
    pub fn complete(&mut self, response: ReferenceResponse) -> Option<&ReferenceState> {
        let entry = match self.entries.get_mut(&response.block_id) {
            Some(entry) => entry,
            None => {
                debug!(block = %response.block_id, "response for unknown block dropped");
                return None;
            }
        };

        if entry.request_id != Some(response.request_id) {
            debug!(
                block = %response.block_id,
                request_id = response.request_id,
                "stale reference response dropped"
            );
            return None;
        }

        entry.request_id = None;
        entry.deadline_ms = None;
        entry.state = match response.result {
            FetchResult::Found(blocks) if blocks.is_empty() => ReferenceState::Empty,
            FetchResult::Found(blocks) => ReferenceState::Loaded(blocks),
            FetchResult::Failed(error) => ReferenceState::NotFound(error),
            FetchResult::TimedOut => ReferenceState::TimedOut,
        };
        Some(&entry.state)
    }

    /// Expire fetches whose deadline passed. Returns the affected blocks.
    pub fn expire(&mut self, now_ms: u64) -> Vec<BlockId> {
        let mut expired = Vec::new();
        for (block_id, entry) in self.entries.iter_mut() {
            if entry.deadline_ms.map_or(false, |deadline| now_ms >= deadline) {
                warn!(block = %block_id, request_id = ?entry.request_id, "reference fetch timed out");
                entry.request_id = None;
                entry.deadline_ms = None;
                entry.state = ReferenceState::TimedOut;
                expired.push(block_id.clone());
            }
        }
        expired
    }

    /// Drop a block's entry; an in-flight response will be ignored.
    pub fn forget(&mut self, block_id: &BlockId) -> bool {
        self.entries.remove(block_id).is_some()
    }

    /// Keep only entries for blocks in `live`.
    pub fn retain_blocks(&mut self, live: &HashSet<BlockId>) {
        self.entries.retain(|id, _| live.contains(id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn state(&self, block_id: &BlockId) -> Option<&ReferenceState> {
        self.entries.get(block_id).map(|e| &e.state)
    }

    /// Locator of the block's current entry
    pub fn locator(&self, block_id: &BlockId) -> Option<&Locator> {
        self.entries.get(block_id).and_then(|e| e.locator.as_ref())
    }

    pub fn is_tracked(&self, block_id: &BlockId) -> bool {
        self.entries.contains_key(block_id)
    }

    /// Requests still awaiting a response
    pub fn pending_requests(&self) -> Vec<ReferenceRequest> {
        let mut pending: Vec<ReferenceRequest> = self
            .entries
            .iter()
            .filter_map(|(block_id, entry)| match (&entry.locator, entry.request_id) {
                (Some(locator), Some(request_id)) => Some(ReferenceRequest {
                    request_id,
                    block_id: block_id.clone(),
                    locator: locator.clone(),
                }),
                _ => None,
            })
            .collect();
        pending.sort_by_key(|r| r.request_id);
        pending
    }
}

// ── Async content source ────────────────────────────────────────────────────

/// Loads the blocks a locator points at.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, locator: &Locator) -> anyhow::Result<Vec<BlockData>>;
}

/// Resolves requests against a `ContentSource` with a timeout.
pub struct ReferenceDriver<S> {
    source: S,
    timeout: Duration,
}

impl<S: ContentSource> ReferenceDriver<S> {
    pub fn new(source: S, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub async fn resolve(&self, request: &ReferenceRequest) -> ReferenceResponse {
        let result = match tokio::time::timeout(self.timeout, self.source.fetch(&request.locator)).await {
            Ok(Ok(blocks)) => FetchResult::Found(select_target(blocks, &request.locator)),
            Ok(Err(e)) => {
                warn!(locator = %request.locator, error = %e, "reference fetch failed");
                FetchResult::Failed(e.to_string())
            }
            Err(_) => FetchResult::TimedOut,
        };

        ReferenceResponse {
            request_id: request.request_id,
            block_id: request.block_id.clone(),
            result,
        }
    }

    /// Resolve every request in order.
    pub async fn resolve_all(&self, requests: &[ReferenceRequest]) -> Vec<ReferenceResponse> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(self.resolve(request).await);
        }
        responses
    }

    /// Resolve every fetch the editor is waiting on and hand the results
    /// back. Returns how many responses were applied.
    pub async fn pump(&self, editor: &mut Editor) -> usize {
        let requests = editor.pending_reference_requests();
        let mut applied = 0;
        for response in self.resolve_all(&requests).await {
            if editor.resolve_reference(response) {
                applied += 1;
            }
        }
        applied
    }
}

/// Narrow a fetched page to the sub-element the locator names.
fn select_target(blocks: Vec<BlockData>, locator: &Locator) -> Vec<BlockData> {
    let target = match &locator.sub_element {
        Some(target) => target,
        None => return blocks,
    };

    let mut found = None;
    for block in &blocks {
        block.walk(&mut |b| {
            if found.is_none() && b.id.as_ref() == Some(target) {
                found = Some(b.clone());
            }
        });
    }
    found.into_iter().collect()
}

// ── Cross-document index ────────────────────────────────────────────────────

/// A block from `file_path` pinned for display elsewhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedReference {
    pub file_path: String,
    pub block: BlockData,
}

impl PinnedReference {
    fn block_id(&self) -> Option<&BlockId> {
        self.block.id.as_ref()
    }
}

/// Process-scoped pinned references; clones share one list.
#[derive(Clone, Default)]
pub struct ReferenceIndex {
    inner: Arc<RwLock<Vec<PinnedReference>>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a block, replacing an existing pin of the same block.
    pub fn add(&self, file_path: &str, block: BlockData) {
        let mut refs = self.inner.write();
        let existing = refs
            .iter_mut()
            .find(|r| r.file_path == file_path && r.block_id().is_some() && r.block.id == block.id);
        match existing {
            Some(pinned) => pinned.block = block,
            None => refs.push(PinnedReference {
                file_path: file_path.to_string(),
                block,
            }),
        }
    }

    pub fn remove(&self, file_path: &str, block_id: &BlockId) -> bool {
        let mut refs = self.inner.write();
        let before = refs.len();
        refs.retain(|r| !(r.file_path == file_path && r.block_id() == Some(block_id)));
        refs.len() != before
    }

    /// Refresh the pinned copy of an edited block.
    pub fn handle_block_update(&self, file_path: &str, block: &BlockData) -> bool {
        let mut refs = self.inner.write();
        let mut updated = false;
        for pinned in refs.iter_mut() {
            if pinned.file_path == file_path && pinned.block_id().is_some() && pinned.block.id == block.id {
                pinned.block = block.clone();
                updated = true;
            }
        }
        updated
    }

    pub fn handle_block_deletion(&self, file_path: &str, block_id: &BlockId) -> bool {
        self.remove(file_path, block_id)
    }

    /// Reconcile every pin of `file_path` against a rebuilt document: pins
    /// whose block still exists get its current data, the rest are dropped.
    pub fn handle_history_change(&self, file_path: &str, all_blocks: &[BlockData]) {
        let mut by_id: HashMap<&BlockId, &BlockData> = HashMap::new();
        for block in all_blocks {
            block.walk(&mut |b| {
                if let Some(id) = &b.id {
                    by_id.insert(id, b);
                }
            });
        }

        let mut refs = self.inner.write();
        let before = refs.len();
        refs.retain_mut(|pinned| {
            if pinned.file_path != file_path {
                return true;
            }
            match pinned.block_id().and_then(|id| by_id.get(id)) {
                Some(current) => {
                    pinned.block = (*current).clone();
                    true
                }
                None => false,
            }
        });
        if refs.len() != before {
            debug!(file_path, dropped = before - refs.len(), "stale pinned references dropped");
        }
    }

    pub fn has_references_for(&self, file_path: &str) -> bool {
        self.inner.read().iter().any(|r| r.file_path == file_path)
    }

    pub fn references_for(&self, file_path: &str) -> Vec<PinnedReference> {
        self.inner
            .read()
            .iter()
            .filter(|r| r.file_path == file_path)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<PinnedReference> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(request: &ReferenceRequest, blocks: Vec<BlockData>) -> ReferenceResponse {
        ReferenceResponse {
            request_id: request.request_id,
            block_id: request.block_id.clone(),
            result: FetchResult::Found(blocks),
        }
    }

    #[test]
    fn test_superseded_response_is_dropped() {
        let mut resolver = ReferenceResolver::new(5_000);
        let id = BlockId::from("q");
        let first = resolver.begin(&id, Locator::new("a.json"), 0);
        let second = resolver.begin(&id, Locator::new("b.json"), 10);

        assert!(resolver.complete(found(&first, vec![BlockData::new("paragraph")])).is_none());
        assert_eq!(resolver.state(&id), Some(&ReferenceState::Loading));

        let state = resolver.complete(found(&second, vec![])).cloned();
        assert_eq!(state, Some(ReferenceState::Empty));
    }

    #[test]
    fn test_forgotten_block_ignores_response() {
        let mut resolver = ReferenceResolver::new(5_000);
        let id = BlockId::from("q");
        let request = resolver.begin(&id, Locator::new("a.json"), 0);
        assert!(resolver.forget(&id));
        assert!(resolver.complete(found(&request, vec![])).is_none());
    }

    #[test]
    fn test_expire_turns_into_timeout() {
        let mut resolver = ReferenceResolver::new(100);
        let id = BlockId::from("q");
        let request = resolver.begin(&id, Locator::new("a.json"), 0);

        assert!(resolver.expire(99).is_empty());
        assert_eq!(resolver.expire(100), vec![id.clone()]);
        assert_eq!(resolver.state(&id), Some(&ReferenceState::TimedOut));

        // A late answer after the timeout is stale.
        assert!(resolver.complete(found(&request, vec![])).is_none());
        assert!(resolver.pending_requests().is_empty());
    }

    #[test]
    fn test_failure_message() {
        assert_eq!(
            ReferenceState::Empty.message().as_deref(),
            Some("Referenced content could not be found")
        );
        assert!(ReferenceState::Loading.message().is_none());
    }

    #[test]
    fn test_select_target_finds_nested_block() {
        let page = vec![BlockData::new("container").with_id("c").with_children(vec![
            BlockData::new("paragraph").with_id("p").with_content("hit"),
        ])];
        let picked = select_target(page.clone(), &Locator::new("x").with_sub_element("p"));
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].content, "hit");

        assert!(select_target(page.clone(), &Locator::new("x").with_sub_element("zz")).is_empty());
        assert_eq!(select_target(page, &Locator::new("x")).len(), 1);
    }

    #[test]
    fn test_index_history_change_prunes_and_refreshes() {
        let index = ReferenceIndex::new();
        index.add("a.json", BlockData::new("paragraph").with_id("keep").with_content("old"));
        index.add("a.json", BlockData::new("paragraph").with_id("gone"));
        index.add("b.json", BlockData::new("paragraph").with_id("gone"));

        let doc = vec![BlockData::new("container").with_children(vec![
            BlockData::new("paragraph").with_id("keep").with_content("new"),
        ])];
        index.handle_history_change("a.json", &doc);

        let pins = index.references_for("a.json");
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].block.content, "new");
        assert_eq!(index.references_for("b.json").len(), 1);
    }

    #[test]
    fn test_index_add_replaces_same_block() {
        let index = ReferenceIndex::new();
        index.add("a.json", BlockData::new("paragraph").with_id("p").with_content("1"));
        index.add("a.json", BlockData::new("paragraph").with_id("p").with_content("2"));
        assert_eq!(index.len(), 1);
        assert!(index.handle_block_deletion("a.json", &"p".into()));
        assert!(index.is_empty());
    }
}

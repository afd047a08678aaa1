//! Block node and variant trait
//!
//! A `Block` is one node of the document tree: identity, type tag, inline
//! payload, open property map and owned children. Type-specific behaviour
//! (defaults, key handling, toolbar, actions, serialization overrides) lives
//! behind the `BlockVariant` trait object that the registry attaches when
//! the block is constructed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::parameter::{base_schema, PropertyField};
use super::registry::BlockRegistry;
use super::{BlockData, BlockId, Properties};
use crate::categories::reference::Locator;
use crate::categories::BlockCategory;

/// Property every block carries; defaults to an empty list.
pub const CUSTOM_CSS: &str = "customCSS";

/// Variant behaviour selected by the registry
pub trait BlockVariant: Send + Sync {
    /// Static metadata shown in the block picker
    fn metadata(&self) -> &BlockMetadata;

    /// Structural role in the tree
    fn role(&self) -> TreeRole {
        TreeRole::Leaf
    }

    /// Whether arbitrary blocks may be inserted or moved among this
    /// block's children. Grid and layout parents own their child shape.
    fn accepts_free_children(&self) -> bool {
        !matches!(self.role(), TreeRole::Table | TreeRole::Virtual)
    }

    /// Whether blocks may be dropped inside this one as its last child
    fn accepts_dropped_children(&self) -> bool {
        matches!(self.role(), TreeRole::Container | TreeRole::ListItem)
            && self.accepts_free_children()
    }

    /// Editable properties, variant-specific first
    fn properties_schema(&self) -> Vec<PropertyField> {
        base_schema()
    }

    /// Fill in variant-required defaults missing from the loaded data.
    fn initialize(&self, _block: &mut Block, _registry: &BlockRegistry) {}

    /// Toolbar entries, most specific first and the generic ones last
    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        vec![ToolbarAction::SHOW_DETAILS]
    }

    /// Record inserted after this block when Enter is pressed on it.
    fn next_block_template(&self, _block: &Block) -> BlockData {
        BlockData::new("paragraph")
    }

    fn handle_key_input(&self, block: &Block, key: &KeyInput) -> KeyOutcome {
        match key.key {
            Key::Enter if !key.has_modifier() => {
                KeyOutcome::InsertAfter(self.next_block_template(block))
            }
            Key::Char('/') => KeyOutcome::OpenCommandMenu,
            _ => KeyOutcome::Ignored,
        }
    }

    /// Apply a toolbar or inline action to the block.
    ///
    /// Structural changes that would break the variant's own invariants
    /// return `ActionOutcome::Refused` and leave the block untouched.
    fn handle_action(
        &self,
        _block: &mut Block,
        action: &ActionRequest,
        _registry: &BlockRegistry,
    ) -> Result<ActionOutcome, BlockError> {
        match action.id.as_str() {
            "showDetails" => Ok(ActionOutcome::Delegated),
            other => Err(BlockError::UnknownAction(other.to_string())),
        }
    }

    /// Serialized form of the block
    fn serialize(&self, block: &Block) -> BlockData {
        block.default_data()
    }

    /// Properties only the variant's own actions may write
    fn managed_properties(&self) -> &'static [&'static str] {
        &[]
    }

    /// Address of externally-resolved content, for virtual blocks
    fn reference_locator(&self, _block: &Block) -> Option<Locator> {
        None
    }

    /// Registry-time sanity check of the variant itself
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Static metadata of a block type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// Type tag stored in `BlockData::block_type`
    pub block_type: String,
    /// Human-readable name
    pub label: String,
    /// Icon identifier
    pub icon: String,
    /// Brief description
    pub description: String,
    /// Extra search terms for the picker
    pub keywords: Vec<String>,
    /// Picker grouping
    pub category: BlockCategory,
    /// Whether the block picker offers this type
    pub in_picker: bool,
}

impl BlockMetadata {
    pub fn new(block_type: &str, label: &str, icon: &str, category: BlockCategory) -> Self {
        Self {
            block_type: block_type.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            description: String::new(),
            keywords: Vec::new(),
            category,
            in_picker: true,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.in_picker = false;
        self
    }
}

/// Structural role of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeRole {
    /// Inline payload; children are kept but not expected
    Leaf,
    /// Structural container of arbitrary blocks
    Container,
    /// List item that may nest further blocks
    ListItem,
    /// Content comes from outside the tree; never owns children
    Virtual,
    /// Part of a table grid; shape is owned by the table
    Table,
}

/// Toolbar entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolbarAction {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

impl ToolbarAction {
    pub const SHOW_DETAILS: ToolbarAction = ToolbarAction::new("showDetails", "Details", "info");

    pub const fn new(id: &'static str, label: &'static str, icon: &'static str) -> Self {
        Self { id, label, icon }
    }
}

/// Key pressed inside a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Delete,
    Char(char),
    Other,
}

/// Keyboard event reported by the rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            shift: false,
            ctrl: false,
            alt: false,
            meta: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn has_modifier(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// What the engine should do in response to a key
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// Insert this record right after the block and focus it
    InsertAfter(BlockData),
    /// Delete the block and focus its previous sibling, else its parent
    DeleteSelf,
    /// Line break inside the block, handled by the surface
    SoftBreak,
    /// Open the block command menu
    OpenCommandMenu,
    Ignored,
}

/// Toolbar or inline action invoked on a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub id: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl ActionRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Index argument: a bare number or `{"index": n}`.
    pub fn index(&self) -> Option<usize> {
        self.arg("index")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
    }

    /// Named argument, or the bare value when it is not an object.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        match &self.value {
            Some(Value::Object(map)) => map.get(name),
            Some(other) => Some(other),
            None => None,
        }
    }
}

/// Result of a variant action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The block changed; notify with this action type
    Changed { action_type: String },
    /// A structural floor was hit; nothing changed
    Refused,
    /// Handled entirely by the rendering surface
    Delegated,
}

impl ActionOutcome {
    pub fn changed(action_type: &str) -> Self {
        ActionOutcome::Changed {
            action_type: action_type.to_string(),
        }
    }
}

/// A node of the document tree
#[derive(Clone)]
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) block_type: String,
    pub(crate) content: String,
    pub(crate) properties: Properties,
    pub(crate) children: Vec<Block>,
    pub(crate) parent: Option<BlockId>,
    /// Text held by the rendering surface and not yet folded into `content`
    pub(crate) draft: Option<String>,
    pub(crate) variant: Arc<dyn BlockVariant>,
}

impl Block {
    /// Assemble a node from a record and a resolved variant. Children are
    /// attached by the registry.
    pub(crate) fn assemble(data: &BlockData, variant: Arc<dyn BlockVariant>) -> Self {
        let mut properties = data.properties.clone();
        properties
            .entry(CUSTOM_CSS)
            .or_insert_with(|| Value::Array(Vec::new()));

        Self {
            id: data.id.clone().unwrap_or_default(),
            block_type: data.block_type.clone(),
            content: data.content.clone(),
            properties,
            children: Vec::new(),
            parent: None,
            draft: None,
            variant,
        }
    }

    /// Build a block and its subtree through the registry. `None` when the
    /// type is not registered.
    pub fn from_data(data: &BlockData, registry: &BlockRegistry) -> Option<Block> {
        registry.create_block_instance(data)
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    /// Stored content, ignoring any pending draft
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content as the user currently sees it
    pub fn effective_content(&self) -> &str {
        self.draft.as_deref().unwrap_or(&self.content)
    }

    /// Empty as far as deletion on Backspace is concerned
    pub fn is_content_empty(&self) -> bool {
        let content = self.effective_content().trim();
        content.is_empty() || content == "<br>"
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.draft = None;
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = Some(text.into());
    }

    /// Fold the draft into `content`, for this block and its subtree.
    pub fn reconcile(&mut self) {
        if let Some(draft) = self.draft.take() {
            self.content = draft;
        }
        for child in &mut self.children {
            child.reconcile();
        }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    /// Insert `value` only when the key is absent.
    pub fn default_property(&mut self, key: &str, value: impl Into<Value>) {
        if !self.properties.contains_key(key) {
            self.properties.insert(key.to_string(), value.into());
        }
    }

    pub fn children(&self) -> &[Block] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Block> {
        &mut self.children
    }

    /// Append a child and point its parent link here
    pub fn push_child(&mut self, mut child: Block) {
        child.parent = Some(self.id.clone());
        self.children.push(child);
    }

    pub fn parent(&self) -> Option<&BlockId> {
        self.parent.as_ref()
    }

    pub fn variant(&self) -> &Arc<dyn BlockVariant> {
        &self.variant
    }

    pub fn metadata(&self) -> &BlockMetadata {
        self.variant.metadata()
    }

    pub fn role(&self) -> TreeRole {
        self.variant.role()
    }

    pub fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        self.variant.toolbar_actions()
    }

    pub fn properties_schema(&self) -> Vec<PropertyField> {
        self.variant.properties_schema()
    }

    /// Serialized record of this block and its subtree.
    ///
    /// Pure: pending drafts are projected into `content` without being
    /// consumed.
    pub fn to_data(&self) -> BlockData {
        self.variant.serialize(self)
    }

    /// Reconcile drafts, then serialize.
    pub fn data(&mut self) -> BlockData {
        self.reconcile();
        self.to_data()
    }

    /// Record built from the node's own fields; variants without a
    /// serialization override use this.
    pub fn default_data(&self) -> BlockData {
        BlockData {
            id: Some(self.id.clone()),
            block_type: self.block_type.clone(),
            content: self.effective_content().to_string(),
            properties: self.properties.clone(),
            children: self.children.iter().map(Block::to_data).collect(),
        }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("type", &self.block_type)
            .field("content", &self.content)
            .field("properties", &self.properties)
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("draft", &self.draft)
            .finish()
    }
}

/// Block errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockError {
    /// The variant does not know this action
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// An action argument was missing or malformed
    #[error("Invalid argument for {action}: {reason}")]
    InvalidArgument { action: String, reason: String },

    /// A property value failed the schema check
    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    /// The block is missing a type this operation needs
    #[error("Block type not registered: {0}")]
    MissingType(String),
}

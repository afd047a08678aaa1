//! Numbered list item
//!
//! Each item stores its own `number`. Enter continues the count; the
//! `setStartNumber` action renumbers the item it is invoked on.

use serde_json::Value;

use crate::categories::text::{handle_text_action, text_key_input, text_toolbar};
use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockData, BlockError, BlockMetadata, BlockVariant,
    KeyInput, KeyOutcome, ToolbarAction, TreeRole,
};

use super::marker_fields;

pub const NUMBERED_LIST_ITEM: &str = "numberedListItem";

const SET_START_NUMBER: ToolbarAction =
    ToolbarAction::new("setStartNumber", "Start Number", "hash");

pub struct NumberedListItemBlock {
    metadata: BlockMetadata,
}

impl NumberedListItemBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(NUMBERED_LIST_ITEM, "Numbered List", "list-ordered", BlockCategory::List)
                .with_description("Create a list with numbering")
                .with_keywords(&["number", "ordered", "ol", "list"]),
        }
    }

    /// The item's number, 1 when missing or malformed.
    pub fn number(block: &Block) -> u64 {
        block
            .property("number")
            .and_then(Value::as_u64)
            .filter(|n| *n >= 1)
            .unwrap_or(1)
    }
}

impl Default for NumberedListItemBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for NumberedListItemBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::ListItem
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(marker_fields(&[
            "decimal",
            "lower-alpha",
            "upper-alpha",
            "lower-roman",
            "upper-roman",
        ]))
    }

    fn initialize(&self, block: &mut Block, _registry: &BlockRegistry) {
        block.default_property("number", 1);
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        text_toolbar(&[SET_START_NUMBER])
    }

    fn next_block_template(&self, block: &Block) -> BlockData {
        BlockData::new(NUMBERED_LIST_ITEM).with_property("number", Self::number(block) + 1)
    }

    fn handle_key_input(&self, block: &Block, key: &KeyInput) -> KeyOutcome {
        text_key_input(block, key, self.next_block_template(block))
    }

    fn handle_action(
        &self,
        block: &mut Block,
        action: &ActionRequest,
        _registry: &BlockRegistry,
    ) -> Result<ActionOutcome, BlockError> {
        if action.id != SET_START_NUMBER.id {
            return handle_text_action(action);
        }

        let number = action
            .arg("number")
            .and_then(Value::as_u64)
            .filter(|n| *n >= 1)
            .ok_or_else(|| BlockError::InvalidArgument {
                action: action.id.clone(),
                reason: "expected a positive integer".into(),
            })?;

        block.set_property("number", number);
        Ok(ActionOutcome::changed("set-start-number"))
    }
}

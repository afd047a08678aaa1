//! Bulleted list item

use crate::categories::text::{handle_text_action, text_key_input, text_toolbar};
use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockData, BlockError, BlockMetadata, BlockVariant, Key,
    KeyInput, KeyOutcome, ToolbarAction, TreeRole,
};

use super::marker_fields;

pub const BULLETED_LIST_ITEM: &str = "bulletedListItem";

pub struct BulletedListItemBlock {
    metadata: BlockMetadata,
}

impl BulletedListItemBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(BULLETED_LIST_ITEM, "Bulleted List", "list", BlockCategory::List)
                .with_description("Create a simple bulleted list")
                .with_keywords(&["bullet", "unordered", "ul", "list"]),
        }
    }
}

impl Default for BulletedListItemBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for BulletedListItemBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::ListItem
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(marker_fields(&["disc", "circle", "square"]))
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        text_toolbar(&[])
    }

    fn next_block_template(&self, _block: &Block) -> BlockData {
        BlockData::new(BULLETED_LIST_ITEM)
    }

    fn handle_key_input(&self, block: &Block, key: &KeyInput) -> KeyOutcome {
        // Shift+Enter does nothing inside a bullet.
        if key.key == Key::Enter && key.shift {
            return KeyOutcome::Ignored;
        }
        text_key_input(block, key, self.next_block_template(block))
    }

    fn handle_action(
        &self,
        _block: &mut Block,
        action: &ActionRequest,
        _registry: &BlockRegistry,
    ) -> Result<ActionOutcome, BlockError> {
        handle_text_action(action)
    }
}

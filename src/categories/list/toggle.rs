//! Toggle list item
//!
//! A collapsible item whose nested children are hidden while
//! `isCollapsed` is set. Collapsing is stored state, so it is undoable.

use serde_json::Value;

use crate::categories::text::{handle_text_action, text_key_input, text_toolbar};
use crate::categories::BlockCategory;
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockData, BlockError, BlockMetadata, BlockVariant,
    KeyInput, KeyOutcome, ToolbarAction, TreeRole,
};

pub const TOGGLE_LIST_ITEM: &str = "toggleListItem";

pub struct ToggleListItemBlock {
    metadata: BlockMetadata,
}

impl ToggleListItemBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(TOGGLE_LIST_ITEM, "Toggle List", "chevron-right", BlockCategory::List)
                .with_description("Hide nested content behind a toggle")
                .with_keywords(&["toggle", "collapse", "expand", "details"]),
        }
    }

    pub fn is_collapsed(block: &Block) -> bool {
        block
            .property("isCollapsed")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl Default for ToggleListItemBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for ToggleListItemBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::ListItem
    }

    fn initialize(&self, block: &mut Block, _registry: &BlockRegistry) {
        block.default_property("isCollapsed", false);
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        text_toolbar(&[])
    }

    fn next_block_template(&self, _block: &Block) -> BlockData {
        BlockData::new(TOGGLE_LIST_ITEM).with_property("isCollapsed", false)
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
        match action.id.as_str() {
            "toggleCollapse" => {
                let collapsed = !Self::is_collapsed(block);
                block.set_property("isCollapsed", collapsed);
                Ok(ActionOutcome::changed("toggle-collapse"))
            }
            _ => handle_text_action(action),
        }
    }
}

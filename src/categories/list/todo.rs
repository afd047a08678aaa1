//! Todo list item

use serde_json::Value;

use crate::categories::text::{handle_text_action, text_key_input, text_toolbar};
use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockData, BlockError, BlockMetadata, BlockVariant,
    KeyInput, KeyOutcome, ToolbarAction, TreeRole,
};

pub const TODO_LIST_ITEM: &str = "todoListItem";

pub struct TodoListItemBlock {
    metadata: BlockMetadata,
}

impl TodoListItemBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(TODO_LIST_ITEM, "To-do List", "check-square", BlockCategory::List)
                .with_description("Track tasks with a to-do list")
                .with_keywords(&["todo", "task", "checkbox", "check"]),
        }
    }

    pub fn is_checked(block: &Block) -> bool {
        block
            .property("checked")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl Default for TodoListItemBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for TodoListItemBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::ListItem
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(vec![PropertyField::color("checkedColor", "Checked Text Color")])
    }

    fn initialize(&self, block: &mut Block, _registry: &BlockRegistry) {
        block.default_property("checked", false);
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        text_toolbar(&[])
    }

    /// New items always start unchecked and empty.
    fn next_block_template(&self, _block: &Block) -> BlockData {
        BlockData::new(TODO_LIST_ITEM).with_property("checked", false)
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
            "toggleChecked" => {
                let checked = match action.arg("checked").and_then(Value::as_bool) {
                    Some(explicit) => explicit,
                    None => !Self::is_checked(block),
                };
                block.set_property("checked", checked);
                Ok(ActionOutcome::changed("toggle-todo"))
            }
            _ => handle_text_action(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_checked() {
        let registry = BlockRegistry::with_builtin_blocks();
        let mut block = registry
            .create_block_instance(&BlockData::new(TODO_LIST_ITEM))
            .unwrap();
        let variant = block.variant().clone();
        assert!(!TodoListItemBlock::is_checked(&block));

        variant
            .handle_action(&mut block, &ActionRequest::new("toggleChecked"), &registry)
            .unwrap();
        assert!(TodoListItemBlock::is_checked(&block));

        variant
            .handle_action(
                &mut block,
                &ActionRequest::new("toggleChecked").with_value(true),
                &registry,
            )
            .unwrap();
        assert!(TodoListItemBlock::is_checked(&block));
    }
}

//! Callout block: an icon next to a framed group of blocks

use tracing::warn;

use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{Block, BlockData, BlockMetadata, BlockVariant, TreeRole};

pub struct CalloutBlock {
    metadata: BlockMetadata,
}

impl CalloutBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new("callout", "Callout", "message-square", BlockCategory::Layout)
                .with_description("Make writing stand out")
                .with_keywords(&["note", "tip", "warning", "info", "admonition"]),
        }
    }
}

impl Default for CalloutBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for CalloutBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::Container
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(vec![
            PropertyField::text("icon", "Icon").with_placeholder("e.g. 💡"),
            PropertyField::text("iconSize", "Icon Size").with_placeholder("e.g. 1.5em"),
            PropertyField::select("layout", "Layout", &["horizontal", "vertical"]),
        ])
    }

    /// A callout always starts with one paragraph to type into.
    fn initialize(&self, block: &mut Block, registry: &BlockRegistry) {
        block.default_property("icon", "💡");
        if !block.children().is_empty() {
            return;
        }
        match registry.create_block_instance(&BlockData::new("paragraph")) {
            Some(paragraph) => block.push_child(paragraph),
            None => warn!(callout = %block.id(), "paragraph type not registered"),
        }
    }
}

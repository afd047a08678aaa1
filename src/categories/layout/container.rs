//! Generic container block

use crate::categories::BlockCategory;
use crate::core::{BlockMetadata, BlockVariant, TreeRole};

pub struct ContainerBlock {
    metadata: BlockMetadata,
}

impl ContainerBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new("container", "Container", "square", BlockCategory::Layout)
                .with_description("Group blocks and style them together")
                .with_keywords(&["group", "box", "section", "wrapper"]),
        }
    }
}

impl Default for ContainerBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for ContainerBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::Container
    }
}

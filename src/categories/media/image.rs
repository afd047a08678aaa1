//! Image block
//!
//! `src` is the image location and `href` an optional click-through link.
//! Both default to the empty string.

use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockError, BlockMetadata, BlockVariant, ToolbarAction,
};

use super::string_arg;

const SET_SOURCE: ToolbarAction = ToolbarAction::new("setSource", "Image Source", "image");
const SET_LINK: ToolbarAction = ToolbarAction::new("setLink", "Image Link", "link");

pub struct ImageBlock {
    metadata: BlockMetadata,
}

impl ImageBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new("image", "Image", "image", BlockCategory::Media)
                .with_description("Embed an image from a file or URL")
                .with_keywords(&["picture", "photo", "img", "media"]),
        }
    }
}

impl Default for ImageBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for ImageBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(vec![
            PropertyField::text("width", "Width").with_placeholder("e.g. 320px or 50%"),
            PropertyField::select("align", "Alignment", &["left", "center", "right"]),
            PropertyField::text("alt", "Alt Text"),
        ])
    }

    fn initialize(&self, block: &mut Block, _registry: &BlockRegistry) {
        block.default_property("src", "");
        block.default_property("href", "");
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        vec![SET_SOURCE, SET_LINK, ToolbarAction::SHOW_DETAILS]
    }

    fn handle_action(
        &self,
        block: &mut Block,
        action: &ActionRequest,
        _registry: &BlockRegistry,
    ) -> Result<ActionOutcome, BlockError> {
        match action.id.as_str() {
            "setSource" => {
                block.set_property("src", string_arg(action, "src")?);
                Ok(ActionOutcome::changed("set-image-source"))
            }
            "setLink" => {
                block.set_property("href", string_arg(action, "href")?);
                Ok(ActionOutcome::changed("set-image-link"))
            }
            "showDetails" => Ok(ActionOutcome::Delegated),
            other => Err(BlockError::UnknownAction(other.to_string())),
        }
    }
}

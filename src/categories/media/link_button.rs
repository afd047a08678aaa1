//! Link button block: `content` is the label, `url` the target.

use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockError, BlockMetadata, BlockVariant, ToolbarAction,
};

use super::string_arg;

const SET_URL: ToolbarAction = ToolbarAction::new("setUrl", "Link URL", "link");

pub struct LinkButtonBlock {
    metadata: BlockMetadata,
}

impl LinkButtonBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new("linkButton", "Link Button", "external-link", BlockCategory::Media)
                .with_description("A button that opens a link")
                .with_keywords(&["button", "url", "cta"]),
        }
    }
}

impl Default for LinkButtonBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for LinkButtonBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(vec![
            PropertyField::color("textColor", "Text Color"),
            PropertyField::select("align", "Alignment", &["left", "center", "right"]),
        ])
    }

    fn initialize(&self, block: &mut Block, _registry: &BlockRegistry) {
        block.default_property("url", "");
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        vec![SET_URL, ToolbarAction::SHOW_DETAILS]
    }

    fn handle_action(
        &self,
        block: &mut Block,
        action: &ActionRequest,
        _registry: &BlockRegistry,
    ) -> Result<ActionOutcome, BlockError> {
        match action.id.as_str() {
            "setUrl" => {
                block.set_property("url", string_arg(action, "url")?);
                Ok(ActionOutcome::changed("set-link-url"))
            }
            "showDetails" => Ok(ActionOutcome::Delegated),
            other => Err(BlockError::UnknownAction(other.to_string())),
        }
    }
}

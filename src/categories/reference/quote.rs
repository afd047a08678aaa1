//! Quote block
//!
//! Transcludes a block (or a whole page) from another document. The quote
//! stores only where to look:
//!
//! - `referenceLink`: locator string `path#blockId`, or null
//! - `style`: `"default"` (framed, with source) or `"plain"`
//! - `clickLink`: optional locator opened when the quote is clicked
//!
//! It never owns children and serializes with empty content.

use serde_json::Value;

use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockData, BlockError, BlockMetadata, BlockVariant,
    KeyInput, KeyOutcome, ToolbarAction, TreeRole,
};

use super::Locator;

pub const QUOTE: &str = "quote";

pub const STYLE_DEFAULT: &str = "default";
pub const STYLE_PLAIN: &str = "plain";

const QUOTE_ACTIONS: [ToolbarAction; 3] = [
    ToolbarAction::new("setReference", "Set Reference", "link-2"),
    ToolbarAction::new("toggleStyle", "Toggle Style", "quote"),
    ToolbarAction::new("setClickLink", "Click Link", "mouse-pointer"),
];

pub struct QuoteBlock {
    metadata: BlockMetadata,
}

impl QuoteBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(QUOTE, "Quote", "quote", BlockCategory::Reference)
                .with_description("Show a block from another page, kept in sync")
                .with_keywords(&["reference", "transclude", "embed", "sync"]),
        }
    }

    pub fn style(block: &Block) -> &str {
        block
            .property("style")
            .and_then(Value::as_str)
            .unwrap_or(STYLE_DEFAULT)
    }
}

impl Default for QuoteBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Locator argument: a parseable string, or null / "" to clear.
fn locator_arg(action: &ActionRequest, name: &str) -> Result<Value, BlockError> {
    match action.arg(name) {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Value::Null),
        Some(Value::String(s)) => s
            .parse::<Locator>()
            .map(|locator| Value::String(locator.to_string()))
            .map_err(|e| BlockError::InvalidArgument {
                action: action.id.clone(),
                reason: e.to_string(),
            }),
        Some(_) => Err(BlockError::InvalidArgument {
            action: action.id.clone(),
            reason: format!("expected a locator string '{}'", name),
        }),
    }
}

impl BlockVariant for QuoteBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::Virtual
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(vec![PropertyField::color("accentColor", "Accent Color")])
    }

    fn initialize(&self, block: &mut Block, _registry: &BlockRegistry) {
        block.default_property("referenceLink", Value::Null);
        block.default_property("style", STYLE_DEFAULT);
        block.default_property("clickLink", Value::Null);
        block.children_mut().clear();
        block.set_content("");
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        let mut actions = QUOTE_ACTIONS.to_vec();
        actions.push(ToolbarAction::SHOW_DETAILS);
        actions
    }

    fn handle_key_input(&self, _block: &Block, _key: &KeyInput) -> KeyOutcome {
        KeyOutcome::Ignored
    }

    fn handle_action(
        &self,
        block: &mut Block,
        action: &ActionRequest,
        _registry: &BlockRegistry,
    ) -> Result<ActionOutcome, BlockError> {
        match action.id.as_str() {
            "setReference" => {
                block.set_property("referenceLink", locator_arg(action, "referenceLink")?);
                Ok(ActionOutcome::changed("set-quote-reference"))
            }
            "toggleStyle" => {
                let next = if Self::style(block) == STYLE_PLAIN {
                    STYLE_DEFAULT
                } else {
                    STYLE_PLAIN
                };
                block.set_property("style", next);
                Ok(ActionOutcome::changed("toggle-quote-style"))
            }
            "setClickLink" => {
                block.set_property("clickLink", locator_arg(action, "clickLink")?);
                Ok(ActionOutcome::changed("set-quote-click-link"))
            }
            "showDetails" => Ok(ActionOutcome::Delegated),
            other => Err(BlockError::UnknownAction(other.to_string())),
        }
    }

    fn serialize(&self, block: &Block) -> BlockData {
        let mut data = block.default_data();
        data.content.clear();
        data.children.clear();
        data
    }

    fn reference_locator(&self, block: &Block) -> Option<Locator> {
        block
            .property("referenceLink")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

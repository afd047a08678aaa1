//! Code block
//!
//! Holds source text verbatim. Enter stays inside the block, and the
//! language tag is only stored; highlighting is up to the surface.

use serde_json::Value;

use crate::categories::media::string_arg;
use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockError, BlockMetadata, BlockVariant, Key, KeyInput,
    KeyOutcome, ToolbarAction,
};

pub const CODE: &str = "code";
pub const DEFAULT_LANGUAGE: &str = "plaintext";

/// Languages offered by the language picker, sorted.
pub const LANGUAGES: [&str; 32] = [
    "bash", "cpp", "csharp", "css", "diff", "go", "graphql", "ini", "java", "javascript", "json",
    "kotlin", "less", "lua", "makefile", "markdown", "objectivec", "perl", "php", "plaintext",
    "powershell", "python", "r", "ruby", "rust", "scss", "shell", "sql", "swift", "typescript",
    "xml", "yaml",
];

const SET_LANGUAGE: ToolbarAction = ToolbarAction::new("setLanguage", "Language", "code");

pub struct CodeBlock {
    metadata: BlockMetadata,
}

impl CodeBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(CODE, "Code Block", "code", BlockCategory::Text)
                .with_description("Capture code snippets")
                .with_keywords(&["code", "snippet", "pre", "highlight"]),
        }
    }

    pub fn language(block: &Block) -> &str {
        block
            .property("language")
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

impl Default for CodeBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for CodeBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(vec![
            PropertyField::text("language", "Language"),
            PropertyField::text("fontSize", "Font Size").with_placeholder("14px"),
            PropertyField::number("tabSize", "Tab Size").with_placeholder("4"),
            PropertyField::checkbox("wordWrap", "Word Wrap"),
            PropertyField::checkbox("showLineNumbers", "Line Numbers"),
        ])
    }

    fn initialize(&self, block: &mut Block, _registry: &BlockRegistry) {
        let language = Self::language(block).to_string();
        block.set_property("language", language);
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        vec![SET_LANGUAGE, ToolbarAction::SHOW_DETAILS]
    }

    /// Enter is a line of code, and an empty block is only removed
    /// explicitly.
    fn handle_key_input(&self, _block: &Block, key: &KeyInput) -> KeyOutcome {
        match key.key {
            Key::Enter => KeyOutcome::SoftBreak,
            _ => KeyOutcome::Ignored,
        }
    }

    fn handle_action(
        &self,
        block: &mut Block,
        action: &ActionRequest,
        _registry: &BlockRegistry,
    ) -> Result<ActionOutcome, BlockError> {
        match action.id.as_str() {
            "setLanguage" => {
                let language = string_arg(action, "language")?;
                if !LANGUAGES.contains(&language.as_str()) {
                    return Err(BlockError::InvalidArgument {
                        action: action.id.clone(),
                        reason: format!("unsupported language '{}'", language),
                    });
                }
                if Self::language(block) == language {
                    return Ok(ActionOutcome::Refused);
                }
                block.set_property("language", language);
                Ok(ActionOutcome::changed("change-language"))
            }
            "showDetails" => Ok(ActionOutcome::Delegated),
            other => Err(BlockError::UnknownAction(other.to_string())),
        }
    }
}

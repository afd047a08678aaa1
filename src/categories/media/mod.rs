//! Media block implementations

pub mod image;
pub mod link_button;

pub use image::ImageBlock;
pub use link_button::LinkButtonBlock;

use serde_json::Value;

use crate::core::{ActionRequest, BlockError};

/// String argument of a setter action; `null` clears to "".
pub(crate) fn string_arg(action: &ActionRequest, name: &str) -> Result<String, BlockError> {
    match action.arg(name) {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Null) => Ok(String::new()),
        _ => Err(BlockError::InvalidArgument {
            action: action.id.clone(),
            reason: format!("expected a string '{}'", name),
        }),
    }
}

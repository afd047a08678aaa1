//! List item block implementations
//!
//! List items are text-bearing blocks that may nest further blocks. Each
//! kind decides what Enter creates next: bulleted items continue the
//! bullets, numbered items continue the count, todo items start unchecked.

pub mod bulleted;
pub mod numbered;
pub mod todo;
pub mod toggle;

pub use bulleted::BulletedListItemBlock;
pub use numbered::NumberedListItemBlock;
pub use todo::TodoListItemBlock;
pub use toggle::ToggleListItemBlock;

use crate::core::parameter::PropertyField;

/// Marker fields shared by the list kinds that draw a marker.
pub(crate) fn marker_fields(styles: &[&str]) -> Vec<PropertyField> {
    vec![
        PropertyField::select("listStyleType", "Marker Style", styles),
        PropertyField::color("markerColor", "Marker Color"),
    ]
}

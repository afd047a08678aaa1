//! Property schema for block configuration
//!
//! Each variant publishes the editable properties it understands as a list
//! of `PropertyField`s. The list drives the properties panel, value checks
//! on `set_property`, and "reset to defaults", which only removes keys that
//! appear in the schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One editable property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyField {
    /// Key inside `Block::properties`
    pub key: String,
    /// Human-readable label
    pub label: String,
    /// Value kind
    pub field_type: PropertyType,
    /// Allowed values for `Select` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Optional UI hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_hint: Option<PropertyUiHint>,
}

/// Property value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    /// Free text (CSS lengths, shadows, icons)
    Text,
    /// Numeric value, optionally bounded by the UI hint range
    Number,
    /// CSS color
    Color,
    /// One of `options`
    Select,
    /// Boolean flag
    Checkbox,
}

/// UI hints for a property field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyUiHint {
    pub placeholder: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

impl PropertyField {
    fn new(key: &str, label: &str, field_type: PropertyType) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type,
            options: Vec::new(),
            ui_hint: None,
        }
    }

    pub fn text(key: &str, label: &str) -> Self {
        Self::new(key, label, PropertyType::Text)
    }

    pub fn number(key: &str, label: &str) -> Self {
        Self::new(key, label, PropertyType::Number)
    }

    pub fn color(key: &str, label: &str) -> Self {
        Self::new(key, label, PropertyType::Color)
    }

    pub fn checkbox(key: &str, label: &str) -> Self {
        Self::new(key, label, PropertyType::Checkbox)
    }

    pub fn select(key: &str, label: &str, options: &[&str]) -> Self {
        let mut field = Self::new(key, label, PropertyType::Select);
        field.options = options.iter().map(|o| o.to_string()).collect();
        field
    }

    /// Set a placeholder hint
    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.hint_mut().placeholder = Some(placeholder.to_string());
        self
    }

    /// Set a numeric range hint
    pub fn with_range(mut self, min: f64, max: f64, step: f64) -> Self {
        let hint = self.hint_mut();
        hint.min = Some(min);
        hint.max = Some(max);
        hint.step = Some(step);
        self
    }

    fn hint_mut(&mut self) -> &mut PropertyUiHint {
        self.ui_hint.get_or_insert(PropertyUiHint {
            placeholder: None,
            min: None,
            max: None,
            step: None,
        })
    }

    /// Check a candidate value against this field.
    ///
    /// `null` always passes: it clears the property.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }

        match self.field_type {
            PropertyType::Text | PropertyType::Color => {
                if !value.is_string() {
                    return Err(format!("'{}' expects a string", self.key));
                }
            }
            PropertyType::Checkbox => {
                if !value.is_boolean() {
                    return Err(format!("'{}' expects a boolean", self.key));
                }
            }
            PropertyType::Select => {
                let allowed = value
                    .as_str()
                    .map(|s| self.options.iter().any(|o| o == s))
                    .unwrap_or(false);
                if !allowed {
                    return Err(format!(
                        "'{}' must be one of [{}]",
                        self.key,
                        self.options.join(", ")
                    ));
                }
            }
            PropertyType::Number => {
                let number = value
                    .as_f64()
                    .ok_or_else(|| format!("'{}' expects a number", self.key))?;
                if let Some(hint) = &self.ui_hint {
                    if hint.min.map_or(false, |min| number < min)
                        || hint.max.map_or(false, |max| number > max)
                    {
                        return Err(format!("'{}' is out of range: {}", self.key, number));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Generic style fields every block exposes.
pub fn base_schema() -> Vec<PropertyField> {
    vec![
        PropertyField::text("padding", "Padding").with_placeholder("e.g. 8px 12px"),
        PropertyField::text("marginTop", "Margin Top").with_placeholder("e.g. 4px"),
        PropertyField::text("marginBottom", "Margin Bottom").with_placeholder("e.g. 4px"),
        PropertyField::color("backgroundColor", "Background Color"),
        PropertyField::number("opacity", "Opacity").with_range(0.0, 1.0, 0.05),
        PropertyField::text("borderWidth", "Border Width").with_placeholder("e.g. 1px"),
        PropertyField::select(
            "borderStyle",
            "Border Style",
            &["none", "solid", "dashed", "dotted", "double"],
        ),
        PropertyField::color("borderColor", "Border Color"),
        PropertyField::text("borderRadius", "Border Radius").with_placeholder("e.g. 4px"),
        PropertyField::text("boxShadow", "Box Shadow")
            .with_placeholder("e.g. 0 1px 3px rgba(0,0,0,0.2)"),
    ]
}

/// Variant-specific fields first, then the generic ones.
pub fn compose_schema(specific: Vec<PropertyField>) -> Vec<PropertyField> {
    let mut schema = specific;
    schema.extend(base_schema());
    schema
}

/// Find a field by key.
pub fn find_field<'a>(schema: &'a [PropertyField], key: &str) -> Option<&'a PropertyField> {
    schema.iter().find(|f| f.key == key)
}

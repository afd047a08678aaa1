//! Block Registry - factory table from type tag to variant
//!
//! The registry is the only place that turns serialized records into live
//! `Block` nodes. It supports:
//! - Variant registration and unregistration
//! - Discovery by type tag, category or search query
//! - Picker listing in registration order
//! - Recursive construction that skips unknown types instead of failing

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::categories::{self, BlockCategory};
use crate::core::{Block, BlockData, BlockMetadata, BlockVariant, TreeRole};

/// Block registry mapping type tags to variants
///
/// The registry uses `Arc<RwLock<..>>` so clones share one table. Lookups
/// take parking_lot read locks; registration takes the write lock.
#[derive(Clone)]
pub struct BlockRegistry {
    inner: Arc<RwLock<RegistryTable>>,
}

#[derive(Default)]
struct RegistryTable {
    variants: HashMap<String, Arc<dyn BlockVariant>>,
    order: Vec<String>,
}

impl BlockRegistry {
    /// Create a new empty block registry
    ///
    /// # Example
    /// ```
    /// use block_editor::core::registry::BlockRegistry;
    ///
    /// let registry = BlockRegistry::new();
    /// assert_eq!(registry.count(), 0);
    /// ```
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryTable::default())),
        }
    }

    /// Create a registry holding every built-in block type
    ///
    /// # Example
    /// ```
    /// use block_editor::core::registry::BlockRegistry;
    ///
    /// let registry = BlockRegistry::with_builtin_blocks();
    /// assert!(registry.contains("paragraph"));
    /// assert!(registry.contains("table"));
    /// ```
    pub fn with_builtin_blocks() -> Self {
        let registry = Self::new();
        for variant in categories::builtin_variants() {
            let block_type = variant.metadata().block_type.clone();
            if let Err(e) = registry.register(variant) {
                warn!(block_type = %block_type, error = %e, "failed to register built-in block");
            }
        }
        registry
    }

    /// Register a new variant
    ///
    /// # Arguments
    /// * `variant` - The variant to register (wrapped in Arc)
    ///
    /// # Returns
    /// * `Ok(())` if registration succeeds
    /// * `Err(RegistryError)` if the type tag already exists or validation fails
    pub fn register(&self, variant: Arc<dyn BlockVariant>) -> Result<(), RegistryError> {
        self.validate_variant(&*variant)?;

        let block_type = variant.metadata().block_type.clone();
        let mut table = self.inner.write();

        if table.variants.contains_key(&block_type) {
            return Err(RegistryError::DuplicateBlock(block_type));
        }

        table.order.push(block_type.clone());
        table.variants.insert(block_type, variant);
        Ok(())
    }

    /// Unregister a variant
    ///
    /// Existing blocks keep their variant handle; only new construction is
    /// affected.
    pub fn unregister(&self, block_type: &str) -> Result<(), RegistryError> {
        let mut table = self.inner.write();

        table
            .variants
            .remove(block_type)
            .ok_or_else(|| RegistryError::BlockNotFound(block_type.to_string()))?;
        table.order.retain(|t| t != block_type);

        Ok(())
    }

    /// Get a variant by type tag
    ///
    /// # Returns
    /// * `Ok(Arc<dyn BlockVariant>)` if the type is registered
    /// * `Err(RegistryError)` if it is not
    pub fn get_variant(&self, block_type: &str) -> Result<Arc<dyn BlockVariant>, RegistryError> {
        self.inner
            .read()
            .variants
            .get(block_type)
            .cloned()
            .ok_or_else(|| RegistryError::BlockNotFound(block_type.to_string()))
    }

    /// All variants in registration order
    pub fn get_all_variants(&self) -> Vec<Arc<dyn BlockVariant>> {
        let table = self.inner.read();
        table
            .order
            .iter()
            .filter_map(|t| table.variants.get(t).cloned())
            .collect()
    }

    pub fn get_variants_by_category(&self, category: BlockCategory) -> Vec<Arc<dyn BlockVariant>> {
        self.get_all_variants()
            .into_iter()
            .filter(|v| v.metadata().category == category)
            .collect()
    }

    /// Search variants by query string
    ///
    /// Searches in label, description and keywords (case-insensitive).
    pub fn search_blocks(&self, query: &str) -> Vec<Arc<dyn BlockVariant>> {
        let query = query.to_lowercase();

        self.get_all_variants()
            .into_iter()
            .filter(|v| {
                let meta = v.metadata();
                meta.label.to_lowercase().contains(&query)
                    || meta.description.to_lowercase().contains(&query)
                    || meta.keywords.iter().any(|k| k.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Metadata of every type offered in the block picker
    pub fn picker_entries(&self) -> Vec<BlockMetadata> {
        self.get_all_variants()
            .into_iter()
            .map(|v| v.metadata().clone())
            .filter(|meta| meta.in_picker)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.inner.read().variants.len()
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.inner.read().variants.contains_key(block_type)
    }

    /// Remove every registered variant
    pub fn clear(&self) {
        let mut table = self.inner.write();
        table.variants.clear();
        table.order.clear();
    }

    /// Build a live block (and its subtree) from a record
    ///
    /// # Returns
    /// * `Some(Block)` with parent links set throughout the subtree
    /// * `None` when `data.block_type` is not registered; the record and its
    ///   children are skipped
    pub fn create_block_instance(&self, data: &BlockData) -> Option<Block> {
        let mut skipped = 0;
        self.instantiate(data, &mut skipped)
    }

    /// Build a root sequence, skipping unknown nodes.
    ///
    /// Returns the blocks and the number of records skipped.
    pub fn build_tree(&self, data: &[BlockData]) -> (Vec<Block>, usize) {
        let mut skipped = 0;
        let blocks = data
            .iter()
            .filter_map(|d| self.instantiate(d, &mut skipped))
            .collect();
        (blocks, skipped)
    }

    fn instantiate(&self, data: &BlockData, skipped: &mut usize) -> Option<Block> {
        let variant = match self.get_variant(&data.block_type) {
            Ok(variant) => variant,
            Err(_) => {
                warn!(
                    block_type = %data.block_type,
                    id = ?data.id,
                    "unknown block type, skipping"
                );
                *skipped += 1;
                return None;
            }
        };

        let mut block = Block::assemble(data, variant.clone());

        if variant.role() != TreeRole::Virtual {
            for child in &data.children {
                if let Some(child) = self.instantiate(child, skipped) {
                    block.push_child(child);
                }
            }
        }

        variant.initialize(&mut block, self);
        Some(block)
    }

    /// Validate a variant before registration
    fn validate_variant(&self, variant: &dyn BlockVariant) -> Result<(), RegistryError> {
        variant.validate().map_err(RegistryError::ValidationError)?;

        let meta = variant.metadata();

        if meta.block_type.is_empty() {
            return Err(RegistryError::ValidationError(
                "Block type cannot be empty".into(),
            ));
        }

        if meta.label.is_empty() {
            return Err(RegistryError::ValidationError(
                "Block label cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// No variant registered under this type tag
    #[error("Block type not found: {0}")]
    BlockNotFound(String),

    /// Attempted to register a type tag twice
    #[error("Duplicate block type: {0}")]
    DuplicateBlock(String),

    /// Variant validation failed
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockVariant {
        metadata: BlockMetadata,
    }

    impl MockVariant {
        fn new(block_type: &str, label: &str, keywords: &[&str]) -> Self {
            Self {
                metadata: BlockMetadata::new(block_type, label, "mock", BlockCategory::Text)
                    .with_description("A mock block")
                    .with_keywords(keywords),
            }
        }
    }

    impl BlockVariant for MockVariant {
        fn metadata(&self) -> &BlockMetadata {
            &self.metadata
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = BlockRegistry::new();
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_variant_registration() {
        let registry = BlockRegistry::new();
        let variant = Arc::new(MockVariant::new("mock", "Mock", &[]));

        assert!(registry.register(variant).is_ok());
        assert_eq!(registry.count(), 1);
        assert!(registry.get_variant("mock").is_ok());
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = BlockRegistry::new();
        registry
            .register(Arc::new(MockVariant::new("mock", "Mock", &[])))
            .unwrap();

        let result = registry.register(Arc::new(MockVariant::new("mock", "Other", &[])));
        assert!(matches!(result.unwrap_err(), RegistryError::DuplicateBlock(_)));
    }

    #[test]
    fn test_unregister() {
        let registry = BlockRegistry::new();
        registry
            .register(Arc::new(MockVariant::new("mock", "Mock", &[])))
            .unwrap();

        assert!(registry.unregister("mock").is_ok());
        assert_eq!(registry.count(), 0);
        assert!(matches!(
            registry.unregister("mock").unwrap_err(),
            RegistryError::BlockNotFound(_)
        ));
    }

    #[test]
    fn test_validation_empty_label() {
        let registry = BlockRegistry::new();
        let result = registry.register(Arc::new(MockVariant::new("mock", "", &[])));
        assert!(matches!(result.unwrap_err(), RegistryError::ValidationError(_)));
    }

    #[test]
    fn test_search_matches_keywords() {
        let registry = BlockRegistry::new();
        registry
            .register(Arc::new(MockVariant::new("a", "Alpha", &["first"])))
            .unwrap();
        registry
            .register(Arc::new(MockVariant::new("b", "Beta", &["second"])))
            .unwrap();

        assert_eq!(registry.search_blocks("FIRST").len(), 1);
        assert_eq!(registry.search_blocks("mock block").len(), 2);
        assert!(registry.search_blocks("gamma").is_empty());
    }

    #[test]
    fn test_registration_order_is_kept() {
        let registry = BlockRegistry::new();
        for t in ["c", "a", "b"] {
            registry
                .register(Arc::new(MockVariant::new(t, t, &[])))
                .unwrap();
        }
        let order: Vec<String> = registry
            .get_all_variants()
            .iter()
            .map(|v| v.metadata().block_type.clone())
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_unknown_type_is_none() {
        let registry = BlockRegistry::new();
        assert!(registry
            .create_block_instance(&BlockData::new("doesNotExist"))
            .is_none());
    }

    #[test]
    fn test_clear() {
        let registry = BlockRegistry::with_builtin_blocks();
        assert!(registry.count() > 0);
        registry.clear();
        assert_eq!(registry.count(), 0);
        assert!(registry.picker_entries().is_empty());
    }

    #[test]
    fn test_thread_safety() {
        use std::thread;

        let registry = BlockRegistry::new();
        let mut handles = vec![];

        for i in 0..10 {
            let registry = registry.clone();
            handles.push(thread::spawn(move || {
                let tag = format!("block{}", i);
                registry
                    .register(Arc::new(MockVariant::new(&tag, &tag, &[])))
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.count(), 10);
    }
}

//! Test suite for the block editor
//!
//! Tests are grouped by the layer they exercise: block and registry
//! basics, the mutation engine, history, tables and column layouts,
//! reference resolution, and property-based laws over all of it.

#[cfg(test)]
mod support;
#[cfg(test)]
mod editor_tests;
#[cfg(test)]
mod property_tests;

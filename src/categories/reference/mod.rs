//! Reference blocks
//!
//! Blocks whose visible content lives outside the tree. They hold only a
//! `Locator`; resolution is asynchronous and handled by
//! `runtime::reference`.

pub mod locator;
pub mod quote;

pub use locator::{Locator, LocatorError};
pub use quote::{QuoteBlock, QUOTE};

//! Editor runtime
//!
//! This module provides the mutation engine that owns a live document, the
//! snapshot history behind undo/redo, reference resolution for virtual
//! blocks and the time sources they are scheduled by.

pub mod editor;
pub mod history;
pub mod reference;
pub mod timer;
pub mod validation;

pub use editor::{ChangeNotification, DropPosition, Editor, EditorError, EditorEvent, LoadReport};
pub use history::{HistoryManager, RecordOutcome};
pub use reference::{
    ContentSource, FetchResult, PinnedReference, ReferenceDriver, ReferenceIndex, ReferenceRequest,
    ReferenceResolver, ReferenceResponse, ReferenceState,
};
pub use timer::{Clock, Debounce, ManualClock, SystemClock, Timer};
pub use validation::{TreeValidationResult, TreeValidator};

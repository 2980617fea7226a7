//! User-intent events and the engine's reactions to them.
//!
//! Whatever captured the interaction (a click, a context menu, a script
//! line), the engine only sees one of these events.

use crate::dataset::{CoordinateRecord, RecordId};

/// Something the user asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserEvent {
    /// A table row was clicked (0-based index).
    RowSelected(usize),
    /// A map marker was clicked.
    MarkerClicked(RecordId),
    /// The context menu was opened on a row.
    RowContextRequested(usize),
    /// Deletion of a row was confirmed.
    DeleteRequested(usize),
    /// Clearing the whole dataset was confirmed.
    ClearRequested,
}

/// Entries offered by a row's context menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextAction {
    CopySource,
    CopyTarget,
    Delete,
}

/// What the engine did in response to an event.
#[derive(Clone, Debug, PartialEq)]
pub enum Reaction {
    /// The record became active.
    Selected(RecordId),
    /// The row was selected and these actions are available for it.
    ContextMenu {
        id: RecordId,
        index: usize,
        actions: Vec<ContextAction>,
    },
    /// The record was removed from the dataset.
    Deleted(CoordinateRecord),
    /// The dataset was emptied; carries the number of records removed.
    Cleared(usize),
}

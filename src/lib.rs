//! Client-side data layer for the Jotter note-taking app.
//!
//! Notes and their checklist rows keep optimistically-mutated local state in
//! sync with a remote persistence API, coalescing rapid edits into a minimal
//! number of writes. A list item is never persisted before its owning note
//! has acquired a server-assigned id.

pub mod api;
pub mod catalog;
pub mod context;
pub mod entity;
pub mod error;
pub mod store;

pub use catalog::Catalog;
pub use context::{Context, Navigator};
pub use entity::{
    CoAuthor, ListItem, ListItemData, ListItemPatch, Note, NoteData, NotePatch, SaveOutcome,
    SaveRequest, User,
};
pub use error::{ErrorChannel, ErrorReport, JotterError, Result};
pub use store::{Action, StateStore};

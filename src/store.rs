//! Dispatch contract for the shared reactive store.
//!
//! Entities own their canonical field state behind shared handles; every
//! mutation is applied locally first and then announced through
//! [`StateStore::dispatch`] so observers (the UI layer) are notified in the
//! same order the mutations became visible. The store never mutates entity
//! fields itself.

use async_trait::async_trait;

use crate::entity::co_author::CoAuthor;
use crate::entity::list_item::{ListItem, ListItemPatch};
use crate::entity::note::{Note, NotePatch};
use crate::error::Result;

/// An action announced to the store after the corresponding local mutation.
#[derive(Debug, Clone)]
pub enum Action {
    AddListItem(ListItem),
    UpdateListItem { item: ListItem, patch: ListItemPatch },
    RemoveListItem(ListItem),
    /// Register a note as the current note (issued right before its first
    /// remote create).
    SetNote(Note),
    UnsetNote(Note),
    UpdateNote { note: Note, patch: NotePatch },
    RemoveNoteCoAuthor { note: Note, co_author: CoAuthor },
    SetMainListScrollTop(f64),
    SetIsInitInfoLoading(bool),
}

impl Action {
    /// Action name, mostly useful for logging and test assertions.
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddListItem(_) => "addListItem",
            Action::UpdateListItem { .. } => "updateListItem",
            Action::RemoveListItem(_) => "removeListItem",
            Action::SetNote(_) => "setNote",
            Action::UnsetNote(_) => "unsetNote",
            Action::UpdateNote { .. } => "updateNote",
            Action::RemoveNoteCoAuthor { .. } => "removeNoteCoAuthor",
            Action::SetMainListScrollTop(_) => "setMainListScrollTop",
            Action::SetIsInitInfoLoading(_) => "setIsInitInfoLoading",
        }
    }
}

/// Shared-store dispatch contract.
///
/// `dispatch` must resolve only once the mutation behind the action is
/// visible to observers.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn dispatch(&self, action: Action) -> Result<()>;
}

//! Remote persistence contract.
//!
//! The transport (HTTP client, interceptors, timeouts) lives outside this
//! crate; entities only depend on this trait. Create operations must return
//! at least the durable id the server assigned.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{StatusRecord, TypeRecord};
use crate::entity::co_author::{CoAuthor, User};
use crate::error::Result;

/// Wire payload for note create/update/delete calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    pub id: Option<i64>,
    pub title: String,
    pub text: String,
    pub type_id: i64,
    pub status_id: i64,
    pub is_completed_list_expanded: bool,
}

/// Wire payload for list item create/update/delete calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemPayload {
    pub id: Option<i64>,
    pub note_id: Option<i64>,
    pub text: String,
    pub checked: bool,
    pub completed: bool,
    pub order: i64,
}

/// Server response to a note create.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedNote {
    pub id: i64,
    pub user_id: Option<i64>,
    pub user: Option<User>,
}

/// Server response to a list item create.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedListItem {
    pub id: i64,
}

/// Remote persistence operations the data layer requires.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn add_note(&self, note: NotePayload) -> Result<CreatedNote>;
    async fn update_note(&self, note: NotePayload) -> Result<()>;
    async fn remove_note(&self, note: NotePayload) -> Result<()>;

    async fn save_list_item(&self, item: ListItemPayload) -> Result<CreatedListItem>;
    async fn update_list_item(&self, item: ListItemPayload) -> Result<()>;
    async fn remove_list_item(&self, item: ListItemPayload) -> Result<()>;

    async fn remove_note_co_author(&self, co_author: CoAuthor) -> Result<()>;

    async fn get_types(&self) -> Result<Vec<TypeRecord>>;
    async fn get_statuses(&self) -> Result<Vec<StatusRecord>>;
}

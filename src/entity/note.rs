//! Note entity: a document with an ordered checklist, co-authors, and its own
//! debounced save protocol.
//!
//! The note is the ordering anchor of the data layer: list items embed its
//! durable id, so their first persistence attempt is deferred until the note
//! has completed its remote create.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::api::NotePayload;
use crate::catalog::{StatusRecord, TypeRecord, TYPE_LIST, TYPE_TEXT};
use crate::context::Context;
use crate::error::{JotterError, Result};
use crate::store::Action;

use super::co_author::{CoAuthor, User};
use super::list_item::{ListItem, ListItemData, ListItemPatch};
use super::{parse_timestamp, SaveOutcome, SaveRequest, SaveState, SAVE_DEBOUNCE};

/// Raw note fields as delivered by the remote API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteData {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub type_id: Option<i64>,
    pub status_id: Option<i64>,
    pub user_id: Option<i64>,
    pub user: Option<User>,
    pub is_completed_list_expanded: Option<bool>,
    pub list: Vec<ListItemData>,
    pub co_authors: Vec<CoAuthor>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

/// Partial update applied through [`Note::update`] / [`Note::update_state`].
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub type_id: Option<i64>,
    pub status_id: Option<i64>,
    pub user_id: Option<i64>,
    pub user: Option<User>,
    pub is_completed_list_expanded: Option<bool>,
}

#[derive(Debug)]
pub(crate) struct NoteFields {
    id: Option<i64>,
    title: String,
    text: String,
    type_id: i64,
    status_id: i64,
    note_type: TypeRecord,
    status: StatusRecord,
    user_id: Option<i64>,
    user: Option<User>,
    is_completed_list_expanded: bool,
    list: Vec<ListItem>,
    co_authors: Vec<CoAuthor>,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    save: SaveState,
}

/// A note. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct Note {
    ctx: Context,
    pub(crate) inner: Arc<Mutex<NoteFields>>,
}

impl Note {
    /// Build a note from raw data. `type_id`/`status_id` default to the list
    /// type and active status and must resolve against the reference catalog;
    /// a miss is reported and aborts construction.
    pub fn new(ctx: &Context, data: NoteData) -> Result<Self> {
        let type_id = match data.type_id {
            Some(id) => id,
            None => ctx.resolve_default_type()?.id,
        };
        let status_id = match data.status_id {
            Some(id) => id,
            None => ctx.resolve_active_status()?.id,
        };
        let note_type = ctx.resolve_type_by_id(type_id)?;
        let status = ctx.resolve_status_by_id(status_id)?;

        let note = Self {
            ctx: ctx.clone(),
            inner: Arc::new(Mutex::new(NoteFields {
                id: data.id,
                title: data.title.unwrap_or_default(),
                text: data.text.unwrap_or_default(),
                type_id,
                status_id,
                note_type,
                status,
                user_id: data.user_id,
                user: data.user,
                is_completed_list_expanded: data.is_completed_list_expanded.unwrap_or(false),
                list: Vec::new(),
                co_authors: Vec::new(),
                created: parse_timestamp(data.created.as_deref()),
                updated: parse_timestamp(data.updated.as_deref()),
                save: SaveState::default(),
            })),
        };
        note.handle_list(data.list);
        note.handle_co_authors(data.co_authors);
        Ok(note)
    }

    pub(crate) fn from_inner(ctx: Context, inner: Arc<Mutex<NoteFields>>) -> Self {
        Self { ctx, inner }
    }

    /// Durable identity, absent until the first successful remote create.
    pub fn id(&self) -> Option<i64> {
        self.fields().id
    }

    pub fn title(&self) -> String {
        self.fields().title.clone()
    }

    pub fn text(&self) -> String {
        self.fields().text.clone()
    }

    pub fn type_id(&self) -> i64 {
        self.fields().type_id
    }

    pub fn status_id(&self) -> i64 {
        self.fields().status_id
    }

    pub fn note_type(&self) -> TypeRecord {
        self.fields().note_type.clone()
    }

    pub fn status(&self) -> StatusRecord {
        self.fields().status.clone()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.fields().user_id
    }

    pub fn user(&self) -> Option<User> {
        self.fields().user.clone()
    }

    pub fn is_completed_list_expanded(&self) -> bool {
        self.fields().is_completed_list_expanded
    }

    /// The ordered checklist. Handles are shared, not copies.
    pub fn list(&self) -> Vec<ListItem> {
        self.fields().list.clone()
    }

    pub fn co_authors(&self) -> Vec<CoAuthor> {
        self.fields().co_authors.clone()
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.fields().created
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.fields().updated
    }

    pub fn has_pending_save(&self) -> bool {
        self.fields().save.is_armed()
    }

    pub fn is_list(&self) -> bool {
        self.fields().note_type.name == TYPE_LIST
    }

    pub fn is_text(&self) -> bool {
        self.fields().note_type.name == TYPE_TEXT
    }

    /// Append a checklist row. The next order is `max(existing) + 1` (1 for an
    /// empty list), computed and inserted under one lock so concurrent appends
    /// cannot hand out the same order. Does not trigger a save.
    pub async fn add_list_item(&self, data: Option<ListItemData>) -> Result<ListItem> {
        let mut data = data.unwrap_or_default();
        let item = {
            let mut f = self.fields();
            let next_order = f.list.iter().map(|i| i.order()).max().map_or(1, |m| m + 1);
            if data.order.is_none() {
                data.order = Some(next_order);
            }
            if data.note_id.is_none() {
                data.note_id = f.id;
            }
            if data.updated.is_none() {
                data.updated = Some(Utc::now().to_rfc3339());
            }
            let item = ListItem::new(&self.ctx, data);
            item.set_note(self);
            f.list.push(item.clone());
            item
        };
        self.ctx
            .store
            .dispatch(Action::AddListItem(item.clone()))
            .await?;
        Ok(item)
    }

    /// Arm the save timer. `saving_text` debounces for the full window (the
    /// edit came from typing); otherwise the save is only deferred to the next
    /// scheduling tick. Superseded timers hand their waiters forward.
    pub fn save(&self, saving_text: bool) -> SaveRequest {
        let delay = if saving_text {
            SAVE_DEBOUNCE
        } else {
            Duration::ZERO
        };
        self.save_with_delay(delay)
    }

    /// Apply `data` optimistically. While the note has meaningful content a
    /// save is armed; an emptied note instead drops any armed timer so it is
    /// never persisted.
    pub async fn update(&self, patch: NotePatch) -> Result<Option<SaveRequest>> {
        // Only a patch carrying actual text counts as typing; clearing a
        // field to empty goes through the undebounced path.
        let saving_text = patch.text.as_deref().is_some_and(|s| !s.is_empty())
            || patch.title.as_deref().is_some_and(|s| !s.is_empty());
        self.update_state(patch).await?;

        if self.has_content() {
            Ok(Some(self.save(saving_text)))
        } else {
            self.cancel_pending();
            Ok(None)
        }
    }

    /// Apply `data` to local state and announce it to the store. A patch that
    /// changes `type_id`/`status_id` re-resolves against the catalog first and
    /// is rejected wholesale on a miss.
    pub async fn update_state(&self, patch: NotePatch) -> Result<()> {
        let resolved_type = match patch.type_id {
            Some(id) => Some(self.ctx.resolve_type_by_id(id)?),
            None => None,
        };
        let resolved_status = match patch.status_id {
            Some(id) => Some(self.ctx.resolve_status_by_id(id)?),
            None => None,
        };

        {
            let mut f = self.fields();
            if let Some(id) = patch.id {
                f.id = Some(id);
            }
            if let Some(title) = &patch.title {
                f.title = title.clone();
            }
            if let Some(text) = &patch.text {
                f.text = text.clone();
            }
            if let Some(note_type) = resolved_type {
                f.type_id = note_type.id;
                f.note_type = note_type;
            }
            if let Some(status) = resolved_status {
                f.status_id = status.id;
                f.status = status;
            }
            if let Some(user_id) = patch.user_id {
                f.user_id = Some(user_id);
            }
            if let Some(user) = &patch.user {
                f.user = Some(user.clone());
            }
            if let Some(expanded) = patch.is_completed_list_expanded {
                f.is_completed_list_expanded = expanded;
            }
        }

        self.ctx
            .store
            .dispatch(Action::UpdateNote {
                note: self.clone(),
                patch,
            })
            .await
    }

    /// Re-stamp every child's back-reference to this note instance (used
    /// after the note handle is replaced in shared state).
    pub async fn set_note_to_list_items(&self) -> Result<()> {
        for item in self.list() {
            item.update_state(ListItemPatch {
                note: Some(self.clone()),
                ..Default::default()
            })
            .await?;
        }
        Ok(())
    }

    /// Detach a collaborator: local removal first, then the remote call.
    pub async fn remove_co_author(&self, co_author: &CoAuthor) -> Result<()> {
        self.fields()
            .co_authors
            .retain(|c| !(c.id == co_author.id && c.user_id == co_author.user_id));
        self.ctx
            .store
            .dispatch(Action::RemoveNoteCoAuthor {
                note: self.clone(),
                co_author: co_author.clone(),
            })
            .await?;
        self.ctx.api.remove_note_co_author(co_author.clone()).await
    }

    pub async fn remove_from_state(&self) -> Result<()> {
        self.ctx
            .store
            .dispatch(Action::UnsetNote(self.clone()))
            .await
    }

    /// Optimistic delete: the note leaves shared state before the remote call
    /// is issued, and a remote failure is reported without restoring it.
    pub async fn remove(&self) -> Result<()> {
        self.cancel_pending();
        self.remove_from_state().await?;
        if let Err(err) = self.ctx.api.remove_note(self.payload()).await {
            warn!(error = %err, "note remove failed");
            self.ctx.errors.report(err.report());
        }
        Ok(())
    }

    /// Cancel the armed save timer, if any. Awaiters resolve as cancelled.
    pub fn cancel_pending(&self) {
        let waiters = self.fields().save.cancel();
        for w in waiters {
            let _ = w.send(SaveOutcome::cancelled());
        }
    }

    pub(crate) fn detach_item(&self, item: &ListItem) {
        self.fields()
            .list
            .retain(|i| i.local_id() != item.local_id());
    }

    fn handle_list(&self, items: Vec<ListItemData>) {
        let built: Vec<ListItem> = items
            .into_iter()
            .map(|data| {
                let item = ListItem::new(&self.ctx, data);
                item.set_note(self);
                item
            })
            .collect();
        self.fields().list.extend(built);
    }

    fn handle_co_authors(&self, co_authors: Vec<CoAuthor>) {
        self.fields().co_authors.extend(co_authors);
    }

    fn has_content(&self) -> bool {
        let f = self.fields();
        !f.title.is_empty() || !f.text.is_empty() || !f.list.is_empty()
    }

    fn save_with_delay(&self, delay: Duration) -> SaveRequest {
        let (tx, rx) = oneshot::channel();
        let mut f = self.fields();
        let mut waiters = f.save.cancel();
        waiters.push(tx);
        let generation = f.save.bump();
        let entity = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            entity.fire_save(generation).await;
        });
        f.save.arm(generation, handle, waiters);
        debug!(note_id = ?f.id, "note save armed");
        SaveRequest::new(rx)
    }

    async fn fire_save(&self, generation: u64) {
        let claimed = self.fields().save.claim(generation);
        let Some(waiters) = claimed else { return };
        let outcome = self.flush().await;
        for w in waiters {
            let _ = w.send(outcome.clone());
        }
    }

    /// The actual remote write. A note without a durable id is registered as
    /// the current note, created remotely, and on success the navigation is
    /// replaced with its new address and the assigned id merged back in.
    async fn flush(&self) -> SaveOutcome {
        let payload = self.payload();
        if payload.id.is_some() {
            match self.ctx.api.update_note(payload).await {
                Ok(()) => SaveOutcome::persisted(),
                Err(err) => self.report_failed(err, "note update failed"),
            }
        } else {
            if let Err(err) = self.ctx.store.dispatch(Action::SetNote(self.clone())).await {
                return self.report_failed(err, "failed to register note");
            }
            match self.ctx.api.add_note(payload).await {
                Ok(created) => {
                    self.ctx.navigator.replace(&format!("/notes/{}", created.id));
                    let patch = NotePatch {
                        id: Some(created.id),
                        user_id: created.user_id,
                        user: created.user,
                        ..Default::default()
                    };
                    match self.update_state(patch).await {
                        Ok(()) => SaveOutcome::persisted(),
                        Err(err) => self.report_failed(err, "failed to merge created note"),
                    }
                }
                Err(err) => self.report_failed(err, "note create failed"),
            }
        }
    }

    fn report_failed(&self, err: JotterError, what: &str) -> SaveOutcome {
        warn!(error = %err, "{}", what);
        self.ctx.errors.report(err.report());
        SaveOutcome::failed()
    }

    fn payload(&self) -> NotePayload {
        let f = self.fields();
        NotePayload {
            id: f.id,
            title: f.title.clone(),
            text: f.text.clone(),
            type_id: f.type_id,
            status_id: f.status_id,
            is_completed_list_expanded: f.is_completed_list_expanded,
        }
    }

    fn fields(&self) -> MutexGuard<'_, NoteFields> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! List item entity: one checklist row of a list note.
//!
//! A list item owns its own debounced save protocol, but its first remote
//! create is gated on the owning note holding a durable id (see
//! [`ListItem::update`]).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::ListItemPayload;
use crate::context::Context;
use crate::error::Result;
use crate::store::Action;

use super::note::{Note, NoteFields};
use super::{parse_timestamp, SaveOutcome, SaveRequest, SaveState, SAVE_DEBOUNCE};

/// Raw list item fields as delivered by the remote API or a local creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListItemData {
    pub id: Option<i64>,
    pub note_id: Option<i64>,
    pub text: Option<String>,
    pub focused: Option<bool>,
    pub checked: Option<bool>,
    pub completed: Option<bool>,
    pub order: Option<i64>,
    pub updated: Option<String>,
    pub variants: Option<Vec<String>>,
}

/// Partial update applied through [`ListItem::update`] /
/// [`ListItem::update_state`]. `Some` sets a field, `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct ListItemPatch {
    pub id: Option<i64>,
    pub text: Option<String>,
    pub note: Option<Note>,
    pub focused: Option<bool>,
    pub checked: Option<bool>,
    pub completed: Option<bool>,
    pub order: Option<i64>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct ListItemFields {
    id: Option<i64>,
    note_id: Option<i64>,
    text: String,
    /// Non-owning back-reference to the note that owns this row.
    note: Weak<Mutex<NoteFields>>,
    focused: bool,
    checked: bool,
    completed: bool,
    order: i64,
    updated: Option<DateTime<Utc>>,
    variants: Vec<String>,
    save: SaveState,
}

/// A checklist row. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct ListItem {
    local_id: Uuid,
    ctx: Context,
    inner: Arc<Mutex<ListItemFields>>,
}

impl ListItem {
    pub fn new(ctx: &Context, data: ListItemData) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            ctx: ctx.clone(),
            inner: Arc::new(Mutex::new(ListItemFields {
                id: data.id,
                note_id: data.note_id,
                text: data.text.unwrap_or_default(),
                note: Weak::new(),
                focused: data.focused.unwrap_or(false),
                checked: data.checked.unwrap_or(false),
                completed: data.completed.unwrap_or(false),
                order: data.order.unwrap_or(0),
                updated: parse_timestamp(data.updated.as_deref()),
                variants: data.variants.unwrap_or_default(),
                save: SaveState::default(),
            })),
        }
    }

    /// Durable identity, absent until the first successful remote create.
    pub fn id(&self) -> Option<i64> {
        self.fields().id
    }

    /// Ephemeral identity, stable for this object's in-memory lifetime.
    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    pub fn text(&self) -> String {
        self.fields().text.clone()
    }

    pub fn note_id(&self) -> Option<i64> {
        self.fields().note_id
    }

    pub fn focused(&self) -> bool {
        self.fields().focused
    }

    pub fn checked(&self) -> bool {
        self.fields().checked
    }

    pub fn completed(&self) -> bool {
        self.fields().completed
    }

    pub fn order(&self) -> i64 {
        self.fields().order
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.fields().updated
    }

    pub fn variants(&self) -> Vec<String> {
        self.fields().variants.clone()
    }

    /// The owning note, if it is still alive.
    pub fn note(&self) -> Option<Note> {
        let inner = self.fields().note.upgrade()?;
        Some(Note::from_inner(self.ctx.clone(), inner))
    }

    pub fn has_pending_save(&self) -> bool {
        self.fields().save.is_armed()
    }

    /// Arm the debounced save. Superseding an armed timer carries its waiters
    /// over, so every awaiter resolves with the final coalesced outcome.
    pub fn save(&self) -> SaveRequest {
        self.save_with_delay(SAVE_DEBOUNCE)
    }

    /// Apply `data` optimistically, then schedule persistence if the row has
    /// text. When the owning note has no durable id yet, its save is awaited
    /// to completion first so this row never references a nonexistent note.
    pub async fn update(&self, patch: ListItemPatch) -> Result<Option<SaveRequest>> {
        self.update_state(patch).await?;

        if self.text().is_empty() {
            return Ok(None);
        }

        if let Some(note) = self.note() {
            if note.id().is_none() {
                note.save(false).wait().await;
                if note.id().is_none() {
                    warn!(local_id = %self.local_id, "owning note unpersisted, deferring item save");
                    return Ok(None);
                }
            }
        }

        Ok(Some(self.save()))
    }

    /// Apply `data` to local state and announce it to the store.
    pub async fn update_state(&self, patch: ListItemPatch) -> Result<()> {
        self.apply(&patch);
        self.ctx
            .store
            .dispatch(Action::UpdateListItem {
                item: self.clone(),
                patch,
            })
            .await
    }

    /// Remove from shared state: detaches from the owning note's list, then
    /// announces the removal.
    pub async fn remove_from_state(&self) -> Result<()> {
        if let Some(note) = self.note() {
            note.detach_item(self);
        }
        self.ctx
            .store
            .dispatch(Action::RemoveListItem(self.clone()))
            .await
    }

    /// An unchecked/checked toggle; a row without text cannot be checked.
    pub async fn check(&self, is_checked: bool) -> Result<Option<SaveRequest>> {
        if self.text().is_empty() {
            return Ok(None);
        }
        self.update(ListItemPatch {
            checked: Some(is_checked),
            ..Default::default()
        })
        .await
    }

    /// Mark completed/uncompleted; a row without text cannot be completed.
    pub async fn complete(&self, is_completed: bool) -> Result<Option<SaveRequest>> {
        if self.text().is_empty() {
            return Ok(None);
        }
        self.update(ListItemPatch {
            completed: Some(is_completed),
            ..Default::default()
        })
        .await
    }

    /// Optimistically drop the row locally (unless `remove_from_state` is
    /// false), then issue the remote delete.
    pub async fn remove(&self, remove_from_state: bool) -> Result<()> {
        self.cancel_pending();
        if remove_from_state {
            self.remove_from_state().await?;
        }
        self.ctx.api.remove_list_item(self.payload()).await
    }

    /// Cancel the armed save timer, if any. Awaiters resolve as cancelled.
    pub fn cancel_pending(&self) {
        let waiters = self.fields().save.cancel();
        for w in waiters {
            let _ = w.send(SaveOutcome::cancelled());
        }
    }

    pub(crate) fn set_note(&self, note: &Note) {
        self.fields().note = Arc::downgrade(&note.inner);
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
        debug!(local_id = %self.local_id, "list item save armed");
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

    /// The actual remote write: create when no durable id exists yet, update
    /// otherwise. Failures are reported, never rolled back locally.
    async fn flush(&self) -> SaveOutcome {
        let payload = self.payload();
        let result = if payload.id.is_none() {
            match self.ctx.api.save_list_item(payload).await {
                Ok(created) => {
                    self.update_state(ListItemPatch {
                        id: Some(created.id),
                        ..Default::default()
                    })
                    .await
                }
                Err(err) => Err(err),
            }
        } else {
            self.ctx.api.update_list_item(payload).await
        };

        match result {
            Ok(()) => SaveOutcome::persisted(),
            Err(err) => {
                warn!(local_id = %self.local_id, error = %err, "list item save failed");
                self.ctx.errors.report(err.report());
                SaveOutcome::failed()
            }
        }
    }

    fn payload(&self) -> ListItemPayload {
        let note_id = self.note().and_then(|n| n.id());
        let f = self.fields();
        ListItemPayload {
            id: f.id,
            note_id: note_id.or(f.note_id),
            text: f.text.clone(),
            checked: f.checked,
            completed: f.completed,
            order: f.order,
        }
    }

    fn apply(&self, patch: &ListItemPatch) {
        // Read the note handle before taking our own lock; locks are only
        // ever nested note -> item.
        let note_ref = patch
            .note
            .as_ref()
            .map(|n| (Arc::downgrade(&n.inner), n.id()));

        let mut f = self.fields();
        if let Some(id) = patch.id {
            f.id = Some(id);
        }
        if let Some(text) = &patch.text {
            f.text = text.clone();
        }
        if let Some((weak, note_id)) = note_ref {
            f.note = weak;
            if note_id.is_some() {
                f.note_id = note_id;
            }
        }
        if let Some(focused) = patch.focused {
            f.focused = focused;
        }
        if let Some(checked) = patch.checked {
            f.checked = checked;
        }
        if let Some(completed) = patch.completed {
            f.completed = completed;
        }
        if let Some(order) = patch.order {
            f.order = order;
        }
        if let Some(updated) = patch.updated {
            f.updated = Some(updated);
        }
    }

    fn fields(&self) -> MutexGuard<'_, ListItemFields> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

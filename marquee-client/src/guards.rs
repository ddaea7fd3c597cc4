//! Command guards
//!
//! Sit between user intent and [`LibraryClient`]: a second delete for a
//! library that is already being deleted is dropped, and a create with a
//! blank name never leaves the form.

use std::collections::HashMap;
use std::sync::Arc;

use marquee_model::{Library, LibraryId, MediaType, NewLibrary};
use parking_lot::Mutex;
use tracing::debug;

use crate::auth::AuthToken;
use crate::client::LibraryClient;
use crate::error::{LibraryError, LibraryResult, ValidationError};

/// Pending create-form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryDraft {
    pub name: String,
    pub location: String,
    pub media_type: MediaType,
}

impl LibraryDraft {
    /// Build the request body, rejecting a blank name.
    pub fn validate(&self) -> Result<NewLibrary, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(NewLibrary {
            name: name.to_string(),
            location: self.location.clone(),
            media_type: self.media_type,
        })
    }
}

/// Create-library form state owned by the creation flow.
#[derive(Debug, Default)]
pub struct CreateLibraryForm {
    draft: LibraryDraft,
    name_invalid: bool,
    last_error: Option<LibraryError>,
}

impl CreateLibraryForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &LibraryDraft {
        &self.draft
    }

    /// Set when a submit was rejected for a blank name; cleared as soon as
    /// the name is edited.
    pub fn name_invalid(&self) -> bool {
        self.name_invalid
    }

    /// The failure of the last submit, kept for inline display.
    pub fn last_error(&self) -> Option<&LibraryError> {
        self.last_error.as_ref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
        self.name_invalid = false;
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.draft.location = location.into();
    }

    pub fn set_media_type(&mut self, media_type: MediaType) {
        self.draft.media_type = media_type;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Submit the draft. On success the form resets to its defaults; on
    /// any failure the draft is kept for correction or resubmission.
    pub async fn submit(
        &mut self,
        client: &LibraryClient,
        token: &AuthToken,
    ) -> LibraryResult<Library> {
        match client.create_library(token, &self.draft).await {
            Ok(library) => {
                self.reset();
                Ok(library)
            }
            Err(err) => {
                if matches!(err, LibraryError::Validation(_)) {
                    self.name_invalid = true;
                }
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingDelete {
    ticket: u64,
    /// The library was in the collection when the delete started, so its
    /// later disappearance means the delete took effect.
    was_present: bool,
}

#[derive(Debug, Default)]
struct PendingDeletes {
    next_ticket: u64,
    by_id: HashMap<LibraryId, PendingDelete>,
}

/// Per-library "deleting" flags.
#[derive(Debug, Clone, Default)]
pub struct DeleteGuard {
    pending: Arc<Mutex<PendingDeletes>>,
}

impl DeleteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the delete slot for `id`, or `None` if a delete for it is
    /// already outstanding. The slot is released when the permit drops.
    ///
    /// `was_present` records whether the library is currently in the
    /// collection; only such slots are released by [`Self::release_missing`].
    pub fn try_acquire(
        &self,
        id: LibraryId,
        was_present: bool,
    ) -> Option<DeletePermit> {
        let mut pending = self.pending.lock();
        if pending.by_id.contains_key(&id) {
            return None;
        }
        pending.next_ticket += 1;
        let ticket = pending.next_ticket;
        pending.by_id.insert(
            id,
            PendingDelete {
                ticket,
                was_present,
            },
        );
        Some(DeletePermit {
            id,
            ticket,
            pending: Arc::clone(&self.pending),
        })
    }

    pub fn is_deleting(&self, id: LibraryId) -> bool {
        self.pending.lock().by_id.contains_key(&id)
    }

    /// Release flags for libraries that were in the collection when their
    /// delete started and have since left it.
    pub fn release_missing(&self, still_present: impl Fn(LibraryId) -> bool) {
        self.pending
            .lock()
            .by_id
            .retain(|id, entry| !entry.was_present || still_present(*id));
    }
}

/// Held for the duration of one delete request.
#[derive(Debug)]
pub struct DeletePermit {
    id: LibraryId,
    ticket: u64,
    pending: Arc<Mutex<PendingDeletes>>,
}

impl DeletePermit {
    pub fn library_id(&self) -> LibraryId {
        self.id
    }
}

impl Drop for DeletePermit {
    fn drop(&mut self) {
        let mut pending = self.pending.lock();
        // A newer permit may own the slot if this one was released early.
        if pending
            .by_id
            .get(&self.id)
            .is_some_and(|entry| entry.ticket == self.ticket)
        {
            pending.by_id.remove(&self.id);
        }
    }
}

/// Result of a guarded delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The server accepted the delete; the consumer should leave any view
    /// of this library.
    Deleted(LibraryId),
    /// Another delete for this library is still outstanding; nothing sent.
    AlreadyInFlight(LibraryId),
}

/// User-facing commands with their guards applied.
#[derive(Debug, Clone)]
pub struct LibraryCommands {
    client: LibraryClient,
    deletes: DeleteGuard,
}

impl LibraryCommands {
    pub fn new(client: LibraryClient) -> Self {
        Self {
            client,
            deletes: DeleteGuard::new(),
        }
    }

    pub fn client(&self) -> &LibraryClient {
        &self.client
    }

    pub fn is_deleting(&self, id: LibraryId) -> bool {
        self.release_removed();
        self.deletes.is_deleting(id)
    }

    fn release_removed(&self) {
        let registry = self.client.registry();
        self.deletes.release_missing(|pending| registry.contains(pending));
    }

    pub async fn delete(
        &self,
        token: &AuthToken,
        id: LibraryId,
    ) -> LibraryResult<DeleteOutcome> {
        self.release_removed();

        let present = self.client.registry().contains(id);
        let Some(_permit) = self.deletes.try_acquire(id, present) else {
            debug!(library_id = %id, "delete already in flight; dropping");
            return Ok(DeleteOutcome::AlreadyInFlight(id));
        };

        self.client.delete_library(token, id).await?;
        Ok(DeleteOutcome::Deleted(id))
    }

    pub async fn create(
        &self,
        form: &mut CreateLibraryForm,
        token: &AuthToken,
    ) -> LibraryResult<Library> {
        form.submit(&self.client, token).await
    }
}

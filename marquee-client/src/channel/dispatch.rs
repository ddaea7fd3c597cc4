//! Translate decoded events into registry commands.

use std::sync::Arc;

use marquee_model::{Library, LibraryEvent, LibraryId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::LibraryApi;
use crate::auth::AuthToken;
use crate::error::LibraryError;
use crate::registry::LibraryRegistry;

/// A bare-id `EventNewLibrary` could not be turned into a full record.
///
/// Never surfaced to users: the next full fetch restores consistency.
#[derive(Debug, Error)]
#[error("failed to resolve library {id}: {source}")]
pub struct ResolutionError {
    pub id: LibraryId,
    #[source]
    pub source: LibraryError,
}

/// What a dispatched event did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Added(LibraryId),
    /// The library was already known; nothing changed.
    AlreadyPresent(LibraryId),
    Removed(LibraryId),
    /// Remove for a library never seen locally (or already gone).
    NotPresent(LibraryId),
    /// Resolution failed and the event was dropped.
    Dropped(LibraryId),
    Ignored,
}

#[derive(Debug, Clone)]
pub struct EventDispatcher {
    api: Arc<dyn LibraryApi>,
    registry: LibraryRegistry,
    token: AuthToken,
}

impl EventDispatcher {
    pub fn new(
        api: Arc<dyn LibraryApi>,
        registry: LibraryRegistry,
        token: AuthToken,
    ) -> Self {
        Self {
            api,
            registry,
            token,
        }
    }

    /// Resolution fetch for a bare library id.
    pub async fn resolve(
        &self,
        id: LibraryId,
    ) -> Result<Library, ResolutionError> {
        self.api
            .fetch_library(&self.token, id)
            .await
            .map_err(|source| ResolutionError { id, source })
    }

    pub async fn dispatch(&self, event: LibraryEvent) -> DispatchOutcome {
        match event {
            LibraryEvent::Added(id) => {
                if self.registry.contains(id) {
                    debug!(library_id = %id, "new-library event for known library");
                    return DispatchOutcome::AlreadyPresent(id);
                }
                match self.resolve(id).await {
                    Ok(library) => {
                        info!(library_id = %id, name = %library.name, "library added");
                        if self.registry.add(library) {
                            DispatchOutcome::Added(id)
                        } else {
                            DispatchOutcome::AlreadyPresent(id)
                        }
                    }
                    Err(err) => {
                        warn!(
                            library_id = %id,
                            error = %err,
                            "dropping new-library event; next full fetch will reconcile"
                        );
                        DispatchOutcome::Dropped(id)
                    }
                }
            }
            LibraryEvent::Removed(id) => {
                if self.registry.remove(id) {
                    info!(library_id = %id, "library removed");
                    DispatchOutcome::Removed(id)
                } else {
                    debug!(library_id = %id, "remove event for unknown library");
                    DispatchOutcome::NotPresent(id)
                }
            }
            LibraryEvent::Unknown { kind } => {
                debug!(%kind, "ignoring library event");
                DispatchOutcome::Ignored
            }
        }
    }
}

//! Remote fetch client
//!
//! Turns REST round-trips into registry commands. Create and delete
//! results are not applied locally while the push channel is live: the
//! broadcast that follows them is the one authoritative mutation, so the
//! creator never sees a library twice. When the channel is down (degraded
//! mode, or between reconnects) the client applies the result itself.

use std::sync::Arc;

use marquee_model::{Library, LibraryId};
use tracing::{debug, info, warn};

use crate::api::LibraryApi;
use crate::auth::AuthToken;
use crate::channel::ChannelAvailability;
use crate::error::LibraryResult;
use crate::guards::LibraryDraft;
use crate::registry::LibraryRegistry;

#[derive(Debug, Clone)]
pub struct LibraryClient {
    api: Arc<dyn LibraryApi>,
    registry: LibraryRegistry,
    channel: ChannelAvailability,
}

impl LibraryClient {
    pub fn new(
        api: Arc<dyn LibraryApi>,
        registry: LibraryRegistry,
        channel: ChannelAvailability,
    ) -> Self {
        Self {
            api,
            registry,
            channel,
        }
    }

    pub fn registry(&self) -> &LibraryRegistry {
        &self.registry
    }

    pub fn api(&self) -> &Arc<dyn LibraryApi> {
        &self.api
    }

    pub fn channel(&self) -> &ChannelAvailability {
        &self.channel
    }

    /// Bulk-load every library and make the result the registry baseline.
    ///
    /// Overlapping calls are not coalesced here; [`crate::LibrarySession`]
    /// keeps at most one in flight.
    pub async fn fetch_all(
        &self,
        token: &AuthToken,
    ) -> LibraryResult<Vec<Library>> {
        self.registry.mark_fetching();

        match self.api.fetch_libraries(token).await {
            Ok(records) => {
                info!(count = records.len(), "libraries fetched");
                self.registry.replace_all(records.clone());
                Ok(records)
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "library fetch failed");
                self.registry.mark_errored(err.clone());
                Err(err)
            }
        }
    }

    /// Validate the draft and create the library on the server.
    ///
    /// A blank name fails with [`crate::LibraryError::Validation`] without
    /// touching the network.
    pub async fn create_library(
        &self,
        token: &AuthToken,
        draft: &LibraryDraft,
    ) -> LibraryResult<Library> {
        let request = draft.validate()?;
        let library = self.api.create_library(token, &request).await?;

        if self.channel.is_live() {
            debug!(
                library_id = %library.id,
                "library created; waiting for broadcast to apply it"
            );
        } else {
            info!(
                library_id = %library.id,
                "library created while event channel is unavailable; applying locally"
            );
            self.registry.add(library.clone());
        }

        Ok(library)
    }

    /// Delete the library on the server. Same local-apply rule as
    /// [`Self::create_library`].
    pub async fn delete_library(
        &self,
        token: &AuthToken,
        id: LibraryId,
    ) -> LibraryResult<()> {
        self.api.delete_library(token, id).await?;

        if self.channel.is_live() {
            debug!(library_id = %id, "library deleted; waiting for broadcast");
        } else {
            info!(
                library_id = %id,
                "library deleted while event channel is unavailable; removing locally"
            );
            self.registry.remove(id);
        }

        Ok(())
    }
}

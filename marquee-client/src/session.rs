//! Consumer mount lifecycle.
//!
//! A [`LibrarySession`] is what a view holds while it shows the library
//! list: mounting opens the push channel (when allowed) and issues the
//! initial fetch, unmounting closes the channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use marquee_model::{Library, LibraryId};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{HttpLibraryApi, LibraryApi};
use crate::auth::AuthToken;
use crate::channel::{
    ChannelAvailability, ChannelHandle, ChannelSettings, EventDispatcher,
};
use crate::client::LibraryClient;
use crate::config::{ClientConfig, ConfigError};
use crate::error::LibraryResult;
use crate::guards::{CreateLibraryForm, DeleteOutcome, LibraryCommands};
use crate::registry::{LibraryRegistry, RegistryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchOutcome {
    /// Fetch finished; the registry now holds this many libraries.
    Completed(usize),
    /// A fetch was already outstanding; nothing was sent.
    AlreadyInFlight,
}

#[derive(Debug)]
pub struct LibrarySession {
    commands: LibraryCommands,
    token: AuthToken,
    channel: Option<ChannelHandle>,
    fetching: Arc<AtomicBool>,
}

struct FetchSlot(Arc<AtomicBool>);

impl FetchSlot {
    fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for FetchSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl LibrarySession {
    /// Open the channel, then run the initial fetch.
    ///
    /// A failed initial fetch does not fail the mount: the registry is left
    /// `Errored` and [`Self::refetch`] can retry.
    pub async fn mount(
        api: Arc<dyn LibraryApi>,
        settings: &ChannelSettings,
        token: AuthToken,
    ) -> Self {
        let registry = LibraryRegistry::new();
        let availability = ChannelAvailability::new();

        // Channel first, so events racing the initial fetch are not lost;
        // registry idempotency absorbs any overlap.
        let dispatcher = EventDispatcher::new(
            Arc::clone(&api),
            registry.clone(),
            token.clone(),
        );
        let channel =
            ChannelHandle::open(settings, dispatcher, availability.clone());

        let client = LibraryClient::new(api, registry, availability);
        let session = Self {
            commands: LibraryCommands::new(client),
            token,
            channel,
            fetching: Arc::new(AtomicBool::new(false)),
        };
        info!(
            channel = session.channel.is_some(),
            "library session mounted"
        );

        if let Err(err) = session.refetch().await {
            warn!(error = %err, "initial library fetch failed");
        }
        session
    }

    /// Build the HTTP transport and channel settings from `config`.
    pub async fn mount_with_config(
        config: &ClientConfig,
        token: AuthToken,
    ) -> Result<Self, ConfigError> {
        let settings = config.channel_settings()?;
        let api = HttpLibraryApi::new(
            &config.normalized_server_url(),
            config.request_timeout(),
        )?;
        Ok(Self::mount(Arc::new(api), &settings, token).await)
    }

    /// Re-run the bulk fetch unless one is already outstanding.
    pub async fn refetch(&self) -> LibraryResult<RefetchOutcome> {
        let Some(_slot) = FetchSlot::claim(&self.fetching) else {
            debug!("library fetch already in flight");
            return Ok(RefetchOutcome::AlreadyInFlight);
        };
        let records = self.client().fetch_all(&self.token).await?;
        debug!(fetched = records.len(), "library fetch complete");
        Ok(RefetchOutcome::Completed(self.registry().snapshot().len()))
    }

    pub fn client(&self) -> &LibraryClient {
        self.commands.client()
    }

    pub fn commands(&self) -> &LibraryCommands {
        &self.commands
    }

    pub fn registry(&self) -> &LibraryRegistry {
        self.client().registry()
    }

    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistryState> {
        self.registry().subscribe()
    }

    pub fn snapshot(&self) -> RegistryState {
        self.registry().snapshot()
    }

    pub fn libraries(&self) -> Vec<Library> {
        self.snapshot().items().to_vec()
    }

    /// Channel attached (not degraded) for this session.
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Channel currently connected and delivering events.
    pub fn channel_live(&self) -> bool {
        self.client().channel().is_live()
    }

    pub async fn create(
        &self,
        form: &mut CreateLibraryForm,
    ) -> LibraryResult<Library> {
        self.commands.create(form, &self.token).await
    }

    pub async fn delete(&self, id: LibraryId) -> LibraryResult<DeleteOutcome> {
        self.commands.delete(&self.token, id).await
    }

    /// Close the channel. Outstanding requests are left to finish; nothing
    /// from the channel is applied after this returns.
    pub async fn unmount(mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close().await;
        }
        self.client().channel().set_live(false);
        info!("library session unmounted");
    }
}

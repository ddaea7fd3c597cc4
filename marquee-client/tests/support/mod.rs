#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use marquee_client::api::LibraryApi;
use marquee_client::channel::{ChannelSettings, EventDispatcher};
use marquee_client::{
    AuthToken, ChannelAvailability, Library, LibraryClient, LibraryError,
    LibraryId, LibraryRegistry, LibraryResult, MediaType,
};
use marquee_model::NewLibrary;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Requests the fake has seen, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    FetchAll,
    FetchOne(LibraryId),
    Create(NewLibrary),
    Delete(LibraryId),
}

/// Holds the next call open until the test releases it, to model an
/// outstanding request.
#[derive(Debug, Default)]
pub struct CallGate {
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl CallGate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolves once a call is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    libraries: Vec<Library>,
    next_id: i64,
    calls: Vec<ApiCall>,
    fetch_all_error: Option<LibraryError>,
    fetch_one_error: Option<LibraryError>,
    create_error: Option<LibraryError>,
    delete_error: Option<LibraryError>,
}

/// In-memory server-side library table.
#[derive(Debug, Default)]
pub struct FakeLibraryApi {
    state: Mutex<FakeState>,
    pub fetch_all_gate: CallGate,
    pub fetch_one_gate: CallGate,
    pub delete_gate: CallGate,
}

impl FakeLibraryApi {
    pub fn with_libraries(libraries: Vec<Library>) -> Arc<Self> {
        let next_id = libraries.iter().map(|l| l.id.get()).max().unwrap_or(0);
        Arc::new(Self {
            state: Mutex::new(FakeState {
                libraries,
                next_id,
                ..FakeState::default()
            }),
            ..Self::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::with_libraries(Vec::new())
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&ApiCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| matches(c)).count()
    }

    /// Server-side change that bypasses this client (another user).
    pub fn insert_remote(&self, library: Library) {
        let mut state = self.state.lock();
        state.next_id = state.next_id.max(library.id.get());
        state.libraries.push(library);
    }

    pub fn remove_remote(&self, id: LibraryId) {
        self.state.lock().libraries.retain(|l| l.id != id);
    }

    pub fn fail_fetch_all(&self, error: Option<LibraryError>) {
        self.state.lock().fetch_all_error = error;
    }

    pub fn fail_fetch_one(&self, error: Option<LibraryError>) {
        self.state.lock().fetch_one_error = error;
    }

    pub fn fail_create(&self, error: Option<LibraryError>) {
        self.state.lock().create_error = error;
    }

    pub fn fail_delete(&self, error: Option<LibraryError>) {
        self.state.lock().delete_error = error;
    }

    fn record(&self, call: ApiCall) {
        self.state.lock().calls.push(call);
    }
}

fn not_found(id: LibraryId) -> LibraryError {
    LibraryError::Server {
        status: 404,
        message: format!("library {id} not found"),
    }
}

#[async_trait]
impl LibraryApi for FakeLibraryApi {
    async fn fetch_libraries(
        &self,
        _token: &AuthToken,
    ) -> LibraryResult<Vec<Library>> {
        self.record(ApiCall::FetchAll);
        self.fetch_all_gate.pass().await;
        let state = self.state.lock();
        match &state.fetch_all_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.libraries.clone()),
        }
    }

    async fn fetch_library(
        &self,
        _token: &AuthToken,
        id: LibraryId,
    ) -> LibraryResult<Library> {
        self.record(ApiCall::FetchOne(id));
        self.fetch_one_gate.pass().await;
        let state = self.state.lock();
        if let Some(err) = &state.fetch_one_error {
            return Err(err.clone());
        }
        state
            .libraries
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create_library(
        &self,
        _token: &AuthToken,
        request: &NewLibrary,
    ) -> LibraryResult<Library> {
        self.record(ApiCall::Create(request.clone()));
        let mut state = self.state.lock();
        if let Some(err) = &state.create_error {
            return Err(err.clone());
        }
        state.next_id += 1;
        let library = Library {
            id: LibraryId(state.next_id),
            name: request.name.clone(),
            location: request.location.clone(),
            media_type: request.media_type,
        };
        state.libraries.push(library.clone());
        Ok(library)
    }

    async fn delete_library(
        &self,
        _token: &AuthToken,
        id: LibraryId,
    ) -> LibraryResult<()> {
        self.record(ApiCall::Delete(id));
        self.delete_gate.pass().await;
        let mut state = self.state.lock();
        if let Some(err) = &state.delete_error {
            return Err(err.clone());
        }
        let before = state.libraries.len();
        state.libraries.retain(|l| l.id != id);
        if state.libraries.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

pub fn library(id: i64, name: &str) -> Library {
    Library {
        id: LibraryId(id),
        name: name.to_string(),
        location: format!("/media/{}", name.to_lowercase()),
        media_type: MediaType::Movie,
    }
}

pub fn token() -> AuthToken {
    AuthToken::new("test-session-token")
}

pub fn as_api(fake: &Arc<FakeLibraryApi>) -> Arc<dyn LibraryApi> {
    Arc::clone(fake) as Arc<dyn LibraryApi>
}

/// Fetch client over `fake`, with the channel marked live or not.
pub fn client(fake: &Arc<FakeLibraryApi>, channel_live: bool) -> LibraryClient {
    let availability = ChannelAvailability::new();
    availability.set_live(channel_live);
    LibraryClient::new(as_api(fake), LibraryRegistry::new(), availability)
}

pub fn dispatcher(
    fake: &Arc<FakeLibraryApi>,
    registry: &LibraryRegistry,
) -> EventDispatcher {
    EventDispatcher::new(as_api(fake), registry.clone(), token())
}

/// Channel disabled, as when the server is only reachable over https.
pub fn degraded_settings() -> ChannelSettings {
    ChannelSettings {
        url: "wss://media.example:3012/events/library".to_string(),
        insecure_channel_allowed: false,
        max_retries: 0,
    }
}

/// Channel enabled but pointed at a port nothing listens on; gives up after
/// the first failed connect.
pub fn unreachable_settings() -> ChannelSettings {
    ChannelSettings {
        url: "ws://127.0.0.1:1/events/library".to_string(),
        insecure_channel_allowed: true,
        max_retries: 0,
    }
}

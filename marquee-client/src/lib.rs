//! Marquee client library
//!
//! Keeps a client-side view of the server's library collection consistent
//! across three sources: the bulk fetch, push events on the library topic,
//! and create/delete requests issued by the user.
//!
//! Layout
//! - [`registry`] owns the collection and applies commands; it is the only
//!   writer of library state.
//! - [`client`] talks to the REST endpoints and turns results into
//!   registry commands.
//! - [`channel`] owns the push connection and turns envelopes into the
//!   same commands.
//! - [`guards`] sits between user intent and the client (duplicate delete
//!   suppression, create-form validation).
//! - [`session`] ties the pieces to a consumer's mount/unmount lifecycle.

pub mod api;
pub mod auth;
pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod guards;
pub mod registry;
pub mod session;

pub use api::{HttpLibraryApi, LibraryApi};
pub use auth::AuthToken;
pub use channel::{ChannelAvailability, ChannelHandle, ChannelSettings};
pub use client::LibraryClient;
pub use config::ClientConfig;
pub use error::{LibraryError, LibraryResult, ValidationError};
pub use guards::{
    CreateLibraryForm, DeleteGuard, DeleteOutcome, LibraryCommands,
    LibraryDraft,
};
pub use registry::{
    FetchStatus, LibraryRegistry, RegistryCommand, RegistryState,
};
pub use session::{LibrarySession, RefetchOutcome};

pub use marquee_model::{Library, LibraryEvent, LibraryId, MediaType};

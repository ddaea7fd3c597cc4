//! Core data model definitions shared across Marquee crates.
#![allow(missing_docs)]

pub mod events;
pub mod ids;
pub mod library;
pub mod routes;

// Intentionally curated re-exports for downstream consumers.
pub use events::{EVENT_NEW_LIBRARY, EVENT_REMOVE_LIBRARY, LibraryEvent};
pub use ids::LibraryId;
pub use library::{Library, MediaType, NewLibrary};

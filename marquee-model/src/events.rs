use super::LibraryId;

/// Envelope `type` tag announcing a newly created library.
pub const EVENT_NEW_LIBRARY: &str = "EventNewLibrary";
/// Envelope `type` tag announcing a removed library.
pub const EVENT_REMOVE_LIBRARY: &str = "EventRemoveLibrary";

/// Decoded push notification from the library topic.
///
/// The server only sends the library id; a new library has to be resolved
/// into a full [`crate::Library`] before it can be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    Added(LibraryId),
    Removed(LibraryId),
    /// Any envelope type this client does not understand.
    Unknown { kind: String },
}

impl LibraryEvent {
    pub fn library_id(&self) -> Option<LibraryId> {
        match self {
            LibraryEvent::Added(id) | LibraryEvent::Removed(id) => Some(*id),
            LibraryEvent::Unknown { .. } => None,
        }
    }

    /// The envelope `type` tag this event was decoded from.
    pub fn kind(&self) -> &str {
        match self {
            LibraryEvent::Added(_) => EVENT_NEW_LIBRARY,
            LibraryEvent::Removed(_) => EVENT_REMOVE_LIBRARY,
            LibraryEvent::Unknown { kind } => kind,
        }
    }
}

use crate::LibraryId;

macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Versioned API route definitions used by the Marquee client
pub mod v1 {
    pub const ROOT: &str = "/api/v1";
    pub const VERSION: &str = "v1";

    pub mod library {
        pub const COLLECTION: &str = v1_path!("/library");
        pub const ITEM: &str = v1_path!("/library/{id}");
    }

    pub mod events {
        /// Push topic for library additions and removals.
        pub const LIBRARY: &str = "/events/library";
        /// Port the event socket listens on when not configured explicitly.
        pub const DEFAULT_PORT: u16 = 3012;
    }
}

/// Expand [`v1::library::ITEM`] for one library.
pub fn library_item(id: LibraryId) -> String {
    v1::library::ITEM.replace("{id}", &id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_route_substitutes_id() {
        assert_eq!(library_item(LibraryId(12)), "/api/v1/library/12");
        assert_eq!(v1::library::COLLECTION, "/api/v1/library");
    }
}

/// Server-issued identifier for a library.
///
/// Opaque to the client: it is only compared, hashed and echoed back to the
/// server. Stable for the life of the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LibraryId(pub i64);

impl LibraryId {
    pub fn new(raw: i64) -> Self {
        LibraryId(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for LibraryId {
    fn from(raw: i64) -> Self {
        LibraryId(raw)
    }
}

impl std::fmt::Display for LibraryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LibraryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(LibraryId)
    }
}

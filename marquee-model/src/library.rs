use super::ids::LibraryId;

/// A media-source directory tracked by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub location: String,
    pub media_type: MediaType,
}

/// The type of content a library contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaType {
    #[default]
    Movie,
    Tv,
}

impl MediaType {
    /// Wire name, as the server spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }

    /// Human-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Movie => "Movies",
            MediaType::Tv => "TV Shows",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaType::Movie),
            "tv" | "series" | "shows" => Ok(MediaType::Tv),
            other => Err(format!(
                "unknown media type '{other}' (expected 'movie' or 'tv')"
            )),
        }
    }
}

/// Body of a create-library request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewLibrary {
    pub name: String,
    pub location: String,
    pub media_type: MediaType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_parses_aliases() {
        assert_eq!("Movies".parse::<MediaType>().unwrap(), MediaType::Movie);
        assert_eq!("series".parse::<MediaType>().unwrap(), MediaType::Tv);
        assert!("music".parse::<MediaType>().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn library_uses_server_field_names() {
        let json = r#"{"id":1,"name":"Movies","location":"/m","media_type":"movie"}"#;
        let library: Library = serde_json::from_str(json).unwrap();
        assert_eq!(library.id, LibraryId(1));
        assert_eq!(library.media_type, MediaType::Movie);

        let encoded = serde_json::to_value(&NewLibrary {
            name: "TV".into(),
            location: "/t".into(),
            media_type: MediaType::Tv,
        })
        .unwrap();
        assert_eq!(encoded["media_type"], "tv");
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Secondary text fields carried alongside title, genres and artists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtraField {
    Album,
    AlbumArtist,
    RecordingDate,
    TrackNumber,
    DiscNumber,
    CatalogNumber,
}

impl ExtraField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtraField::Album => "album",
            ExtraField::AlbumArtist => "album_artist",
            ExtraField::RecordingDate => "date",
            ExtraField::TrackNumber => "track",
            ExtraField::DiscNumber => "disc",
            ExtraField::CatalogNumber => "catalog_number",
        }
    }
}

impl fmt::Display for ExtraField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized tag values for one file, independent of container format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagFieldSet {
    pub title: String,
    /// Set semantics, insertion order kept for write-out.
    pub genres: Vec<String>,
    pub artists: Vec<String>,
    pub cover: Option<Arc<Vec<u8>>>,
    pub extra: BTreeMap<ExtraField, String>,
}

impl TagFieldSet {
    /// Adds `genre` unless an equal entry is already present.
    pub fn add_genre(&mut self, genre: &str) {
        if !self.genres.iter().any(|g| g == genre) {
            self.genres.push(genre.to_string());
        }
    }

    pub fn set_extra(&mut self, field: ExtraField, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.extra.insert(field, value);
        }
    }

    pub fn extra(&self, field: ExtraField) -> Option<&str> {
        self.extra.get(&field).map(String::as_str)
    }
}

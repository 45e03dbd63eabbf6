//! Container-specific tag writers built on `lofty`.
//!
//! All variants take the same [`TagFieldSet`]; container differences (tag
//! type, multi-value encoding, header bootstrap) stay inside this module.

use std::io::Cursor;
use std::path::Path;

use log::{debug, warn};
use lofty::config::{ParseOptions, ParsingMode, WriteOptions};
use lofty::error::{ErrorKind, LoftyError};
use lofty::file::TaggedFileExt;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, ItemValue, Tag, TagItem, TagType};

use crate::audio::format::AudioFormat;
use crate::tagging::fields::{ExtraField, TagFieldSet};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("unreadable container: {0}")]
    Corrupt(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WriteError {
    fn from_lofty(err: LoftyError) -> Self {
        match err.kind() {
            ErrorKind::Io(_) => WriteError::Io(std::io::Error::other(err.to_string())),
            _ => WriteError::Corrupt(err.to_string()),
        }
    }
}

/// Writes a field set into one file and saves it in place.
pub trait FormatWriter: Send + Sync {
    fn write(&self, path: &Path, fields: &TagFieldSet) -> Result<(), WriteError>;
}

/// How a container stores several genres or artists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultiValue {
    Joined(&'static str),
    Repeated,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    tag_type: TagType,
    genres: MultiValue,
    artists: MultiValue,
}

/// MP3: ID3v2. Files without any ID3 header get a fresh tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3Writer;

/// FLAC: Vorbis comments.
#[derive(Debug, Default, Clone, Copy)]
pub struct VorbisWriter;

/// M4A/MP4: iTunes-style `ilst` atoms.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp4Writer;

impl FormatWriter for Id3Writer {
    fn write(&self, path: &Path, fields: &TagFieldSet) -> Result<(), WriteError> {
        write_layout(
            path,
            fields,
            Layout {
                tag_type: TagType::Id3v2,
                genres: MultiValue::Joined(";"),
                artists: MultiValue::Joined("/"),
            },
        )
    }
}

impl FormatWriter for VorbisWriter {
    fn write(&self, path: &Path, fields: &TagFieldSet) -> Result<(), WriteError> {
        write_layout(
            path,
            fields,
            Layout {
                tag_type: TagType::VorbisComments,
                genres: MultiValue::Repeated,
                artists: MultiValue::Repeated,
            },
        )
    }
}

impl FormatWriter for Mp4Writer {
    fn write(&self, path: &Path, fields: &TagFieldSet) -> Result<(), WriteError> {
        write_layout(
            path,
            fields,
            Layout {
                tag_type: TagType::Mp4Ilst,
                genres: MultiValue::Joined(", "),
                artists: MultiValue::Joined(", "),
            },
        )
    }
}

/// One writer per supported container, selected by [`AudioFormat`].
pub struct FormatWriters {
    mp3: Box<dyn FormatWriter>,
    flac: Box<dyn FormatWriter>,
    mp4: Box<dyn FormatWriter>,
}

impl Default for FormatWriters {
    fn default() -> Self {
        Self::new(Box::new(Id3Writer), Box::new(VorbisWriter), Box::new(Mp4Writer))
    }
}

impl FormatWriters {
    pub fn new(mp3: Box<dyn FormatWriter>, flac: Box<dyn FormatWriter>, mp4: Box<dyn FormatWriter>) -> Self {
        Self { mp3, flac, mp4 }
    }

    pub fn for_format(&self, format: AudioFormat) -> &dyn FormatWriter {
        match format {
            AudioFormat::Mp3 => self.mp3.as_ref(),
            AudioFormat::Flac => self.flac.as_ref(),
            AudioFormat::M4a | AudioFormat::Mp4 => self.mp4.as_ref(),
        }
    }

    /// Picks the writer by file extension.
    pub fn write(&self, path: &Path, fields: &TagFieldSet) -> Result<(), WriteError> {
        let format = AudioFormat::from_path(path)
            .ok_or_else(|| WriteError::Unsupported(path.display().to_string()))?;
        self.for_format(format).write(path, fields)
    }
}

fn parse_options() -> ParseOptions {
    // Existing pictures must survive the round-trip when no cover is given.
    ParseOptions::new()
        .read_cover_art(true)
        .parsing_mode(ParsingMode::BestAttempt)
}

fn extra_item_key(field: ExtraField) -> ItemKey {
    match field {
        ExtraField::Album => ItemKey::AlbumTitle,
        ExtraField::AlbumArtist => ItemKey::AlbumArtist,
        ExtraField::RecordingDate => ItemKey::RecordingDate,
        ExtraField::TrackNumber => ItemKey::TrackNumber,
        ExtraField::DiscNumber => ItemKey::DiscNumber,
        ExtraField::CatalogNumber => ItemKey::CatalogNumber,
    }
}

fn set_values(tag: &mut Tag, key: ItemKey, values: &[String], style: MultiValue) {
    if values.is_empty() {
        return;
    }
    tag.remove_key(key.clone());
    match style {
        MultiValue::Joined(separator) => {
            tag.insert_text(key.clone(), values.join(separator));
        }
        MultiValue::Repeated => {
            for value in values {
                tag.push(TagItem::new(key.clone(), ItemValue::Text(value.clone())));
            }
        }
    }
}

fn front_cover(data: &[u8]) -> Option<Picture> {
    let detected = match Picture::from_reader(&mut Cursor::new(data)) {
        Ok(picture) => picture,
        Err(e) => {
            warn!("Cover image not recognized, skipping: {}", e);
            return None;
        }
    };
    let mut builder = Picture::unchecked(data.to_vec()).pic_type(PictureType::CoverFront);
    if let Some(mime) = detected.mime_type() {
        builder = builder.mime_type(mime.clone());
    }
    Some(builder.build())
}

fn write_layout(path: &Path, fields: &TagFieldSet, layout: Layout) -> Result<(), WriteError> {
    let mut tagged_file = Probe::open(path)
        .map_err(WriteError::from_lofty)?
        .options(parse_options())
        .read()
        .map_err(WriteError::from_lofty)?;

    let tag_type = layout.tag_type;
    let tag = match tagged_file.tag_mut(tag_type) {
        Some(t) => t,
        None => {
            debug!("{} has no {:?} tag, creating one", path.display(), tag_type);
            tagged_file.insert_tag(Tag::new(tag_type));
            tagged_file.tag_mut(tag_type).ok_or_else(|| {
                WriteError::Unsupported(format!("{} does not support {:?} tags", path.display(), tag_type))
            })?
        }
    };

    tag.insert_text(ItemKey::TrackTitle, fields.title.clone());
    set_values(tag, ItemKey::Genre, &fields.genres, layout.genres);
    set_values(tag, ItemKey::TrackArtist, &fields.artists, layout.artists);
    for (field, value) in &fields.extra {
        tag.insert_text(extra_item_key(*field), value.clone());
    }

    if let Some(picture) = fields.cover.as_deref().and_then(|data| front_cover(data)) {
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(picture);
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(WriteError::from_lofty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values() -> Vec<String> {
        vec!["ASMR".to_string(), "中文".to_string()]
    }

    #[test]
    fn mp4_joins_values_into_one_atom() {
        let mut tag = Tag::new(TagType::Mp4Ilst);
        tag.insert_text(ItemKey::Genre, "old".to_string());

        set_values(&mut tag, ItemKey::Genre, &values(), MultiValue::Joined(", "));

        assert_eq!(tag.get_strings(ItemKey::Genre).collect::<Vec<_>>(), vec!["ASMR, 中文"]);
    }

    #[test]
    fn vorbis_repeats_values() {
        let mut tag = Tag::new(TagType::VorbisComments);
        tag.insert_text(ItemKey::TrackArtist, "old".to_string());

        set_values(&mut tag, ItemKey::TrackArtist, &values(), MultiValue::Repeated);

        assert_eq!(
            tag.get_strings(ItemKey::TrackArtist).collect::<Vec<_>>(),
            vec!["ASMR", "中文"]
        );
    }

    #[test]
    fn empty_values_leave_tag_alone() {
        let mut tag = Tag::new(TagType::Id3v2);
        tag.insert_text(ItemKey::Genre, "kept".to_string());

        set_values(&mut tag, ItemKey::Genre, &[], MultiValue::Joined(";"));

        assert_eq!(tag.get_string(ItemKey::Genre), Some("kept"));
    }

    #[test]
    fn unknown_cover_bytes_are_skipped() {
        assert!(front_cover(b"not an image").is_none());
    }
}

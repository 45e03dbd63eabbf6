//! Metadata record to tag field mapping.
//!
//! [`map_fields`] is a pure function of its inputs. Each configuration flag
//! toggles exactly one rule, applied in this order:
//!
//! 1. base title and genres from the record
//! 2. `add_file_type_suffix`: `-便携版` for MP3, `-高保真` for FLAC
//! 3. `add_sound_effect_suffix`: `-有音效` / `-无音效` from the parent folder name
//! 4. `add_chinese_tag`: genre `中文`, never duplicated

use crate::audio::format::AudioFormat;
use crate::catalog::MetadataRecord;
use crate::config::{Config, SoundEffectKeywords};
use crate::tagging::fields::{ExtraField, TagFieldSet};
use crate::tagging::title::track_title;

pub const PORTABLE_SUFFIX: &str = "-便携版";
pub const HIFI_SUFFIX: &str = "-高保真";
pub const WITH_SOUND_EFFECTS_SUFFIX: &str = "-有音效";
pub const WITHOUT_SOUND_EFFECTS_SUFFIX: &str = "-无音效";
pub const CHINESE_GENRE: &str = "中文";

/// Where a file sits, as far as tagging is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackContext {
    pub format: AudioFormat,
    pub parent_folder_name: String,
    pub file_stem: String,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
}

impl TrackContext {
    pub fn new(format: AudioFormat, parent_folder_name: impl Into<String>) -> Self {
        Self {
            format,
            parent_folder_name: parent_folder_name.into(),
            file_stem: String::new(),
            track_number: None,
            disc_number: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffects {
    Included,
    Excluded,
}

/// Classifies a folder name by the configured keyword lists.
///
/// An affirmative hit lying inside a negative hit (`有音效` in `没有音效`)
/// does not count. Otherwise affirmative keywords win when both lists match.
pub fn detect_sound_effects(folder_name: &str, keywords: &SoundEffectKeywords) -> Option<SoundEffects> {
    let name = folder_name.to_lowercase();
    let hits = |words: &[String]| -> Vec<(usize, usize)> {
        words
            .iter()
            .filter(|w| !w.is_empty())
            .flat_map(|w| {
                let w = w.to_lowercase();
                name.match_indices(w.as_str())
                    .map(|(start, m)| (start, start + m.len()))
                    .collect::<Vec<_>>()
            })
            .collect()
    };

    let negative = hits(&keywords.negative);
    let affirmative = hits(&keywords.affirmative).into_iter().any(|(start, end)| {
        !negative
            .iter()
            .any(|&(n_start, n_end)| n_start <= start && end <= n_end && (n_start, n_end) != (start, end))
    });

    if affirmative {
        Some(SoundEffects::Included)
    } else if !negative.is_empty() {
        Some(SoundEffects::Excluded)
    } else {
        None
    }
}

pub fn map_fields(record: &MetadataRecord, config: &Config, track: &TrackContext) -> TagFieldSet {
    let mut fields = TagFieldSet::default();

    fields.title = if config.track_title_from_file_name && !track.file_stem.is_empty() {
        track_title(&track.file_stem).to_string()
    } else {
        record.work_title.clone()
    };
    for genre in &record.genres {
        fields.add_genre(genre);
    }

    if config.add_file_type_suffix {
        match track.format {
            AudioFormat::Mp3 => fields.title.push_str(PORTABLE_SUFFIX),
            AudioFormat::Flac => fields.title.push_str(HIFI_SUFFIX),
            AudioFormat::M4a | AudioFormat::Mp4 => {}
        }
    }

    if config.add_sound_effect_suffix {
        match detect_sound_effects(&track.parent_folder_name, &config.sound_effect) {
            Some(SoundEffects::Included) => fields.title.push_str(WITH_SOUND_EFFECTS_SUFFIX),
            Some(SoundEffects::Excluded) => fields.title.push_str(WITHOUT_SOUND_EFFECTS_SUFFIX),
            None => {}
        }
    }

    if config.add_chinese_tag {
        fields.add_genre(CHINESE_GENRE);
    }

    fields.artists = record.voice_actors.clone();
    if config.embed_cover {
        fields.cover = record.cover.clone();
    }

    fields.set_extra(ExtraField::Album, record.work_title.as_str());
    fields.set_extra(ExtraField::AlbumArtist, record.circle_name.as_str());
    fields.set_extra(ExtraField::CatalogNumber, record.work_number.to_string());
    if let Some(date) = &record.sale_date {
        fields.set_extra(ExtraField::RecordingDate, date.as_str());
    }
    if let Some(track_number) = track.track_number {
        fields.set_extra(ExtraField::TrackNumber, track_number.to_string());
    }
    if let Some(disc_number) = track.disc_number {
        fields.set_extra(ExtraField::DiscNumber, disc_number.to_string());
    }

    fields
}

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::audio::format::{collect_audio_files, AudioFormat};
use crate::tagging::mapper::TrackContext;
use crate::utils::file_ops::natural_cmp;
use crate::work::number::WorkNumber;

/// One work folder found in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderTask {
    pub work: WorkNumber,
    pub folder: PathBuf,
    pub audio_files: Vec<PathBuf>,
}

/// A file together with everything the mapper needs to know about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTrack {
    pub path: PathBuf,
    pub context: TrackContext,
}

impl FolderTask {
    pub fn new(work: WorkNumber, folder: impl Into<PathBuf>) -> Self {
        Self {
            work,
            folder: folder.into(),
            audio_files: Vec::new(),
        }
    }

    /// Re-reads the folder's supported audio files.
    pub fn refresh_audio_files(&mut self, include_subfolders: bool) -> io::Result<()> {
        self.audio_files = collect_audio_files(&self.folder, include_subfolders)?;
        Ok(())
    }

    pub fn folder_name(&self) -> String {
        file_name(&self.folder)
    }

    /// Assigns track and disc numbers.
    ///
    /// Files are grouped by (directory, format); each group is numbered from
    /// 1 in natural order, and groups become discs when there is more than
    /// one of them.
    pub fn plan_tracks(&self) -> Vec<PlannedTrack> {
        let mut groups: BTreeMap<(String, AudioFormat), Vec<&PathBuf>> = BTreeMap::new();
        for path in &self.audio_files {
            let Some(format) = AudioFormat::from_path(path) else {
                continue;
            };
            let dir = path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            groups.entry((dir, format)).or_default().push(path);
        }

        let mut keys: Vec<(String, AudioFormat)> = groups.keys().cloned().collect();
        keys.sort_by(|(dir_a, fmt_a), (dir_b, fmt_b)| natural_cmp(dir_a, dir_b).then(fmt_a.cmp(fmt_b)));
        let numbered_discs = keys.len() > 1;

        let mut planned = Vec::with_capacity(self.audio_files.len());
        for (disc_index, key) in keys.iter().enumerate() {
            let mut files = groups.remove(key).unwrap_or_default();
            files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));

            for (track_index, path) in files.into_iter().enumerate() {
                let parent = path.parent().map(file_name).unwrap_or_default();
                let mut context = TrackContext::new(key.1, parent);
                context.file_stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                context.track_number = Some(track_index as u32 + 1);
                context.disc_number = numbered_discs.then_some(disc_index as u32 + 1);
                planned.push(PlannedTrack {
                    path: path.clone(),
                    context,
                });
            }
        }
        planned
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

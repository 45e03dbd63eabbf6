use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::utils::file_ops::natural_cmp;

/// Audio containers the tag writers understand.
///
/// Ordering is the disc order used when a folder mixes formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AudioFormat {
    Flac,
    M4a,
    Mp3,
    Mp4,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "flac" => Some(AudioFormat::Flac),
            "m4a" => Some(AudioFormat::M4a),
            "mp3" => Some(AudioFormat::Mp3),
            "mp4" => Some(AudioFormat::Mp4),
            _ => None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Flac => "flac",
            AudioFormat::M4a => "m4a",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

pub fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

/// Lists files under `dir` (direct children only unless `recursive`) that
/// satisfy `keep`, in natural path order.
fn collect_files(dir: &Path, recursive: bool, keep: impl Fn(&Path) -> bool) -> io::Result<Vec<PathBuf>> {
    // Surface an unreadable folder as an error instead of an empty listing.
    std::fs::read_dir(dir)?;

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Error accessing entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            let keep = keep(p);
            if !keep {
                debug!("Skipping non-audio file: {}", p.display());
            }
            keep
        })
        .collect();

    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(files)
}

/// Supported audio files of a work folder.
pub fn collect_audio_files(dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    collect_files(dir, recursive, |p| AudioFormat::from_path(p).is_some())
}

/// WAV files of a work folder, candidates for transcoding.
pub fn collect_wav_files(dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    collect_files(dir, recursive, is_wav)
}

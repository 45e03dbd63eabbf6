use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::audio::format::collect_wav_files;
use crate::catalog::resolver::CatalogResolver;
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::library::task::FolderTask;
use crate::tagging::mapper::map_fields;
use crate::tagging::writer::FormatWriters;
use crate::transcode::Transcoder;
use crate::utils::parallel::{CancellationFlag, ParallelProcessor};
use crate::utils::reporting::RunSummary;
use crate::work::number::WorkNumber;
use crate::{DvtagError, Result};

/// What happened to one work folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    Tagged {
        work: WorkNumber,
        folder: PathBuf,
        files: usize,
        failed_files: usize,
    },
    Skipped {
        work: WorkNumber,
        folder: PathBuf,
        reason: String,
    },
    Failed {
        work: WorkNumber,
        folder: PathBuf,
        reason: String,
    },
    Cancelled {
        work: WorkNumber,
        folder: PathBuf,
    },
}

impl FolderOutcome {
    pub fn work(&self) -> &WorkNumber {
        match self {
            FolderOutcome::Tagged { work, .. }
            | FolderOutcome::Skipped { work, .. }
            | FolderOutcome::Failed { work, .. }
            | FolderOutcome::Cancelled { work, .. } => work,
        }
    }

    pub fn folder(&self) -> &Path {
        match self {
            FolderOutcome::Tagged { folder, .. }
            | FolderOutcome::Skipped { folder, .. }
            | FolderOutcome::Failed { folder, .. }
            | FolderOutcome::Cancelled { folder, .. } => folder,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            FolderOutcome::Tagged { .. } => "tagged",
            FolderOutcome::Skipped { .. } => "skipped",
            FolderOutcome::Failed { .. } => "failed",
            FolderOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

/// Walks a library root and tags every work folder found in it.
pub struct LibraryWalker<'a, C> {
    config: &'a Config,
    resolver: &'a CatalogResolver<C>,
    writers: &'a FormatWriters,
    transcoder: Option<&'a Transcoder>,
    cancel: CancellationFlag,
}

impl<C> ParallelProcessor for LibraryWalker<'_, C> {}

impl<'a, C: CatalogClient> LibraryWalker<'a, C> {
    pub fn new(config: &'a Config, resolver: &'a CatalogResolver<C>, writers: &'a FormatWriters) -> Self {
        Self {
            config,
            resolver,
            writers,
            transcoder: None,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_transcoder(mut self, transcoder: Option<&'a Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Finds work folders under `root`, depth first in file-name order.
    ///
    /// A folder matches on its own name only. Matched folders are not
    /// descended into, so nested work numbers belong to the outer folder.
    pub fn discover(&self, root: &Path) -> Result<Vec<FolderTask>> {
        fs::read_dir(root).map_err(|source| DvtagError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        let mut tasks = Vec::new();
        let mut entries = WalkDir::new(root).min_depth(1).sort_by_file_name().into_iter();
        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Error accessing entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            match WorkNumber::extract(&name) {
                Some(work) => {
                    debug!("[{}] found {}", work, entry.path().display());
                    tasks.push(FolderTask::new(work, entry.path()));
                    entries.skip_current_dir();
                }
                None => debug!("No work number in {}", entry.path().display()),
            }
        }
        Ok(tasks)
    }

    pub fn run(&self, root: &Path) -> Result<RunSummary> {
        let tasks = self.discover(root)?;
        info!("Found {} work folder(s) under {}", tasks.len(), root.display());

        let pool = Self::build_pool(self.config.jobs)?;
        let outcomes = Self::process_cancellable(
            &pool,
            &tasks,
            &self.cancel,
            |task| self.process_folder(task),
            |task| {
                debug!("[{}] not started, run cancelled", task.work);
                FolderOutcome::Cancelled {
                    work: task.work.clone(),
                    folder: task.folder.clone(),
                }
            },
        );
        Ok(RunSummary::new(outcomes))
    }

    /// Transcode, enumerate, resolve, then map and write each file.
    ///
    /// Failures stay inside the folder: a resolve error fails the folder, a
    /// write error fails only that file.
    pub fn process_folder(&self, task: &FolderTask) -> FolderOutcome {
        let work = task.work.clone();
        let folder = task.folder.clone();

        if let Some(transcoder) = self.transcoder {
            self.transcode_folder(task, transcoder);
        }

        let mut task = task.clone();
        if let Err(e) = task.refresh_audio_files(self.config.include_subfolders) {
            error!("[{}] cannot list {}: {}", work, folder.display(), e);
            return FolderOutcome::Failed {
                work,
                folder,
                reason: format!("cannot list folder: {e}"),
            };
        }
        if task.audio_files.is_empty() {
            info!("[{}] no supported audio files in {}", work, folder.display());
            return FolderOutcome::Skipped {
                work,
                folder,
                reason: "no supported audio files".to_string(),
            };
        }

        let record = match self.resolver.resolve(&work) {
            Ok(record) => record,
            Err(e) => {
                error!("[{}] {} ({})", work, e, folder.display());
                return FolderOutcome::Failed {
                    work,
                    folder,
                    reason: e.to_string(),
                };
            }
        };

        let mut files = 0;
        let mut failed_files = 0;
        for track in task.plan_tracks() {
            let fields = map_fields(&record, self.config, &track.context);
            match self.writers.for_format(track.context.format).write(&track.path, &fields) {
                Ok(()) => {
                    debug!("[{}] tagged {}", work, track.path.display());
                    files += 1;
                }
                Err(e) => {
                    error!("[{}] failed to tag {}: {}", work, track.path.display(), e);
                    failed_files += 1;
                }
            }
        }

        if files == 0 {
            return FolderOutcome::Failed {
                work,
                folder,
                reason: format!("none of {failed_files} file(s) could be tagged"),
            };
        }

        info!("[{}] tagged {} file(s) as \"{}\"", work, files, record.work_title);
        FolderOutcome::Tagged {
            work,
            folder,
            files,
            failed_files,
        }
    }

    fn transcode_folder(&self, task: &FolderTask, transcoder: &Transcoder) {
        let wavs = match collect_wav_files(&task.folder, true) {
            Ok(wavs) => wavs,
            Err(e) => {
                warn!("[{}] cannot list WAV files: {}", task.work, e);
                return;
            }
        };
        if wavs.is_empty() {
            return;
        }

        info!(
            "[{}] transcoding {} WAV file(s) to {}",
            task.work,
            wavs.len(),
            transcoder.target().extension()
        );
        for (wav, result) in wavs.iter().zip(transcoder.transcode_all(&wavs)) {
            if let Err(e) = result {
                error!("[{}] cannot transcode {}: {}", task.work, wav.display(), e);
            }
        }
    }
}

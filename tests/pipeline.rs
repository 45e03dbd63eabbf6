use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dvtag::config::RetryConfig;
use dvtag::{
    CatalogClient, CatalogResolver, CatalogResponse, Config, FormatWriter, FormatWriters, LibraryWalker,
    MetadataRecord, ResolveError, TagFieldSet, WorkNumber, WriteError,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct MockCatalog {
    calls: AtomicUsize,
    redirects: Vec<(WorkNumber, WorkNumber)>,
}

impl CatalogClient for MockCatalog {
    fn fetch(&self, work: &WorkNumber) -> Result<CatalogResponse, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((_, to)) = self.redirects.iter().find(|(from, _)| from == work) {
            return Ok(CatalogResponse::Redirect(to.clone()));
        }
        let mut record = MetadataRecord::new(work.clone(), "Test");
        record.genres = vec!["ASMR".to_string()];
        Ok(CatalogResponse::Found(record))
    }
}

type Log = Arc<Mutex<Vec<(PathBuf, TagFieldSet)>>>;

struct RecordingWriter {
    log: Log,
}

impl FormatWriter for RecordingWriter {
    fn write(&self, path: &Path, fields: &TagFieldSet) -> Result<(), WriteError> {
        self.log.lock().unwrap().push((path.to_path_buf(), fields.clone()));
        Ok(())
    }
}

fn recording_writers() -> (FormatWriters, Log) {
    let log: Log = Arc::default();
    let writer = |log: &Log| Box::new(RecordingWriter { log: Arc::clone(log) });
    (FormatWriters::new(writer(&log), writer(&log), writer(&log)), log)
}

fn no_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 1,
        initial_backoff_ms: 0,
    }
}

fn touch(root: &Path, rel: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"").unwrap();
    path
}

#[test]
fn tags_work_folder_and_leaves_others_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let track = touch(dir.path(), "RJ01234567 癒し系/01.mp3");
    touch(dir.path(), "ふつうのフォルダ/01.mp3");

    let config = Config {
        add_file_type_suffix: true,
        add_sound_effect_suffix: true,
        add_chinese_tag: true,
        ..Config::default()
    };
    let resolver = CatalogResolver::new(MockCatalog::default(), no_retry());
    let (writers, log) = recording_writers();

    let summary = LibraryWalker::new(&config, &resolver, &writers)
        .run(dir.path())
        .unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    let (path, fields) = &log[0];
    assert_eq!(path, &track);
    assert_eq!(fields.title, "Test-便携版");
    assert_eq!(fields.genres, vec!["ASMR".to_string(), "中文".to_string()]);
    assert_eq!(summary.tagged_folders(), 1);
    assert_eq!(summary.outcomes().len(), 1);
}

#[test]
fn duplicate_work_folders_share_one_catalog_call() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "disk1/RJ123456 上/01.flac");
    touch(dir.path(), "disk2/[circle] RJ123456/01.flac");
    touch(dir.path(), "disk2/rj123456 copy/01.m4a");

    let config = Config {
        jobs: 3,
        ..Config::default()
    };
    let resolver = CatalogResolver::new(MockCatalog::default(), no_retry());
    let (writers, log) = recording_writers();

    let summary = LibraryWalker::new(&config, &resolver, &writers)
        .run(dir.path())
        .unwrap();

    assert_eq!(summary.tagged_folders(), 3);
    assert_eq!(log.lock().unwrap().len(), 3);
    assert_eq!(resolver.client().calls.load(Ordering::SeqCst), 1);
}

#[test]
fn redirected_work_is_tagged_with_target_metadata() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "RJ01000001/01.mp3");
    touch(dir.path(), "RJ02000002/01.mp3");

    let old: WorkNumber = "RJ01000001".parse().unwrap();
    let new: WorkNumber = "RJ01999999".parse().unwrap();
    let loop_a: WorkNumber = "RJ02000002".parse().unwrap();
    let loop_b: WorkNumber = "RJ02999999".parse().unwrap();
    let catalog = MockCatalog {
        redirects: vec![(old, new), (loop_a.clone(), loop_b.clone()), (loop_b, loop_a)],
        ..MockCatalog::default()
    };
    let config = Config::default();
    let resolver = CatalogResolver::new(catalog, no_retry());
    let (writers, log) = recording_writers();

    let summary = LibraryWalker::new(&config, &resolver, &writers)
        .run(dir.path())
        .unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0].1.extra(dvtag::ExtraField::CatalogNumber),
        Some("RJ01999999")
    );
    assert_eq!(summary.tagged_folders(), 1);
    assert_eq!(summary.failed_folders(), 1);
    assert_eq!(summary.failure_lines().len(), 1);
    assert!(summary.failure_lines()[0].starts_with("[RJ02000002]"));
}

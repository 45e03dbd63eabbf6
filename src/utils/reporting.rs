use std::path::Path;

use csv::Writer;

use crate::library::walker::FolderOutcome;
use crate::Result;

/// Per-folder outcomes of one run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    outcomes: Vec<FolderOutcome>,
}

impl RunSummary {
    pub fn new(outcomes: Vec<FolderOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[FolderOutcome] {
        &self.outcomes
    }

    fn count(&self, pred: impl Fn(&FolderOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }

    pub fn tagged_folders(&self) -> usize {
        self.count(|o| matches!(o, FolderOutcome::Tagged { .. }))
    }

    pub fn skipped_folders(&self) -> usize {
        self.count(|o| matches!(o, FolderOutcome::Skipped { .. }))
    }

    pub fn failed_folders(&self) -> usize {
        self.count(|o| matches!(o, FolderOutcome::Failed { .. }))
    }

    pub fn cancelled_folders(&self) -> usize {
        self.count(|o| matches!(o, FolderOutcome::Cancelled { .. }))
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled_folders() > 0
    }

    pub fn files_written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                FolderOutcome::Tagged { files, .. } => *files,
                _ => 0,
            })
            .sum()
    }

    pub fn files_failed(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                FolderOutcome::Tagged { failed_files, .. } => *failed_files,
                _ => 0,
            })
            .sum()
    }

    /// One line per failed folder or folder with failed files.
    pub fn failure_lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                FolderOutcome::Failed { work, folder, reason } => {
                    Some(format!("[{}] {}: {}", work, folder.display(), reason))
                }
                FolderOutcome::Tagged {
                    work,
                    folder,
                    failed_files,
                    ..
                } if *failed_files > 0 => Some(format!(
                    "[{}] {}: {} file(s) could not be tagged",
                    work,
                    folder.display(),
                    failed_files
                )),
                _ => None,
            })
            .collect()
    }
}

pub struct Reporter;

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn print_summary(&self, summary: &RunSummary) {
        println!("\n=== Run Summary ===");
        println!("Tagged folders:    {}", summary.tagged_folders());
        println!("Skipped folders:   {}", summary.skipped_folders());
        println!("Failed folders:    {}", summary.failed_folders());
        if summary.was_cancelled() {
            println!("Not started:       {}", summary.cancelled_folders());
        }
        println!(
            "Files written:     {} ({} failed)",
            summary.files_written(),
            summary.files_failed()
        );

        let failures = summary.failure_lines();
        if !failures.is_empty() {
            println!("\nFailures:");
            for line in failures {
                println!("  {}", line);
            }
        }
    }

    pub fn write_csv(&self, summary: &RunSummary, output_path: impl AsRef<Path>) -> Result<()> {
        let output_path_ref = output_path.as_ref();
        let mut writer = Writer::from_path(output_path_ref)?;

        writer.write_record(["Work", "Folder", "Status", "Files Written", "Files Failed", "Reason"])?;

        for outcome in summary.outcomes() {
            let (files, failed, reason) = match outcome {
                FolderOutcome::Tagged {
                    files, failed_files, ..
                } => (files.to_string(), failed_files.to_string(), String::new()),
                FolderOutcome::Skipped { reason, .. } | FolderOutcome::Failed { reason, .. } => {
                    (String::new(), String::new(), reason.clone())
                }
                FolderOutcome::Cancelled { .. } => (String::new(), String::new(), String::new()),
            };
            writer.write_record([
                outcome.work().to_string(),
                outcome.folder().display().to_string(),
                outcome.status().to_string(),
                files,
                failed,
                reason,
            ])?;
        }

        writer.flush()?;
        println!("Report generated: {}", output_path_ref.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::number::WorkNumber;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn work(s: &str) -> WorkNumber {
        s.parse().unwrap()
    }

    fn sample() -> RunSummary {
        RunSummary::new(vec![
            FolderOutcome::Tagged {
                work: work("RJ111111"),
                folder: PathBuf::from("lib/RJ111111"),
                files: 3,
                failed_files: 1,
            },
            FolderOutcome::Skipped {
                work: work("RJ222222"),
                folder: PathBuf::from("lib/RJ222222"),
                reason: "no supported audio files".into(),
            },
            FolderOutcome::Failed {
                work: work("VJ333333"),
                folder: PathBuf::from("lib/VJ333333"),
                reason: "work not found: VJ333333".into(),
            },
        ])
    }

    #[test]
    fn counts_by_outcome() {
        let summary = sample();
        assert_eq!(summary.tagged_folders(), 1);
        assert_eq!(summary.skipped_folders(), 1);
        assert_eq!(summary.failed_folders(), 1);
        assert_eq!(summary.files_written(), 3);
        assert_eq!(summary.files_failed(), 1);
        assert!(!summary.was_cancelled());
        assert_eq!(
            summary.failure_lines(),
            vec![
                "[RJ111111] lib/RJ111111: 1 file(s) could not be tagged".to_string(),
                "[VJ333333] lib/VJ333333: work not found: VJ333333".to_string(),
            ]
        );
    }

    #[test]
    fn csv_has_one_row_per_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        Reporter::new().write_csv(&sample(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["RJ111111", "lib/RJ111111", "tagged", "3", "1", ""]);
        assert_eq!(rows[2][2], "failed");
    }
}

//! WAV re-encoding through an external ffmpeg process.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::utils::file_ops::{remove_if_exists, replace_file, temp_sibling};

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("cannot start encoder: {0}")]
    Spawn(#[source] io::Error),
    #[error("encoder failed on {} ({status})", path.display())]
    Failed { path: PathBuf, status: ExitStatus },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeTarget {
    Flac,
    Mp3,
}

impl TranscodeTarget {
    pub fn extension(&self) -> &'static str {
        match self {
            TranscodeTarget::Flac => "flac",
            TranscodeTarget::Mp3 => "mp3",
        }
    }

    /// Encoder options, tried in order until one succeeds.
    fn attempts(&self) -> &'static [&'static [&'static str]] {
        match self {
            TranscodeTarget::Flac => &[
                &["-c:a", "flac", "-compression_level", "0"],
                &["-vn", "-c:a", "flac", "-ar", "44100", "-sample_fmt", "s16", "-ac", "2"],
            ],
            TranscodeTarget::Mp3 => &[&["-c:a", "libmp3lame", "-b:a", "320k"]],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transcoder {
    program: PathBuf,
    target: TranscodeTarget,
}

impl Transcoder {
    pub fn new(program: impl Into<PathBuf>, target: TranscodeTarget) -> Self {
        Self {
            program: program.into(),
            target,
        }
    }

    pub fn target(&self) -> TranscodeTarget {
        self.target
    }

    /// Converts one WAV file. On success the WAV is deleted and the path of
    /// the new file is returned; on failure the WAV is left in place.
    pub fn transcode(&self, wav: &Path) -> Result<PathBuf, TranscodeError> {
        let ext = self.target.extension();
        let temp = temp_sibling(wav, ext);
        let output = wav.with_extension(ext);

        let mut last_error = None;
        for options in self.target.attempts() {
            match self.run_encoder(wav, &temp, options) {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    debug!("Encoder attempt failed for {}: {}", wav.display(), e);
                    last_error = Some(e);
                }
            }
        }

        if let Some(err) = last_error {
            if let Err(cleanup) = remove_if_exists(&temp) {
                warn!("Cannot remove {}: {}", temp.display(), cleanup);
            }
            return Err(err);
        }

        replace_file(&temp, &output)?;
        std::fs::remove_file(wav)?;
        info!("Transcoded {} -> {}", wav.display(), output.display());
        Ok(output)
    }

    /// Transcodes every file on the current rayon pool, keeping input order.
    pub fn transcode_all(&self, wavs: &[PathBuf]) -> Vec<Result<PathBuf, TranscodeError>> {
        wavs.par_iter().map(|wav| self.transcode(wav)).collect()
    }

    fn run_encoder(&self, input: &Path, output: &Path, options: &[&str]) -> Result<(), TranscodeError> {
        let status = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(options)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(TranscodeError::Spawn)?;

        if status.success() {
            Ok(())
        } else {
            Err(TranscodeError::Failed {
                path: input.to_path_buf(),
                status,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    /// Writes a fake encoder that copies its input to the last argument.
    /// With `fail_first`, calls carrying `-compression_level` exit 1.
    fn fake_encoder(dir: &Path, fail_first: bool) -> PathBuf {
        let path = dir.join("fake-ffmpeg");
        let guard = if fail_first {
            "case \"$*\" in *compression_level*) exit 1;; esac\n"
        } else {
            ""
        };
        let script = format!(
            "#!/bin/sh\n{guard}in=\"\"\nprev=\"\"\nfor a in \"$@\"; do\n  if [ \"$prev\" = \"-i\" ]; then in=\"$a\"; fi\n  prev=\"$a\"\n  out=\"$a\"\ndone\ncp \"$in\" \"$out\"\n"
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn failing_encoder(dir: &Path) -> PathBuf {
        let path = dir.join("broken-ffmpeg");
        fs::write(&path, "#!/bin/sh\ntouch \"$(eval echo \\${$#})\"\nexit 3\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn successful_transcode_replaces_wav() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("01 intro.wav");
        fs::write(&wav, b"RIFF").unwrap();

        let transcoder = Transcoder::new(fake_encoder(dir.path(), false), TranscodeTarget::Mp3);
        let out = transcoder.transcode(&wav).unwrap();

        assert_eq!(out, dir.path().join("01 intro.mp3"));
        assert_eq!(fs::read(&out).unwrap(), b"RIFF");
        assert!(!wav.exists());
        assert!(!dir.path().join("01 intro.temp.mp3").exists());
    }

    #[test]
    fn flac_falls_back_to_second_option_set() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("a.wav");
        fs::write(&wav, b"RIFF").unwrap();

        let transcoder = Transcoder::new(fake_encoder(dir.path(), true), TranscodeTarget::Flac);
        let out = transcoder.transcode(&wav).unwrap();

        assert_eq!(out, dir.path().join("a.flac"));
        assert!(!wav.exists());
    }

    #[test]
    fn failure_keeps_wav_and_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("a.wav");
        fs::write(&wav, b"RIFF").unwrap();

        let transcoder = Transcoder::new(failing_encoder(dir.path()), TranscodeTarget::Mp3);
        let err = transcoder.transcode(&wav).unwrap_err();

        assert!(matches!(err, TranscodeError::Failed { .. }));
        assert!(wav.exists());
        assert!(!dir.path().join("a.temp.mp3").exists());
        assert!(!dir.path().join("a.mp3").exists());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("a.wav");
        fs::write(&wav, b"RIFF").unwrap();

        let transcoder = Transcoder::new(dir.path().join("no-such-encoder"), TranscodeTarget::Flac);

        assert!(matches!(transcoder.transcode(&wav), Err(TranscodeError::Spawn(_))));
        assert!(wav.exists());
    }
}

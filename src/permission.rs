use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, ErrorKind, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{CompressorError, Result};
use crate::fstools::existing_ancestor;

const WRITE_PROBE_NAME: &str = ".compress-video-write-test";

/// Asked whether to check again after access was denied.
pub trait Prompt {
    fn retry(&mut self, reason: &str) -> bool;
}

pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn retry(&mut self, reason: &str) -> bool {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return false;
        }
        print!("{}\nGrant access and try again? [y/N] ", reason);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        match stdin.lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// The source must be readable and the output directory (or the ancestor
/// it will be created under) writable. Only actual permission errors count;
/// a missing source is left for later stages to report.
pub fn check_access(source: &Path, output_dir: &Path) -> Result<()> {
    if let Err(err) = File::open(source) {
        if err.kind() == ErrorKind::PermissionDenied {
            return Err(CompressorError::permission(&source.to_path_buf(), "not readable"));
        }
    }

    let dir = existing_ancestor(output_dir).unwrap_or(Path::new("."));
    let probe = dir.join(WRITE_PROBE_NAME);
    match OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            Ok(())
        },
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            Err(CompressorError::permission(&PathBuf::from(dir), "not writable"))
        },
        Err(err) => Err(CompressorError::Io(err)),
    }
}

/// Runs `on_granted` once `check` passes. A denial asks `prompt` whether to
/// check again; `None` means the user gave up.
pub fn check_permission<P, C, F, T>(prompt: &mut P, mut check: C, on_granted: F) -> Option<T>
where
    P: Prompt,
    C: FnMut() -> Result<()>,
    F: FnOnce() -> T,
{
    loop {
        match check() {
            Ok(()) => return Some(on_granted()),
            Err(err) => {
                warn!("storage permission missing: {}", err);
                if !prompt.retry(&err.to_string()) {
                    return None;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct ScriptedPrompt {
        answers: Vec<bool>,
        asked: usize,
    }

    impl Prompt for ScriptedPrompt {
        fn retry(&mut self, _reason: &str) -> bool {
            let answer = self.answers.get(self.asked).copied().unwrap_or(false);
            self.asked += 1;
            answer
        }
    }

    fn denied() -> Result<()> {
        Err(CompressorError::permission(&PathBuf::from("/movies"), "not writable"))
    }

    #[test]
    fn test_granted_runs_immediately() {
        let mut prompt = ScriptedPrompt { answers: vec![], asked: 0 };
        assert_eq!(check_permission(&mut prompt, || Ok(()), || 7), Some(7));
        assert_eq!(prompt.asked, 0);
    }

    #[test]
    fn test_denied_reprompts_until_granted() {
        let mut prompt = ScriptedPrompt { answers: vec![true, true], asked: 0 };
        let attempts = Cell::new(0);
        let result = check_permission(
            &mut prompt,
            || {
                attempts.set(attempts.get() + 1);
                if attempts.get() < 3 { denied() } else { Ok(()) }
            },
            || "picked",
        );
        assert_eq!(result, Some("picked"));
        assert_eq!(attempts.get(), 3);
        assert_eq!(prompt.asked, 2);
    }

    #[test]
    fn test_declined_prompt_gives_up() {
        let mut prompt = ScriptedPrompt { answers: vec![false], asked: 0 };
        let ran = Cell::new(false);
        assert_eq!(check_permission(&mut prompt, denied, || ran.set(true)), None);
        assert!(!ran.get());
    }

    #[test]
    fn test_check_access_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"").unwrap();
        assert!(check_access(&source, &dir.path().join("Movies").join("out")).is_ok());
        assert!(!dir.path().join(WRITE_PROBE_NAME).exists());
    }

    #[test]
    fn test_check_access_missing_source_passes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_access(&dir.path().join("missing.mp4"), dir.path()).is_ok());
    }
}

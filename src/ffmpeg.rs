use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub mod engine;
pub mod probe;
pub mod return_code;
pub mod statistics;

pub struct FFmpeg {
    binary: PathBuf,
}

impl FFmpeg {
    pub fn new() -> Self {
        FFmpeg::with_binary(PathBuf::from("ffmpeg"))
    }

    pub fn with_binary(binary: PathBuf) -> Self {
        FFmpeg { binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn is_installed(&self) -> bool {
        let cmd = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output();
        match cmd {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

impl Default for FFmpeg {
    fn default() -> Self {
        FFmpeg::new()
    }
}

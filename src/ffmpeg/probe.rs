use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use serde::Deserialize;

use crate::error::{CompressorError, Result};

/// Source of a job's total duration, in milliseconds.
pub trait DurationProbe {
    fn duration_ms(&self, path: &Path) -> Result<i64>;
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonOutput {
    pub format: Option<FFProbeJsonFormat>,
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonFormat {
    pub duration: Option<String>,
}

pub struct FFprobe {
    binary: PathBuf,
}

impl FFprobe {
    pub fn new() -> Self {
        FFprobe {
            binary: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for FFprobe {
    fn default() -> Self {
        FFprobe::new()
    }
}

impl DurationProbe for FFprobe {
    fn duration_ms(&self, path: &Path) -> Result<i64> {
        let output = Command::new(&self.binary)
            .args(["-v", "error", "-of", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .output()?;
        if output.status.success() {
            let utf8 = String::from_utf8_lossy(&output.stdout);
            parse_duration_ms(path, &utf8)
        } else {
            Err(CompressorError::for_file(&path.to_path_buf(), "ffprobe did not exit successfully."))
        }
    }
}

fn parse_duration_ms(path: &Path, json: &str) -> Result<i64> {
    let deserialized = serde_json::from_str::<FFProbeJsonOutput>(json)?;
    let duration = deserialized.format
        .and_then(|format| format.duration)
        .ok_or_else(|| CompressorError::for_file(&path.to_path_buf(), "ffprobe reported no duration."))?;
    match duration.parse::<f64>() {
        Ok(seconds) => Ok((seconds * 1000.0).round() as i64),
        Err(_) => Err(CompressorError::for_file(&path.to_path_buf(), &format!("duration '{}' is not a number.", duration))),
    }
}

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CompressorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error parsing {path:?}: {msg}")]
    InputParse { path: PathBuf, msg: String },

    #[error("Unable to decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("There was an error executing ffmpeg: {0}")]
    Spawn(std::io::Error),

    #[error("Job {0} is still running.")]
    JobInFlight(u64),

    #[error("Permission denied for {path:?}: {msg}")]
    PermissionDenied { path: PathBuf, msg: String },
}

impl CompressorError {
    pub fn for_file(path: &PathBuf, msg: &str) -> Self {
        CompressorError::InputParse {
            path: PathBuf::from(path),
            msg: String::from(msg),
        }
    }

    pub fn permission(path: &PathBuf, msg: &str) -> Self {
        CompressorError::PermissionDenied {
            path: PathBuf::from(path),
            msg: String::from(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompressorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CompressorError::for_file(&PathBuf::from("/a.mp4"), "ffprobe did not exit successfully.");
        assert_eq!(err.to_string(), "Error parsing \"/a.mp4\": ffprobe did not exit successfully.");
        assert_eq!(CompressorError::JobInFlight(3).to_string(), "Job 3 is still running.");
    }
}

use std::path::{Path, PathBuf};

use crate::codecs::CodecProfile;

/// Rendered in place of a source that could not be resolved.
pub const UNRESOLVED_SOURCE: &str = "null";

/// A single ffmpeg invocation, kept as one string in the form the user sees
/// it logged. Nothing is quoted or escaped.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscodeCommand {
    line: String,
    destination: PathBuf,
}

impl TranscodeCommand {
    pub fn compose(source: Option<&Path>, destination_stem: &Path, profile: &CodecProfile) -> Self {
        let source = match source {
            Some(path) => path.to_string_lossy().into_owned(),
            None => String::from(UNRESOLVED_SOURCE),
        };
        let destination = output_path(destination_stem, profile);
        let line = format!(
            "-i {} -vsync 2 -async 1 {} -c:v {} {}",
            source,
            profile.options,
            profile.encoder,
            destination.to_string_lossy(),
        );
        TranscodeCommand { line, destination }
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Splits on whitespace, so a path containing spaces ends up as several
    /// arguments.
    pub fn arguments(&self) -> Vec<String> {
        self.line.split_whitespace().map(String::from).collect()
    }
}

pub fn output_path(destination_stem: &Path, profile: &CodecProfile) -> PathBuf {
    PathBuf::from(format!("{}.{}", destination_stem.to_string_lossy(), profile.extension))
}

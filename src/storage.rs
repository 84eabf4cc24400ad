use std::fs;
use std::path::{Path, PathBuf};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::fstools::{classify_file, DirEntryCategory};

pub const INDEX_FILE_NAME: &str = ".media-index.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub display_name: String,
    pub data: PathBuf,
    /// Milliseconds since the epoch.
    pub date_added: i64,
    pub date_modified: i64,
    pub codec: String,
}

impl OutputRecord {
    pub fn for_destination(destination: &Path, codec: &str, now_ms: i64) -> Self {
        OutputRecord {
            display_name: destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            data: destination.to_path_buf(),
            date_added: now_ms,
            date_modified: now_ms,
            codec: String::from(codec),
        }
    }
}

pub trait MediaStore {
    /// Filesystem path behind a content reference, if there is a readable
    /// video file there.
    fn resolve(&self, reference: &str) -> Option<PathBuf>;

    fn register(&self, record: &OutputRecord) -> Result<()>;
}

pub struct LocalMediaStore {
    index: PathBuf,
}

impl LocalMediaStore {
    pub fn new(output_dir: &Path) -> Self {
        LocalMediaStore {
            index: output_dir.join(INDEX_FILE_NAME),
        }
    }

    pub fn records(&self) -> Result<Vec<OutputRecord>> {
        if !self.index.exists() {
            return Ok(vec![]);
        }
        let json = fs::read_to_string(&self.index)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl MediaStore for LocalMediaStore {
    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let path = reference_path(reference);
        let result = match classify_file(&path) {
            DirEntryCategory::RegularFile => Some(path),
            DirEntryCategory::SymbolicLink => match fs::canonicalize(&path) {
                Ok(target) if target.is_file() => Some(target),
                Ok(target) => {
                    warn!("{:?} points at {:?}, which is not a file.", path, target);
                    None
                },
                Err(err) => {
                    warn!("Unable to follow symlink {:?}: {}", path, err);
                    None
                },
            },
            DirEntryCategory::Directory => {
                warn!("{:?} is a directory.", path);
                None
            },
            DirEntryCategory::DoesNotExist => {
                warn!("{:?} does not exist.", path);
                None
            },
            DirEntryCategory::Unknown => {
                warn!("Unable to classify {:?}.", path);
                None
            },
        };
        debug!("Path : {:?}", result);
        result
    }

    fn register(&self, record: &OutputRecord) -> Result<()> {
        let mut records = self.records()?;
        records.push(record.clone());
        fs::write(&self.index, serde_json::to_string_pretty(&records)?)?;
        debug!("registered {:?} in {:?}", record.data, self.index);
        Ok(())
    }
}

/// Strips a `file://` scheme (and an optional `localhost` authority) and
/// decodes percent escapes. Anything else is taken as a path.
pub fn reference_path(reference: &str) -> PathBuf {
    match reference.strip_prefix("file://") {
        Some(rest) => {
            let rest = rest.strip_prefix("localhost").unwrap_or(rest);
            PathBuf::from(percent_decode_str(rest).decode_utf8_lossy().into_owned())
        },
        None => PathBuf::from(reference),
    }
}

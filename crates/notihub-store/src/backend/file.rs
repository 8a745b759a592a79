//! File-backed storage: one document per key in a directory.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use tracing::debug;

use notihub_core::error::{AppError, ErrorKind};
use notihub_core::result::AppResult;
use notihub_core::traits::DurableStorage;

const FILE_EXTENSION: &str = "json";

/// Durable storage rooted at a directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash never leaves a half-written document behind.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create the storage, creating the root directory if needed.
    pub fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{FILE_EXTENSION}", encode_key(key)))
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read key: {key}"),
                e,
            )),
        }
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write key: {key}"), e)
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to commit key: {key}"), e)
        })?;
        debug!(key, bytes = value.len(), "Wrote storage key");
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete key: {key}"),
                e,
            )),
        }
    }

    fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(key) = decode_key(stem) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

/// Alphanumerics, `-` and `_` pass through; everything else is `%XX`.
const KEY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ESCAPE).to_string()
}

fn decode_key(name: &str) -> Option<String> {
    percent_decode_str(name)
        .decode_utf8()
        .ok()
        .map(|key| key.into_owned())
}

//! Synthesized audio resources.

use std::io::Write;
use std::path::Path;

use tempfile::TempPath;

use crate::error::Result;

/// A synthesized audio payload materialized on disk.
///
/// The backing file is deleted when the resource is dropped, so a locator is
/// only meaningful while the owning process holds the resource.
#[derive(Debug)]
pub struct AudioResource {
    path: TempPath,
    format: String,
    size: usize,
}

impl AudioResource {
    /// Write `bytes` to a fresh temporary file named `caverna-*.{format}`.
    pub fn from_bytes(bytes: &[u8], format: &str) -> Result<Self> {
        let suffix = format!(".{}", format);
        let mut file = tempfile::Builder::new()
            .prefix("caverna-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            path: file.into_temp_path(),
            format: format.to_string(),
            size: bytes.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file://` URL for the resource.
    pub fn locator(&self) -> String {
        url::Url::from_file_path(&self.path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| self.path.display().to_string())
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Result of asking for narrated audio.
///
/// `Unavailable` is not an error: it tells the caller to use on-device
/// narration instead.
#[derive(Debug)]
pub enum AudioOutcome {
    Ready(AudioResource),
    Unavailable,
}

impl AudioOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, AudioOutcome::Ready(_))
    }

    pub fn into_resource(self) -> Option<AudioResource> {
        match self {
            AudioOutcome::Ready(resource) => Some(resource),
            AudioOutcome::Unavailable => None,
        }
    }
}

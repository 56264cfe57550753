use std::path::PathBuf;

use thiserror::Error;

/// Rejected assignment request. The table is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("video index {index} out of range ({len} videos selected)")]
    InvalidVideo { index: usize, len: usize },

    #[error("display index {index} out of range ({len} displays available)")]
    InvalidDisplay { index: usize, len: usize },
}

/// A single locator that could not produce a playback handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to open {} (item {index}): {reason}", .locator.display())]
pub struct MediaOpenError {
    pub index: usize,
    pub locator: PathBuf,
    pub reason: String,
}

/// Window or render surface creation failed for one display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("display {display}: {reason}")]
pub struct SurfaceError {
    pub display: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("select at least one video and assign it to a screen")]
    NotReady,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

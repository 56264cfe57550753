//! Timing instrumentation for GStreamer playback operations.
//!
//! Seeks and state changes can stall on busy pipelines; every call made by
//! the playback handles goes through here so slow operations show up in the
//! log with the handle that caused them.

use std::time::Instant;

/// Log categories for filtering
enum LogCategory {
    Seek,
    State,
}

impl LogCategory {
    fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Seek => "SEEK",
            LogCategory::State => "STATE",
        }
    }
}

/// Log the start of a rewind to position zero
pub fn log_seek_start(label: &str) -> Instant {
    log::debug!("[{}] {} seek to zero START", LogCategory::Seek.as_str(), label);
    Instant::now()
}

/// Log the completion of a seek operation
pub fn log_seek_complete(label: &str, start: Instant) {
    let elapsed_ms = start.elapsed().as_millis();

    if elapsed_ms > 2000 {
        log::error!(
            "[{}] {} seek DEADLOCK SUSPECTED: {}ms",
            LogCategory::Seek.as_str(),
            label,
            elapsed_ms
        );
    } else if elapsed_ms > 500 {
        log::warn!(
            "[{}] {} seek SLOW: {}ms",
            LogCategory::Seek.as_str(),
            label,
            elapsed_ms
        );
    } else {
        log::debug!(
            "[{}] {} seek COMPLETE: {}ms",
            LogCategory::Seek.as_str(),
            label,
            elapsed_ms
        );
    }
}

/// Log a seek error
pub fn log_seek_error(label: &str, error: &str, start: Instant) {
    log::error!(
        "[{}] {} seek ERROR after {}ms: {}",
        LogCategory::Seek.as_str(),
        label,
        start.elapsed().as_millis(),
        error
    );
}

/// Log the start of a play/pause transition
pub fn log_state_start(label: &str, playing: bool) -> Instant {
    log::trace!(
        "[{}] {} -> {} START",
        LogCategory::State.as_str(),
        label,
        if playing { "playing" } else { "paused" }
    );
    Instant::now()
}

/// Log the completion of a play/pause transition
pub fn log_state_complete(label: &str, playing: bool, start: Instant) {
    let elapsed_ms = start.elapsed().as_millis();
    let target = if playing { "playing" } else { "paused" };

    if elapsed_ms > 500 {
        log::warn!(
            "[{}] {} -> {} SLOW: {}ms",
            LogCategory::State.as_str(),
            label,
            target,
            elapsed_ms
        );
    } else {
        log::trace!(
            "[{}] {} -> {} COMPLETE: {}ms",
            LogCategory::State.as_str(),
            label,
            target,
            elapsed_ms
        );
    }
}

/// Log handle creation
pub fn log_handle_created(label: &str, path: &str) {
    log::info!("Playback handle created: {} ({})", label, path);
}

/// Log handle destruction
pub fn log_handle_destroyed(label: &str) {
    log::debug!("Playback handle destroyed: {}", label);
}

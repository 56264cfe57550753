//! Background bus watcher for the audio pipeline.
//!
//! Audio has no widget driving it, so end-of-stream looping and error
//! reporting happen on a dedicated thread that lives as long as the handle.

use gstreamer as gst;
use gstreamer::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Flags shared between an audio handle and its watcher thread.
#[derive(Clone, Default)]
pub struct WatchFlags {
    pub looping: Arc<AtomicBool>,
    pub stop: Arc<AtomicBool>,
}

/// Spawns a thread that rewinds `pipeline` on end-of-stream while looping is
/// enabled and logs errors, until `flags.stop` is set.
pub fn spawn_bus_watcher(label: String, pipeline: gst::Element, flags: WatchFlags) {
    let Some(bus) = pipeline.bus() else {
        log::warn!("{} has no bus, looping disabled", label);
        return;
    };

    let spawned = thread::Builder::new()
        .name(format!("gst-bus-{}", label))
        .spawn(move || {
            log::debug!("Bus watcher started for {}", label);

            while !flags.stop.load(Ordering::Acquire) {
                let Some(msg) = bus.timed_pop(gst::ClockTime::from_mseconds(100)) else {
                    continue;
                };

                use gst::MessageView;
                match msg.view() {
                    MessageView::Eos(_) => {
                        if flags.looping.load(Ordering::Acquire) {
                            log::debug!("{} reached end of stream, looping", label);
                            let start = crate::gst_logger::log_seek_start(&label);
                            match pipeline.seek_simple(
                                gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
                                gst::ClockTime::ZERO,
                            ) {
                                Ok(()) => crate::gst_logger::log_seek_complete(&label, start),
                                Err(e) => {
                                    crate::gst_logger::log_seek_error(&label, &e.to_string(), start)
                                }
                            }
                        } else {
                            log::debug!("{} reached end of stream", label);
                        }
                    }
                    MessageView::Error(err) => {
                        log::error!(
                            "GStreamer error on {}: {} (debug: {:?})",
                            label,
                            err.error(),
                            err.debug()
                        );
                    }
                    MessageView::Warning(warn) => {
                        log::warn!(
                            "GStreamer warning on {}: {} (debug: {:?})",
                            label,
                            warn.error(),
                            warn.debug()
                        );
                    }
                    _ => {}
                }
            }

            log::debug!("Bus watcher stopped for {}", label);
        });

    if let Err(e) = spawned {
        log::error!("Failed to spawn bus watcher thread: {}", e);
    }
}

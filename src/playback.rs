//! GStreamer-backed playback handles.
//!
//! Videos are `iced_video_player` pipelines so they can be drawn by the
//! `VideoPlayer` widget. The background audio track is a bare `playbin`
//! looped by a bus watcher thread.

use gstreamer as gst;
use gstreamer::prelude::*;
use iced_video_player::Video;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::bus_watcher::{self, WatchFlags};
use crate::gst_logger;
use crate::media::{MediaEngine, PlaybackHandle};
use crate::monitor::FrameProbe;

/// Opens local files into GStreamer pipelines.
pub struct GstEngine {
    // Serialises pipeline construction; concurrent prerolls can deadlock on FLUSH_START.
    init_lock: Mutex<()>,
    next_id: AtomicU64,
}

impl GstEngine {
    pub fn new() -> Result<Self, gst::glib::Error> {
        gst::init()?;
        log::info!("GStreamer initialised: {}", gst::version_string());
        Ok(GstEngine {
            init_lock: Mutex::new(()),
            next_id: AtomicU64::new(0),
        })
    }

    fn label(&self, kind: &str) -> String {
        format!("{}-{}", kind, self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn file_url(path: &Path) -> Result<url::Url, String> {
    std::fs::metadata(path).map_err(|e| format!("file not found: {}", e))?;
    url::Url::from_file_path(path).map_err(|_| "invalid file path".to_string())
}

impl MediaEngine for GstEngine {
    type Video = VideoHandle;
    type Audio = AudioHandle;

    fn open_video(&self, locator: &Path) -> Result<VideoHandle, String> {
        let url = file_url(locator)?;
        let _guard = self
            .init_lock
            .lock()
            .map_err(|_| "pipeline lock poisoned".to_string())?;

        let video = Video::new(&url).map_err(|e| e.to_string())?;
        let label = self.label("video");
        let frame_counter = FrameCounter::install(&label, &video.pipeline());
        gst_logger::log_handle_created(&label, &locator.display().to_string());

        Ok(VideoHandle {
            label,
            video,
            frame_counter,
        })
    }

    fn open_audio(&self, locator: &Path) -> Result<AudioHandle, String> {
        let url = file_url(locator)?;
        let _guard = self
            .init_lock
            .lock()
            .map_err(|_| "pipeline lock poisoned".to_string())?;

        let label = self.label("audio");
        let pipeline = gst::ElementFactory::make("playbin")
            .name(label.as_str())
            .property("uri", url.as_str())
            .build()
            .map_err(|e| e.to_string())?;
        pipeline
            .set_state(gst::State::Paused)
            .map_err(|e| format!("failed to preroll audio: {}", e))?;

        let flags = WatchFlags::default();
        bus_watcher::spawn_bus_watcher(label.clone(), pipeline.clone(), flags.clone());
        gst_logger::log_handle_created(&label, &locator.display().to_string());

        Ok(AudioHandle {
            label,
            pipeline,
            flags,
        })
    }
}

/// Counts buffers reaching a pipeline's video sink.
struct FrameCounter {
    frames: Arc<AtomicU64>,
    pad: gst::Pad,
    probe: Option<gst::PadProbeId>,
}

impl FrameCounter {
    fn install(label: &str, pipeline: &gst::Pipeline) -> Option<Self> {
        let sink: Option<gst::Element> = pipeline.property("video-sink");
        let Some(pad) = sink.and_then(|sink| sink.static_pad("sink")) else {
            log::warn!("{} has no video sink pad, render rate unavailable", label);
            return None;
        };

        let frames = Arc::new(AtomicU64::new(0));
        let counter = frames.clone();
        let probe = pad.add_probe(gst::PadProbeType::BUFFER, move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
            gst::PadProbeReturn::Ok
        });

        Some(FrameCounter { frames, pad, probe })
    }
}

impl Drop for FrameCounter {
    fn drop(&mut self) {
        if let Some(probe) = self.probe.take() {
            self.pad.remove_probe(probe);
        }
    }
}

/// Frame availability derived from the sink buffer counter. Holds only the
/// counter, never the pipeline.
struct CounterProbe {
    frames: Arc<AtomicU64>,
    seen: u64,
}

impl FrameProbe for CounterProbe {
    fn has_new_frame(&mut self, _at: Instant) -> bool {
        self.frames.load(Ordering::Relaxed) != self.seen
    }

    fn consume_frame(&mut self, _at: Instant) {
        self.seen = self.frames.load(Ordering::Relaxed);
    }
}

pub struct VideoHandle {
    label: String,
    video: Video,
    frame_counter: Option<FrameCounter>,
}

impl VideoHandle {
    pub fn video(&self) -> &Video {
        &self.video
    }

    fn set_paused(&mut self, paused: bool) {
        let start = gst_logger::log_state_start(&self.label, !paused);
        self.video.set_paused(paused);
        gst_logger::log_state_complete(&self.label, !paused, start);
    }
}

impl PlaybackHandle for VideoHandle {
    fn play(&mut self) {
        self.set_paused(false);
    }

    fn pause(&mut self) {
        self.set_paused(true);
    }

    fn seek_zero(&mut self) {
        let start = gst_logger::log_seek_start(&self.label);
        match self.video.seek(Duration::ZERO, true) {
            Ok(()) => gst_logger::log_seek_complete(&self.label, start),
            Err(e) => gst_logger::log_seek_error(&self.label, &e.to_string(), start),
        }
    }

    fn set_looping(&mut self, looping: bool) {
        self.video.set_looping(looping);
    }

    fn set_muted(&mut self, muted: bool) {
        self.video.set_muted(muted);
    }

    fn frame_probe(&self) -> Option<Box<dyn FrameProbe>> {
        self.frame_counter.as_ref().map(|counter| {
            let frames = counter.frames.clone();
            let seen = frames.load(Ordering::Relaxed);
            Box::new(CounterProbe { frames, seen }) as Box<dyn FrameProbe>
        })
    }
}

impl Drop for VideoHandle {
    fn drop(&mut self) {
        gst_logger::log_handle_destroyed(&self.label);
    }
}

pub struct AudioHandle {
    label: String,
    pipeline: gst::Element,
    flags: WatchFlags,
}

impl AudioHandle {
    fn set_state(&mut self, playing: bool) {
        let target = if playing {
            gst::State::Playing
        } else {
            gst::State::Paused
        };
        let start = gst_logger::log_state_start(&self.label, playing);
        if let Err(e) = self.pipeline.set_state(target) {
            log::error!("{} failed to change state: {}", self.label, e);
        }
        gst_logger::log_state_complete(&self.label, playing, start);
    }
}

impl PlaybackHandle for AudioHandle {
    fn play(&mut self) {
        self.set_state(true);
    }

    fn pause(&mut self) {
        self.set_state(false);
    }

    fn seek_zero(&mut self) {
        let start = gst_logger::log_seek_start(&self.label);
        match self.pipeline.seek_simple(
            gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
            gst::ClockTime::ZERO,
        ) {
            Ok(()) => gst_logger::log_seek_complete(&self.label, start),
            Err(e) => gst_logger::log_seek_error(&self.label, &e.to_string(), start),
        }
    }

    fn set_looping(&mut self, looping: bool) {
        self.flags.looping.store(looping, Ordering::Release);
    }

    fn set_muted(&mut self, muted: bool) {
        self.pipeline.set_property("mute", muted);
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        self.flags.stop.store(true, Ordering::Release);
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            log::warn!("{} failed to shut down: {}", self.label, e);
        }
        gst_logger::log_handle_destroyed(&self.label);
    }
}

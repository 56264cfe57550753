//! Selected media and the playback handles derived from it.

use std::path::{Path, PathBuf};

use crate::error::MediaOpenError;
use crate::monitor::FrameProbe;

/// Control surface of one opened media resource.
pub trait PlaybackHandle {
    fn play(&mut self);
    fn pause(&mut self);
    /// Seek back to position zero.
    fn seek_zero(&mut self);
    fn set_looping(&mut self, looping: bool);
    fn set_muted(&mut self, muted: bool);

    /// Frame availability query for render-rate measurement, if the handle
    /// renders video.
    fn frame_probe(&self) -> Option<Box<dyn FrameProbe>> {
        None
    }
}

/// Opens locators into playback handles. Opening may fail per locator.
pub trait MediaEngine {
    type Video: PlaybackHandle;
    type Audio: PlaybackHandle;

    fn open_video(&self, locator: &Path) -> Result<Self::Video, String>;
    fn open_audio(&self, locator: &Path) -> Result<Self::Audio, String>;
}

/// One selected video with its inline preview and external output handles.
pub struct MediaItem<V> {
    pub locator: PathBuf,
    pub preview: V,
    pub output: V,
}

impl<V> MediaItem<V> {
    pub fn file_name(&self) -> String {
        display_name(&self.locator)
    }
}

/// Background audio, looped forever while a session runs.
pub struct AudioTrack<A> {
    pub locator: PathBuf,
    pub handle: A,
}

impl<A> AudioTrack<A> {
    pub fn file_name(&self) -> String {
        display_name(&self.locator)
    }
}

/// Outcome of replacing the video selection.
#[derive(Debug, Default)]
pub struct SelectionReport {
    pub opened: usize,
    pub failures: Vec<MediaOpenError>,
}

/// Owns the selected media.
///
/// Replacing the selection drops every previously derived handle. Callers must
/// stop an active session first; the orchestrator additionally checks
/// [`MediaStore::generation`] before touching index-addressed handles.
pub struct MediaStore<E: MediaEngine> {
    engine: E,
    items: Vec<MediaItem<E::Video>>,
    audio: Option<AudioTrack<E::Audio>>,
    generation: u64,
    mute_outputs: bool,
}

impl<E: MediaEngine> MediaStore<E> {
    pub fn new(engine: E, mute_outputs: bool) -> Self {
        MediaStore {
            engine,
            items: Vec::new(),
            audio: None,
            generation: 0,
            mute_outputs,
        }
    }

    /// Replace the whole selection. A locator that fails to open is reported
    /// and skipped; the rest of the batch is still loaded.
    pub fn set_selection(&mut self, locators: Vec<PathBuf>) -> SelectionReport {
        let mut report = SelectionReport::default();
        let mut items = Vec::with_capacity(locators.len());

        for (index, locator) in locators.into_iter().enumerate() {
            match self.open_item(&locator) {
                Ok(item) => {
                    log::info!(
                        "Video opened: index={}, path={}",
                        index,
                        locator.display()
                    );
                    items.push(item);
                }
                Err(reason) => {
                    let error = MediaOpenError {
                        index,
                        locator,
                        reason,
                    };
                    log::warn!("{}", error);
                    report.failures.push(error);
                }
            }
        }

        report.opened = items.len();
        self.items = items;
        self.generation += 1;
        log::info!(
            "Selection replaced: {} videos, {} failures, generation={}",
            report.opened,
            report.failures.len(),
            self.generation
        );
        report
    }

    fn open_item(&self, locator: &Path) -> Result<MediaItem<E::Video>, String> {
        let mut preview = self.engine.open_video(locator)?;
        let mut output = self.engine.open_video(locator)?;

        preview.set_muted(true);
        preview.set_looping(true);
        preview.play();

        output.set_muted(self.mute_outputs);
        output.set_looping(true);
        output.pause();

        Ok(MediaItem {
            locator: locator.to_path_buf(),
            preview,
            output,
        })
    }

    /// Replace the background audio track. `None` removes it.
    pub fn set_audio(&mut self, locator: Option<PathBuf>) -> Result<(), MediaOpenError> {
        let Some(locator) = locator else {
            if self.audio.take().is_some() {
                log::info!("Audio track removed");
            }
            return Ok(());
        };

        match self.engine.open_audio(&locator) {
            Ok(mut handle) => {
                handle.set_looping(true);
                handle.pause();
                log::info!("Audio opened: {}", locator.display());
                self.audio = Some(AudioTrack { locator, handle });
                Ok(())
            }
            Err(reason) => {
                let error = MediaOpenError {
                    index: 0,
                    locator,
                    reason,
                };
                log::warn!("{}", error);
                Err(error)
            }
        }
    }

    pub fn items(&self) -> &[MediaItem<E::Video>] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&MediaItem<E::Video>> {
        self.items.get(index)
    }

    pub fn output_mut(&mut self, index: usize) -> Option<&mut E::Video> {
        self.items.get_mut(index).map(|item| &mut item.output)
    }

    pub fn outputs_mut(&mut self) -> impl Iterator<Item = &mut E::Video> {
        self.items.iter_mut().map(|item| &mut item.output)
    }

    pub fn audio(&self) -> Option<&AudioTrack<E::Audio>> {
        self.audio.as_ref()
    }

    pub fn audio_mut(&mut self) -> Option<&mut E::Audio> {
        self.audio.as_mut().map(|track| &mut track.handle)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bumped on every selection replacement.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

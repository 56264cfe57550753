//! Multi-screen playback orchestration.
//!
//! A session owns one borderless, always-on-top window per display that has
//! at least one video assigned. Displays shared by several videos are split
//! into equal-width strips, left to right in selection order. Windows,
//! surfaces and their render-rate monitors live exactly as long as the
//! session.

use std::fmt;

use crate::assignment::AssignmentTable;
use crate::display::{Bounds, DisplayDescriptor, DisplayId};
use crate::error::{StartError, SurfaceError};
use crate::media::{MediaEngine, MediaStore, PlaybackHandle};
use crate::monitor::{RefreshSignal, RenderRateMonitor};
use crate::sync;

/// Creates and destroys output windows on behalf of the orchestrator.
pub trait WindowHost {
    type WindowId: Copy + Eq + fmt::Debug;

    /// Open a chrome-less, top-most window covering the display's bounds.
    fn create_window(&mut self, display: &DisplayDescriptor) -> Result<Self::WindowId, String>;

    /// Bind a render surface to `region`, in window coordinates.
    fn attach_surface(&mut self, window: Self::WindowId, region: &Bounds) -> Result<(), String>;

    /// Close a window. Closing twice is harmless.
    fn close_window(&mut self, window: Self::WindowId);

    fn refresh_signal(&self, display: &DisplayDescriptor) -> Option<Box<dyn RefreshSignal>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting,
    Active,
    Stopping,
}

/// One video region inside an output window.
pub struct Surface {
    pub region: Bounds,
    pub video: usize,
    pub monitor: Option<RenderRateMonitor>,
}

pub struct ActiveWindow<W> {
    pub window: W,
    pub display: DisplayId,
    pub display_index: usize,
    pub refresh_hz: f32,
    pub surfaces: Vec<Surface>,
}

pub struct PlaybackSession<W> {
    pub windows: Vec<ActiveWindow<W>>,
    /// Media generation the session's video indices refer to.
    pub generation: u64,
    pub audio_started: bool,
}

impl<W: Copy + Eq> PlaybackSession<W> {
    pub fn window(&self, id: W) -> Option<&ActiveWindow<W>> {
        self.windows.iter().find(|w| w.window == id)
    }
}

#[derive(Debug, Default)]
pub struct StartReport {
    pub started: Vec<DisplayId>,
    pub failures: Vec<SurfaceError>,
}

/// Equal-width side-by-side strips covering `bounds`, in window coordinates.
pub fn split_regions(bounds: &Bounds, count: usize) -> Vec<Bounds> {
    if count == 0 {
        return Vec::new();
    }
    let width = bounds.width / count as f32;
    (0..count)
        .map(|i| Bounds::new(i as f32 * width, 0.0, width, bounds.height))
        .collect()
}

pub struct Orchestrator<H: WindowHost> {
    host: H,
    phase: Phase,
    session: Option<PlaybackSession<H::WindowId>>,
}

impl<H: WindowHost> Orchestrator<H> {
    pub fn new(host: H) -> Self {
        Orchestrator {
            host,
            phase: Phase::Idle,
            session: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase() == Phase::Active
    }

    pub fn session(&self) -> Option<&PlaybackSession<H::WindowId>> {
        self.session.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Start a session from the current assignments.
    ///
    /// A running session is stopped first. Displays whose window or surfaces
    /// cannot be created are skipped and reported; if none start the
    /// orchestrator stays idle.
    pub fn start<E: MediaEngine>(
        &mut self,
        store: &mut MediaStore<E>,
        table: &AssignmentTable,
        displays: &[DisplayDescriptor],
    ) -> Result<StartReport, StartError> {
        if store.is_empty() || table.len() != store.len() || !table.is_ready_for_playback() {
            log::info!("Start requested but nothing is assigned");
            return Err(StartError::NotReady);
        }

        if self.session.is_some() {
            log::info!("Restarting playback, tearing down previous session");
            self.stop(store);
        }

        self.phase = Phase::Starting;
        let mut report = StartReport::default();
        let mut session = PlaybackSession {
            windows: Vec::new(),
            generation: store.generation(),
            audio_started: false,
        };

        for display_index in table.used_displays() {
            let Some(display) = displays.get(display_index) else {
                report.failures.push(SurfaceError {
                    display: display_index,
                    reason: "display is no longer connected".to_string(),
                });
                continue;
            };
            let videos = table.videos_for_display(display_index);

            match self.open_display(store, display_index, display, &videos) {
                Ok(window) => {
                    log::info!(
                        "Display {} ({}) showing videos {:?}",
                        display_index,
                        display.id,
                        videos
                    );
                    report.started.push(display.id);
                    session.windows.push(window);
                }
                Err(error) => {
                    log::warn!("Skipping {}", error);
                    report.failures.push(error);
                }
            }
        }

        if session.windows.is_empty() {
            log::warn!(
                "No display could be started ({} failures)",
                report.failures.len()
            );
            self.phase = Phase::Idle;
            return Ok(report);
        }

        let videos: Vec<usize> = session
            .windows
            .iter()
            .flat_map(|w| w.surfaces.iter().map(|s| s.video))
            .collect();
        sync::synchronized_start(store, &videos);

        if let Some(audio) = store.audio_mut() {
            audio.seek_zero();
            audio.play();
            session.audio_started = true;
        }

        log::info!(
            "Playback started on {} displays ({} videos, audio={})",
            session.windows.len(),
            videos.len(),
            session.audio_started
        );
        self.session = Some(session);
        self.phase = Phase::Active;
        Ok(report)
    }

    fn open_display<E: MediaEngine>(
        &mut self,
        store: &MediaStore<E>,
        display_index: usize,
        display: &DisplayDescriptor,
        videos: &[usize],
    ) -> Result<ActiveWindow<H::WindowId>, SurfaceError> {
        let failure = |reason: String| SurfaceError {
            display: display_index,
            reason,
        };

        if !display.bounds.is_drawable() {
            return Err(failure(format!(
                "unusable bounds {}x{}",
                display.bounds.width, display.bounds.height
            )));
        }

        let window = self.host.create_window(display).map_err(failure)?;
        let signal = self.host.refresh_signal(display);

        let mut surfaces = Vec::with_capacity(videos.len());
        for (region, &video) in split_regions(&display.bounds, videos.len())
            .into_iter()
            .zip(videos)
        {
            if let Err(reason) = self.host.attach_surface(window, &region) {
                // Monitors already attached unsubscribe as `surfaces` drops.
                self.host.close_window(window);
                return Err(failure(reason));
            }

            let monitor = store
                .item(video)
                .and_then(|item| item.output.frame_probe())
                .map(|probe| {
                    RenderRateMonitor::attach(
                        format!("display {} video {}", display.id, video),
                        probe,
                        signal.as_deref(),
                    )
                });

            surfaces.push(Surface {
                region,
                video,
                monitor,
            });
        }

        Ok(ActiveWindow {
            window,
            display: display.id,
            display_index,
            refresh_hz: display.refresh_hz,
            surfaces,
        })
    }

    /// Close every window and rewind all handles. Does nothing when idle.
    pub fn stop<E: MediaEngine>(&mut self, store: &mut MediaStore<E>) {
        let Some(session) = self.session.take() else {
            self.phase = Phase::Idle;
            return;
        };

        self.phase = Phase::Stopping;
        let count = session.windows.len();
        for window in session.windows {
            let ActiveWindow {
                window,
                display,
                display_index,
                surfaces,
                ..
            } = window;
            drop(surfaces);
            self.host.close_window(window);
            log::debug!("Closed output window on display {} ({})", display_index, display);
        }

        if store.generation() != session.generation {
            log::warn!(
                "Selection changed during playback (generation {} -> {})",
                session.generation,
                store.generation()
            );
        }
        sync::synchronized_reset(store);

        self.phase = Phase::Idle;
        log::info!("Playback stopped, {} windows closed", count);
    }

    /// A window was closed outside our control. Its outputs are paused and
    /// rewound; the session ends when it was the last window.
    pub fn window_closed<E: MediaEngine>(&mut self, id: H::WindowId, store: &mut MediaStore<E>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(position) = session.windows.iter().position(|w| w.window == id) else {
            return;
        };

        let closed = session.windows.remove(position);
        log::info!(
            "Output window {:?} on display {} closed externally",
            id,
            closed.display
        );
        if session.windows.is_empty() {
            self.stop(store);
            return;
        }

        if store.generation() == session.generation {
            let videos: Vec<usize> = closed.surfaces.iter().map(|s| s.video).collect();
            sync::synchronized_rewind(store, &videos);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::media::tests::{FakeEngine, paths};
    use crate::monitor::tests::ManualSignal;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    pub(crate) struct FakeHost {
        next_id: u32,
        pub(crate) open: Vec<u32>,
        pub(crate) created: Vec<(u32, Bounds)>,
        pub(crate) regions: Vec<(u32, Bounds)>,
        pub(crate) closed: Vec<u32>,
        pub(crate) fail_create: Vec<DisplayId>,
        pub(crate) fail_attach: Vec<DisplayId>,
        attaching_for: Option<DisplayId>,
        pub(crate) signal: ManualSignal,
    }

    impl WindowHost for FakeHost {
        type WindowId = u32;

        fn create_window(&mut self, display: &DisplayDescriptor) -> Result<u32, String> {
            if self.fail_create.contains(&display.id) {
                return Err("window server refused".to_string());
            }
            self.next_id += 1;
            self.open.push(self.next_id);
            self.created.push((self.next_id, display.bounds));
            self.attaching_for = Some(display.id);
            Ok(self.next_id)
        }

        fn attach_surface(&mut self, window: u32, region: &Bounds) -> Result<(), String> {
            if self
                .attaching_for
                .is_some_and(|id| self.fail_attach.contains(&id))
            {
                return Err("surface creation failed".to_string());
            }
            self.regions.push((window, *region));
            Ok(())
        }

        fn close_window(&mut self, window: u32) {
            self.open.retain(|w| *w != window);
            self.closed.push(window);
        }

        fn refresh_signal(&self, _display: &DisplayDescriptor) -> Option<Box<dyn RefreshSignal>> {
            Some(Box::new(self.signal.clone()))
        }
    }

    fn displays(count: u32) -> Vec<DisplayDescriptor> {
        (0..count)
            .map(|i| DisplayDescriptor {
                id: DisplayId(i + 1),
                bounds: Bounds::new(i as f32 * 1920.0, 0.0, 1920.0, 1080.0),
                refresh_hz: 60.0,
            })
            .collect()
    }

    fn setup(videos: &[&str], display_count: u32) -> (MediaStore<FakeEngine>, AssignmentTable) {
        let mut store = MediaStore::new(FakeEngine::default(), false);
        store.set_selection(paths(videos));
        let table = AssignmentTable::new(store.len(), display_count as usize);
        (store, table)
    }

    #[test]
    fn start_without_assignments_is_not_ready() {
        let (mut store, table) = setup(&["a.mp4"], 1);
        let mut orchestrator = Orchestrator::new(FakeHost::default());

        assert_eq!(
            orchestrator.start(&mut store, &table, &displays(1)).unwrap_err(),
            StartError::NotReady
        );
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert!(orchestrator.host().created.is_empty());
    }

    #[test]
    fn two_videos_split_one_display_in_half() {
        let (mut store, mut table) = setup(&["a.mp4", "b.mp4"], 1);
        table.assign(0, Some(0)).unwrap();
        table.assign(1, Some(0)).unwrap();
        let mut orchestrator = Orchestrator::new(FakeHost::default());

        let report = orchestrator.start(&mut store, &table, &displays(1)).unwrap();
        assert_eq!(report.started, vec![DisplayId(1)]);
        assert!(report.failures.is_empty());
        assert!(orchestrator.is_active());

        let host = orchestrator.host();
        assert_eq!(host.created, vec![(1, Bounds::new(0.0, 0.0, 1920.0, 1080.0))]);
        assert_eq!(
            host.regions,
            vec![
                (1, Bounds::new(0.0, 0.0, 960.0, 1080.0)),
                (1, Bounds::new(960.0, 0.0, 960.0, 1080.0)),
            ]
        );

        let session = orchestrator.session().unwrap();
        let videos: Vec<usize> = session.windows[0].surfaces.iter().map(|s| s.video).collect();
        assert_eq!(videos, vec![0, 1]);
    }

    #[test]
    fn shared_display_outputs_are_rewound_before_playing() {
        let (mut store, mut table) = setup(&["a.mp4", "b.mp4"], 1);
        table.assign(0, Some(0)).unwrap();
        table.assign(1, Some(0)).unwrap();
        let mut orchestrator = Orchestrator::new(FakeHost::default());

        let log = store.items()[0].output.log.clone();
        log.borrow_mut().clear();
        orchestrator.start(&mut store, &table, &displays(1)).unwrap();

        let calls = log.borrow();
        let outputs = ["a.mp4-v2", "b.mp4-v4"];
        let seeks: Vec<usize> = outputs
            .iter()
            .map(|o| calls.iter().position(|c| *c == format!("{}:seek0", o)).unwrap())
            .collect();
        let plays: Vec<usize> = outputs
            .iter()
            .map(|o| calls.iter().position(|c| *c == format!("{}:play", o)).unwrap())
            .collect();
        assert!(seeks.iter().max() < plays.iter().min());
    }

    #[test]
    fn audio_starts_once_per_session() {
        let (mut store, mut table) = setup(&["a.mp4", "b.mp4", "c.mp4"], 2);
        store
            .set_audio(Some(PathBuf::from("/media/track.mp3")))
            .unwrap();
        table.assign(0, Some(0)).unwrap();
        table.assign(1, Some(1)).unwrap();
        table.assign(2, Some(1)).unwrap();
        let mut orchestrator = Orchestrator::new(FakeHost::default());

        let log = store.items()[0].output.log.clone();
        log.borrow_mut().clear();
        orchestrator.start(&mut store, &table, &displays(2)).unwrap();

        let audio_plays = log
            .borrow()
            .iter()
            .filter(|c| c.starts_with("track.mp3") && c.ends_with(":play"))
            .count();
        assert_eq!(audio_plays, 1);
        assert!(orchestrator.session().unwrap().audio_started);
        assert_eq!(orchestrator.host().open.len(), 2);
    }

    #[test]
    fn failing_display_is_skipped_and_reported() {
        let (mut store, mut table) = setup(&["a.mp4", "b.mp4", "c.mp4"], 3);
        table.assign(0, Some(0)).unwrap();
        table.assign(1, Some(1)).unwrap();
        table.assign(2, Some(2)).unwrap();
        let host = FakeHost {
            fail_create: vec![DisplayId(2)],
            fail_attach: vec![DisplayId(3)],
            ..FakeHost::default()
        };
        let mut orchestrator = Orchestrator::new(host);

        let report = orchestrator.start(&mut store, &table, &displays(3)).unwrap();
        assert_eq!(report.started, vec![DisplayId(1)]);
        let failed: Vec<usize> = report.failures.iter().map(|f| f.display).collect();
        assert_eq!(failed, vec![1, 2]);

        assert!(orchestrator.is_active());
        assert_eq!(orchestrator.host().open, vec![1]);
        assert!(store.items()[0].output.playing);
        assert!(!store.items()[1].output.playing);
        assert!(!store.items()[2].output.playing);
    }

    #[test]
    fn no_display_started_leaves_orchestrator_idle() {
        let (mut store, mut table) = setup(&["a.mp4"], 2);
        store
            .set_audio(Some(PathBuf::from("/media/track.mp3")))
            .unwrap();
        table.assign(0, Some(1)).unwrap();
        let mut orchestrator = Orchestrator::new(FakeHost::default());

        // Display 1 disappeared after assignment.
        let report = orchestrator.start(&mut store, &table, &displays(1)).unwrap();
        assert!(report.started.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert!(orchestrator.session().is_none());
        assert!(!store.audio().unwrap().handle.playing);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut store, mut table) = setup(&["a.mp4"], 1);
        table.assign(0, Some(0)).unwrap();
        let mut orchestrator = Orchestrator::new(FakeHost::default());
        orchestrator.start(&mut store, &table, &displays(1)).unwrap();

        orchestrator.stop(&mut store);
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert!(orchestrator.session().is_none());
        assert!(orchestrator.host().open.is_empty());
        assert!(!store.items()[0].output.playing);
        let closed = orchestrator.host().closed.len();

        orchestrator.stop(&mut store);
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert!(orchestrator.session().is_none());
        assert_eq!(orchestrator.host().closed.len(), closed);
    }

    #[test]
    fn restart_tears_down_previous_session_first() {
        let (mut store, mut table) = setup(&["a.mp4", "b.mp4"], 2);
        table.assign(0, Some(0)).unwrap();
        table.assign(1, Some(1)).unwrap();
        let mut orchestrator = Orchestrator::new(FakeHost::default());

        orchestrator.start(&mut store, &table, &displays(2)).unwrap();
        assert_eq!(orchestrator.host().open, vec![1, 2]);

        table.assign(1, Some(0)).unwrap();
        orchestrator.start(&mut store, &table, &displays(2)).unwrap();

        let host = orchestrator.host();
        assert_eq!(host.closed, vec![1, 2]);
        assert_eq!(host.open, vec![3]);
        let session = orchestrator.session().unwrap();
        assert_eq!(session.windows.len(), 1);
        assert_eq!(session.windows[0].surfaces.len(), 2);
    }

    #[test]
    fn monitors_detach_when_session_stops() {
        let (mut store, mut table) = setup(&["a.mp4"], 1);
        table.assign(0, Some(0)).unwrap();
        let mut orchestrator = Orchestrator::new(FakeHost::default());
        orchestrator.start(&mut store, &table, &displays(1)).unwrap();

        let signal = orchestrator.host().signal.clone();
        assert!(signal.is_subscribed());

        let start = Instant::now();
        for tick in 1..=70 {
            signal.fire(start + Duration::from_millis(tick * 16));
        }
        let session = orchestrator.session().unwrap();
        let monitor = session.windows[0].surfaces[0].monitor.as_ref().unwrap();
        assert!(monitor.rate().is_some());

        orchestrator.stop(&mut store);
        assert!(!signal.is_subscribed());
    }

    #[test]
    fn external_close_of_last_window_ends_session() {
        let (mut store, mut table) = setup(&["a.mp4", "b.mp4"], 2);
        table.assign(0, Some(0)).unwrap();
        table.assign(1, Some(1)).unwrap();
        let mut orchestrator = Orchestrator::new(FakeHost::default());
        orchestrator.start(&mut store, &table, &displays(2)).unwrap();

        orchestrator.window_closed(1, &mut store);
        assert!(orchestrator.is_active());
        assert_eq!(orchestrator.session().unwrap().windows.len(), 1);
        assert!(!store.items()[0].output.playing);
        assert!(store.items()[1].output.playing);

        orchestrator.window_closed(2, &mut store);
        assert_eq!(orchestrator.phase(), Phase::Idle);
    }

    #[test]
    fn closed_window_outputs_stop_decoding() {
        let (mut store, mut table) = setup(&["a.mp4", "b.mp4", "c.mp4"], 2);
        table.assign(0, Some(0)).unwrap();
        table.assign(1, Some(0)).unwrap();
        table.assign(2, Some(1)).unwrap();
        let mut orchestrator = Orchestrator::new(FakeHost::default());
        orchestrator.start(&mut store, &table, &displays(2)).unwrap();

        let log = store.items()[0].output.log.clone();
        log.borrow_mut().clear();
        orchestrator.window_closed(1, &mut store);

        let calls = log.borrow().clone();
        for output in ["a.mp4-v2", "b.mp4-v4"] {
            let pause = calls.iter().position(|c| *c == format!("{}:pause", output));
            let seek = calls.iter().position(|c| *c == format!("{}:seek0", output));
            assert!(pause.is_some() && pause < seek, "{} not paused then rewound", output);
        }
        assert!(!calls.iter().any(|c| c.starts_with("c.mp4")));
        assert!(store.items()[2].output.playing);
        assert!(orchestrator.is_active());

        orchestrator.window_closed(1, &mut store);
        assert_eq!(orchestrator.session().unwrap().windows.len(), 1);
    }

    #[test]
    fn split_regions_cover_the_display() {
        let regions = split_regions(&Bounds::new(100.0, 50.0, 1920.0, 1080.0), 3);
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[2], Bounds::new(1280.0, 0.0, 640.0, 1080.0));
        assert!(split_regions(&Bounds::new(0.0, 0.0, 1.0, 1.0), 0).is_empty());
    }
}

//! State changes that invalidate the current screen assignments.
//!
//! Both end a running session before the assignment table is rebuilt, so no
//! window outlives the layout it was opened for.

use std::path::PathBuf;

use crate::assignment::AssignmentTable;
use crate::display::{DisplayEnumerator, DisplaySource};
use crate::media::{MediaEngine, MediaStore, SelectionReport};
use crate::orchestrator::{Orchestrator, WindowHost};

/// Replace the selected videos. Every assignment is cleared.
pub fn replace_selection<E: MediaEngine, H: WindowHost>(
    orchestrator: &mut Orchestrator<H>,
    media: &mut MediaStore<E>,
    assignments: &mut AssignmentTable,
    locators: Vec<PathBuf>,
    display_count: usize,
) -> SelectionReport {
    orchestrator.stop(media);
    let report = media.set_selection(locators);
    assignments.reset_for_size(media.len(), display_count);
    report
}

/// Re-read the displays. Returns true when the topology changed, in which case
/// playback has been stopped and every assignment cleared.
pub fn poll_displays<S: DisplaySource, E: MediaEngine, H: WindowHost>(
    displays: &mut DisplayEnumerator<S>,
    orchestrator: &mut Orchestrator<H>,
    media: &mut MediaStore<E>,
    assignments: &mut AssignmentTable,
) -> bool {
    if !displays.refresh() {
        return false;
    }

    if orchestrator.is_active() {
        log::info!("Display topology changed during playback, stopping");
        orchestrator.stop(media);
    }
    assignments.reset_for_size(media.len(), displays.len());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::tests::{SharedSource, output};
    use crate::media::tests::{FakeEngine, paths};
    use crate::orchestrator::Phase;
    use crate::orchestrator::tests::FakeHost;

    struct Fixture {
        source: SharedSource,
        displays: DisplayEnumerator<SharedSource>,
        orchestrator: Orchestrator<FakeHost>,
        media: MediaStore<FakeEngine>,
        assignments: AssignmentTable,
    }

    /// Two displays, one video on each, playing.
    fn playing_on_two_displays() -> Fixture {
        let source = SharedSource::with(vec![output(1, 0.0, 1920.0), output(2, 1920.0, 1920.0)]);
        let displays = DisplayEnumerator::new(source.clone());
        let mut media = MediaStore::new(FakeEngine::default(), false);
        media.set_selection(paths(&["a.mp4", "b.mp4"]));
        let mut assignments = AssignmentTable::new(media.len(), displays.len());
        assignments.assign(0, Some(0)).unwrap();
        assignments.assign(1, Some(1)).unwrap();

        let mut orchestrator = Orchestrator::new(FakeHost::default());
        orchestrator
            .start(&mut media, &assignments, displays.current_displays())
            .unwrap();
        assert!(orchestrator.is_active());

        Fixture {
            source,
            displays,
            orchestrator,
            media,
            assignments,
        }
    }

    fn poll(f: &mut Fixture) -> bool {
        poll_displays(
            &mut f.displays,
            &mut f.orchestrator,
            &mut f.media,
            &mut f.assignments,
        )
    }

    #[test]
    fn topology_change_stops_playback_and_clears_assignments() {
        let mut f = playing_on_two_displays();

        f.source.set(vec![output(1, 0.0, 1920.0)]);
        assert!(poll(&mut f));

        assert_eq!(f.orchestrator.phase(), Phase::Idle);
        assert!(f.orchestrator.host().open.is_empty());
        assert_eq!(f.assignments.len(), 2);
        assert!((0..2).all(|video| f.assignments.get(video).is_none()));
        assert!(f.media.items().iter().all(|item| !item.output.playing));
    }

    #[test]
    fn unchanged_topology_keeps_session_and_assignments() {
        let mut f = playing_on_two_displays();

        assert!(!poll(&mut f));
        assert!(f.orchestrator.is_active());
        assert_eq!(f.orchestrator.host().open.len(), 2);
        assert_eq!(f.assignments.get(1), Some(1));
    }

    #[test]
    fn new_selection_stops_playback_and_resizes_assignments() {
        let mut f = playing_on_two_displays();

        let report = replace_selection(
            &mut f.orchestrator,
            &mut f.media,
            &mut f.assignments,
            paths(&["c.mp4", "bad.mp4", "d.mp4"]),
            f.displays.len(),
        );

        assert_eq!(report.opened, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(f.orchestrator.phase(), Phase::Idle);
        assert!(f.orchestrator.host().open.is_empty());
        assert_eq!(f.assignments.len(), f.media.len());
        assert!(!f.assignments.is_ready_for_playback());
        assert!(f.assignments.assign(1, Some(1)).is_ok());
    }
}

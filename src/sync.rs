use crate::media::{MediaEngine, MediaStore, PlaybackHandle};

/// Rewind every listed output to zero, then start them all.
///
/// No output starts before all of them have been rewound, so regions sharing
/// a display begin on the same frame.
pub fn synchronized_start<E: MediaEngine>(store: &mut MediaStore<E>, videos: &[usize]) {
    for &video in videos {
        if let Some(output) = store.output_mut(video) {
            output.seek_zero();
        }
    }
    for &video in videos {
        if let Some(output) = store.output_mut(video) {
            output.play();
        }
    }
}

/// Pause and rewind the listed outputs, leaving the rest of the session running.
pub fn synchronized_rewind<E: MediaEngine>(store: &mut MediaStore<E>, videos: &[usize]) {
    for &video in videos {
        if let Some(output) = store.output_mut(video) {
            output.pause();
            output.seek_zero();
        }
    }
}

/// Pause and rewind every output handle and the audio track.
pub fn synchronized_reset<E: MediaEngine>(store: &mut MediaStore<E>) {
    for output in store.outputs_mut() {
        output.pause();
        output.seek_zero();
    }
    if let Some(audio) = store.audio_mut() {
        audio.pause();
        audio.seek_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::tests::{FakeEngine, paths};

    #[test]
    fn all_outputs_are_rewound_before_any_plays() {
        let engine = FakeEngine::default();
        let log = engine.log.clone();
        let mut store = MediaStore::new(engine, false);
        store.set_selection(paths(&["a.mp4", "b.mp4"]));
        log.borrow_mut().clear();

        synchronized_start(&mut store, &[0, 1]);

        let calls = log.borrow();
        let last_seek = calls.iter().rposition(|c| c.ends_with("seek0")).unwrap();
        let first_play = calls.iter().position(|c| c.ends_with("play")).unwrap();
        assert_eq!(calls.len(), 4);
        assert!(last_seek < first_play);
    }

    #[test]
    fn reset_touches_outputs_and_audio_only() {
        let engine = FakeEngine::default();
        let log = engine.log.clone();
        let mut store = MediaStore::new(engine, false);
        store.set_selection(paths(&["a.mp4"]));
        store
            .set_audio(Some(std::path::PathBuf::from("/media/track.mp3")))
            .unwrap();
        log.borrow_mut().clear();

        synchronized_reset(&mut store);

        let calls = log.borrow();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|c| !c.contains("a.mp4-v1")));
        assert!(store.items()[0].preview.playing);
    }
}

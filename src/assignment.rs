//! Video to display assignment.

use crate::error::AssignmentError;

/// Partial mapping from video index to display index.
///
/// Several videos may share a display, which splits it. The table always has
/// exactly one slot per selected video and is wiped whenever the selection or
/// the display set changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentTable {
    slots: Vec<Option<usize>>,
    display_count: usize,
}

impl AssignmentTable {
    pub fn new(media_count: usize, display_count: usize) -> Self {
        let mut table = AssignmentTable::default();
        table.reset_for_size(media_count, display_count);
        table
    }

    /// Unassign everything and resize to the current selection and displays.
    pub fn reset_for_size(&mut self, media_count: usize, display_count: usize) {
        if self.slots.iter().any(Option::is_some) {
            log::info!(
                "Screen assignments reset ({} videos, {} displays)",
                media_count,
                display_count
            );
        }
        self.slots = vec![None; media_count];
        self.display_count = display_count;
    }

    /// Assign `video` to `display`, or unassign it with `None`.
    pub fn assign(&mut self, video: usize, display: Option<usize>) -> Result<(), AssignmentError> {
        if video >= self.slots.len() {
            return Err(AssignmentError::InvalidVideo {
                index: video,
                len: self.slots.len(),
            });
        }
        if let Some(index) = display {
            if index >= self.display_count {
                return Err(AssignmentError::InvalidDisplay {
                    index,
                    len: self.display_count,
                });
            }
        }

        self.slots[video] = display;
        Ok(())
    }

    pub fn get(&self, video: usize) -> Option<usize> {
        self.slots.get(video).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_ready_for_playback(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().any(Option::is_some)
    }

    /// Videos assigned to `display`, in selection order.
    pub fn videos_for_display(&self, display: usize) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot == Some(display))
            .map(|(video, _)| video)
            .collect()
    }

    /// Display indices with at least one video, ascending.
    pub fn used_displays(&self) -> Vec<usize> {
        let mut used: Vec<usize> = self.slots.iter().flatten().copied().collect();
        used.sort_unstable();
        used.dedup();
        used
    }
}

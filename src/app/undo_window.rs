use std::time::{Duration, Instant};

use crate::note::NoteId;

/// Short-lived permission to take back a delete. Once the window lapses it simply goes inert;
/// nothing in the notebook waits on it.
#[derive(Debug, Clone)]
pub struct UndoWindow {
    note_id: NoteId,
    opened_at: Instant,
    ttl: Duration,
}

impl UndoWindow {
    pub fn open(note_id: NoteId, ttl: Duration) -> Self {
        Self {
            note_id,
            opened_at: Instant::now(),
            ttl,
        }
    }

    pub fn note_id(&self) -> &NoteId {
        &self.note_id
    }

    pub fn is_live(&self) -> bool {
        self.is_live_at(Instant::now())
    }

    pub fn is_live_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.opened_at) < self.ttl
    }

    pub fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.opened_at.elapsed())
    }
}

//! Location index lifecycle: started on book ready, progress, completion.

use log::{debug, info};

use crate::engine::{EngineError, EventKind, EventSource, RenderingEngine};

use super::ReadingSession;

/// State of the page-number ↔ CFI index for the active book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationIndex {
    #[default]
    NotStarted,
    Building {
        /// Percentage 0..=100, never decreasing.
        progress: u8,
    },
    Ready {
        total: usize,
    },
}

impl LocationIndex {
    pub fn is_ready(self) -> bool {
        matches!(self, LocationIndex::Ready { .. })
    }

    pub fn progress(self) -> u8 {
        match self {
            LocationIndex::NotStarted => 0,
            LocationIndex::Building { progress } => progress,
            LocationIndex::Ready { .. } => 100,
        }
    }

    pub fn total(self) -> Option<usize> {
        match self {
            LocationIndex::Ready { total } => Some(total),
            _ => None,
        }
    }
}

impl<E: RenderingEngine> ReadingSession<E> {
    /// Kick off index generation. Called once per book, after it reports ready.
    pub(super) fn start_index_build(&mut self) -> Result<(), EngineError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        if active.index != LocationIndex::NotStarted {
            debug!("locations: build already started, ignoring");
            return Ok(());
        }
        let book = active.book;
        active.index = LocationIndex::Building { progress: 0 };

        let source = EventSource::Book(book);
        self.subs.subscribe(
            &mut self.engine,
            self.generation,
            source,
            EventKind::LocationsProgress,
        );
        self.subs.subscribe(
            &mut self.engine,
            self.generation,
            source,
            EventKind::LocationsGenerated,
        );
        info!(
            "locations: generating (density={}, generation={})",
            self.config.location_density, self.generation.0
        );
        self.engine
            .generate_locations(book, self.config.location_density)
    }

    pub(super) fn on_index_progress(&mut self, fraction: f64) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let LocationIndex::Building { progress } = &mut active.index {
            let pct = (fraction * 100.0).round().clamp(0.0, 100.0) as u8;
            *progress = (*progress).max(pct);
            debug!("locations: progress {}%", *progress);
        }
    }

    pub(super) fn on_index_generated(&mut self, result: Result<usize, EngineError>) {
        let total = match result {
            Ok(total) => total,
            Err(e) => {
                self.fail_load(e);
                return;
            }
        };
        let Some(active) = self.active.as_mut() else {
            return;
        };
        // Ready reports 100% progress, so the bar completes with the index.
        active.index = LocationIndex::Ready { total };
        active.position.total_pages = total;
        self.subs.unsubscribe_kind(&mut self.engine, EventKind::LocationsProgress);
        self.subs.unsubscribe_kind(&mut self.engine, EventKind::LocationsGenerated);
        info!("locations: ready, {total} pages");
        self.refresh_current_page();
    }
}

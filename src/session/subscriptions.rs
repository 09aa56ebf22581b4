//! Engine listener bookkeeping.
//!
//! Every listener the session registers is recorded here together with the
//! event kind it was registered for. Listener ids embed the generation of the
//! load that created them, so a notification can be checked for staleness
//! without consulting the engine.

use log::trace;

use crate::engine::{EventKind, EventSource, Generation, ListenerId, RenderingEngine};

#[derive(Debug, Default)]
pub(super) struct Subscriptions {
    next_slot: u32,
    entries: Vec<(ListenerId, EventKind)>,
}

impl Subscriptions {
    pub(super) fn subscribe<E: RenderingEngine>(
        &mut self,
        engine: &mut E,
        generation: Generation,
        source: EventSource,
        kind: EventKind,
    ) -> ListenerId {
        self.next_slot += 1;
        let id = ListenerId {
            generation,
            slot: self.next_slot,
        };
        engine.on(source, kind, id);
        self.entries.push((id, kind));
        trace!("subscriptions: {} -> {:?} on {:?}", kind.name(), id, source);
        id
    }

    pub(super) fn kind_of(&self, id: ListenerId) -> Option<EventKind> {
        self.entries
            .iter()
            .find(|(l, _)| *l == id)
            .map(|(_, k)| *k)
    }

    pub(super) fn unsubscribe<E: RenderingEngine>(&mut self, engine: &mut E, id: ListenerId) {
        if let Some(pos) = self.entries.iter().position(|(l, _)| *l == id) {
            self.entries.remove(pos);
            engine.off(id);
        }
    }

    /// Remove every listener registered for `kind`.
    pub(super) fn unsubscribe_kind<E: RenderingEngine>(&mut self, engine: &mut E, kind: EventKind) {
        let (gone, kept): (Vec<_>, Vec<_>) = self.entries.drain(..).partition(|(_, k)| *k == kind);
        self.entries = kept;
        for (id, _) in gone {
            engine.off(id);
        }
    }

    /// Unsubscribe everything. Must run before the rendition and book are destroyed.
    pub(super) fn clear<E: RenderingEngine>(&mut self, engine: &mut E) {
        for (id, _) in self.entries.drain(..) {
            engine.off(id);
        }
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }
}

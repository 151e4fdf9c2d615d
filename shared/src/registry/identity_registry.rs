use std::{any::Any, collections::HashMap};

use log::trace;

use crate::{registry::referenceable::{Referenceable, WeakRef}, RefId};

enum Slot {
    Strong(Box<dyn Any + Send + Sync>),
    Weak(Box<dyn WeakRef>),
}

impl Slot {
    fn is_alive(&self) -> bool {
        match self {
            Slot::Strong(_) => true,
            Slot::Weak(weak) => weak.is_alive(),
        }
    }

    fn get<R: Referenceable>(&self) -> Option<R> {
        match self {
            Slot::Strong(strong) => strong.downcast_ref::<R>().cloned(),
            Slot::Weak(weak) => weak
                .upgrade_any()
                .and_then(|strong| strong.downcast::<R>().ok())
                .map(|strong| *strong),
        }
    }
}

struct Entry {
    identity: usize,
    slot: Slot,
    committed: bool,
}

/// Bidirectional `id <-> object` bookkeeping keyed by identity.
///
/// The strong variant keeps every stored object alive for the life of the
/// session. The weak variant only holds `Weak` handles: entries whose object
/// has been dropped everywhere else are ignored on lookup and expunged, which
/// bounds the memory of long-lived session caches.
///
/// Ids are handed out monotonically and never reused, even after `remove`.
pub struct IdentityRegistry {
    weak: bool,
    next_id: RefId,
    by_id: HashMap<RefId, Entry>,
    by_identity: HashMap<usize, RefId>,
    stores_since_expunge: usize,
}

impl IdentityRegistry {
    pub fn strong() -> Self {
        Self::new(false)
    }

    pub fn weak() -> Self {
        Self::new(true)
    }

    fn new(weak: bool) -> Self {
        Self {
            weak,
            next_id: 1,
            by_id: HashMap::new(),
            by_identity: HashMap::new(),
            stores_since_expunge: 0,
        }
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    /// Records `object`, returning its id.
    ///
    /// Idempotent: storing an already known object without an id returns the
    /// existing id. Passing an id re-keys the object under that id.
    pub fn store<R: Referenceable>(&mut self, object: &R, id: Option<RefId>) -> RefId {
        let identity = object.identity();

        if let Some(existing) = self.live_id(identity) {
            match id {
                None => return existing,
                Some(id) if id == existing => return existing,
                Some(_) => {
                    self.by_id.remove(&existing);
                }
            }
        }

        let id = match id {
            Some(id) => {
                // an explicit id may displace a different object
                if let Some(previous) = self.by_id.remove(&id) {
                    self.by_identity.remove(&previous.identity);
                }
                self.next_id = self.next_id.max(id.saturating_add(1));
                id
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };

        let slot = if self.weak {
            Slot::Weak(object.downgrade())
        } else {
            Slot::Strong(Box::new(object.clone()))
        };

        self.by_identity.insert(identity, id);
        self.by_id.insert(
            id,
            Entry {
                identity,
                slot,
                committed: false,
            },
        );

        if self.weak {
            self.stores_since_expunge += 1;
            // amortized: sweep once as many stores happened as entries exist
            if self.stores_since_expunge > self.by_id.len() {
                self.expunge();
            }
        }

        id
    }

    pub fn get<R: Referenceable>(&self, id: RefId) -> Option<R> {
        self.by_id.get(&id).and_then(|entry| entry.slot.get::<R>())
    }

    /// Whether an entry exists for `id`, regardless of the type stored there.
    pub fn contains_id(&self, id: RefId) -> bool {
        self.by_id
            .get(&id)
            .map(|entry| entry.slot.is_alive())
            .unwrap_or(false)
    }

    pub fn get_id<R: Referenceable>(&self, object: &R) -> Option<RefId> {
        self.live_id(object.identity())
    }

    pub fn has<R: Referenceable>(&self, object: &R) -> bool {
        self.get_id(object).is_some()
    }

    pub fn remove(&mut self, id: RefId) -> bool {
        match self.by_id.remove(&id) {
            Some(entry) => {
                if self.by_identity.get(&entry.identity) == Some(&id) {
                    self.by_identity.remove(&entry.identity);
                }
                true
            }
            None => false,
        }
    }

    /// Marks ids as known to the peer.
    pub fn commit(&mut self, ids: &[RefId]) {
        for id in ids {
            if let Some(entry) = self.by_id.get_mut(id) {
                entry.committed = true;
            }
        }
    }

    pub fn is_committed(&self, id: RefId) -> bool {
        self.by_id
            .get(&id)
            .map(|entry| entry.committed)
            .unwrap_or(false)
    }

    /// Drops entries whose object is no longer reachable, returns how many.
    pub fn expunge(&mut self) -> usize {
        self.stores_since_expunge = 0;

        let dead: Vec<RefId> = self
            .by_id
            .iter()
            .filter(|(_, entry)| !entry.slot.is_alive())
            .map(|(id, _)| *id)
            .collect();

        for id in dead.iter() {
            self.remove(*id);
        }

        if !dead.is_empty() {
            trace!("IdentityRegistry expunged {} unreachable entries", dead.len());
        }
        dead.len()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Forgets every entry. Ids keep counting up from where they were.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_identity.clear();
        self.stores_since_expunge = 0;
    }

    fn live_id(&self, identity: usize) -> Option<RefId> {
        let id = self.by_identity.get(&identity)?;
        let entry = self.by_id.get(id)?;
        // a dead weak entry may share its address with a newer allocation
        if entry.slot.is_alive() {
            Some(*id)
        } else {
            None
        }
    }
}

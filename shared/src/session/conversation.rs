use std::sync::{mpsc::Receiver, Arc, Mutex};

use crate::{wire::Batch, RefId, Tree, TreeId};

/// One outbound tree conversation, shared by every inbound `GetTree` call
/// for the same tree while it is in flight.
pub(crate) struct Conversation {
    pub tree_id: TreeId,
    /// The value being sent, becomes the peer's known state on completion
    pub after: Arc<dyn Tree>,
    pub batches: Mutex<Receiver<Batch>>,
    /// Refs first sent by this conversation, committed on completion
    pub introduced: Arc<Mutex<Vec<RefId>>>,
}

impl Conversation {
    pub fn new(tree_id: TreeId, after: Arc<dyn Tree>, batches: Receiver<Batch>) -> Self {
        Self {
            tree_id,
            after,
            batches: Mutex::new(batches),
            introduced: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

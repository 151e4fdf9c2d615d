use std::{
    collections::HashMap,
    sync::{
        mpsc::{sync_channel, RecvTimeoutError, SyncSender},
        Arc, Mutex, RwLock, Weak,
    },
};

use log::{debug, error, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    codec::CodecRegistry,
    queue::{ReceiveQueue, SendQueue},
    registry::{IdentityRegistry, Referenceable},
    session::{
        config::SessionConfig,
        conversation::Conversation,
        stats::{SessionStats, StatCounters},
        visitor::VisitorRegistry,
        RefState, TreeState,
    },
    transport::{
        GetTreeRequest, RpcHandler, RpcTransport, TransportError, VisitRequest, VisitResponse,
        GET_TREE_METHOD, RESET_METHOD, VISIT_METHOD,
    },
    wire::{Batch, ObjectData, ProtocolError, State, Value},
    RefId, SyncError, Tree, TreeId,
};

type TreeMap = RwLock<HashMap<TreeId, Arc<dyn Tree>>>;

/// One side of a tree synchronization channel.
///
/// A session owns the shadow state of every tree it shares with its peer:
/// `local_trees` holds the last value this side produced or received,
/// `remote_trees` the value the peer is known to hold. Diffs in both
/// directions are computed against these.
///
/// `Session` is a cheap handle; clones share the same state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    me: Weak<SessionInner>,
    config: SessionConfig,
    codecs: CodecRegistry,
    visitors: VisitorRegistry,
    transport: Arc<dyn RpcTransport>,
    pool: ThreadPool,
    local_trees: TreeMap,
    remote_trees: TreeMap,
    local_refs: Mutex<IdentityRegistry>,
    remote_refs: Mutex<IdentityRegistry>,
    in_flight: Mutex<HashMap<TreeId, Arc<Conversation>>>,
    fetching: Mutex<HashMap<TreeId, Arc<Mutex<()>>>>,
    stats: StatCounters,
}

impl Session {
    /// Creates a session, locking `codecs`.
    pub fn new(
        config: SessionConfig,
        mut codecs: CodecRegistry,
        visitors: VisitorRegistry,
        transport: Arc<dyn RpcTransport>,
    ) -> Result<Self, SyncError> {
        if !codecs.is_locked() {
            codecs.lock();
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|index| format!("treesync-encode-{}", index))
            .build()
            .map_err(|error| SyncError::WorkerPool {
                message: error.to_string(),
            })?;

        let local_refs = if config.weak_local_refs {
            IdentityRegistry::weak()
        } else {
            IdentityRegistry::strong()
        };

        let inner = Arc::new_cyclic(|me| SessionInner {
            me: me.clone(),
            config,
            codecs,
            visitors,
            transport,
            pool,
            local_trees: RwLock::new(HashMap::new()),
            remote_trees: RwLock::new(HashMap::new()),
            local_refs: Mutex::new(local_refs),
            remote_refs: Mutex::new(IdentityRegistry::strong()),
            in_flight: Mutex::new(HashMap::new()),
            fetching: Mutex::new(HashMap::new()),
            stats: StatCounters::default(),
        });

        Ok(Self { inner })
    }

    /// Handle for a transport to dispatch inbound requests to. Weak, so a
    /// transport owned by the peer session does not keep this one alive.
    pub fn handler(&self) -> Weak<dyn RpcHandler> {
        let handler: Weak<SessionInner> = Arc::downgrade(&self.inner);
        handler
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.inner.codecs
    }

    pub fn stats(&self) -> SessionStats {
        self.inner.stats.snapshot()
    }

    /// Records `tree` as this side's current value for its id, without
    /// talking to the peer.
    pub fn track(&self, tree: &Arc<dyn Tree>) -> Result<TreeId, SyncError> {
        self.inner.track(tree)
    }

    /// Asks the peer to run `visitor` over `tree`, returns whether the peer's
    /// result differs from `tree`.
    pub fn scan(
        &self,
        tree: &Arc<dyn Tree>,
        visitor: &str,
        context: Option<Value>,
    ) -> Result<bool, SyncError> {
        self.inner
            .scan(tree, visitor, context)
            .map(|(_, modified)| modified)
    }

    /// Runs `visitor` over `tree` on the peer and returns the result.
    ///
    /// When the peer reports no change, `tree` itself is returned without a
    /// further round trip.
    pub fn visit(
        &self,
        tree: &Arc<dyn Tree>,
        visitor: &str,
        context: Option<Value>,
    ) -> Result<Arc<dyn Tree>, SyncError> {
        let (tree_id, modified) = self.inner.scan(tree, visitor, context)?;
        if modified {
            self.inner.get_tree(tree_id)
        } else {
            Ok(tree.clone())
        }
    }

    /// Fetches the peer's current value of a tree.
    pub fn get_tree(&self, tree_id: TreeId) -> Result<Arc<dyn Tree>, SyncError> {
        self.inner.get_tree(tree_id)
    }

    /// Forgets every tree and ref, on both sides.
    pub fn reset(&self) -> Result<(), SyncError> {
        self.inner
            .transport
            .reset(self.inner.config.timeout)
            .map_err(SyncError::transport(RESET_METHOD))?;
        self.inner.clear()
    }

    pub fn tree_state(&self, tree_id: TreeId) -> Result<TreeState, SyncError> {
        let local = self.local_tree(tree_id)?;
        let remote = self.remote_tree(tree_id)?;
        Ok(match (local, remote) {
            (Some(local), Some(remote)) if Arc::ptr_eq(&local, &remote) => TreeState::Synced,
            (Some(_), _) => TreeState::LocalOnly,
            (None, _) => TreeState::Unknown,
        })
    }

    /// Tree ids with an outbound fetch running or waiting.
    pub fn fetches_in_progress(&self) -> Result<usize, SyncError> {
        Ok(self
            .inner
            .fetching
            .lock()
            .map_err(SyncError::poisoned("tree fetches"))?
            .len())
    }

    /// Whether this side has sent `object` by ref, and whether the peer is
    /// known to hold it.
    pub fn ref_state<R: Referenceable>(&self, object: &R) -> Result<RefState, SyncError> {
        let local_refs = self
            .inner
            .local_refs
            .lock()
            .map_err(SyncError::poisoned("local refs"))?;
        Ok(match local_refs.get_id(object) {
            Some(id) if local_refs.is_committed(id) => RefState::Committed,
            Some(_) => RefState::Pending,
            None => RefState::Unknown,
        })
    }

    pub fn local_tree(&self, tree_id: TreeId) -> Result<Option<Arc<dyn Tree>>, SyncError> {
        SessionInner::lookup(&self.inner.local_trees, tree_id, "local trees")
    }

    pub fn remote_tree(&self, tree_id: TreeId) -> Result<Option<Arc<dyn Tree>>, SyncError> {
        SessionInner::lookup(&self.inner.remote_trees, tree_id, "remote trees")
    }
}

impl RpcHandler for Session {
    fn handle_visit(&self, request: VisitRequest) -> Result<VisitResponse, SyncError> {
        self.inner.serve_visit(request)
    }

    fn handle_get_tree(&self, request: GetTreeRequest) -> Result<Batch, SyncError> {
        self.inner.serve_get_tree(request)
    }

    fn handle_reset(&self) -> Result<(), SyncError> {
        self.inner.clear()
    }
}

impl SessionInner {
    fn lookup(
        trees: &TreeMap,
        tree_id: TreeId,
        what: &'static str,
    ) -> Result<Option<Arc<dyn Tree>>, SyncError> {
        Ok(trees
            .read()
            .map_err(SyncError::poisoned(what))?
            .get(&tree_id)
            .cloned())
    }

    fn store(
        trees: &TreeMap,
        tree_id: TreeId,
        tree: Arc<dyn Tree>,
        what: &'static str,
    ) -> Result<(), SyncError> {
        trees
            .write()
            .map_err(SyncError::poisoned(what))?
            .insert(tree_id, tree);
        Ok(())
    }

    fn track(&self, tree: &Arc<dyn Tree>) -> Result<TreeId, SyncError> {
        let tree_id = tree.tree_id().ok_or(SyncError::MissingTreeId {
            type_name: tree.type_name(),
        })?;
        Self::store(&self.local_trees, tree_id, tree.clone(), "local trees")?;
        Ok(tree_id)
    }

    fn scan(
        &self,
        tree: &Arc<dyn Tree>,
        visitor: &str,
        context: Option<Value>,
    ) -> Result<(TreeId, bool), SyncError> {
        let tree_id = self.track(tree)?;
        debug!("Scanning tree {} with visitor '{}'", tree_id, visitor);

        let response = self
            .transport
            .visit(
                VisitRequest {
                    visitor: visitor.to_string(),
                    tree_id,
                    context,
                },
                self.config.timeout,
            )
            .map_err(SyncError::transport(VISIT_METHOD))?;

        Ok((tree_id, response.modified))
    }

    fn get_tree(&self, tree_id: TreeId) -> Result<Arc<dyn Tree>, SyncError> {
        // one decoder per tree id: conversations for the same id must not interleave
        let fetch_lock = self
            .fetching
            .lock()
            .map_err(SyncError::poisoned("tree fetches"))?
            .entry(tree_id)
            .or_default()
            .clone();
        let result = fetch_lock
            .lock()
            .map_err(SyncError::poisoned("tree fetch"))
            .and_then(|_fetching| self.fetch(tree_id));

        let mut fetching = self
            .fetching
            .lock()
            .map_err(SyncError::poisoned("tree fetches"))?;
        // nobody else is waiting on this id: only the map and this call hold it
        if Arc::strong_count(&fetch_lock) == 2 {
            fetching.remove(&tree_id);
        }
        result
    }

    fn fetch(&self, tree_id: TreeId) -> Result<Arc<dyn Tree>, SyncError> {
        let before = Self::lookup(&self.local_trees, tree_id, "local trees")?;

        let mut request = GetTreeRequest::start(tree_id);
        let mut queue = ReceiveQueue::new(&self.remote_refs, &self.codecs, move || {
            let batch = self
                .transport
                .get_tree(request, self.config.timeout)
                .map_err(SyncError::transport(GET_TREE_METHOD))?;
            request = GetTreeRequest::next(tree_id);
            StatCounters::bump(&self.stats.batches_received);
            Ok(batch)
        })
        .trace_units(self.config.trace_units);

        let after = queue
            .receive::<Arc<dyn Tree>>(before.as_ref())?
            .ok_or(ProtocolError::UnexpectedState {
                expected: "tree",
                found: State::Delete,
            })?;

        let end = queue.take()?;
        if end.state != State::EndOfObject {
            return Err(ProtocolError::MissingEndOfObject {
                tree_id,
                found: end.state,
            }
            .into());
        }

        Self::store(&self.remote_trees, tree_id, after.clone(), "remote trees")?;
        Self::store(&self.local_trees, tree_id, after.clone(), "local trees")?;
        StatCounters::bump(&self.stats.trees_received);
        debug!("Received tree {}", tree_id);

        Ok(after)
    }

    fn serve_visit(&self, request: VisitRequest) -> Result<VisitResponse, SyncError> {
        let mut visitor =
            self.visitors
                .create(&request.visitor)
                .ok_or_else(|| SyncError::UnknownVisitor {
                    name: request.visitor.clone(),
                })?;

        let before = self.get_tree(request.tree_id)?;
        let after = visitor
            .visit(&before, request.context.as_ref())
            .map_err(|error| SyncError::Visitor {
                visitor: request.visitor.clone(),
                message: error.to_string(),
            })?;

        let modified = !Arc::ptr_eq(&before, &after);
        if modified {
            Self::store(&self.local_trees, request.tree_id, after, "local trees")?;
        }
        debug!(
            "Visitor '{}' on tree {}: modified = {}",
            request.visitor, request.tree_id, modified
        );

        Ok(VisitResponse { modified })
    }

    fn serve_get_tree(&self, request: GetTreeRequest) -> Result<Batch, SyncError> {
        let tree_id = request.tree_id;

        let conversation = {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(SyncError::poisoned("in-flight conversations"))?;
            if request.restart {
                if let Some(stale) = in_flight.remove(&tree_id) {
                    warn!(
                        "Restarting conversation for tree {}: the previous one was left unfinished",
                        stale.tree_id
                    );
                }
            }
            match in_flight.get(&tree_id) {
                Some(conversation) => conversation.clone(),
                None => {
                    let conversation = self.start_encode(tree_id)?;
                    in_flight.insert(tree_id, conversation.clone());
                    conversation
                }
            }
        };

        let received = conversation
            .batches
            .lock()
            .map_err(SyncError::poisoned("conversation batches"))?
            .recv_timeout(self.config.timeout);

        match received {
            Ok(batch) => {
                StatCounters::bump(&self.stats.batches_sent);
                if let Some(last) = batch.last().filter(|unit| unit.is_terminal()) {
                    self.finish(&conversation, last.state == State::EndOfObject)?;
                }
                Ok(batch)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Abandoning conversation for tree {}: no batch within {:?}",
                    tree_id, self.config.timeout
                );
                self.remove_in_flight(&conversation)?;
                Err(SyncError::Transport {
                    method: GET_TREE_METHOD,
                    source: TransportError::Timeout {
                        after: self.config.timeout,
                    },
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.remove_in_flight(&conversation)?;
                Err(SyncError::EncodeTaskLost { tree_id })
            }
        }
    }

    fn clear(&self) -> Result<(), SyncError> {
        self.in_flight
            .lock()
            .map_err(SyncError::poisoned("in-flight conversations"))?
            .clear();
        self.local_trees
            .write()
            .map_err(SyncError::poisoned("local trees"))?
            .clear();
        self.remote_trees
            .write()
            .map_err(SyncError::poisoned("remote trees"))?
            .clear();
        self.local_refs
            .lock()
            .map_err(SyncError::poisoned("local refs"))?
            .clear();
        self.remote_refs
            .lock()
            .map_err(SyncError::poisoned("remote refs"))?
            .clear();
        debug!("Session state cleared");
        Ok(())
    }

    fn start_encode(&self, tree_id: TreeId) -> Result<Arc<Conversation>, SyncError> {
        let after = Self::lookup(&self.local_trees, tree_id, "local trees")?
            .ok_or(SyncError::UnknownTree { tree_id })?;
        let before = Self::lookup(&self.remote_trees, tree_id, "remote trees")?;
        let session = self.me.upgrade().ok_or_else(|| SyncError::WorkerPool {
            message: "session is shutting down".to_string(),
        })?;

        let (sender, receiver) = sync_channel(self.config.pending_batches);
        let conversation = Arc::new(Conversation::new(tree_id, after.clone(), receiver));
        let introduced = conversation.introduced.clone();

        StatCounters::bump(&self.stats.encode_tasks_started);
        debug!("Starting encode task for tree {}", tree_id);
        self.pool.spawn(move || {
            session.encode(tree_id, &after, before.as_ref(), &introduced, sender);
        });

        Ok(conversation)
    }

    /// Background half of a conversation: diffs `after` against what the
    /// peer holds and feeds the batches to the conversation's channel.
    fn encode(
        &self,
        tree_id: TreeId,
        after: &Arc<dyn Tree>,
        before: Option<&Arc<dyn Tree>>,
        introduced: &Mutex<Vec<RefId>>,
        sender: SyncSender<Batch>,
    ) {
        let result = {
            let mut queue = SendQueue::new(
                self.config.batch_size,
                &self.local_refs,
                &self.codecs,
                |batch| {
                    sender
                        .send(batch)
                        .map_err(|_| SyncError::ConversationAbandoned { tree_id })
                },
            )
            .trace_units(self.config.trace_units);
            Self::encode_into(&mut queue, after, before, introduced)
        };

        match result {
            Ok(()) => debug!("Encode task for tree {} finished", tree_id),
            Err(SyncError::ConversationAbandoned { .. }) => {
                warn!("Encode task for tree {} stopped: conversation abandoned", tree_id);
            }
            Err(encode_error) => {
                error!("Failed to encode tree {}: {}", tree_id, encode_error);
                if sender
                    .send(vec![ObjectData::error(encode_error.to_string())])
                    .is_err()
                {
                    warn!(
                        "Could not report encode failure for tree {}: conversation abandoned",
                        tree_id
                    );
                }
            }
        }
    }

    fn encode_into(
        queue: &mut SendQueue<'_>,
        after: &Arc<dyn Tree>,
        before: Option<&Arc<dyn Tree>>,
        introduced: &Mutex<Vec<RefId>>,
    ) -> Result<(), SyncError> {
        queue.send(Some(after), before)?;
        // published before the terminal unit can reach the peer
        *introduced
            .lock()
            .map_err(SyncError::poisoned("conversation refs"))? = queue.introduced();
        queue.put(ObjectData::end_of_object())?;
        queue.flush()
    }

    /// The terminal batch has been handed over: on success the peer now holds
    /// `after` and every ref this conversation introduced.
    fn finish(&self, conversation: &Arc<Conversation>, completed: bool) -> Result<(), SyncError> {
        self.remove_in_flight(conversation)?;
        if !completed {
            return Ok(());
        }

        let introduced = conversation
            .introduced
            .lock()
            .map_err(SyncError::poisoned("conversation refs"))?
            .clone();
        self.local_refs
            .lock()
            .map_err(SyncError::poisoned("local refs"))?
            .commit(&introduced);
        Self::store(
            &self.remote_trees,
            conversation.tree_id,
            conversation.after.clone(),
            "remote trees",
        )?;
        StatCounters::bump(&self.stats.trees_sent);
        debug!(
            "Sent tree {} ({} refs introduced)",
            conversation.tree_id,
            introduced.len()
        );
        Ok(())
    }

    fn remove_in_flight(&self, conversation: &Arc<Conversation>) -> Result<(), SyncError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(SyncError::poisoned("in-flight conversations"))?;
        if in_flight
            .get(&conversation.tree_id)
            .map(|current| Arc::ptr_eq(current, conversation))
            .unwrap_or(false)
        {
            in_flight.remove(&conversation.tree_id);
        }
        Ok(())
    }
}

impl RpcHandler for SessionInner {
    fn handle_visit(&self, request: VisitRequest) -> Result<VisitResponse, SyncError> {
        self.serve_visit(request)
    }

    fn handle_get_tree(&self, request: GetTreeRequest) -> Result<Batch, SyncError> {
        self.serve_get_tree(request)
    }

    fn handle_reset(&self) -> Result<(), SyncError> {
        self.clear()
    }
}

use std::{
    collections::VecDeque,
    sync::Mutex,
    time::Duration,
};

use treesync_shared::{
    Batch, GetTreeRequest, RpcTransport, TransportError, VisitRequest, VisitResponse,
};

/// Transport that answers from a script instead of a peer, for feeding a
/// session hand-made conversations.
pub struct ScriptedTransport {
    modified: bool,
    batches: Mutex<VecDeque<Batch>>,
    visits: Mutex<Vec<VisitRequest>>,
}

impl ScriptedTransport {
    pub fn new(modified: bool, batches: Vec<Batch>) -> Self {
        Self {
            modified,
            batches: Mutex::new(batches.into()),
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn visits(&self) -> Vec<VisitRequest> {
        self.visits.lock().map(|visits| visits.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.batches.lock().map(|batches| batches.len()).unwrap_or_default()
    }
}

impl RpcTransport for ScriptedTransport {
    fn visit(
        &self,
        request: VisitRequest,
        _timeout: Duration,
    ) -> Result<VisitResponse, TransportError> {
        self.visits
            .lock()
            .map_err(|_| TransportError::Disconnected)?
            .push(request);
        Ok(VisitResponse {
            modified: self.modified,
        })
    }

    fn get_tree(
        &self,
        _request: GetTreeRequest,
        _timeout: Duration,
    ) -> Result<Batch, TransportError> {
        self.batches
            .lock()
            .map_err(|_| TransportError::Disconnected)?
            .pop_front()
            .ok_or(TransportError::Disconnected)
    }

    fn reset(&self, _timeout: Duration) -> Result<(), TransportError> {
        Ok(())
    }
}

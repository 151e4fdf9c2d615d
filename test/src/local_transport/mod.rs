//! In-memory transport for end-to-end tests.
//! Carries requests between two sessions in the same process, through the
//! same byte encoding a network transport would use.

mod scripted;

pub use scripted::ScriptedTransport;

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc, Arc, OnceLock, Weak,
    },
    thread,
    time::Duration,
};

use log::trace;

use treesync_shared::{
    decode_batch, encode_batch, from_bytes, to_bytes, Batch, GetTreeRequest, ProtocolError,
    RpcHandler, RpcTransport, SyncError, TransportError, VisitRequest, VisitResponse,
    GET_TREE_METHOD, RESET_METHOD, VISIT_METHOD,
};

/// One direction of a loopback channel: requests issued here are served by
/// the connected peer's handler on a thread of their own, the way a network
/// transport serves each request on a dispatch thread.
pub struct LocalTransport {
    peer: OnceLock<Weak<dyn RpcHandler>>,
    latency: Duration,
    requests: AtomicU64,
}

impl LocalTransport {
    pub fn new() -> Arc<Self> {
        Self::with_latency(Duration::ZERO)
    }

    /// Every request waits `latency` before it reaches the peer.
    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            peer: OnceLock::new(),
            latency,
            requests: AtomicU64::new(0),
        })
    }

    pub fn connect(&self, peer: Weak<dyn RpcHandler>) {
        if self.peer.set(peer).is_err() {
            panic!("LocalTransport is already connected");
        }
    }

    /// Requests issued so far, of every method.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    fn call(
        &self,
        method: &'static str,
        timeout: Duration,
        serve: impl FnOnce(Arc<dyn RpcHandler>) -> Result<Vec<u8>, SyncError> + Send + 'static,
    ) -> Result<Vec<u8>, TransportError> {
        let handler = self
            .peer
            .get()
            .and_then(Weak::upgrade)
            .ok_or(TransportError::Disconnected)?;
        self.requests.fetch_add(1, Ordering::Relaxed);
        trace!("LocalTransport: {} request", method);

        let (sender, receiver) = mpsc::channel();
        let latency = self.latency;
        thread::Builder::new()
            .name(format!("local-{}", method))
            .spawn(move || {
                if !latency.is_zero() {
                    thread::sleep(latency);
                }
                // the caller may have timed out already
                let _ = sender.send(serve(handler));
            })
            .map_err(|_| TransportError::Disconnected)?;

        match receiver.recv_timeout(timeout) {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(error)) => Err(TransportError::Remote {
                message: error.to_string(),
            }),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(TransportError::Timeout { after: timeout }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

fn malformed(error: impl ToString) -> TransportError {
    TransportError::Malformed {
        reason: error.to_string(),
    }
}

impl RpcTransport for LocalTransport {
    fn visit(
        &self,
        request: VisitRequest,
        timeout: Duration,
    ) -> Result<VisitResponse, TransportError> {
        let request = to_bytes(&request);
        let response = self.call(VISIT_METHOD, timeout, move |handler| {
            let request: VisitRequest =
                from_bytes(&request).map_err(ProtocolError::from)?;
            handler
                .handle_visit(request)
                .map(|response| to_bytes(&response))
        })?;
        from_bytes(&response).map_err(malformed)
    }

    fn get_tree(
        &self,
        request: GetTreeRequest,
        timeout: Duration,
    ) -> Result<Batch, TransportError> {
        let request = to_bytes(&request);
        let response = self.call(GET_TREE_METHOD, timeout, move |handler| {
            let request: GetTreeRequest =
                from_bytes(&request).map_err(ProtocolError::from)?;
            handler
                .handle_get_tree(request)
                .map(|batch| encode_batch(&batch))
        })?;
        decode_batch(&response).map_err(malformed)
    }

    fn reset(&self, timeout: Duration) -> Result<(), TransportError> {
        self.call(RESET_METHOD, timeout, |handler| {
            handler.handle_reset().map(|_| Vec::new())
        })?;
        Ok(())
    }
}

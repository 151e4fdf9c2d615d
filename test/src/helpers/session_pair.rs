use std::sync::Arc;

use treesync_shared::{RpcTransport, Session, SessionConfig};

use crate::{helpers::codecs, local_transport::LocalTransport, visitors::visitors};

/// Two sessions wired to each other through loopback transports.
pub struct SessionPair {
    pub local: Session,
    pub remote: Session,
    /// Carries the local session's outbound requests
    pub local_transport: Arc<LocalTransport>,
    /// Carries the remote session's outbound requests
    pub remote_transport: Arc<LocalTransport>,
}

pub fn session_pair(config: SessionConfig) -> SessionPair {
    session_pair_with(config, LocalTransport::new(), LocalTransport::new())
}

pub fn session_pair_with(
    config: SessionConfig,
    local_transport: Arc<LocalTransport>,
    remote_transport: Arc<LocalTransport>,
) -> SessionPair {
    let local = Session::new(
        config.clone(),
        codecs(),
        visitors(),
        local_transport.clone(),
    )
    .expect("local session");
    let remote = Session::new(config, codecs(), visitors(), remote_transport.clone())
        .expect("remote session");

    local_transport.connect(remote.handler());
    remote_transport.connect(local.handler());

    SessionPair {
        local,
        remote,
        local_transport,
        remote_transport,
    }
}

/// A session whose peer is a script.
pub fn scripted_session(config: SessionConfig, transport: Arc<dyn RpcTransport>) -> Session {
    Session::new(config, codecs(), visitors(), transport).expect("scripted session")
}

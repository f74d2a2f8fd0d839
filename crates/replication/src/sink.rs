use std::sync::Arc;

use crate::edit::ReplicatedEdit;

/// Identifies a peer sink server. Opaque beyond equality/ordering —
/// resolving it to an actual network endpoint is the external catalog's
/// job, not this crate's.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SinkId(pub String);

/// A live connection to a peer sink. The RPC transport itself is an
/// external collaborator out of scope for this crate; this trait is the
/// narrow seam `ReplicationTap` calls through.
pub trait ReplicationSink: Send + Sync {
    fn ship(&self, batch: &[ReplicatedEdit]) -> Result<(), String>;
}

/// The external peer catalog: the source of truth for which sinks a peer
/// cluster currently has. Re-queried whenever the live sink set drops to
/// zero.
pub trait PeerCatalog: Send + Sync {
    fn list_sinks(&self) -> Vec<(SinkId, Arc<dyn ReplicationSink>)>;
}

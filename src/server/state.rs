use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::log::LogSink;
use crate::server::registry::Registry;
use crate::server::session::SessionId;
use crate::store::Store;

/// Everything connection workers share.
pub struct ServerState {
    pub registry: Registry,
    pub store: Arc<dyn Store>,
    pub log: Arc<dyn LogSink>,
    next_session_id: AtomicU64,
}

impl ServerState {
    pub fn new(store: Arc<dyn Store>, log: Arc<dyn LogSink>) -> Self {
        Self {
            registry: Registry::new(),
            store,
            log,
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn next_session_id(&self) -> SessionId {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }
}

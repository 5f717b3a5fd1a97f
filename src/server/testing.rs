//! In-memory transport for exercising sessions and handlers without sockets.

#![allow(clippy::expect_used)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::log::NoopLogSink;
use crate::protocol::{Msg, decode_frame};
use crate::server::session::{Session, SessionId, Transport};
use crate::server::state::ServerState;
use crate::store::{MemoryStore, PasswordHasher};

/// Captures written bytes; can be told to fail writes.
#[derive(Clone, Default)]
pub(crate) struct MemoryWire {
    buf: Arc<Mutex<Vec<u8>>>,
    fail: Arc<AtomicBool>,
    shutdowns: Arc<AtomicUsize>,
}

impl MemoryWire {
    pub fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Decode everything written so far. Panics on a torn frame.
    pub fn frames(&self) -> Vec<Msg> {
        let buf = self.buf.lock().expect("wire lock");
        let mut out = Vec::new();
        let mut at = 0;
        while at < buf.len() {
            let (msg, used) = decode_frame(&buf[at..]).expect("well-formed frame");
            out.push(msg);
            at += used;
        }
        out
    }

    /// Decode and forget everything written so far.
    pub fn take(&self) -> Vec<Msg> {
        let frames = self.frames();
        self.buf.lock().expect("wire lock").clear();
        frames
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl Write for MemoryWire {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.buf.lock().expect("wire lock").extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MemoryWire {
    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn session_pair(id: SessionId) -> (Session, MemoryWire) {
    let wire = MemoryWire::default();
    let session = Session::new(id, format!("mem-{id}"), wire.clone(), wire.clone());
    (session, wire)
}

/// Shared state over a MemoryStore with a cheap hash.
pub(crate) fn test_state() -> ServerState {
    let store = MemoryStore::with_hasher(PasswordHasher::new(2));
    ServerState::new(Arc::new(store), Arc::new(NoopLogSink))
}

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::protocol::{Msg, UserName, encode_frame};
use crate::store::UserId;

pub type SessionId = u64;

/// Who a session has authenticated as. Set once, at successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: UserName,
    pub user_id: UserId,
}

/// Out-of-band control over the underlying transport.
///
/// `shutdown` must make a read blocked on the same transport return promptly.
pub trait Transport: Send + Sync {
    fn shutdown(&self);
}

impl Transport for TcpStream {
    fn shutdown(&self) {
        let _ = TcpStream::shutdown(self, Shutdown::Both);
    }
}

/// Server-side state for one live connection.
///
/// Every outbound frame goes through `send`, which holds the session's write
/// lock for the whole frame so concurrent senders never interleave bytes.
pub struct Session {
    id: SessionId,
    peer: String,
    writer: Mutex<Box<dyn Write + Send>>,
    transport: Box<dyn Transport>,
    identity: OnceLock<Identity>,
    closed: AtomicBool,
}

impl Session {
    pub fn new<W, T>(id: SessionId, peer: impl Into<String>, writer: W, transport: T) -> Self
    where
        W: Write + Send + 'static,
        T: Transport + 'static,
    {
        Self {
            id,
            peer: peer.into(),
            writer: Mutex::new(Box::new(writer)),
            transport: Box::new(transport),
            identity: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Session over an accepted socket. Uses two clones of the handle; the
    /// caller keeps the original for reading.
    pub fn for_stream(id: SessionId, stream: &TcpStream) -> std::io::Result<Self> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Ok(Self::new(id, peer, stream.try_clone()?, stream.try_clone()?))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Encode and write one frame. Returns `false` on any failure, including
    /// a closed session; never panics and never closes the session itself.
    pub fn send(&self, msg: &Msg) -> bool {
        if self.is_closed() {
            return false;
        }
        let Ok(frame) = encode_frame(msg) else {
            return false;
        };
        let Ok(mut w) = self.writer.lock() else {
            return false;
        };
        w.write_all(&frame).and_then(|_| w.flush()).is_ok()
    }

    /// Record the login identity. Returns `false` if one was already set.
    pub fn authenticate(&self, username: UserName, user_id: UserId) -> bool {
        self.identity.set(Identity { username, user_id }).is_ok()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.get()
    }

    pub fn username(&self) -> Option<&str> {
        self.identity.get().map(|i| i.username.as_str())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut the transport down. Idempotent; safe from any thread.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.transport.shutdown();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("identity", &self.identity.get())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::server::testing::{MemoryWire, session_pair};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn send_writes_whole_frames() {
        let (session, wire) = session_pair(1);
        assert!(session.send(&Msg::error("one")));
        assert!(session.send(&Msg::error("two")));
        assert_eq!(wire.frames(), vec![Msg::error("one"), Msg::error("two")]);
    }

    #[test]
    fn failed_write_returns_false() {
        let (session, wire) = session_pair(1);
        wire.fail_writes();
        assert!(!session.send(&Msg::Logout));
        assert!(!session.is_closed());
    }

    #[test]
    fn close_is_idempotent_and_stops_sends() {
        let (session, wire) = session_pair(1);
        session.close();
        session.close();
        assert_eq!(wire.shutdowns(), 1);
        assert!(!session.send(&Msg::Logout));
        assert!(wire.frames().is_empty());
    }

    #[test]
    fn identity_is_set_once() {
        let (session, _wire) = session_pair(1);
        assert!(session.username().is_none());
        assert!(session.authenticate("alice".into(), 7));
        assert!(!session.authenticate("mallory".into(), 8));
        assert_eq!(session.username(), Some("alice"));
        assert_eq!(session.identity().unwrap().user_id, 7);
    }

    #[test]
    fn concurrent_senders_do_not_interleave() {
        let wire = MemoryWire::default();
        let session = Arc::new(Session::new(1, "test", wire.clone(), wire.clone()));

        let workers: Vec<_> = (0..4)
            .map(|t| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    for i in 0..50 {
                        let text = format!("{t}-{i}-{}", "x".repeat(300));
                        assert!(session.send(&Msg::error(text)));
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        // Every frame decodes cleanly back to back.
        assert_eq!(wire.frames().len(), 200);
    }
}

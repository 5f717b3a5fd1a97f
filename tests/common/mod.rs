#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quickim::client::{ClientError, ImClient};
use quickim::log::NoopLogSink;
use quickim::protocol::{Msg, PresenceStatus};
use quickim::server::{ImServer, ServerState};
use quickim::store::{MemoryStore, PasswordHasher};

pub const WAIT: Duration = Duration::from_secs(5);
pub const QUIET: Duration = Duration::from_millis(250);

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<ServerState>,
}

/// Server on an ephemeral localhost port with a cheap password hash.
pub fn start_server() -> TestServer {
    let store = MemoryStore::with_hasher(PasswordHasher::new(2));
    let server = ImServer::bind("127.0.0.1:0", Arc::new(store), Arc::new(NoopLogSink))
        .expect("bind test server");
    let state = Arc::clone(server.state());
    let (addr, _accept) = server.spawn().expect("spawn accept loop");
    TestServer { addr, state }
}

impl TestServer {
    pub fn client(&self) -> ImClient {
        ImClient::connect(self.addr).expect("connect")
    }

    /// Register (if needed) and log in `name` with password `pw12`.
    pub fn online(&self, name: &str) -> ImClient {
        let mut c = self.client();
        let _ = c.register(name, "pw12");
        c.login(name, "pw12").expect("login");
        c
    }
}

pub fn presence(username: &str, status: PresenceStatus) -> Msg {
    Msg::Presence {
        username: username.into(),
        status,
    }
}

/// Assert nothing arrives within `QUIET`.
pub fn assert_silent(c: &mut ImClient) {
    match c.recv_timeout(QUIET) {
        Err(ClientError::Timeout) => {}
        other => panic!("expected silence, got {other:?}"),
    }
}

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::log::LogSink;
use crate::server::dispatcher::ConnectionHandler;
use crate::server::session::{Session, SessionId};
use crate::server::state::ServerState;
use crate::store::Store;
use crate::{sink_info, sink_warn};

/// TCP front door: accepts forever, one worker thread per connection.
pub struct ImServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl ImServer {
    pub fn bind<A: ToSocketAddrs>(
        addr: A,
        store: Arc<dyn Store>,
        log: Arc<dyn LogSink>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            state: Arc::new(ServerState::new(store, log)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Blocking accept loop. Only a failure of the listener itself returns.
    pub fn run(self) -> io::Result<()> {
        let log = Arc::clone(&self.state.log);
        sink_info!(log, "quickim listening on {}", self.local_addr()?);

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    sink_warn!(log, "accept failed: {} (continuing)", e);
                    continue;
                }
            };

            let id = self.state.next_session_id();
            let state = Arc::clone(&self.state);
            let spawned = thread::Builder::new()
                .name(format!("quickim-conn-{id}"))
                .spawn(move || serve_connection(state, id, stream));
            if let Err(e) = spawned {
                sink_warn!(log, "could not start worker for session {}: {}", id, e);
            }
        }
        Ok(())
    }

    /// Run the accept loop on a background thread.
    pub fn spawn(self) -> io::Result<(SocketAddr, JoinHandle<io::Result<()>>)> {
        let addr = self.local_addr()?;
        let handle = thread::Builder::new()
            .name("quickim-accept".into())
            .spawn(move || self.run())?;
        Ok((addr, handle))
    }
}

fn serve_connection(state: Arc<ServerState>, id: SessionId, mut stream: TcpStream) {
    let session = match Session::for_stream(id, &stream) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            sink_warn!(state.log, "session {} setup failed: {}", id, e);
            return;
        }
    };
    sink_info!(state.log, "session {} accepted from {}", id, session.peer());

    ConnectionHandler::new(state, session).run(&mut stream);
}

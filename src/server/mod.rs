//! QuickIM server: listener, per-connection dispatch, online registry.
//!
//! One thread per accepted connection runs a [`ConnectionHandler`]. The only
//! state shared between them is the [`Registry`] of online users (plus the
//! store, which does its own locking).

mod dispatcher;
mod im_server;
mod registry;
pub mod replies;
pub mod routing;
mod run;
mod session;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{ConnectionHandler, Flow, SEARCH_LIMIT};
pub use im_server::ImServer;
pub use registry::Registry;
pub use run::{
    DEFAULT_BIND_ADDR, DEFAULT_STORE_DIR, STORE_DIR_ENV, ServerSettings, StartupError, run_server,
};
pub use session::{Identity, Session, SessionId, Transport};
pub use state::ServerState;

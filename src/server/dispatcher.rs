use std::io::Read;
use std::sync::Arc;

use crate::protocol::{
    ActionCode, FrameError, MAX_AVATAR_LEN, MAX_PAYLOAD_LEN, Msg, PresenceStatus, UserName,
    read_msg,
};
use crate::server::replies;
use crate::server::routing;
use crate::server::session::{Identity, Session};
use crate::server::state::ServerState;
use crate::store::StoreError;
use crate::{sink_debug, sink_error, sink_info, sink_warn};

/// At most this many names in a search reply.
pub const SEARCH_LIMIT: usize = 20;

const USERNAME_CHARS: std::ops::RangeInclusive<usize> = 3..=20;
const MIN_PASSWORD_CHARS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Drives one connection: decode a frame, run its handler, repeat.
///
/// Dropping the handler is the teardown path for every way a connection
/// ends. If this connection put a user in the registry, the entry is removed
/// and an OFFLINE presence goes out, exactly once.
pub struct ConnectionHandler {
    state: Arc<ServerState>,
    session: Arc<Session>,
    /// Set once this connection owns a registry entry.
    online: Option<UserName>,
}

impl ConnectionHandler {
    pub fn new(state: Arc<ServerState>, session: Arc<Session>) -> Self {
        Self {
            state,
            session,
            online: None,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Read loop. Returns when the peer closes, a frame is bad, the read
    /// fails, or the user logs out; teardown runs as `self` drops.
    pub fn run<R: Read>(mut self, reader: &mut R) {
        let log = Arc::clone(&self.state.log);
        let sid = self.session.id();

        loop {
            let msg = match read_msg(reader, MAX_PAYLOAD_LEN) {
                Ok(msg) => msg,
                Err(FrameError::Closed) => {
                    sink_info!(log, "session {} closed by peer", sid);
                    break;
                }
                Err(FrameError::Io(e)) => {
                    sink_info!(log, "session {} read failed: {}", sid, e);
                    break;
                }
                Err(FrameError::Proto(e)) => {
                    sink_warn!(log, "session {} sent a bad frame: {}; dropping", sid, e);
                    break;
                }
            };

            sink_debug!(log, "session {} <- {:?}", sid, msg.command());
            if self.handle(msg) == Flow::Close {
                break;
            }
        }
    }

    /// Dispatch one decoded message.
    pub fn handle(&mut self, msg: Msg) -> Flow {
        let me = self.session.identity().cloned();

        match (msg, me) {
            (Msg::Register { username, password }, _) => self.on_register(&username, &password),
            (Msg::Login { username, password }, _) => self.on_login(&username, &password),

            (msg, None) if msg.command().is_request() => {
                sink_debug!(
                    self.state.log,
                    "session {} sent {:?} before login",
                    self.session.id(),
                    msg.command()
                );
                self.reply(Msg::error(replies::NOT_AUTHENTICATED));
            }

            (Msg::Logout, Some(me)) => {
                self.reply(Msg::response(ActionCode::Logout, true, replies::GOODBYE));
                sink_info!(self.state.log, "user {} logged out", me.username);
                return Flow::Close;
            }
            (Msg::SendMessage { to, content, msg_id }, Some(me)) => {
                let status = routing::deliver_message(&self.state, &me.username, to.trim(), content, &msg_id);
                self.reply(Msg::MessageAck { msg_id, status });
            }
            (Msg::AddContact { contact }, Some(me)) => self.on_add_contact(&me, contact.trim()),
            (Msg::RemoveContact { contact }, Some(me)) => {
                self.on_remove_contact(&me, contact.trim())
            }
            (Msg::ContactListRequest, Some(me)) => self.send_contact_list(&me),
            (Msg::UserSearch { query }, Some(me)) => self.on_search(&me, query.trim()),
            (Msg::UserListRequest, Some(me)) => {
                let users = routing::online_users(&self.state, &me.username);
                self.reply(Msg::UserList { users });
            }
            (Msg::SignalSend { to, intensity }, Some(me)) => {
                if !routing::forward_signal(&self.state, &me.username, to.trim(), intensity) {
                    self.reply(Msg::error(replies::USER_OFFLINE));
                }
            }
            (Msg::AvatarSet { data }, Some(me)) => self.on_avatar_set(&me, &data),
            (Msg::AvatarGet { username }, Some(_)) => self.on_avatar_get(username.trim()),

            // Server-to-client kinds.
            (msg, _) => {
                sink_warn!(
                    self.state.log,
                    "session {} sent server-only {:?}",
                    self.session.id(),
                    msg.command()
                );
                self.reply(Msg::error(replies::UNKNOWN_COMMAND));
            }
        }
        Flow::Continue
    }

    fn reply(&self, msg: Msg) {
        if !self.session.send(&msg) {
            sink_debug!(
                self.state.log,
                "reply {:?} to session {} not written",
                msg.command(),
                self.session.id()
            );
        }
    }

    fn fail(&self, action: ActionCode, text: impl Into<String>) {
        self.reply(Msg::response(action, false, text));
    }

    // ---- Handlers ---------------------------------------------------------

    fn on_register(&self, username: &str, password: &str) {
        let username = username.trim();
        if let Err(reason) = check_registration(username, password) {
            self.fail(ActionCode::Register, reason);
            return;
        }

        match self.state.store.register_account(username, password) {
            Ok(_) => {
                sink_info!(self.state.log, "registered user {}", username);
                self.reply(Msg::response(ActionCode::Register, true, replies::REGISTERED));
            }
            Err(e) if e.is_internal() => {
                sink_error!(self.state.log, "register {} failed: {}", username, e);
                self.fail(ActionCode::Register, replies::REGISTER_FAILED);
            }
            Err(e) => self.fail(ActionCode::Register, e.to_string()),
        }
    }

    fn on_login(&mut self, username: &str, password: &str) {
        let username = username.trim();

        // Cheap pre-check so a duplicate login skips the password hash.
        if self.session.identity().is_some() || self.state.registry.contains(username) {
            self.fail(ActionCode::Login, replies::ALREADY_LOGGED_IN);
            return;
        }

        let user_id = match self.state.store.authenticate(username, password) {
            Ok(id) => id,
            Err(e) if e.is_internal() => {
                sink_error!(self.state.log, "login {} failed: {}", username, e);
                self.fail(ActionCode::Login, replies::AUTH_FAILED);
                return;
            }
            Err(e) => {
                sink_info!(self.state.log, "login {} rejected: {}", username, e);
                self.fail(ActionCode::Login, e.to_string());
                return;
            }
        };

        // The registry insert is authoritative for concurrent logins.
        if !self.state.registry.insert(username, Arc::clone(&self.session)) {
            self.fail(ActionCode::Login, replies::ALREADY_LOGGED_IN);
            return;
        }
        self.online = Some(username.to_owned());
        self.session.authenticate(username.to_owned(), user_id);

        self.reply(Msg::response(ActionCode::Login, true, replies::LOGGED_IN));
        sink_info!(
            self.state.log,
            "user {} logged in from {} (session {})",
            username,
            self.session.peer(),
            self.session.id()
        );
        routing::broadcast_presence(&self.state, username, PresenceStatus::Online);
    }

    fn on_add_contact(&self, me: &Identity, contact: &str) {
        if contact.is_empty() {
            self.fail(ActionCode::AddContact, replies::INVALID_USERNAME);
            return;
        }
        match self.state.store.add_contact(me.user_id, contact) {
            Ok(()) => {
                self.reply(Msg::response(ActionCode::AddContact, true, replies::CONTACT_ADDED));
                self.send_contact_list(me);
            }
            Err(e) => self.store_failure(ActionCode::AddContact, replies::ADD_CONTACT_FAILED, e),
        }
    }

    fn on_remove_contact(&self, me: &Identity, contact: &str) {
        match self.state.store.remove_contact(me.user_id, contact) {
            Ok(()) => {
                self.reply(Msg::response(ActionCode::RemoveContact, true, replies::CONTACT_REMOVED));
                self.send_contact_list(me);
            }
            Err(e) => {
                self.store_failure(ActionCode::RemoveContact, replies::REMOVE_CONTACT_FAILED, e)
            }
        }
    }

    fn send_contact_list(&self, me: &Identity) {
        let contacts = routing::contact_list(&self.state, me.user_id).unwrap_or_else(|e| {
            sink_error!(self.state.log, "contacts of {} unavailable: {}", me.username, e);
            Vec::new()
        });
        self.reply(Msg::ContactList { contacts });
    }

    fn on_search(&self, me: &Identity, query: &str) {
        let users = if query.is_empty() {
            Vec::new()
        } else {
            self.state
                .store
                .search_users(query, me.user_id, SEARCH_LIMIT)
                .unwrap_or_else(|e| {
                    sink_error!(self.state.log, "search {:?} failed: {}", query, e);
                    Vec::new()
                })
        };
        self.reply(Msg::UserSearchResult { users });
    }

    fn on_avatar_set(&self, me: &Identity, data: &[u8]) {
        if data.len() > MAX_AVATAR_LEN {
            self.fail(ActionCode::AvatarSet, replies::AVATAR_TOO_LARGE);
            return;
        }
        match self.state.store.set_avatar(me.user_id, data) {
            Ok(()) => {
                sink_info!(self.state.log, "avatar set: {} ({} bytes)", me.username, data.len());
                self.reply(Msg::response(ActionCode::AvatarSet, true, replies::AVATAR_UPDATED));
            }
            Err(e) => {
                sink_error!(self.state.log, "avatar for {} not stored: {}", me.username, e);
                self.fail(ActionCode::AvatarSet, replies::AVATAR_FAILED);
            }
        }
    }

    fn on_avatar_get(&self, username: &str) {
        let data = match self.state.store.get_avatar(username) {
            Ok(found) => found.unwrap_or_default(),
            Err(e) => {
                sink_warn!(self.state.log, "avatar of {} unreadable: {}", username, e);
                Vec::new()
            }
        };
        self.reply(Msg::AvatarData {
            username: username.to_owned(),
            data,
        });
    }

    /// Request-level store errors carry their own reason; backend failures
    /// get the generic `fallback`.
    fn store_failure(&self, action: ActionCode, fallback: &str, err: StoreError) {
        if err.is_internal() {
            sink_error!(self.state.log, "{:?} failed: {}", action, err);
            self.fail(action, fallback);
        } else {
            self.fail(action, err.to_string());
        }
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        if let Some(username) = self.online.take() {
            self.state.registry.remove(&username);
            routing::broadcast_presence(&self.state, &username, PresenceStatus::Offline);
            sink_info!(self.state.log, "user {} disconnected", username);
        }
        self.session.close();
    }
}

/// Shape rules for new accounts, checked in this order.
fn check_registration(username: &str, password: &str) -> Result<(), &'static str> {
    if !USERNAME_CHARS.contains(&username.chars().count()) {
        return Err(replies::USERNAME_LENGTH);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(replies::PASSWORD_LENGTH);
    }
    if !username.chars().all(char::is_alphanumeric) {
        return Err(replies::USERNAME_CHARSET);
    }
    Ok(())
}

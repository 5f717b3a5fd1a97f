// ---- Public message enum --------------------------------------------------

use crate::protocol::{
    AckStatus, ActionCode, Command, ContactInfo, PresenceStatus, ResponseCode, UserName,
};

/// One variant per command code. Client requests first, then server pushes
/// and replies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Msg {
    // Auth
    Register {
        username: UserName,
        password: String,
    },
    Login {
        username: UserName,
        password: String,
    },
    Logout,

    // Messaging
    SendMessage {
        to: UserName,
        content: String,
        msg_id: String, // client-generated
    },
    ReceiveMessage {
        from: UserName,
        content: String,
        msg_id: String,
        timestamp: String, // server clock, ISO-8601 UTC
    },
    MessageAck {
        msg_id: String,
        status: AckStatus,
    },

    // Contacts
    AddContact {
        contact: UserName,
    },
    RemoveContact {
        contact: UserName,
    },
    ContactListRequest,
    ContactList {
        contacts: Vec<ContactInfo>,
    },

    // Users
    UserSearch {
        query: String,
    },
    UserSearchResult {
        users: Vec<UserName>,
    },
    UserListRequest,
    UserList {
        users: Vec<UserName>,
    },

    // Presence
    Presence {
        username: UserName,
        status: PresenceStatus,
    },

    // Replies
    Response {
        action: ActionCode,
        code: ResponseCode,
        text: String,
    },
    Error {
        text: String,
    },

    // Attention signal ("earthquake")
    SignalSend {
        to: UserName,
        intensity: u8,
    },
    SignalReceive {
        from: UserName,
        intensity: u8,
    },

    // Avatars
    AvatarSet {
        data: Vec<u8>,
    },
    AvatarGet {
        username: UserName,
    },
    AvatarData {
        username: UserName,
        data: Vec<u8>, // empty if none stored
    },
}

impl Msg {
    /// The command code this message travels under.
    pub fn command(&self) -> Command {
        use Msg::*;
        match self {
            Register { .. } => Command::Register,
            Login { .. } => Command::Login,
            Logout => Command::Logout,
            SendMessage { .. } => Command::SendMessage,
            ReceiveMessage { .. } => Command::ReceiveMessage,
            MessageAck { .. } => Command::MessageAck,
            AddContact { .. } => Command::AddContact,
            RemoveContact { .. } => Command::RemoveContact,
            ContactListRequest => Command::ContactListRequest,
            ContactList { .. } => Command::ContactList,
            UserSearch { .. } => Command::UserSearch,
            UserSearchResult { .. } => Command::UserSearchResult,
            UserListRequest => Command::UserListRequest,
            UserList { .. } => Command::UserList,
            Presence { .. } => Command::Presence,
            Response { .. } => Command::Response,
            Error { .. } => Command::Error,
            SignalSend { .. } => Command::SignalSend,
            SignalReceive { .. } => Command::SignalReceive,
            AvatarSet { .. } => Command::AvatarSet,
            AvatarGet { .. } => Command::AvatarGet,
            AvatarData { .. } => Command::AvatarData,
        }
    }

    pub fn response(action: ActionCode, ok: bool, text: impl Into<String>) -> Self {
        Msg::Response {
            action,
            code: ResponseCode::from_ok(ok),
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Msg::Error { text: text.into() }
    }
}

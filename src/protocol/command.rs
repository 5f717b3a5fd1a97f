// ---- Command code (u16) ---------------------------------------------------

use crate::protocol::ProtoError;

/// Wire command codes, grouped by range:
/// auth 0x00xx, messaging 0x01xx, contacts 0x02xx, users 0x03xx,
/// presence 0x04xx, responses 0x05xx, signals 0x06xx, avatars 0x07xx.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum Command {
    Register = 0x0001,
    Login = 0x0002,
    Logout = 0x0003,

    SendMessage = 0x0100,
    ReceiveMessage = 0x0101,
    MessageAck = 0x0102,

    AddContact = 0x0200,
    RemoveContact = 0x0201,
    ContactListRequest = 0x0202,
    ContactList = 0x0203,

    UserSearch = 0x0300,
    UserSearchResult = 0x0301,
    UserListRequest = 0x0302,
    UserList = 0x0303,

    Presence = 0x0400,

    Response = 0x0500,
    Error = 0x0501,

    SignalSend = 0x0600,
    SignalReceive = 0x0601,

    AvatarSet = 0x0700,
    AvatarGet = 0x0701,
    AvatarData = 0x0702,
}

impl Command {
    pub fn from_u16(v: u16) -> Result<Command, ProtoError> {
        use Command::*;
        match v {
            0x0001 => Ok(Register),
            0x0002 => Ok(Login),
            0x0003 => Ok(Logout),
            0x0100 => Ok(SendMessage),
            0x0101 => Ok(ReceiveMessage),
            0x0102 => Ok(MessageAck),
            0x0200 => Ok(AddContact),
            0x0201 => Ok(RemoveContact),
            0x0202 => Ok(ContactListRequest),
            0x0203 => Ok(ContactList),
            0x0300 => Ok(UserSearch),
            0x0301 => Ok(UserSearchResult),
            0x0302 => Ok(UserListRequest),
            0x0303 => Ok(UserList),
            0x0400 => Ok(Presence),
            0x0500 => Ok(Response),
            0x0501 => Ok(Error),
            0x0600 => Ok(SignalSend),
            0x0601 => Ok(SignalReceive),
            0x0700 => Ok(AvatarSet),
            0x0701 => Ok(AvatarGet),
            0x0702 => Ok(AvatarData),
            other => Err(ProtoError::UnknownCommand(other)),
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// True for commands a client sends to the server.
    pub fn is_request(self) -> bool {
        use Command::*;
        matches!(
            self,
            Register
                | Login
                | Logout
                | SendMessage
                | AddContact
                | RemoveContact
                | ContactListRequest
                | UserSearch
                | UserListRequest
                | SignalSend
                | AvatarSet
                | AvatarGet
        )
    }
}

use bytes::BufMut;
use std::str;

use super::{
    AckStatus, ActionCode, Command, ContactInfo, Msg, PresenceStatus, ProtoError, ResponseCode,
};

// ---- Encode to payload bytes ----------------------------------------------

pub fn encode_msg(msg: &Msg) -> Result<(Command, Vec<u8>), ProtoError> {
    use Msg::*;
    let mut body = Vec::new();

    match msg {
        Register { username, password } | Login { username, password } => {
            put_str16(&mut body, username)?;
            put_str16(&mut body, password)?;
        }
        Logout | ContactListRequest | UserListRequest => {}

        SendMessage {
            to,
            content,
            msg_id,
        } => {
            put_str16(&mut body, to)?;
            put_str16(&mut body, content)?;
            put_str16(&mut body, msg_id)?;
        }
        ReceiveMessage {
            from,
            content,
            msg_id,
            timestamp,
        } => {
            put_str16(&mut body, from)?;
            put_str16(&mut body, content)?;
            put_str16(&mut body, msg_id)?;
            put_str16(&mut body, timestamp)?;
        }
        MessageAck { msg_id, status } => {
            put_str16(&mut body, msg_id)?;
            body.put_u8(status.as_u8());
        }

        AddContact { contact } | RemoveContact { contact } => {
            put_str16(&mut body, contact)?;
        }
        ContactList { contacts } => {
            put_count(&mut body, contacts.len())?;
            for c in contacts {
                put_str16(&mut body, &c.username)?;
                body.put_u8(c.status.as_u8());
            }
        }

        UserSearch { query } => {
            put_str16(&mut body, query)?;
        }
        UserSearchResult { users } | UserList { users } => {
            put_count(&mut body, users.len())?;
            for u in users {
                put_str16(&mut body, u)?;
            }
        }

        Presence { username, status } => {
            put_str16(&mut body, username)?;
            body.put_u8(status.as_u8());
        }

        Response { action, code, text } => {
            body.put_u8(action.as_u8());
            body.put_u8(code.as_u8());
            put_str16(&mut body, text)?;
        }
        Error { text } => {
            put_str16(&mut body, text)?;
        }

        SignalSend { to: name, intensity } | SignalReceive {
            from: name,
            intensity,
        } => {
            put_str16(&mut body, name)?;
            body.put_u8(*intensity);
        }

        AvatarSet { data } => {
            put_blob32(&mut body, data)?;
        }
        AvatarGet { username } => {
            put_str16(&mut body, username)?;
        }
        AvatarData { username, data } => {
            put_str16(&mut body, username)?;
            put_blob32(&mut body, data)?;
        }
    }

    Ok((msg.command(), body))
}

// ---- Decode from payload bytes --------------------------------------------

pub fn decode_msg(command: Command, body: &[u8]) -> Result<Msg, ProtoError> {
    let mut cursor = Cursor::new(body);

    let msg = match command {
        Command::Register => Msg::Register {
            username: cursor.get_string()?,
            password: cursor.get_string()?,
        },
        Command::Login => Msg::Login {
            username: cursor.get_string()?,
            password: cursor.get_string()?,
        },
        Command::Logout => Msg::Logout,

        Command::SendMessage => Msg::SendMessage {
            to: cursor.get_string()?,
            content: cursor.get_string()?,
            msg_id: cursor.get_string()?,
        },
        Command::ReceiveMessage => Msg::ReceiveMessage {
            from: cursor.get_string()?,
            content: cursor.get_string()?,
            msg_id: cursor.get_string()?,
            timestamp: cursor.get_string()?,
        },
        Command::MessageAck => Msg::MessageAck {
            msg_id: cursor.get_string()?,
            status: AckStatus::from_u8(cursor.get_u8()?)?,
        },

        Command::AddContact => Msg::AddContact {
            contact: cursor.get_string()?,
        },
        Command::RemoveContact => Msg::RemoveContact {
            contact: cursor.get_string()?,
        },
        Command::ContactListRequest => Msg::ContactListRequest,
        Command::ContactList => {
            let count = cursor.get_u16()? as usize;
            // Each entry needs at least 3 bytes; don't trust `count` for the allocation.
            let mut contacts = Vec::with_capacity(count.min(cursor.remaining() / 3));
            for _ in 0..count {
                let username = cursor.get_string()?;
                let status = PresenceStatus::from_u8(cursor.get_u8()?)?;
                contacts.push(ContactInfo { username, status });
            }
            Msg::ContactList { contacts }
        }

        Command::UserSearch => Msg::UserSearch {
            query: cursor.get_string()?,
        },
        Command::UserSearchResult => Msg::UserSearchResult {
            users: cursor.get_string_list()?,
        },
        Command::UserListRequest => Msg::UserListRequest,
        Command::UserList => Msg::UserList {
            users: cursor.get_string_list()?,
        },

        Command::Presence => Msg::Presence {
            username: cursor.get_string()?,
            status: PresenceStatus::from_u8(cursor.get_u8()?)?,
        },

        Command::Response => Msg::Response {
            action: ActionCode::from_u8(cursor.get_u8()?)?,
            code: ResponseCode::from_u8(cursor.get_u8()?)?,
            text: cursor.get_string()?,
        },
        Command::Error => Msg::Error {
            text: cursor.get_string()?,
        },

        Command::SignalSend => Msg::SignalSend {
            to: cursor.get_string()?,
            intensity: cursor.get_u8()?,
        },
        Command::SignalReceive => Msg::SignalReceive {
            from: cursor.get_string()?,
            intensity: cursor.get_u8()?,
        },

        Command::AvatarSet => Msg::AvatarSet {
            data: cursor.get_blob32()?.to_vec(),
        },
        Command::AvatarGet => Msg::AvatarGet {
            username: cursor.get_string()?,
        },
        Command::AvatarData => Msg::AvatarData {
            username: cursor.get_string()?,
            data: cursor.get_blob32()?.to_vec(),
        },
    };

    cursor.finish()?;
    Ok(msg)
}

// ---- Primitive write helpers ---------------------------------------------

/// str16 = u16 length + UTF-8 bytes
fn put_str16(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtoError> {
    let bytes = s.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| ProtoError::StringTooLong {
        max: u16::MAX as usize,
        actual: bytes.len(),
    })?;

    buf.put_u16(len);
    buf.put_slice(bytes);
    Ok(())
}

/// blob32 = u32 length + raw bytes
fn put_blob32(buf: &mut Vec<u8>, data: &[u8]) -> Result<(), ProtoError> {
    let len = u32::try_from(data.len()).map_err(|_| ProtoError::TooLarge {
        len: data.len(),
        max: u32::MAX as usize,
    })?;

    buf.put_u32(len);
    buf.put_slice(data);
    Ok(())
}

fn put_count(buf: &mut Vec<u8>, count: usize) -> Result<(), ProtoError> {
    let n = u16::try_from(count).map_err(|_| ProtoError::ListTooLong {
        max: u16::MAX as usize,
        actual: count,
    })?;
    buf.put_u16(n);
    Ok(())
}

// ---- Cursor for decoding --------------------------------------------------

#[derive(Debug)]
struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn get_u8(&mut self) -> Result<u8, ProtoError> {
        let (head, rest) = self.buf.split_first().ok_or(ProtoError::Truncated)?;
        self.buf = rest;
        Ok(*head)
    }

    fn get_u16(&mut self) -> Result<u16, ProtoError> {
        let b = self.get_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn get_u32(&mut self) -> Result<u32, ProtoError> {
        let b = self.get_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtoError> {
        if self.buf.len() < len {
            return Err(ProtoError::Truncated);
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }

    /// Read str16 = u16 length + UTF-8 bytes
    fn get_str16(&mut self) -> Result<&'a str, ProtoError> {
        let len = self.get_u16()? as usize;
        let bytes = self.get_bytes(len)?;
        str::from_utf8(bytes).map_err(|_| ProtoError::InvalidUtf8)
    }

    fn get_string(&mut self) -> Result<String, ProtoError> {
        self.get_str16().map(str::to_owned)
    }

    /// Read blob32 = u32 length + raw bytes
    fn get_blob32(&mut self) -> Result<&'a [u8], ProtoError> {
        let len = self.get_u32()? as usize;
        self.get_bytes(len)
    }

    /// u16 count followed by that many str16 values.
    fn get_string_list(&mut self) -> Result<Vec<String>, ProtoError> {
        let count = self.get_u16()? as usize;
        let mut out = Vec::with_capacity(count.min(self.remaining() / 2));
        for _ in 0..count {
            out.push(self.get_string()?);
        }
        Ok(out)
    }

    /// Enforce that we've consumed the whole body.
    fn finish(self) -> Result<(), ProtoError> {
        if !self.buf.is_empty() {
            Err(ProtoError::InvalidFormat("trailing bytes in message body"))
        } else {
            Ok(())
        }
    }
}

use crate::protocol::ProtoError;

// ---- Basic types ----------------------------------------------------------

pub type UserName = String;

/// Generic success/failure carried by `Msg::Response`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ResponseCode {
    Success = 0x00,
    Fail = 0x01,
}

/// Online status, always derived from registry membership.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum PresenceStatus {
    Offline = 0x00,
    Online = 0x01,
}

/// Outcome of a direct message, reported back to the sender.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum AckStatus {
    Delivered = 0x00,
    UserOffline = 0x01,
    DeliveryFailed = 0x02,
    InvalidMessage = 0x03,
}

/// Which request a `Msg::Response` answers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ActionCode {
    Register = 0x01,
    Login = 0x02,
    Logout = 0x03,
    AddContact = 0x04,
    RemoveContact = 0x05,
    AvatarSet = 0x06,
}

/// One entry of a contact list reply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContactInfo {
    pub username: UserName,
    pub status: PresenceStatus,
}

impl ResponseCode {
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        match v {
            0x00 => Ok(Self::Success),
            0x01 => Ok(Self::Fail),
            value => Err(ProtoError::InvalidValue {
                field: "response code",
                value,
            }),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_ok(ok: bool) -> Self {
        if ok { Self::Success } else { Self::Fail }
    }
}

impl PresenceStatus {
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        match v {
            0x00 => Ok(Self::Offline),
            0x01 => Ok(Self::Online),
            value => Err(ProtoError::InvalidValue {
                field: "presence status",
                value,
            }),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_online(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }
}

impl AckStatus {
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        match v {
            0x00 => Ok(Self::Delivered),
            0x01 => Ok(Self::UserOffline),
            0x02 => Ok(Self::DeliveryFailed),
            0x03 => Ok(Self::InvalidMessage),
            value => Err(ProtoError::InvalidValue {
                field: "ack status",
                value,
            }),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl ActionCode {
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        match v {
            0x01 => Ok(Self::Register),
            0x02 => Ok(Self::Login),
            0x03 => Ok(Self::Logout),
            0x04 => Ok(Self::AddContact),
            0x05 => Ok(Self::RemoveContact),
            0x06 => Ok(Self::AvatarSet),
            value => Err(ProtoError::InvalidValue {
                field: "action code",
                value,
            }),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

//! QuickIM binary protocol.
//!
//! ----------- Header (9 bytes) -------------------------------
//! Magic "QP" (2B) - Version (1B) - Command (2B) - Payload Length (4B)
//! ----------- Payload ----------------------------------------
//! Command-specific fields, up to `MAX_PAYLOAD_LEN`.
//!
//! All integers are big-endian. Strings are `u16 len + UTF-8`, blobs are
//! `u32 len + bytes`.

pub mod codec;
pub mod command;
pub mod constants;
pub mod errors;
pub mod framing;
pub mod msg;
pub mod types;

pub use codec::{decode_msg, encode_msg};
pub use command::Command;
pub use constants::{HEADER_LEN, MAGIC, MAX_AVATAR_LEN, MAX_PAYLOAD_LEN, PROTO_VERSION};
pub use errors::{FrameError, ProtoError};
pub use framing::{decode_frame, encode_frame, read_msg, write_msg};
pub use msg::Msg;
pub use types::{AckStatus, ActionCode, ContactInfo, PresenceStatus, ResponseCode, UserName};

/// Two-byte tag that opens every frame.
pub const MAGIC: [u8; 2] = *b"QP";

/// Protocol version (third byte in the frame header).
pub const PROTO_VERSION: u8 = 0x01;

/// magic(2) + version(1) + command(2) + payload_len(4)
pub const HEADER_LEN: usize = 9;

/// Maximum allowed payload size for a frame (to avoid OOM).
pub const MAX_PAYLOAD_LEN: usize = 10 * 1024 * 1024; // 10 MiB

/// Largest avatar blob the server will accept.
pub const MAX_AVATAR_LEN: usize = 512 * 1024; // 512 KiB

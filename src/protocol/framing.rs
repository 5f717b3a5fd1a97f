use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read, Write};

use super::{
    Command, FrameError, HEADER_LEN, MAGIC, MAX_PAYLOAD_LEN, Msg, PROTO_VERSION, ProtoError,
    decode_msg, encode_msg,
};

/// Encode a message into one complete frame:
/// [magic 2][ver 1][command u16][len u32][payload...]
pub fn encode_frame(msg: &Msg) -> Result<Vec<u8>, ProtoError> {
    let (command, body) = encode_msg(msg)?;
    if body.len() > MAX_PAYLOAD_LEN {
        return Err(ProtoError::TooLarge {
            len: body.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&MAGIC);
    frame.push(PROTO_VERSION);
    frame.extend_from_slice(&command.as_u16().to_be_bytes());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode the first frame in `buf`.
///
/// Returns the message and the number of bytes it occupied; anything past
/// that belongs to the next frame.
pub fn decode_frame(buf: &[u8]) -> Result<(Msg, usize), ProtoError> {
    let header: &[u8; HEADER_LEN] = buf
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or(ProtoError::HeaderTruncated {
            need: HEADER_LEN,
            got: buf.len(),
        })?;

    let (command, len) = parse_header(header, MAX_PAYLOAD_LEN)?;
    let body = buf
        .get(HEADER_LEN..HEADER_LEN + len)
        .ok_or(ProtoError::Truncated)?;

    Ok((decode_msg(command, body)?, HEADER_LEN + len))
}

/// Validate a header; returns the command and payload length.
fn parse_header(header: &[u8; HEADER_LEN], max_payload: usize) -> Result<(Command, usize), ProtoError> {
    let magic = [header[0], header[1]];
    if magic != MAGIC {
        return Err(ProtoError::BadMagic(magic));
    }

    let ver = header[2];
    if ver != PROTO_VERSION {
        return Err(ProtoError::UnsupportedVersion(ver));
    }

    let mut rest = &header[3..];
    // Infallible: the slice is exactly 6 bytes.
    let code = rest.read_u16::<BigEndian>().map_err(|_| ProtoError::Truncated)?;
    let len = rest.read_u32::<BigEndian>().map_err(|_| ProtoError::Truncated)? as usize;

    if len > max_payload {
        return Err(ProtoError::TooLarge {
            len,
            max: max_payload,
        });
    }

    let command = Command::from_u16(code)?;
    Ok((command, len))
}

/// Encode and write a single frame, flushing afterwards.
pub fn write_msg<W: Write>(w: &mut W, msg: &Msg) -> Result<(), FrameError> {
    let frame = encode_frame(msg)?;
    w.write_all(&frame)?;
    w.flush()?;
    Ok(())
}

/// Read a single frame, enforcing a max payload length.
///
/// A stream that ends before the first header byte yields `FrameError::Closed`;
/// one that ends mid-frame is an IO error.
pub fn read_msg<R: Read>(r: &mut R, max_payload: usize) -> Result<Msg, FrameError> {
    let mut header = [0u8; HEADER_LEN];
    read_header(r, &mut header)?;

    let (command, len) = parse_header(&header, max_payload)?;

    let mut body = vec![0u8; len];
    r.read_exact(&mut body)?; // io::Error -> FrameError::Io

    Ok(decode_msg(command, &body)?)
}

fn read_header<R: Read>(r: &mut R, header: &mut [u8; HEADER_LEN]) -> Result<(), FrameError> {
    let mut filled = 0;
    while filled < HEADER_LEN {
        match r.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Err(FrameError::Closed),
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::protocol::{AckStatus, PresenceStatus};

    #[test]
    fn header_layout_is_bit_exact() {
        let frame = encode_frame(&Msg::Logout).unwrap();
        assert_eq!(frame, vec![b'Q', b'P', 0x01, 0x00, 0x03, 0, 0, 0, 0]);

        let frame = encode_frame(&Msg::Presence {
            username: "a".into(),
            status: PresenceStatus::Online,
        })
        .unwrap();
        assert_eq!(
            frame,
            vec![b'Q', b'P', 0x01, 0x04, 0x00, 0, 0, 0, 4, 0, 1, b'a', 1]
        );
    }

    #[test]
    fn decode_frame_reports_consumed_length() {
        let mut buf = encode_frame(&Msg::MessageAck {
            msg_id: "m1".into(),
            status: AckStatus::Delivered,
        })
        .unwrap();
        let first_len = buf.len();
        buf.extend_from_slice(&encode_frame(&Msg::Logout).unwrap());

        let (msg, used) = decode_frame(&buf).unwrap();
        assert_eq!(used, first_len);
        assert!(matches!(msg, Msg::MessageAck { .. }));

        let (next, used2) = decode_frame(&buf[used..]).unwrap();
        assert_eq!(next, Msg::Logout);
        assert_eq!(used + used2, buf.len());
    }

    #[test]
    fn short_header_is_rejected() {
        assert_eq!(
            decode_frame(b"QP\x01\x00"),
            Err(ProtoError::HeaderTruncated { need: 9, got: 4 })
        );
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut frame = encode_frame(&Msg::Logout).unwrap();
        frame[0] = b'X';
        assert_eq!(
            decode_frame(&frame),
            Err(ProtoError::BadMagic([b'X', b'P']))
        );
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut frame = encode_frame(&Msg::Logout).unwrap();
        frame[2] = 0x02;
        assert_eq!(
            decode_frame(&frame),
            Err(ProtoError::UnsupportedVersion(0x02))
        );
    }

    #[test]
    fn oversized_length_is_rejected_before_reading_body() {
        let mut frame = encode_frame(&Msg::Logout).unwrap();
        let too_big = (MAX_PAYLOAD_LEN as u32 + 1).to_be_bytes();
        frame[5..9].copy_from_slice(&too_big);
        assert_eq!(
            decode_frame(&frame),
            Err(ProtoError::TooLarge {
                len: MAX_PAYLOAD_LEN + 1,
                max: MAX_PAYLOAD_LEN
            })
        );

        let mut reader = io::Cursor::new(frame);
        match read_msg(&mut reader, MAX_PAYLOAD_LEN) {
            Err(FrameError::Proto(ProtoError::TooLarge { .. })) => {}
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_rejected() {
        let frame = [b'Q', b'P', 0x01, 0x09, 0x99, 0, 0, 0, 0];
        assert_eq!(
            decode_frame(&frame),
            Err(ProtoError::UnknownCommand(0x0999))
        );
    }

    #[test]
    fn payload_shorter_than_declared_is_truncated() {
        let mut frame = encode_frame(&Msg::UserSearch {
            query: "abc".into(),
        })
        .unwrap();
        frame.pop();
        assert_eq!(decode_frame(&frame), Err(ProtoError::Truncated));
    }

    #[test]
    fn read_msg_round_trips_over_a_stream() {
        let mut wire = Vec::new();
        let sent = Msg::AvatarData {
            username: "carol".into(),
            data: vec![1, 2, 3, 4],
        };
        write_msg(&mut wire, &sent).unwrap();
        write_msg(&mut wire, &Msg::ContactListRequest).unwrap();

        let mut reader = io::Cursor::new(wire);
        assert_eq!(read_msg(&mut reader, MAX_PAYLOAD_LEN).unwrap(), sent);
        assert_eq!(
            read_msg(&mut reader, MAX_PAYLOAD_LEN).unwrap(),
            Msg::ContactListRequest
        );
        assert!(matches!(
            read_msg(&mut reader, MAX_PAYLOAD_LEN),
            Err(FrameError::Closed)
        ));
    }

    #[test]
    fn stream_ending_mid_header_is_an_io_error() {
        let mut reader = io::Cursor::new(vec![b'Q', b'P', 0x01]);
        match read_msg(&mut reader, MAX_PAYLOAD_LEN) {
            Err(FrameError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected Io(UnexpectedEof), got {other:?}"),
        }
    }
}

//! OK and Error packet bodies.

use bytes::{BufMut, Bytes, BytesMut};

/// First byte of an OK packet.
pub const OK_SIGNATURE: u8 = 0x00;

/// First byte of an Error packet.
pub const ERROR_SIGNATURE: u8 = 0xFF;

/// `ER_UNKNOWN_ERROR`.
pub const UNKNOWN_ERROR_CODE: u16 = 1105;

/// SQL state marker written after the error code.
pub const SQL_STATE_MARKER: &[u8] = b"#ERROR";

/// Message text of every Error packet.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Append an OK body: no affected rows, no insert id, no status, no warnings.
pub fn write_ok(buf: &mut BytesMut) {
    buf.put_u8(OK_SIGNATURE);
    buf.put_u8(0); // affected rows
    buf.put_u8(0); // last insert id
    buf.put_u16_le(0); // status flags
    buf.put_u16_le(0); // warnings
}

/// Append an Error body.
///
/// The marker and message are raw bytes, not length-prefixed.
pub fn write_error(buf: &mut BytesMut) {
    buf.put_u8(ERROR_SIGNATURE);
    buf.put_u16_le(UNKNOWN_ERROR_CODE);
    buf.put_slice(SQL_STATE_MARKER);
    buf.put_slice(UNKNOWN_ERROR_MESSAGE.as_bytes());
}

pub fn ok_packet() -> Bytes {
    let mut buf = BytesMut::with_capacity(7);
    write_ok(&mut buf);
    buf.freeze()
}

pub fn error_packet() -> Bytes {
    let mut buf = BytesMut::with_capacity(3 + SQL_STATE_MARKER.len() + UNKNOWN_ERROR_MESSAGE.len());
    write_error(&mut buf);
    buf.freeze()
}

//! Packet framing.
//!
//! Every MySQL packet is a 4-byte header followed by the payload:
//!
//! ```text
//! +---------+---------+---------+---------+-----------------+
//! | len[0]  | len[1]  | len[2]  |   seq   |  payload (len)  |
//! +---------+---------+---------+---------+-----------------+
//! ```
//!
//! The length is a 24-bit little-endian integer. This module never looks
//! inside the payload.

use super::error::ConnectionError;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Size of the packet header in bytes.
pub const HEADER_LEN: usize = 4;

/// Payloads must be strictly smaller than this; larger ones would need
/// splitting into multiple packets, which is not supported.
pub const MAX_PAYLOAD_LEN: usize = 1 << 24;

/// Build a packet header for a payload of `len` bytes.
pub fn encode_header(len: usize, sequence_id: u8) -> [u8; HEADER_LEN] {
    debug_assert!(len < MAX_PAYLOAD_LEN, "payload too large: {len}");
    let mut header = (len as u32).to_le_bytes();
    header[3] = sequence_id;
    header
}

/// Payload length carried in a packet header.
pub fn decode_length(header: &[u8; HEADER_LEN]) -> usize {
    usize::from(header[0]) | (usize::from(header[1]) << 8) | (usize::from(header[2]) << 16)
}

/// Write one packet, letting `build_payload` fill in the body.
///
/// Header and payload go out in a single write.
pub async fn write_packet<W, F>(
    stream: &mut W,
    sequence_id: u8,
    build_payload: F,
) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
    F: FnOnce(&mut BytesMut),
{
    let mut buf = BytesMut::with_capacity(64);
    buf.put_slice(&[0u8; HEADER_LEN]);
    build_payload(&mut buf);

    let len = buf.len() - HEADER_LEN;
    buf[..HEADER_LEN].copy_from_slice(&encode_header(len, sequence_id));
    trace!(len, sequence_id, "write packet");

    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one packet and return its payload.
///
/// The client's sequence number is not validated.
pub async fn read_packet<R>(stream: &mut R) -> Result<Bytes, ConnectionError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let n = read_fully(stream, &mut header).await?;
    if n == 0 {
        return Err(ConnectionError::ConnectionClosed);
    }
    if n < HEADER_LEN {
        return Err(ConnectionError::Framing(format!(
            "truncated header: got {n} of {HEADER_LEN} bytes"
        )));
    }

    let len = decode_length(&header);
    trace!(len, sequence_id = header[3], "read packet");

    let mut payload = BytesMut::zeroed(len);
    let n = read_fully(stream, &mut payload).await?;
    if n < len {
        return Err(ConnectionError::Framing(format!(
            "truncated payload: got {n} of {len} bytes"
        )));
    }

    Ok(payload.freeze())
}

/// Fill `buf` from the stream, stopping early only at end of stream.
///
/// Returns the number of bytes read.
async fn read_fully<R>(stream: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_length_round_trip() {
        for len in [0, 1, 7, 250, 251, 0xFFFF, 0x1_0000, 0xAB_CDEF, MAX_PAYLOAD_LEN - 1] {
            let header = encode_header(len, 3);
            assert_eq!(decode_length(&header), len);
            assert_eq!(header[3], 3);
        }
    }

    #[test]
    fn test_header_is_little_endian() {
        assert_eq!(encode_header(0x03_0201, 9), [0x01, 0x02, 0x03, 9]);
    }

    #[tokio::test]
    async fn test_write_packet_frames_payload() {
        let (mut client, mut server) = tokio::io::duplex(64);
        write_packet(&mut server, 5, |buf| buf.put_slice(b"hello"))
            .await
            .unwrap();

        let mut raw = [0u8; 9];
        client.read_exact(&mut raw).await.unwrap();
        assert_eq!(&raw, b"\x05\x00\x00\x05hello");
    }

    #[tokio::test]
    async fn test_read_packet_tolerates_partial_reads() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[5, 0])
            .read(&[0, 7, b'h'])
            .read(b"el")
            .read(b"lo")
            .build();

        let payload = read_packet(&mut stream).await.unwrap();
        assert_eq!(&payload[..], b"hello");
    }

    #[tokio::test]
    async fn test_read_empty_payload() {
        let mut stream = tokio_test::io::Builder::new().read(&[0, 0, 0, 0]).build();
        let payload = read_packet(&mut stream).await.unwrap();
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_read_on_closed_stream() {
        let mut stream = tokio_test::io::Builder::new().build();
        match read_packet(&mut stream).await {
            Err(ConnectionError::ConnectionClosed) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_truncated_header() {
        let mut stream = tokio_test::io::Builder::new().read(&[5, 0]).build();
        match read_packet(&mut stream).await {
            Err(ConnectionError::Framing(msg)) => assert!(msg.contains("header")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_truncated_payload() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[5, 0, 0, 0])
            .read(b"he")
            .build();
        match read_packet(&mut stream).await {
            Err(ConnectionError::Framing(msg)) => assert!(msg.contains("payload")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}

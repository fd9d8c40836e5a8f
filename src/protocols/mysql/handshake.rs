//! Initial handshake (protocol version 10).
//!
//! The server speaks first with a greeting that carries the connection id,
//! the auth challenge and the capability flags. The client's reply is read
//! and accepted without inspection.

use bytes::{BufMut, BytesMut};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Protocol version byte sent first in the greeting.
pub const PROTOCOL_VERSION: u8 = 10;

/// Length of the auth challenge.
pub const AUTH_DATA_LEN: usize = 20;

/// The auth data after the first 8 bytes must fill at least this many bytes.
const AUTH_DATA_PART2_MIN_LEN: usize = 13;

/// Seed for the auth challenge so greetings are identical across runs.
pub const AUTH_SEED: u64 = 1;

/// `utf8_bin`.
pub const CHARSET_UTF8_BIN: u8 = 83;

pub const AUTH_PLUGIN_NAME: &str = "mysql_native_password";

// https://dev.mysql.com/doc/dev/mysql-server/latest/group__group__cs__capabilities__flags.html
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const LONG_PASSWORD = 0x0000_0001;
        const FOUND_ROWS = 0x0000_0002;
        const LONG_FLAG = 0x0000_0004;
        const CONNECT_WITH_DB = 0x0000_0008;
        const NO_SCHEMA = 0x0000_0010;
        const COMPRESS = 0x0000_0020;
        const ODBC = 0x0000_0040;
        const LOCAL_FILES = 0x0000_0080;
        const IGNORE_SPACE = 0x0000_0100;
        const PROTOCOL_41 = 0x0000_0200;
        const INTERACTIVE = 0x0000_0400;
        const SSL = 0x0000_0800;
        const TRANSACTIONS = 0x0000_2000;
        const SECURE_CONNECTION = 0x0000_8000;
        const MULTI_STATEMENTS = 0x0001_0000;
        const MULTI_RESULTS = 0x0002_0000;
        const PS_MULTI_RESULTS = 0x0004_0000;
        const PLUGIN_AUTH = 0x0008_0000;
        const CONNECT_ATTRS = 0x0010_0000;
        const PLUGIN_AUTH_LENENC_DATA = 0x0020_0000;
        const CAN_HANDLE_EXPIRED_PASSWORDS = 0x0040_0000;
        const SESSION_TRACK = 0x0080_0000;
        const DEPRECATE_EOF = 0x0100_0000;
    }
}

/// Capabilities advertised in every greeting.
pub const SERVER_CAPABILITIES: Capabilities = Capabilities::LONG_PASSWORD
    .union(Capabilities::FOUND_ROWS)
    .union(Capabilities::LONG_FLAG)
    .union(Capabilities::IGNORE_SPACE)
    .union(Capabilities::PROTOCOL_41)
    .union(Capabilities::TRANSACTIONS)
    .union(Capabilities::SECURE_CONNECTION)
    .union(Capabilities::MULTI_STATEMENTS)
    .union(Capabilities::MULTI_RESULTS)
    .union(Capabilities::PLUGIN_AUTH)
    .union(Capabilities::CONNECT_ATTRS)
    .union(Capabilities::PLUGIN_AUTH_LENENC_DATA);

/// Derive the auth challenge from a seed.
pub fn auth_challenge(seed: u64) -> [u8; AUTH_DATA_LEN] {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = [0u8; AUTH_DATA_LEN];
    rng.fill_bytes(&mut data);
    data
}

/// Everything the greeting advertises for one connection.
#[derive(Debug, Clone)]
pub struct HandshakeInfo {
    pub connection_id: u32,
    pub server_version: String,
    pub auth_data: [u8; AUTH_DATA_LEN],
    pub capabilities: Capabilities,
    pub character_set: u8,
    pub auth_plugin: &'static str,
}

impl HandshakeInfo {
    pub fn new(connection_id: u32, server_version: impl Into<String>) -> Self {
        Self {
            connection_id,
            server_version: server_version.into(),
            auth_data: auth_challenge(AUTH_SEED),
            capabilities: SERVER_CAPABILITIES,
            character_set: CHARSET_UTF8_BIN,
            auth_plugin: AUTH_PLUGIN_NAME,
        }
    }

    /// Append the greeting payload to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        let caps = self.capabilities.bits();
        let (part1, part2) = self.auth_data.split_at(8);

        buf.put_u8(PROTOCOL_VERSION);
        put_null_terminated(buf, self.server_version.as_bytes());
        buf.put_u32_le(self.connection_id);
        buf.put_slice(part1);
        buf.put_u8(0); // filler
        buf.put_u16_le(caps as u16);
        buf.put_u8(self.character_set);
        buf.put_u16_le(0); // status flags
        buf.put_u16_le((caps >> 16) as u16);
        buf.put_u8(self.auth_data.len() as u8);
        buf.put_bytes(0, 10); // reserved
        buf.put_slice(part2);
        if part2.len() < AUTH_DATA_PART2_MIN_LEN {
            buf.put_bytes(0, AUTH_DATA_PART2_MIN_LEN - part2.len());
        }
        put_null_terminated(buf, self.auth_plugin.as_bytes());
    }
}

fn put_null_terminated(buf: &mut BytesMut, s: &[u8]) {
    buf.put_slice(s);
    buf.put_u8(0);
}

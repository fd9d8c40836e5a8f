//! Client command decoding.
//!
//! Only the first byte of a command packet is inspected; the rest of the
//! payload is ignored.

use std::fmt;

/// Command tag carried in byte 0 of every client command packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Quit,
    InitDatabase,
    Query,
    FieldList,
    CreateDatabase,
    DropDatabase,
    Refresh,
    Statistics,
    ProcessInfo,
    ProcessKill,
    Debug,
    Ping,
    ChangeUser,
    BinlogDump,
    StatementPrepare,
    StatementExecute,
    StatementSendLongData,
    StatementClose,
    StatementReset,
    SetOption,
    StatementFetch,
    ResetConnection,
    /// A byte that is not a known command.
    Unknown(u8),
}

impl CommandKind {
    /// Decode a command packet payload. An empty payload carries no
    /// command byte and decodes to `None`.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        payload.first().map(|&b| Self::from(b))
    }

    /// The byte that identifies this command on the wire.
    pub fn as_u8(self) -> u8 {
        match self {
            CommandKind::Quit => 0x01,
            CommandKind::InitDatabase => 0x02,
            CommandKind::Query => 0x03,
            CommandKind::FieldList => 0x04,
            CommandKind::CreateDatabase => 0x05,
            CommandKind::DropDatabase => 0x06,
            CommandKind::Refresh => 0x07,
            CommandKind::Statistics => 0x09,
            CommandKind::ProcessInfo => 0x0A,
            CommandKind::ProcessKill => 0x0C,
            CommandKind::Debug => 0x0D,
            CommandKind::Ping => 0x0E,
            CommandKind::ChangeUser => 0x11,
            CommandKind::BinlogDump => 0x12,
            CommandKind::StatementPrepare => 0x16,
            CommandKind::StatementExecute => 0x17,
            CommandKind::StatementSendLongData => 0x18,
            CommandKind::StatementClose => 0x19,
            CommandKind::StatementReset => 0x1A,
            CommandKind::SetOption => 0x1B,
            CommandKind::StatementFetch => 0x1C,
            CommandKind::ResetConnection => 0x1F,
            CommandKind::Unknown(b) => b,
        }
    }

    /// Whether the fake answers this command with an OK packet.
    pub fn is_handled(self) -> bool {
        matches!(
            self,
            CommandKind::Quit | CommandKind::Ping | CommandKind::Query | CommandKind::ResetConnection
        )
    }
}

impl From<u8> for CommandKind {
    fn from(b: u8) -> Self {
        match b {
            0x01 => CommandKind::Quit,
            0x02 => CommandKind::InitDatabase,
            0x03 => CommandKind::Query,
            0x04 => CommandKind::FieldList,
            0x05 => CommandKind::CreateDatabase,
            0x06 => CommandKind::DropDatabase,
            0x07 => CommandKind::Refresh,
            0x09 => CommandKind::Statistics,
            0x0A => CommandKind::ProcessInfo,
            0x0C => CommandKind::ProcessKill,
            0x0D => CommandKind::Debug,
            0x0E => CommandKind::Ping,
            0x11 => CommandKind::ChangeUser,
            0x12 => CommandKind::BinlogDump,
            0x16 => CommandKind::StatementPrepare,
            0x17 => CommandKind::StatementExecute,
            0x18 => CommandKind::StatementSendLongData,
            0x19 => CommandKind::StatementClose,
            0x1A => CommandKind::StatementReset,
            0x1B => CommandKind::SetOption,
            0x1C => CommandKind::StatementFetch,
            0x1F => CommandKind::ResetConnection,
            other => CommandKind::Unknown(other),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Unknown(b) => write!(f, "0x{b:02X}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handled_commands() {
        assert_eq!(CommandKind::parse(&[0x01]), Some(CommandKind::Quit));
        assert_eq!(CommandKind::parse(b"\x03SELECT 1"), Some(CommandKind::Query));
        assert_eq!(CommandKind::parse(&[0x0E]), Some(CommandKind::Ping));
        assert_eq!(CommandKind::parse(&[0x1F]), Some(CommandKind::ResetConnection));
    }

    #[test]
    fn test_parse_empty_payload() {
        assert_eq!(CommandKind::parse(&[]), None);
    }

    #[test]
    fn test_byte_mapping_is_consistent() {
        for b in 0..=u8::MAX {
            assert_eq!(CommandKind::from(b).as_u8(), b);
        }
    }

    #[test]
    fn test_is_handled() {
        assert!(CommandKind::Quit.is_handled());
        assert!(CommandKind::Query.is_handled());
        assert!(CommandKind::Ping.is_handled());
        assert!(CommandKind::ResetConnection.is_handled());
        assert!(!CommandKind::InitDatabase.is_handled());
        assert!(!CommandKind::StatementPrepare.is_handled());
        assert!(!CommandKind::Unknown(0x99).is_handled());
    }

    #[test]
    fn test_display() {
        assert_eq!(CommandKind::Ping.to_string(), "Ping");
        assert_eq!(CommandKind::Unknown(0x99).to_string(), "0x99");
    }
}

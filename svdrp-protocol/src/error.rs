//! Error types for the SVDRP protocol.

use std::fmt;

use thiserror::Error;

/// Classification of error replies sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// 451: local processing error on the server.
    ActionAborted,
    /// 500: syntax error, command unrecognized.
    CommandUnrecognized,
    /// 501: syntax error in parameters or arguments.
    ParameterError,
    /// 502: command not implemented.
    CommandNotImplemented,
    /// 504: command parameter not implemented.
    ParameterNotImplemented,
    /// 550: requested action not taken.
    ActionNotTaken,
    /// 554: transaction failed.
    TransactionFailed,
    /// Any other 5xx code.
    Generic,
}

impl ServerErrorKind {
    /// Classify a status code. Returns `None` for codes that are not errors.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            451 => Some(ServerErrorKind::ActionAborted),
            500 => Some(ServerErrorKind::CommandUnrecognized),
            501 => Some(ServerErrorKind::ParameterError),
            502 => Some(ServerErrorKind::CommandNotImplemented),
            504 => Some(ServerErrorKind::ParameterNotImplemented),
            550 => Some(ServerErrorKind::ActionNotTaken),
            554 => Some(ServerErrorKind::TransactionFailed),
            500..=599 => Some(ServerErrorKind::Generic),
            _ => None,
        }
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            ServerErrorKind::ActionAborted => "Action aborted",
            ServerErrorKind::CommandUnrecognized => "Command unrecognized",
            ServerErrorKind::ParameterError => "Parameter error",
            ServerErrorKind::CommandNotImplemented => "Command not implemented",
            ServerErrorKind::ParameterNotImplemented => "Parameter not implemented",
            ServerErrorKind::ActionNotTaken => "Action not taken",
            ServerErrorKind::TransactionFailed => "Transaction failed",
            ServerErrorKind::Generic => "Protocol error",
        }
    }
}

impl fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while talking to the server or decoding its data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SvdrpError {
    /// The server answered with an error status.
    #[error("{kind} ({code}): {message}")]
    Server {
        kind: ServerErrorKind,
        code: u16,
        message: String,
    },

    /// A well-formed reply the command did not expect.
    #[error("Unexpected reply ({code}): {message}")]
    UnexpectedReply { code: u16, message: String },

    /// A status line or reply payload could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// EPG data violates the tag grammar.
    #[error("Malformed EPG data: {0}")]
    MalformedEpg(String),

    /// A channel descriptor could not be parsed.
    #[error("Invalid channel descriptor: {0}")]
    InvalidChannel(String),

    /// A channel lookup had no match.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A reorder request would violate the channel list invariants.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The connection timed out or was lost.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl SvdrpError {
    /// Build the error for a server status code, if the code denotes one.
    pub fn from_status(code: u16, message: &str) -> Option<Self> {
        ServerErrorKind::from_code(code).map(|kind| SvdrpError::Server {
            kind,
            code,
            message: message.to_string(),
        })
    }

    /// Status code carried by server-originated errors.
    pub fn code(&self) -> Option<u16> {
        match self {
            SvdrpError::Server { code, .. } | SvdrpError::UnexpectedReply { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Returns true if the session cannot be used after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SvdrpError::Transport(_))
    }
}

impl From<std::io::Error> for SvdrpError {
    fn from(e: std::io::Error) -> Self {
        SvdrpError::Transport(e.to_string())
    }
}

/// Result alias used throughout the SVDRP crates.
pub type Result<T> = std::result::Result<T, SvdrpError>;

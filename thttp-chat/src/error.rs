use thiserror::Error;

/// Failures while cutting a byte chunk into length-prefixed frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("chunk ends before a {expected}-digit length prefix ({available} bytes left)")]
    MissingLength { expected: usize, available: usize },

    #[error("length prefix is not a decimal number: {0:?}")]
    InvalidLength(String),

    #[error("frame announces {expected} payload bytes but only {available} remain")]
    Truncated { expected: usize, available: usize },

    #[error("frame payload is not valid utf-8")]
    InvalidUtf8,
}

/// Reasons a payload does not form a valid THTTP request or response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("payload has no start line")]
    EmptyStartLine,

    #[error("unknown method {0:?}")]
    UnknownMethod(String),

    #[error("unsupported protocol version {0:?}")]
    VersionMismatch(String),

    #[error("malformed header line {0:?}")]
    MalformedHeader(String),

    #[error("unknown status code {0:?}")]
    UnknownStatus(String),

    #[error("reason phrase does not match status code")]
    ReasonMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("length size must be between 1 and {max}, got {got}")]
    LengthSize { got: usize, max: usize },

    #[error("max thread must be at least 1")]
    MaxThread,

    #[error("buffer size must be between {length_size} and {max} bytes, got {bufsize}")]
    BufferSize {
        bufsize: usize,
        length_size: usize,
        max: usize,
    },
}

/// A registry transition that was refused; the message is sent back verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("Connection not exist.")]
    UnknownConnection,

    #[error("Already signed in.")]
    AlreadySignedIn,

    #[error("Username collision.")]
    UsernameCollision,

    #[error("Not signed in.")]
    NotSignedIn,

    #[error("Leave group first.")]
    StillInGroup,

    #[error("Already in a group.")]
    AlreadyInGroup,

    #[error("Group name required.")]
    EmptyGroupName,

    #[error("Not in a group.")]
    NotInGroup,
}
